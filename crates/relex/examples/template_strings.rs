//! A template-string tokenizer: plain text is swallowed by a fallback rule
//! until an interpolation marker pushes into the expression state.
//!
//! ```sh
//! cargo run --example template_strings
//! ```

use relex::{states, Pattern, RuleDef, RuleMap, StateSet};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut lexer = states(
        StateSet::new()
            .state(
                "template",
                RuleMap::new()
                    .rule("interp", RuleDef::matching("${").push("expr"))
                    .rule("chunk", relex::fallback()),
            )
            .state(
                "expr",
                RuleMap::new()
                    .rule("ws", Pattern::regex(" +"))
                    .rule("name", Pattern::regex("[a-z_]+"))
                    .rule("rbrace", RuleDef::matching("}").pop(1)),
            ),
    )?;

    let input = "Dear ${name}, your order ${order_id} has shipped.\n";
    for token in lexer.tokenize(input)? {
        println!("[{}] {:?}", token.kind, token.value);
    }
    Ok(())
}
