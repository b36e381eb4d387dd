//! Tokenize a small arithmetic expression and print position metadata.
//!
//! ```sh
//! cargo run --example arithmetic
//! ```

use relex::{compile, Pattern, RuleMap};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut lexer = compile(
        RuleMap::new()
            .rule("ws", Pattern::regex(r"[ \t]+"))
            .rule("number", Pattern::regex(r"[0-9]+(?:\.[0-9]+)?"))
            .rule("op", ["+", "-", "*", "/"])
            .rule("lpar", "(")
            .rule("rpar", ")"),
    )?;

    for token in lexer.tokenize("12 * (3.5 + 4)")? {
        if token.kind == "ws" {
            continue;
        }
        println!(
            "{:>8} {:?} at line {} col {}",
            token.kind, token.value, token.line, token.column
        );
    }
    Ok(())
}
