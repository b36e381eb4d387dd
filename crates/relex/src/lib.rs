//! # relex
//!
//! Rule-compiled lexers: describe token kinds by patterns (literal strings
//! or regexes) and optional state transitions, get back a stateful
//! tokenizer that yields classified tokens with position metadata.
//!
//! ## Overview
//!
//! A specification is an ordered set of rules. The compiler validates it,
//! joins every rule's alternatives into one combined regex whose capture
//! groups map back to rules, builds a single-character dispatch table for
//! literal rules, and resolves the error/fallback rule. The runtime then
//! walks the input with that compiled unit while tracking line, column and
//! a stack of lexer states.
//!
//! - **Priority** is declaration order: earlier rules always beat later
//!   ones. Within one rule, longer literals beat shorter ones.
//! - **Fallback** rules swallow the gaps between matches, so every byte of
//!   input ends up in exactly one token.
//! - **Error** rules turn match failures into recoverable tokens instead
//!   of raised failures.
//! - **States** let rules `push`, `pop` and `next` between named rule
//!   sets, e.g. for string interpolation.
//!
//! ## Quick start
//!
//! ```rust
//! use relex::{compile, Pattern, RuleMap};
//!
//! let mut lexer = compile(
//!     RuleMap::new()
//!         .rule("ws", Pattern::regex(r"[ \t]+"))
//!         .rule("number", Pattern::regex("[0-9]+"))
//!         .rule("lparen", "(")
//!         .rule("rparen", ")"),
//! )?;
//!
//! let tokens = lexer.tokenize("(12 34)")?;
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind.as_str()).collect();
//! assert_eq!(kinds, ["lparen", "number", "ws", "number", "rparen"]);
//! assert_eq!(tokens[4].column, 7);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Stateful lexing
//!
//! ```rust
//! use relex::{states, Pattern, RuleDef, RuleMap, StateSet};
//!
//! let mut lexer = states(
//!     StateSet::new()
//!         .state(
//!             "main",
//!             RuleMap::new()
//!                 .rule("interp", RuleDef::matching("${").push("expr"))
//!                 .rule("chunk", relex::fallback()),
//!         )
//!         .state(
//!             "expr",
//!             RuleMap::new()
//!                 .rule("name", Pattern::regex("[a-z]+"))
//!                 .rule("rbrace", RuleDef::matching("}").pop(1)),
//!         ),
//! )?;
//!
//! let kinds: Vec<_> = lexer
//!     .tokenize("hi ${name}!")?
//!     .into_iter()
//!     .map(|t| t.kind)
//!     .collect();
//! assert_eq!(kinds, ["chunk", "interp", "name", "rbrace", "chunk"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature flags
//!
//! - `diagnostics`: derive `miette::Diagnostic` on the error types.
//! - `serde`: `Serialize`/`Deserialize` for [`Token`], [`Snapshot`] and
//!   [`LexError`].

mod compile;
mod error;
mod keywords;
mod lexer;
mod normalize;
mod rules;
mod states;
mod token;

use std::sync::Arc;

pub use crate::error::{CompileError, LexError};
pub use crate::keywords::keywords;
pub use crate::lexer::{Lexer, Snapshot};
pub use crate::rules::{
    error, fallback, KindFn, MapAlt, MapVal, Pattern, RegexFlags, RuleDef, RuleList, RuleMap,
    RuleSpec, StateSet, ValueFn,
};
pub use crate::token::Token;

/// Compile a stateless rule specification into a [`Lexer`] whose single
/// state is named `start`.
///
/// # Errors
///
/// Returns [`CompileError`] for ill-formed specifications; see the variant
/// list for everything that is rejected.
pub fn compile(rules: impl Into<RuleSpec>) -> Result<Lexer, CompileError> {
    let map = crate::states::compile_stateless(rules.into())?;
    Ok(Lexer::new(Arc::new(map)))
}

/// Compile a stateful specification into a [`Lexer`] starting in the first
/// declared state (or the [`StateSet::start`] override).
///
/// # Errors
///
/// Returns [`CompileError`] for ill-formed specifications, unknown
/// `include`/transition targets, and `pop` values other than 1.
pub fn states(spec: StateSet) -> Result<Lexer, CompileError> {
    let map = crate::states::compile_states(spec)?;
    Ok(Lexer::new(Arc::new(map)))
}
