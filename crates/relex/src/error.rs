//! Error types for rule compilation and tokenizing.
//!
//! Two phases, two types:
//!
//! - [`CompileError`]: a rule specification is ill-formed. Raised
//!   synchronously from [`crate::compile`] and [`crate::states`] with the
//!   offending token kind and state name.
//! - [`LexError`]: the input failed to tokenize at runtime. Raised from
//!   [`crate::Lexer::next_token`] and carries the rendered diagnostic
//!   produced by [`crate::Lexer::format_error`].
//!
//! When the `diagnostics` feature is enabled, both types integrate with
//! miette for rich reporting.

use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// A rejected rule specification.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum CompileError {
    /// A list-form rule must name its token kind.
    #[error("Rule at position {index} has no token kind")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::missing_kind)))]
    MissingKind { index: usize },

    /// In map form the kind comes from the key; only transform functions may
    /// override it per match.
    #[error("Kind override for token '{token}' must be a transform function, not the name '{name}'")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::static_kind_override)))]
    StaticKindOverride {
        token: CompactString,
        name: CompactString,
    },

    #[error("Include entries cannot carry match patterns (state '{state}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::include_with_patterns)))]
    IncludeWithPatterns { state: CompactString },

    #[error("Token '{token}' declares more than one of push, pop and next")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::transition_conflict)))]
    TransitionConflict { token: CompactString },

    #[error("Token '{token}' declares both error and fallback")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::error_fallback_exclusive)))]
    ErrorFallbackExclusive { token: CompactString },

    #[error("Multiple error rules not allowed ('{previous}' and '{token}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::multiple_error_rules)))]
    MultipleErrorRules {
        token: CompactString,
        previous: CompactString,
    },

    #[error("Multiple fallback rules not allowed ('{previous}' and '{token}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::multiple_fallback_rules)))]
    MultipleFallbackRules {
        token: CompactString,
        previous: CompactString,
    },

    #[error("Error and fallback rules are mutually exclusive ('{previous}' and '{token}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::error_and_fallback)))]
    ErrorAndFallback {
        token: CompactString,
        previous: CompactString,
    },

    /// Rule patterns are wrapped in one capture group per rule; user capture
    /// groups would shift the group-to-rule mapping.
    #[error("Pattern for token '{token}' contains a capture group; use (?:...) instead")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::capture_group)))]
    CaptureGroup { token: CompactString },

    #[error("Regex flag '{flag}' is not allowed (token '{token}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::disallowed_flag)))]
    DisallowedFlag { token: CompactString, flag: char },

    #[error("Pattern for token '{token}' can match the empty string")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::empty_match)))]
    EmptyMatch { token: CompactString },

    #[error("Pattern for token '{token}' can match a line break without line_breaks")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::unexpected_line_break)))]
    UnexpectedLineBreak { token: CompactString },

    #[error("The unicode flag must be set on all regex patterns or none (token '{token}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::mixed_unicode)))]
    MixedUnicode { token: CompactString },

    #[error("State-switching rules are not allowed in a stateless lexer (token '{token}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::stateless_transition)))]
    StatelessTransition { token: CompactString },

    #[error("Include is only allowed between states of a stateful lexer")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::stateless_include)))]
    StatelessInclude,

    #[error("Fallback rule '{token}' cannot switch states")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::fallback_transition)))]
    FallbackTransition { token: CompactString },

    #[error("Missing state '{state}' (in rule '{token}' of state '{in_state}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::missing_state)))]
    MissingState {
        state: CompactString,
        token: CompactString,
        in_state: CompactString,
    },

    #[error("pop must be 1 (found {value} in rule '{token}' of state '{in_state}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::invalid_pop)))]
    InvalidPop {
        token: CompactString,
        in_state: CompactString,
        value: i64,
    },

    #[error("Cannot include nonexistent state '{state}' (in state '{in_state}')")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::unknown_include)))]
    UnknownInclude {
        state: CompactString,
        in_state: CompactString,
    },

    #[error("State '{state}' is declared twice")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::duplicate_state)))]
    DuplicateState { state: CompactString },

    #[error("Start state '{state}' is not defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::unknown_start)))]
    UnknownStart { state: CompactString },

    #[error("A stateful lexer needs at least one state")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::no_states)))]
    NoStates,

    #[error("Invalid pattern for token '{token}'")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::bad_pattern)))]
    BadPattern {
        token: CompactString,
        #[source]
        source: regex::Error,
    },

    #[error("Combined rule pattern failed to compile")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(relex::combined_pattern)))]
    CombinedPattern {
        #[source]
        source: regex::Error,
    },
}

/// A runtime tokenizing failure.
///
/// `message` is the full multi-line report (header, context lines, caret);
/// the remaining fields locate the failure in the input buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display_carries_context() {
        let err = CompileError::MissingState {
            state: "inner".into(),
            token: "lpar".into(),
            in_state: "main".into(),
        };
        let text = format!("{err}");
        assert!(text.contains("inner"));
        assert!(text.contains("lpar"));
        assert!(text.contains("main"));
    }

    #[test]
    fn bad_pattern_exposes_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = CompileError::BadPattern {
            token: "broken".into(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn lex_error_display_is_the_report() {
        let err = LexError {
            message: "invalid syntax at line 1 col 3:".to_string(),
            offset: 2,
            line: 1,
            column: 3,
        };
        assert_eq!(format!("{err}"), err.message);
    }
}
