//! Rule compilation: one [`CompiledState`] per lexer state.
//!
//! Every rule's alternatives are wrapped in a non-capturing group, joined
//! with `|`, and the per-rule combination becomes one top-level capture
//! group of the state's alternation; group order mirrors rule order, so the
//! first defined capture of a match identifies the winning rule. When no
//! fallback rule is present the alternation is anchored (`^`) and matched
//! against the unread tail of the buffer, so every match starts exactly at
//! the cursor. A fallback rule drops the anchor: the engine searches
//! forward and treats the gap before the match as fallback text.

use std::sync::Arc;

use hashbrown::HashMap;
use regex::{Regex, RegexBuilder};
use smallvec::SmallVec;

use crate::error::CompileError;
use crate::normalize::{Rule, RuleEntry};
use crate::rules::Pattern;

/// Alternation that can never match; used when every pattern of a state was
/// consumed by the fast table, so the engine falls through to the error
/// rule instead of looping on an empty regex.
const NEVER: &str = r"\b\B";

/// An immutable compiled state, freely shared between tokenizers.
pub(crate) struct CompiledState {
    pub regex: Regex,
    /// Anchored matching: every match starts at the cursor. False exactly
    /// when a fallback rule is present.
    pub sticky: bool,
    /// Rules that contributed capture groups, in group order.
    pub groups: Vec<Arc<Rule>>,
    /// Single-character literal dispatch, consulted before the regex.
    pub fast: HashMap<char, Arc<Rule>, ahash::RandomState>,
    /// The error or fallback rule; synthesized when none was declared.
    pub error: Arc<Rule>,
}

pub(crate) fn compile_rules(
    entries: &[RuleEntry],
    has_states: bool,
) -> Result<CompiledState, CompileError> {
    let mut rules: Vec<Arc<Rule>> = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            RuleEntry::Include(_) => return Err(CompileError::StatelessInclude),
            RuleEntry::Rule(rule) => rules.push(rule.clone()),
        }
    }

    let has_fallback = rules.iter().any(|rule| rule.fallback);
    let mut fast_allowed = !has_fallback;
    let mut fast: HashMap<char, Arc<Rule>, ahash::RandomState> =
        HashMap::with_hasher(ahash::RandomState::new());
    let mut groups: Vec<Arc<Rule>> = Vec::new();
    let mut parts: Vec<String> = Vec::new();
    let mut error_rule: Option<Arc<Rule>> = None;
    let mut unicode: Option<bool> = None;

    for rule in &rules {
        if rule.error || rule.fallback {
            if let Some(previous) = &error_rule {
                return Err(match (rule.fallback, previous.fallback) {
                    (true, true) => CompileError::MultipleFallbackRules {
                        token: rule.kind.clone(),
                        previous: previous.kind.clone(),
                    },
                    (false, false) => CompileError::MultipleErrorRules {
                        token: rule.kind.clone(),
                        previous: previous.kind.clone(),
                    },
                    _ => CompileError::ErrorAndFallback {
                        token: rule.kind.clone(),
                        previous: previous.kind.clone(),
                    },
                });
            }
            error_rule = Some(rule.clone());
        }

        if rule.transition.is_some() {
            if !has_states {
                return Err(CompileError::StatelessTransition {
                    token: rule.kind.clone(),
                });
            }
            if rule.fallback {
                return Err(CompileError::FallbackTransition {
                    token: rule.kind.clone(),
                });
            }
        }

        let mut pats: &[Pattern] = &rule.patterns;
        if fast_allowed {
            let mut peeled = 0;
            for pat in pats {
                let Pattern::Literal(text) = pat else { break };
                let mut chars = text.chars();
                let (Some(ch), None) = (chars.next(), chars.next()) else {
                    break;
                };
                if ch == '\n' && !rule.line_breaks {
                    return Err(CompileError::UnexpectedLineBreak {
                        token: rule.kind.clone(),
                    });
                }
                // First registration wins: earlier rules outrank later ones.
                fast.entry(ch).or_insert_with(|| rule.clone());
                peeled += 1;
            }
            pats = &pats[peeled..];
        }

        if pats.is_empty() {
            continue;
        }
        // This rule needs the regex, so later rules cannot be dispatched
        // ahead of it through the fast table.
        fast_allowed = false;

        let part = assemble_rule(rule, pats, has_fallback, &mut unicode)?;
        parts.push(format!("({part})"));
        groups.push(rule.clone());
    }

    let error = error_rule.unwrap_or_else(|| Arc::new(default_error_rule()));

    let alternation = if parts.is_empty() {
        NEVER.to_owned()
    } else {
        parts.join("|")
    };
    let sticky = !has_fallback;
    let source = if sticky {
        format!("^(?:{alternation})")
    } else {
        alternation
    };
    let regex = RegexBuilder::new(&source)
        .unicode(unicode.unwrap_or(true))
        .build()
        .map_err(|source| CompileError::CombinedPattern { source })?;

    Ok(CompiledState {
        regex,
        sticky,
        groups,
        fast,
        error,
    })
}

/// Join one rule's alternatives and run the per-rule validations.
fn assemble_rule(
    rule: &Arc<Rule>,
    pats: &[Pattern],
    has_fallback: bool,
    unicode: &mut Option<bool>,
) -> Result<String, CompileError> {
    let mut alts: Vec<String> = Vec::with_capacity(pats.len());
    let mut rule_unicode = true;
    for pat in pats {
        match pat {
            Pattern::Literal(text) => alts.push(format!("(?:{})", regex::escape(text))),
            Pattern::Regex { source, flags } => {
                if flags.ignore_case {
                    return Err(CompileError::DisallowedFlag {
                        token: rule.kind.clone(),
                        flag: 'i',
                    });
                }
                if flags.multi_line {
                    return Err(CompileError::DisallowedFlag {
                        token: rule.kind.clone(),
                        flag: 'm',
                    });
                }
                match *unicode {
                    None => *unicode = Some(flags.unicode),
                    Some(seen) if seen != flags.unicode && !has_fallback => {
                        return Err(CompileError::MixedUnicode {
                            token: rule.kind.clone(),
                        });
                    }
                    _ => {}
                }
                rule_unicode = flags.unicode;
                let compiled = RegexBuilder::new(source)
                    .unicode(flags.unicode)
                    .build()
                    .map_err(|source| CompileError::BadPattern {
                        token: rule.kind.clone(),
                        source,
                    })?;
                if compiled.captures_len() > 1 {
                    return Err(CompileError::CaptureGroup {
                        token: rule.kind.clone(),
                    });
                }
                alts.push(format!("(?:{source})"));
            }
        }
    }

    let part = alts.join("|");
    let probe = RegexBuilder::new(&part)
        .unicode(rule_unicode)
        .build()
        .map_err(|source| CompileError::BadPattern {
            token: rule.kind.clone(),
            source,
        })?;
    if probe.is_match("") {
        return Err(CompileError::EmptyMatch {
            token: rule.kind.clone(),
        });
    }
    if !rule.line_breaks && probe.is_match("\n") {
        return Err(CompileError::UnexpectedLineBreak {
            token: rule.kind.clone(),
        });
    }
    Ok(part)
}

/// Used when no rule declares `error` or `fallback`: consumes the rest of
/// the input and raises.
fn default_error_rule() -> Rule {
    Rule {
        kind: "error".into(),
        kind_fn: None,
        value_fn: None,
        patterns: SmallVec::new(),
        line_breaks: true,
        should_throw: true,
        error: true,
        fallback: false,
        transition: None,
    }
}
