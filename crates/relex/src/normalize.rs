//! Canonicalization of rule specifications.
//!
//! Both input forms collapse into one ordered list of [`RuleEntry`] values:
//! immutable [`Rule`]s plus unresolved include markers. Defaults are applied
//! here, each rule's alternatives are sorted, and ill-formed descriptors are
//! rejected before compilation.

use std::sync::Arc;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::error::CompileError;
use crate::rules::{KindFn, MapAlt, MapEntry, Pattern, RuleDef, RuleList, RuleMap, RuleSpec, ValueFn};

/// State switch attached to a rule. At most one per rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    Push(CompactString),
    Pop(i64),
    Next(CompactString),
}

/// A normalized, immutable rule. Shared by reference between a state's
/// group list, its fast table and its error slot.
pub(crate) struct Rule {
    pub kind: CompactString,
    pub kind_fn: Option<KindFn>,
    pub value_fn: Option<ValueFn>,
    pub patterns: SmallVec<[Pattern; 4]>,
    pub line_breaks: bool,
    pub should_throw: bool,
    pub error: bool,
    pub fallback: bool,
    pub transition: Option<Transition>,
}

#[derive(Clone)]
pub(crate) enum RuleEntry {
    Rule(Arc<Rule>),
    Include(CompactString),
}

pub(crate) fn normalize(spec: RuleSpec) -> Result<Vec<RuleEntry>, CompileError> {
    match spec {
        RuleSpec::List(list) => normalize_list(list),
        RuleSpec::Map(map) => normalize_map(map),
    }
}

fn normalize_list(list: RuleList) -> Result<Vec<RuleEntry>, CompileError> {
    let mut out = Vec::with_capacity(list.0.len());
    for (index, def) in list.0.into_iter().enumerate() {
        if let Some(state) = def.include.clone() {
            if !def.patterns.is_empty() {
                return Err(CompileError::IncludeWithPatterns { state });
            }
            out.push(RuleEntry::Include(state));
            continue;
        }
        let Some(kind) = def.kind_name.clone() else {
            return Err(CompileError::MissingKind { index });
        };
        out.push(RuleEntry::Rule(Arc::new(finish_rule(kind, def)?)));
    }
    Ok(out)
}

fn normalize_map(map: RuleMap) -> Result<Vec<RuleEntry>, CompileError> {
    let mut out = Vec::new();
    for entry in map.entries {
        match entry {
            MapEntry::Include(state) => out.push(RuleEntry::Include(state)),
            MapEntry::Rule(kind, val) => {
                // Each contiguous run of plain alternatives aggregates into
                // one rule, flushed before any descriptor override.
                let mut plain: Vec<Pattern> = Vec::new();
                for alt in val.0 {
                    match alt {
                        MapAlt::Pattern(pattern) => plain.push(pattern),
                        MapAlt::Def(def) => {
                            if !plain.is_empty() {
                                out.push(RuleEntry::Rule(Arc::new(plain_rule(
                                    &kind,
                                    std::mem::take(&mut plain),
                                )?)));
                            }
                            out.push(RuleEntry::Rule(Arc::new(map_rule(&kind, def)?)));
                        }
                    }
                }
                if !plain.is_empty() {
                    out.push(RuleEntry::Rule(Arc::new(plain_rule(&kind, plain)?)));
                }
            }
        }
    }
    Ok(out)
}

fn plain_rule(kind: &CompactString, patterns: Vec<Pattern>) -> Result<Rule, CompileError> {
    finish_rule(
        kind.clone(),
        RuleDef {
            patterns,
            ..RuleDef::default()
        },
    )
}

fn map_rule(kind: &CompactString, def: RuleDef) -> Result<Rule, CompileError> {
    if let Some(state) = def.include.clone() {
        return Err(CompileError::IncludeWithPatterns { state });
    }
    if let Some(name) = def.kind_name.clone() {
        // The key already names the kind; a per-match override must be a
        // transform function. Restating the key itself is tolerated.
        if name != *kind {
            return Err(CompileError::StaticKindOverride {
                token: kind.clone(),
                name,
            });
        }
    }
    finish_rule(kind.clone(), def)
}

fn finish_rule(kind: CompactString, def: RuleDef) -> Result<Rule, CompileError> {
    let transition = transition_of(&kind, &def)?;
    if def.error && def.fallback {
        return Err(CompileError::ErrorFallbackExclusive { token: kind });
    }
    let mut patterns: SmallVec<[Pattern; 4]> = def.patterns.into_iter().collect();
    sort_patterns(&mut patterns);
    Ok(Rule {
        line_breaks: def.line_breaks.unwrap_or(def.error || def.fallback),
        kind,
        kind_fn: def.kind_fn,
        value_fn: def.value_fn,
        patterns,
        should_throw: def.should_throw,
        error: def.error,
        fallback: def.fallback,
        transition,
    })
}

fn transition_of(kind: &CompactString, def: &RuleDef) -> Result<Option<Transition>, CompileError> {
    let mut transition = None;
    let mut modes = 0;
    if let Some(state) = &def.push {
        transition = Some(Transition::Push(state.clone()));
        modes += 1;
    }
    if let Some(n) = def.pop {
        transition = Some(Transition::Pop(n));
        modes += 1;
    }
    if let Some(state) = &def.next {
        transition = Some(Transition::Next(state.clone()));
        modes += 1;
    }
    if modes > 1 {
        return Err(CompileError::TransitionConflict { token: kind.clone() });
    }
    Ok(transition)
}

/// Within one rule: regex alternatives first, then literals from longest to
/// shortest. Stable, and never applied across rules.
fn sort_patterns(patterns: &mut [Pattern]) {
    patterns.sort_by(|a, b| match (a, b) {
        (Pattern::Literal(a), Pattern::Literal(b)) => b.len().cmp(&a.len()),
        _ => b.is_regex().cmp(&a.is_regex()),
    });
}
