//! Multi-state compilation: `$all` merging, include splicing and
//! cross-state validation.

use std::sync::Arc;

use compact_str::CompactString;
use hashbrown::{HashMap, HashSet};

use crate::compile::{compile_rules, CompiledState};
use crate::error::CompileError;
use crate::normalize::{normalize, Rule, RuleEntry, Transition};
use crate::rules::{RuleSpec, StateSet};

/// The immutable state table shared by every tokenizer built from it.
pub(crate) struct StateMap {
    pub states: HashMap<CompactString, Arc<CompiledState>, ahash::RandomState>,
    pub start: CompactString,
}

/// Stateless form: a single state named `start`.
pub(crate) fn compile_stateless(spec: RuleSpec) -> Result<StateMap, CompileError> {
    let entries = normalize(spec)?;
    let compiled = compile_rules(&entries, false)?;
    let mut states = HashMap::with_hasher(ahash::RandomState::new());
    let start = CompactString::from("start");
    states.insert(start.clone(), Arc::new(compiled));
    Ok(StateMap { states, start })
}

pub(crate) fn compile_states(spec: StateSet) -> Result<StateMap, CompileError> {
    if spec.states.is_empty() {
        return Err(CompileError::NoStates);
    }

    let all = match spec.all {
        Some(rules) => normalize(rules)?,
        None => Vec::new(),
    };

    let order: Vec<CompactString> = spec.states.iter().map(|(name, _)| name.clone()).collect();
    let start = spec.start.clone().unwrap_or_else(|| order[0].clone());
    if !order.contains(&start) {
        return Err(CompileError::UnknownStart { state: start });
    }

    let mut lists: HashMap<CompactString, Vec<RuleEntry>, ahash::RandomState> =
        HashMap::with_hasher(ahash::RandomState::new());
    for (name, rules) in spec.states {
        let mut entries = normalize(rules)?;
        // The shared rules are appended as the same Arc values everywhere,
        // so include dedup recognizes them across states.
        entries.extend(all.iter().cloned());
        if lists.insert(name.clone(), entries).is_some() {
            return Err(CompileError::DuplicateState { state: name });
        }
    }

    for name in &order {
        resolve_includes(name, &mut lists)?;
    }

    let mut states = HashMap::with_hasher(ahash::RandomState::new());
    for name in &order {
        let compiled = compile_rules(&lists[name], true)?;
        states.insert(name.clone(), Arc::new(compiled));
    }

    // Transition targets can only be checked once every state exists.
    for name in &order {
        let state = &states[name];
        for rule in state.groups.iter().chain(state.fast.values()) {
            check_transition(rule, name, &states)?;
        }
    }

    Ok(StateMap { states, start })
}

/// Splice `include` entries in place. The per-state visited set guards
/// against cyclic include graphs; entries already present are skipped by
/// identity so shared rules are not duplicated.
fn resolve_includes(
    name: &CompactString,
    lists: &mut HashMap<CompactString, Vec<RuleEntry>, ahash::RandomState>,
) -> Result<(), CompileError> {
    let mut list = lists.remove(name).unwrap_or_default();
    let mut visited: HashSet<CompactString, ahash::RandomState> =
        HashSet::with_hasher(ahash::RandomState::new());
    let mut j = 0;
    while j < list.len() {
        let target = match &list[j] {
            RuleEntry::Include(target) => target.clone(),
            RuleEntry::Rule(_) => {
                j += 1;
                continue;
            }
        };
        list.remove(j);
        if &target == name || visited.contains(&target) {
            continue;
        }
        visited.insert(target.clone());
        let Some(source) = lists.get(&target) else {
            return Err(CompileError::UnknownInclude {
                state: target,
                in_state: name.clone(),
            });
        };
        let fresh: Vec<RuleEntry> = source
            .iter()
            .filter(|entry| !contains_entry(&list, entry))
            .cloned()
            .collect();
        list.splice(j..j, fresh);
        // j stays put: spliced entries may themselves be includes.
    }
    lists.insert(name.clone(), list);
    Ok(())
}

fn contains_entry(list: &[RuleEntry], entry: &RuleEntry) -> bool {
    list.iter().any(|present| match (present, entry) {
        (RuleEntry::Rule(a), RuleEntry::Rule(b)) => Arc::ptr_eq(a, b),
        (RuleEntry::Include(a), RuleEntry::Include(b)) => a == b,
        _ => false,
    })
}

fn check_transition(
    rule: &Arc<Rule>,
    in_state: &CompactString,
    states: &HashMap<CompactString, Arc<CompiledState>, ahash::RandomState>,
) -> Result<(), CompileError> {
    match &rule.transition {
        Some(Transition::Push(target) | Transition::Next(target)) => {
            if !states.contains_key(target) {
                return Err(CompileError::MissingState {
                    state: target.clone(),
                    token: rule.kind.clone(),
                    in_state: in_state.clone(),
                });
            }
        }
        Some(Transition::Pop(n)) if *n != 1 => {
            return Err(CompileError::InvalidPop {
                token: rule.kind.clone(),
                in_state: in_state.clone(),
                value: *n,
            });
        }
        _ => {}
    }
    Ok(())
}
