//! User-facing rule descriptors.
//!
//! A lexer is described either as an ordered list of self-naming rules
//! ([`RuleList`]) or as an ordered map from token kind to pattern
//! alternatives ([`RuleMap`]). Stateful lexers group several such
//! specifications under named states ([`StateSet`]).
//!
//! Each alternative is a [`Pattern`]: a literal string or a regex source.
//! A [`RuleDef`] wraps alternatives together with per-rule options such as
//! state transitions, line-break accounting and kind/value transforms.

use std::sync::Arc;

use compact_str::CompactString;

/// Dynamic kind transform: maps matched text to a token kind, or `None` to
/// keep the rule's default kind. See [`crate::keywords`] for the common
/// keyword-reclassification case.
pub type KindFn = Arc<dyn Fn(&str) -> Option<CompactString> + Send + Sync>;

/// Value transform: maps matched text to the token's logical value.
pub type ValueFn = Arc<dyn Fn(&str) -> CompactString + Send + Sync>;

/// Flag set for one regex alternative.
///
/// Case-insensitive and multi-line matching are rejected at compile time:
/// the combined state regex has a single flag set, and token text is
/// compared literally. `unicode` must agree across all regex alternatives
/// of a state unless a fallback rule is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexFlags {
    pub unicode: bool,
    pub ignore_case: bool,
    pub multi_line: bool,
}

impl Default for RegexFlags {
    fn default() -> Self {
        Self {
            unicode: true,
            ignore_case: false,
            multi_line: false,
        }
    }
}

/// One pattern alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matched verbatim; escaped before entering the combined regex.
    Literal(CompactString),
    /// A regex source in [`regex`] syntax. Must not contain capture groups.
    Regex {
        source: CompactString,
        flags: RegexFlags,
    },
}

impl Pattern {
    #[must_use]
    pub fn lit(text: impl Into<CompactString>) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub fn regex(source: impl Into<CompactString>) -> Self {
        Self::Regex {
            source: source.into(),
            flags: RegexFlags::default(),
        }
    }

    #[must_use]
    pub fn regex_with(source: impl Into<CompactString>, flags: RegexFlags) -> Self {
        Self::Regex {
            source: source.into(),
            flags,
        }
    }

    pub(crate) fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Self::Literal(text.into())
    }
}

impl From<String> for Pattern {
    fn from(text: String) -> Self {
        Self::Literal(text.into())
    }
}

/// A single rule descriptor.
///
/// In list form the descriptor names its own kind ([`RuleDef::named`]); in
/// map form the kind comes from the map key and the descriptor only carries
/// overrides.
#[derive(Clone, Default)]
pub struct RuleDef {
    pub(crate) kind_name: Option<CompactString>,
    pub(crate) kind_fn: Option<KindFn>,
    pub(crate) value_fn: Option<ValueFn>,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) line_breaks: Option<bool>,
    pub(crate) push: Option<CompactString>,
    pub(crate) pop: Option<i64>,
    pub(crate) next: Option<CompactString>,
    pub(crate) error: bool,
    pub(crate) fallback: bool,
    pub(crate) should_throw: bool,
    pub(crate) include: Option<CompactString>,
}

impl RuleDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List-form constructor: a rule that names its own token kind.
    #[must_use]
    pub fn named(kind: impl Into<CompactString>) -> Self {
        Self {
            kind_name: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Shorthand for a rule with one pattern alternative.
    #[must_use]
    pub fn matching(pattern: impl Into<Pattern>) -> Self {
        Self::new().pattern(pattern)
    }

    /// List-form include entry: paste the rules of `state` at this position.
    #[must_use]
    pub fn include_state(state: impl Into<CompactString>) -> Self {
        Self {
            include: Some(state.into()),
            ..Self::default()
        }
    }

    /// Append one pattern alternative.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Append several pattern alternatives.
    #[must_use]
    pub fn patterns<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Pattern>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Install a dynamic kind transform, e.g. [`crate::keywords`].
    #[must_use]
    pub fn kind(mut self, f: KindFn) -> Self {
        self.kind_fn = Some(f);
        self
    }

    /// Install a value transform applied to the matched text.
    #[must_use]
    pub fn value(mut self, f: impl Fn(&str) -> CompactString + Send + Sync + 'static) -> Self {
        self.value_fn = Some(Arc::new(f));
        self
    }

    /// Declare whether the patterns may match line breaks. Implicitly true
    /// for error and fallback rules.
    #[must_use]
    pub fn line_breaks(mut self, yes: bool) -> Self {
        self.line_breaks = Some(yes);
        self
    }

    /// On match, push the current state and enter `state`.
    #[must_use]
    pub fn push(mut self, state: impl Into<CompactString>) -> Self {
        self.push = Some(state.into());
        self
    }

    /// On match, return to the most recently pushed state. Only `1` is
    /// accepted; other values are rejected at compile time.
    #[must_use]
    pub fn pop(mut self, n: i64) -> Self {
        self.pop = Some(n);
        self
    }

    /// On match, switch to `state` without touching the stack.
    #[must_use]
    pub fn next(mut self, state: impl Into<CompactString>) -> Self {
        self.next = Some(state.into());
        self
    }

    /// Mark this as the error rule: it consumes the remaining input when no
    /// other rule matches, emitting a recoverable token.
    #[must_use]
    pub fn error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Mark this as the fallback rule: it consumes the gap between the
    /// current position and the next successful match.
    #[must_use]
    pub fn fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Raise a syntax failure when this rule matches. The error rule
    /// selected for the state takes precedence on match failure; a throwing
    /// rule only fires when its own pattern matches.
    #[must_use]
    pub fn should_throw(mut self) -> Self {
        self.should_throw = true;
        self
    }
}

/// Shorthand descriptor for a recoverable error rule.
#[must_use]
pub fn error() -> RuleDef {
    RuleDef {
        error: true,
        ..RuleDef::default()
    }
}

/// Shorthand descriptor for a fallback rule.
#[must_use]
pub fn fallback() -> RuleDef {
    RuleDef {
        fallback: true,
        ..RuleDef::default()
    }
}

/// One alternative inside a map-form entry: a plain pattern or a full
/// descriptor override.
#[derive(Clone)]
pub enum MapAlt {
    Pattern(Pattern),
    Def(RuleDef),
}

/// The value side of one map-form entry: an ordered mix of plain patterns
/// and descriptor overrides.
#[derive(Clone, Default)]
pub struct MapVal(pub(crate) Vec<MapAlt>);

impl From<&str> for MapVal {
    fn from(text: &str) -> Self {
        Self(vec![MapAlt::Pattern(Pattern::from(text))])
    }
}

impl From<String> for MapVal {
    fn from(text: String) -> Self {
        Self(vec![MapAlt::Pattern(Pattern::from(text))])
    }
}

impl From<Pattern> for MapVal {
    fn from(pattern: Pattern) -> Self {
        Self(vec![MapAlt::Pattern(pattern)])
    }
}

impl From<RuleDef> for MapVal {
    fn from(def: RuleDef) -> Self {
        Self(vec![MapAlt::Def(def)])
    }
}

impl From<Vec<Pattern>> for MapVal {
    fn from(patterns: Vec<Pattern>) -> Self {
        Self(patterns.into_iter().map(MapAlt::Pattern).collect())
    }
}

impl From<Vec<RuleDef>> for MapVal {
    fn from(defs: Vec<RuleDef>) -> Self {
        Self(defs.into_iter().map(MapAlt::Def).collect())
    }
}

impl From<Vec<MapAlt>> for MapVal {
    fn from(alts: Vec<MapAlt>) -> Self {
        Self(alts)
    }
}

impl<const N: usize> From<[&str; N]> for MapVal {
    fn from(texts: [&str; N]) -> Self {
        Self(
            texts
                .into_iter()
                .map(|text| MapAlt::Pattern(Pattern::from(text)))
                .collect(),
        )
    }
}

impl<const N: usize> From<[Pattern; N]> for MapVal {
    fn from(patterns: [Pattern; N]) -> Self {
        Self(patterns.into_iter().map(MapAlt::Pattern).collect())
    }
}

impl<const N: usize> From<[RuleDef; N]> for MapVal {
    fn from(defs: [RuleDef; N]) -> Self {
        Self(defs.into_iter().map(MapAlt::Def).collect())
    }
}

#[derive(Clone)]
pub(crate) enum MapEntry {
    Rule(CompactString, MapVal),
    Include(CompactString),
}

/// Map-form specification: ordered token kind to alternatives.
#[derive(Clone, Default)]
pub struct RuleMap {
    pub(crate) entries: Vec<MapEntry>,
}

impl RuleMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Earlier rules outrank later rules on ties.
    #[must_use]
    pub fn rule(mut self, kind: impl Into<CompactString>, val: impl Into<MapVal>) -> Self {
        self.entries.push(MapEntry::Rule(kind.into(), val.into()));
        self
    }

    /// Paste another state's rules at this position (stateful lexers only).
    #[must_use]
    pub fn include(mut self, state: impl Into<CompactString>) -> Self {
        self.entries.push(MapEntry::Include(state.into()));
        self
    }
}

/// List-form specification: ordered self-naming descriptors.
#[derive(Clone, Default)]
pub struct RuleList(pub(crate) Vec<RuleDef>);

impl RuleList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn def(mut self, def: RuleDef) -> Self {
        self.0.push(def);
        self
    }
}

impl From<Vec<RuleDef>> for RuleList {
    fn from(defs: Vec<RuleDef>) -> Self {
        Self(defs)
    }
}

impl FromIterator<RuleDef> for RuleList {
    fn from_iter<I: IntoIterator<Item = RuleDef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Either accepted form of a rule specification.
#[derive(Clone)]
pub enum RuleSpec {
    List(RuleList),
    Map(RuleMap),
}

impl From<RuleList> for RuleSpec {
    fn from(list: RuleList) -> Self {
        Self::List(list)
    }
}

impl From<RuleMap> for RuleSpec {
    fn from(map: RuleMap) -> Self {
        Self::Map(map)
    }
}

impl From<Vec<RuleDef>> for RuleSpec {
    fn from(defs: Vec<RuleDef>) -> Self {
        Self::List(RuleList(defs))
    }
}

/// A stateful specification: named states plus an optional rule set merged
/// into every state.
#[derive(Clone, Default)]
pub struct StateSet {
    pub(crate) states: Vec<(CompactString, RuleSpec)>,
    pub(crate) all: Option<RuleSpec>,
    pub(crate) start: Option<CompactString>,
}

impl StateSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named state. The first state declared is the default start.
    #[must_use]
    pub fn state(mut self, name: impl Into<CompactString>, rules: impl Into<RuleSpec>) -> Self {
        self.states.push((name.into(), rules.into()));
        self
    }

    /// Rules appended to every state.
    #[must_use]
    pub fn all(mut self, rules: impl Into<RuleSpec>) -> Self {
        self.all = Some(rules.into());
        self
    }

    /// Override the start state.
    #[must_use]
    pub fn start(mut self, name: impl Into<CompactString>) -> Self {
        self.start = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_str_is_a_literal() {
        assert_eq!(Pattern::from("++"), Pattern::Literal("++".into()));
    }

    #[test]
    fn regex_defaults_to_unicode() {
        let Pattern::Regex { flags, .. } = Pattern::regex(r"\w+") else {
            panic!("expected a regex pattern");
        };
        assert!(flags.unicode);
        assert!(!flags.ignore_case);
        assert!(!flags.multi_line);
    }

    #[test]
    fn map_val_from_str_array_keeps_order() {
        let val = MapVal::from(["=", "==", "+"]);
        let texts: Vec<_> = val
            .0
            .iter()
            .map(|alt| match alt {
                MapAlt::Pattern(Pattern::Literal(text)) => text.as_str(),
                _ => panic!("expected literals"),
            })
            .collect();
        assert_eq!(texts, ["=", "==", "+"]);
    }

    #[test]
    fn def_builder_accumulates_patterns() {
        let def = RuleDef::matching("a").pattern(Pattern::regex("b+"));
        assert_eq!(def.patterns.len(), 2);
        assert!(def.patterns[1].is_regex());
    }

    #[test]
    fn sentinels_set_their_flag() {
        assert!(error().error);
        assert!(fallback().fallback);
        assert!(!fallback().error);
    }
}
