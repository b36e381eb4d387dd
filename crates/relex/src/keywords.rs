//! Keyword reclassification.

use std::sync::Arc;

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::rules::KindFn;

/// Build a kind transform that maps exact keyword text to a kind name.
///
/// Install the result on an identifier-shaped rule via [`RuleDef::kind`]
/// so that matches which happen to be keywords are reclassified; all other
/// matches keep the rule's default kind.
///
/// [`RuleDef::kind`]: crate::RuleDef::kind
///
/// # Example
///
/// ```rust
/// use relex::{compile, keywords, Pattern, RuleDef, RuleMap};
///
/// let mut lexer = compile(RuleMap::new().rule(
///     "identifier",
///     RuleDef::matching(Pattern::regex("[a-zA-Z]+")).kind(keywords([("kw", ["class"])])),
/// ))?;
/// let tokens = lexer.tokenize("class")?;
/// assert_eq!(tokens[0].kind, "kw");
/// let tokens = lexer.tokenize("className")?;
/// assert_eq!(tokens[0].kind, "identifier");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn keywords<I, K, W>(map: I) -> KindFn
where
    I: IntoIterator<Item = (K, W)>,
    K: Into<CompactString>,
    W: IntoIterator,
    W::Item: Into<CompactString>,
{
    let mut reverse: HashMap<CompactString, CompactString, ahash::RandomState> =
        HashMap::with_hasher(ahash::RandomState::new());
    for (kind, words) in map {
        let kind = kind.into();
        for word in words {
            reverse.insert(word.into(), kind.clone());
        }
    }
    Arc::new(move |text| reverse.get(text).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_keywords_to_their_kind() {
        let kw = keywords([("keyword", vec!["if", "else"]), ("bool", vec!["true"])]);
        assert_eq!(kw("if").as_deref(), Some("keyword"));
        assert_eq!(kw("else").as_deref(), Some("keyword"));
        assert_eq!(kw("true").as_deref(), Some("bool"));
    }

    #[test]
    fn non_keywords_fall_through() {
        let kw = keywords([("keyword", ["while"])]);
        assert_eq!(kw("whiles"), None);
        assert_eq!(kw(""), None);
    }
}
