//! The tokenizer runtime.
//!
//! A [`Lexer`] is a mutable cursor over an immutable compiled rule set and
//! an owned input buffer. [`Lexer::next_token`] runs to completion
//! synchronously; there is no internal I/O and no shared mutable state, so
//! tokenizers built from the same rules are fully independent.

use std::sync::Arc;

use compact_str::CompactString;

use crate::compile::CompiledState;
use crate::error::LexError;
use crate::normalize::{Rule, Transition};
use crate::states::StateMap;
use crate::token::Token;

/// Resumable cursor position, produced by [`Lexer::save`] and consumed by
/// [`Lexer::reset_with`].
///
/// `queued_group` and `queued_text` carry the one-token look-ahead of the
/// fallback protocol; `queued_throw` carries a failure deferred by a
/// throwing rule matched past a gap.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    pub line: u32,
    pub column: u32,
    pub state: CompactString,
    pub stack: Vec<CompactString>,
    pub queued_group: Option<usize>,
    pub queued_text: CompactString,
    pub queued_throw: Option<LexError>,
}

/// A stateful tokenizer.
///
/// Build one with [`crate::compile`] or [`crate::states`], load input with
/// [`reset`](Lexer::reset), then pull tokens with
/// [`next_token`](Lexer::next_token) or by iterating. The compiled rule set
/// is shared; cloning or [`fresh`](Lexer::fresh)-spawning a lexer never
/// recompiles anything.
#[derive(Clone)]
pub struct Lexer {
    states: Arc<StateMap>,
    current: Arc<CompiledState>,
    state: CompactString,
    stack: Vec<CompactString>,
    buffer: String,
    index: usize,
    line: u32,
    column: u32,
    queued_group: Option<usize>,
    queued_text: CompactString,
    queued_throw: Option<LexError>,
}

impl Lexer {
    pub(crate) fn new(states: Arc<StateMap>) -> Self {
        let start = states.start.clone();
        let current = states.states[&start].clone();
        Self {
            states,
            current,
            state: start,
            stack: Vec::new(),
            buffer: String::new(),
            index: 0,
            line: 1,
            column: 1,
            queued_group: None,
            queued_text: CompactString::default(),
            queued_throw: None,
        }
    }

    /// Load `input` and rewind to the start state.
    pub fn reset(&mut self, input: impl Into<String>) -> &mut Self {
        self.buffer = input.into();
        self.index = 0;
        self.line = 1;
        self.column = 1;
        self.stack.clear();
        self.queued_group = None;
        self.queued_text = CompactString::default();
        self.queued_throw = None;
        let start = self.states.start.clone();
        self.enter(start);
        self
    }

    /// Load `input` and resume from a previously saved snapshot. `input`
    /// is expected to be the part of the original buffer that was unread
    /// when the snapshot was taken.
    pub fn reset_with(&mut self, input: impl Into<String>, snapshot: &Snapshot) -> &mut Self {
        self.buffer = input.into();
        self.index = 0;
        self.line = snapshot.line;
        self.column = snapshot.column;
        self.stack = snapshot.stack.clone();
        self.queued_group = snapshot.queued_group;
        self.queued_text = snapshot.queued_text.clone();
        self.queued_throw = snapshot.queued_throw.clone();
        self.enter(snapshot.state.clone());
        self
    }

    /// Capture everything needed to resume tokenizing from this point.
    #[must_use]
    pub fn save(&self) -> Snapshot {
        Snapshot {
            line: self.line,
            column: self.column,
            state: self.state.clone(),
            stack: self.stack.clone(),
            queued_group: self.queued_group,
            queued_text: self.queued_text.clone(),
            queued_throw: self.queued_throw.clone(),
        }
    }

    /// A fresh tokenizer sharing this one's compiled states, with cleared
    /// input and cursor.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self::new(self.states.clone())
    }

    /// Switch the active state. Empty names and the current state are
    /// no-ops, as are names no state was compiled for.
    pub fn set_state(&mut self, state: impl Into<CompactString>) {
        let state = state.into();
        if state.is_empty() || state == self.state {
            return;
        }
        self.enter(state);
    }

    /// Push the current state and switch to `state`.
    pub fn push_state(&mut self, state: impl Into<CompactString>) {
        self.stack.push(self.state.clone());
        self.set_state(state);
    }

    /// Return to the most recently pushed state. Popping an empty stack
    /// leaves the current state in place.
    pub fn pop_state(&mut self) {
        if let Some(previous) = self.stack.pop() {
            self.set_state(previous);
        }
    }

    fn enter(&mut self, state: CompactString) {
        if let Some(compiled) = self.states.states.get(&state) {
            self.current = compiled.clone();
            self.state = state;
        }
    }

    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether some rule could ever emit a token of `kind`. Conservatively
    /// true when any rule carries a dynamic kind transform, since such
    /// kinds are not enumerable.
    #[must_use]
    pub fn has(&self, kind: &str) -> bool {
        self.states.states.values().any(|state| {
            state
                .groups
                .iter()
                .chain(state.fast.values())
                .chain(std::iter::once(&state.error))
                .any(|rule| rule.kind == kind || rule.kind_fn.is_some())
        })
    }

    /// Produce the next token, or `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`LexError`] when a throwing rule fires, including the
    /// synthesized default error rule. Afterwards the cursor sits at the
    /// end of the buffer, so the following call yields `Ok(None)`.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        // A fallback split queued the real token: emit it without running
        // the regex again.
        if let Some(group) = self.queued_group.take() {
            let text = std::mem::take(&mut self.queued_text);
            let Some(rule) = self.current.groups.get(group).cloned() else {
                return Err(self.protocol_error());
            };
            return self.emit(&rule, &text).map(Some);
        }

        if let Some(err) = self.queued_throw.take() {
            self.index = self.buffer.len();
            return Err(err);
        }

        if self.index == self.buffer.len() {
            return Ok(None);
        }

        // Single-character dispatch. Populated only when no fallback rule
        // exists.
        if !self.current.fast.is_empty() {
            if let Some(ch) = self.buffer[self.index..].chars().next() {
                if let Some(rule) = self.current.fast.get(&ch).cloned() {
                    let text =
                        CompactString::from(&self.buffer[self.index..self.index + ch.len_utf8()]);
                    return self.emit(&rule, &text).map(Some);
                }
            }
        }

        let hay = &self.buffer[self.index..];
        let error_rule = self.current.error.clone();

        let Some(caps) = self.current.regex.captures(hay) else {
            // Nothing matches ahead: the error (or fallback) rule takes
            // the rest of the buffer.
            let text = CompactString::from(hay);
            return self.emit(&error_rule, &text).map(Some);
        };

        let Some((group, start, end)) = resolve_group(&caps) else {
            return Err(self.protocol_error());
        };

        if !self.current.sticky && start > 0 {
            // The match sits past a gap: the gap becomes a fallback token
            // now, the matched token is queued for the next call.
            let gap = CompactString::from(&hay[..start]);
            let matched = CompactString::from(&hay[start..end]);
            let rule = self.current.groups[group].clone();
            if rule.should_throw {
                let token = self.emit(&error_rule, &gap)?;
                let phantom = self.make_token(&rule, &matched);
                self.queued_throw = Some(self.syntax_error(&phantom));
                return Ok(Some(token));
            }
            self.queued_group = Some(group);
            self.queued_text = matched;
            return self.emit(&error_rule, &gap).map(Some);
        }

        let matched = CompactString::from(&hay[start..end]);
        let rule = self.current.groups[group].clone();
        self.emit(&rule, &matched).map(Some)
    }

    /// Reset with `input` and collect every token.
    ///
    /// # Errors
    ///
    /// Stops at the first [`LexError`].
    pub fn tokenize(&mut self, input: impl Into<String>) -> Result<Vec<Token>, LexError> {
        self.reset(input);
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn make_token(&self, rule: &Rule, text: &str) -> Token {
        let line_breaks = if rule.line_breaks {
            u32::try_from(memchr::memchr_iter(b'\n', text.as_bytes()).count()).unwrap_or(u32::MAX)
        } else {
            0
        };
        let kind = rule
            .kind_fn
            .as_ref()
            .and_then(|f| f(text))
            .unwrap_or_else(|| rule.kind.clone());
        let value = rule
            .value_fn
            .as_ref()
            .map_or_else(|| CompactString::from(text), |f| f(text));
        Token {
            kind,
            value,
            text: CompactString::from(text),
            offset: self.index,
            line_breaks,
            line: self.line,
            column: self.column,
        }
    }

    /// Build the token for `text`, advance the cursor past it, then apply
    /// the rule's transition or raise its failure.
    fn emit(&mut self, rule: &Rule, text: &str) -> Result<Token, LexError> {
        let token = self.make_token(rule, text);

        let len = text.len();
        self.index += len;
        self.line += token.line_breaks;
        if token.line_breaks > 0 {
            if let Some(last) = memchr::memrchr(b'\n', text.as_bytes()) {
                self.column = u32::try_from(len - last).unwrap_or(u32::MAX);
            }
        } else {
            self.column = self
                .column
                .saturating_add(u32::try_from(len).unwrap_or(u32::MAX));
        }

        if rule.should_throw {
            let err = self.syntax_error(&token);
            self.index = self.buffer.len();
            return Err(err);
        }

        match &rule.transition {
            Some(Transition::Pop(_)) => self.pop_state(),
            Some(Transition::Push(state)) => self.push_state(state.clone()),
            Some(Transition::Next(state)) => self.set_state(state.clone()),
            None => {}
        }

        Ok(token)
    }

    fn syntax_error(&self, token: &Token) -> LexError {
        LexError {
            message: self.format_error(Some(token), "invalid syntax"),
            offset: token.offset,
            line: token.line,
            column: token.column,
        }
    }

    /// Raised only if the compiled groups and the regex disagree, which a
    /// correct compiler never produces.
    fn protocol_error(&self) -> LexError {
        LexError {
            message: format!(
                "Cannot find token kind for matched text at line {} col {}",
                self.line, self.column
            ),
            offset: self.index,
            line: self.line,
            column: self.column,
        }
    }

    /// Render a multi-line diagnostic pointing at `token`, or at the
    /// current position when `token` is `None` (end of input):
    ///
    /// ```text
    /// invalid syntax at line 2 col 4:
    ///
    /// 1  let x = 1
    /// 2  let ? = 2
    ///        ^
    /// 3  let y = 3
    /// ```
    ///
    /// Up to two context lines are shown on either side of the target.
    #[must_use]
    pub fn format_error(&self, token: Option<&Token>, message: &str) -> String {
        let (line, column) = match token {
            Some(token) => (token.line, token.column),
            None => (self.line, self.column),
        };

        let lines: Vec<&str> = self.buffer.split('\n').collect();
        let target = line as usize;
        let first = target.saturating_sub(2).max(1);
        let last = (target + 2).min(lines.len());
        let width = last.to_string().len();

        let mut out = Vec::with_capacity(last.saturating_sub(first) + 4);
        out.push(format!("{message} at line {line} col {column}:"));
        out.push(String::new());
        for no in first..=last {
            out.push(format!("{no:>width$}  {}", lines[no - 1]));
            if no == target {
                let pad = width + 2 + column.saturating_sub(1) as usize;
                out.push(format!("{}^", " ".repeat(pad)));
            }
        }
        out.join("\n")
    }
}

/// Map a multi-alternation match back to its rule: the first defined
/// top-level capture group identifies the winner.
fn resolve_group(caps: &regex::Captures<'_>) -> Option<(usize, usize, usize)> {
    let full = caps.get(0)?;
    for i in 1..caps.len() {
        if caps.get(i).is_some() {
            return Some((i - 1, full.start(), full.end()));
        }
    }
    None
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::rules::{Pattern, RuleMap};

    fn lexer(map: RuleMap) -> super::Lexer {
        crate::compile(map).unwrap()
    }

    #[test]
    fn format_error_points_at_the_column() {
        let mut lex = lexer(
            RuleMap::new()
                .rule("word", Pattern::regex("[a-z]+"))
                .rule("nl", crate::rules::RuleDef::matching(Pattern::regex(r"\n")).line_breaks(true)),
        );
        lex.reset("abc\nde?f\nghi");
        let err = loop {
            match lex.next_token() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected a syntax failure"),
                Err(err) => break err,
            }
        };
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
        let expected = "\
invalid syntax at line 2 col 3:

1  abc
2  de?f
     ^
3  ghi";
        assert_eq!(err.message, expected);
    }

    #[test]
    fn format_error_without_token_uses_the_cursor() {
        let mut lex = lexer(RuleMap::new().rule("word", Pattern::regex("[a-z]+")));
        lex.reset("abc");
        let _ = lex.next_token().unwrap();
        let report = lex.format_error(None, "unexpected end of input");
        assert!(report.starts_with("unexpected end of input at line 1 col 4:"));
    }

    #[test]
    fn has_reports_static_kinds() {
        let lex = lexer(RuleMap::new().rule("word", Pattern::regex("[a-z]+")));
        assert!(lex.has("word"));
        assert!(lex.has("error")); // synthesized default error rule
        assert!(!lex.has("number"));
    }

    #[test]
    fn has_is_conservative_with_kind_transforms() {
        let lex = lexer(RuleMap::new().rule(
            "word",
            crate::rules::RuleDef::matching(Pattern::regex("[a-z]+"))
                .kind(crate::keywords([("kw", ["if"])])),
        ));
        assert!(lex.has("anything"));
    }

    #[test]
    fn set_state_ignores_unknown_names() {
        let mut lex = lexer(RuleMap::new().rule("word", Pattern::regex("[a-z]+")));
        lex.set_state("ghost");
        assert_eq!(lex.state(), "start");
    }
}
