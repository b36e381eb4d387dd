//! Behavioral tests for the stateless tokenizer: fallback splitting,
//! priority ordering, error recovery and cursor bookkeeping.

use relex::{compile, error, fallback, keywords, Lexer, Pattern, RuleDef, RuleMap};

fn dot_lexer() -> Lexer {
    compile(
        RuleMap::new()
            .rule("op", Pattern::regex(r"[._]"))
            .rule("text", fallback()),
    )
    .unwrap()
}

#[test]
fn fallback_splits_the_gaps() {
    let mut lexer = dot_lexer();
    let tokens = lexer.tokenize(".this_that.").unwrap();
    let got: Vec<(&str, &str)> = tokens
        .iter()
        .map(|t| (t.kind.as_str(), t.value.as_str()))
        .collect();
    assert_eq!(
        got,
        [
            ("op", "."),
            ("text", "this"),
            ("op", "_"),
            ("text", "that"),
            ("op", "."),
        ]
    );
}

#[test]
fn fallback_spans_newlines_with_correct_offsets() {
    let mut lexer = dot_lexer();
    let tokens = lexer.tokenize(".this_th\nat.").unwrap();
    let values: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(values, [".", "this", "_", "th\nat", "."]);
    let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
    assert_eq!(offsets, [0, 1, 5, 6, 11]);

    // The token after the embedded newline starts on line 2, column 3.
    assert_eq!(tokens[3].line_breaks, 1);
    assert_eq!(tokens[4].line, 2);
    assert_eq!(tokens[4].column, 3);
}

#[test]
fn fallback_tokens_are_never_empty() {
    let mut lexer = dot_lexer();
    for token in lexer.tokenize("..__..").unwrap() {
        assert!(!token.text.is_empty());
    }
}

#[test]
fn longer_literals_win_within_a_rule() {
    let mut lexer = compile(
        RuleMap::new()
            .rule("op", ["=", "==", "===", "+", "+="])
            .rule("ws", Pattern::regex(" +")),
    )
    .unwrap();
    let values: Vec<_> = lexer
        .tokenize("=== +=")
        .unwrap()
        .into_iter()
        .filter(|t| t.kind != "ws")
        .map(|t| t.value)
        .collect();
    assert_eq!(values, ["===", "+="]);
}

#[test]
fn earlier_rules_win_across_rules() {
    // Both rules match "let"; declaration order decides.
    let mut lexer = compile(
        RuleMap::new()
            .rule("keyword", "let")
            .rule("word", Pattern::regex("[a-z]+")),
    )
    .unwrap();
    let tokens = lexer.tokenize("let").unwrap();
    assert_eq!(tokens[0].kind, "keyword");
}

#[test]
fn unmatched_input_raises_and_then_yields_the_sentinel() {
    let mut lexer = compile(RuleMap::new().rule("digits", Pattern::regex("[0-9]+"))).unwrap();
    lexer.reset("invalid");
    let err = lexer.next_token().unwrap_err();
    assert!(err.message.starts_with("invalid syntax at line 1 col 1:"));
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 1);
    // The failure consumed the rest of the buffer.
    assert_eq!(lexer.next_token().unwrap(), None);
}

#[test]
fn declared_error_rule_recovers_instead_of_raising() {
    let mut lexer = compile(
        RuleMap::new()
            .rule("digits", Pattern::regex("[0-9]+"))
            .rule("error", error()),
    )
    .unwrap();
    let tokens = lexer.tokenize("123foo").unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, "digits");
    assert_eq!(tokens[0].value, "123");
    assert_eq!(tokens[1].kind, "error");
    assert_eq!(tokens[1].value, "foo");
    assert_eq!(tokens[1].offset, 3);
}

#[test]
fn keywords_reclassify_exact_matches() {
    let mut lexer = compile(RuleMap::new().rule(
        "identifier",
        RuleDef::matching(Pattern::regex("[a-zA-Z]+")).kind(keywords([("kw", ["class"])])),
    ))
    .unwrap();
    assert_eq!(lexer.tokenize("class").unwrap()[0].kind, "kw");
    assert_eq!(lexer.tokenize("className").unwrap()[0].kind, "identifier");
}

#[test]
fn value_transform_rewrites_the_value_only() {
    let mut lexer = compile(RuleMap::new().rule(
        "string",
        RuleDef::matching(Pattern::regex("\"[^\"\n]*\"")).value(|text| {
            text.trim_matches('"').into()
        }),
    ))
    .unwrap();
    let tokens = lexer.tokenize("\"hi\"").unwrap();
    assert_eq!(tokens[0].value, "hi");
    assert_eq!(tokens[0].text, "\"hi\"");
    assert_eq!(tokens[0].to_string(), "hi");
}

#[test]
fn tokens_cover_the_whole_input() {
    let mut lexer = dot_lexer();
    let input = "a.b_c\n_d.";
    let tokens = lexer.tokenize(input).unwrap();
    let mut offset = 0;
    for token in &tokens {
        assert_eq!(token.offset, offset);
        assert_eq!(&input[offset..offset + token.text.len()], token.text.as_str());
        offset += token.text.len();
    }
    assert_eq!(offset, input.len());
}

#[test]
fn iteration_yields_until_the_sentinel() {
    let mut lexer = dot_lexer();
    lexer.reset("a.b");
    let kinds: Vec<_> = (&mut lexer)
        .map(|token| token.unwrap().kind)
        .collect();
    assert_eq!(kinds, ["text", "op", "text"]);
    assert_eq!(lexer.next_token().unwrap(), None);
}

#[test]
fn reset_rewinds_everything() {
    let mut lexer = dot_lexer();
    lexer.reset("one.two");
    let _ = lexer.next_token().unwrap();
    let _ = lexer.next_token().unwrap();
    lexer.reset("three");
    assert_eq!(lexer.index(), 0);
    assert_eq!(lexer.line(), 1);
    assert_eq!(lexer.column(), 1);
    let token = lexer.next_token().unwrap().unwrap();
    assert_eq!(token.value, "three");
    assert_eq!(token.offset, 0);
}

#[test]
fn save_and_reset_with_resume_identically() {
    let input = ".this_th\nat.more_text.";
    let mut original = dot_lexer();
    original.reset(input);
    // Stop mid-stream, with a token queued by the fallback protocol.
    for _ in 0..3 {
        original.next_token().unwrap();
    }
    let snapshot = original.save();
    let remaining = input[original.index()..].to_string();

    let mut resumed = original.fresh();
    resumed.reset_with(remaining, &snapshot);

    loop {
        let expected = original.next_token().unwrap();
        let got = resumed.next_token().unwrap();
        match (expected, got) {
            (None, None) => break,
            (Some(expected), Some(got)) => {
                assert_eq!(expected.kind, got.kind);
                assert_eq!(expected.value, got.value);
                assert_eq!(expected.line, got.line);
                assert_eq!(expected.column, got.column);
            }
            (expected, got) => panic!("streams diverged: {expected:?} vs {got:?}"),
        }
    }
}

#[test]
fn fresh_lexers_do_not_disturb_their_parent() {
    let mut parent = dot_lexer();
    parent.reset("a.b");
    parent.next_token().unwrap();
    let parent_index = parent.index();
    let parent_line = parent.line();
    let parent_column = parent.column();

    let mut child = parent.fresh();
    let tokens = child.tokenize("x_y_z").unwrap();
    assert_eq!(tokens.len(), 5);

    assert_eq!(parent.index(), parent_index);
    assert_eq!(parent.line(), parent_line);
    assert_eq!(parent.column(), parent_column);
    let token = parent.next_token().unwrap().unwrap();
    assert_eq!(token.value, ".");
}

#[test]
fn line_and_column_track_multiline_tokens() {
    let mut lexer = compile(
        RuleMap::new()
            .rule("word", Pattern::regex("[a-z]+"))
            .rule(
                "ws",
                RuleDef::matching(Pattern::regex(r"\s+")).line_breaks(true),
            ),
    )
    .unwrap();
    let tokens = lexer.tokenize("one\ntwo three").unwrap();
    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[0].column, 1);
    // "two" starts at line 2, column 1.
    assert_eq!(tokens[2].line, 2);
    assert_eq!(tokens[2].column, 1);
    // "three" follows a plain space.
    assert_eq!(tokens[4].line, 2);
    assert_eq!(tokens[4].column, 5);
}

#[test]
fn list_form_rules_compile_too() {
    let mut lexer = compile(vec![
        RuleDef::named("ws").pattern(Pattern::regex(" +")),
        RuleDef::named("word").pattern(Pattern::regex("[a-z]+")),
    ])
    .unwrap();
    let kinds: Vec<_> = lexer
        .tokenize("a b")
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(kinds, ["word", "ws", "word"]);
}

#[test]
fn include_needs_a_stateful_lexer() {
    let result = compile(vec![RuleDef::include_state("other")]);
    assert!(matches!(
        result,
        Err(relex::CompileError::StatelessInclude)
    ));
}

#[test]
fn throwing_rule_past_a_gap_emits_the_gap_then_fails() {
    let mut lexer = compile(
        RuleMap::new()
            .rule(
                "stop",
                RuleDef::matching(Pattern::regex("!")).should_throw(),
            )
            .rule("text", fallback()),
    )
    .unwrap();
    lexer.reset("abc!def");
    let gap = lexer.next_token().unwrap().unwrap();
    assert_eq!(gap.kind, "text");
    assert_eq!(gap.value, "abc");
    let err = lexer.next_token().unwrap_err();
    assert!(err.message.starts_with("invalid syntax at line 1 col 4:"));
    assert_eq!(lexer.next_token().unwrap(), None);
}
