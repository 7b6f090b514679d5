use rstest::rstest;
use ucl::parse;

#[rstest]
fn hash_comments_run_to_end_of_line() {
    let doc = parse("# leading note\na = 1; # trailing note\nb = 2;\n").unwrap();
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.lookup_path("b").and_then(|v| v.as_i64()), Some(2));
}

#[rstest]
fn slash_slash_comments() {
    let doc = parse("// header\na = 1; // tail\nb = 2;\n").unwrap();
    assert_eq!(doc.len(), 2);
}

#[rstest]
fn block_comments_nest() {
    let doc = parse("a = 1; /* outer /* inner */ still outer */ b = 2;").unwrap();
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.lookup_path("b").and_then(|v| v.as_i64()), Some(2));
}

#[rstest]
fn deeply_nested_block_comment() {
    let doc = parse("/* /* /* /* x */ */ */ */ a = 1;").unwrap();
    assert_eq!(doc.lookup_path("a").and_then(|v| v.as_i64()), Some(1));
}

#[rstest]
fn unterminated_block_comment_is_an_error() {
    let err = parse("a = 1; /* /* */").unwrap_err();
    assert!(err.message.contains("unterminated comment"));
}

#[rstest]
fn comment_acts_as_a_separator() {
    let doc = parse("a = 1 /* split */ b = 2;").unwrap();
    assert_eq!(doc.len(), 2);
}

#[rstest]
fn comments_between_key_and_value() {
    let doc = parse("key /* here */ = /* there */ value;").unwrap();
    assert_eq!(doc.lookup_path("key").and_then(|v| v.as_str()), Some("value"));
}

#[rstest]
fn comment_markers_inside_strings_are_content() {
    let doc = parse("a = \"# not a comment\"; b = \"/* neither */\";").unwrap();
    assert_eq!(
        doc.lookup_path("a").and_then(|v| v.as_str()),
        Some("# not a comment")
    );
    assert_eq!(
        doc.lookup_path("b").and_then(|v| v.as_str()),
        Some("/* neither */")
    );
}
