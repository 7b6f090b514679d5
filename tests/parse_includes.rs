use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::rc::Rc;

use rstest::rstest;
use ucl::{ErrorKind, Fetcher, MacroAction, Parser};

fn write_file(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[rstest]
fn include_splices_content_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let inner = write_file(dir.path(), "inner.conf", "from_include = 1;\n");

    let mut parser = Parser::new();
    parser
        .add_string(&format!("before = 1;\n.include \"{inner}\"\nafter = 2;\n"))
        .unwrap();
    let doc = parser.get_object().unwrap();
    assert_eq!(doc.len(), 3);
    assert_eq!(doc.lookup_path("from_include").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(doc.lookup_path("after").and_then(|v| v.as_i64()), Some(2));
}

#[rstest]
fn nested_includes() {
    let dir = tempfile::tempdir().unwrap();
    let deepest = write_file(dir.path(), "deepest.conf", "c = 3;\n");
    let middle = write_file(
        dir.path(),
        "middle.conf",
        &format!("b = 2;\n.include \"{deepest}\"\n"),
    );

    let mut parser = Parser::new();
    parser
        .add_string(&format!("a = 1;\n.include \"{middle}\"\n"))
        .unwrap();
    let doc = parser.get_object().unwrap();
    assert_eq!(doc.len(), 3);
    assert_eq!(doc.lookup_path("c").and_then(|v| v.as_i64()), Some(3));
}

#[rstest]
fn include_respects_existing_priority() {
    let dir = tempfile::tempdir().unwrap();
    let inner = write_file(dir.path(), "override.conf", "setting = included;\n");

    let mut parser = Parser::new();
    parser
        .add_string(&format!("setting = original;\n.include \"{inner}\"\n"))
        .unwrap();
    let doc = parser.get_object().unwrap();
    // Included content arrives at priority 0; the existing value wins.
    assert_eq!(
        doc.lookup_path("setting").and_then(|v| v.as_str()),
        Some("original")
    );
}

#[rstest]
fn include_target_from_variable() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "module.conf", "loaded = yes;\n");

    let mut parser = Parser::new();
    parser.register_variable("CONFDIR", dir.path().to_string_lossy());
    parser
        .add_string(".include \"${CONFDIR}/module.conf\"\n")
        .unwrap();
    let doc = parser.get_object().unwrap();
    assert_eq!(doc.lookup_path("loaded").and_then(|v| v.as_bool()), Some(true));
}

#[rstest]
fn include_nesting_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = write_file(dir.path(), "leaf.conf", "leaf = 1;\n");
    for i in 0..20 {
        target = write_file(
            dir.path(),
            &format!("level{i}.conf"),
            &format!(".include \"{target}\"\n"),
        );
    }

    let mut parser = Parser::new();
    let err = parser
        .add_string(&format!(".include \"{target}\"\n"))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RecursionTooDeep);
}

#[rstest]
fn missing_include_is_an_io_error() {
    let mut parser = Parser::new();
    let err = parser
        .add_string(".include \"/definitely/not/here.conf\"\n")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
}

#[rstest]
fn unknown_macro_is_an_error() {
    let mut parser = Parser::new();
    let err = parser.add_string(".bogus \"anything\"\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Macro);
    assert!(err.message.contains("bogus"));
}

#[rstest]
fn user_macro_receives_the_body() {
    let seen = Rc::new(RefCell::new(Vec::<String>::new()));
    let log = Rc::clone(&seen);

    let mut parser = Parser::new();
    parser.register_macro(
        "note",
        Box::new(move |body| {
            log.borrow_mut().push(body.to_string());
            Ok(MacroAction::Nothing)
        }),
    );
    parser
        .add_string("a = 1;\n.note \"quoted body\"\n.note { braced body }\n.note bare;\nb = 2;\n")
        .unwrap();
    let doc = parser.get_object().unwrap();
    assert_eq!(doc.len(), 2);
    assert_eq!(
        seen.borrow().as_slice(),
        ["quoted body", "braced body ", "bare"]
    );
}

#[rstest]
fn user_macro_can_push_a_chunk() {
    let mut parser = Parser::new();
    parser.register_macro(
        "inline",
        Box::new(|body| {
            Ok(MacroAction::PushChunk {
                data: format!("{body} = injected;\n"),
                priority: 0,
            })
        }),
    );
    parser.add_string(".inline newkey;\nafter = 1;\n").unwrap();
    let doc = parser.get_object().unwrap();
    assert_eq!(
        doc.lookup_path("newkey").and_then(|v| v.as_str()),
        Some("injected")
    );
    assert_eq!(doc.lookup_path("after").and_then(|v| v.as_i64()), Some(1));
}

#[rstest]
fn failing_macro_aborts_the_parse() {
    let mut parser = Parser::new();
    parser.register_macro("fail", Box::new(|_| Err("broken handler".to_string())));
    let err = parser.add_string(".fail \"x\"\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Macro);
    assert!(err.message.contains("broken handler"));
}

#[rstest]
fn includes_requires_a_valid_signature() {
    let dir = tempfile::tempdir().unwrap();
    let target = write_file(dir.path(), "signed.conf", "secure = 1;\n");
    write_file(dir.path(), "signed.conf.sig", "not-a-real-signature");

    // The default fetcher has no keys, so verification fails.
    let mut parser = Parser::new();
    let err = parser
        .add_string(&format!(".includes \"{target}\"\n"))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Signature);

    struct TrustingFetcher;
    impl Fetcher for TrustingFetcher {
        fn verify(&mut self, _data: &[u8], _signature: &[u8]) -> Result<(), String> {
            Ok(())
        }
    }

    let mut parser = Parser::new();
    parser.set_fetcher(Box::new(TrustingFetcher));
    parser
        .add_string(&format!(".includes \"{target}\"\n"))
        .unwrap();
    let doc = parser.get_object().unwrap();
    assert_eq!(doc.lookup_path("secure").and_then(|v| v.as_i64()), Some(1));
}

#[rstest]
fn custom_fetcher_serves_urls() {
    struct MapFetcher;
    impl Fetcher for MapFetcher {
        fn fetch_url(&mut self, url: &str) -> io::Result<Vec<u8>> {
            match url {
                "config://remote" => Ok(b"remote_key = 1;\n".to_vec()),
                _ => Err(io::Error::new(io::ErrorKind::NotFound, "no such document")),
            }
        }
    }

    let mut parser = Parser::new();
    parser.set_fetcher(Box::new(MapFetcher));
    parser.add_string(".include \"config://remote\"\n").unwrap();
    let doc = parser.get_object().unwrap();
    assert_eq!(doc.lookup_path("remote_key").and_then(|v| v.as_i64()), Some(1));
}
