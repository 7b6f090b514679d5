use assert_cmd::Command;
use predicates::prelude::*;

fn ucl() -> Command {
    Command::cargo_bin("ucl").unwrap()
}

#[test]
fn converts_stdin_config_to_json() {
    ucl()
        .write_stdin("port = 80;\nname = server;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"port\": 80"))
        .stdout(predicate::str::contains("\"name\": \"server\""));
}

#[test]
fn converts_json_to_config() {
    ucl()
        .args(["--format", "ucl"])
        .write_stdin(r#"{"size": 10}"#)
        .assert()
        .success()
        .stdout("size = 10;\n");
}

#[test]
fn compact_json_format() {
    ucl()
        .args(["--format", "compact_json"])
        .write_stdin("a = 1; a = 2;")
        .assert()
        .success()
        .stdout("{\"a\":[1,2]}\n");
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("app.conf");
    let output = dir.path().join("app.json");
    std::fs::write(&input, "workers = 4;\nlisten = \"0.0.0.0:80\";\n").unwrap();

    ucl()
        .args(["--in"])
        .arg(&input)
        .args(["--out"])
        .arg(&output)
        .args(["--format", "compact_json"])
        .assert()
        .success();

    let rendered = std::fs::read_to_string(&output).unwrap();
    assert_eq!(rendered, "{\"workers\":4,\"listen\":\"0.0.0.0:80\"}\n");
}

#[test]
fn missing_input_exits_noinput() {
    ucl()
        .args(["--in", "/nonexistent/definitely/missing.conf"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("missing.conf"));
}

#[test]
fn syntax_error_exits_dataerr() {
    ucl()
        .write_stdin("key = \"unterminated")
        .assert()
        .code(65)
        .stderr(predicate::str::contains("unterminated string"));
}

#[test]
fn schema_validation_pass_and_fail() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.json");
    std::fs::write(
        &schema,
        r#"{"type":"object","properties":{"port":{"type":"integer","minimum":1,"maximum":65535}},"required":["port"]}"#,
    )
    .unwrap();

    ucl()
        .args(["--schema"])
        .arg(&schema)
        .write_stdin("port = 80;")
        .assert()
        .success();

    ucl()
        .args(["--schema"])
        .arg(&schema)
        .write_stdin("port = 100000;")
        .assert()
        .code(65)
        .stderr(predicate::str::contains("validation failed"));
}
