use assert_cmd::Command;
use predicates::prelude::*;

fn cargo_bin() -> &'static str {
    "streamson"
}

#[test]
fn extract_pulls_out_matched_elements() {
    let input = r#"{"users":["john","carl","bob"]}"#;
    Command::cargo_bin(cargo_bin())
        .unwrap()
        .args(["extract", "-m", r#"s:{"users"}[]"#])
        .write_stdin(input)
        .assert()
        .success()
        .stdout("\"john\"\"carl\"\"bob\"");
}

#[test]
fn extract_honors_before_after_separator() {
    let input = r#"{"users":["john","carl"]}"#;
    Command::cargo_bin(cargo_bin())
        .unwrap()
        .args([
            "extract",
            "-m",
            r#"s:{"users"}[]"#,
            "-b",
            "[",
            "-a",
            "]",
            "-S",
            ",",
        ])
        .write_stdin(input)
        .assert()
        .success()
        .stdout("[\"john\",\"carl\"]");
}

#[test]
fn filter_drops_matched_elements() {
    let input = r#"{"a":1,"b":2,"c":3}"#;
    Command::cargo_bin(cargo_bin())
        .unwrap()
        .args(["filter", "-m", r#"s:{"b"}"#])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(r#"{"a":1,"c":3}"#);
}

#[test]
fn convert_replaces_matched_elements() {
    let input = r#"{"a":[1,2,3]}"#;
    Command::cargo_bin(cargo_bin())
        .unwrap()
        .args(["convert", "-m", r#"s:{"a"}[1]"#, "-h", "r:0"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(r#"{"a":[1,0,3]}"#);
}

#[test]
fn trigger_passes_everything_through_unchanged() {
    let input = r#"{"a":1,"b":[2,3]}"#;
    Command::cargo_bin(cargo_bin())
        .unwrap()
        .args(["trigger", "-m", r#"s:{"a"}"#])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(input);
}

#[test]
fn all_reports_structure_on_stderr() {
    let input = r#"{"users":["a","b"]}"#;
    Command::cargo_bin(cargo_bin())
        .unwrap()
        .arg("all")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(input)
        .stderr(predicate::str::contains("JSON structure:"));
}

#[test]
fn unknown_matcher_name_is_a_configuration_error() {
    Command::cargo_bin(cargo_bin())
        .unwrap()
        .args(["extract", "-m", "bogus:xyz"])
        .write_stdin("{}")
        .assert()
        .failure();
}
