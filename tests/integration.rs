use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_apidoc")));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Source tree with one file per `(name, content)` pair.
fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// -- single endpoint --

#[test]
fn documented_endpoint_to_stdout() {
    let assert = cmd()
        .args(["-i", &fixture_path("basic"), "--no-markdown", "--line-ending", "lf"])
        .assert()
        .success()
        .stderr(predicate::str::contains("WARN").not());
    let data = stdout_json(assert.get_output());

    assert_eq!(data.as_array().unwrap().len(), 1);
    let endpoint = &data[0];
    assert_eq!(endpoint["type"], "get");
    assert_eq!(endpoint["url"], "/user/:id");
    assert_eq!(endpoint["title"], "Get User");
    assert_eq!(endpoint["filename"], "user.js");
    assert_eq!(endpoint["version"], "0.0.0");
    assert_eq!(endpoint["name"], "GetUserId");
    assert_eq!(endpoint["group"], "user");

    let params = endpoint["parameter"]["fields"]["Parameter"].as_array().unwrap();
    assert_eq!(params.len(), 1);
    for (key, expected) in [
        ("field", json!("id")),
        ("type", json!("Number")),
        ("optional", json!(false)),
        ("description", json!("User ID")),
        ("group", json!("Parameter")),
    ] {
        assert_eq!(params[0][key], expected, "{key}");
    }
}

#[test]
fn markdown_is_rendered_by_default() {
    let assert = cmd().args(["-i", &fixture_path("basic")]).assert().success();
    let data = stdout_json(assert.get_output());
    assert_eq!(data[0]["parameter"]["fields"]["Parameter"][0]["description"], "<p>User ID</p>");
}

#[test]
fn required_param_missing_from_url_warns() {
    let dir = tree(&[(
        "user.js",
        "/**\n * @api {get} /user Get User\n * @apiParam {String} id User ID\n */\n",
    )]);
    cmd()
        .args(["-i", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "@apiParam 'id' was defined but does not appear in URL of @api 'Get User'",
        ))
        .stderr(predicate::str::contains("URL contains a parameter").not());
}

// -- failures --

#[test]
fn invalid_version_fails_the_run() {
    let dir = tree(&[(
        "user.js",
        "/**\n * @api {get} /user/:id Get User\n * @apiVersion 1.2\n * @apiParam {Number} id User ID\n */\n",
    )]);
    cmd()
        .args(["-i", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Version format not valid."))
        .stderr(predicate::str::contains("user.js"));
}

#[test]
fn two_definitions_in_one_block_fail() {
    let dir = tree(&[("a.js", "/**\n * @apiDefine A\n * @apiDefine B\n */\n")]);
    cmd()
        .args(["-i", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Only one definition is allowed in the same block."));
}

#[test]
fn unknown_use_fails() {
    let dir = tree(&[("a.js", "/**\n * @api {get} /a A\n * @apiUse Missing\n */\n")]);
    cmd()
        .args(["-i", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not defined with @apiDefine"));
}

#[test]
fn empty_input_reports_no_files() {
    let dir = TempDir::new().unwrap();
    cmd()
        .args(["-i", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No files found."));
}

// -- cross references and filters --

#[test]
fn use_merges_define_and_drops_it() {
    let assert = cmd()
        .args(["-i", &fixture_path("mixed"), "--no-markdown"])
        .assert()
        .success();
    let data = stdout_json(assert.get_output());
    let names: Vec<&str> = data.as_array().unwrap().iter().map(|b| b["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["PublishTemp", "ListUsers"]);

    let users = &data[1];
    assert_eq!(users["parameter"]["fields"]["Parameter"][0]["field"], "token");
    assert!(users.get("use").is_none());
}

#[test]
fn mqtt_only_keeps_publish_block() {
    let assert = cmd()
        .args(["-i", &fixture_path("mixed"), "--mqtt-only", "-v"])
        .assert()
        .success()
        .stderr(predicate::str::contains("MQTT-only mode: filtered to 1 MQTT endpoints"));
    let data = stdout_json(assert.get_output());
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["type"], "publish");
    assert_eq!(data[0]["topic"], "sensors/+/temp");
    assert_eq!(data[0]["qos"], 1);
}

#[test]
fn broken_inline_schema_fails_when_requested() {
    let src = "/**\n * @mqtt publish Temp\n * @topic sensors/temp\n * @payloadSchema inline {not json\n */\n";
    let dir = tree(&[("broker.js", src)]);
    cmd()
        .args(["-i", dir.path().to_str().unwrap()])
        .assert()
        .success();
    cmd()
        .args(["-i", dir.path().to_str().unwrap(), "--fail-on-mqtt-schema-error"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid MQTT payload schema"));
}

#[test]
fn filter_by_group() {
    let assert = cmd()
        .args(["-i", &fixture_path("mixed"), "--filter-by", "apiGroup=Sensors"])
        .assert()
        .success();
    let data = stdout_json(assert.get_output());
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["name"], "PublishTemp");
}

#[test]
fn versions_resolve_to_nearest_lower_definition() {
    let src = "\
/**
 * @apiDefine Auth
 * @apiVersion 1.0.0
 * @apiHeader {String} auth_v1 Old header
 */
/**
 * @apiDefine Auth
 * @apiVersion 1.5.0
 * @apiHeader {String} auth_v15 Current header
 */
/**
 * @apiDefine Auth
 * @apiVersion 2.0.0
 * @apiHeader {String} auth_v2 Future header
 */
/**
 * @api {get} /a A
 * @apiVersion 1.6.0
 * @apiUse Auth
 */
";
    let dir = tree(&[("a.js", src)]);
    let assert = cmd().args(["-i", dir.path().to_str().unwrap()]).assert().success();
    let data = stdout_json(assert.get_output());
    assert_eq!(data[0]["header"]["fields"]["Header"][0]["field"], "auth_v15");
}

// -- output files --

#[test]
fn output_dir_gets_data_and_project() {
    let out = TempDir::new().unwrap();
    cmd()
        .args(["-i", &fixture_path("mixed"), "-o", out.path().to_str().unwrap(), "--line-ending", "crlf"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let data = fs::read_to_string(out.path().join("api_data.json")).unwrap();
    assert!(data.contains("\r\n"));
    assert!(!data.replace("\r\n", "").contains('\n'));

    let project: Value = serde_json::from_str(&fs::read_to_string(out.path().join("api_project.json")).unwrap()).unwrap();
    assert_eq!(project["name"], "mixed");
    assert_eq!(project["title"], "Mixed API");
    assert_eq!(project["apidoc"], "4.0.0");
    assert_eq!(project["sampleUrl"], false);
    assert_eq!(project["generator"]["name"], "apidoc");
}

#[test]
fn crlf_sources_parse_like_lf() {
    let src = "/**\r\n * @api {get} /user/:id Get User\r\n * @apiParam {Number} id User ID\r\n */\r\n";
    let dir = tree(&[("user.js", src)]);
    let assert = cmd()
        .args(["-i", dir.path().to_str().unwrap(), "--line-ending", "lf"])
        .assert()
        .success();
    let output = assert.get_output();
    assert!(!output.stdout.contains(&b'\r'));
    assert_eq!(stdout_json(output)[0]["title"], "Get User");
}

#[test]
fn category_restricts_tags() {
    let src = "/**\n * @api {get} /a A\n * @topic sensors/temp\n */\n";
    let dir = tree(&[("a.js", src)]);
    let input = format!("{}:api", dir.path().display());
    let assert = cmd().args(["-i", &input]).assert().success();
    let data = stdout_json(assert.get_output());
    assert!(data[0].get("topic").is_none());
}
