use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn fixture_path(rel: &str) -> PathBuf {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    base.join("fixtures").join(rel)
}

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar(workspace: &Path, data_file: &Path) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_marksd");
    let mut child = Command::new(exe)
        .current_dir(workspace)
        .env("MARKSD_DATA_FILE", data_file)
        .env_remove("MARKSD_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn marksd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn names(result: &serde_json::Value) -> Vec<String> {
    result
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| s.get("name").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .collect()
}

fn workspace_with_fixture(prefix: &str) -> (PathBuf, PathBuf) {
    let workspace = temp_dir(prefix);
    let data = workspace.join("studentMarks.txt");
    std::fs::copy(fixture_path("studentMarks.txt"), &data).expect("copy fixture");
    (workspace, data)
}

#[test]
fn list_reports_derived_stats() {
    let (workspace, data) = workspace_with_fixture("marksd-list");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["count"], json!(6));
    assert_eq!(health["schema"], json!("coursework"));
    assert_eq!(health["load"]["source"], json!("file"));

    let list = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    let students = list["students"].as_array().cloned().unwrap_or_default();
    assert_eq!(students.len(), 6);
    let lee = students
        .iter()
        .find(|s| s["code"] == json!(9876))
        .expect("Lee Scott");
    assert_eq!(lee["stats"]["totalCoursework"], json!(44));
    assert_eq!(lee["stats"]["total"], json!(143));
    assert_eq!(lee["stats"]["grade"], json!("A"));
    assert_eq!(lee["courseMarks"], json!([17, 11, 16]));

    let get = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.get",
        json!({ "code": "1345" }),
    );
    assert_eq!(get["student"]["name"], json!("John Curry"));
    assert_eq!(get["student"]["stats"]["grade"], json!("D"));
    assert_eq!(get["breakdown"]["examPercent"], json!(45.0));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "students.get",
        json!({ "code": 1 }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn create_rejects_duplicates_and_persists() {
    let (workspace, data) = workspace_with_fixture("marksd-create");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({
            "code": 5000,
            "name": "  New Student ",
            "courseMarks": [20, "19", 18],
            "examMark": "90"
        }),
    );
    assert_eq!(created["student"]["name"], json!("New Student"));

    let dup = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "code": 5000, "name": "Other", "courseMarks": [1, 1, 1], "examMark": 1 }),
    );
    assert_eq!(dup, "duplicate_code");

    let bad = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "code": 5001, "name": "Other", "courseMarks": [1, 21, 1], "examMark": 1 }),
    );
    assert_eq!(bad, "invalid_record");

    let not_number = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "students.create",
        json!({ "code": 5002, "name": "Other", "courseMarks": [1, 2, 3], "examMark": "lots" }),
    );
    assert_eq!(not_number, "bad_params");

    let text = std::fs::read_to_string(&data).expect("read data file");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("7"));
    assert_eq!(text.lines().last(), Some("5000,New Student,20,19,18,90"));
}

#[test]
fn delete_and_update_follow_roster_rules() {
    let (workspace, data) = workspace_with_fixture("marksd-delete");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);
    let before = std::fs::read_to_string(&data).expect("read data file");

    let missing = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.delete",
        json!({ "code": 4242 }),
    );
    assert_eq!(missing["deleted"], json!(false));
    assert_eq!(std::fs::read_to_string(&data).expect("read"), before);

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.delete",
        json!({ "code": 8439 }),
    );
    assert_eq!(deleted["deleted"], json!(true));
    assert!(!std::fs::read_to_string(&data)
        .expect("read")
        .contains("Jake Hobbs"));

    let clash = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "students.update",
        json!({ "code": 1345, "newCode": 2345 }),
    );
    assert_eq!(clash, "duplicate_code");

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "code": 1345, "name": "John Curry Jr", "courseMarks": [20, 20, 20] }),
    );
    assert_eq!(updated["student"]["stats"]["totalCoursework"], json!(60));
    assert!(std::fs::read_to_string(&data)
        .expect("read")
        .contains("1345,John Curry Jr,20,20,20,45"));
}

#[test]
fn sort_filter_and_class_stats() {
    let (workspace, data) = workspace_with_fixture("marksd-sort");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    let sorted = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.sort",
        json!({ "key": "percentage", "ascending": false }),
    );
    let order = names(&sorted);
    assert_eq!(order.first().map(String::as_str), Some("Lee Scott"));
    assert_eq!(order.last().map(String::as_str), Some("Jake Hobbs"));

    let first_line = std::fs::read_to_string(&data)
        .expect("read")
        .lines()
        .nth(1)
        .map(|s| s.to_string());
    assert_eq!(first_line.as_deref(), Some("9876,Lee Scott,17,11,16,99"));

    let top = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.filter",
        json!({ "band": "top" }),
    );
    assert_eq!(names(&top).len(), 4);
    let failing = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.filter",
        json!({ "band": "failing" }),
    );
    assert!(names(&failing).is_empty());

    let stats = request_ok(&mut stdin, &mut reader, "4", "stats.class", json!({}));
    let mean = stats["exam"]["mean"].as_f64().expect("mean");
    let sd = stats["exam"]["stdDev"].as_f64().expect("stdDev");
    assert!((mean - 68.5).abs() < 1e-9);
    assert!((sd - 394.583_333_333_333_3_f64.sqrt()).abs() < 1e-9);

    let extremes = request_ok(&mut stdin, &mut reader, "5", "stats.extremes", json!({}));
    assert_eq!(extremes["highest"]["student"]["name"], json!("Lee Scott"));
    assert_eq!(extremes["lowest"]["student"]["name"], json!("Jake Hobbs"));

    let found = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.find",
        json!({ "name": "LEE SCOTT" }),
    );
    assert_eq!(names(&found), vec!["Lee Scott".to_string()]);
}

#[test]
fn missing_file_is_seeded_with_sample_data() {
    let workspace = temp_dir("marksd-missing");
    let data = workspace.join("studentMarks.txt");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["load"]["source"], json!("missing"));
    assert_eq!(health["count"], json!(5));
    let text = std::fs::read_to_string(&data).expect("sample data written");
    assert!(text.starts_with("5\n8439,Jake Hobbs,10,11,10,43\n"));
}

#[test]
fn exam_only_roster_via_store_open() {
    let (workspace, data) = workspace_with_fixture("marksd-exam");
    let exam_file = workspace.join("examMarks.txt");
    std::fs::copy(fixture_path("examMarks.txt"), &exam_file).expect("copy fixture");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "store.open",
        json!({ "path": exam_file.to_string_lossy(), "schema": "examOnly" }),
    );
    assert_eq!(opened["load"]["count"], json!(3));

    let sorted = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.sort",
        json!({ "key": "name" }),
    );
    assert_eq!(
        names(&sorted),
        vec!["Alice Brown", "bob green", "Carol White"]
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "code": "S010", "name": "Eve", "examMark": 70 }),
    );
    assert_eq!(created["student"]["stats"]["grade"], json!("B"));

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "code": "S002", "examMark": 81 }),
    );
    assert_eq!(updated["student"]["stats"]["grade"], json!("A"));

    let text = std::fs::read_to_string(&exam_file).expect("read");
    assert!(text.starts_with("4\n"));
    assert!(text.contains("S002,bob green,81,A\n"));

    let failing = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.filter",
        json!({ "band": "failing" }),
    );
    assert!(names(&failing).is_empty());
}

#[test]
fn protocol_errors_are_reported() {
    let (workspace, data) = workspace_with_fixture("marksd-protocol");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    writeln!(stdin, "not json").expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(v["error"]["code"], json!("bad_json"));

    let code = request_err(&mut stdin, &mut reader, "1", "classes.list", json!({}));
    assert_eq!(code, "not_implemented");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.sort",
        json!({ "key": "shoe size" }),
    );
    assert_eq!(code, "bad_params");
}

#[test]
fn exam_only_create_accepts_numeric_code() {
    let (workspace, data) = workspace_with_fixture("marksd-exam-numeric");
    let exam_file = workspace.join("examMarks.txt");
    std::fs::copy(fixture_path("examMarks.txt"), &exam_file).expect("copy fixture");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "store.open",
        json!({ "path": exam_file.to_string_lossy(), "schema": "examOnly" }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "code": 77, "name": "Num Code", "examMark": 91 }),
    );
    assert_eq!(created["student"]["code"], json!("77"));
    assert_eq!(created["student"]["stats"]["grade"], json!("A+"));
    assert!(std::fs::read_to_string(&exam_file)
        .expect("read")
        .contains("77,Num Code,91,A+\n"));
}

#[test]
fn broken_file_is_left_alone_until_reloaded() {
    let workspace = temp_dir("marksd-broken");
    let data = workspace.join("studentMarks.txt");
    let original = "3\n1,Ann,1,2,3,40\n2,Bob,4,5,6,200\n3,Cy,7,8,9,60\n";
    std::fs::write(&data, original).expect("write data");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["load"]["source"], json!("fallback"));
    assert_eq!(health["readOnly"], json!(true));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "code": 42, "name": "New", "courseMarks": [1, 1, 1], "examMark": 1 }),
    );
    assert_eq!(code, "load_failed");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "students.sort",
        json!({ "key": "code" }),
    );
    assert_eq!(code, "load_failed");
    assert_eq!(std::fs::read_to_string(&data).expect("read"), original);

    std::fs::write(&data, "1\n1,Ann,1,2,3,40\n").expect("fix data");
    let reloaded = request_ok(&mut stdin, &mut reader, "4", "store.reload", json!({}));
    assert_eq!(reloaded["load"]["source"], json!("file"));
    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.create",
        json!({ "code": 42, "name": "New", "courseMarks": [1, 1, 1], "examMark": 1 }),
    );
    assert!(std::fs::read_to_string(&data)
        .expect("read")
        .starts_with("2\n1,Ann,1,2,3,40\n"));
}

#[test]
fn repeated_codes_in_file_trigger_fallback() {
    let workspace = temp_dir("marksd-repeated");
    let data = workspace.join("studentMarks.txt");
    std::fs::write(&data, "2\n1,Ann,1,2,3,40\n1,Bob,4,5,6,50\n").expect("write data");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&workspace, &data);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["load"]["source"], json!("fallback"));
    assert!(health["load"]["warning"]
        .as_str()
        .expect("warning")
        .contains("more than once"));
}
