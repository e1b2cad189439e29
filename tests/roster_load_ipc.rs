use rust_xlsxwriter::Workbook;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

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

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_examsplitd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn examsplitd");
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
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        !value.get("ok").and_then(|v| v.as_bool()).unwrap_or(true),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value.get("error").cloned().expect("error object")
}

/// Fixture workbook: two title/metadata rows, header on the 3rd row,
/// then one data row per student.
fn write_fixture(path: &Path, students: usize) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .write_string(0, 0, "Math Exam Roster")
        .expect("title");
    let headers = [
        "No.",
        "Student Name",
        "Extra Time 25%",
        "Separate Room",
        "Enlarged Exam",
        "Exam Read Aloud",
    ];
    for (col, label) in headers.iter().enumerate() {
        worksheet
            .write_string(2, col as u16, *label)
            .expect("header cell");
    }
    for i in 0..students {
        let row = 3 + i as u32;
        worksheet
            .write_number(row, 0, (i + 1) as f64)
            .expect("identifier");
        worksheet
            .write_string(row, 1, format!("Student {}", i + 1))
            .expect("name");
        if i % 2 == 0 {
            worksheet.write_string(row, 2, "yes").expect("extra time");
        }
    }
    workbook.save(path).expect("save fixture");
}

#[test]
fn load_selects_columns_and_counts_students() {
    let dir = temp_dir("examsplit-roster-load");
    let fixture = dir.join("class.xlsx");
    write_fixture(&fixture, 6);

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "roster.load",
        json!({ "path": fixture.to_string_lossy() }),
    );

    assert_eq!(result["studentCount"], json!(6));
    assert_eq!(
        result["columns"],
        json!([
            "No.",
            "Student Name",
            "Attendance",
            "Submission",
            "Extra Time 25%",
            "Separate Room",
            "Enlarged Exam",
            "Exam Read Aloud",
        ])
    );

    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(health["rosterLoaded"], json!(true));
    assert_eq!(health["studentCount"], json!(6));
}

#[test]
fn load_drops_fully_empty_rows() {
    let dir = temp_dir("examsplit-roster-gaps");
    let fixture = dir.join("gaps.xlsx");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Roster").expect("title");
    worksheet.write_string(2, 0, "No.").expect("h0");
    worksheet.write_string(2, 1, "Student Name").expect("h1");
    worksheet.write_number(3, 0, 1.0).expect("r1");
    worksheet.write_string(3, 1, "A").expect("r1 name");
    // Row 4 left fully empty.
    worksheet.write_number(5, 0, 2.0).expect("r2");
    worksheet.write_string(5, 1, "B").expect("r2 name");
    workbook.save(&fixture).expect("save fixture");

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "roster.load",
        json!({ "path": fixture.to_string_lossy() }),
    );
    assert_eq!(result["studentCount"], json!(2));
}

#[test]
fn load_missing_file_is_parse_failed_without_state_change() {
    let dir = temp_dir("examsplit-roster-missing");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "roster.load",
        json!({ "path": dir.join("nope.xlsx").to_string_lossy() }),
    );
    assert_eq!(error["code"], json!("parse_failed"));

    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(health["rosterLoaded"], json!(false));
}

#[test]
fn load_workbook_without_header_row_is_parse_failed() {
    let dir = temp_dir("examsplit-roster-noheader");
    let fixture = dir.join("short.xlsx");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "only a title").expect("title");
    workbook.save(&fixture).expect("save fixture");

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "roster.load",
        json!({ "path": fixture.to_string_lossy() }),
    );
    assert_eq!(error["code"], json!("parse_failed"));
}

#[test]
fn load_with_rule_overrides() {
    let dir = temp_dir("examsplit-roster-rules");
    let fixture = dir.join("custom.xlsx");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Roster").expect("title");
    for (col, label) in ["Id", "Full Name", "Added Minutes", "Quiet Room"]
        .iter()
        .enumerate()
    {
        worksheet
            .write_string(2, col as u16, *label)
            .expect("header cell");
    }
    worksheet.write_number(3, 0, 1.0).expect("id");
    worksheet.write_string(3, 1, "Dana").expect("name");
    workbook.save(&fixture).expect("save fixture");

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "roster.load",
        json!({
            "path": fixture.to_string_lossy(),
            "rules": {
                "identifier": "Id",
                "name": "Full Name",
                "extraTimeContains": "added minutes",
                "accommodations": ["Quiet Room"],
            }
        }),
    );
    assert_eq!(
        result["columns"],
        json!([
            "Id",
            "Full Name",
            "Attendance",
            "Submission",
            "Added Minutes",
            "Quiet Room",
        ])
    );
    assert_eq!(result["studentCount"], json!(1));
}

#[test]
fn reloading_a_roster_resets_the_allocation() {
    let dir = temp_dir("examsplit-roster-reload");
    let fixture = dir.join("class.xlsx");
    write_fixture(&fixture, 5);

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "roster.load",
        json!({ "path": fixture.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "rooms.add",
        json!({ "name": "101", "count": 3 }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "roster.load",
        json!({ "path": fixture.to_string_lossy() }),
    );
    let list = request_ok(&mut stdin, &mut reader, "4", "rooms.list", json!({}));
    assert_eq!(list["allocatedCount"], json!(0));
    assert_eq!(list["rooms"], json!([]));
}
