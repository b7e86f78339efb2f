use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
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
    let exe = env!("CARGO_BIN_EXE_schoold");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schoold");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn send(
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
    let value = send(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = send(stdin, reader, id, method, params);
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{} should fail", method);
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn no_data_toast(id: &str, allow: Option<bool>) -> (String, serde_json::Value) {
    let mut params = json!({ "kind": "error", "message": "No students found", "code": "no_data" });
    if let Some(allow) = allow {
        params["allowNoDataErrors"] = json!(allow);
    }
    (id.to_string(), params)
}

#[test]
fn no_data_errors_are_suppressed_unless_allowed() {
    let workspace = temp_dir("schoold-notify");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let (id, params) = no_data_toast("1", None);
    let pushed = request_ok(&mut stdin, &mut reader, &id, "notify.push", params);
    assert_eq!(pushed["shown"], false);

    let other = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "notify.push",
        json!({ "kind": "error", "message": "Save failed", "code": "db_insert_failed" }),
    );
    assert_eq!(other["shown"], true);
    assert_eq!(other["toast"]["kind"], "error");

    let (id, params) = no_data_toast("3", Some(true));
    let pushed = request_ok(&mut stdin, &mut reader, &id, "notify.push", params);
    assert_eq!(pushed["shown"], true);
    assert_eq!(pushed["toast"]["code"], "no_data");

    // The workspace can opt in for every screen.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "settings.set",
        json!({ "key": "ui.allowNoDataErrors", "value": true }),
    );
    let (id, params) = no_data_toast("6", None);
    let pushed = request_ok(&mut stdin, &mut reader, &id, "notify.push", params);
    assert_eq!(pushed["shown"], true);
    let (id, params) = no_data_toast("7", Some(false));
    let pushed = request_ok(&mut stdin, &mut reader, &id, "notify.push", params);
    assert_eq!(pushed["shown"], false);

    let listed = request_ok(&mut stdin, &mut reader, "8", "notify.list", json!({}));
    let toasts = listed["toasts"].as_array().cloned().unwrap_or_default();
    assert_eq!(toasts.len(), 3);

    let first = toasts[0]["id"].as_u64().expect("toast id");
    let dismissed = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "notify.dismiss",
        json!({ "id": first }),
    );
    assert_eq!(dismissed["dismissed"], true);

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "10",
        "notify.push",
        json!({ "kind": "info", "message": "   " }),
    );
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn oversized_toast_duration_is_rejected_and_sidecar_keeps_serving() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "1",
        "notify.push",
        json!({ "kind": "info", "message": "hi", "durationMs": 9_000_000_000_000_000i64 }),
    );
    assert_eq!(code, "bad_params");

    let day = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "notify.push",
        json!({ "kind": "info", "message": "hi", "durationMs": 86_400_000 }),
    );
    assert_eq!(day["shown"], true);

    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert!(health["version"].is_string());
}

#[test]
fn confirmations_resolve_once() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let asked = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "notify.confirm",
        json!({ "title": "Delete student?", "message": "This cannot be undone." }),
    );
    let id = asked["confirmation"]["id"].as_u64().expect("confirmation id");
    assert_eq!(asked["confirmation"]["confirmLabel"], "Confirm");
    assert_eq!(asked["confirmation"]["cancelLabel"], "Cancel");

    let listed = request_ok(&mut stdin, &mut reader, "2", "notify.list", json!({}));
    assert_eq!(listed["confirmations"].as_array().map(|a| a.len()), Some(1));

    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "notify.resolve",
        json!({ "id": id, "confirmed": true }),
    );
    assert_eq!(resolved["confirmed"], true);
    assert_eq!(resolved["confirmation"]["title"], "Delete student?");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "notify.resolve",
        json!({ "id": id, "confirmed": false }),
    );
    assert_eq!(code, "not_found");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "notify.confirm",
        json!({ "title": " ", "message": "x" }),
    );
    assert_eq!(code, "bad_params");
}

#[test]
fn id_cards_for_selected_students() {
    let workspace = temp_dir("schoold-idcards");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.set",
        json!({
            "userName": "office",
            "role": "staff",
            "permissions": ["student.view", "student.manage"]
        }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "records.create",
        json!({
            "entity": "student",
            "data": {
                "firstName": "Ada",
                "lastName": "Lovelace",
                "admissionNo": "A-17",
                "className": "8",
                "section": "C"
            }
        }),
    );
    let id = created["record"]["id"].as_str().expect("id").to_string();

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "idcards.generate",
        json!({ "entity": "student", "ids": [id] }),
    );
    assert_eq!(code, "forbidden");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "session.set",
        json!({
            "userName": "office",
            "role": "staff",
            "permissions": ["student.view", "idcard.generate"]
        }),
    );
    let cards = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "idcards.generate",
        json!({ "entity": "student", "ids": [id], "issuedOn": "2026-09-01" }),
    );
    let card = &cards["cards"][0];
    assert_eq!(card["cardNo"], "STU-A-17");
    assert_eq!(card["fullName"], "Ada Lovelace");
    assert_eq!(card["detail"], "Class 8-C");
    assert_eq!(card["issuedOn"], "2026-09-01");
    assert_eq!(card["validUntil"], "2027-09-01");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "7",
        "idcards.generate",
        json!({ "entity": "student", "ids": ["missing"] }),
    );
    assert_eq!(code, "not_found");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "8",
        "idcards.generate",
        json!({ "entity": "exam" }),
    );
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}
