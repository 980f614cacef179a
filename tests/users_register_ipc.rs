mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn register_login_and_teacher_listing_semantics() {
    let workspace = temp_dir("schoold-users");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Role defaults to teacher when omitted.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "users.register",
        json!({
            "username": "math1",
            "password": "123",
            "fullName": "Mr. John Smith",
            "phoneNumber": "60123456780"
        }),
    );
    assert_eq!(created.get("role").and_then(|v| v.as_str()), Some("teacher"));
    let john = created
        .get("userId")
        .and_then(|v| v.as_str())
        .expect("userId")
        .to_string();

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "users.register",
        json!({
            "username": "math1",
            "password": "456",
            "fullName": "Someone Else"
        }),
    );
    assert_eq!(code, "username_taken");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "users.register",
        json!({
            "username": "weird",
            "password": "x",
            "fullName": "Weird Role",
            "role": "janitor"
        }),
    );
    assert_eq!(code, "bad_params");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "users.register",
        json!({
            "username": "admin",
            "password": "admin123",
            "fullName": "Principal Skinner",
            "role": "admin"
        }),
    );

    // Admins never show up in the teacher directory.
    let listed = request_ok(&mut stdin, &mut reader, "6", "users.teachers", json!({}));
    let teachers = listed
        .get("teachers")
        .and_then(|v| v.as_array())
        .expect("teachers array");
    assert_eq!(teachers.len(), 1);
    assert_eq!(
        teachers[0].get("id").and_then(|v| v.as_str()),
        Some(john.as_str())
    );
    assert_eq!(
        teachers[0].get("phoneNumber").and_then(|v| v.as_str()),
        Some("60123456780")
    );

    let logged_in = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "users.login",
        json!({ "username": "math1", "password": "123" }),
    );
    assert_eq!(
        logged_in.get("userId").and_then(|v| v.as_str()),
        Some(john.as_str())
    );
    assert_eq!(
        logged_in.get("fullName").and_then(|v| v.as_str()),
        Some("Mr. John Smith")
    );

    // Wrong password and unknown username report the same code.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "users.login",
        json!({ "username": "math1", "password": "wrong" }),
    );
    assert_eq!(code, "invalid_credentials");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "9",
        "users.login",
        json!({ "username": "ghost", "password": "123" }),
    );
    assert_eq!(code, "invalid_credentials");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn methods_require_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let code = request_err(&mut stdin, &mut reader, "1", "users.teachers", json!({}));
    assert_eq!(code, "no_workspace");
}
