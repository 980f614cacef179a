mod test_support;

use serde_json::json;
use test_support::{request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("schoold-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let teacher = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "users.register",
        json!({
            "username": "smoke1",
            "password": "123",
            "fullName": "Smoke Teacher",
            "phoneNumber": "60120000000"
        }),
    );
    let teacher_id = teacher
        .get("userId")
        .and_then(|v| v.as_str())
        .expect("userId")
        .to_string();

    let _ = request_ok(&mut stdin, &mut reader, "4", "users.teachers", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "users.login",
        json!({ "username": "smoke1", "password": "123" }),
    );

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.add",
        json!({ "fullName": "Smoke Student", "className": "Smoke Class" }),
    );
    let student_id = student
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    let _ = request_ok(&mut stdin, &mut reader, "7", "students.list", json!({}));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "grades.add",
        json!({ "studentId": student_id, "subject": "Mathematics", "score": 77.0 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "grades.forStudent",
        json!({ "studentId": student_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "grades.classAnalytics",
        json!({ "className": "Smoke Class" }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "attendance.clockIn",
        json!({ "teacherId": teacher_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "attendance.clockOut",
        json!({ "teacherId": teacher_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "attendance.view",
        json!({ "teacherId": teacher_id }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "schedule.add",
        json!({
            "teacherId": teacher_id,
            "dayOfWeek": "Monday",
            "startTime": "09:00",
            "endTime": "10:00",
            "subject": "Mathematics",
            "room": "Class 1"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "schedule.view",
        json!({ "teacherId": teacher_id }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "16", "schedule.master", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "availability.set",
        json!({
            "teacherId": teacher_id,
            "dayOfWeek": "Friday",
            "startTime": "08:00",
            "endTime": "09:00",
            "status": "BUSY"
        }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "18",
        "ai.recommendSubstitute",
        json!({
            "date": "2024-01-01",
            "dayOfWeek": "Tuesday",
            "startTime": "09:00",
            "endTime": "10:00",
            "subjectNeeded": "Mathematics"
        }),
    );

    let unknown = request(&mut stdin, &mut reader, "19", "nope.nothing", json!({}));
    assert_eq!(unknown.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        unknown
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
