use crate::ipc::helpers::{get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn teacher_exists(conn: &Connection, teacher_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row("SELECT 1 FROM users WHERE id = ?", [teacher_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(HandlerErr::db)
}

fn attendance_clock_in(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;
    if !teacher_exists(conn, &teacher_id)? {
        return Err(HandlerErr::not_found("teacher not found"));
    }

    let log_id = Uuid::new_v4().to_string();
    let clock_in_time = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO teacher_attendance(id, teacher_id, clock_in_time, clock_out_time)
         VALUES(?, ?, ?, NULL)",
        (&log_id, &teacher_id, &clock_in_time),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "teacher_attendance" })),
    })?;

    Ok(json!({ "logId": log_id, "clockInTime": clock_in_time }))
}

fn attendance_clock_out(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;

    // Close the most recent log that never got a clock-out.
    let open_log: Option<String> = conn
        .query_row(
            "SELECT id FROM teacher_attendance
             WHERE teacher_id = ? AND clock_out_time IS NULL
             ORDER BY clock_in_time DESC, rowid DESC
             LIMIT 1",
            [&teacher_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(HandlerErr::db)?;
    let Some(log_id) = open_log else {
        return Err(HandlerErr::new("not_clocked_in", "no open clock-in for this teacher"));
    };

    let clock_out_time = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE teacher_attendance SET clock_out_time = ? WHERE id = ?",
        (&clock_out_time, &log_id),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "teacher_attendance" })),
    })?;

    Ok(json!({ "logId": log_id, "clockOutTime": clock_out_time }))
}

fn attendance_view(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;

    let mut stmt = conn
        .prepare(
            "SELECT id, clock_in_time, clock_out_time
             FROM teacher_attendance
             WHERE teacher_id = ?
             ORDER BY rowid",
        )
        .map_err(HandlerErr::db)?;
    let logs = stmt
        .query_map([&teacher_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "clockInTime": r.get::<_, String>(1)?,
                "clockOutTime": r.get::<_, Option<String>>(2)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    Ok(json!({ "logs": logs }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.clockIn" => Some(with_db(state, req, attendance_clock_in)),
        "attendance.clockOut" => Some(with_db(state, req, attendance_clock_out)),
        "attendance.view" => Some(with_db(state, req, attendance_view)),
        _ => None,
    }
}
