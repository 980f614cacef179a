use crate::ipc::helpers::{get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::recommend::{SlotTime, Weekday};
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

/// Day and times validated through the core types so stored rows are
/// always canonical ("Monday", "09:00") and exact-match lookups hold.
fn parse_slot(
    params: &serde_json::Value,
) -> Result<(Weekday, SlotTime, SlotTime), HandlerErr> {
    let day = Weekday::parse(&get_required_str(params, "dayOfWeek")?)?;
    let start = SlotTime::parse(&get_required_str(params, "startTime")?)?;
    let end = SlotTime::parse(&get_required_str(params, "endTime")?)?;
    Ok((day, start, end))
}

fn schedule_add(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;
    let (day, start, end) = parse_slot(params)?;
    let subject = get_required_str(params, "subject")?.trim().to_string();
    if subject.is_empty() {
        return Err(HandlerErr::bad_params("subject must not be empty"));
    }
    let room = get_required_str(params, "room")?.trim().to_string();
    if room.is_empty() {
        return Err(HandlerErr::bad_params("room must not be empty"));
    }

    if !teacher_exists(conn, &teacher_id)? {
        return Err(HandlerErr::not_found("teacher not found"));
    }

    let slot_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO schedules(id, teacher_id, day_of_week, start_time, end_time, subject, room)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &slot_id,
            &teacher_id,
            day.as_str(),
            start.canonical(),
            end.canonical(),
            &subject,
            &room,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "schedules" })),
    })?;

    Ok(json!({ "slotId": slot_id }))
}

fn schedule_view(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;

    let mut stmt = conn
        .prepare(
            "SELECT id, day_of_week, start_time, end_time, subject, room
             FROM schedules
             WHERE teacher_id = ?
             ORDER BY rowid",
        )
        .map_err(HandlerErr::db)?;
    let slots = stmt
        .query_map([&teacher_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "dayOfWeek": r.get::<_, String>(1)?,
                "startTime": r.get::<_, String>(2)?,
                "endTime": r.get::<_, String>(3)?,
                "subject": r.get::<_, String>(4)?,
                "room": r.get::<_, String>(5)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    Ok(json!({ "slots": slots }))
}

fn schedule_master(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    // Flat slot list with display names; the grid consumer buckets rows
    // into its own time bands.
    let mut stmt = conn
        .prepare(
            "SELECT sc.id, u.full_name, sc.day_of_week, sc.start_time, sc.end_time,
                    sc.subject, sc.room
             FROM schedules sc
             JOIN users u ON u.id = sc.teacher_id
             ORDER BY sc.rowid",
        )
        .map_err(HandlerErr::db)?;
    let slots = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "teacher": r.get::<_, String>(1)?,
                "day": r.get::<_, String>(2)?,
                "start": r.get::<_, String>(3)?,
                "end": r.get::<_, String>(4)?,
                "subject": r.get::<_, String>(5)?,
                "room": r.get::<_, String>(6)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    Ok(json!({ "slots": slots }))
}

fn availability_set(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;
    let (day, start, end) = parse_slot(params)?;
    // Stored as given; only the BUSY tag gates the substitute scan.
    let status = get_required_str(params, "status")?.trim().to_string();
    if status.is_empty() {
        return Err(HandlerErr::bad_params("status must not be empty"));
    }

    if !teacher_exists(conn, &teacher_id)? {
        return Err(HandlerErr::not_found("teacher not found"));
    }

    let mark_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO teacher_availability(id, teacher_id, day_of_week, start_time, end_time, status)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &mark_id,
            &teacher_id,
            day.as_str(),
            start.canonical(),
            end.canonical(),
            &status,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "teacher_availability" })),
    })?;

    Ok(json!({ "markId": mark_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.add" => Some(with_db(state, req, schedule_add)),
        "schedule.view" => Some(with_db(state, req, schedule_view)),
        "schedule.master" => Some(with_db(state, req, |conn, _| schedule_master(conn))),
        "availability.set" => Some(with_db(state, req, availability_set)),
        _ => None,
    }
}
