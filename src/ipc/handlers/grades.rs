use crate::ipc::helpers::{
    get_optional_str, get_required_f64, get_required_str, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

/// Scores below this are counted as failing in class analytics.
const FAILING_THRESHOLD: f64 = 40.0;

fn student_exists(conn: &Connection, student_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(HandlerErr::db)
}

fn grades_add(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let subject = get_required_str(params, "subject")?.trim().to_string();
    if subject.is_empty() {
        return Err(HandlerErr::bad_params("subject must not be empty"));
    }
    let score = get_required_f64(params, "score")?;
    let term = get_optional_str(params, "term").unwrap_or_else(|| "Finals".to_string());

    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let grade_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO grades(id, student_id, subject, score, term) VALUES(?, ?, ?, ?, ?)",
        (&grade_id, &student_id, &subject, score, &term),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "grades" })),
    })?;

    Ok(json!({ "gradeId": grade_id }))
}

fn grades_for_student(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;

    let mut stmt = conn
        .prepare(
            "SELECT id, subject, score, term FROM grades WHERE student_id = ? ORDER BY rowid",
        )
        .map_err(HandlerErr::db)?;
    let grades = stmt
        .query_map([&student_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "subject": r.get::<_, String>(1)?,
                "score": r.get::<_, f64>(2)?,
                "term": r.get::<_, String>(3)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    if grades.is_empty() {
        return Err(HandlerErr::not_found("no grades found for this student"));
    }

    Ok(json!({ "grades": grades }))
}

fn grades_class_analytics(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_name = get_required_str(params, "className")?;

    // One pass over the joined rows, aggregated per student in class
    // roster order. Students without grades stay visible with a null
    // average and don't drag the class average.
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.full_name, g.score
             FROM students s
             LEFT JOIN grades g ON g.student_id = s.id
             WHERE s.class_name = ?
             ORDER BY s.rowid",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([&class_name], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<f64>>(2)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    struct Acc {
        full_name: String,
        sum: f64,
        count: i64,
        failing: i64,
    }

    let mut order: Vec<String> = Vec::new();
    let mut by_student: std::collections::HashMap<String, Acc> = std::collections::HashMap::new();
    for (student_id, full_name, score) in rows {
        let acc = by_student.entry(student_id.clone()).or_insert_with(|| {
            order.push(student_id);
            Acc {
                full_name,
                sum: 0.0,
                count: 0,
                failing: 0,
            }
        });
        if let Some(score) = score {
            acc.sum += score;
            acc.count += 1;
            if score < FAILING_THRESHOLD {
                acc.failing += 1;
            }
        }
    }

    let mut class_sum = 0.0;
    let mut class_count = 0i64;
    let students: Vec<serde_json::Value> = order
        .iter()
        .map(|id| {
            let acc = &by_student[id];
            let average = if acc.count > 0 {
                let avg = acc.sum / acc.count as f64;
                class_sum += avg;
                class_count += 1;
                Some(avg)
            } else {
                None
            };
            json!({
                "studentId": id,
                "fullName": acc.full_name,
                "average": average,
                "gradeCount": acc.count,
                "failingCount": acc.failing
            })
        })
        .collect();

    let class_average = if class_count > 0 {
        Some(class_sum / class_count as f64)
    } else {
        None
    };

    Ok(json!({
        "className": class_name,
        "students": students,
        "classAverage": class_average
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.add" => Some(with_db(state, req, grades_add)),
        "grades.forStudent" => Some(with_db(state, req, grades_for_student)),
        "grades.classAnalytics" => Some(with_db(state, req, grades_class_analytics)),
        _ => None,
    }
}
