use crate::ipc::helpers::{get_optional_str, get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

fn password_digest(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

fn users_register(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let username = get_required_str(params, "username")?.trim().to_string();
    if username.is_empty() {
        return Err(HandlerErr::bad_params("username must not be empty"));
    }
    let password = get_required_str(params, "password")?;
    if password.is_empty() {
        return Err(HandlerErr::bad_params("password must not be empty"));
    }
    let full_name = get_required_str(params, "fullName")?.trim().to_string();
    if full_name.is_empty() {
        return Err(HandlerErr::bad_params("fullName must not be empty"));
    }
    let role = get_optional_str(params, "role").unwrap_or_else(|| "teacher".to_string());
    if role != "teacher" && role != "admin" {
        return Err(HandlerErr::bad_params(
            "role must be 'teacher' or 'admin'",
        ));
    }
    let phone_number = get_optional_str(params, "phoneNumber");

    let taken = conn
        .query_row("SELECT 1 FROM users WHERE username = ?", [&username], |r| {
            r.get::<_, i64>(0)
        })
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if taken {
        return Err(HandlerErr::new("username_taken", "username already registered"));
    }

    let user_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users(id, username, password_hash, full_name, role, phone_number)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &user_id,
            &username,
            password_digest(&password),
            &full_name,
            &role,
            &phone_number,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "users" })),
    })?;

    Ok(json!({ "userId": user_id, "username": username, "role": role }))
}

fn users_login(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let username = get_required_str(params, "username")?;
    let password = get_required_str(params, "password")?;

    let row: Option<(String, String, String, String)> = conn
        .query_row(
            "SELECT id, password_hash, full_name, role FROM users WHERE username = ?",
            [&username],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
        .map_err(HandlerErr::db)?;

    // One error for both unknown user and wrong password.
    let Some((user_id, stored_hash, full_name, role)) = row else {
        return Err(HandlerErr::new("invalid_credentials", "invalid username or password"));
    };
    if stored_hash != password_digest(&password) {
        return Err(HandlerErr::new("invalid_credentials", "invalid username or password"));
    }

    Ok(json!({ "userId": user_id, "fullName": full_name, "role": role }))
}

fn users_teachers(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, username, full_name, role, phone_number
             FROM users
             WHERE role = 'teacher'
             ORDER BY rowid",
        )
        .map_err(HandlerErr::db)?;
    let teachers = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "username": r.get::<_, String>(1)?,
                "fullName": r.get::<_, String>(2)?,
                "role": r.get::<_, String>(3)?,
                "phoneNumber": r.get::<_, Option<String>>(4)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    Ok(json!({ "teachers": teachers }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.register" => Some(with_db(state, req, users_register)),
        "users.login" => Some(with_db(state, req, users_login)),
        "users.teachers" => Some(with_db(state, req, |conn, _| users_teachers(conn))),
        _ => None,
    }
}
