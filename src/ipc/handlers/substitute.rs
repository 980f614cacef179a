use crate::ipc::helpers::{get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::recommend::{recommend, SqliteStore, SubstitutionRequest};
use rusqlite::Connection;
use serde_json::json;

fn recommend_substitute(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let day = get_required_str(params, "dayOfWeek")?;
    let start = get_required_str(params, "startTime")?;
    let end = get_required_str(params, "endTime")?;
    let subject = get_required_str(params, "subjectNeeded")?;
    // `date` is accepted for the caller's records; matching is slot-based.

    let request = SubstitutionRequest::parse(&day, &start, &end, &subject)?;
    let store = SqliteStore::new(conn);
    let outcome = recommend(&store, &request)?;

    tracing::debug!(
        day = request.day.as_str(),
        start = %request.start.canonical(),
        end = %request.end.canonical(),
        subject = %request.subject,
        candidates = outcome.candidates.len(),
        "substitute scan complete"
    );

    Ok(json!({
        "candidates": outcome.candidates,
        "subjectKnown": outcome.subject_known
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ai.recommendSubstitute" => Some(with_db(state, req, recommend_substitute)),
        _ => None,
    }
}
