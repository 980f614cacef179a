//! Substitute recommendation: given a weekday slot and a subject, scan the
//! directory for teachers who are free at that slot and rank them.
//!
//! Availability is resolved against two independent schedules (the fixed
//! weekly timetable and the teacher's own busy marks) with an ordered
//! check list: a teaching conflict always takes precedence over a busy
//! mark. Slot matching is exact start-time equality on the fixed grid,
//! not interval overlap; the requested end time is validated but does not
//! participate in matching.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, RecommendError> {
        match raw.trim() {
            "Monday" => Ok(Weekday::Monday),
            "Tuesday" => Ok(Weekday::Tuesday),
            "Wednesday" => Ok(Weekday::Wednesday),
            "Thursday" => Ok(Weekday::Thursday),
            "Friday" => Ok(Weekday::Friday),
            other => Err(RecommendError::bad_params(format!(
                "dayOfWeek must be Monday..Friday, got '{}'",
                other
            ))),
        }
    }
}

/// A time-of-day on the slot grid. Canonical form is zero-padded "HH:MM",
/// which is also how slots are stored, so string equality against stored
/// rows is exact slot equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTime(chrono::NaiveTime);

impl SlotTime {
    pub fn parse(raw: &str) -> Result<Self, RecommendError> {
        chrono::NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map(SlotTime)
            .map_err(|_| {
                RecommendError::bad_params(format!("time must be HH:MM, got '{}'", raw))
            })
    }

    pub fn canonical(&self) -> String {
        self.0.format("%H:%M").to_string()
    }
}

#[derive(Debug, Clone)]
pub struct RecommendError {
    pub code: &'static str,
    pub message: String,
}

impl RecommendError {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
        }
    }

    fn store(e: rusqlite::Error) -> Self {
        Self {
            code: "db_query_failed",
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for RecommendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RecommendError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    BusyTeaching { subject: String },
    BusyMarked,
}

#[derive(Debug, Clone)]
pub struct TeacherRecord {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
}

/// Read access the engine needs. Handlers construct an implementation
/// scoped to the request's connection; nothing here mutates the stores.
pub trait SubstituteStore {
    /// Teachers only (never admins), in directory insertion order.
    fn list_teachers(&self) -> Result<Vec<TeacherRecord>, RecommendError>;

    /// Subject of a scheduled class at exactly (day, start), if any.
    fn find_class(
        &self,
        teacher_id: &str,
        day: Weekday,
        start: SlotTime,
    ) -> Result<Option<String>, RecommendError>;

    /// Does the teacher teach this subject anywhere in their timetable?
    fn has_subject(&self, teacher_id: &str, subject: &str) -> Result<bool, RecommendError>;

    /// Is there a BUSY mark at exactly (day, start)? Other status tags do
    /// not gate availability.
    fn find_busy(
        &self,
        teacher_id: &str,
        day: Weekday,
        start: SlotTime,
    ) -> Result<bool, RecommendError>;

    /// Does any schedule row carry this subject label?
    fn is_known_subject(&self, subject: &str) -> Result<bool, RecommendError>;
}

pub const BASE_SCORE: i64 = 10;
pub const SUBJECT_BONUS: i64 = 5;

#[derive(Debug, Clone)]
pub struct SubstitutionRequest {
    pub day: Weekday,
    pub start: SlotTime,
    /// Validated but not used by matching; only `start` gates conflicts.
    pub end: SlotTime,
    pub subject: String,
}

impl SubstitutionRequest {
    pub fn parse(
        day: &str,
        start: &str,
        end: &str,
        subject: &str,
    ) -> Result<Self, RecommendError> {
        let day = Weekday::parse(day)?;
        let start = SlotTime::parse(start)?;
        let end = SlotTime::parse(end)?;
        let subject = subject.trim().to_string();
        if subject.is_empty() {
            return Err(RecommendError::bad_params("subjectNeeded must not be empty"));
        }
        Ok(Self {
            day,
            start,
            end,
            subject,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub score: i64,
    pub reason: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecommendOutcome {
    /// Score-descending; ties keep directory order.
    pub candidates: Vec<Candidate>,
    /// False when no schedule row anywhere carries the requested subject.
    /// Candidates are still computed (they all land on the base tier).
    pub subject_known: bool,
}

pub fn resolve_availability(
    store: &dyn SubstituteStore,
    teacher_id: &str,
    day: Weekday,
    start: SlotTime,
) -> Result<Availability, RecommendError> {
    if let Some(subject) = store.find_class(teacher_id, day, start)? {
        return Ok(Availability::BusyTeaching { subject });
    }
    if store.find_busy(teacher_id, day, start)? {
        return Ok(Availability::BusyMarked);
    }
    Ok(Availability::Available)
}

/// Score an already-available teacher against the requested subject.
/// Exactly two tiers: consumers render a top-match badge for score > 10,
/// so no third value may be introduced without revisiting that threshold.
pub fn score_candidate(
    store: &dyn SubstituteStore,
    teacher_id: &str,
    subject: &str,
) -> Result<(i64, String), RecommendError> {
    if store.has_subject(teacher_id, subject)? {
        Ok((
            BASE_SCORE + SUBJECT_BONUS,
            format!("Recommended: Teaches {}", subject),
        ))
    } else {
        Ok((BASE_SCORE, "Available".to_string()))
    }
}

/// Full scan: every teacher is checked against the requested slot, busy
/// teachers are dropped outright, survivors are scored and ranked. Pure
/// read path; identical inputs over an unchanged store yield an identical
/// ordered list.
pub fn recommend(
    store: &dyn SubstituteStore,
    req: &SubstitutionRequest,
) -> Result<RecommendOutcome, RecommendError> {
    let subject_known = store.is_known_subject(&req.subject)?;
    if !subject_known {
        tracing::warn!(subject = %req.subject, "requested subject appears in no schedule");
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for teacher in store.list_teachers()? {
        match resolve_availability(store, &teacher.id, req.day, req.start)? {
            Availability::Available => {
                let (score, reason) = score_candidate(store, &teacher.id, &req.subject)?;
                candidates.push(Candidate {
                    id: teacher.id,
                    name: teacher.name,
                    score,
                    reason,
                    phone: teacher.phone,
                });
            }
            Availability::BusyTeaching { .. } | Availability::BusyMarked => {}
        }
    }

    // sort_by is stable: equal scores keep scan order.
    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    Ok(RecommendOutcome {
        candidates,
        subject_known,
    })
}

/// Store adapter over the workspace database.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SubstituteStore for SqliteStore<'_> {
    fn list_teachers(&self) -> Result<Vec<TeacherRecord>, RecommendError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, full_name, phone_number
                 FROM users
                 WHERE role = 'teacher'
                 ORDER BY rowid",
            )
            .map_err(RecommendError::store)?;
        stmt.query_map([], |r| {
            Ok(TeacherRecord {
                id: r.get(0)?,
                name: r.get(1)?,
                phone: r.get(2)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(RecommendError::store)
    }

    fn find_class(
        &self,
        teacher_id: &str,
        day: Weekday,
        start: SlotTime,
    ) -> Result<Option<String>, RecommendError> {
        self.conn
            .query_row(
                "SELECT subject FROM schedules
                 WHERE teacher_id = ? AND day_of_week = ? AND start_time = ?",
                (teacher_id, day.as_str(), start.canonical()),
                |r| r.get(0),
            )
            .optional()
            .map_err(RecommendError::store)
    }

    fn has_subject(&self, teacher_id: &str, subject: &str) -> Result<bool, RecommendError> {
        self.conn
            .query_row(
                "SELECT 1 FROM schedules WHERE teacher_id = ? AND subject = ? LIMIT 1",
                (teacher_id, subject),
                |r| r.get::<_, i64>(0),
            )
            .optional()
            .map(|v| v.is_some())
            .map_err(RecommendError::store)
    }

    fn find_busy(
        &self,
        teacher_id: &str,
        day: Weekday,
        start: SlotTime,
    ) -> Result<bool, RecommendError> {
        self.conn
            .query_row(
                "SELECT 1 FROM teacher_availability
                 WHERE teacher_id = ? AND day_of_week = ? AND start_time = ?
                   AND status = 'BUSY'
                 LIMIT 1",
                (teacher_id, day.as_str(), start.canonical()),
                |r| r.get::<_, i64>(0),
            )
            .optional()
            .map(|v| v.is_some())
            .map_err(RecommendError::store)
    }

    fn is_known_subject(&self, subject: &str) -> Result<bool, RecommendError> {
        self.conn
            .query_row(
                "SELECT 1 FROM schedules WHERE subject = ? LIMIT 1",
                [subject],
                |r| r.get::<_, i64>(0),
            )
            .optional()
            .map(|v| v.is_some())
            .map_err(RecommendError::store)
    }
}
