//! Session repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist sessions under their parent conference with speaker links.
//! - Provide ancestor-scoped listing and per-speaker counting.
//!
//! # Invariants
//! - A session row always references an existing conference.
//! - Listing order is deterministic: `date, start_time, name, id`.

use crate::model::conference::ConferenceId;
use crate::model::session::{Session, SessionId, SessionType};
use crate::model::speaker::SpeakerId;
use crate::repo::conference_repo::{RepoError, RepoResult};
use crate::repo::parse_uuid;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const SESSION_SELECT_SQL: &str = "SELECT
    id,
    conference_id,
    name,
    highlights,
    duration_minutes,
    type_of_session,
    date,
    start_time,
    month
FROM sessions";

/// Query options for listing sessions. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionListQuery {
    /// Ancestor scope.
    pub conference_id: Option<ConferenceId>,
    pub type_of_session: Option<SessionType>,
    /// Excludes sessions of this type.
    pub excluded_type: Option<SessionType>,
    pub date: Option<NaiveDate>,
    /// Keeps sessions starting at or before this time.
    pub starts_no_later_than: Option<NaiveTime>,
    pub speaker_id: Option<SpeakerId>,
}

/// Repository interface for session persistence.
pub trait SessionRepository {
    fn create_session(&self, session: &Session) -> RepoResult<SessionId>;
    fn get_session(&self, id: SessionId) -> RepoResult<Option<Session>>;
    /// Multi-get aligned with `ids`; absent entries are `None`.
    fn get_sessions(&self, ids: &[SessionId]) -> RepoResult<Vec<Option<Session>>>;
    fn list_sessions(&self, query: &SessionListQuery) -> RepoResult<Vec<Session>>;
    /// Counts sessions of one conference that reference `speaker_id`.
    fn count_sessions_with_speaker(
        &self,
        conference_id: ConferenceId,
        speaker_id: SpeakerId,
    ) -> RepoResult<i64>;
}

/// SQLite-backed session repository.
pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn create_session(&self, session: &Session) -> RepoResult<SessionId> {
        let id = session.id.to_string();
        self.conn.execute(
            "INSERT INTO sessions (
                id,
                conference_id,
                name,
                highlights,
                duration_minutes,
                type_of_session,
                date,
                start_time,
                month
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                id.as_str(),
                session.conference_id.to_string(),
                session.name.as_str(),
                session.highlights.as_deref(),
                session.duration_minutes,
                session.type_of_session.as_db(),
                session.date,
                session.start_time,
                session.month,
            ],
        )?;

        for (position, speaker_id) in session.speaker_ids.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO session_speakers (session_id, speaker_id, position)
                 VALUES (?1, ?2, ?3);",
                params![id.as_str(), speaker_id.to_string(), position as i64],
            )?;
        }

        Ok(session.id)
    }

    fn get_session(&self, id: SessionId) -> RepoResult<Option<Session>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SESSION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_session_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn get_sessions(&self, ids: &[SessionId]) -> RepoResult<Vec<Option<Session>>> {
        ids.iter().map(|id| self.get_session(*id)).collect()
    }

    fn list_sessions(&self, query: &SessionListQuery) -> RepoResult<Vec<Session>> {
        let mut sql = format!("{SESSION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(conference_id) = query.conference_id {
            sql.push_str(" AND conference_id = ?");
            bind_values.push(Value::Text(conference_id.to_string()));
        }
        if let Some(kind) = query.type_of_session {
            sql.push_str(" AND type_of_session = ?");
            bind_values.push(Value::Text(kind.as_db().to_string()));
        }
        if let Some(kind) = query.excluded_type {
            sql.push_str(" AND type_of_session != ?");
            bind_values.push(Value::Text(kind.as_db().to_string()));
        }
        if let Some(date) = query.date {
            sql.push_str(" AND date = ?");
            bind_values.push(Value::Text(date.format("%F").to_string()));
        }
        if let Some(time) = query.starts_no_later_than {
            sql.push_str(" AND start_time IS NOT NULL AND start_time <= ?");
            bind_values.push(Value::Text(time.format("%T%.f").to_string()));
        }
        if let Some(speaker_id) = query.speaker_id {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM session_speakers ss
                    WHERE ss.session_id = sessions.id
                      AND ss.speaker_id = ?
                )",
            );
            bind_values.push(Value::Text(speaker_id.to_string()));
        }

        sql.push_str(" ORDER BY date ASC, start_time ASC, name ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(parse_session_row(self.conn, row)?);
        }
        Ok(sessions)
    }

    fn count_sessions_with_speaker(
        &self,
        conference_id: ConferenceId,
        speaker_id: SpeakerId,
    ) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM sessions s
             INNER JOIN session_speakers ss ON ss.session_id = s.id
             WHERE s.conference_id = ?1
               AND ss.speaker_id = ?2;",
            params![conference_id.to_string(), speaker_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn load_speaker_ids(conn: &Connection, session_id: &str) -> RepoResult<Vec<SpeakerId>> {
    let mut stmt = conn.prepare(
        "SELECT speaker_id
         FROM session_speakers
         WHERE session_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([session_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.push(parse_uuid(&text, "session_speakers.speaker_id")?);
    }
    Ok(ids)
}

fn parse_session_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Session> {
    let id_text: String = row.get("id")?;
    let conference_text: String = row.get("conference_id")?;
    let type_text: String = row.get("type_of_session")?;
    let type_of_session = SessionType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid session type `{type_text}` in sessions.type_of_session"
        ))
    })?;

    Ok(Session {
        id: parse_uuid(&id_text, "sessions.id")?,
        conference_id: parse_uuid(&conference_text, "sessions.conference_id")?,
        name: row.get("name")?,
        highlights: row.get("highlights")?,
        speaker_ids: load_speaker_ids(conn, &id_text)?,
        duration_minutes: row.get("duration_minutes")?,
        type_of_session,
        date: row.get("date")?,
        start_time: row.get("start_time")?,
        month: row.get("month")?,
    })
}
