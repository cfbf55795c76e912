//! Conference repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, multi-get and plan-driven query APIs over `conferences`.
//! - Translate compiled [`QueryPlan`]s into SQL.
//! - Own the shared repository error type.
//!
//! # Invariants
//! - Write paths call `Conference::validate()` before SQL mutations.
//! - Topic rows are replaced as a whole together with the conference row.
//! - Query results are ordered exactly as the plan says, then by id.

use crate::db::DbError;
use crate::model::conference::{Conference, ConferenceId};
use crate::model::{EntityRef, ValidationError};
use crate::query::filter::{ConferenceField, FilterValue, QueryPlan, SortKey};
use crate::repo::parse_uuid;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CONFERENCE_SELECT_SQL: &str = "SELECT
    id,
    organizer_user_id,
    name,
    description,
    city,
    start_date,
    end_date,
    month,
    max_attendees,
    seats_available
FROM conferences";

const TOPICS_SORT_SQL: &str = "(SELECT MIN(ct.topic)
    FROM conference_topics ct
    WHERE ct.conference_id = conferences.id)";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(EntityRef),
    InvalidData(String),
}

impl RepoError {
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_contention())
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for conference persistence.
pub trait ConferenceRepository {
    fn create_conference(&self, conference: &Conference) -> RepoResult<ConferenceId>;
    /// Overwrites the stored row and topics. `NotFound` if absent.
    fn update_conference(&self, conference: &Conference) -> RepoResult<()>;
    fn get_conference(&self, id: ConferenceId) -> RepoResult<Option<Conference>>;
    /// Multi-get aligned with `ids`; absent entries are `None`.
    fn get_conferences(&self, ids: &[ConferenceId]) -> RepoResult<Vec<Option<Conference>>>;
    fn query_conferences(&self, plan: &QueryPlan) -> RepoResult<Vec<Conference>>;
    /// Ancestor query: every conference owned by one organizer, by name.
    fn list_by_organizer(&self, organizer_user_id: &str) -> RepoResult<Vec<Conference>>;
    /// Name-only projection of conferences with `above < seats_available <= at_most`.
    fn names_with_seats_between(&self, above: i64, at_most: i64) -> RepoResult<Vec<String>>;
}

/// SQLite-backed conference repository.
pub struct SqliteConferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConferenceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ConferenceRepository for SqliteConferenceRepository<'_> {
    fn create_conference(&self, conference: &Conference) -> RepoResult<ConferenceId> {
        conference.validate()?;

        self.conn.execute(
            "INSERT INTO conferences (
                id,
                organizer_user_id,
                name,
                description,
                city,
                start_date,
                end_date,
                month,
                max_attendees,
                seats_available
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                conference.id.to_string(),
                conference.organizer_user_id.as_str(),
                conference.name.as_str(),
                conference.description.as_deref(),
                conference.city.as_str(),
                conference.start_date,
                conference.end_date,
                conference.month,
                conference.max_attendees,
                conference.seats_available,
            ],
        )?;
        replace_topics(self.conn, conference)?;

        Ok(conference.id)
    }

    fn update_conference(&self, conference: &Conference) -> RepoResult<()> {
        conference.validate()?;

        let changed = self.conn.execute(
            "UPDATE conferences
             SET
                name = ?1,
                description = ?2,
                city = ?3,
                start_date = ?4,
                end_date = ?5,
                month = ?6,
                max_attendees = ?7,
                seats_available = ?8
             WHERE id = ?9;",
            params![
                conference.name.as_str(),
                conference.description.as_deref(),
                conference.city.as_str(),
                conference.start_date,
                conference.end_date,
                conference.month,
                conference.max_attendees,
                conference.seats_available,
                conference.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Conference(conference.id)));
        }

        replace_topics(self.conn, conference)
    }

    fn get_conference(&self, id: ConferenceId) -> RepoResult<Option<Conference>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONFERENCE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_conference_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn get_conferences(&self, ids: &[ConferenceId]) -> RepoResult<Vec<Option<Conference>>> {
        ids.iter().map(|id| self.get_conference(*id)).collect()
    }

    fn query_conferences(&self, plan: &QueryPlan) -> RepoResult<Vec<Conference>> {
        let mut sql = format!("{CONFERENCE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::with_capacity(plan.predicates.len());

        for predicate in &plan.predicates {
            let symbol = predicate.operator.symbol();
            match predicate.field {
                ConferenceField::Topics => sql.push_str(&format!(
                    " AND EXISTS (
                        SELECT 1
                        FROM conference_topics ct
                        WHERE ct.conference_id = conferences.id
                          AND ct.topic {symbol} ?
                    )"
                )),
                field => sql.push_str(&format!(" AND {} {symbol} ?", field_column(field))),
            }
            bind_values.push(match &predicate.value {
                FilterValue::Text(text) => Value::Text(text.clone()),
                FilterValue::Integer(number) => Value::Integer(*number),
            });
        }

        let order_terms: Vec<String> = plan
            .order_by
            .iter()
            .map(|key| match key {
                SortKey::Field(ConferenceField::Topics) => format!("{TOPICS_SORT_SQL} ASC"),
                SortKey::Field(field) => format!("{} ASC", field_column(*field)),
                SortKey::Name => "name ASC".to_string(),
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_terms.join(", "));
        sql.push_str(", id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut conferences = Vec::new();
        while let Some(row) = rows.next()? {
            conferences.push(parse_conference_row(self.conn, row)?);
        }
        Ok(conferences)
    }

    fn list_by_organizer(&self, organizer_user_id: &str) -> RepoResult<Vec<Conference>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONFERENCE_SELECT_SQL}
             WHERE organizer_user_id = ?1
             ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([organizer_user_id])?;
        let mut conferences = Vec::new();
        while let Some(row) = rows.next()? {
            conferences.push(parse_conference_row(self.conn, row)?);
        }
        Ok(conferences)
    }

    fn names_with_seats_between(&self, above: i64, at_most: i64) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name
             FROM conferences
             WHERE seats_available > ?1
               AND seats_available <= ?2
             ORDER BY seats_available ASC, name ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![above, at_most])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get("name")?);
        }
        Ok(names)
    }
}

fn field_column(field: ConferenceField) -> &'static str {
    match field {
        ConferenceField::City => "city",
        ConferenceField::Topics => "topics",
        ConferenceField::Month => "month",
        ConferenceField::MaxAttendees => "max_attendees",
    }
}

fn replace_topics(conn: &Connection, conference: &Conference) -> RepoResult<()> {
    let id = conference.id.to_string();
    conn.execute(
        "DELETE FROM conference_topics WHERE conference_id = ?1;",
        [id.as_str()],
    )?;
    for (position, topic) in conference.topics.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO conference_topics (conference_id, topic, position)
             VALUES (?1, ?2, ?3);",
            params![id.as_str(), topic.as_str(), position as i64],
        )?;
    }
    Ok(())
}

fn load_topics(conn: &Connection, conference_id: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT topic
         FROM conference_topics
         WHERE conference_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([conference_id])?;
    let mut topics = Vec::new();
    while let Some(row) = rows.next()? {
        topics.push(row.get(0)?);
    }
    Ok(topics)
}

fn parse_conference_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Conference> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "conferences.id")?;

    let conference = Conference {
        id,
        organizer_user_id: row.get("organizer_user_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        city: row.get("city")?,
        topics: load_topics(conn, &id_text)?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        month: row.get("month")?,
        max_attendees: row.get("max_attendees")?,
        seats_available: row.get("seats_available")?,
    };
    conference.validate()?;
    Ok(conference)
}
