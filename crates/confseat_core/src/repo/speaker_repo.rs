//! Speaker repository contracts and SQLite implementation.

use crate::model::conference::ConferenceId;
use crate::model::speaker::{Speaker, SpeakerId};
use crate::repo::conference_repo::RepoResult;
use crate::repo::parse_uuid;
use rusqlite::{params, Connection, Row};

/// Repository interface for speaker persistence.
pub trait SpeakerRepository {
    fn create_speaker(&self, speaker: &Speaker) -> RepoResult<SpeakerId>;
    fn get_speaker(&self, id: SpeakerId) -> RepoResult<Option<Speaker>>;
    /// Multi-get aligned with `ids`; absent entries are `None`.
    fn get_speakers(&self, ids: &[SpeakerId]) -> RepoResult<Vec<Option<Speaker>>>;
    /// Distinct speakers referenced by any session of the conference, by name.
    fn list_by_conference(&self, conference_id: ConferenceId) -> RepoResult<Vec<Speaker>>;
}

/// SQLite-backed speaker repository.
pub struct SqliteSpeakerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSpeakerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SpeakerRepository for SqliteSpeakerRepository<'_> {
    fn create_speaker(&self, speaker: &Speaker) -> RepoResult<SpeakerId> {
        self.conn.execute(
            "INSERT INTO speakers (id, name, bio, affiliation) VALUES (?1, ?2, ?3, ?4);",
            params![
                speaker.id.to_string(),
                speaker.name.as_str(),
                speaker.bio.as_deref(),
                speaker.affiliation.as_deref(),
            ],
        )?;
        Ok(speaker.id)
    }

    fn get_speaker(&self, id: SpeakerId) -> RepoResult<Option<Speaker>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, bio, affiliation
             FROM speakers
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_speaker_row(row)?));
        }
        Ok(None)
    }

    fn get_speakers(&self, ids: &[SpeakerId]) -> RepoResult<Vec<Option<Speaker>>> {
        ids.iter().map(|id| self.get_speaker(*id)).collect()
    }

    fn list_by_conference(&self, conference_id: ConferenceId) -> RepoResult<Vec<Speaker>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT
                sp.id AS id,
                sp.name AS name,
                sp.bio AS bio,
                sp.affiliation AS affiliation
             FROM speakers sp
             INNER JOIN session_speakers ss ON ss.speaker_id = sp.id
             INNER JOIN sessions s ON s.id = ss.session_id
             WHERE s.conference_id = ?1
             ORDER BY sp.name ASC, sp.id ASC;",
        )?;
        let mut rows = stmt.query(params![conference_id.to_string()])?;
        let mut speakers = Vec::new();
        while let Some(row) = rows.next()? {
            speakers.push(parse_speaker_row(row)?);
        }
        Ok(speakers)
    }
}

fn parse_speaker_row(row: &Row<'_>) -> RepoResult<Speaker> {
    let id_text: String = row.get("id")?;
    Ok(Speaker {
        id: parse_uuid(&id_text, "speakers.id")?,
        name: row.get("name")?,
        bio: row.get("bio")?,
        affiliation: row.get("affiliation")?,
    })
}
