//! Derived-cache recomputation jobs.
//!
//! # Responsibility
//! - Recompute the nearly-sold-out announcement from current seat counts.
//! - Pick and publish a featured speaker for one conference.
//! - Serve both cached values to readers.
//!
//! # Invariants
//! - Jobs read committed state only; they never run inside a caller's
//!   write transaction.
//! - Readers see `""` for an empty slot, never an error.
//! - Recomputation is idempotent; re-running a job republishes the same value
//!   for unchanged state.

use crate::cache::{CacheStore, ANNOUNCEMENT_KEY, FEATURED_SPEAKER_KEY};
use crate::model::conference::ConferenceId;
use crate::model::speaker::SpeakerId;
use crate::model::EntityRef;
use crate::repo::conference_repo::{ConferenceRepository, SqliteConferenceRepository};
use crate::repo::session_repo::{SessionRepository, SqliteSessionRepository};
use crate::repo::speaker_repo::{SpeakerRepository, SqliteSpeakerRepository};
use crate::service::error::{CoreError, CoreResult};
use log::{debug, info};
use rusqlite::Connection;

/// Conferences with `0 < seats_available <= NEARLY_SOLD_OUT_SEATS` are announced.
pub const NEARLY_SOLD_OUT_SEATS: i64 = 5;

const ANNOUNCEMENT_PREFIX: &str =
    "Last chance to attend! The following conferences are nearly sold out: ";

/// Publishes and serves the two derived values.
#[derive(Debug, Clone, Default)]
pub struct DerivedCacheEngine<C: CacheStore> {
    cache: C,
}

impl<C: CacheStore> DerivedCacheEngine<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// Job A. Rebuilds the announcement from current seat counts.
    ///
    /// Returns the published text, or `""` after clearing the slot when no
    /// conference is nearly sold out.
    pub fn recompute_announcement(&self, conn: &Connection) -> CoreResult<String> {
        let names = SqliteConferenceRepository::new(conn)
            .names_with_seats_between(0, NEARLY_SOLD_OUT_SEATS)?;

        match compose_announcement(&names) {
            Some(text) => {
                self.cache.set(ANNOUNCEMENT_KEY, text.clone());
                info!(
                    "event=announcement_recompute module=derived_cache status=published conferences={}",
                    names.len()
                );
                Ok(text)
            }
            None => {
                self.cache.delete(ANNOUNCEMENT_KEY);
                info!("event=announcement_recompute module=derived_cache status=cleared");
                Ok(String::new())
            }
        }
    }

    /// Job B. Counts sessions per candidate speaker inside one conference and
    /// publishes the busiest one when it speaks more than once.
    ///
    /// Returns the published text, or `None` when nothing was published.
    ///
    /// # Errors
    /// - `NotFound` when the conference or the chosen speaker is absent.
    pub fn recompute_featured_speaker(
        &self,
        conn: &Connection,
        conference_id: ConferenceId,
        speaker_ids: &[SpeakerId],
    ) -> CoreResult<Option<String>> {
        let sessions = SqliteSessionRepository::new(conn);
        let mut counts = Vec::with_capacity(speaker_ids.len());
        for speaker_id in speaker_ids {
            let count = sessions.count_sessions_with_speaker(conference_id, *speaker_id)?;
            counts.push((*speaker_id, count));
        }

        let Some((speaker_id, count)) = select_featured(&counts) else {
            debug!("event=featured_recompute module=derived_cache status=skipped reason=no_speakers");
            return Ok(None);
        };
        if count <= 1 {
            debug!(
                "event=featured_recompute module=derived_cache status=skipped conference_id={} speaker_id={} sessions={}",
                conference_id, speaker_id, count
            );
            return Ok(None);
        }

        let conference = SqliteConferenceRepository::new(conn)
            .get_conference(conference_id)?
            .ok_or(CoreError::NotFound(EntityRef::Conference(conference_id)))?;
        let speaker = SqliteSpeakerRepository::new(conn)
            .get_speaker(speaker_id)?
            .ok_or(CoreError::NotFound(EntityRef::Speaker(speaker_id)))?;

        let text = format!(
            "{} has been added as a featured speaker at {}",
            speaker.name, conference.name
        );
        self.cache.set(FEATURED_SPEAKER_KEY, text.clone());
        info!(
            "event=featured_recompute module=derived_cache status=published conference_id={} speaker_id={} sessions={}",
            conference_id, speaker_id, count
        );
        Ok(Some(text))
    }

    pub fn announcement(&self) -> String {
        self.cache.get(ANNOUNCEMENT_KEY).unwrap_or_default()
    }

    pub fn featured_speaker(&self) -> String {
        self.cache.get(FEATURED_SPEAKER_KEY).unwrap_or_default()
    }
}

/// Builds the announcement text, or `None` for an empty name list.
pub fn compose_announcement(names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    Some(format!("{ANNOUNCEMENT_PREFIX}{}", names.join(", ")))
}

/// Picks the speaker with the highest count. Ties go to the later entry.
pub fn select_featured(counts: &[(SpeakerId, i64)]) -> Option<(SpeakerId, i64)> {
    let mut best: Option<(SpeakerId, i64)> = None;
    for &(speaker_id, count) in counts {
        let best_count = best.map_or(0, |(_, c)| c);
        if count >= best_count {
            best = Some((speaker_id, count));
        }
    }
    best
}
