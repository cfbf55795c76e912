use confseat_core::db::open_db_in_memory;
use confseat_core::{
    ConferenceDraft, ConferenceId, ConferenceService, DerivedCacheEngine,
    InMemoryTaskQueue, MemoryCacheStore, RetryPolicy, SeatLedger, SessionDraft, SessionService,
    SpeakerDraft, SpeakerId, SpeakerService, TaskDescriptor, TaskOutcome, TaskRunner,
};
use rusqlite::Connection;
use uuid::Uuid;

const ORGANIZER: &str = "organizer";

fn create_conference(conn: &mut Connection, name: &str, capacity: i64) -> ConferenceId {
    let queue = InMemoryTaskQueue::new();
    ConferenceService::new(conn, RetryPolicy::default(), &queue)
        .create_conference(
            ORGANIZER,
            ConferenceDraft {
                name: name.to_string(),
                max_attendees: capacity,
                ..ConferenceDraft::default()
            },
        )
        .unwrap()
        .id
}

fn register_many(conn: &mut Connection, conference_id: ConferenceId, count: usize, prefix: &str) {
    let queue = InMemoryTaskQueue::new();
    let mut ledger = SeatLedger::new(conn, RetryPolicy::default(), &queue);
    for i in 0..count {
        assert!(ledger
            .register(conference_id, &format!("{prefix}-{i}"))
            .unwrap());
    }
}

fn create_speaker(conn: &Connection, name: &str) -> SpeakerId {
    let queue = InMemoryTaskQueue::new();
    SpeakerService::new(conn, &queue)
        .create_speaker(
            ORGANIZER,
            SpeakerDraft {
                name: name.to_string(),
                ..SpeakerDraft::default()
            },
        )
        .unwrap()
        .id
}

fn create_session(
    conn: &mut Connection,
    queue: &InMemoryTaskQueue,
    conference_id: ConferenceId,
    name: &str,
    speaker_ids: Vec<SpeakerId>,
) {
    SessionService::new(conn, RetryPolicy::default(), queue)
        .create_session(
            ORGANIZER,
            conference_id,
            SessionDraft {
                name: name.to_string(),
                speaker_ids,
                ..SessionDraft::default()
            },
        )
        .unwrap();
}

#[test]
fn announcement_uses_strict_lower_and_inclusive_upper_bound() {
    let mut conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let conference_id = create_conference(&mut conn, "Boundary", 10);
    let expected =
        "Last chance to attend! The following conferences are nearly sold out: Boundary";

    register_many(&mut conn, conference_id, 4, "first");
    assert_eq!(engine.recompute_announcement(&conn).unwrap(), "");
    assert_eq!(engine.announcement(), "");

    register_many(&mut conn, conference_id, 1, "fifth");
    assert_eq!(engine.recompute_announcement(&conn).unwrap(), expected);

    register_many(&mut conn, conference_id, 1, "sixth");
    assert_eq!(engine.recompute_announcement(&conn).unwrap(), expected);
    assert_eq!(engine.announcement(), expected);

    register_many(&mut conn, conference_id, 4, "rest");
    assert_eq!(engine.recompute_announcement(&conn).unwrap(), "");
    assert_eq!(engine.announcement(), "");
}

#[test]
fn announcement_lists_every_nearly_sold_out_conference() {
    let mut conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    create_conference(&mut conn, "Small", 3);
    create_conference(&mut conn, "Tiny", 1);
    create_conference(&mut conn, "Large", 300);

    let text = engine.recompute_announcement(&conn).unwrap();
    assert_eq!(
        text,
        "Last chance to attend! The following conferences are nearly sold out: Tiny, Small"
    );
}

#[test]
fn featured_speaker_publishes_after_repeat_appearances() {
    let mut conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let queue = InMemoryTaskQueue::new();
    let conference_id = create_conference(&mut conn, "RustConf", 100);
    let x = create_speaker(&conn, "Xavier");
    let y = create_speaker(&conn, "Yara");

    create_session(&mut conn, &queue, conference_id, "Y only", vec![y]);
    create_session(&mut conn, &queue, conference_id, "X one", vec![x]);
    {
        let runner = TaskRunner::new(&conn, &engine);
        assert_eq!(runner.run_pending(&queue).unwrap(), 2);
    }
    assert_eq!(engine.featured_speaker(), "");

    create_session(&mut conn, &queue, conference_id, "X two", vec![x]);
    create_session(&mut conn, &queue, conference_id, "X three", vec![x]);
    let pending = queue.drain();
    assert_eq!(pending.len(), 2);
    assert_eq!(
        pending[1],
        TaskDescriptor::RecomputeFeaturedSpeaker {
            conference_id,
            speaker_ids: vec![x],
        }
    );

    let runner = TaskRunner::new(&conn, &engine);
    assert_eq!(
        runner.run(&pending[1]).unwrap(),
        TaskOutcome::Published(
            "Xavier has been added as a featured speaker at RustConf".to_string()
        )
    );
    assert_eq!(
        engine.featured_speaker(),
        "Xavier has been added as a featured speaker at RustConf"
    );
}

#[test]
fn single_appearance_never_publishes() {
    let mut conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let conference_id = create_conference(&mut conn, "RustConf", 100);
    let y = create_speaker(&conn, "Yara");
    let queue = InMemoryTaskQueue::new();
    create_session(&mut conn, &queue, conference_id, "Solo", vec![y]);

    let published = engine
        .recompute_featured_speaker(&conn, conference_id, &[y])
        .unwrap();
    assert_eq!(published, None);
    assert_eq!(engine.featured_speaker(), "");
}

#[test]
fn tie_on_session_count_features_the_later_speaker() {
    let mut conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let queue = InMemoryTaskQueue::new();
    let conference_id = create_conference(&mut conn, "PairConf", 100);
    let a = create_speaker(&conn, "Ada");
    let b = create_speaker(&conn, "Bo");

    create_session(&mut conn, &queue, conference_id, "Pair one", vec![a, b]);
    create_session(&mut conn, &queue, conference_id, "Pair two", vec![a, b]);

    let published = engine
        .recompute_featured_speaker(&conn, conference_id, &[a, b])
        .unwrap();
    assert_eq!(
        published.as_deref(),
        Some("Bo has been added as a featured speaker at PairConf")
    );
}

#[test]
fn sessions_in_other_conferences_do_not_count() {
    let mut conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let queue = InMemoryTaskQueue::new();
    let first = create_conference(&mut conn, "First", 100);
    let second = create_conference(&mut conn, "Second", 100);
    let x = create_speaker(&conn, "Xavier");

    create_session(&mut conn, &queue, first, "Here", vec![x]);
    create_session(&mut conn, &queue, second, "There", vec![x]);

    assert_eq!(
        engine
            .recompute_featured_speaker(&conn, first, &[x])
            .unwrap(),
        None
    );
}

#[test]
fn featured_recompute_without_repeat_sessions_publishes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let missing = Uuid::new_v4();

    assert_eq!(
        engine
            .recompute_featured_speaker(&conn, missing, &[Uuid::new_v4()])
            .unwrap(),
        None
    );
    assert_eq!(
        engine.recompute_featured_speaker(&conn, missing, &[]).unwrap(),
        None
    );
    assert_eq!(engine.featured_speaker(), "");
}

#[test]
fn seat_changes_enqueue_announcement_recompute_that_runner_applies() {
    let mut conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let conference_id = create_conference(&mut conn, "Cosy", 6);
    let queue = InMemoryTaskQueue::new();

    {
        let mut ledger = SeatLedger::new(&mut conn, RetryPolicy::default(), &queue);
        assert!(ledger.register(conference_id, "alice").unwrap());
    }
    let runner = TaskRunner::new(&conn, &engine);
    assert_eq!(runner.run_pending(&queue).unwrap(), 1);
    assert_eq!(
        engine.announcement(),
        "Last chance to attend! The following conferences are nearly sold out: Cosy"
    );
}

#[test]
fn email_descriptors_are_acknowledged_without_touching_cache() {
    let conn = open_db_in_memory().unwrap();
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let runner = TaskRunner::new(&conn, &engine);

    let outcome = runner
        .run(&TaskDescriptor::SendConfirmationEmail {
            email: "someone@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        })
        .unwrap();
    assert_eq!(outcome, TaskOutcome::Acknowledged);
    assert_eq!(engine.announcement(), "");
    assert_eq!(engine.featured_speaker(), "");
}
