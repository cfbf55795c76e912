use chrono::{NaiveDate, NaiveTime};
use confseat_core::db::open_db_in_memory;
use confseat_core::{
    ConferenceDraft, ConferenceId, ConferenceService, CoreError, InMemoryTaskQueue,
    ProfileService, ProfileUpdate, RetryPolicy, Session, SessionDraft, SessionService,
    SessionType, SpeakerDraft, SpeakerId, SpeakerService, TaskDescriptor,
};
use rusqlite::Connection;
use uuid::Uuid;

const ORGANIZER: &str = "organizer";

fn create_conference(conn: &mut Connection, start: Option<NaiveDate>) -> ConferenceId {
    let queue = InMemoryTaskQueue::new();
    ConferenceService::new(conn, RetryPolicy::default(), &queue)
        .create_conference(
            ORGANIZER,
            ConferenceDraft {
                name: "RustConf".to_string(),
                start_date: start,
                max_attendees: 50,
                ..ConferenceDraft::default()
            },
        )
        .unwrap()
        .id
}

fn create_speaker(conn: &Connection, name: &str) -> SpeakerId {
    let queue = InMemoryTaskQueue::new();
    SpeakerService::new(conn, &queue)
        .create_speaker(
            ORGANIZER,
            SpeakerDraft {
                name: name.to_string(),
                affiliation: Some("Ferris Labs".to_string()),
                ..SpeakerDraft::default()
            },
        )
        .unwrap()
        .id
}

fn session_names(sessions: &[Session]) -> Vec<&str> {
    sessions.iter().map(|session| session.name.as_str()).collect()
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

#[test]
fn create_session_applies_defaults_and_month_fallback() {
    let mut conn = open_db_in_memory().unwrap();
    let conference_id = create_conference(&mut conn, Some(date(9, 14)));
    let queue = InMemoryTaskQueue::new();
    let mut service = SessionService::new(&mut conn, RetryPolicy::default(), &queue);

    let undated = service
        .create_session(
            ORGANIZER,
            conference_id,
            SessionDraft {
                name: "Opening".to_string(),
                ..SessionDraft::default()
            },
        )
        .unwrap();
    assert_eq!(undated.type_of_session, SessionType::NotSpecified);
    assert_eq!(undated.duration_minutes, 0);
    assert_eq!(undated.month, 9);

    let dated = service
        .create_session(
            ORGANIZER,
            conference_id,
            SessionDraft {
                name: "Later".to_string(),
                date: Some(date(10, 1)),
                ..SessionDraft::default()
            },
        )
        .unwrap();
    assert_eq!(dated.month, 10);
    assert!(queue.is_empty(), "no speakers and no email means no deferred work");
}

#[test]
fn only_organizer_may_add_sessions_with_known_speakers() {
    let mut conn = open_db_in_memory().unwrap();
    let conference_id = create_conference(&mut conn, None);
    let queue = InMemoryTaskQueue::new();
    let mut service = SessionService::new(&mut conn, RetryPolicy::default(), &queue);

    let err = service
        .create_session(
            "someone-else",
            conference_id,
            SessionDraft {
                name: "Sneaky".to_string(),
                ..SessionDraft::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden { .. }));

    let err = service
        .create_session(
            ORGANIZER,
            conference_id,
            SessionDraft {
                name: "Ghost speaker".to_string(),
                speaker_ids: vec![Uuid::new_v4()],
                ..SessionDraft::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let err = service
        .create_session(
            ORGANIZER,
            Uuid::new_v4(),
            SessionDraft {
                name: "Nowhere".to_string(),
                ..SessionDraft::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let err = service
        .create_session(
            ORGANIZER,
            conference_id,
            SessionDraft {
                name: "   ".to_string(),
                ..SessionDraft::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn session_listings_filter_by_type_date_time_and_speaker() {
    let mut conn = open_db_in_memory().unwrap();
    let conference_id = create_conference(&mut conn, Some(date(5, 1)));
    let ada = create_speaker(&conn, "Ada");
    let bo = create_speaker(&conn, "Bo");
    let queue = InMemoryTaskQueue::new();
    let mut service = SessionService::new(&mut conn, RetryPolicy::default(), &queue);

    let drafts = [
        ("Keynote", SessionType::Keynote, date(5, 1), time(9, 0), vec![ada]),
        ("Workshop", SessionType::Workshop, date(5, 1), time(13, 0), vec![ada, bo]),
        ("Evening talk", SessionType::Lecture, date(5, 1), time(19, 0), vec![bo]),
        ("Day two", SessionType::Workshop, date(5, 2), time(10, 0), vec![]),
    ];
    for (name, kind, day, start, speakers) in drafts {
        service
            .create_session(
                ORGANIZER,
                conference_id,
                SessionDraft {
                    name: name.to_string(),
                    type_of_session: Some(kind),
                    date: Some(day),
                    start_time: Some(start),
                    speaker_ids: speakers,
                    duration_minutes: Some(45),
                    ..SessionDraft::default()
                },
            )
            .unwrap();
    }

    let all = service.sessions_by_conference(conference_id).unwrap();
    assert_eq!(
        session_names(&all),
        vec!["Keynote", "Workshop", "Evening talk", "Day two"]
    );

    let workshops = service
        .sessions_by_type(conference_id, SessionType::Workshop)
        .unwrap();
    assert_eq!(session_names(&workshops), vec!["Workshop", "Day two"]);

    let day_two = service.sessions_by_date(conference_id, date(5, 2)).unwrap();
    assert_eq!(session_names(&day_two), vec!["Day two"]);

    let before_evening_no_workshops = service
        .sessions_by_time_and_type(conference_id, time(19, 0), SessionType::Workshop)
        .unwrap();
    assert_eq!(
        session_names(&before_evening_no_workshops),
        vec!["Keynote", "Evening talk"]
    );

    let by_bo = service.sessions_by_speaker(bo).unwrap();
    assert_eq!(session_names(&by_bo), vec!["Workshop", "Evening talk"]);
    assert_eq!(by_bo[0].speaker_ids, vec![ada, bo]);

    assert!(matches!(
        service.sessions_by_conference(Uuid::new_v4()).unwrap_err(),
        CoreError::NotFound(_)
    ));
    assert!(matches!(
        service.sessions_by_speaker(Uuid::new_v4()).unwrap_err(),
        CoreError::NotFound(_)
    ));
    drop(service);

    let speakers = SpeakerService::new(&conn, &queue)
        .speakers_by_conference(conference_id)
        .unwrap();
    let speaker_names: Vec<&str> = speakers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(speaker_names, vec!["Ada", "Bo"]);
}

#[test]
fn sessions_with_speakers_enqueue_featured_recompute_and_email() {
    let mut conn = open_db_in_memory().unwrap();
    ProfileService::new(&mut conn, RetryPolicy::default())
        .save_profile(
            ORGANIZER,
            ProfileUpdate {
                main_email: Some("org@example.com".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
    let conference_id = create_conference(&mut conn, None);
    let ada = create_speaker(&conn, "Ada");
    let queue = InMemoryTaskQueue::new();

    SessionService::new(&mut conn, RetryPolicy::default(), &queue)
        .create_session(
            ORGANIZER,
            conference_id,
            SessionDraft {
                name: "Borrowing".to_string(),
                speaker_ids: vec![ada, ada],
                ..SessionDraft::default()
            },
        )
        .unwrap();

    let tasks = queue.drain();
    assert_eq!(
        tasks[0],
        TaskDescriptor::RecomputeFeaturedSpeaker {
            conference_id,
            speaker_ids: vec![ada],
        }
    );
    assert!(matches!(
        &tasks[1],
        TaskDescriptor::SendConfirmationEmail { email, subject, .. }
            if email == "org@example.com" && subject.contains("RustConf")
    ));
}

#[test]
fn speaker_lookup_and_validation() {
    let conn = open_db_in_memory().unwrap();
    let queue = InMemoryTaskQueue::new();
    let service = SpeakerService::new(&conn, &queue);

    let created = service
        .create_speaker(
            ORGANIZER,
            SpeakerDraft {
                name: "  Grace  ".to_string(),
                bio: Some("Compilers".to_string()),
                ..SpeakerDraft::default()
            },
        )
        .unwrap();
    assert_eq!(created.name, "Grace");
    assert_eq!(service.get_speaker(created.id).unwrap(), created);

    assert!(matches!(
        service.get_speaker(Uuid::new_v4()).unwrap_err(),
        CoreError::NotFound(_)
    ));
    assert!(matches!(
        service
            .create_speaker(ORGANIZER, SpeakerDraft::default())
            .unwrap_err(),
        CoreError::Validation(_)
    ));
}
