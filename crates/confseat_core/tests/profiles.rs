use confseat_core::db::open_db_in_memory;
use confseat_core::{
    ConferenceDraft, ConferenceService, CoreError, InMemoryTaskQueue, ProfileService,
    ProfileUpdate, RetryPolicy, SeatLedger, TeeShirtSize,
};

#[test]
fn first_read_creates_default_profile() {
    let mut conn = open_db_in_memory().unwrap();
    let service = ProfileService::new(&mut conn, RetryPolicy::default());

    let profile = service.get_profile("subject-123").unwrap();
    assert_eq!(profile.user_id, "subject-123");
    assert_eq!(profile.display_name, "subject-123");
    assert_eq!(profile.main_email, None);
    assert_eq!(profile.tee_shirt_size, TeeShirtSize::NotSpecified);
    assert!(profile.conference_keys_to_attend.is_empty());
    assert!(profile.session_wishlist.is_empty());

    assert_eq!(service.get_profile("subject-123").unwrap(), profile);
}

#[test]
fn saving_editable_fields_keeps_attendance() {
    let mut conn = open_db_in_memory().unwrap();
    let queue = InMemoryTaskQueue::new();
    let conference = ConferenceService::new(&mut conn, RetryPolicy::default(), &queue)
        .create_conference(
            "organizer",
            ConferenceDraft {
                name: "RustConf".to_string(),
                max_attendees: 3,
                ..ConferenceDraft::default()
            },
        )
        .unwrap();
    assert!(SeatLedger::new(&mut conn, RetryPolicy::default(), &queue)
        .register(conference.id, "alice")
        .unwrap());

    let mut service = ProfileService::new(&mut conn, RetryPolicy::default());
    let saved = service
        .save_profile(
            "alice",
            ProfileUpdate {
                display_name: Some("  Alice A.  ".to_string()),
                tee_shirt_size: Some(TeeShirtSize::Xl),
                main_email: None,
            },
        )
        .unwrap();
    assert_eq!(saved.display_name, "Alice A.");
    assert_eq!(saved.tee_shirt_size, TeeShirtSize::Xl);
    assert_eq!(saved.conference_keys_to_attend, vec![conference.id]);
    assert_eq!(service.get_profile("alice").unwrap(), saved);

    let err = service
        .save_profile(
            "alice",
            ProfileUpdate {
                display_name: Some("   ".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}
