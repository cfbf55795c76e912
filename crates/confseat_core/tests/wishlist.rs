use confseat_core::db::open_db_in_memory;
use confseat_core::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use confseat_core::{
    ConferenceDraft, ConferenceId, ConferenceService, ConflictReason, CoreError,
    InMemoryTaskQueue, RetryPolicy, SeatLedger, SessionDraft, SessionId, SessionService,
    WishlistManager,
};
use rusqlite::Connection;
use uuid::Uuid;

const ORGANIZER: &str = "organizer";

fn create_conference(conn: &mut Connection, name: &str) -> ConferenceId {
    let queue = InMemoryTaskQueue::new();
    ConferenceService::new(conn, RetryPolicy::default(), &queue)
        .create_conference(
            ORGANIZER,
            ConferenceDraft {
                name: name.to_string(),
                max_attendees: 20,
                ..ConferenceDraft::default()
            },
        )
        .unwrap()
        .id
}

fn create_session(conn: &mut Connection, conference_id: ConferenceId, name: &str) -> SessionId {
    let queue = InMemoryTaskQueue::new();
    SessionService::new(conn, RetryPolicy::default(), &queue)
        .create_session(
            ORGANIZER,
            conference_id,
            SessionDraft {
                name: name.to_string(),
                ..SessionDraft::default()
            },
        )
        .unwrap()
        .id
}

fn register(conn: &mut Connection, conference_id: ConferenceId, user_id: &str) {
    let queue = InMemoryTaskQueue::new();
    assert!(SeatLedger::new(conn, RetryPolicy::default(), &queue)
        .register(conference_id, user_id)
        .unwrap());
}

#[test]
fn wishlist_requires_registration_for_parent_conference() {
    let mut conn = open_db_in_memory().unwrap();
    let conference_id = create_conference(&mut conn, "RustConf");
    let session_id = create_session(&mut conn, conference_id, "Ownership deep dive");

    let err = WishlistManager::new(&mut conn, RetryPolicy::default())
        .add_to_wishlist(session_id, "alice")
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictReason::NotRegisteredForParent)
    ));
    assert_eq!(
        err.to_string(),
        "conflict: must register for parent resource first"
    );

    register(&mut conn, conference_id, "alice");
    let mut wishlist = WishlistManager::new(&mut conn, RetryPolicy::default());
    assert!(wishlist.add_to_wishlist(session_id, "alice").unwrap());

    let err = wishlist.add_to_wishlist(session_id, "alice").unwrap_err();
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictReason::AlreadyInWishlist)
    ));

    let sessions = wishlist.session_wishlist("alice").unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session_id);
}

#[test]
fn registration_for_another_conference_does_not_unlock_wishlist() {
    let mut conn = open_db_in_memory().unwrap();
    let attended = create_conference(&mut conn, "Attended");
    let other = create_conference(&mut conn, "Other");
    let session_id = create_session(&mut conn, other, "Elsewhere");
    register(&mut conn, attended, "alice");

    let err = WishlistManager::new(&mut conn, RetryPolicy::default())
        .add_to_wishlist(session_id, "alice")
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictReason::NotRegisteredForParent)
    ));
}

#[test]
fn unknown_session_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut wishlist = WishlistManager::new(&mut conn, RetryPolicy::default());
    let missing = Uuid::new_v4();

    assert!(matches!(
        wishlist.add_to_wishlist(missing, "alice").unwrap_err(),
        CoreError::NotFound(_)
    ));
    assert!(matches!(
        wishlist.remove_from_wishlist(missing, "alice").unwrap_err(),
        CoreError::NotFound(_)
    ));
}

#[test]
fn remove_reports_whether_session_was_present() {
    let mut conn = open_db_in_memory().unwrap();
    let conference_id = create_conference(&mut conn, "RustConf");
    let first = create_session(&mut conn, conference_id, "First");
    let second = create_session(&mut conn, conference_id, "Second");
    register(&mut conn, conference_id, "alice");

    let mut wishlist = WishlistManager::new(&mut conn, RetryPolicy::default());
    assert!(wishlist.add_to_wishlist(second, "alice").unwrap());
    assert!(wishlist.add_to_wishlist(first, "alice").unwrap());

    let order: Vec<SessionId> = wishlist
        .session_wishlist("alice")
        .unwrap()
        .into_iter()
        .map(|session| session.id)
        .collect();
    assert_eq!(order, vec![second, first]);

    assert!(wishlist.remove_from_wishlist(second, "alice").unwrap());
    assert!(!wishlist.remove_from_wishlist(second, "alice").unwrap());
    drop(wishlist);

    let profile = SqliteProfileRepository::new(&conn)
        .get_profile("alice")
        .unwrap()
        .unwrap();
    assert_eq!(profile.session_wishlist, vec![first]);
    assert_eq!(profile.conference_keys_to_attend, vec![conference_id]);
}

#[test]
fn wishlist_survives_unregistering_and_can_still_be_cleared() {
    let mut conn = open_db_in_memory().unwrap();
    let conference_id = create_conference(&mut conn, "RustConf");
    let session_id = create_session(&mut conn, conference_id, "Talk");
    register(&mut conn, conference_id, "alice");
    assert!(WishlistManager::new(&mut conn, RetryPolicy::default())
        .add_to_wishlist(session_id, "alice")
        .unwrap());

    let queue = InMemoryTaskQueue::new();
    assert!(SeatLedger::new(&mut conn, RetryPolicy::default(), &queue)
        .unregister(conference_id, "alice")
        .unwrap());

    assert!(WishlistManager::new(&mut conn, RetryPolicy::default())
        .remove_from_wishlist(session_id, "alice")
        .unwrap());
}
