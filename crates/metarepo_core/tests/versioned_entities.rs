mod common;

use common::{issue_def, Fixture, Issue};
use metarepo_core::{open_db_in_memory, CallContext, Catalog, QueryMetrics, RepoError, SaveOutcome};
use std::sync::Arc;

#[test]
fn insert_populates_version_and_timestamps() {
    let fixture = Fixture::new();
    let repo = fixture.issues();
    let ctx = CallContext::background();

    let mut issue = Issue::new("Crash on start", 7);
    repo.save(&ctx, &mut issue).unwrap();
    assert_eq!(issue.version, 1);

    let stored = repo.find_one_by_id(&ctx, issue.id).unwrap();
    assert_eq!(stored.version, 1);
    assert!(stored.create_time.is_some_and(|millis| millis > 0));
    assert_eq!(stored.create_time, stored.last_modified_time);
}

#[test]
fn successful_update_bumps_version_in_storage_and_memory() {
    let fixture = Fixture::new();
    let repo = fixture.issues();
    let ctx = CallContext::background();

    let mut issue = Issue::new("Crash on start", 7);
    repo.save(&ctx, &mut issue).unwrap();
    issue.title = "Crash on cold start".to_string();

    assert_eq!(repo.save(&ctx, &mut issue).unwrap(), SaveOutcome::Updated);
    assert_eq!(issue.version, 2);
    let stored = repo.find_one_by_id(&ctx, issue.id).unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.title, "Crash on cold start");

    issue.title = "Crash on warm start".to_string();
    assert_eq!(repo.save(&ctx, &mut issue).unwrap(), SaveOutcome::Updated);
    assert_eq!(repo.find_one_by_id(&ctx, issue.id).unwrap().version, 3);
}

#[test]
fn stale_version_leaves_row_unchanged_without_error() {
    let fixture = Fixture::new();
    let repo = fixture.issues();
    let ctx = CallContext::background();

    let mut original = Issue::new("Crash on start", 7);
    repo.save(&ctx, &mut original).unwrap();

    let mut winner = repo.find_one_by_id(&ctx, original.id).unwrap();
    let mut loser = winner.clone();

    winner.title = "Winner".to_string();
    repo.save(&ctx, &mut winner).unwrap();

    loser.title = "Loser".to_string();
    assert_eq!(repo.save(&ctx, &mut loser).unwrap(), SaveOutcome::NotApplied);
    assert_eq!(loser.version, 1);

    let stored = repo.find_one_by_id(&ctx, original.id).unwrap();
    assert_eq!(stored.title, "Winner");
    assert_eq!(stored.version, 2);
}

#[test]
fn checked_save_reports_conflict_for_stale_version() {
    let fixture = Fixture::new();
    let repo = fixture.issues();
    let ctx = CallContext::background();

    let mut issue = Issue::new("Crash on start", 7);
    repo.save(&ctx, &mut issue).unwrap();
    let mut stale = issue.clone();

    repo.save_checked(&ctx, &mut issue).unwrap();
    let err = repo.save_checked(&ctx, &mut stale).unwrap_err();
    assert!(matches!(err, RepoError::Conflict { id, .. } if id == issue.id));
}

#[test]
fn soft_delete_keeps_the_row_flagged() {
    let fixture = Fixture::new();
    let repo = fixture.issues();
    let ctx = CallContext::background();

    let mut issue = Issue::new("Crash on start", 7);
    repo.save(&ctx, &mut issue).unwrap();
    repo.delete(&ctx, issue.id).unwrap();

    assert_eq!(
        fixture.scalar("SELECT COUNT(*) FROM issue WHERE id = ?1", issue.id),
        1
    );
    assert_eq!(
        fixture.scalar("SELECT deleted FROM issue WHERE id = ?1", issue.id),
        1
    );
    // Finders do not filter on the flag.
    assert_eq!(repo.find_one_by_id(&ctx, issue.id).unwrap().title, "Crash on start");
}

#[test]
fn insert_without_version_default_rolls_back() {
    let db = open_db_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE issue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version INTEGER,
            create_time INTEGER,
            last_modified_time INTEGER,
            title TEXT NOT NULL,
            project_id INTEGER NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    let catalog = Catalog::new();
    catalog.register_entity_def(issue_def()).unwrap();
    let fixture = Fixture {
        db,
        catalog,
        metrics: Arc::new(QueryMetrics::new()),
    };
    let repo = fixture.issues();
    let ctx = CallContext::background();

    let mut issue = Issue::new("Crash on start", 7);
    let err = repo.save(&ctx, &mut issue).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert_eq!(issue.id, 0);
    assert_eq!(fixture.scalar("SELECT COUNT(*) FROM issue WHERE id > ?1", 0), 0);
}

#[test]
fn exhausted_version_is_rejected_before_writing() {
    let fixture = Fixture::new();
    let repo = fixture.issues();
    let ctx = CallContext::background();

    let mut issue = Issue::new("Crash on start", 7);
    repo.save(&ctx, &mut issue).unwrap();
    fixture
        .db
        .with_conn(|conn| {
            conn.execute(
                "UPDATE issue SET version = ?1 WHERE id = ?2",
                [i64::from(u32::MAX), issue.id as i64],
            )
            .map_err(metarepo_core::DbError::from)
        })
        .unwrap();

    let mut loaded = repo.find_one_by_id(&ctx, issue.id).unwrap();
    assert_eq!(loaded.version, u32::MAX);
    loaded.title = "Renamed".to_string();

    let err = repo.save(&ctx, &mut loaded).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert_eq!(loaded.version, u32::MAX);
    assert_eq!(
        fixture.scalar("SELECT version FROM issue WHERE id = ?1", issue.id),
        i64::from(u32::MAX)
    );
    assert_eq!(repo.find_one_by_id(&ctx, issue.id).unwrap().title, "Crash on start");
}
