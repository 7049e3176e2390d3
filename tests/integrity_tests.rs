/// End-to-end tests for the orphan detect -> review -> cleanup workflow
use modlytics::audit::{AuditAction, AuditFilter, AuditStore};
use modlytics::db;
use modlytics::error::ModError;
use modlytics::id::SequentialIds;
use modlytics::integrity::{CleanupRequest, IntegrityChecker, OrphanType};
use sqlx::SqlitePool;
use std::sync::Arc;

async fn setup() -> (SqlitePool, IntegrityChecker, AuditStore) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let pool = SqlitePool::connect(":memory:").await.unwrap();
    db::init_schema(&pool).await.unwrap();

    let audit = AuditStore::new(pool.clone(), Arc::new(SequentialIds::new("audit")));
    let checker = IntegrityChecker::new(
        pool.clone(),
        audit.clone(),
        Arc::new(SequentialIds::new("orphan")),
    );

    (pool, checker, audit)
}

async fn insert_organizer(pool: &SqlitePool, id: &str) {
    sqlx::query("INSERT INTO organizers (id, name, created_at) VALUES (?, ?, ?)")
        .bind(id)
        .bind("Test Organizer")
        .bind("2026-01-01T00:00:00Z")
        .execute(pool)
        .await
        .unwrap();
}

async fn insert_hackathon(pool: &SqlitePool, id: &str, organizer_id: Option<&str>) {
    sqlx::query("INSERT INTO hackathons (id, title, organizer_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind("Test Hackathon")
        .bind(organizer_id)
        .bind("2026-01-01T00:00:00Z")
        .execute(pool)
        .await
        .unwrap();
}

async fn insert_registration(pool: &SqlitePool, id: &str, user_id: &str, hackathon_id: &str) {
    sqlx::query(
        "INSERT INTO registrations (id, user_id, hackathon_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(user_id)
    .bind(hackathon_id)
    .bind("2026-01-01T00:00:00Z")
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_team(pool: &SqlitePool, id: &str, hackathon_id: &str) {
    sqlx::query("INSERT INTO teams (id, name, hackathon_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind("Test Team")
        .bind(hackathon_id)
        .bind("2026-01-01T00:00:00Z")
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn detects_orphan_iff_parent_missing() {
    let (pool, checker, _) = setup().await;

    insert_organizer(&pool, "org-1").await;
    insert_hackathon(&pool, "hack-ok", Some("org-1")).await;
    insert_hackathon(&pool, "hack-orphan", Some("org-missing")).await;

    let result = checker
        .detect_orphans(Some(&[OrphanType::HackathonWithoutOrganizer]))
        .await
        .unwrap();

    assert_eq!(result.total, 1);
    let orphan = &result.orphans[0];
    assert_eq!(orphan.orphan_type, OrphanType::HackathonWithoutOrganizer);
    assert_eq!(orphan.table_name, "hackathons");
    assert_eq!(orphan.missing_reference.table, "organizers");
    assert_eq!(orphan.missing_reference.column, "organizer_id");
    assert_eq!(
        orphan.missing_reference.expected_id.as_deref(),
        Some("org-missing")
    );
}

#[tokio::test]
async fn detects_null_reference_as_orphan() {
    let (pool, checker, _) = setup().await;

    insert_hackathon(&pool, "hack-null", None).await;

    let result = checker
        .detect_orphans(Some(&[OrphanType::HackathonWithoutOrganizer]))
        .await
        .unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.orphans[0].missing_reference.expected_id, None);
}

#[tokio::test]
async fn full_scan_covers_all_categories() {
    let (pool, checker, _) = setup().await;

    insert_hackathon(&pool, "hack-orphan", Some("org-missing")).await;
    insert_registration(&pool, "reg-orphan", "user-missing", "hack-orphan").await;
    insert_team(&pool, "team-orphan", "hack-missing").await;

    let result = checker.detect_orphans(None).await.unwrap();

    // hack-orphan lacks its organizer, reg-orphan lacks its user,
    // team-orphan lacks its hackathon. reg-orphan's hackathon exists.
    assert_eq!(result.total, 3);
    let categories: Vec<OrphanType> = result.orphans.iter().map(|o| o.orphan_type).collect();
    assert!(categories.contains(&OrphanType::HackathonWithoutOrganizer));
    assert!(categories.contains(&OrphanType::RegistrationWithoutUser));
    assert!(categories.contains(&OrphanType::TeamWithoutHackathon));
}

#[tokio::test]
async fn cleanup_deletes_orphans_and_writes_backup() {
    let (pool, checker, audit) = setup().await;

    insert_team(&pool, "team-1", "hack-missing").await;
    insert_team(&pool, "team-2", "hack-missing").await;

    let result = checker
        .cleanup(&CleanupRequest {
            orphan_type: OrphanType::TeamWithoutHackathon,
            ids: vec!["team-1".to_string(), "team-2".to_string()],
            reason: "Orphaned by hackathon deletion".to_string(),
            create_backup: true,
            admin_id: "admin-1".to_string(),
            admin_email: "admin@example.com".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.deleted, 2);
    assert_eq!(result.failed, 0);
    assert_eq!(result.deleted + result.failed, result.total);
    assert!(result.backup_id.is_some());

    // Rows are gone
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    // Backup entry snapshots the deleted rows and precedes the summary
    let backup = audit
        .get(result.backup_id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(backup.action_type, AuditAction::OrphanBackup);
    let rows = backup.before_state.unwrap()["rows"].clone();
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let summaries = audit
        .list(
            &AuditFilter {
                action_type: Some(AuditAction::OrphanCleanup),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    let after = summaries[0].after_state.clone().unwrap();
    assert_eq!(after["deleted"].as_array().unwrap().len(), 2);
    assert_eq!(after["failed"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn cleanup_without_backup_has_no_backup_id() {
    let (pool, checker, audit) = setup().await;

    insert_team(&pool, "team-1", "hack-missing").await;

    let result = checker
        .cleanup(&CleanupRequest {
            orphan_type: OrphanType::TeamWithoutHackathon,
            ids: vec!["team-1".to_string()],
            reason: "Cleanup without backup".to_string(),
            create_backup: false,
            admin_id: "admin-1".to_string(),
            admin_email: "admin@example.com".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.deleted, 1);
    assert!(result.backup_id.is_none());

    let backups = audit
        .list(
            &AuditFilter {
                action_type: Some(AuditAction::OrphanBackup),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();
    assert!(backups.is_empty());
}

#[tokio::test]
async fn cleanup_reverifies_at_act_time() {
    let (pool, checker, _) = setup().await;

    insert_registration(&pool, "reg-1", "user-missing", "hack-1").await;
    insert_registration(&pool, "reg-2", "user-late", "hack-1").await;

    // Both registrations are orphans at scan time
    let scan = checker
        .detect_orphans(Some(&[OrphanType::RegistrationWithoutUser]))
        .await
        .unwrap();
    assert_eq!(scan.total, 2);

    // The parent of reg-2 appears between detection and cleanup
    sqlx::query("INSERT INTO users (id, handle, created_at) VALUES (?, ?, ?)")
        .bind("user-late")
        .bind("late-arrival")
        .bind("2026-01-02T00:00:00Z")
        .execute(&pool)
        .await
        .unwrap();

    let result = checker
        .cleanup(&CleanupRequest {
            orphan_type: OrphanType::RegistrationWithoutUser,
            ids: vec!["reg-1".to_string(), "reg-2".to_string()],
            reason: "Stale scan cleanup".to_string(),
            create_backup: true,
            admin_id: "admin-1".to_string(),
            admin_email: "admin@example.com".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.deleted, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors[0].id, "reg-2");

    // reg-2 survived; reg-1 is gone
    let remaining: Vec<String> = sqlx::query_scalar("SELECT id FROM registrations")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, vec!["reg-2".to_string()]);
}

#[tokio::test]
async fn cleanup_partial_failure_keeps_invariant() {
    let (pool, checker, _) = setup().await;

    insert_team(&pool, "team-1", "hack-missing").await;

    // team-ghost was never inserted; it counts as a per-item failure
    let result = checker
        .cleanup(&CleanupRequest {
            orphan_type: OrphanType::TeamWithoutHackathon,
            ids: vec!["team-1".to_string(), "team-ghost".to_string()],
            reason: "Mixed batch".to_string(),
            create_backup: false,
            admin_id: "admin-1".to_string(),
            admin_email: "admin@example.com".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.deleted, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.deleted + result.failed, result.total);
}

#[tokio::test]
async fn cleanup_rejects_invalid_requests_before_io() {
    let (_pool, checker, audit) = setup().await;

    let result = checker
        .cleanup(&CleanupRequest {
            orphan_type: OrphanType::TeamWithoutHackathon,
            ids: vec![],
            reason: "Empty batch".to_string(),
            create_backup: true,
            admin_id: "admin-1".to_string(),
            admin_email: "admin@example.com".to_string(),
        })
        .await;
    assert!(matches!(result, Err(ModError::Validation(_))));

    let result = checker
        .cleanup(&CleanupRequest {
            orphan_type: OrphanType::TeamWithoutHackathon,
            ids: vec!["team-1".to_string()],
            reason: "".to_string(),
            create_backup: true,
            admin_id: "admin-1".to_string(),
            admin_email: "admin@example.com".to_string(),
        })
        .await;
    assert!(matches!(result, Err(ModError::Validation(_))));

    // Rejected requests leave no audit trail at all
    let entries = audit.list(&AuditFilter::default(), 10).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn clean_dataset_detects_nothing() {
    let (pool, checker, _) = setup().await;

    insert_organizer(&pool, "org-1").await;
    insert_hackathon(&pool, "hack-1", Some("org-1")).await;
    sqlx::query("INSERT INTO users (id, handle, created_at) VALUES (?, ?, ?)")
        .bind("user-1")
        .bind("somebody")
        .bind("2026-01-01T00:00:00Z")
        .execute(&pool)
        .await
        .unwrap();
    insert_registration(&pool, "reg-1", "user-1", "hack-1").await;
    insert_team(&pool, "team-1", "hack-1").await;

    let result = checker.detect_orphans(None).await.unwrap();
    assert_eq!(result.total, 0);
    assert!(result.orphans.is_empty());
}
