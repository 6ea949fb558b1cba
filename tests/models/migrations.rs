use sqlx::SqlitePool;

use batcher_core::database::DatabaseMigrations;

#[sqlx::test(migrations = false)]
async fn test_migrations_apply_once(pool: SqlitePool) {
    DatabaseMigrations::run_all(&pool).await.unwrap();
    DatabaseMigrations::run_all(&pool).await.unwrap();

    let applied = DatabaseMigrations::applied_versions(&pool).await.unwrap();
    let expected: Vec<String> = DatabaseMigrations::all()
        .iter()
        .map(|m| m.version.to_string())
        .collect();
    assert_eq!(applied, expected);
    assert_eq!(applied.len(), 2);
}

#[sqlx::test(migrations = false)]
async fn test_progress_constraint_is_enforced_by_store(pool: SqlitePool) {
    DatabaseMigrations::run_all(&pool).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO batch_tasks (name, status, config, total_count, completed_count, created_at, updated_at)
         VALUES ('bad', 'pending', '{}', 1, 2, '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}
