use serde_json::json;
use sqlx::SqlitePool;

use batcher_core::error::BatcherError;
use batcher_core::models::{BatchTask, SubTask};
use batcher_core::services::{BatchTaskService, DEFAULT_BATCH_NAME};
use batcher_core::state_machine::{BatchTaskStatus, SubTaskStatus};

use crate::common::*;

#[sqlx::test(migrations = false)]
async fn test_create_defaults_blank_name(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());

    let unnamed = service.create(None, seed_config(&[1])).await.unwrap();
    let blank = service.create(Some("   "), seed_config(&[1])).await.unwrap();

    assert_eq!(fetch(&pool, unnamed).await.name, DEFAULT_BATCH_NAME);
    assert_eq!(fetch(&pool, blank).await.name, DEFAULT_BATCH_NAME);
}

#[sqlx::test(migrations = false)]
async fn test_create_from_json_accepts_single_and_list_entries(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());

    let id = service
        .create_from_json(
            Some("mixed"),
            Some(json!(sample_workflow())),
            Some(json!([
                {"node_id": "3", "field": "seed", "value": 1},
                [
                    {"node_id": "3", "field": "seed", "value": 2},
                    {"node_id": "3", "field": "steps", "value": 30}
                ]
            ])),
        )
        .await
        .unwrap();

    let detail = service.get(id).await.unwrap();
    assert_eq!(detail.task.total_count, 2);
    assert_eq!(detail.sub_tasks.len(), 2);
    assert_eq!(detail.sub_tasks[1].overrides().len(), 2);
}

#[sqlx::test(migrations = false)]
async fn test_create_with_no_params_makes_empty_batch(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());

    let id = service
        .create_from_json(None, Some(json!(sample_workflow())), None)
        .await
        .unwrap();
    let detail = service.get(id).await.unwrap();
    assert_eq!(detail.task.total_count, 0);
    assert!(detail.sub_tasks.is_empty());
}

#[sqlx::test(migrations = false)]
async fn test_create_rejects_non_object_workflow(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());

    let result = service
        .create_from_json(None, Some(json!("not a graph")), None)
        .await;
    assert!(matches!(result, Err(BatcherError::ValidationError(_))));
    assert!(service.list(10).await.unwrap().is_empty());
}

#[sqlx::test(migrations = false)]
async fn test_trigger_completed_batch_resets_it(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());
    let id = create_seed_batch(&pool, "done", &[1, 2]).await;

    BatchTask::claim(&pool, id).await.unwrap();
    for sub_task in SubTask::list_for_batch(&pool, id).await.unwrap() {
        SubTask::update(&pool, sub_task.id, SubTaskStatus::Completed, Some("job"))
            .await
            .unwrap();
    }
    BatchTask::update_status(&pool, id, BatchTaskStatus::Completed, Some(2))
        .await
        .unwrap();

    service.trigger(id).await.unwrap();

    let detail = service.get(id).await.unwrap();
    assert_eq!(detail.task.status, BatchTaskStatus::Pending);
    assert_eq!(detail.task.completed_count, 0);
    assert!(detail
        .sub_tasks
        .iter()
        .all(|s| s.status == SubTaskStatus::Pending && s.result.is_none()));
}

#[sqlx::test(migrations = false)]
async fn test_trigger_pending_and_failed_batches(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());
    let pending = create_seed_batch(&pool, "pending", &[1]).await;
    let failed = create_seed_batch(&pool, "failed", &[1]).await;
    BatchTask::update_status(&pool, failed, BatchTaskStatus::Failed, None)
        .await
        .unwrap();

    service.trigger(pending).await.unwrap();
    service.trigger(failed).await.unwrap();

    assert_eq!(fetch(&pool, pending).await.status, BatchTaskStatus::Pending);
    assert_eq!(fetch(&pool, failed).await.status, BatchTaskStatus::Pending);
}

#[sqlx::test(migrations = false)]
async fn test_trigger_running_batch_is_conflict(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());
    let id = create_seed_batch(&pool, "busy", &[1, 2]).await;
    BatchTask::claim(&pool, id).await.unwrap();
    BatchTask::update_status(&pool, id, BatchTaskStatus::Running, Some(1))
        .await
        .unwrap();
    let before = fetch(&pool, id).await;

    let result = service.trigger(id).await;
    assert!(matches!(result, Err(BatcherError::Conflict(_))));

    let after = fetch(&pool, id).await;
    assert_eq!(after.status, BatchTaskStatus::Running);
    assert_eq!(after.completed_count, 1);
    assert_eq!(after.updated_at, before.updated_at);
}

#[sqlx::test(migrations = false)]
async fn test_missing_ids_are_not_found(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());

    assert!(matches!(service.trigger(42).await, Err(BatcherError::NotFound(42))));
    assert!(matches!(service.get(42).await, Err(BatcherError::NotFound(42))));
    assert!(matches!(service.delete(42).await, Err(BatcherError::NotFound(42))));
}

#[sqlx::test(migrations = false)]
async fn test_delete_removes_batch_and_sub_tasks(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());
    let id = create_seed_batch(&pool, "delete me", &[1, 2, 3]).await;

    service.delete(id).await.unwrap();

    assert!(matches!(service.get(id).await, Err(BatcherError::NotFound(_))));
    assert!(SubTask::list_for_batch(&pool, id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = false)]
async fn test_list_is_newest_first_and_limited(pool: SqlitePool) {
    migrate(&pool).await;
    let service = BatchTaskService::new(pool.clone());
    let mut ids = Vec::new();
    for name in ["one", "two", "three"] {
        ids.push(create_seed_batch(&pool, name, &[1]).await);
    }

    let listed: Vec<i64> = service.list(2).await.unwrap().iter().map(|t| t.id).collect();
    assert_eq!(listed, vec![ids[2], ids[1]]);

    // Non-positive limits still return one row
    assert_eq!(service.list(0).await.unwrap().len(), 1);

    let pending = service.list_pending().await.unwrap();
    assert_eq!(pending.iter().map(|t| t.id).collect::<Vec<_>>(), ids);
}
