use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use batcher_core::models::{BatchTask, SubTask};
use batcher_core::orchestration::BatchRunOutcome;
use batcher_core::state_machine::{BatchTaskStatus, SubTaskStatus};

use crate::common::*;

#[sqlx::test(migrations = false)]
async fn test_sub_tasks_submitted_in_order_regardless_of_latency(pool: SqlitePool) {
    migrate(&pool).await;
    let id = create_seed_batch(&pool, "ordered", &[11, 22, 33]).await;

    let engine = Arc::new(MockEngine::new().with_latencies(vec![
        Duration::from_millis(60),
        Duration::from_millis(1),
        Duration::from_millis(30),
    ]));
    let scheduler = scheduler_with(&pool, engine.clone());

    let outcome = scheduler.poll_once(&CancellationToken::new()).await;
    assert_eq!(outcome, Some(BatchRunOutcome::Completed { processed: 3 }));

    assert_eq!(engine.submitted_seeds(), vec![seed(11), seed(22), seed(33)]);
    assert_eq!(engine.max_in_flight(), 1);

    let sub_tasks = SubTask::list_for_batch(&pool, id).await.unwrap();
    let results: Vec<_> = sub_tasks.iter().map(|s| s.result.clone()).collect();
    assert_eq!(
        results,
        vec![
            Some("job-1".to_string()),
            Some("job-2".to_string()),
            Some("job-3".to_string())
        ]
    );
    assert!(sub_tasks.iter().all(|s| s.status == SubTaskStatus::Completed));

    let task = fetch(&pool, id).await;
    assert_eq!(task.status, BatchTaskStatus::Completed);
    assert_eq!(task.completed_count, 3);
    assert_eq!(scheduler.current_batch_id(), None);
}

#[sqlx::test(migrations = false)]
async fn test_expanded_documents_leave_other_nodes_untouched(pool: SqlitePool) {
    migrate(&pool).await;
    create_seed_batch(&pool, "expand", &[5]).await;

    let engine = Arc::new(MockEngine::new());
    let scheduler = scheduler_with(&pool, engine.clone());
    scheduler.poll_once(&CancellationToken::new()).await;

    let submitted = engine.submissions();
    assert_eq!(submitted.len(), 1);
    let mut expected = sample_workflow();
    expected["3"]["inputs"]["seed"] = json!(5);
    assert_eq!(submitted[0], expected);
}

#[sqlx::test(migrations = false)]
async fn test_all_sub_tasks_failing_still_completes_batch(pool: SqlitePool) {
    migrate(&pool).await;
    let id = create_seed_batch(&pool, "doomed", &[1, 2, 3]).await;

    let engine = Arc::new(MockEngine::with_default_outcome(ScriptedOutcome::Fail(
        "sampler exploded".to_string(),
    )));
    let scheduler = scheduler_with(&pool, engine.clone());

    let outcome = scheduler.poll_once(&CancellationToken::new()).await;
    assert_eq!(outcome, Some(BatchRunOutcome::Completed { processed: 3 }));

    let task = fetch(&pool, id).await;
    assert_eq!(task.status, BatchTaskStatus::Completed);
    assert_eq!(task.completed_count, task.total_count);

    let sub_tasks = SubTask::list_for_batch(&pool, id).await.unwrap();
    assert_eq!(sub_tasks.len(), 3);
    for sub_task in sub_tasks {
        assert_eq!(sub_task.status, SubTaskStatus::Failed);
        assert_eq!(sub_task.result.as_deref(), Some("sampler exploded"));
    }

    let stats = scheduler.stats();
    assert_eq!(stats.batches_completed, 1);
    assert_eq!(stats.sub_tasks_failed, 3);
}

#[sqlx::test(migrations = false)]
async fn test_mixed_outcomes_are_recorded_per_sub_task(pool: SqlitePool) {
    migrate(&pool).await;
    let id = create_seed_batch(&pool, "mixed", &[1, 2, 3, 4]).await;

    let engine = Arc::new(MockEngine::new().with_script(vec![
        ScriptedOutcome::Complete,
        ScriptedOutcome::RejectSubmit("queue full".to_string()),
        ScriptedOutcome::TimeOut,
        ScriptedOutcome::Complete,
    ]));
    let scheduler = scheduler_with(&pool, engine.clone());
    scheduler.poll_once(&CancellationToken::new()).await;

    let sub_tasks = SubTask::list_for_batch(&pool, id).await.unwrap();
    let statuses: Vec<_> = sub_tasks.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            SubTaskStatus::Completed,
            SubTaskStatus::Failed,
            SubTaskStatus::Failed,
            SubTaskStatus::Completed
        ]
    );
    assert!(sub_tasks[1]
        .result
        .as_deref()
        .is_some_and(|r| r.contains("queue full")));
    assert!(sub_tasks[2]
        .result
        .as_deref()
        .is_some_and(|r| r.contains("Timed out")));

    // The rejected submission never reached the in-flight set
    assert_eq!(engine.submission_count(), 4);
    assert_eq!(scheduler.stats().sub_tasks_submitted, 3);

    let task = fetch(&pool, id).await;
    assert_eq!(task.status, BatchTaskStatus::Completed);
    assert_eq!(task.completed_count, 4);
}

#[sqlx::test(migrations = false)]
async fn test_progress_never_exceeds_total_during_run(pool: SqlitePool) {
    migrate(&pool).await;
    let id = create_seed_batch(&pool, "progress", &[1, 2, 3, 4, 5]).await;

    let engine = Arc::new(MockEngine::new().observing(pool.clone()));
    let scheduler = scheduler_with(&pool, engine.clone());
    scheduler.poll_once(&CancellationToken::new()).await;

    let observations = engine.observations();
    assert_eq!(observations.len(), 5);
    for (index, observation) in observations.iter().enumerate() {
        let (_, completed, total) = observation
            .progress
            .iter()
            .copied()
            .find(|(batch_id, _, _)| *batch_id == id)
            .unwrap();
        assert!(completed <= total);
        assert_eq!(completed, index as i64);
        assert_eq!(observation.running_batch_ids, vec![id]);
    }
}

#[sqlx::test(migrations = false)]
async fn test_progress_is_clamped_when_sub_tasks_outnumber_total(pool: SqlitePool) {
    migrate(&pool).await;
    let config = serde_json::to_string(&seed_config(&[1])).unwrap();
    let id = BatchTask::create(&pool, "lopsided", &config, 1).await.unwrap();
    let params = vec![
        r#"{"node_id": "3", "field": "seed", "value": 1}"#.to_string(),
        r#"{"node_id": "3", "field": "seed", "value": 2}"#.to_string(),
        r#"{"node_id": "3", "field": "seed", "value": 3}"#.to_string(),
    ];
    let mut conn = pool.acquire().await.unwrap();
    SubTask::create_many(&mut conn, id, &params).await.unwrap();
    drop(conn);

    let engine = Arc::new(MockEngine::new());
    let scheduler = scheduler_with(&pool, engine.clone());
    let outcome = scheduler.poll_once(&CancellationToken::new()).await;

    assert_eq!(outcome, Some(BatchRunOutcome::Completed { processed: 3 }));
    let task = fetch(&pool, id).await;
    assert_eq!(task.status, BatchTaskStatus::Completed);
    assert_eq!(task.completed_count, 1);
}

#[sqlx::test(migrations = false)]
async fn test_undecodable_config_marks_batch_failed(pool: SqlitePool) {
    migrate(&pool).await;
    let id = BatchTask::create(&pool, "broken", "{not json", 1).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    SubTask::create_many(&mut conn, id, &["null".to_string()])
        .await
        .unwrap();
    drop(conn);

    let engine = Arc::new(MockEngine::new());
    let scheduler = scheduler_with(&pool, engine.clone());
    let outcome = scheduler.poll_once(&CancellationToken::new()).await;

    assert!(matches!(outcome, Some(BatchRunOutcome::Failed { .. })));
    assert_eq!(engine.submission_count(), 0);

    let task = fetch(&pool, id).await;
    assert_eq!(task.status, BatchTaskStatus::Failed);
    assert_eq!(task.completed_count, 0);
    assert_eq!(scheduler.stats().batches_failed, 1);
    assert_eq!(scheduler.current_batch_id(), None);
}

#[sqlx::test(migrations = false)]
async fn test_unparseable_sub_task_params_submit_the_template(pool: SqlitePool) {
    migrate(&pool).await;
    let config = serde_json::to_string(&seed_config(&[])).unwrap();
    let id = BatchTask::create(&pool, "odd params", &config, 1).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    SubTask::create_many(&mut conn, id, &["\"seed\"".to_string()])
        .await
        .unwrap();
    drop(conn);

    let engine = Arc::new(MockEngine::new());
    let scheduler = scheduler_with(&pool, engine.clone());
    scheduler.poll_once(&CancellationToken::new()).await;

    assert_eq!(engine.submissions(), vec![sample_workflow()]);
    assert_eq!(fetch(&pool, id).await.status, BatchTaskStatus::Completed);
}

#[sqlx::test(migrations = false)]
async fn test_batches_are_served_in_creation_order(pool: SqlitePool) {
    migrate(&pool).await;
    let first = create_seed_batch(&pool, "first", &[1]).await;
    let second = create_seed_batch(&pool, "second", &[2]).await;

    let engine = Arc::new(MockEngine::new());
    let scheduler = scheduler_with(&pool, engine.clone());
    let token = CancellationToken::new();

    scheduler.poll_once(&token).await;
    assert_eq!(fetch(&pool, first).await.status, BatchTaskStatus::Completed);
    assert_eq!(fetch(&pool, second).await.status, BatchTaskStatus::Pending);

    scheduler.poll_once(&token).await;
    assert_eq!(fetch(&pool, second).await.status, BatchTaskStatus::Completed);
    assert_eq!(engine.submitted_seeds(), vec![seed(1), seed(2)]);

    assert_eq!(scheduler.poll_once(&token).await, None);
}

#[sqlx::test(migrations = false)]
async fn test_cancelled_token_leaves_batch_running(pool: SqlitePool) {
    migrate(&pool).await;
    let id = create_seed_batch(&pool, "stopped", &[1, 2]).await;

    let engine = Arc::new(MockEngine::new());
    let scheduler = scheduler_with(&pool, engine.clone());
    let token = CancellationToken::new();
    token.cancel();

    let outcome = scheduler.poll_once(&token).await;
    assert_eq!(outcome, Some(BatchRunOutcome::Interrupted { processed: 0 }));
    assert_eq!(engine.submission_count(), 0);

    let task = fetch(&pool, id).await;
    assert_eq!(task.status, BatchTaskStatus::Running);
    assert_eq!(task.completed_count, 0);
}

#[sqlx::test(migrations = false)]
async fn test_rearmed_batch_reexecutes_every_sub_task(pool: SqlitePool) {
    migrate(&pool).await;
    let id = create_seed_batch(&pool, "again", &[7, 8]).await;

    let engine = Arc::new(MockEngine::new().with_script(vec![
        ScriptedOutcome::Fail("first pass".to_string()),
        ScriptedOutcome::Complete,
    ]));
    let scheduler = scheduler_with(&pool, engine.clone());
    let token = CancellationToken::new();
    scheduler.poll_once(&token).await;

    assert!(BatchTask::rearm(&pool, id).await.unwrap());
    let rearmed = fetch(&pool, id).await;
    assert_eq!(rearmed.status, BatchTaskStatus::Pending);
    assert_eq!(rearmed.completed_count, 0);

    scheduler.poll_once(&token).await;
    assert_eq!(
        engine.submitted_seeds(),
        vec![seed(7), seed(8), seed(7), seed(8)]
    );
    let sub_tasks = SubTask::list_for_batch(&pool, id).await.unwrap();
    assert!(sub_tasks.iter().all(|s| s.status == SubTaskStatus::Completed));
    assert_eq!(fetch(&pool, id).await.completed_count, 2);
}
