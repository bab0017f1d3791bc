//! Snapshot, rollback, and log-recovery behavior through the pipeline.

use serde_json::json;
use std::fs;
use tempfile::TempDir;

use gl_intent::GisContext;
use gl_pipeline::{CommandPipeline, MockGeoProcessor, PipelineConfig};
use gl_query::MockStatsProvider;

fn pipeline_in(dir: &TempDir, max_snapshots: usize) -> CommandPipeline {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let config = PipelineConfig {
        log_dir: dir.path().to_path_buf(),
        max_snapshots,
        ..Default::default()
    };
    CommandPipeline::open(
        &config,
        Box::new(MockStatsProvider::with_sample_layers()),
        Box::new(MockGeoProcessor::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn command_with_snapshot_can_roll_back() {
    let dir = TempDir::new().unwrap();
    let pipe = pipeline_in(&dir, 10);
    let ctx = GisContext::with_layers(["rivers"]);

    let state = json!({"layers": ["rivers"], "selection": []});
    let outcome = pipe
        .run_command("buffer the rivers layer by 500 meters", &ctx, Some(&state))
        .await;
    assert!(outcome.success, "{}", outcome.message);

    let (tx_id, restored) = pipe.rollback_to_last_state().unwrap();
    assert_eq!(restored, state);
    assert_eq!(Some(tx_id), outcome.transaction_id);
}

#[tokio::test]
async fn snapshots_pruned_to_retention_limit() {
    let dir = TempDir::new().unwrap();
    let pipe = pipeline_in(&dir, 3);
    let ctx = GisContext::with_layers(["rivers"]);

    let mut tx_ids = Vec::new();
    for version in 0..5 {
        let state = json!({"version": version});
        let outcome = pipe
            .run_command("buffer the rivers layer by 500 meters", &ctx, Some(&state))
            .await;
        tx_ids.push(outcome.transaction_id.unwrap());
    }

    // All five attempts remain in history.
    assert_eq!(pipe.guard().transactions().len(), 5);

    // Only the newest three snapshots still load.
    assert!(pipe.guard().rollback_to_transaction(&tx_ids[0]).is_none());
    assert!(pipe.guard().rollback_to_transaction(&tx_ids[1]).is_none());
    for id in &tx_ids[2..] {
        assert!(pipe.guard().rollback_to_transaction(id).is_some());
    }

    // Latest rollback serves the newest state.
    let (_, state) = pipe.rollback_to_last_state().unwrap();
    assert_eq!(state, json!({"version": 4}));
}

#[tokio::test]
async fn latest_snapshot_skips_missing_blob() {
    let dir = TempDir::new().unwrap();
    let pipe = pipeline_in(&dir, 10);
    let ctx = GisContext::with_layers(["rivers"]);

    pipe.run_command(
        "buffer the rivers layer by 500 meters",
        &ctx,
        Some(&json!({"version": 0})),
    )
    .await;
    let newest = pipe
        .run_command(
            "buffer the rivers layer by 600 meters",
            &ctx,
            Some(&json!({"version": 1})),
        )
        .await
        .transaction_id
        .unwrap();

    // Remove the newest blob out from under the log.
    let states_dir = dir.path().join("states");
    fs::remove_file(states_dir.join(format!("state_{newest}.bin"))).unwrap();

    let (recovered_tx, state) = pipe.rollback_to_last_state().unwrap();
    assert_ne!(recovered_tx, newest);
    assert_eq!(state, json!({"version": 0}));
}

#[tokio::test]
async fn corrupted_transaction_log_recovers_on_startup() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("transaction_log.json"),
        "this is definitely not json",
    )
    .unwrap();

    // Opening the pipeline backs the file up instead of failing.
    let pipe = pipeline_in(&dir, 10);
    assert_eq!(pipe.guard().transactions().len(), 0);

    let backups: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("transaction_log.json.bak.")
        })
        .collect();
    assert_eq!(backups.len(), 1, "corrupt log renamed, not deleted");

    // And the pipeline is fully usable afterwards.
    let ctx = GisContext::with_layers(["rivers"]);
    let outcome = pipe
        .run_command("buffer the rivers layer by 500 meters", &ctx, None)
        .await;
    assert!(outcome.success, "{}", outcome.message);
}

#[tokio::test]
async fn error_history_feeds_risk_statistics() {
    let dir = TempDir::new().unwrap();
    let pipe = {
        let config = PipelineConfig {
            log_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        CommandPipeline::open(
            &config,
            Box::new(MockStatsProvider::with_sample_layers()),
            Box::new(MockGeoProcessor::failing_on(&[gl_intent::Operation::Buffer])),
        )
        .unwrap()
    };
    let ctx = GisContext::with_layers(["rivers"]);

    for _ in 0..3 {
        let outcome = pipe
            .run_command("buffer the rivers layer by 500 meters", &ctx, None)
            .await;
        assert!(!outcome.success);
    }

    let stats = pipe.guard().error_statistics();
    assert_eq!(stats.total_errors, 3);
    let execution_errors = &stats.error_types["execution_error"];
    assert_eq!(execution_errors.count, 3);
    assert_eq!(
        execution_errors.most_common_preceding_operation.as_deref(),
        Some("buffer")
    );
}
