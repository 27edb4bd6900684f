//! QA tests for background generation and cancellation.
//!
//! Run with: `cargo test -p studio-core --test qa_task`

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use studio_core::testing::sample_proposal_json;
use studio_core::{
    AppState, BackendError, Category, Constraints, GenerationTask, ProposalEngine, TaskOutcome,
    TextBackend,
};

/// Backend that answers after a delay, like a slow model.
struct DelayedBackend {
    delay: Duration,
}

#[async_trait]
impl TextBackend for DelayedBackend {
    fn name(&self) -> &str {
        "delayed"
    }

    async fn generate_json(&self, _prompt: &str) -> Result<String, BackendError> {
        tokio::time::sleep(self.delay).await;
        Ok(sample_proposal_json(4, 2))
    }

    async fn generate_text(&self, _prompt: &str) -> Result<String, BackendError> {
        Err(BackendError::Unavailable("text not scripted".into()))
    }
}

fn engine(delay_ms: u64) -> ProposalEngine {
    ProposalEngine::new(Arc::new(DelayedBackend {
        delay: Duration::from_millis(delay_ms),
    }))
}

fn constraints() -> Constraints {
    Constraints::new("Story", 4, 9, 25_000.0).unwrap()
}

#[tokio::test]
async fn test_completed_task_feeds_app_state() {
    let task = GenerationTask::spawn(engine(50), constraints());
    let outcome = task.wait(Duration::from_millis(10), |_| {}).await;

    let TaskOutcome::Completed(Ok(set)) = outcome else {
        panic!("expected a completed set, got {outcome:?}");
    };
    let mut state = AppState::new();
    state.apply_proposals(set);
    assert_eq!(state.pool.visible(Category::Achievable).len(), 3);
    assert_eq!(state.pool.hidden_len(Category::Achievable), 1);
}

#[tokio::test]
async fn test_cancel_before_result_keeps_state_unchanged() {
    let state = AppState::new();
    let task = GenerationTask::spawn(engine(300), constraints());
    let token = task.cancel_token();

    let mut ticks = 0;
    let outcome = task
        .wait(Duration::from_millis(10), |_| {
            ticks += 1;
            if ticks == 3 {
                token.cancel();
            }
        })
        .await;

    assert!(matches!(outcome, TaskOutcome::Cancelled));
    assert!(ticks >= 3);

    assert!(state.proposals.is_none());
    assert!(state.pool.is_empty());
}

#[tokio::test]
async fn test_progress_ticks_report_elapsed_time() {
    let task = GenerationTask::spawn(engine(100), constraints());
    let mut elapsed = Vec::new();
    task.wait(Duration::from_millis(15), |e| elapsed.push(e)).await;

    assert!(!elapsed.is_empty());
    assert!(elapsed.windows(2).all(|w| w[0] <= w[1]));
    assert!(elapsed.iter().all(|e| *e < Duration::from_secs(5)));
}
