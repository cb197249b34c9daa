use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::{FutureExt, Stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, StudioError};
use crate::events::{Operation, StudioEvent};
use crate::prompt;
use crate::session::Session;
use crate::types::{BatchSummary, Dish, PhotoStyle};
use crate::ImageGenerator;

/// Drives sequential generation of one image per dish.
///
/// Dishes are processed strictly in input order: dish *i+1*'s request is
/// never sent before dish *i*'s has resolved. A failing dish marks its own
/// item `Failed`, overwrites the batch-global error, and the batch moves on.
pub struct BatchOrchestrator<G: ImageGenerator> {
    generator: Arc<G>,
    session: Arc<Session>,
}

impl<G: ImageGenerator> Clone for BatchOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            session: Arc::clone(&self.session),
        }
    }
}

impl<G: ImageGenerator> BatchOrchestrator<G> {
    pub fn new(generator: Arc<G>, session: Arc<Session>) -> Self {
        Self { generator, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Start generating one image per dish in `style`.
    ///
    /// Validation happens synchronously: an empty dish list, duplicate dish
    /// IDs or a batch that is already running are rejected with
    /// [`StudioError::Validation`] and leave the session untouched.
    /// Otherwise the previous items are replaced and the run is spawned on
    /// the current tokio runtime.
    ///
    /// The run always finishes in the background, even if the returned
    /// [`BatchRun`] is dropped; in-flight requests are never aborted.
    pub fn generate_batch(&self, dishes: Vec<Dish>, style: PhotoStyle) -> Result<BatchRun> {
        if dishes.is_empty() {
            return Err(StudioError::Validation("Please upload a menu first.".into()));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = dishes.iter().find(|d| !seen.insert(d.id.as_str())) {
            return Err(StudioError::Validation(format!(
                "Duplicate dish id {} ({})",
                dup.id, dup.name
            )));
        }

        let started_at = Utc::now();
        let epoch = self.session.begin_batch(started_at)?;
        let total = dishes.len();

        tracing::info!(total, style = %style, "starting batch generation");

        let (tx, rx) = mpsc::unbounded_channel();
        let run = BatchTask {
            generator: Arc::clone(&self.generator),
            session: Arc::clone(&self.session),
            epoch,
            started_at,
            tx,
        };
        let running = RunningBatch {
            session: Arc::clone(&self.session),
            epoch,
        };
        let handle = tokio::spawn(async move {
            let _running = running;
            run.execute(dishes, style).await
        });

        Ok(BatchRun {
            events: rx,
            handle,
            total,
        })
    }
}

struct BatchTask<G: ImageGenerator> {
    generator: Arc<G>,
    session: Arc<Session>,
    epoch: u64,
    started_at: DateTime<Utc>,
    tx: mpsc::UnboundedSender<StudioEvent>,
}

impl<G: ImageGenerator> BatchTask<G> {
    fn emit(&self, event: StudioEvent) {
        self.session.publish(event.clone());
        // The consumer may have stopped listening; the batch keeps going.
        let _ = self.tx.send(event);
    }

    async fn execute(self, dishes: Vec<Dish>, style: PhotoStyle) -> BatchSummary {
        let clock = Instant::now();
        let total = dishes.len();
        let mut succeeded = 0;
        let mut failed = 0;

        self.emit(StudioEvent::BatchStarted {
            total,
            started_at: self.started_at,
        });

        for dish in &dishes {
            let prompt = prompt::render(style, &dish.name);
            let Some(item) = self.session.push_loading(self.epoch, dish, prompt.clone()) else {
                tracing::warn!(dish = %dish.name, "session replaced during batch, stopping");
                break;
            };
            self.emit(StudioEvent::ItemLoading {
                operation: Operation::Generate,
                item,
            });

            let call = AssertUnwindSafe(self.generator.generate(&prompt)).catch_unwind();
            let result = match call.await {
                Ok(Ok(image)) if image.is_empty() => {
                    Err(StudioError::NoImage("No images were generated.".into()))
                }
                Ok(other) => other,
                Err(panic) => Err(StudioError::Generation(format!(
                    "Image generator panicked: {}",
                    panic_message(panic.as_ref())
                ))),
            };

            match result {
                Ok(image) => {
                    succeeded += 1;
                    tracing::debug!(dish = %dish.name, "dish generated");
                    if let Some(item) = self.session.mark_ready(self.epoch, &dish.id, image, None) {
                        self.emit(StudioEvent::ItemReady {
                            operation: Operation::Generate,
                            item,
                        });
                    }
                }
                Err(e) => {
                    failed += 1;
                    let message = e.to_string();
                    let global = format!(
                        "Failed to generate image for \"{}\": {}",
                        dish.name, message
                    );
                    tracing::warn!(dish = %dish.name, error = %message, "dish generation failed");
                    if let Some(item) = self.session.mark_failed(
                        self.epoch,
                        &dish.id,
                        message,
                        Some(global.clone()),
                    ) {
                        self.emit(StudioEvent::ItemFailed {
                            operation: Operation::Generate,
                            item,
                            global_error: Some(global),
                        });
                    }
                }
            }
        }

        self.session.finish_batch(self.epoch);

        let summary = BatchSummary {
            total,
            succeeded,
            failed,
            started_at: self.started_at,
            completed_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
        };
        tracing::info!(
            total,
            succeeded,
            failed,
            duration_ms = summary.duration_ms,
            "batch generation finished"
        );
        self.emit(StudioEvent::BatchCompleted {
            summary: summary.clone(),
        });
        summary
    }
}

/// Clears the "generating" marker when the batch task ends, however it ends.
struct RunningBatch {
    session: Arc<Session>,
    epoch: u64,
}

impl Drop for RunningBatch {
    fn drop(&mut self) {
        self.session.finish_batch(self.epoch);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Handle to a running batch.
///
/// Yields one [`StudioEvent`] per transition as a [`Stream`]: `BatchStarted`,
/// then `ItemLoading` followed by `ItemReady` or `ItemFailed` for each dish
/// in order, and finally `BatchCompleted`. The stream ends after
/// `BatchCompleted`.
pub struct BatchRun {
    events: mpsc::UnboundedReceiver<StudioEvent>,
    handle: JoinHandle<BatchSummary>,
    total: usize,
}

impl BatchRun {
    /// Number of dishes in this batch.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Next transition, or `None` once the batch has finished.
    pub async fn next_event(&mut self) -> Option<StudioEvent> {
        self.events.recv().await
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the last dish to resolve and return the summary.
    pub async fn wait(self) -> Result<BatchSummary> {
        self.handle
            .await
            .map_err(|e| StudioError::Generation(format!("Batch task failed: {}", e)))
    }
}

impl Stream for BatchRun {
    type Item = StudioEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LifecycleState;
    use futures::StreamExt;
    use std::sync::Mutex;

    /// Fails every prompt that mentions one of `failing`.
    #[derive(Default)]
    struct ScriptedGenerator {
        failing: Vec<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ImageGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.failing.iter().any(|f| prompt.contains(f.as_str())) {
                return Err(StudioError::Http {
                    status: 500,
                    body: "backend exploded".into(),
                });
            }
            Ok(format!("data:image/jpeg;base64,{}", prompt.len()))
        }

        async fn edit(&self, base: &str, _mime: &str, _instruction: &str) -> Result<String> {
            Ok(base.to_string())
        }
    }

    fn orchestrator(failing: &[&str]) -> (BatchOrchestrator<ScriptedGenerator>, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        });
        let session = Arc::new(Session::default());
        (BatchOrchestrator::new(Arc::clone(&generator), session), generator)
    }

    fn dishes(names: &[&str]) -> Vec<Dish> {
        names.iter().map(|n| Dish::new(*n)).collect()
    }

    #[tokio::test]
    async fn test_empty_batch_is_validation_error() {
        let (orch, generator) = orchestrator(&[]);
        let err = orch
            .generate_batch(Vec::new(), PhotoStyle::BrightModern)
            .err()
            .unwrap();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Please upload a menu first.");
        assert!(generator.prompts.lock().unwrap().is_empty());
        assert!(!orch.session().is_generating());
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let (orch, _) = orchestrator(&[]);
        let batch = vec![Dish::new("A").with_id("x"), Dish::new("B").with_id("x")];
        let err = orch
            .generate_batch(batch, PhotoStyle::BrightModern)
            .err()
            .unwrap();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_batch_generates_in_order() {
        let (orch, generator) = orchestrator(&[]);
        let run = orch
            .generate_batch(dishes(&["Soup", "Salad", "Steak"]), PhotoStyle::RusticDark)
            .unwrap();
        assert_eq!(run.total(), 3);

        let summary = run.wait().await.unwrap();
        assert_eq!(summary.succeeded, 3);
        assert!(!summary.has_errors());

        let items = orch.session().items();
        let names: Vec<_> = items.iter().map(|i| i.dish_name.as_str()).collect();
        assert_eq!(names, vec!["Soup", "Salad", "Steak"]);
        assert!(items.iter().all(|i| i.state == LifecycleState::Ready));

        let prompts = generator.prompts.lock().unwrap().clone();
        assert_eq!(prompts[0], prompt::render(PhotoStyle::RusticDark, "Soup"));
        assert_eq!(prompts[2], prompt::render(PhotoStyle::RusticDark, "Steak"));
        assert!(!orch.session().is_generating());
    }

    #[tokio::test]
    async fn test_event_sequence() {
        let (orch, _) = orchestrator(&["Salad"]);
        let run = orch
            .generate_batch(dishes(&["Soup", "Salad"]), PhotoStyle::BrightModern)
            .unwrap();
        let events: Vec<StudioEvent> = run.collect().await;

        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], StudioEvent::BatchStarted { total: 2, .. }));
        assert!(matches!(events[1], StudioEvent::ItemLoading { .. }));
        assert!(matches!(events[2], StudioEvent::ItemReady { .. }));
        assert!(matches!(events[3], StudioEvent::ItemLoading { .. }));
        match &events[4] {
            StudioEvent::ItemFailed {
                item, global_error, ..
            } => {
                assert_eq!(item.dish_name, "Salad");
                assert!(global_error.as_deref().unwrap().contains("Salad"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match &events[5] {
            StudioEvent::BatchCompleted { summary } => {
                assert_eq!(summary.succeeded, 1);
                assert_eq!(summary.failed, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    struct PanicsOnBoom;

    impl ImageGenerator for PanicsOnBoom {
        async fn generate(&self, prompt: &str) -> Result<String> {
            if prompt.contains("Boom") {
                panic!("generator blew up");
            }
            Ok("data:image/jpeg;base64,QUJD".into())
        }

        async fn edit(&self, base: &str, _mime: &str, _instruction: &str) -> Result<String> {
            Ok(base.to_string())
        }
    }

    #[tokio::test]
    async fn test_generator_panic_fails_only_its_item() {
        let session = Arc::new(Session::default());
        let orch = BatchOrchestrator::new(Arc::new(PanicsOnBoom), Arc::clone(&session));

        let summary = orch
            .generate_batch(dishes(&["Soup", "Boom Burger", "Steak"]), PhotoStyle::BrightModern)
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let items = session.items();
        assert_eq!(items[1].state, LifecycleState::Failed);
        assert!(items[1]
            .error_message
            .as_deref()
            .unwrap()
            .contains("generator blew up"));
        assert_eq!(items[2].state, LifecycleState::Ready);
        assert!(session.global_error().unwrap().contains("Boom Burger"));

        assert!(!session.is_generating());
        assert!(session.clear().is_ok());
        assert!(orch
            .generate_batch(dishes(&["Soup"]), PhotoStyle::BrightModern)
            .is_ok());
    }

    #[tokio::test]
    async fn test_generating_flag_cleared_when_task_is_aborted() {
        let session = Arc::new(Session::default());
        let orch = BatchOrchestrator::new(Arc::new(PanicsOnBoom), Arc::clone(&session));
        let run = orch
            .generate_batch(dishes(&["Soup"]), PhotoStyle::BrightModern)
            .unwrap();
        assert!(session.is_generating());

        run.handle.abort();
        assert!(run.wait().await.is_err());
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn test_second_batch_rejected_while_running() {
        let (orch, _) = orchestrator(&[]);
        let run = orch
            .generate_batch(dishes(&["Soup"]), PhotoStyle::BrightModern)
            .unwrap();
        let err = orch
            .generate_batch(dishes(&["Salad"]), PhotoStyle::BrightModern)
            .err()
            .unwrap();
        assert!(err.is_validation());
        run.wait().await.unwrap();

        assert!(orch
            .generate_batch(dishes(&["Salad"]), PhotoStyle::BrightModern)
            .is_ok());
    }
}
