//! Generation job controller for one product view.
//!
//! [`GenerationJobController::spawn`] starts a single Tokio task that
//! exclusively owns the view's mutable state: the product snapshot, the
//! tracked job, and the poll timer. User actions arrive as commands through
//! a [`ControllerHandle`]; network results arrive as events from short-lived
//! request tasks. Every mutation therefore happens on one logical thread
//! and no locks are needed.
//!
//! State is published through a [`tokio::sync::watch`] channel. Call
//! [`ControllerHandle::subscribe`] to observe it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use prodgen_client::{ApiError, JobApi, ResourceApi};
use prodgen_core::job::{
    poll_gave_up_message, reconcile_poll, JobId, JobState, JobStatusReport, PollDecision,
    StartJobResponse, DEFAULT_POLL_INTERVAL,
};
use prodgen_core::product::Product;
use prodgen_core::types::DbId;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Tunable polling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed delay between a poll resolving and the next one being sent.
    pub interval: Duration,
    /// Give up after this many consecutive transient poll failures.
    /// `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: None,
        }
    }
}

/// Everything a view needs to render the product screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    pub product_id: DbId,
    /// Last successfully loaded product.
    pub product: Option<Product>,
    /// A product fetch is in flight.
    pub loading: bool,
    /// Error text of the most recent failed product fetch.
    pub load_error: Option<String>,
    pub job: JobState,
    /// Transient message for a start request that never produced a job.
    pub notice: Option<String>,
    /// Consecutive transient failures while polling the current job.
    pub poll_failures: u32,
}

impl ControllerSnapshot {
    fn new(product_id: DbId) -> Self {
        Self {
            product_id,
            product: None,
            loading: true,
            load_error: None,
            job: JobState::Idle,
            notice: None,
            poll_failures: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// A job is already Starting or Polling for this product.
    #[error("A generation job is already running for this product")]
    JobInProgress,

    /// The controller task has stopped.
    #[error("Controller has shut down")]
    ShutDown,
}

enum Command {
    Generate {
        template_ids: Vec<DbId>,
        reply: oneshot::Sender<Result<(), ControllerError>>,
    },
    Reset,
    Reload,
}

enum Event {
    Started {
        attempt: u64,
        result: Result<StartJobResponse, ApiError>,
    },
    Polled {
        job_id: JobId,
        result: Result<JobStatusReport, ApiError>,
    },
    Loaded {
        seq: u64,
        result: Result<Product, ApiError>,
    },
}

/// Next scheduled poll. Bound to the job it was scheduled for, so a timer
/// can never fire against a different job.
#[derive(Debug, Clone)]
struct PollTimer {
    job_id: JobId,
    deadline: Instant,
}

/// Entry point for running a controller.
pub struct GenerationJobController;

impl GenerationJobController {
    /// Mount a controller for `product_id`. The product is fetched
    /// immediately.
    pub fn spawn(
        product_id: DbId,
        jobs: Arc<dyn JobApi>,
        resources: Arc<dyn ResourceApi>,
        config: PollConfig,
    ) -> ControllerHandle {
        let snapshot = ControllerSnapshot::new(product_id);
        let (state_tx, state_rx) = watch::channel(snapshot.clone());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = ControllerTask {
            product_id,
            jobs,
            resources,
            config,
            state: snapshot,
            state_tx,
            event_tx,
            cancel: cancel.clone(),
            timer: None,
            start_attempt: 0,
            load_seq: 0,
        };
        let handle = tokio::spawn(task.run(command_rx, event_rx));

        ControllerHandle {
            product_id,
            commands: command_tx,
            state: state_rx,
            cancel,
            task: Some(handle),
        }
    }
}

/// Owning handle to a running controller.
///
/// Dropping the handle tears the controller down: the poll timer is
/// cancelled and in-flight request results are ignored.
pub struct ControllerHandle {
    product_id: DbId,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ControllerSnapshot>,
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ControllerHandle {
    pub fn product_id(&self) -> DbId {
        self.product_id
    }

    /// Ask the controller to start a generation job.
    ///
    /// Rejected with [`ControllerError::JobInProgress`] while a job is
    /// Starting or Polling. `Ok` means the start request was issued; its
    /// outcome is reported through the published state.
    pub async fn generate(&self, template_ids: Vec<DbId>) -> Result<(), ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Generate {
                template_ids,
                reply,
            })
            .map_err(|_| ControllerError::ShutDown)?;
        rx.await.map_err(|_| ControllerError::ShutDown)?
    }

    /// Forget the current job and return to Idle. Results still in flight
    /// for the forgotten job are discarded when they arrive.
    pub fn reset(&self) {
        let _ = self.commands.send(Command::Reset);
    }

    /// Refetch the product.
    pub fn reload(&self) {
        let _ = self.commands.send(Command::Reload);
    }

    /// Current published state.
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tear down and wait for the controller task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(product_id = self.product_id, error = %e, "Controller task panicked");
            }
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Controller task
// ---------------------------------------------------------------------------

struct ControllerTask {
    product_id: DbId,
    jobs: Arc<dyn JobApi>,
    resources: Arc<dyn ResourceApi>,
    config: PollConfig,
    state: ControllerSnapshot,
    state_tx: watch::Sender<ControllerSnapshot>,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
    timer: Option<PollTimer>,
    /// Bumped on every start request and on reset; stale start results
    /// carry an older value.
    start_attempt: u64,
    /// Bumped on every product fetch; only the newest result is applied.
    load_seq: u64,
}

impl ControllerTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        tracing::debug!(product_id = self.product_id, "Product view mounted");
        self.request_product_load();
        self.publish();

        let cancel = self.cancel.clone();
        loop {
            let next_tick = self.timer.clone();
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
                _ = sleep_until(next_tick.as_ref().map(|t| t.deadline)) => {
                    if let Some(timer) = next_tick {
                        self.timer = None;
                        self.issue_poll(timer.job_id);
                    }
                }
            }
        }

        self.timer = None;
        cancel.cancel();
        tracing::debug!(product_id = self.product_id, "Product view torn down");
    }

    // ---- commands ----

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Generate {
                template_ids,
                reply,
            } => {
                let result = self.start_job(template_ids);
                let _ = reply.send(result);
            }
            Command::Reset => self.reset(),
            Command::Reload => {
                self.request_product_load();
                self.publish();
            }
        }
    }

    fn start_job(&mut self, template_ids: Vec<DbId>) -> Result<(), ControllerError> {
        if self.state.job.is_active() {
            tracing::debug!(
                product_id = self.product_id,
                state = self.state.job.name(),
                "Generate rejected, job already running",
            );
            return Err(ControllerError::JobInProgress);
        }

        self.timer = None;
        self.start_attempt += 1;
        self.state.job = JobState::Starting;
        self.state.notice = None;
        self.state.poll_failures = 0;
        self.publish();

        tracing::info!(
            product_id = self.product_id,
            templates = template_ids.len(),
            "Starting generation job",
        );

        let attempt = self.start_attempt;
        let jobs = Arc::clone(&self.jobs);
        let product_id = self.product_id;
        self.spawn_request(async move {
            let result = jobs.start_job(product_id, &template_ids).await;
            Event::Started { attempt, result }
        });
        Ok(())
    }

    fn reset(&mut self) {
        self.timer = None;
        self.start_attempt += 1;
        if let Some(job_id) = self.state.job.job_id() {
            tracing::info!(product_id = self.product_id, job_id = %job_id, "Job tracking reset");
        }
        self.state.job = JobState::Idle;
        self.state.notice = None;
        self.state.poll_failures = 0;
        self.publish();
    }

    // ---- events ----

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Started { attempt, result } => self.on_started(attempt, result),
            Event::Polled { job_id, result } => self.on_polled(job_id, result),
            Event::Loaded { seq, result } => self.on_loaded(seq, result),
        }
    }

    fn on_started(&mut self, attempt: u64, result: Result<StartJobResponse, ApiError>) {
        if attempt != self.start_attempt || self.state.job != JobState::Starting {
            tracing::debug!(product_id = self.product_id, attempt, "Discarding stale start result");
            return;
        }

        match result {
            Ok(response) => {
                tracing::info!(
                    product_id = self.product_id,
                    job_id = %response.job_id,
                    "Generation job started, polling",
                );
                self.state.job = JobState::Polling {
                    job_id: response.job_id.clone(),
                };
                self.schedule_poll(response.job_id);
            }
            Err(e) => {
                tracing::warn!(product_id = self.product_id, error = %e, "Failed to start generation job");
                self.state.job = JobState::Idle;
                self.state.notice = Some(format!("Could not start generation: {e}"));
            }
        }
        self.publish();
    }

    fn on_polled(&mut self, job_id: JobId, result: Result<JobStatusReport, ApiError>) {
        let decision = reconcile_poll(self.state.job.polling_job_id(), &job_id, result.as_ref().ok());

        match decision {
            PollDecision::Discard => {
                tracing::debug!(
                    product_id = self.product_id,
                    job_id = %job_id,
                    "Discarding status for a job that is no longer current",
                );
                return;
            }
            PollDecision::Continue => {
                self.state.poll_failures = 0;
                self.schedule_poll(job_id);
            }
            PollDecision::Retry => {
                self.state.poll_failures += 1;
                match &result {
                    Err(e) => tracing::warn!(
                        product_id = self.product_id,
                        job_id = %job_id,
                        failures = self.state.poll_failures,
                        error = %e,
                        "Job status check failed, retrying on next tick",
                    ),
                    Ok(report) => tracing::warn!(
                        product_id = self.product_id,
                        job_id = %job_id,
                        reported_job_id = %report.job_id,
                        failures = self.state.poll_failures,
                        "Job status names a different job, retrying on next tick",
                    ),
                }
                match self.config.max_consecutive_failures {
                    Some(max) if self.state.poll_failures >= max => {
                        tracing::warn!(product_id = self.product_id, job_id = %job_id, "Giving up on job status");
                        self.state.job = JobState::Failed {
                            job_id,
                            error_message: Some(poll_gave_up_message(self.state.poll_failures)),
                        };
                    }
                    _ => self.schedule_poll(job_id),
                }
            }
            PollDecision::Complete { generated_count } => {
                self.timer = None;
                self.state.poll_failures = 0;
                tracing::info!(
                    product_id = self.product_id,
                    job_id = %job_id,
                    generated_count,
                    "Generation job completed",
                );
                self.state.job = JobState::Completed {
                    job_id,
                    generated_count,
                };
                self.request_product_load();
            }
            PollDecision::Fail { error_message } => {
                self.timer = None;
                self.state.poll_failures = 0;
                tracing::warn!(
                    product_id = self.product_id,
                    job_id = %job_id,
                    error_message = error_message.as_deref().unwrap_or(""),
                    "Generation job failed",
                );
                self.state.job = JobState::Failed {
                    job_id,
                    error_message,
                };
            }
        }
        self.publish();
    }

    fn on_loaded(&mut self, seq: u64, result: Result<Product, ApiError>) {
        if seq != self.load_seq {
            tracing::debug!(product_id = self.product_id, seq, "Discarding superseded product load");
            return;
        }
        self.state.loading = false;
        match result {
            Ok(product) => {
                tracing::debug!(
                    product_id = self.product_id,
                    images = product.images.len(),
                    "Product loaded",
                );
                self.state.product = Some(product);
                self.state.load_error = None;
            }
            Err(e) => {
                tracing::warn!(product_id = self.product_id, error = %e, "Error loading product");
                self.state.load_error = Some(e.to_string());
            }
        }
        self.publish();
    }

    // ---- helpers ----

    fn schedule_poll(&mut self, job_id: JobId) {
        self.timer = Some(PollTimer {
            job_id,
            deadline: Instant::now() + self.config.interval,
        });
    }

    fn issue_poll(&mut self, job_id: JobId) {
        if self.state.job.polling_job_id() != Some(&job_id) {
            return;
        }
        tracing::debug!(product_id = self.product_id, job_id = %job_id, "Checking job status");
        let jobs = Arc::clone(&self.jobs);
        let product_id = self.product_id;
        self.spawn_request(async move {
            let result = jobs.job_status(product_id, &job_id).await;
            Event::Polled { job_id, result }
        });
    }

    fn request_product_load(&mut self) {
        self.load_seq += 1;
        self.state.loading = true;
        let seq = self.load_seq;
        let resources = Arc::clone(&self.resources);
        let product_id = self.product_id;
        self.spawn_request(async move {
            let result = resources.get_product(product_id).await;
            Event::Loaded { seq, result }
        });
    }

    /// Run one request off the controller task, delivering its result as an
    /// event. Abandoned if the controller is torn down first.
    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let events = self.event_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                event = request => {
                    let _ = events.send(event);
                }
            }
        });
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
