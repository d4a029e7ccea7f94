//! Action manager — executes actions inline or through a bounded queue.
//!
//! The manager owns three small tables (SSH hosts, action templates,
//! statistics), each behind its own mutex, plus the asynchronous queue and
//! the bundle of executor ports. No lock is held while an executor runs.
//!
//! Asynchronous work is consumed by a single worker task started with
//! [`ActionManager::spawn_worker`]. Entries are served strictly in FIFO
//! order; their `priority` is recorded but does not reorder the queue.

mod dispatch;
mod hosts;
mod templates;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use autorule_domain::automation::Action;
use autorule_domain::error::{AutomationError, ValidationError};
use autorule_domain::id::JobId;
use autorule_domain::result::ActionResult;
use autorule_domain::ssh_host::SshHost;
use autorule_domain::stats::{ActionStats, QueueStatus};
use autorule_domain::template::ActionTemplate;
use autorule_domain::time::{Timestamp, now};

use crate::action_queue::{ActionQueue, Popped, PushError, QueueClosed};
use crate::ports::{
    ActionDispatch, GpioController, HttpClient, LedController, PowerController, SshClient,
    VariableStore,
};

/// Tunables of the [`ActionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionManagerConfig {
    /// Maximum number of pending asynchronous entries.
    pub queue_capacity: usize,
    /// How long [`ActionManager::enqueue`] waits for room.
    pub enqueue_wait: Duration,
    /// How long the worker blocks on an empty queue before re-checking.
    pub worker_poll: Duration,
    pub max_templates: usize,
    pub max_hosts: usize,
    /// Timeout applied to SSH commands that do not set their own.
    pub default_ssh_timeout: Duration,
}

impl Default for ActionManagerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            enqueue_wait: Duration::from_millis(100),
            worker_poll: Duration::from_millis(1000),
            max_templates: 32,
            max_hosts: 8,
            default_ssh_timeout: Duration::from_millis(30_000),
        }
    }
}

/// The executor ports an [`ActionManager`] dispatches to.
pub struct Executors<S, L, G, P, H> {
    pub ssh: S,
    pub led: L,
    pub gpio: G,
    pub power: P,
    pub http: H,
}

/// Called once by the worker with the action and its result.
pub type CompletionCallback = Box<dyn FnOnce(&Action, &ActionResult) + Send + 'static>;

/// An action waiting in the asynchronous queue.
pub struct ActionQueueEntry {
    pub id: JobId,
    pub action: Action,
    /// Advisory only; the queue is FIFO.
    pub priority: u8,
    pub enqueued_at: Timestamp,
    callback: Option<CompletionCallback>,
}

impl ActionQueueEntry {
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            id: JobId::new(),
            action,
            priority: 0,
            enqueued_at: now(),
            callback: None,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Register the completion callback. It is dropped unrun if the entry
    /// is cancelled before the worker reaches it.
    ///
    /// A panicking callback is logged and the worker moves on to the next
    /// entry.
    #[must_use]
    pub fn on_complete(
        mut self,
        callback: impl FnOnce(&Action, &ActionResult) + Send + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for ActionQueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionQueueEntry")
            .field("id", &self.id)
            .field("action", &self.action)
            .field("priority", &self.priority)
            .field("enqueued_at", &self.enqueued_at)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Executes actions and owns the template and SSH host registries.
pub struct ActionManager<V, S, L, G, P, H> {
    config: ActionManagerConfig,
    variables: V,
    executors: Executors<S, L, G, P, H>,
    hosts: Mutex<Vec<SshHost>>,
    templates: Mutex<Vec<ActionTemplate>>,
    stats: Mutex<ActionStats>,
    queue: ActionQueue<ActionQueueEntry>,
    running: AtomicUsize,
}

impl<V, S, L, G, P, H> ActionManager<V, S, L, G, P, H> {
    /// Create a manager with empty registries and an open queue.
    pub fn new(
        config: ActionManagerConfig,
        variables: V,
        executors: Executors<S, L, G, P, H>,
    ) -> Self {
        let queue = ActionQueue::new(config.queue_capacity);
        Self {
            config,
            variables,
            executors,
            hosts: Mutex::new(Vec::new()),
            templates: Mutex::new(Vec::new()),
            stats: Mutex::new(ActionStats::default()),
            queue,
            running: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ActionManagerConfig {
        &self.config
    }

    /// The variable store actions read from and write to.
    pub fn variables(&self) -> &V {
        &self.variables
    }

    /// Copy of the execution statistics.
    #[must_use]
    pub fn stats(&self) -> ActionStats {
        self.lock_stats().clone()
    }

    /// Zero every counter, including the queue high-water mark.
    pub fn reset_stats(&self) {
        *self.lock_stats() = ActionStats::default();
    }

    /// Pending and running entry counts.
    #[must_use]
    pub fn queue_status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.queue.len(),
            running: self.running.load(Ordering::SeqCst),
        }
    }

    /// Drop every entry the worker has not picked up yet.
    ///
    /// Their callbacks are never invoked. An entry already executing is not
    /// interrupted. Returns how many entries were dropped.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.queue.clear();
        if !cancelled.is_empty() {
            tracing::info!(count = cancelled.len(), "cancelled pending actions");
        }
        cancelled.len()
    }

    /// Stop accepting queued work. The worker drains what is left, then exits.
    pub fn close(&self) {
        self.queue.close();
    }

    fn lock_stats(&self) -> MutexGuard<'_, ActionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_hosts(&self) -> MutexGuard<'_, Vec<SshHost>> {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_templates(&self) -> MutexGuard<'_, Vec<ActionTemplate>> {
        self.templates.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V, S, L, G, P, H> ActionManager<V, S, L, G, P, H>
where
    V: VariableStore,
    S: SshClient,
    L: LedController,
    G: GpioController,
    P: PowerController,
    H: HttpClient,
{
    /// Execute one action: wait its delay, dispatch it, record statistics.
    ///
    /// Never fails; executor problems are reported through the result status.
    #[tracing::instrument(skip(self, action), fields(kind = action.kind.type_name()))]
    pub async fn execute(&self, action: &Action) -> ActionResult {
        if action.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(action.delay_ms)).await;
        }

        let started = Instant::now();
        let mut result = self.dispatch(&action.kind).await;
        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        result.completed_at = now();

        self.lock_stats().record(&action.kind, &result);
        tracing::debug!(
            status = %result.status,
            duration_ms = result.duration_ms,
            "action finished"
        );
        result
    }

    /// Execute `actions` in order, each with its own delay.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] for an empty sequence,
    /// or [`AutomationError::SequenceAborted`] when `stop_on_error` is set
    /// and an action did not succeed. The remaining actions are skipped.
    #[tracing::instrument(skip(self, actions), fields(count = actions.len()))]
    pub async fn execute_sequence(
        &self,
        actions: &[Action],
        stop_on_error: bool,
    ) -> Result<Vec<ActionResult>, AutomationError> {
        if actions.is_empty() {
            return Err(ValidationError::EmptySequence.into());
        }

        let mut results = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            let result = self.execute(action).await;
            if stop_on_error && !result.is_success() {
                tracing::warn!(index, status = %result.status, "sequence aborted");
                return Err(AutomationError::SequenceAborted {
                    index,
                    status: result.status,
                });
            }
            results.push(result);
        }
        Ok(results)
    }

    /// Queue `entry` for the worker, waiting briefly for room.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::ResourceExhausted`] when the queue stays
    /// full for the configured wait, or [`AutomationError::Internal`] once
    /// the queue is closed.
    #[tracing::instrument(skip(self, entry), fields(job = %entry.id, kind = entry.action.kind.type_name()))]
    pub async fn enqueue(&self, entry: ActionQueueEntry) -> Result<JobId, AutomationError> {
        let id = entry.id;
        match self.queue.push(entry, self.config.enqueue_wait).await {
            Ok(depth) => {
                let mut stats = self.lock_stats();
                stats.queue_high_water = stats.queue_high_water.max(depth);
                tracing::debug!(depth, "action queued");
                Ok(id)
            }
            Err(PushError::Full(_)) => {
                tracing::warn!(capacity = self.queue.capacity(), "action queue full");
                Err(AutomationError::exhausted(
                    "action queue",
                    self.queue.capacity(),
                ))
            }
            Err(PushError::Closed(_)) => Err(AutomationError::Internal(Box::new(QueueClosed))),
        }
    }

    /// Queue `action` and get a receiver for its result.
    ///
    /// The receiver errors if the entry is cancelled before it runs.
    ///
    /// # Errors
    ///
    /// Same as [`enqueue`](Self::enqueue).
    pub async fn submit(
        &self,
        action: Action,
        priority: u8,
    ) -> Result<(JobId, oneshot::Receiver<ActionResult>), AutomationError> {
        let (tx, rx) = oneshot::channel();
        let entry = ActionQueueEntry::new(action)
            .with_priority(priority)
            .on_complete(move |_, result| {
                let _ = tx.send(result.clone());
            });
        let id = self.enqueue(entry).await?;
        Ok((id, rx))
    }

    async fn process(&self, entry: ActionQueueEntry) {
        let ActionQueueEntry {
            id,
            action,
            priority,
            callback,
            ..
        } = entry;

        self.running.fetch_add(1, Ordering::SeqCst);
        let result = self.execute(&action).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        tracing::debug!(job = %id, priority, status = %result.status, "queued action done");
        if let Some(callback) = callback
            && catch_unwind(AssertUnwindSafe(|| callback(&action, &result))).is_err()
        {
            tracing::error!(job = %id, "completion callback panicked");
        }
    }
}

impl<V, S, L, G, P, H> ActionManager<V, S, L, G, P, H>
where
    V: VariableStore + 'static,
    S: SshClient + 'static,
    L: LedController + 'static,
    G: GpioController + 'static,
    P: PowerController + 'static,
    H: HttpClient + 'static,
{
    /// Start the queue worker.
    ///
    /// The task ends after [`close`](Self::close) once the queue is drained.
    pub fn spawn_worker(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run_worker().await })
    }

    async fn run_worker(&self) {
        tracing::info!(capacity = self.queue.capacity(), "action worker started");
        loop {
            match self.queue.pop(self.config.worker_poll).await {
                Popped::Item(entry) => self.process(entry).await,
                Popped::TimedOut => {}
                Popped::Closed => break,
            }
        }
        tracing::info!("action worker stopped");
    }
}

impl<V, S, L, G, P, H> ActionDispatch for ActionManager<V, S, L, G, P, H>
where
    V: VariableStore,
    S: SshClient,
    L: LedController,
    G: GpioController,
    P: PowerController,
    H: HttpClient,
{
    fn execute(&self, action: &Action) -> impl Future<Output = ActionResult> + Send {
        Self::execute(self, action)
    }

    fn execute_sequence(
        &self,
        actions: &[Action],
        stop_on_error: bool,
    ) -> impl Future<Output = Result<Vec<ActionResult>, AutomationError>> + Send {
        Self::execute_sequence(self, actions, stop_on_error)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Harness, SshReply, harness, harness_with};
    use super::*;
    use autorule_domain::automation::{ActionKind, LogLevel};
    use autorule_domain::result::ActionStatus;
    use autorule_domain::value::Value;

    fn failing_action() -> Action {
        Action::new(ActionKind::DeviceCtrl {
            device: "fpga".to_string(),
            action: "on".to_string(),
        })
    }

    #[tokio::test]
    async fn should_update_stats_after_execute() {
        let Harness { manager, .. } = harness();
        manager.execute(&Action::set_var("x", 1)).await;
        manager.execute(&failing_action()).await;

        let stats = manager.stats();
        assert_eq!(stats.total_executed, 2);
        assert_eq!(stats.total_success, 1);
        assert_eq!(stats.total_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_wait_for_delay_before_dispatch() {
        let Harness { manager, .. } = harness();
        let started = Instant::now();
        let result = manager
            .execute(&Action::log(LogLevel::Debug, "late").with_delay(250))
            .await;
        assert!(result.is_success());
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn should_count_timeouts_separately() {
        let h = harness();
        h.ssh.reply(SshReply::Timeout);
        h.register_agx();
        let action = Action::new(ActionKind::SshCmd {
            host_ref: "agx".parse().unwrap(),
            command: "sleep 100".to_string(),
            run_async: false,
            timeout_ms: 10,
        });
        let result = h.manager.execute(&action).await;
        assert_eq!(result.status, ActionStatus::Timeout);
        assert_eq!(h.manager.stats().total_timeout, 1);
        assert_eq!(h.manager.stats().ssh_commands, 1);
    }

    #[tokio::test]
    async fn should_run_whole_sequence_when_not_stopping_on_error() {
        let h = harness();
        let actions = vec![
            failing_action(),
            Action::set_var("after", true),
        ];
        let results = h.manager.execute_sequence(&actions, false).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, ActionStatus::Failed);
        assert_eq!(h.variables.get("after"), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn should_abort_sequence_on_first_failure_when_requested() {
        let h = harness();
        let actions = vec![
            Action::set_var("before", true),
            failing_action(),
            Action::set_var("after", true),
        ];
        let err = h.manager.execute_sequence(&actions, true).await.unwrap_err();
        assert!(matches!(
            err,
            AutomationError::SequenceAborted {
                index: 1,
                status: ActionStatus::Failed
            }
        ));
        assert_eq!(h.variables.get("before"), Some(Value::Bool(true)));
        assert_eq!(h.variables.get("after"), None);
    }

    #[tokio::test]
    async fn should_reject_empty_sequence() {
        let h = harness();
        let err = h.manager.execute_sequence(&[], false).await.unwrap_err();
        assert!(matches!(
            err,
            AutomationError::InvalidArgument(ValidationError::EmptySequence)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_seventeenth_enqueue_and_track_high_water() {
        let h = harness();
        for n in 0..16 {
            h.manager
                .enqueue(ActionQueueEntry::new(Action::set_var("n", n)))
                .await
                .unwrap();
        }
        let err = h
            .manager
            .enqueue(ActionQueueEntry::new(Action::set_var("n", 16)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AutomationError::ResourceExhausted { capacity: 16, .. }
        ));
        assert_eq!(h.manager.stats().queue_high_water, 16);
        assert_eq!(h.manager.queue_status().pending, 16);
    }

    #[tokio::test]
    async fn should_invoke_callback_once_from_worker() {
        let h = harness();
        let worker = h.manager.spawn_worker();

        let (job, rx) = h.manager.submit(Action::set_var("alarm", true), 5).await.unwrap();
        let result = rx.await.unwrap();

        assert!(result.is_success());
        assert_eq!(h.variables.get("alarm"), Some(Value::Bool(true)));
        assert_ne!(job.to_string(), "");

        h.manager.close();
        worker.await.unwrap();
        assert_eq!(h.manager.stats().total_executed, 1);
    }

    #[tokio::test]
    async fn should_keep_worker_alive_when_callback_panics() {
        let h = harness();
        let panicking = ActionQueueEntry::new(Action::set_var("a", 1))
            .on_complete(|_, _| panic!("callback blew up"));
        h.manager.enqueue(panicking).await.unwrap();
        let (_, rx) = h.manager.submit(Action::set_var("b", 2), 0).await.unwrap();

        let worker = h.manager.spawn_worker();
        assert!(rx.await.unwrap().is_success());
        h.manager.close();
        worker.await.unwrap();

        assert_eq!(h.variables.get("a"), Some(Value::Int(1)));
        assert_eq!(h.variables.get("b"), Some(Value::Int(2)));
        assert_eq!(h.manager.stats().total_executed, 2);
    }

    #[tokio::test]
    async fn should_serve_queue_in_fifo_order_regardless_of_priority() {
        let h = harness();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (n, priority) in [(1, 0), (2, 255), (3, 7)] {
            let order = Arc::clone(&order);
            let entry = ActionQueueEntry::new(Action::set_var("n", n))
                .with_priority(priority)
                .on_complete(move |action, _| {
                    order.lock().unwrap().push(action.to_string());
                });
            h.manager.enqueue(entry).await.unwrap();
        }

        let worker = h.manager.spawn_worker();
        h.manager.close();
        worker.await.unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            ["set_var(n=1)", "set_var(n=2)", "set_var(n=3)"]
        );
    }

    #[tokio::test]
    async fn should_drop_callbacks_of_cancelled_entries() {
        let h = harness_with(ActionManagerConfig::default());
        let (_, first) = h.manager.submit(Action::set_var("a", 1), 0).await.unwrap();
        let (_, second) = h.manager.submit(Action::set_var("b", 2), 0).await.unwrap();

        assert_eq!(h.manager.cancel_all(), 2);
        assert_eq!(h.manager.queue_status().pending, 0);
        assert!(first.await.is_err());
        assert!(second.await.is_err());
        assert_eq!(h.manager.stats().total_executed, 0);
    }

    #[tokio::test]
    async fn should_refuse_enqueue_after_close() {
        let h = harness();
        h.manager.close();
        let err = h
            .manager
            .enqueue(ActionQueueEntry::new(Action::set_var("x", 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::Internal(_)));
    }

    #[tokio::test]
    async fn should_reset_stats_on_request() {
        let h = harness();
        h.manager.execute(&Action::set_var("x", 1)).await;
        h.manager.reset_stats();
        assert_eq!(h.manager.stats(), ActionStats::default());
    }
}
