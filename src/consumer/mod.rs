//! The run-stream consumer.
//!
//! [`StreamConsumer`] owns one run at a time:
//! - [`StreamConsumer::start`]: open the transport and begin streaming
//! - [`StreamConsumer::subscribe`]: watch [`RunState`] snapshots
//! - [`StreamConsumer::cancel`]: stop the run; nothing is published afterwards
//! - [`StreamConsumer::reset`]: cancel and allow a new `start`

use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, RunStreamError};
use crate::pipeline::RunPipeline;
use crate::reducer::reduce;
use crate::transport::{RunRequest, Transport};
use crate::types::{RunEvent, RunState};

/// Client-side identifier of one consumed run, used in logs.
pub type RunId = Uuid;

/// Error recorded when a run is canceled with `cancel_as_failure` set.
pub const RUN_CANCELED: &str = "Run canceled";

/// Consumes the event stream of one run and publishes its state.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use runstream::prelude::*;
///
/// # async fn example() -> runstream::error::Result<()> {
/// let transport = HttpTransport::new(StreamConfig::load()?)?;
/// let mut consumer = StreamConsumer::new(Arc::new(transport));
/// let mut run = consumer.start(RunRequest::post(
///     "/api/skills/summarize/run",
///     serde_json::json!({"input": "hello"}),
/// ))?;
/// while let Some(state) = run.changed().await {
///     if let Some(progress) = state.last_progress() {
///         println!("{}", progress.message);
///     }
///     if state.is_terminal() {
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct StreamConsumer {
    transport: Arc<dyn Transport>,
    active: Option<ActiveRun>,
    subscription: Option<RunSubscription>,
}

struct ActiveRun {
    run_id: RunId,
    publisher: Arc<Publisher>,
    abort_tx: Option<oneshot::Sender<()>>,
    cancel_as_failure: bool,
}

impl StreamConsumer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            active: None,
            subscription: None,
        }
    }

    /// Start a run and return a subscription to its state.
    ///
    /// The first snapshot is a fresh `connecting` state. Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RunStreamError::InvalidState`] if this consumer already
    /// started a run and was not [`reset`](Self::reset), or if there is no
    /// tokio runtime.
    pub fn start(&mut self, request: RunRequest) -> Result<RunSubscription> {
        if self.subscription.is_some() {
            return Err(RunStreamError::InvalidState(
                "a run was already started on this consumer; call reset() first".to_string(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            RunStreamError::InvalidState(
                "start() must be called inside a tokio runtime".to_string(),
            )
        })?;

        let run_id = Uuid::new_v4();
        let (tx, rx) = watch::channel(RunState::connecting());
        let publisher = Arc::new(Publisher::new(tx));
        let (abort_tx, abort_rx) = oneshot::channel();

        info!(%run_id, path = %request.path, "run start");
        let cancel_as_failure = request.cancel_as_failure;
        runtime.spawn(drive(
            run_id,
            Arc::clone(&self.transport),
            request,
            Arc::clone(&publisher),
            abort_rx,
        ));

        let subscription = RunSubscription { run_id, rx };
        self.active = Some(ActiveRun {
            run_id,
            publisher,
            abort_tx: Some(abort_tx),
            cancel_as_failure,
        });
        self.subscription = Some(subscription.clone());
        Ok(subscription)
    }

    /// Another handle on the current run's snapshots.
    pub fn subscribe(&self) -> Option<RunSubscription> {
        self.subscription.clone()
    }

    /// Latest published state of the current run.
    pub fn state(&self) -> Option<RunState> {
        self.subscription.as_ref().map(RunSubscription::current)
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.subscription.as_ref().map(RunSubscription::run_id)
    }

    /// Cancel the current run.
    ///
    /// Once this returns no further state is published for the run. With
    /// `cancel_as_failure` set on the request, a final `failed` state is
    /// published first. Returns `true` if a run was still in progress.
    pub fn cancel(&mut self) -> bool {
        let Some(mut run) = self.active.take() else {
            return false;
        };

        let was_live = run.publisher.cancel(run.cancel_as_failure);

        if let Some(abort_tx) = run.abort_tx.take() {
            let _ = abort_tx.send(());
        }
        info!(run_id = %run.run_id, was_live, "run canceled");
        was_live
    }

    /// Cancel any run and forget it so `start` can be called again.
    pub fn reset(&mut self) {
        self.cancel();
        self.subscription = None;
    }

    /// Start a run and wait for its terminal state.
    pub async fn run_to_completion(
        transport: Arc<dyn Transport>,
        request: RunRequest,
    ) -> Result<RunState> {
        let mut consumer = Self::new(transport);
        let subscription = consumer.start(request)?;
        subscription
            .wait_terminal()
            .await
            .ok_or_else(|| RunStreamError::Stream("run ended without a terminal state".to_string()))
    }
}

impl Drop for StreamConsumer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Read handle on the snapshots of one run.
#[derive(Debug, Clone)]
pub struct RunSubscription {
    run_id: RunId,
    rx: watch::Receiver<RunState>,
}

impl RunSubscription {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Latest snapshot, without marking it seen.
    pub fn current(&self) -> RunState {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot this handle has not seen yet.
    ///
    /// Returns `None` once the run is over and nothing new will arrive.
    /// Snapshots published in quick succession may be coalesced; the latest
    /// one is always delivered.
    pub async fn changed(&mut self) -> Option<RunState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the run reaches a terminal phase.
    ///
    /// `None` means the run was canceled without publishing a terminal state.
    pub async fn wait_terminal(mut self) -> Option<RunState> {
        loop {
            {
                let state = self.rx.borrow_and_update();
                if state.is_terminal() {
                    return Some(state.clone());
                }
            }
            if self.rx.changed().await.is_err() {
                let state = self.rx.borrow();
                return state.is_terminal().then(|| state.clone());
            }
        }
    }

    /// Snapshots as a stream: the current one, then every change, ending
    /// after the terminal snapshot or when the run is canceled.
    pub fn into_stream(mut self) -> BoxStream<'static, RunState> {
        let stream = async_stream::stream! {
            let first = self.rx.borrow_and_update().clone();
            let mut done = first.is_terminal();
            yield first;
            while !done {
                if self.rx.changed().await.is_err() {
                    break;
                }
                let state = self.rx.borrow_and_update().clone();
                done = state.is_terminal();
                yield state;
            }
        };
        Box::pin(stream)
    }

    /// Underlying watch receiver.
    pub fn receiver(&self) -> watch::Receiver<RunState> {
        self.rx.clone()
    }
}

/// Publishes snapshots until closed.
///
/// Closing drops the sender, which ends every subscription. The sender sits
/// behind a lock so a publish can never land after `close` returns.
struct Publisher {
    tx: Mutex<Option<watch::Sender<RunState>>>,
}

impl Publisher {
    fn new(tx: watch::Sender<RunState>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<watch::Sender<RunState>>> {
        self.tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish `state` if it differs from the last snapshot. Returns `false`
    /// once closed.
    fn publish(&self, state: &RunState) -> bool {
        let guard = self.lock();
        let Some(tx) = guard.as_ref() else {
            return false;
        };
        tx.send_if_modified(|current| {
            if *current == *state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
        true
    }

    /// Close after a cancel. Returns whether the run was still live; if so
    /// and `publish_failure` is set, a final `failed` snapshot goes out first.
    fn cancel(&self, publish_failure: bool) -> bool {
        let Some(tx) = self.lock().take() else {
            return false;
        };
        let current = tx.borrow().clone();
        if current.is_terminal() {
            return false;
        }
        if publish_failure {
            tx.send_replace(reduce(current, RunEvent::error(RUN_CANCELED)));
        }
        true
    }

    fn close(&self) {
        self.lock().take();
    }
}

/// Read loop for one run. Only suspends while waiting on the transport.
async fn drive(
    run_id: RunId,
    transport: Arc<dyn Transport>,
    request: RunRequest,
    publisher: Arc<Publisher>,
    mut abort_rx: oneshot::Receiver<()>,
) {
    let mut pipeline = RunPipeline::with_state(RunState::connecting());

    let opened = tokio::select! {
        biased;
        _ = &mut abort_rx => {
            debug!(%run_id, "run aborted while connecting");
            return;
        }
        opened = transport.open(&request) => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(err) => {
            warn!(%run_id, error = %err, "failed to open run stream");
            pipeline.fail(err.to_string());
            publisher.publish(pipeline.state());
            publisher.close();
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut abort_rx => {
                debug!(%run_id, "run aborted");
                return;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if pipeline.push(&chunk) && !publisher.publish(pipeline.state()) {
                    return;
                }
            }
            Some(Err(err)) => {
                if pipeline.state().is_terminal() {
                    debug!(%run_id, error = %err, "stream error after terminal event");
                } else {
                    warn!(%run_id, error = %err, "run stream broke");
                    pipeline.fail(err.to_string());
                    publisher.publish(pipeline.state());
                }
                break;
            }
            None => {
                if pipeline.finish() {
                    publisher.publish(pipeline.state());
                }
                break;
            }
        }
    }

    publisher.close();
    let state = pipeline.state();
    info!(
        %run_id,
        phase = %state.phase,
        progress = state.progress.len(),
        dropped_frames = pipeline.dropped_frames(),
        "run end"
    );
}
