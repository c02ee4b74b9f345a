//! Worker coordination
//!
//! A [`Channel`] delegates requests to a [`WorkerState`]. Two implementations
//! exist and one is picked at startup:
//!
//! - [`InProcessChannel`]: handles requests on the caller's thread
//! - [`MessagePassingChannel`]: a dedicated worker thread reached through JSON
//!   messages; completions are matched by request id against a once queue
//!   (request/response) and a permanent queue (streams, removed on the
//!   terminal message)
//!
//! Streams run one at a time. Cancellation goes through a shared
//! [`CancelSlot`] and only reaches the stream the worker is running; streams
//! queued behind it are unaffected.

pub mod handler;
pub mod protocol;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::SerializedError;
use crate::{Result, ScanError};

pub use handler::{CancelSlot, WorkerState};
pub use protocol::{StreamMessage, WorkerRequest, WorkerResponse};
use protocol::{Delivered, Posted, WorkerMessage};

pub type StreamReceiver = mpsc::UnboundedReceiver<StreamMessage>;

/// Delegation of worker requests
pub trait Channel: Send + Sync {
    /// Post a request/response unit of work.
    fn post(&self, request: WorkerRequest) -> BoxFuture<'_, Result<WorkerResponse>>;

    /// Post a streaming unit of work; the receiver yields partial results and
    /// then exactly one terminal message.
    fn subscribe(&self, request: WorkerRequest) -> Result<StreamReceiver>;

    /// Ask the stream in flight to stop after the file in progress.
    fn cancel(&self);
}

/// Pick the channel for this process.
pub fn select_channel(in_process: bool) -> Result<Arc<dyn Channel>> {
    if in_process {
        debug!("[WORKER] using in-process channel");
        Ok(Arc::new(InProcessChannel::new()))
    } else {
        debug!("[WORKER] using message-passing channel");
        Ok(Arc::new(MessagePassingChannel::spawn()?))
    }
}

fn not_streaming(request: &WorkerRequest) -> ScanError {
    ScanError::Worker {
        message: format!("{} does not produce a stream", request.name()),
    }
}

fn streaming(request: &WorkerRequest) -> ScanError {
    ScanError::Worker {
        message: format!("{} must be subscribed to", request.name()),
    }
}

pub struct InProcessChannel {
    state: Mutex<WorkerState>,
    cancel: Arc<CancelSlot>,
}

impl InProcessChannel {
    pub fn new() -> Self {
        let cancel = Arc::new(CancelSlot::new());
        Self {
            state: Mutex::new(WorkerState::new(Arc::clone(&cancel))),
            cancel,
        }
    }
}

impl Default for InProcessChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for InProcessChannel {
    fn post(&self, request: WorkerRequest) -> BoxFuture<'_, Result<WorkerResponse>> {
        Box::pin(async move {
            if request.is_streaming() {
                return Err(streaming(&request));
            }
            Ok(self.state.lock().handle(request))
        })
    }

    fn subscribe(&self, request: WorkerRequest) -> Result<StreamReceiver> {
        if !request.is_streaming() {
            return Err(not_streaming(&request));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().handle_stream(request, &mut |message| {
            let _ = tx.send(message);
        });
        Ok(rx)
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

type OnceListeners = Arc<Mutex<HashMap<u64, oneshot::Sender<WorkerResponse>>>>;
type PermanentListeners = Arc<Mutex<HashMap<u64, mpsc::UnboundedSender<StreamMessage>>>>;

pub struct MessagePassingChannel {
    requests: mpsc::UnboundedSender<String>,
    once: OnceListeners,
    permanent: PermanentListeners,
    next_id: AtomicU64,
    cancel: Arc<CancelSlot>,
}

impl MessagePassingChannel {
    /// Start the worker thread and the reply dispatcher. Needs a tokio runtime.
    pub fn spawn() -> Result<Self> {
        let cancel = Arc::new(CancelSlot::new());
        let (requests, request_rx) = mpsc::unbounded_channel::<String>();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel::<String>();

        let worker_cancel = Arc::clone(&cancel);
        thread::Builder::new()
            .name("embedscan-worker".to_string())
            .spawn(move || worker_loop(request_rx, reply_tx, worker_cancel))?;

        let once: OnceListeners = Arc::default();
        let permanent: PermanentListeners = Arc::default();
        tokio::spawn(dispatch(reply_rx, Arc::clone(&once), Arc::clone(&permanent)));
        info!("[WORKER] worker thread started");

        Ok(Self {
            requests,
            once,
            permanent,
            next_id: AtomicU64::new(1),
            cancel,
        })
    }

    fn send(&self, id: u64, request: WorkerRequest) -> Result<()> {
        let raw = serde_json::to_string(&Posted { id, request }).map_err(|e| ScanError::Worker {
            message: format!("cannot encode request: {}", e),
        })?;
        self.requests.send(raw).map_err(|_| ScanError::Worker {
            message: "worker is not running".to_string(),
        })
    }
}

impl Channel for MessagePassingChannel {
    fn post(&self, request: WorkerRequest) -> BoxFuture<'_, Result<WorkerResponse>> {
        Box::pin(async move {
            if request == WorkerRequest::OnCancelAnalysis {
                self.cancel();
                return Ok(WorkerResponse::success(serde_json::Value::Null));
            }
            if request.is_streaming() {
                return Err(streaming(&request));
            }

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let (tx, rx) = oneshot::channel();
            self.once.lock().insert(id, tx);
            if let Err(e) = self.send(id, request) {
                self.once.lock().remove(&id);
                return Err(e);
            }
            rx.await.map_err(|_| ScanError::Worker {
                message: "worker exited before replying".to_string(),
            })
        })
    }

    fn subscribe(&self, request: WorkerRequest) -> Result<StreamReceiver> {
        if !request.is_streaming() {
            return Err(not_streaming(&request));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.permanent.lock().insert(id, tx);
        if let Err(e) = self.send(id, request) {
            self.permanent.lock().remove(&id);
            return Err(e);
        }
        Ok(rx)
    }

    fn cancel(&self) {
        if !self.cancel.cancel() {
            debug!("[WORKER] no stream in flight to cancel");
        }
    }
}

fn worker_loop(
    mut requests: mpsc::UnboundedReceiver<String>,
    replies: mpsc::UnboundedSender<String>,
    cancel: Arc<CancelSlot>,
) {
    let mut state = WorkerState::new(cancel);
    while let Some(raw) = requests.blocking_recv() {
        let posted: Posted = match serde_json::from_str(&raw) {
            Ok(posted) => posted,
            Err(e) => {
                warn!("[WORKER] dropping malformed request: {}", e);
                continue;
            }
        };
        let id = posted.id;
        let send = |message: WorkerMessage| match serde_json::to_string(&Delivered { id, message }) {
            Ok(raw) => {
                let _ = replies.send(raw);
            }
            Err(e) => warn!("[WORKER] cannot encode reply to {}: {}", id, e),
        };

        let streaming = posted.request.is_streaming();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            if streaming {
                state.handle_stream(posted.request, &mut |m| send(WorkerMessage::Stream(m)));
            } else {
                send(WorkerMessage::Reply(state.handle(posted.request)));
            }
        }));

        if outcome.is_err() {
            let error = SerializedError::from(&ScanError::Worker {
                message: "worker panicked while handling the request".to_string(),
            });
            warn!("[WORKER] request {} panicked", id);
            if streaming {
                send(WorkerMessage::Stream(StreamMessage::Error { error }));
            } else {
                send(WorkerMessage::Reply(WorkerResponse::Failure { error }));
            }
        }
    }
    debug!("[WORKER] request queue closed, worker exiting");
}

async fn dispatch(
    mut replies: mpsc::UnboundedReceiver<String>,
    once: OnceListeners,
    permanent: PermanentListeners,
) {
    while let Some(raw) = replies.recv().await {
        let delivered: Delivered = match serde_json::from_str(&raw) {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("[WORKER] dropping malformed reply: {}", e);
                continue;
            }
        };
        match delivered.message {
            WorkerMessage::Reply(response) => match once.lock().remove(&delivered.id) {
                Some(listener) => {
                    let _ = listener.send(response);
                }
                None => warn!("[WORKER] no listener for reply {}", delivered.id),
            },
            WorkerMessage::Stream(message) => {
                let terminal = message.is_terminal();
                let mut listeners = permanent.lock();
                if let Some(listener) = listeners.get(&delivered.id) {
                    let _ = listener.send(message);
                }
                if terminal {
                    listeners.remove(&delivered.id);
                }
            }
        }
    }

    // Worker gone: pending requests fail, open streams get their terminal error.
    once.lock().clear();
    let error = SerializedError::from(&ScanError::Worker {
        message: "worker exited".to_string(),
    });
    for (_, listener) in permanent.lock().drain() {
        let _ = listener.send(StreamMessage::Error {
            error: error.clone(),
        });
    }
}
