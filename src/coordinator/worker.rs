use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{AiError, AiResult, ImageGenerator, ImagePayload};

use super::PendingAction;

/// Suggested interval for polling a [`GenerationHandle`] from a UI loop.
pub const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(24);

const WORKER_THREAD_NAME: &str = "pixshop-generate";

/// Outcome of a non-blocking check on a running generation.
#[derive(Debug)]
pub enum WorkerPoll {
    Pending(GenerationHandle),
    Ready(PendingAction, AiResult<ImagePayload>),
}

/// Receiving end of a generator call running on a worker thread.
#[derive(Debug)]
pub struct GenerationHandle {
    pending: PendingAction,
    rx: mpsc::Receiver<AiResult<ImagePayload>>,
}

impl GenerationHandle {
    pub fn pending(&self) -> &PendingAction {
        &self.pending
    }

    pub fn poll(self) -> WorkerPoll {
        match self.rx.try_recv() {
            Ok(result) => WorkerPoll::Ready(self.pending, result),
            Err(mpsc::TryRecvError::Empty) => WorkerPoll::Pending(self),
            Err(mpsc::TryRecvError::Disconnected) => {
                WorkerPoll::Ready(self.pending, Err(AiError::WorkerDisconnected))
            }
        }
    }

    /// Blocks until the worker delivers its result.
    pub fn wait(self) -> (PendingAction, AiResult<ImagePayload>) {
        let result = self
            .rx
            .recv()
            .unwrap_or(Err(AiError::WorkerDisconnected));
        (self.pending, result)
    }
}

pub fn spawn_generation<G>(generator: Arc<G>, pending: PendingAction) -> GenerationHandle
where
    G: ImageGenerator + 'static,
{
    let (tx, rx) = mpsc::channel::<AiResult<ImagePayload>>();
    let request = pending.request.clone();
    let action = pending.kind;
    let spawned = std::thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let result = generator.generate(&request);
            let _ = tx.send(result);
        });
    if let Err(err) = spawned {
        tracing::warn!(%action, ?err, "failed to spawn generation worker");
    }

    GenerationHandle { pending, rx }
}
