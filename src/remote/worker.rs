use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};

use crate::core::actuator::Actuator;
use crate::core::engine::{BetEngine, Cancelled, Placed};
use crate::core::reason::Reason;
use crate::core::resolver::PositionResolver;
use crate::utils::error::{BetclickError, BetclickResult};

const QUEUE_DEPTH: usize = 16;

enum Command {
    Place {
        amount: i64,
        side: String,
        reply: oneshot::Sender<Result<Placed, Reason>>,
    },
    Cancel {
        reply: oneshot::Sender<Result<Cancelled, Reason>>,
    },
}

#[async_trait::async_trait]
pub trait BetDispatcher: Send + Sync {
    async fn place_bet(&self, amount: i64, side: String) -> BetclickResult<Result<Placed, Reason>>;
    async fn cancel_bet(&self) -> BetclickResult<Result<Cancelled, Reason>>;
}

/// Owns the bet engine on a dedicated thread and runs requests one at a time.
pub struct EngineWorker {
    handle: WorkerHandle,
    thread: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineWorker {
    /// Builds the engine on the worker thread, so neither the resolver nor the
    /// actuator has to be `Send`. Returns once the engine is ready.
    pub fn spawn<F, R, A>(build: F) -> BetclickResult<Self>
    where
        F: FnOnce() -> BetclickResult<BetEngine<R, A>> + Send + 'static,
        R: PositionResolver + 'static,
        A: Actuator + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Command>(QUEUE_DEPTH);
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<BetclickResult<()>>(1);

        let thread = thread::Builder::new()
            .name("bet-engine".to_string())
            .spawn(move || {
                let mut engine = match build() {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                log::debug!("bet engine worker started");
                while let Some(command) = rx.blocking_recv() {
                    match command {
                        Command::Place { amount, side, reply } => {
                            let _ = reply.send(engine.place_bet(amount, &side));
                        }
                        Command::Cancel { reply } => {
                            let _ = reply.send(engine.cancel_bet());
                        }
                    }
                }
                log::debug!("bet engine worker stopped");
            })?;

        ready_rx.recv().map_err(|_| BetclickError::WorkerGone)??;
        Ok(EngineWorker {
            handle: WorkerHandle { tx },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Waits until every handle is dropped and the running request is done.
    pub fn shutdown(self) {
        let EngineWorker { handle, thread } = self;
        drop(handle);
        if let Some(thread) = thread {
            if thread.join().is_err() {
                log::error!("bet engine worker panicked");
            }
        }
    }
}

#[async_trait::async_trait]
impl BetDispatcher for WorkerHandle {
    async fn place_bet(&self, amount: i64, side: String) -> BetclickResult<Result<Placed, Reason>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Place { amount, side, reply })
            .await
            .map_err(|_| BetclickError::WorkerGone)?;
        response.await.map_err(|_| BetclickError::WorkerGone)
    }

    async fn cancel_bet(&self) -> BetclickResult<Result<Cancelled, Reason>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Cancel { reply })
            .await
            .map_err(|_| BetclickError::WorkerGone)?;
        response.await.map_err(|_| BetclickError::WorkerGone)
    }
}
