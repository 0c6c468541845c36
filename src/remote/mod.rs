pub mod client;
pub mod protocol;
pub mod worker;

pub use client::{run, ControllerSettings};
pub use worker::{BetDispatcher, EngineWorker, WorkerHandle};
