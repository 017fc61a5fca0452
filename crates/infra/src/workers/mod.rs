//! Background workers owned by pipeline components.

pub mod periodic;

pub use periodic::{PeriodicWorker, WorkerHandle};
