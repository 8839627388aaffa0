//! Bounded concurrent extraction of document batches.

mod event;
mod orchestrator;
mod stream;
mod task;

pub use event::BatchEvent;
pub use orchestrator::BatchOrchestrator;
pub use stream::BatchStream;
pub use task::{TaskBoard, TaskState};
