// ABOUTME: Execution engine module for the trellis workflow engine
// ABOUTME: Exports the scheduler, the execution driver, and engine errors

pub mod driver;
pub mod error;
pub mod scheduler;

pub use driver::ExecutionDriver;
pub use error::{EngineError, Result};
pub use scheduler::Scheduler;
