//! Core types for a run: builder, execution context, scheduler and error handling.

pub mod builder;
pub mod context;
pub mod error;
pub mod scheduler;

pub use builder::{Runner, RunnerBuilder};
pub use context::RunContext;
pub use error::{Error, Result};
