//! Pipeline execution
//!
//! Turns a declarative [`Pipeline`](crate::core::Pipeline) into a
//! deterministic, cancellable sequence of command invocations against a
//! [`Workspace`](crate::workspace::Workspace).

pub mod cancel;
pub mod executor;
pub mod transcript;

pub use cancel::CancellationToken;
pub use executor::{Executor, RunError};
pub use transcript::Transcript;
