//! Task execution primitives.
//!
//! This module provides the simulated processors and the tasks they run.

pub mod processor;
pub mod task;

pub use processor::{Processor, TickReport};
pub use task::{Task, TaskId, Tick};
