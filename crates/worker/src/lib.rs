//! Worker primitives shared by the resolver: classified task spawning, an
//! injectable timer, and dispatchers that model the host's designated
//! execution context.

mod class;
pub mod dispatch;
mod spawn;
pub mod timer;

pub use class::TaskClass;
pub use dispatch::{Dispatcher, InlineDispatcher, Job, MainQueue, MainQueueHandle, SpawnDispatcher};
pub use spawn::{spawn, spawn_blocking};
pub use timer::{Timer, TokioTimer};
