//! Cross-cutting bookkeeping shared by all features.

mod subscription;
mod task;

pub use subscription::{SubscriptionId, SubscriptionSeq};
pub use task::{TaskCompleted, TaskId, TaskKind, TaskSeq, TaskState, Tasks};
