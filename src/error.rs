//! Error types for asyncq.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("task_done() called more times than items were put")]
    TaskDoneOverflow,

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("handler failed on {item}: {reason}")]
    Handler { item: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
