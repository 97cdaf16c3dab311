//! Error taxonomy for the physics engine
//!
//! Every condition here is local to the failing call: the body and manifold
//! pools are left exactly as they were before the call.

use thiserror::Error;

use crate::sim::BodyHandle;

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("{what} pool is full (capacity {capacity})")]
    CapacityExceeded { what: &'static str, capacity: usize },
    #[error("Invalid shape parameters: {0}")]
    InvalidShapeParameters(String),
    #[error("Invalid or stale body handle: {0}")]
    InvalidHandle(BodyHandle),
    #[error("Body index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("Physics not initialized")]
    NotInitialized,
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file format: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
