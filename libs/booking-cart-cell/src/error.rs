use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum CartError {
    #[error("Storage fault: {0}")]
    StorageFault(String),

    #[error("Availability fault: {0}")]
    AvailabilityFault(String),

    #[error("Sync fault: {0}")]
    SyncFault(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error("Slot {0} is already in the past")]
    SlotExpired(String),

    #[error("No slot selected")]
    NoSlotSelected,

    #[error("Invalid reschedule transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound(_) | CartError::SlotNotFound(_) => AppError::NotFound(err.to_string()),
            CartError::InvalidStateTransition { .. } => AppError::Conflict(err.to_string()),
            CartError::SlotExpired(_) | CartError::NoSlotSelected => AppError::BadRequest(err.to_string()),
            CartError::InvalidDateTime(_) => AppError::ValidationError(err.to_string()),
            CartError::AvailabilityFault(_) | CartError::SyncFault(_) => AppError::ExternalService(err.to_string()),
            CartError::StorageFault(_)
            | CartError::RedisError(_)
            | CartError::SerializationError(_)
            | CartError::IoError(_) => AppError::Storage(err.to_string()),
        }
    }
}
