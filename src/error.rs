use thiserror::Error;

/// Failures raised while delivering a message to a group
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid time format: {hour}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error(
        "Call time must be greater than wait time as WhatsApp Web takes some time to load \
         ({seconds_left}s left, {wait_time}s needed)"
    )]
    CallTimeTooSoon { seconds_left: u64, wait_time: u64 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Automation task failed: {0}")]
    Task(String),
}
