//! Error types and the shared return-code taxonomy.

use std::io;

use thiserror::Error;

/// Result type alias for surge operations
pub type Result<T> = std::result::Result<T, SurgeError>;

/// Main error type for the surge library
#[derive(Error, Debug)]
pub enum SurgeError {
    /// I/O error: failed OS interaction outside the dedicated builder stages
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid arguments to a builder or attach call
    #[error("invalid arguments: {message}")]
    InvalidArgs { message: String },

    /// Creating the named shared-memory object failed
    #[error("region create failed: {0}")]
    CreateFailed(#[source] io::Error),

    /// Sizing the shared-memory object failed
    #[error("region resize failed: {0}")]
    ResizeFailed(#[source] io::Error),

    /// Mapping the region into the address space failed
    #[error("region map failed: {0}")]
    MapFailed(#[source] io::Error),

    /// The configured topics do not fit into the requested region
    #[error("topic layout needs {needed} bytes, region holds {available}")]
    OutOfRegion { needed: u64, available: u64 },

    /// The mapped bytes are not a usable surge region
    #[error("region rejected: {reason}")]
    BadRegion { reason: String },

    /// Topic name lookup missed
    #[error("unknown topic: {name}")]
    UnknownTopic { name: String },

    /// Payload does not fit into a slot of this ring
    #[error("payload of {len} bytes exceeds slot capacity of {capacity}")]
    PayloadTooLarge { len: usize, capacity: usize },

    /// Multi-writer commit wait exhausted its iteration budget
    #[error("commit wait exhausted after {spins} iterations")]
    Timeout { spins: u32 },

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SurgeError {
    /// Create a new invalid-arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs { message: message.into() }
    }

    /// Create a new bad-region error
    pub fn bad_region(reason: impl Into<String>) -> Self {
        Self::BadRegion { reason: reason.into() }
    }

    /// Check if this error is recoverable by retrying the operation
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }

    /// Map onto the shared return-code taxonomy
    pub fn code(&self) -> RetCode {
        match self {
            Self::PayloadTooLarge { .. } => RetCode::PayloadTooLarge,
            Self::Timeout { .. } => RetCode::Timeout,
            _ => RetCode::Error,
        }
    }
}

/// Return codes shared by the publish and consume paths.
///
/// The numeric values are the stable cross-language contract; the Rust
/// surface reports outcomes through `Result` and [`crate::ring::Consumed`],
/// both of which map onto these codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetCode {
    /// Success; consume reports the payload length separately
    Ok = 0,
    /// Invalid arguments or attach failure
    Error = -1,
    /// Payload exceeds slot capacity
    PayloadTooLarge = -2,
    /// Consumer buffer too small for the next message
    Truncated = -3,
    /// Multi-writer generation wait exhausted
    Timeout = -4,
    /// No new message
    NoData = -11,
}

impl RetCode {
    /// Numeric value of the code
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SurgeError::invalid_args("empty region name");
        assert!(matches!(err, SurgeError::InvalidArgs { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_classification() {
        let timeout = SurgeError::Timeout { spins: 1 << 20 };
        assert!(timeout.is_recoverable());

        let oversize = SurgeError::PayloadTooLarge { len: 65, capacity: 64 };
        assert!(!oversize.is_recoverable());
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(SurgeError::invalid_args("x").code(), RetCode::Error);
        assert_eq!(SurgeError::bad_region("magic").code(), RetCode::Error);
        assert_eq!(
            SurgeError::PayloadTooLarge { len: 65, capacity: 64 }.code(),
            RetCode::PayloadTooLarge
        );
        assert_eq!(SurgeError::Timeout { spins: 1 }.code(), RetCode::Timeout);
    }

    #[test]
    fn test_ret_code_values() {
        assert_eq!(RetCode::Ok.as_i32(), 0);
        assert_eq!(RetCode::Error.as_i32(), -1);
        assert_eq!(RetCode::PayloadTooLarge.as_i32(), -2);
        assert_eq!(RetCode::Truncated.as_i32(), -3);
        assert_eq!(RetCode::Timeout.as_i32(), -4);
        assert_eq!(RetCode::NoData.as_i32(), -11);
    }
}
