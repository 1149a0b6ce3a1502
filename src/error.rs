//! Error types for spbool

use thiserror::Error;

/// Result type alias using spbool's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Stable status codes mirrored across the public surface.
///
/// Every [`Error`] maps onto exactly one status; the discriminants are part
/// of the stable contract and never change between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    /// Successful execution
    Success = 0,
    /// Generic error code
    Error = 1,
    /// No compatible accelerator device in the system
    DeviceNotPresent = 2,
    /// Device side error
    DeviceError = 3,
    /// Failed to allocate memory on host or device side
    MemOpFailed = 4,
    /// Invalid argument passed to some operation
    InvalidArgument = 5,
    /// Operation is not possible in the current context state
    InvalidState = 6,
    /// Failed to select a supported backend for computations
    BackendError = 7,
    /// Some library feature is not implemented
    NotImplemented = 8,
}

/// Errors that can occur in spbool operations
#[derive(Error, Debug)]
pub enum Error {
    /// Shape mismatch between operands of an operation
    #[error("Shape mismatch in '{op}': expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The operation name
        op: &'static str,
        /// Expected shape
        expected: [usize; 2],
        /// Actual shape
        got: [usize; 2],
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the dimension
        size: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Operation invoked outside the Ready state, or on an invalidated handle
    #[error("Invalid state: {reason}")]
    InvalidState {
        /// What was violated
        reason: &'static str,
    },

    /// No compatible accelerator device is present
    #[error("No compatible accelerator device present")]
    DeviceNotPresent,

    /// Accelerator-side fault
    #[error("Device error: {0}")]
    Device(String),

    /// Host or device allocation failure
    #[error("Memory operation failed: {0}")]
    MemOp(String),

    /// Failed to select a supported backend
    #[error("Failed to select a supported backend")]
    BackendSelection,

    /// Feature not yet implemented
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature
        feature: &'static str,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(op: &'static str, expected: [usize; 2], got: [usize; 2]) -> Self {
        Self::ShapeMismatch { op, expected, got }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(reason: &'static str) -> Self {
        Self::InvalidState { reason }
    }

    /// The stable status code this error maps to
    pub fn status(&self) -> Status {
        match self {
            Error::ShapeMismatch { .. }
            | Error::IndexOutOfBounds { .. }
            | Error::InvalidArgument { .. } => Status::InvalidArgument,
            Error::InvalidState { .. } => Status::InvalidState,
            Error::DeviceNotPresent => Status::DeviceNotPresent,
            Error::Device(_) => Status::DeviceError,
            Error::MemOp(_) => Status::MemOpFailed,
            Error::BackendSelection => Status::BackendError,
            Error::NotImplemented { .. } => Status::NotImplemented,
            Error::Internal(_) => Status::Error,
        }
    }
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        err.status()
    }
}

#[cfg(feature = "cuda")]
impl From<cudarc::driver::DriverError> for Error {
    fn from(err: cudarc::driver::DriverError) -> Self {
        Error::Device(format!("{:?}", err))
    }
}
