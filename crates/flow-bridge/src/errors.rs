//! Error codes and the bridge error type.
//!
//! `FlowError` is the numeric status that crosses the C boundary;
//! `BridgeError` is what native code returns internally. Every
//! `BridgeError` maps to exactly one `FlowError`.

use std::fmt;
use thiserror::Error;

/// Status codes reported across the boundary
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowError {
    Success = 0,
    InvalidHandle = -1,
    InvalidArgument = -2,
    NodeNotFound = -3,
    PortNotFound = -4,
    ConnectionFailed = -5,
    ModuleLoadFailed = -6,
    ComputationFailed = -7,
    OutOfMemory = -8,
    TypeMismatch = -9,
    NotImplemented = -10,
    Unknown = -999,
}

impl FlowError {
    /// Decode a raw status code. Unrecognized codes map to `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => FlowError::Success,
            -1 => FlowError::InvalidHandle,
            -2 => FlowError::InvalidArgument,
            -3 => FlowError::NodeNotFound,
            -4 => FlowError::PortNotFound,
            -5 => FlowError::ConnectionFailed,
            -6 => FlowError::ModuleLoadFailed,
            -7 => FlowError::ComputationFailed,
            -8 => FlowError::OutOfMemory,
            -9 => FlowError::TypeMismatch,
            -10 => FlowError::NotImplemented,
            _ => FlowError::Unknown,
        }
    }

    /// Raw status code
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == FlowError::Success
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowError::Success => "success",
            FlowError::InvalidHandle => "invalid handle",
            FlowError::InvalidArgument => "invalid argument",
            FlowError::NodeNotFound => "node not found",
            FlowError::PortNotFound => "port not found",
            FlowError::ConnectionFailed => "connection failed",
            FlowError::ModuleLoadFailed => "module load failed",
            FlowError::ComputationFailed => "computation failed",
            FlowError::OutOfMemory => "out of memory",
            FlowError::TypeMismatch => "type mismatch",
            FlowError::NotImplemented => "not implemented",
            FlowError::Unknown => "unknown error",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Errors raised on the native side of the boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Computation failed: {0}")]
    ComputationFailed(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("{0}")]
    Unknown(String),
}

impl BridgeError {
    /// Boundary status code for this error
    pub fn code(&self) -> FlowError {
        match self {
            BridgeError::InvalidHandle(_) => FlowError::InvalidHandle,
            BridgeError::InvalidArgument(_) => FlowError::InvalidArgument,
            BridgeError::NodeNotFound(_) => FlowError::NodeNotFound,
            BridgeError::PortNotFound(_) => FlowError::PortNotFound,
            BridgeError::ConnectionNotFound(_) | BridgeError::ConnectionFailed(_) => {
                FlowError::ConnectionFailed
            }
            BridgeError::ComputationFailed(_) => FlowError::ComputationFailed,
            BridgeError::TypeMismatch { .. } => FlowError::TypeMismatch,
            BridgeError::OutOfMemory(_) => FlowError::OutOfMemory,
            BridgeError::Unknown(_) => FlowError::Unknown,
        }
    }

    pub(crate) fn null_argument(name: &str) -> Self {
        BridgeError::InvalidArgument(format!("{} is null", name))
    }

    pub(crate) fn null_handle(name: &str) -> Self {
        BridgeError::InvalidHandle(format!("{} is null", name))
    }

    pub(crate) fn unregistered(name: &str) -> Self {
        BridgeError::InvalidHandle(format!("{} is not registered", name))
    }
}

impl From<std::collections::TryReserveError> for BridgeError {
    fn from(e: std::collections::TryReserveError) -> Self {
        BridgeError::OutOfMemory(e.to_string())
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
