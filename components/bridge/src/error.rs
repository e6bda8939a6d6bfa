//! Bridge errors and their mapping onto each side of the boundary

use guest_runtime::GuestError;
use host_types::HostError;
use thiserror::Error;

use crate::proxy::ProxyId;

/// Errors raised by bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host called a proxy whose registry entry has been released
    #[error("call to released function (id {0})")]
    ReleasedFunction(ProxyId),

    /// No bridge state under the given registry slot
    #[error("bridge not installed under registry key '{0}'")]
    NotInstalled(String),

    /// The registry slot is already occupied
    #[error("registry key '{0}' already in use")]
    AlreadyInstalled(String),

    /// A proxy outlived the guest state it belongs to
    #[error("guest state has been dropped")]
    GuestDropped,

    /// Error raised inside the guest
    #[error(transparent)]
    Guest(#[from] GuestError),

    /// Malformed configuration document
    #[error("invalid bridge config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failures reaching the host surface as thrown errors
impl From<BridgeError> for HostError {
    fn from(err: BridgeError) -> Self {
        HostError::new(err.to_string())
    }
}

/// Failures reaching the guest surface as raised errors
impl From<BridgeError> for GuestError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Guest(e) => e,
            other => GuestError::Runtime(other.to_string()),
        }
    }
}
