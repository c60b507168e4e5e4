//! Error of ringkv.

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collection in ringkv.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A node with the same ring id is already a member of the ring.
    /// Fatal to the join attempt that discovered it, nothing else.
    #[error("node with id already exists in the ring")]
    NodeIdCollision,

    /// Routing could not resolve a successor for the requested id.
    #[error("cannot find successor")]
    NoSuccessorFound,

    /// Storage lookup miss.
    #[error("key not found")]
    KeyNotFound,

    /// A remote call timed out or the peer could not be reached.
    /// Timeout and connection failure are deliberately one variant.
    #[error("remote node unavailable: {0}")]
    RemoteUnavailable(String),

    /// The transport listener could not be brought up at node creation.
    #[error("transport failed to start: {0}")]
    TransportStart(String),

    /// A ring-state lock was poisoned by a panicking holder.
    #[error("ring state lock poisoned")]
    RingStatePoisoned,

    /// Node configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A ring id literal was not valid hexadecimal.
    #[error("invalid ring id hex")]
    IdHex(#[from] hex::FromHexError),

    /// A ring id literal had the wrong byte width.
    #[error("ring id must be exactly {0} bytes, got {1}")]
    IdLength(usize, usize),

    #[error("IOError: {0}")]
    IOError(#[from] std::io::Error),
}
