//! Constant variables.

/// Width of the ring id space in bits. The ring is the SHA-1 ring,
/// so every id and finger target lives in [0, 2^160).
pub const RING_BITS: usize = 160;

/// Width of a canonical ring id in bytes.
pub const ID_BYTES: usize = RING_BITS / 8;

/// Default period of the stabilization cycle in ms.
pub const DEFAULT_STABILIZE_INTERVAL_MS: u64 = 1000;

/// Default period of the finger-fixing cycle in ms, one finger per tick.
pub const DEFAULT_FIX_FINGER_INTERVAL_MS: u64 = 250;

/// Default period of the predecessor liveness probe in ms.
pub const DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS: u64 = 10_000;

/// Default upper bound on a single remote call in ms.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 5_000;

/// Default idle duration after which pooling transports evict a
/// per-address connection, in ms.
pub const DEFAULT_MAX_IDLE_MS: u64 = 60_000;
