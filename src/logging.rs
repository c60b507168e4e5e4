//! Opt-in tracing setup for binaries and tests embedding a node.
//! Library code only emits through the `tracing` macros; whoever owns
//! the process decides whether and how to subscribe.
pub use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber at `level`, overridable per module
/// through `RUST_LOG`. Safe to call more than once; later calls lose.
pub fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
