//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable, e.g. `RUST_LOG=bonsai=debug`
/// to see per-tree generation stats.
///
/// # Example
/// ```
/// bonsai::core::logging::init();
/// log::info!("Growing trees");
/// ```
pub fn init() {
    // A second call is a no-op
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();
}
