//! Library exports for reuse in the CLI binary and integration tests.
/// Inventory scanning, fingerprinting, and persistence.
pub mod inventory;
/// Logging setup for the application.
pub mod logging;
/// Reachability probing for network-mounted directories.
pub mod probe;
/// Change report rendering.
pub mod report;
/// End-to-end run pipeline over a list of directories.
pub mod run;
