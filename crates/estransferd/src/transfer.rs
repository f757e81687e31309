//! Data-transfer entry point.
//!
//! The transfer pipeline itself is not implemented yet; the daemon scaffold
//! reserves this module so lifecycle wiring and the eventual business logic
//! stay separated.

use tracing::info;

pub(crate) const TRANSFER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transfer");

/// Announces that the pipeline would start here.
///
/// TODO: replace with the actual transfer pipeline once the source and sink
/// protocols land.
pub(crate) fn announce_ready() {
    info!(target: TRANSFER_TARGET, "ready to deal with data");
}
