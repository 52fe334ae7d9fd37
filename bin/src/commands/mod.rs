//! CLI command implementations.

pub(crate) mod aggregate;
pub(crate) mod produce;
pub(crate) mod run;
pub(crate) mod to_store;
pub(crate) mod train;

mod source;

pub(crate) use source::{TradeRecords, open_trade_source};

/// Resolves on Ctrl-C.
///
/// If the handler cannot be installed the future never resolves and the run
/// continues until its source is exhausted.
pub(crate) async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl-C, stopping"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
