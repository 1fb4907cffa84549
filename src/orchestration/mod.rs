//! Per-chain stream processing.

use futures::future::try_join_all;

pub mod runner;

pub use runner::{PollStats, StreamError, StreamRunner};

/// Drive several streams concurrently until each has caught up.
pub async fn catch_up_all(runners: &[StreamRunner]) -> Result<Vec<PollStats>, StreamError> {
    try_join_all(runners.iter().map(|runner| runner.run_until_idle())).await
}
