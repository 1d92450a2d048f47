
use anyhow::{Context, Result, bail};
use pairline_core::CallStatus;
use std::time::Duration;
use tokio::sync::watch;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Wait until the status stream reaches exactly `want`. Fails if the
/// stream closes or the (virtual) deadline passes first.
pub async fn wait_for_status(
    rx: &mut watch::Receiver<CallStatus>,
    want: CallStatus,
) -> Result<()> {
    let waited = tokio::time::timeout(Duration::from_secs(120), async {
        loop {
            if *rx.borrow_and_update() == want {
                return Ok(());
            }
            rx.changed().await.context("status channel closed")?;
        }
    })
    .await;
    match waited {
        Ok(res) => res,
        Err(_) => bail!("status never reached {:?}", want),
    }
}

/// Spin (on virtual time under paused tests) until `cond` holds.
pub async fn wait_until(cond: impl Fn() -> bool) -> Result<()> {
    tokio::time::timeout(Duration::from_secs(120), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .context("condition not reached in time")
}
