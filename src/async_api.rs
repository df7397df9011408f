//! Optional async helpers for hosts that publish render-settled signals on a channel.
//!
//! This module is available with the `async` feature.

use tokio::sync::watch;

use crate::engine::ReaderEngine;
use crate::error::ReaderError;
use crate::progress::Progress;
use crate::surface::{ReaderHost, ScrollSurface};

/// Wait for `frames` render-settled signals.
///
/// The host bumps the channel value once per completed layout pass; only
/// changes count, not the value itself.
pub async fn wait_for_layout(
    signals: &mut watch::Receiver<u64>,
    frames: u8,
) -> Result<(), ReaderError> {
    for _ in 0..frames {
        signals
            .changed()
            .await
            .map_err(|_| ReaderError::LayoutSignalClosed)?;
    }
    Ok(())
}

/// Restore `progress` once the layout has settled.
///
/// Equivalent to [`ReaderEngine::restore`] followed by the engine's own
/// settle count of [`ReaderEngine::on_layout_settled`] calls, for hosts that
/// await layout instead of forwarding callbacks. Work already waiting in the
/// engine runs first and any restore it had queued is dropped, so later
/// [`ReaderEngine::on_layout_settled`] calls cannot override this one.
pub async fn restore_when_settled<S, H>(
    engine: &mut ReaderEngine<S, H>,
    signals: &mut watch::Receiver<u64>,
    progress: Progress,
) -> Result<(), ReaderError>
where
    S: ScrollSurface,
    H: ReaderHost,
{
    wait_for_layout(signals, engine.options().settle_frames).await?;
    engine.restore_settled(&progress);
    Ok(())
}
