// Render loop - Drives the controller at a fixed frame rate and presents to a canvas
use crate::application::canvas::Canvas;
use crate::application::display_controller::DisplayController;
use crate::application::weather_source::WeatherSource;
use anyhow::Context;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub fn frame_interval(frame_rate: u32) -> Duration {
    Duration::from_secs(1) / frame_rate.max(1)
}

/// Tick and present until `shutdown` resolves, the canvas asks to stop, or the
/// canvas fails. The canvas is released on every exit path.
pub async fn run_display<S, C>(
    controller: &mut DisplayController<S>,
    canvas: &mut C,
    frame_interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()>
where
    S: WeatherSource + 'static,
    C: Canvas,
{
    let mut ticker = tokio::time::interval(frame_interval);
    // A slow frame delays the next one instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut frames: u64 = 0;
    let outcome = loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break Ok(());
            }
            _ = ticker.tick() => {}
        }

        if canvas.poll_shutdown_requested() {
            tracing::info!("Display closed by user");
            break Ok(());
        }

        let now = tokio::time::Instant::now().into_std();
        let frame = controller.tick(now);
        if let Err(e) = canvas.present(&frame) {
            tracing::error!("Failed to present frame {}: {}", frames, e);
            break Err(e);
        }
        frames += 1;
    };

    controller.shutdown();
    canvas.release();
    tracing::info!(
        "Display loop stopped after {} frames ({:?}, {} live fetches)",
        frames,
        controller.phase(),
        controller.fetch_attempts()
    );

    outcome.context("Display backend stopped accepting frames")
}
