// src/main.rs

use frame_canvas::{
    compose,
    config::CONFIG,
    demo::BouncingMarker,
    surface::{BufferedSurface, Framebuffer, HeadlessDevice},
    LoopExit, PumpStatus,
};

use anyhow::Context;
use log::{error, info, warn};
use std::time::{Duration, Instant};

/// Runs the bouncing-marker demo on the headless platform.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting frame-canvas demo...");
    let config = &*CONFIG;
    let demo = &config.demo;

    let device = HeadlessDevice::new(demo.width_px, demo.height_px);
    let probe = device.probe();
    let hooks = BouncingMarker::new(demo.width_px, demo.height_px, demo.grid_spacing_px);
    let surface = BufferedSurface::with_config(hooks, device, config.surface.clone());
    let (driver, mut visualization) = compose(surface, &config.animation);

    driver.add_state_listener(|running| {
        info!("Animation {}", if running { "running" } else { "paused" });
    });

    let mut target = Framebuffer::new(demo.width_px, demo.height_px);
    visualization
        .surface_mut()
        .validate()
        .context("Failed to initialize surface")?;
    driver
        .set_running(true)
        .context("Failed to start animation")?;

    let started = Instant::now();
    let duration = Duration::from_millis(demo.duration_ms);
    let mut cleared = false;
    while started.elapsed() < duration {
        if !cleared && started.elapsed() >= duration / 2 {
            // Halfway through: a "parameter change" invalidates the steady layer.
            visualization.surface_mut().clear();
            cleared = true;
        }
        match visualization.wait_and_pump(&mut target, Duration::from_millis(100)) {
            Ok(PumpStatus::Rendered(_)) => {}
            Ok(PumpStatus::Disconnected) => {
                warn!("Animation stopped delivering frames. Exiting main loop.");
                break;
            }
            Err(e) => {
                error!("Error while rendering: {:#}. Exiting.", e);
                break;
            }
        }
    }

    match driver.terminate().context("Failed to terminate animation")? {
        LoopExit::Terminated => info!("Animation terminated."),
        LoopExit::Panicked(message) => error!("Animation ended abnormally: {}", message),
    }

    let stats = visualization.surface().stats();
    info!(
        "Rendered {} frames in {:?} ({} presented, {} steady paints, {} present retries, marker at {:?})",
        visualization.frames_rendered(),
        started.elapsed(),
        probe.presents(),
        stats.steady_paints,
        stats.present_retries,
        visualization.surface().hooks().position()
    );
    Ok(())
}
