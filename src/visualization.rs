// src/visualization.rs

//! Wires an `AnimationDriver` to a `BufferedSurface`.
//!
//! The driver thread never touches the surface. Each tick posts a
//! `RepaintRequest` on a channel; the host's rendering thread drains the
//! channel and turns every request into one `BufferedSurface::update`. The
//! driver decides *when* a frame happens, the surface decides *how* it
//! reaches the screen.
//!
//! There is no backpressure: if painting is slower than the frame period,
//! requests queue up and frames are simply delivered late.

use crate::animation::{AnimationDriver, FrameListener};
use crate::config::AnimationConfig;
use crate::surface::{BufferedSurface, Framebuffer, RenderHooks};
use anyhow::Result;
use log::*;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests;

/// Explicit repaint request posted once per animation tick.
#[derive(Debug, Clone, Copy)]
pub struct RepaintRequest {
    /// Tick number, starting at 1.
    pub frame: u64,
    pub issued_at: Instant,
}

/// `FrameListener` that turns ticks into repaint requests.
#[derive(Debug)]
pub struct RepaintRequester {
    tx: Sender<RepaintRequest>,
    frame: u64,
    disconnected: bool,
}

impl FrameListener for RepaintRequester {
    fn on_frame(&mut self) {
        if self.disconnected {
            return;
        }
        self.frame += 1;
        let request = RepaintRequest {
            frame: self.frame,
            issued_at: Instant::now(),
        };
        if self.tx.send(request).is_err() {
            info!("RepaintRequester: render side closed, dropping further ticks");
            self.disconnected = true;
        }
    }
}

/// Creates a connected requester/receiver pair.
pub fn repaint_channel() -> (RepaintRequester, Receiver<RepaintRequest>) {
    let (tx, rx) = mpsc::channel();
    (
        RepaintRequester {
            tx,
            frame: 0,
            disconnected: false,
        },
        rx,
    )
}

/// Result of one pump cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Number of repaint requests rendered this cycle.
    Rendered(usize),
    /// The driver side is gone; no more requests will arrive.
    Disconnected,
}

/// Render-thread half of an animated visualization.
pub struct Visualization<H: RenderHooks> {
    surface: BufferedSurface<H>,
    requests: Receiver<RepaintRequest>,
    frames_rendered: u64,
    last_frame: Option<u64>,
}

/// Builds a stopped driver whose ticks feed a new `Visualization`.
pub fn compose<H: RenderHooks>(
    surface: BufferedSurface<H>,
    config: &AnimationConfig,
) -> (AnimationDriver, Visualization<H>) {
    let (requester, requests) = repaint_channel();
    let driver = AnimationDriver::from_config(requester, config);
    (driver, Visualization::new(surface, requests))
}

impl<H: RenderHooks> Visualization<H> {
    pub fn new(surface: BufferedSurface<H>, requests: Receiver<RepaintRequest>) -> Self {
        Self {
            surface,
            requests,
            frames_rendered: 0,
            last_frame: None,
        }
    }

    pub fn surface(&self) -> &BufferedSurface<H> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut BufferedSurface<H> {
        &mut self.surface
    }

    /// Requests rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Tick number of the most recently rendered request.
    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Renders every pending request without blocking.
    pub fn pump(&mut self, target: &mut Framebuffer) -> Result<PumpStatus> {
        let mut rendered = 0;
        loop {
            match self.requests.try_recv() {
                Ok(request) => {
                    self.render(request, target)?;
                    rendered += 1;
                }
                Err(TryRecvError::Empty) => return Ok(PumpStatus::Rendered(rendered)),
                Err(TryRecvError::Disconnected) if rendered == 0 => {
                    return Ok(PumpStatus::Disconnected)
                }
                Err(TryRecvError::Disconnected) => return Ok(PumpStatus::Rendered(rendered)),
            }
        }
    }

    /// Blocks up to `timeout` for a request, then renders everything pending.
    pub fn wait_and_pump(
        &mut self,
        target: &mut Framebuffer,
        timeout: Duration,
    ) -> Result<PumpStatus> {
        match self.requests.recv_timeout(timeout) {
            Ok(request) => {
                self.render(request, target)?;
                match self.pump(target)? {
                    PumpStatus::Rendered(n) => Ok(PumpStatus::Rendered(n + 1)),
                    PumpStatus::Disconnected => Ok(PumpStatus::Rendered(1)),
                }
            }
            Err(RecvTimeoutError::Timeout) => Ok(PumpStatus::Rendered(0)),
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Visualization: repaint channel disconnected");
                Ok(PumpStatus::Disconnected)
            }
        }
    }

    /// Incidental repaint (window damage): repaints without advancing the animation.
    pub fn damage(&mut self, target: &mut Framebuffer) -> Result<()> {
        self.surface.paint(target)
    }

    fn render(&mut self, request: RepaintRequest, target: &mut Framebuffer) -> Result<()> {
        trace!(
            "Visualization: frame {} ({:?} after request)",
            request.frame,
            request.issued_at.elapsed()
        );
        self.surface.update(target)?;
        self.frames_rendered += 1;
        self.last_frame = Some(request.frame);
        Ok(())
    }
}
