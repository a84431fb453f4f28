// src/surface/mod.rs
//! Double-buffered rendering surface with a cached steady layer.
//!
//! - RenderHooks: what a visualization draws (steady part, dynamic part)
//! - BufferedSurface: when the steady layer is regenerated and how frames
//!   reach the screen
//! - platform: volatile images and swap chains supplied by the platform
//!
//! Each frame is the steady image blitted at the origin with the dynamic part
//! painted on top. The steady image is repainted only when it is missing,
//! flushed by `clear()`, or discarded by the platform.

pub mod framebuffer;
pub mod headless;
pub mod platform;

#[cfg(test)]
mod tests;

pub use framebuffer::{Argb, Framebuffer};
pub use headless::{HeadlessDevice, HeadlessProbe};
pub use platform::{DeviceError, GraphicsConfiguration, GraphicsDevice, SwapChain, VolatileImage};

use crate::config::SurfaceConfig;
use anyhow::{anyhow, Context, Result};
use log::*;

/// Drawing callbacks implemented by a concrete visualization.
pub trait RenderHooks {
    /// Paints the content that does not change between frames.
    fn paint_steady_part(&mut self, g: &mut Framebuffer);

    /// Advances the dynamic state by one frame.
    fn update_dynamic_part(&mut self);

    /// Paints the per-frame content on top of the steady image.
    fn paint_dynamic_part(&mut self, g: &mut Framebuffer);
}

/// Counters describing the surface's paint history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    /// Times the steady-paint hook ran.
    pub steady_paints: u64,
    /// Times the dynamic-paint hook ran.
    pub dynamic_paints: u64,
    /// Composites repeated because the swap chain lost a present.
    pub present_retries: u64,
}

pub struct BufferedSurface<H: RenderHooks> {
    hooks: H,
    device: Box<dyn GraphicsDevice>,
    config: SurfaceConfig,
    configuration: Option<Box<dyn GraphicsConfiguration>>,
    steady: Option<Box<dyn VolatileImage>>,
    swap_chain: Option<Box<dyn SwapChain>>,
    use_swap_chain: bool,
    validated: bool,
    stats: SurfaceStats,
}

impl<H: RenderHooks> BufferedSurface<H> {
    pub fn new<D: GraphicsDevice + 'static>(hooks: H, device: D) -> Self {
        Self::with_config(hooks, device, SurfaceConfig::default())
    }

    pub fn with_config<D: GraphicsDevice + 'static>(
        hooks: H,
        device: D,
        config: SurfaceConfig,
    ) -> Self {
        Self {
            hooks,
            device: Box::new(device),
            config,
            configuration: None,
            steady: None,
            swap_chain: None,
            use_swap_chain: false,
            validated: false,
            stats: SurfaceStats::default(),
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn size(&self) -> (u32, u32) {
        self.device.size()
    }

    pub fn stats(&self) -> SurfaceStats {
        self.stats
    }

    /// True if frames are presented through a swap chain.
    pub fn is_double_buffered(&self) -> bool {
        self.use_swap_chain && self.swap_chain.is_some()
    }

    /// Call after the drawable became visible or changed size.
    ///
    /// Resolves the graphics configuration (once), tries to acquire a swap
    /// chain if none is held yet, then clears the steady layer.
    pub fn validate(&mut self) -> Result<()> {
        if self.configuration.is_none() {
            let configuration = self
                .device
                .resolve_configuration()
                .context("Failed to resolve graphics configuration")?;
            self.configuration = Some(configuration);
        }
        if self.swap_chain.is_none() {
            self.swap_chain = self.device.create_swap_chain(self.config.num_buffers);
            self.use_swap_chain = self.swap_chain.is_some();
            info!(
                "BufferedSurface: {}",
                if self.use_swap_chain {
                    "double buffering via swap chain"
                } else {
                    "no swap chain, drawing directly"
                }
            );
        }
        self.validated = true;
        self.clear();
        Ok(())
    }

    /// Discards the steady image so the next paint regenerates it.
    pub fn clear(&mut self) {
        if let Some(steady) = self.steady.as_mut() {
            steady.flush();
        }
    }

    /// Explicit repaint request: advances the dynamic state, then paints.
    ///
    /// Incidental repaints (damage, expose) go through [`paint`](Self::paint)
    /// so the animation does not advance on them.
    pub fn update(&mut self, target: &mut Framebuffer) -> Result<()> {
        self.hooks.update_dynamic_part();
        self.paint(target)
    }

    /// Composites the steady and dynamic layers and presents the result.
    ///
    /// `target` is drawn on only when no swap chain is in use.
    pub fn paint(&mut self, target: &mut Framebuffer) -> Result<()> {
        if !self.validated {
            self.validate()?;
        }
        self.restore_steady_image()?;

        let steady = self
            .steady
            .as_ref()
            .ok_or_else(|| anyhow!("Steady image missing after recovery"))?;
        let double_buffered = self.use_swap_chain && self.swap_chain.is_some();
        loop {
            {
                let g: &mut Framebuffer = match self.swap_chain.as_mut() {
                    Some(chain) if double_buffered => chain.back_buffer(),
                    _ => &mut *target,
                };
                g.blit(steady.framebuffer(), 0, 0);
                self.hooks.paint_dynamic_part(g);
                self.stats.dynamic_paints += 1;
            }

            let Some(chain) = self.swap_chain.as_mut().filter(|_| double_buffered) else {
                break;
            };
            chain.show();
            if !chain.contents_lost() {
                break;
            }
            self.stats.present_retries += 1;
            debug!("BufferedSurface: present lost, compositing again");
        }
        Ok(())
    }

    /// Full repaint onto `target`, bypassing the swap chain.
    ///
    /// Routes through [`paint`](Self::paint) so both paths share one algorithm.
    pub fn paint_all(&mut self, target: &mut Framebuffer) -> Result<()> {
        if !self.validated {
            self.validate()?;
        }
        if !self.use_swap_chain {
            return self.paint(target);
        }
        self.use_swap_chain = false;
        let result = self.paint(target);
        self.use_swap_chain = true;
        result
    }

    /// Recreates and repaints the steady image until one survives.
    fn restore_steady_image(&mut self) -> Result<()> {
        let mut attempts: u32 = 0;
        while self.steady.as_ref().map_or(true, |s| s.contents_lost()) {
            attempts += 1;
            if attempts > 1 {
                if attempts > self.config.recovery_warn_threshold {
                    warn!(
                        "BufferedSurface: steady image lost again during recreation (attempt {})",
                        attempts
                    );
                } else {
                    debug!(
                        "BufferedSurface: steady image lost during recreation (attempt {})",
                        attempts
                    );
                }
            }
            let configuration = self
                .configuration
                .as_ref()
                .ok_or_else(|| anyhow!("Graphics configuration not resolved"))?;
            let (width, height) = self.device.size();
            let mut image = configuration.create_compatible_image(width, height);
            self.hooks.paint_steady_part(image.framebuffer_mut());
            self.stats.steady_paints += 1;
            self.steady = Some(image);
        }
        if attempts > 0 {
            trace!("BufferedSurface: steady image ready after {} attempt(s)", attempts);
        }
        Ok(())
    }
}

impl<H: RenderHooks> std::fmt::Debug for BufferedSurface<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedSurface")
            .field("size", &self.device.size())
            .field("double_buffered", &self.is_double_buffered())
            .field("has_steady_image", &self.steady.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}
