// src/surface/platform.rs
//! Platform seam for the buffered surface.
//!
//! These traits describe the minimal set of primitives the surface needs from
//! a graphics platform. All repaint logic lives in `BufferedSurface`; a
//! platform only creates images and swap chains and reports when their
//! contents were discarded.
//!
//! ## Volatility
//! Neither a `VolatileImage` nor a `SwapChain` is trusted to keep its pixels.
//! Callers check `contents_lost()` after every use and recreate or repeat as
//! needed. A successful creation does not mean the image stays valid until
//! the next explicit `flush()`.

use crate::surface::framebuffer::Framebuffer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No graphics configuration available: {0}")]
    ConfigurationUnavailable(String),
}

/// Offscreen image whose contents the platform may discard at any time.
pub trait VolatileImage {
    /// True if the pixels are gone (platform reclaimed them or `flush()` ran).
    fn contents_lost(&self) -> bool;

    fn framebuffer(&self) -> &Framebuffer;

    fn framebuffer_mut(&mut self) -> &mut Framebuffer;

    /// Releases the image's resources. `contents_lost()` is true afterwards.
    fn flush(&mut self);
}

/// Multi-buffer presentation chain.
pub trait SwapChain {
    /// Buffer to draw the next frame into.
    fn back_buffer(&mut self) -> &mut Framebuffer;

    /// Presents the back buffer.
    fn show(&mut self);

    /// True if the last `show()` lost the frame and it must be redrawn.
    fn contents_lost(&self) -> bool;
}

/// Factory for images compatible with a display.
pub trait GraphicsConfiguration {
    fn create_compatible_image(&self, width: u32, height: u32) -> Box<dyn VolatileImage>;
}

/// The platform drawable a `BufferedSurface` wraps.
pub trait GraphicsDevice {
    /// Current drawable size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resolves the display's graphics configuration. Called once per surface.
    fn resolve_configuration(&mut self) -> Result<Box<dyn GraphicsConfiguration>, DeviceError>;

    /// Attempts to create a swap chain; `None` means draw directly.
    fn create_swap_chain(&mut self, num_buffers: usize) -> Option<Box<dyn SwapChain>>;
}
