//! Headless in-memory graphics platform.
//!
//! Used by the demo binary and the tests. A shared [`HeadlessProbe`] lets the
//! caller resize the drawable, inject content loss into steady images and
//! swap chain presents, and read counters and the last presented frame.

use crate::surface::framebuffer::Framebuffer;
use crate::surface::platform::{
    DeviceError, GraphicsConfiguration, GraphicsDevice, SwapChain, VolatileImage,
};
use log::{info, trace};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared control and observation handle for a headless device.
#[derive(Debug)]
pub struct HeadlessProbe {
    size: Mutex<(u32, u32)>,
    swap_chain_available: AtomicBool,
    configuration_available: AtomicBool,
    /// Bumped by `lose_all_images`; images from an older epoch report loss.
    epoch: AtomicU64,
    doomed_images: AtomicU32,
    lost_presents: AtomicU32,
    configurations_resolved: AtomicUsize,
    swap_chains_created: AtomicUsize,
    images_created: AtomicUsize,
    presents: AtomicUsize,
    last_presented: Mutex<Option<Framebuffer>>,
}

impl HeadlessProbe {
    fn new(width: u32, height: u32) -> Self {
        Self {
            size: Mutex::new((width, height)),
            swap_chain_available: AtomicBool::new(true),
            configuration_available: AtomicBool::new(true),
            epoch: AtomicU64::new(0),
            doomed_images: AtomicU32::new(0),
            lost_presents: AtomicU32::new(0),
            configurations_resolved: AtomicUsize::new(0),
            swap_chains_created: AtomicUsize::new(0),
            images_created: AtomicUsize::new(0),
            presents: AtomicUsize::new(0),
            last_presented: Mutex::new(None),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates a window resize.
    pub fn resize(&self, width: u32, height: u32) {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner) = (width, height);
    }

    pub fn set_swap_chain_available(&self, available: bool) {
        self.swap_chain_available.store(available, Ordering::SeqCst);
    }

    pub fn set_configuration_available(&self, available: bool) {
        self.configuration_available.store(available, Ordering::SeqCst);
    }

    /// Discards the contents of every image created so far.
    pub fn lose_all_images(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// The next `count` images lose their contents right after being painted.
    pub fn lose_next_images(&self, count: u32) {
        self.doomed_images.fetch_add(count, Ordering::SeqCst);
    }

    /// The next `count` swap chain presents lose their frame.
    pub fn lose_next_presents(&self, count: u32) {
        self.lost_presents.fetch_add(count, Ordering::SeqCst);
    }

    pub fn configurations_resolved(&self) -> usize {
        self.configurations_resolved.load(Ordering::SeqCst)
    }

    pub fn swap_chains_created(&self) -> usize {
        self.swap_chains_created.load(Ordering::SeqCst)
    }

    pub fn images_created(&self) -> usize {
        self.images_created.load(Ordering::SeqCst)
    }

    /// Successful presents (lost ones are not counted).
    pub fn presents(&self) -> usize {
        self.presents.load(Ordering::SeqCst)
    }

    pub fn last_presented(&self) -> Option<Framebuffer> {
        self.last_presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Consumes one unit of a fault counter, returning whether one was pending.
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory `GraphicsDevice`.
pub struct HeadlessDevice {
    probe: Arc<HeadlessProbe>,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        info!("HeadlessDevice::new() {}x{}", width, height);
        Self {
            probe: Arc::new(HeadlessProbe::new(width, height)),
        }
    }

    pub fn probe(&self) -> Arc<HeadlessProbe> {
        Arc::clone(&self.probe)
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn size(&self) -> (u32, u32) {
        self.probe.size()
    }

    fn resolve_configuration(&mut self) -> Result<Box<dyn GraphicsConfiguration>, DeviceError> {
        if !self.probe.configuration_available.load(Ordering::SeqCst) {
            return Err(DeviceError::ConfigurationUnavailable(
                "headless display detached".to_string(),
            ));
        }
        self.probe.configurations_resolved.fetch_add(1, Ordering::SeqCst);
        info!("HeadlessDevice: configuration resolved");
        Ok(Box::new(HeadlessConfiguration {
            probe: Arc::clone(&self.probe),
        }))
    }

    fn create_swap_chain(&mut self, num_buffers: usize) -> Option<Box<dyn SwapChain>> {
        if !self.probe.swap_chain_available.load(Ordering::SeqCst) || num_buffers == 0 {
            info!("HeadlessDevice: swap chain unavailable");
            return None;
        }
        self.probe.swap_chains_created.fetch_add(1, Ordering::SeqCst);
        let (width, height) = self.probe.size();
        info!("HeadlessDevice: swap chain with {} buffers", num_buffers);
        Some(Box::new(HeadlessSwapChain {
            buffers: (0..num_buffers)
                .map(|_| Framebuffer::new(width, height))
                .collect(),
            back: 0,
            lost: false,
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct HeadlessConfiguration {
    probe: Arc<HeadlessProbe>,
}

impl GraphicsConfiguration for HeadlessConfiguration {
    fn create_compatible_image(&self, width: u32, height: u32) -> Box<dyn VolatileImage> {
        self.probe.images_created.fetch_add(1, Ordering::SeqCst);
        let doomed = HeadlessProbe::take(&self.probe.doomed_images);
        trace!(
            "HeadlessConfiguration: image {}x{} (doomed: {})",
            width,
            height,
            doomed
        );
        Box::new(HeadlessImage {
            framebuffer: Framebuffer::new(width, height),
            epoch: self.probe.epoch.load(Ordering::SeqCst),
            doomed,
            flushed: false,
            probe: Arc::clone(&self.probe),
        })
    }
}

struct HeadlessImage {
    framebuffer: Framebuffer,
    epoch: u64,
    doomed: bool,
    flushed: bool,
    probe: Arc<HeadlessProbe>,
}

impl VolatileImage for HeadlessImage {
    fn contents_lost(&self) -> bool {
        self.flushed || self.doomed || self.probe.epoch.load(Ordering::SeqCst) != self.epoch
    }

    fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    fn flush(&mut self) {
        self.flushed = true;
    }
}

struct HeadlessSwapChain {
    buffers: Vec<Framebuffer>,
    back: usize,
    lost: bool,
    probe: Arc<HeadlessProbe>,
}

impl SwapChain for HeadlessSwapChain {
    fn back_buffer(&mut self) -> &mut Framebuffer {
        let (width, height) = self.probe.size();
        let back = &mut self.buffers[self.back];
        if back.size() != (width, height) {
            *back = Framebuffer::new(width, height);
        }
        back
    }

    fn show(&mut self) {
        if HeadlessProbe::take(&self.probe.lost_presents) {
            trace!("HeadlessSwapChain: present lost");
            self.lost = true;
            return;
        }
        self.lost = false;
        *self
            .probe
            .last_presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(self.buffers[self.back].clone());
        self.probe.presents.fetch_add(1, Ordering::SeqCst);
        self.back = (self.back + 1) % self.buffers.len();
    }

    fn contents_lost(&self) -> bool {
        self.lost
    }
}
