// src/surface/tests.rs

use super::*;
use std::sync::Arc;
use test_log::test;

const STEADY: Argb = 0xFF20_4060;
const MARKER: Argb = 0xFFFF_0000;

// --- Fixtures ---

#[derive(Debug, Default)]
struct RecordingHooks {
    events: Vec<&'static str>,
    steady_sizes: Vec<(u32, u32)>,
    frame: i32,
}

impl RenderHooks for RecordingHooks {
    fn paint_steady_part(&mut self, g: &mut Framebuffer) {
        self.events.push("steady");
        self.steady_sizes.push(g.size());
        g.fill(STEADY);
    }

    fn update_dynamic_part(&mut self) {
        self.events.push("update");
        self.frame += 1;
    }

    fn paint_dynamic_part(&mut self, g: &mut Framebuffer) {
        self.events.push("dynamic");
        g.set_pixel(self.frame, 0, MARKER);
    }
}

fn headless_surface(width: u32, height: u32) -> (BufferedSurface<RecordingHooks>, Arc<HeadlessProbe>) {
    let device = HeadlessDevice::new(width, height);
    let probe = device.probe();
    (BufferedSurface::new(RecordingHooks::default(), device), probe)
}

fn count(events: &[&str], name: &str) -> usize {
    events.iter().filter(|e| **e == name).count()
}

// --- Lazy initialization ---

#[test]
fn it_should_resolve_configuration_once_on_first_paint() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);
    assert_eq!(probe.configurations_resolved(), 0);

    surface.paint(&mut target).unwrap();
    surface.paint(&mut target).unwrap();
    surface.update(&mut target).unwrap();

    assert_eq!(probe.configurations_resolved(), 1);
    assert_eq!(probe.swap_chains_created(), 1);
    assert!(surface.is_double_buffered());
}

#[test]
fn it_should_not_reacquire_resources_on_revalidate() {
    let (mut surface, probe) = headless_surface(8, 4);
    surface.validate().unwrap();
    surface.validate().unwrap();

    assert_eq!(probe.configurations_resolved(), 1);
    assert_eq!(probe.swap_chains_created(), 1);
}

#[test]
fn it_should_fall_back_to_direct_drawing_without_swap_chain() {
    let (mut surface, probe) = headless_surface(8, 4);
    probe.set_swap_chain_available(false);
    let mut target = Framebuffer::new(8, 4);

    surface.update(&mut target).unwrap();

    assert!(!surface.is_double_buffered());
    assert_eq!(probe.presents(), 0);
    assert_eq!(target.pixel(0, 0), Some(STEADY));
    assert_eq!(target.pixel(1, 0), Some(MARKER));
}

#[test]
fn it_should_fail_paint_when_configuration_unavailable() {
    let (mut surface, probe) = headless_surface(8, 4);
    probe.set_configuration_available(false);
    let mut target = Framebuffer::new(8, 4);

    let err = surface.paint(&mut target).unwrap_err();

    assert!(format!("{:#}", err).contains("graphics configuration"));
    assert!(surface.hooks().events.is_empty());
}

// --- Steady layer ---

#[test]
fn it_should_paint_steady_part_only_when_needed() {
    let (mut surface, _) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);

    for _ in 0..5 {
        surface.update(&mut target).unwrap();
    }

    assert_eq!(surface.stats().steady_paints, 1);
    assert_eq!(surface.stats().dynamic_paints, 5);
}

#[test]
fn it_should_regenerate_steady_image_after_clear() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);
    surface.paint(&mut target).unwrap();

    surface.clear();
    surface.paint(&mut target).unwrap();

    assert_eq!(count(&surface.hooks().events, "steady"), 2);
    assert_eq!(probe.images_created(), 2);
}

#[test]
fn it_should_retry_until_steady_image_survives_before_dynamic_paint() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);
    probe.lose_next_images(2);

    surface.paint(&mut target).unwrap();

    assert_eq!(
        surface.hooks().events,
        vec!["steady", "steady", "steady", "dynamic"]
    );
    assert_eq!(probe.images_created(), 3);
}

#[test]
fn it_should_regenerate_after_platform_loses_all_images() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);
    surface.paint(&mut target).unwrap();
    surface.hooks_mut().events.clear();

    probe.lose_all_images();
    surface.paint(&mut target).unwrap();

    assert_eq!(surface.hooks().events, vec!["steady", "dynamic"]);
}

#[test]
fn it_should_size_steady_image_to_current_dimensions_after_resize() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);
    surface.paint(&mut target).unwrap();

    probe.resize(16, 10);
    surface.validate().unwrap();
    surface.paint(&mut target).unwrap();

    assert_eq!(surface.hooks().steady_sizes, vec![(8, 4), (16, 10)]);
    assert_eq!(probe.last_presented().unwrap().size(), (16, 10));
}

// --- Dynamic layer ---

#[test]
fn it_should_update_once_before_dynamic_paint_per_request() {
    let (mut surface, _) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);

    surface.update(&mut target).unwrap();
    surface.update(&mut target).unwrap();

    assert_eq!(
        surface.hooks().events,
        vec!["update", "steady", "dynamic", "update", "dynamic"]
    );
}

#[test]
fn it_should_not_update_dynamic_state_on_incidental_paint() {
    let (mut surface, _) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);

    surface.paint(&mut target).unwrap();
    surface.paint(&mut target).unwrap();

    assert_eq!(count(&surface.hooks().events, "update"), 0);
    assert_eq!(surface.hooks().frame, 0);
}

#[test]
fn it_should_composite_dynamic_part_over_steady_image() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);

    surface.update(&mut target).unwrap();
    surface.update(&mut target).unwrap();

    let frame = probe.last_presented().unwrap();
    assert_eq!(frame.pixel(0, 0), Some(STEADY));
    assert_eq!(frame.pixel(2, 0), Some(MARKER));
    // Earlier marker is gone: each frame starts from the steady image.
    assert_eq!(frame.pixel(1, 0), Some(STEADY));
    assert_eq!(target.pixel(0, 0), Some(framebuffer::TRANSPARENT));
}

#[test]
fn it_should_repeat_composite_when_present_is_lost() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);
    probe.lose_next_presents(2);

    surface.update(&mut target).unwrap();

    let stats = surface.stats();
    assert_eq!(stats.dynamic_paints, 3);
    assert_eq!(stats.present_retries, 2);
    assert_eq!(stats.steady_paints, 1);
    assert_eq!(probe.presents(), 1);
    assert_eq!(count(&surface.hooks().events, "update"), 1);
}

// --- Full repaint ---

#[test]
fn it_should_paint_all_onto_target_while_keeping_swap_chain() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);
    surface.validate().unwrap();

    surface.paint_all(&mut target).unwrap();

    assert_eq!(target.pixel(0, 0), Some(STEADY));
    assert_eq!(probe.presents(), 0);
    assert!(surface.is_double_buffered());

    surface.paint(&mut target).unwrap();
    assert_eq!(probe.presents(), 1);
}

#[test]
fn it_should_validate_lazily_on_paint_all() {
    let (mut surface, probe) = headless_surface(8, 4);
    let mut target = Framebuffer::new(8, 4);

    surface.paint_all(&mut target).unwrap();

    assert_eq!(probe.configurations_resolved(), 1);
    assert_eq!(probe.presents(), 0);
    assert_eq!(target.pixel(0, 0), Some(STEADY));
}
