// src/visualization/tests.rs

use super::*;
use crate::animation::LoopExit;
use crate::surface::HeadlessDevice;
use std::thread;
use test_log::test;

#[derive(Debug, Default)]
struct CountingHooks {
    updates: u64,
    steady_paints: u64,
    dynamic_paints: u64,
}

impl RenderHooks for CountingHooks {
    fn paint_steady_part(&mut self, g: &mut Framebuffer) {
        self.steady_paints += 1;
        g.fill(0xFF00_0000);
    }

    fn update_dynamic_part(&mut self) {
        self.updates += 1;
    }

    fn paint_dynamic_part(&mut self, _g: &mut Framebuffer) {
        self.dynamic_paints += 1;
    }
}

fn surface() -> BufferedSurface<CountingHooks> {
    BufferedSurface::new(CountingHooks::default(), HeadlessDevice::new(16, 8))
}

#[test]
fn it_should_number_requests_per_tick() {
    let (mut requester, rx) = repaint_channel();
    requester.on_frame();
    requester.on_frame();
    requester.on_frame();

    let frames: Vec<u64> = rx.try_iter().map(|r| r.frame).collect();
    assert_eq!(frames, vec![1, 2, 3]);
}

#[test]
fn it_should_tolerate_closed_render_side() {
    let (mut requester, rx) = repaint_channel();
    drop(rx);
    requester.on_frame();
    requester.on_frame();
    assert!(requester.disconnected);
}

#[test]
fn it_should_render_one_update_per_request() {
    let (mut requester, rx) = repaint_channel();
    let mut vis = Visualization::new(surface(), rx);
    let mut target = Framebuffer::new(16, 8);
    for _ in 0..4 {
        requester.on_frame();
    }

    assert_eq!(vis.pump(&mut target).unwrap(), PumpStatus::Rendered(4));
    assert_eq!(vis.pump(&mut target).unwrap(), PumpStatus::Rendered(0));

    let hooks = vis.surface().hooks();
    assert_eq!(hooks.updates, 4);
    assert_eq!(hooks.dynamic_paints, 4);
    assert_eq!(hooks.steady_paints, 1);
    assert_eq!(vis.frames_rendered(), 4);
    assert_eq!(vis.last_frame(), Some(4));
}

#[test]
fn it_should_not_advance_animation_on_damage() {
    let (_requester, rx) = repaint_channel();
    let mut vis = Visualization::new(surface(), rx);
    let mut target = Framebuffer::new(16, 8);

    vis.damage(&mut target).unwrap();
    vis.damage(&mut target).unwrap();

    let hooks = vis.surface().hooks();
    assert_eq!(hooks.updates, 0);
    assert_eq!(hooks.dynamic_paints, 2);
    assert_eq!(vis.frames_rendered(), 0);
}

#[test]
fn it_should_report_disconnect_once_requester_is_gone() {
    let (requester, rx) = repaint_channel();
    let mut vis = Visualization::new(surface(), rx);
    let mut target = Framebuffer::new(16, 8);
    drop(requester);

    assert_eq!(vis.pump(&mut target).unwrap(), PumpStatus::Disconnected);
    assert_eq!(
        vis.wait_and_pump(&mut target, Duration::from_millis(10))
            .unwrap(),
        PumpStatus::Disconnected
    );
}

#[test]
fn it_should_time_out_quietly_when_no_request_arrives() {
    let (_requester, rx) = repaint_channel();
    let mut vis = Visualization::new(surface(), rx);
    let mut target = Framebuffer::new(16, 8);

    assert_eq!(
        vis.wait_and_pump(&mut target, Duration::from_millis(10))
            .unwrap(),
        PumpStatus::Rendered(0)
    );
}

#[test]
fn it_should_render_every_tick_of_a_running_driver() {
    let config = AnimationConfig {
        frame_rate: 100,
        ..AnimationConfig::default()
    };
    let (driver, mut vis) = compose(surface(), &config);
    let mut target = Framebuffer::new(16, 8);

    driver.set_running(true).unwrap();
    let deadline = Instant::now() + Duration::from_millis(200);
    while Instant::now() < deadline {
        vis.wait_and_pump(&mut target, Duration::from_millis(20))
            .unwrap();
    }
    assert_eq!(driver.terminate().unwrap(), LoopExit::Terminated);
    drop(driver);

    // Drain whatever was posted before termination.
    while let PumpStatus::Rendered(n) = vis.pump(&mut target).unwrap() {
        if n == 0 {
            thread::yield_now();
        }
    }

    let rendered = vis.frames_rendered();
    assert!(rendered >= 5, "only {} frames rendered", rendered);
    assert_eq!(vis.last_frame(), Some(rendered));
    assert_eq!(vis.surface().hooks().updates, rendered);
}
