// src/lib.rs

//! `frame-canvas`: an animation clock thread and a double-buffered rendering
//! surface for small desktop visualizations.
//!
//! - `animation`: `AnimationDriver` delivering frame ticks with
//!   pause/resume/terminate
//! - `surface`: `BufferedSurface` compositing a cached steady layer with a
//!   per-frame dynamic layer, recovering from lost platform buffers
//! - `visualization`: glue turning ticks into repaint requests on the
//!   rendering thread

pub mod animation;
pub mod config;
pub mod demo;
pub mod surface;
pub mod visualization;

pub use animation::{AnimationDriver, AnimationError, AnimationState, FrameListener, LoopExit};
pub use surface::{BufferedSurface, Framebuffer, RenderHooks};
pub use visualization::{compose, PumpStatus, Visualization};
