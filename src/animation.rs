// src/animation.rs

//! Animation driver: a dedicated clock thread that delivers frame ticks.
//!
//! The `AnimationDriver` owns exactly one background thread. While running it
//! sleeps roughly one frame period between ticks; while stopped it parks on a
//! condition variable until resumed. Pause/resume never stops the thread, only
//! frame delivery. `terminate()` is the only way to end the thread and it
//! blocks until the thread has exited.
//!
//! ## Threading Model
//! - The owner calls `set_running`, `set_frame_rate`, `interrupt`, `terminate`
//!   from any thread.
//! - The driver thread only calls the `FrameListener`. It never touches
//!   rendering resources; the listener is expected to post a repaint request.
//! - State checks and waits happen under one `Mutex`/`Condvar` pair, so a
//!   resume can never slip between the driver's "am I running?" check and
//!   its wait.

use crate::config::AnimationConfig;
use log::*;
use std::any::Any;
use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use thiserror::Error;


/// Frame rate used when none is configured.
pub const DEFAULT_FRAME_RATE: u32 = 50;

/// Callback invoked once per animation tick on the driver thread.
///
/// Implementations must not block indefinitely. Asynchronous work started
/// here surfaces on a later tick.
pub trait FrameListener: Send {
    fn on_frame(&mut self);
}

impl<F> FrameListener for F
where
    F: FnMut() + Send,
{
    fn on_frame(&mut self) {
        self()
    }
}

/// Observer of running/paused transitions. Receives the new running flag.
pub type StateListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle returned by [`AnimationDriver::add_state_listener`], used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Externally visible state of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Stopped,
    Running,
    /// Absorbing. Reached via `terminate()` or an abnormal loop exit.
    Terminated,
}

/// How the driver thread left its loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The loop observed `terminate()` and returned normally.
    Terminated,
    /// The frame listener panicked; carries the panic message.
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("Failed to spawn animation thread: {0}")]
    SpawnFailed(#[source] std::io::Error),
    #[error("terminate() called on the animation thread itself; it cannot join itself")]
    JoinFromDriverThread,
}

/// State shared by the owner and the driver thread, guarded by `Shared::control`.
struct Control {
    running: bool,
    terminated: bool,
    frame_rate: u32,
    interrupt_pending: bool,
    interruptions: u64,
    driver_thread: Option<ThreadId>,
    exit: Option<LoopExit>,
    /// Sequence number of the latest running/paused transition.
    transition_seq: u64,
    /// Highest transition whose state listeners have all returned.
    delivered_seq: u64,
    /// Transitions awaiting delivery, in transition order.
    pending_events: VecDeque<(u64, bool)>,
    /// Thread currently draining `pending_events`.
    dispatcher: Option<ThreadId>,
}

struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
    /// Signalled whenever `delivered_seq` advances or the dispatcher leaves.
    delivered: Condvar,
}

enum Worker {
    /// Thread not spawned yet; the listener waits here until the first resume.
    Pending(Box<dyn FrameListener>),
    Spawned(JoinHandle<()>),
    Joined,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(ListenerId, StateListener)>,
}

/// What the driver thread should do after a suspension.
enum Wake {
    Frame,
    Interrupted,
    Terminate,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Period slept between ticks: `floor(999 / frame_rate)` milliseconds.
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_millis(u64::from(999 / frame_rate.max(1)))
}

pub struct AnimationDriver {
    shared: Arc<Shared>,
    worker: Mutex<Worker>,
    listeners: Mutex<ListenerRegistry>,
    thread_name: String,
}

impl AnimationDriver {
    /// Creates a stopped driver at [`DEFAULT_FRAME_RATE`].
    ///
    /// The background thread is spawned on the first `set_running(true)`.
    pub fn new<L: FrameListener + 'static>(listener: L) -> Self {
        Self::from_config(listener, &AnimationConfig::default())
    }

    /// Creates a stopped driver with an initial frame rate.
    pub fn with_frame_rate<L: FrameListener + 'static>(listener: L, frame_rate: i32) -> Self {
        let driver = Self::new(listener);
        driver.set_frame_rate(frame_rate);
        driver
    }

    pub fn from_config<L: FrameListener + 'static>(listener: L, config: &AnimationConfig) -> Self {
        let driver = Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    running: false,
                    terminated: false,
                    frame_rate: DEFAULT_FRAME_RATE,
                    interrupt_pending: false,
                    interruptions: 0,
                    driver_thread: None,
                    exit: None,
                    transition_seq: 0,
                    delivered_seq: 0,
                    pending_events: VecDeque::new(),
                    dispatcher: None,
                }),
                wake: Condvar::new(),
                delivered: Condvar::new(),
            }),
            worker: Mutex::new(Worker::Pending(Box::new(listener))),
            listeners: Mutex::new(ListenerRegistry::default()),
            thread_name: config.thread_name.clone(),
        };
        driver.set_frame_rate(config.frame_rate);
        driver
    }

    /// Frame rate in frames per second.
    pub fn frame_rate(&self) -> u32 {
        lock(&self.shared.control).frame_rate
    }

    /// Sets the frame rate. Values below 1 are clamped to 1.
    ///
    /// Takes effect on the driver's next sleep.
    pub fn set_frame_rate(&self, frame_rate: i32) {
        let clamped = frame_rate.max(1) as u32;
        if i64::from(clamped) != i64::from(frame_rate) {
            debug!("AnimationDriver: frame rate {} clamped to {}", frame_rate, clamped);
        }
        lock(&self.shared.control).frame_rate = clamped;
    }

    /// Current sleep between ticks.
    pub fn frame_period(&self) -> Duration {
        frame_period(self.frame_rate())
    }

    pub fn state(&self) -> AnimationState {
        let ctl = lock(&self.shared.control);
        if ctl.terminated || ctl.exit.is_some() {
            AnimationState::Terminated
        } else if ctl.running {
            AnimationState::Running
        } else {
            AnimationState::Stopped
        }
    }

    /// True while frames are being delivered.
    pub fn is_running(&self) -> bool {
        self.state() == AnimationState::Running
    }

    /// Whether the background thread has been spawned.
    pub fn is_started(&self) -> bool {
        lock(&self.shared.control).driver_thread.is_some()
    }

    /// Number of interruptions the loop has absorbed.
    pub fn interruptions(&self) -> u64 {
        lock(&self.shared.control).interruptions
    }

    /// Registers a state listener. Listeners are called in registration order.
    pub fn add_state_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.listeners);
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push((id, Arc::new(listener)));
        id
    }

    /// Removes a state listener. Returns false if it was not registered.
    pub fn remove_state_listener(&self, id: ListenerId) -> bool {
        let mut registry = lock(&self.listeners);
        let before = registry.entries.len();
        registry.entries.retain(|(entry_id, _)| *entry_id != id);
        registry.entries.len() != before
    }

    /// Starts, pauses or resumes the animation.
    ///
    /// A real transition notifies every state listener before returning, in
    /// the order transitions happened, also when several threads race. A call
    /// made from inside a state listener is delivered right after the current
    /// notification instead.
    ///
    /// Setting the current state again is a no-op, as is any call after
    /// termination.
    pub fn set_running(&self, running: bool) -> Result<(), AnimationError> {
        if lock(&self.shared.control).terminated {
            debug!("AnimationDriver: set_running({}) ignored, driver terminated", running);
            return Ok(());
        }
        self.transition(running)
    }

    fn transition(&self, running: bool) -> Result<(), AnimationError> {
        let seq = {
            let mut ctl = lock(&self.shared.control);
            if ctl.running == running {
                return Ok(());
            }
            if running {
                if ctl.driver_thread.is_none() {
                    self.spawn_worker(&mut ctl)?;
                }
                ctl.running = true;
                self.shared.wake.notify_all();
            } else {
                ctl.running = false;
            }
            // Queued under the same lock as the flip, so delivery order
            // matches transition order.
            ctl.transition_seq += 1;
            let seq = ctl.transition_seq;
            ctl.pending_events.push_back((seq, running));
            seq
        };
        debug!("AnimationDriver: running = {}", running);
        self.dispatch_state_events(seq);
        Ok(())
    }

    /// Delivers queued transitions in order and returns once `seq` is delivered.
    ///
    /// One caller at a time drains the queue. Other threads wait for their
    /// transition to be delivered; a call made from inside a listener only
    /// enqueues and the outer dispatcher delivers it after the current one.
    fn dispatch_state_events(&self, seq: u64) {
        let me = thread::current().id();
        let mut ctl = lock(&self.shared.control);
        loop {
            if ctl.delivered_seq >= seq {
                return;
            }
            match ctl.dispatcher {
                None => break,
                Some(id) if id == me => return,
                Some(_) => {
                    ctl = self
                        .shared
                        .delivered
                        .wait(ctl)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }

        ctl.dispatcher = Some(me);
        let _guard = DispatchGuard {
            shared: &*self.shared,
        };
        while let Some((event_seq, running)) = ctl.pending_events.pop_front() {
            drop(ctl);
            self.notify_state_listeners(running);
            ctl = lock(&self.shared.control);
            ctl.delivered_seq = event_seq;
            self.shared.delivered.notify_all();
        }
        drop(ctl);
    }

    fn spawn_worker(&self, ctl: &mut Control) -> Result<(), AnimationError> {
        let mut worker = lock(&self.worker);
        let listener = match mem::replace(&mut *worker, Worker::Joined) {
            Worker::Pending(listener) => listener,
            other => {
                *worker = other;
                return Ok(());
            }
        };
        let shared = Arc::clone(&self.shared);
        match thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run_tick_loop(shared, listener))
        {
            Ok(handle) => {
                ctl.driver_thread = Some(handle.thread().id());
                *worker = Worker::Spawned(handle);
                info!("AnimationDriver: thread '{}' spawned", self.thread_name);
                Ok(())
            }
            Err(e) => {
                error!("AnimationDriver: failed to spawn thread: {}", e);
                ctl.terminated = true;
                Err(AnimationError::SpawnFailed(e))
            }
        }
    }

    fn notify_state_listeners(&self, running: bool) {
        // Snapshot so listeners may add/remove listeners or call back into the driver.
        let snapshot: Vec<StateListener> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(running);
        }
    }

    /// Cuts the driver's current sleep or wait short without terminating it.
    ///
    /// The interrupted suspension delivers no tick; the loop re-evaluates its
    /// state and carries on. Each absorbed interruption is counted.
    pub fn interrupt(&self) {
        let mut ctl = lock(&self.shared.control);
        if ctl.driver_thread.is_none() || ctl.terminated {
            return;
        }
        ctl.interrupt_pending = true;
        self.shared.wake.notify_all();
    }

    /// Ends the animation and blocks until the driver thread has exited.
    ///
    /// A stopped driver is switched to running first (which notifies the
    /// state listeners) so a parked or never-spawned thread observes the
    /// termination. Calling this again returns the recorded exit promptly.
    pub fn terminate(&self) -> Result<LoopExit, AnimationError> {
        let was_stopped = {
            let mut ctl = lock(&self.shared.control);
            ctl.terminated = true;
            self.shared.wake.notify_all();
            if ctl.driver_thread.is_some() && ctl.driver_thread == Some(thread::current().id()) {
                return Err(AnimationError::JoinFromDriverThread);
            }
            !ctl.running
        };
        if was_stopped {
            self.transition(true)?;
        }
        self.join()
    }

    fn join(&self) -> Result<LoopExit, AnimationError> {
        // The worker lock is held across the join so a concurrent second
        // caller also waits for the thread to exit.
        let mut worker = lock(&self.worker);
        let exit = match mem::replace(&mut *worker, Worker::Joined) {
            Worker::Spawned(handle) => match handle.join() {
                Ok(()) => self.recorded_exit(),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("AnimationDriver: thread panicked: {}", message);
                    let exit = LoopExit::Panicked(message);
                    lock(&self.shared.control).exit = Some(exit.clone());
                    exit
                }
            },
            Worker::Pending(_) | Worker::Joined => self.recorded_exit(),
        };
        Ok(exit)
    }

    fn recorded_exit(&self) -> LoopExit {
        lock(&self.shared.control)
            .exit
            .clone()
            .unwrap_or(LoopExit::Terminated)
    }
}

impl std::fmt::Debug for AnimationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ctl = lock(&self.shared.control);
        f.debug_struct("AnimationDriver")
            .field("running", &ctl.running)
            .field("terminated", &ctl.terminated)
            .field("frame_rate", &ctl.frame_rate)
            .field("started", &ctl.driver_thread.is_some())
            .finish()
    }
}

impl Drop for AnimationDriver {
    fn drop(&mut self) {
        debug!("AnimationDriver dropped");
        let never_spawned = matches!(*lock(&self.worker), Worker::Pending(_));
        if never_spawned {
            lock(&self.shared.control).terminated = true;
            return;
        }
        if let Err(e) = self.terminate() {
            error!("AnimationDriver: terminate on drop failed: {}", e);
        }
    }
}

/// Releases the dispatcher role, also when a state listener panics.
struct DispatchGuard<'a> {
    shared: &'a Shared,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut ctl = lock(&self.shared.control);
        ctl.dispatcher = None;
        self.shared.delivered.notify_all();
    }
}

/// Records how the driver thread left, including unwinding out of a listener.
struct ExitGuard<'a> {
    shared: &'a Shared,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        let mut ctl = lock(&self.shared.control);
        ctl.terminated = true;
        if ctl.exit.is_none() {
            ctl.exit = Some(if thread::panicking() {
                LoopExit::Panicked("frame listener panicked".to_string())
            } else {
                LoopExit::Terminated
            });
        }
    }
}

fn run_tick_loop(shared: Arc<Shared>, mut listener: Box<dyn FrameListener>) {
    let _guard = ExitGuard { shared: &shared };
    info!("AnimationDriver: tick loop started");
    let mut ticks: u64 = 0;
    loop {
        match wait_for_next_frame(&shared) {
            Wake::Frame => {
                listener.on_frame();
                ticks += 1;
            }
            Wake::Interrupted => continue,
            Wake::Terminate => break,
        }
    }
    debug!("AnimationDriver: tick loop exiting after {} ticks", ticks);
}

fn wait_for_next_frame(shared: &Shared) -> Wake {
    let mut ctl = lock(&shared.control);
    if ctl.terminated {
        return Wake::Terminate;
    }
    if ctl.running {
        let deadline = Instant::now() + frame_period(ctl.frame_rate);
        while !ctl.terminated && !ctl.interrupt_pending {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            ctl = shared
                .wake
                .wait_timeout(ctl, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    } else {
        while !ctl.running && !ctl.terminated && !ctl.interrupt_pending {
            trace!("AnimationDriver: parked");
            ctl = shared.wake.wait(ctl).unwrap_or_else(PoisonError::into_inner);
        }
    }

    if ctl.terminated {
        Wake::Terminate
    } else if ctl.interrupt_pending {
        ctl.interrupt_pending = false;
        ctl.interruptions += 1;
        warn!(
            "AnimationDriver: suspension interrupted ({} so far), continuing",
            ctl.interruptions
        );
        Wake::Interrupted
    } else {
        Wake::Frame
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "frame listener panicked".to_string()
    }
}
