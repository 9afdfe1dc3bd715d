//! Animation driver
//!
//! Keeps `uTime` moving on every compiled holographic program. The driver
//! runs off a host per-frame primitive ([`FrameScheduler`]) and re-registers
//! itself each frame until its target stops running.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

use tracing::debug;

/// Seconds of clock time between compile-progress log lines
const COMPILE_LOG_INTERVAL_SECS: f64 = 5.0;

/// Share of the frame interval that counts as a full frame; host frame
/// deltas jitter around the display period
const FRAME_INTERVAL_TOLERANCE: f64 = 0.9;

/// Caps at or above this rate match common displays and are not enforced
pub const UNTHROTTLED_FPS: u32 = 60;

/// Continuous time source for the effect
pub trait Clock {
    /// Begin counting. Calling again on a running clock has no effect.
    fn start(&self);
    /// Seconds since `start`; starts the clock if needed
    fn elapsed_seconds(&self) -> f64;
}

/// Wall-clock time from [`Instant`]
#[derive(Debug, Default)]
pub struct MonotonicClock {
    started: Cell<Option<Instant>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn start(&self) {
        if self.started.get().is_none() {
            self.started.set(Some(Instant::now()));
        }
    }

    fn elapsed_seconds(&self) -> f64 {
        self.start();
        self.started
            .get()
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Clock advanced by hand, for hosts with their own notion of time
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }
}

impl Clock for ManualClock {
    fn start(&self) {}

    fn elapsed_seconds(&self) -> f64 {
        self.now.get()
    }
}

pub type FrameCallback = Box<dyn FnOnce()>;

/// Registration returned by [`FrameScheduler::request_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host per-frame callback primitive (`requestAnimationFrame` and kin)
pub trait FrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Frame scheduler pumped by its owner, once per rendered frame.
///
/// Callbacks requested while a frame runs are queued for the next one.
#[derive(Default)]
pub struct FrameQueue {
    next_id: Cell<u64>,
    pending: RefCell<Vec<(FrameHandle, FrameCallback)>>,
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.pending_len())
            .finish()
    }
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback queued before this call. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        let count = batch.len();
        for (_, callback) in batch {
            callback();
        }
        count
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let handle = FrameHandle(self.next_id.get());
        self.next_id.set(handle.0 + 1);
        self.pending.borrow_mut().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.pending.borrow_mut().retain(|(h, _)| *h != handle);
    }
}

/// Per-frame diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Materials whose time uniform was written
    pub updated: usize,
    /// Patched materials still waiting for their program
    pub compiling: usize,
}

/// What the driver animates
pub trait AnimationTarget {
    fn is_running(&self) -> bool;
    fn elapsed_seconds(&self) -> Option<f64>;
    fn write_time(&self, seconds: f32) -> FrameStats;
}

struct DriverShared {
    scheduler: Rc<dyn FrameScheduler>,
    handle: Cell<Option<FrameHandle>>,
    generation: Cell<u64>,
    min_interval: Cell<Option<f64>>,
    last_elapsed: Cell<f64>,
    last_write: Cell<Option<f64>>,
    last_compile_log: Cell<Option<f64>>,
    stats: Cell<FrameStats>,
}

/// Self-rescheduling frame loop writing elapsed time into a target
pub struct AnimationDriver {
    shared: Rc<DriverShared>,
}

impl std::fmt::Debug for AnimationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationDriver")
            .field("running", &self.is_running())
            .field("last_time", &self.last_time())
            .field("stats", &self.stats())
            .finish()
    }
}

impl AnimationDriver {
    pub fn new(scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self {
            shared: Rc::new(DriverShared {
                scheduler,
                handle: Cell::new(None),
                generation: Cell::new(0),
                min_interval: Cell::new(None),
                last_elapsed: Cell::new(0.0),
                last_write: Cell::new(None),
                last_compile_log: Cell::new(None),
                stats: Cell::new(FrameStats::default()),
            }),
        }
    }

    /// Cap time writes at `fps` per second. `None`, 0, or a rate of at least
    /// [`UNTHROTTLED_FPS`] writes every frame.
    pub fn set_frame_rate_limit(&self, fps: Option<u32>) {
        let interval = fps
            .filter(|&f| f > 0 && f < UNTHROTTLED_FPS)
            .map(|f| 1.0 / f64::from(f));
        self.shared.min_interval.set(interval);
    }

    /// (Re)start the loop. Any previous loop is cancelled first, and the first
    /// frame runs immediately.
    pub fn start(&self, target: Weak<dyn AnimationTarget>) {
        self.stop();
        self.shared.last_write.set(None);
        let generation = self.shared.generation.get();
        tick(&self.shared, target, generation);
    }

    pub fn stop(&self) {
        let shared = &self.shared;
        shared.generation.set(shared.generation.get() + 1);
        if let Some(handle) = shared.handle.take() {
            shared.scheduler.cancel_frame(handle);
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.handle.get().is_some()
    }

    /// Last time value handed to the target
    pub fn last_time(&self) -> f64 {
        self.shared.last_elapsed.get()
    }

    pub fn stats(&self) -> FrameStats {
        self.shared.stats.get()
    }
}

impl Drop for AnimationDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn tick(shared: &Rc<DriverShared>, target: Weak<dyn AnimationTarget>, generation: u64) {
    if shared.generation.get() != generation {
        return;
    }
    shared.handle.set(None);

    let Some(strong) = target.upgrade() else {
        debug!("Animation target dropped, stopping loop");
        return;
    };
    if !strong.is_running() {
        debug!("Holographic effect inactive, stopping animation loop");
        return;
    }

    if let Some(elapsed) = strong.elapsed_seconds() {
        let now = elapsed.max(shared.last_elapsed.get());
        shared.last_elapsed.set(now);

        let due = match (shared.min_interval.get(), shared.last_write.get()) {
            (Some(interval), Some(last)) => now - last >= interval * FRAME_INTERVAL_TOLERANCE,
            _ => true,
        };
        if due {
            let stats = strong.write_time(now as f32);
            shared.last_write.set(Some(now));
            shared.stats.set(stats);

            if stats.compiling > 0 {
                let should_log = shared
                    .last_compile_log
                    .get()
                    .is_none_or(|last| now - last >= COMPILE_LOG_INTERVAL_SECS);
                if should_log {
                    shared.last_compile_log.set(Some(now));
                    debug!(
                        "Waiting on {} holographic program(s), {} animating",
                        stats.compiling, stats.updated
                    );
                }
            }
        }
    }
    drop(strong);

    let next = Rc::clone(shared);
    let handle = shared
        .scheduler
        .request_frame(Box::new(move || tick(&next, target, generation)));
    shared.handle.set(Some(handle));
}
