//! Material injection engine
//!
//! An [`EffectSession`] owns everything needed to put the holographic effect
//! on an avatar and take it off again:
//! - the set of patched materials
//! - the original hook, cache key and render flags of each
//! - the uniform cells shared by every compiled program
//! - the clock and the animation driver
//!
//! States run `Disabled -> Enabling -> Enabled -> Disabling -> Disabled`. The
//! two transient states reject re-entrant calls before any shared state is
//! borrowed.
//!
//! The session never loads avatars; callers pass an [`AvatarHandle`] per call.

mod inject;
mod restore;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use holoavatar_ipc::Rgb;

use crate::animation::{
    AnimationDriver, AnimationTarget, Clock, FrameScheduler, FrameStats, MonotonicClock,
};
use crate::error::HologramError;
use crate::events::{EffectEvent, EventListeners};
use crate::graph::{
    AvatarHandle, CacheKeyFn, CompileHook, Material, MaterialFlags, MaterialId, MaterialRef,
};
use crate::params::EffectParameters;
use crate::shader::HolographicUniforms;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectState {
    #[default]
    Disabled,
    Enabling,
    Enabled,
    Disabling,
}

impl EffectState {
    /// Mid-transition; enable and disable are rejected
    pub fn is_transient(self) -> bool {
        matches!(self, EffectState::Enabling | EffectState::Disabling)
    }
}

/// What a material looked like before its first injection
#[derive(Clone)]
pub struct OriginalMaterialState {
    pub on_before_compile: Option<CompileHook>,
    pub custom_program_cache_key: Option<CacheKeyFn>,
    pub flags: MaterialFlags,
}

impl OriginalMaterialState {
    pub fn capture(material: &Material) -> Self {
        Self {
            on_before_compile: material.on_before_compile.clone(),
            custom_program_cache_key: material.custom_program_cache_key.clone(),
            flags: material.flags(),
        }
    }
}

impl fmt::Debug for OriginalMaterialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OriginalMaterialState")
            .field("has_hook", &self.on_before_compile.is_some())
            .field("has_cache_key", &self.custom_program_cache_key.is_some())
            .field("flags", &self.flags)
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct SessionInner {
    pub(crate) current_color: Option<Rgb>,
    /// Parameters of the active injection
    pub(crate) params: Option<EffectParameters>,
    pub(crate) patched: Vec<MaterialRef>,
    pub(crate) original_state: HashMap<MaterialId, OriginalMaterialState>,
    pub(crate) uniforms: Option<HolographicUniforms>,
    /// Created on first enable, kept for the life of the session
    pub(crate) clock: Option<Rc<dyn Clock>>,
}

/// State the animation driver reads through a weak reference
pub(crate) struct SessionCore {
    pub(crate) state: Cell<EffectState>,
    pub(crate) inner: RefCell<SessionInner>,
}

impl AnimationTarget for SessionCore {
    fn is_running(&self) -> bool {
        self.state.get() == EffectState::Enabled
    }

    fn elapsed_seconds(&self) -> Option<f64> {
        let inner = self.inner.try_borrow().ok()?;
        inner.clock.as_ref().map(|clock| clock.elapsed_seconds())
    }

    fn write_time(&self, seconds: f32) -> FrameStats {
        let mut stats = FrameStats::default();
        let Ok(inner) = self.inner.try_borrow() else {
            return stats;
        };
        for material in &inner.patched {
            let Ok(material) = material.try_borrow() else {
                continue;
            };
            let compiled = material
                .user_data
                .holographic_shader
                .as_ref()
                .and_then(|slot| slot.uniforms());
            match compiled {
                Some(uniforms) => {
                    uniforms.set_time(seconds);
                    stats.updated += 1;
                }
                None => stats.compiling += 1,
            }
        }
        stats
    }
}

type ClockSource = Box<dyn Fn() -> Rc<dyn Clock>>;

/// The holographic effect on one avatar
pub struct EffectSession {
    pub(crate) core: Rc<SessionCore>,
    pub(crate) driver: AnimationDriver,
    clock_source: ClockSource,
    pub(crate) listeners: EventListeners,
}

impl fmt::Debug for EffectSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectSession")
            .field("state", &self.state())
            .field("patched", &self.patched_count())
            .field("driver", &self.driver)
            .finish()
    }
}

impl EffectSession {
    /// Session animated by `scheduler`, timed by a [`MonotonicClock`]
    pub fn new(scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self {
            core: Rc::new(SessionCore {
                state: Cell::new(EffectState::Disabled),
                inner: RefCell::new(SessionInner::default()),
            }),
            driver: AnimationDriver::new(scheduler),
            clock_source: Box::new(|| -> Rc<dyn Clock> { Rc::new(MonotonicClock::new()) }),
            listeners: EventListeners::default(),
        }
    }

    /// Build the session clock with `source` on first enable
    pub fn with_clock_source(mut self, source: impl Fn() -> Rc<dyn Clock> + 'static) -> Self {
        self.clock_source = Box::new(source);
        self
    }

    /// Use this clock instance
    pub fn with_clock(self, clock: Rc<dyn Clock>) -> Self {
        self.with_clock_source(move || Rc::clone(&clock))
    }

    pub fn with_frame_rate_limit(self, fps: Option<u32>) -> Self {
        self.set_frame_rate_limit(fps);
        self
    }

    pub fn set_frame_rate_limit(&self, fps: Option<u32>) {
        self.driver.set_frame_rate_limit(fps);
    }

    /// Register a listener for activation and color changes
    pub fn subscribe(&self, listener: impl Fn(&EffectEvent) + 'static) {
        self.listeners.subscribe(listener);
    }

    /// Apply (or, with `enabled == false`, remove) the effect. Problems are
    /// logged, never raised.
    pub fn apply_effect(&self, handle: &dyn AvatarHandle, params: &EffectParameters) {
        if let Err(e) = self.try_apply_effect(handle, params) {
            e.report("apply_effect");
        }
    }

    /// Restore every patched material. Problems are logged, never raised.
    pub fn disable_effect(&self, handle: &dyn AvatarHandle) {
        if let Err(e) = self.try_disable_effect(handle) {
            e.report("disable_effect");
        }
    }

    /// Push a new color into every injected program
    pub fn update_color(&self, color: Rgb) {
        if let Err(e) = self.try_update_color(color) {
            e.report("update_color");
        }
    }

    /// Push uniform-backed values of `params` into every injected program
    pub fn update_uniforms(&self, params: &EffectParameters) {
        if let Err(e) = self.try_update_uniforms(params) {
            e.report("update_uniforms");
        }
    }

    /// Enabled with at least one patched material
    pub fn is_effect_active(&self) -> bool {
        self.state() == EffectState::Enabled && self.patched_count() > 0
    }

    pub fn state(&self) -> EffectState {
        self.core.state.get()
    }

    pub fn patched_count(&self) -> usize {
        self.core
            .inner
            .try_borrow()
            .map(|inner| inner.patched.len())
            .unwrap_or(0)
    }

    /// Handles to the patched materials
    pub fn patched_materials(&self) -> Vec<MaterialRef> {
        self.core
            .inner
            .try_borrow()
            .map(|inner| inner.patched.clone())
            .unwrap_or_default()
    }

    /// Number of materials with a captured original state
    pub fn original_state_len(&self) -> usize {
        self.core
            .inner
            .try_borrow()
            .map(|inner| inner.original_state.len())
            .unwrap_or(0)
    }

    /// Color most recently applied, if any
    pub fn current_color(&self) -> Option<Rgb> {
        self.core.inner.try_borrow().ok().and_then(|inner| inner.current_color)
    }

    /// Parameters of the active injection
    pub fn active_params(&self) -> Option<EffectParameters> {
        self.core
            .inner
            .try_borrow()
            .ok()
            .and_then(|inner| inner.params.clone())
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.driver.stats()
    }

    /// Last time value written to the programs
    pub fn last_frame_time(&self) -> f64 {
        self.driver.last_time()
    }

    pub fn is_animating(&self) -> bool {
        self.driver.is_running()
    }

    pub(crate) fn guard(&self, operation: &'static str) -> Result<(), HologramError> {
        let state = self.state();
        if state.is_transient() {
            return Err(HologramError::Reentrant { operation, state });
        }
        Ok(())
    }

    /// Session clock, created on first use
    pub(crate) fn ensure_clock(&self, inner: &mut SessionInner) {
        if inner.clock.is_none() {
            let clock = (self.clock_source)();
            clock.start();
            inner.clock = Some(clock);
        }
    }

    pub(crate) fn start_animation(&self) {
        let target: Weak<SessionCore> = Rc::downgrade(&self.core);
        self.driver.start(target);
    }

    pub(crate) fn emit(&self, event: EffectEvent) {
        self.listeners.emit(&event);
    }
}
