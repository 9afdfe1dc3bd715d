//! Browser implementations of the platform seams: capability signals,
//! preference storage, clock and frame scheduling.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use holoavatar_config::{ConfigError, PlatformSignals, PreferenceStore};
use holoavatar_hologram::animation::FrameCallback;
use holoavatar_hologram::{Clock, FrameHandle, FrameScheduler};
use tracing::warn;
use wasm_bindgen::prelude::*;

/// Read capability signals from `navigator` and `window`. Missing values
/// stay `None` and are defaulted by detection.
pub fn platform_signals() -> PlatformSignals {
    let Some(window) = web_sys::window() else {
        return PlatformSignals::default();
    };
    let navigator = window.navigator();

    // Chromium-only, absent from the typed bindings
    let device_memory_gb = js_sys::Reflect::get(&navigator, &JsValue::from_str("deviceMemory"))
        .ok()
        .and_then(|value| value.as_f64())
        .map(|gb| gb as f32);

    let cores = navigator.hardware_concurrency();
    PlatformSignals {
        user_agent: navigator.user_agent().ok(),
        hardware_concurrency: (cores >= 1.0).then_some(cores as u32),
        device_memory_gb,
        device_pixel_ratio: Some(window.device_pixel_ratio() as f32),
    }
}

fn js_error(context: &str, err: JsValue) -> ConfigError {
    ConfigError::Unavailable(format!("{}: {:?}", context, err))
}

/// Preferences in `window.localStorage`
#[derive(Debug, Clone)]
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    pub fn new() -> Result<Self, ConfigError> {
        let window =
            web_sys::window().ok_or_else(|| ConfigError::Unavailable("no global window".into()))?;
        let storage = window
            .local_storage()
            .map_err(|e| js_error("localStorage blocked", e))?
            .ok_or_else(|| ConfigError::Unavailable("localStorage missing".into()))?;
        Ok(Self { storage })
    }
}

impl PreferenceStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.storage
            .get_item(key)
            .map_err(|e| js_error("localStorage read failed", e))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| js_error("localStorage write failed", e))
    }
}

/// Clock on `performance.now()`
#[derive(Debug, Default)]
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
    started_ms: Cell<Option<f64>>,
}

impl PerformanceClock {
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
            started_ms: Cell::new(None),
        }
    }

    fn now_ms(&self) -> Option<f64> {
        self.performance.as_ref().map(|p| p.now())
    }
}

impl Clock for PerformanceClock {
    fn start(&self) {
        if self.started_ms.get().is_none() {
            self.started_ms.set(self.now_ms());
        }
    }

    fn elapsed_seconds(&self) -> f64 {
        self.start();
        match (self.started_ms.get(), self.now_ms()) {
            (Some(start), Some(now)) => ((now - start) / 1000.0).max(0.0),
            _ => 0.0,
        }
    }
}

type CallbackSlot = RefCell<Option<FrameCallback>>;

/// Frame scheduler on `requestAnimationFrame`
#[derive(Debug)]
pub struct AnimationFrameScheduler {
    window: web_sys::Window,
    /// Callbacks still waiting for their frame, for cancellation
    pending: RefCell<HashMap<i32, Weak<CallbackSlot>>>,
}

impl AnimationFrameScheduler {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        Ok(Self {
            window,
            pending: RefCell::new(HashMap::new()),
        })
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let slot = Rc::new(RefCell::new(Some(callback)));
        let run = Rc::clone(&slot);
        let closure = Closure::once_into_js(move || {
            let callback = run.borrow_mut().take();
            if let Some(callback) = callback {
                callback();
            }
        });

        let mut pending = self.pending.borrow_mut();
        pending.retain(|_, slot| slot.strong_count() > 0);
        match self.window.request_animation_frame(closure.unchecked_ref()) {
            Ok(id) => {
                pending.insert(id, Rc::downgrade(&slot));
                FrameHandle(id as u64)
            }
            Err(e) => {
                warn!("requestAnimationFrame failed: {:?}", e);
                FrameHandle(u64::MAX)
            }
        }
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let Ok(id) = i32::try_from(handle.0) else {
            return;
        };
        if let Err(e) = self.window.cancel_animation_frame(id) {
            warn!("cancelAnimationFrame failed: {:?}", e);
        }
        // Drop the Rust side now; the JS closure never runs
        if let Some(slot) = self.pending.borrow_mut().remove(&id).and_then(|w| w.upgrade()) {
            slot.borrow_mut().take();
        }
    }
}
