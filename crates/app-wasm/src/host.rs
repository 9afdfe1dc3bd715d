//! Per-frame pump between the UI bridge and an avatar's effect controls

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use holoavatar_config::{ConfigError, PreferenceStore, QualityLevel, QualityStore};
use holoavatar_hologram::{AvatarHandle, EffectParameters, FrameScheduler, HolographicControls};
use holoavatar_ipc::{AvatarToUi, UiToAvatar};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

use crate::bridge::{self, BridgeListener};
use crate::platform::{AnimationFrameScheduler, LocalStorageStore};

/// Owns the effect controls for one avatar and answers UI messages
pub struct AvatarHost<H, S = LocalStorageStore>
where
    H: AvatarHandle,
    S: PreferenceStore,
{
    controls: HolographicControls,
    avatar: H,
    store: Option<QualityStore<S>>,
    listener: Option<BridgeListener>,
}

impl<H: AvatarHandle + 'static> AvatarHost<H> {
    /// Host using `localStorage` and the persisted tier. The effect is not
    /// applied until [`AvatarHost::sync`].
    pub fn new(avatar: H) -> Result<Self, JsValue> {
        let store = match LocalStorageStore::new() {
            Ok(storage) => Some(QualityStore::new(storage)),
            Err(e) => {
                warn!("Quality storage unavailable: {}", e);
                None
            }
        };
        let level = store.as_ref().map(QualityStore::current).unwrap_or_default();
        let session = crate::session_for(level)?;
        let params = EffectParameters::from_quality(&level.settings().holographic);
        Ok(Self::from_parts(HolographicControls::new(session, params), avatar, store))
    }

    /// Listen for UI messages and drain them on every animation frame. The
    /// loop and the listener end when the returned host is dropped.
    pub fn start(mut self) -> Result<Rc<RefCell<Self>>, JsValue> {
        self.listener = Some(bridge::listen()?);
        let host = Rc::new(RefCell::new(self));
        let scheduler = Rc::new(AnimationFrameScheduler::new()?);
        schedule_pump(scheduler, Rc::downgrade(&host));
        Ok(host)
    }

    /// Reply to every queued message through the window bridge
    pub fn pump(&mut self) -> usize {
        self.drain(&mut |reply| {
            if let Err(e) = bridge::send_to_ui(reply) {
                warn!("Failed to send reply to UI: {:?}", e);
            }
        })
    }
}

impl<H: AvatarHandle, S: PreferenceStore> AvatarHost<H, S> {
    pub fn from_parts(
        controls: HolographicControls,
        avatar: H,
        store: Option<QualityStore<S>>,
    ) -> Self {
        Self {
            controls,
            avatar,
            store,
            listener: None,
        }
    }

    pub fn controls(&self) -> &HolographicControls {
        &self.controls
    }

    pub fn avatar(&self) -> &H {
        &self.avatar
    }

    /// Push the controls' state to the avatar, e.g. after it finished loading
    pub fn sync(&self) {
        self.controls.sync(&self.avatar);
    }

    /// Handle queued UI messages, handing each reply to `reply`. Quality
    /// choices are persisted; a failed save is reported as an error reply.
    pub fn drain(&mut self, reply: &mut dyn FnMut(&AvatarToUi)) -> usize {
        let mut handled = 0;
        while let Some(message) = bridge::poll_ui_message() {
            let chosen = match &message {
                UiToAvatar::SetQuality { level } => Some(*level),
                _ => None,
            };
            reply(&self.controls.handle_message(&self.avatar, message));
            if let Some(level) = chosen
                && let Err(e) = self.persist(level)
            {
                warn!("Failed to persist quality: {}", e);
                reply(&AvatarToUi::error("quality-not-saved", e));
            }
            handled += 1;
        }
        handled
    }

    fn persist(&mut self, level: QualityLevel) -> Result<(), ConfigError> {
        match self.store.as_mut() {
            Some(store) => store.save(level),
            None => Err(ConfigError::Unavailable("no preference storage".into())),
        }
    }
}

fn schedule_pump<H: AvatarHandle + 'static>(
    scheduler: Rc<AnimationFrameScheduler>,
    host: Weak<RefCell<AvatarHost<H>>>,
) {
    let next = Rc::clone(&scheduler);
    scheduler.request_frame(Box::new(move || {
        let Some(strong) = host.upgrade() else {
            debug!("Avatar host dropped, stopping UI pump");
            return;
        };
        // Skip a frame rather than re-enter a host that is mid-call
        if let Ok(mut host) = strong.try_borrow_mut() {
            host.pump();
        }
        drop(strong);
        schedule_pump(next, host);
    }));
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use holoavatar_config::MemoryPreferenceStore;
    use holoavatar_hologram::{EffectSession, FrameQueue, RenderBackend, RenderGraph};
    use holoavatar_ipc::Rgb;

    use super::*;
    use crate::bridge::enqueue;

    /// Avatar that has not loaded yet
    struct Unloaded;

    impl AvatarHandle for Unloaded {
        fn armature(&self) -> Option<&dyn RenderGraph> {
            None
        }
        fn renderer(&self) -> Option<&dyn RenderBackend> {
            None
        }
    }

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, ConfigError> {
            Ok(None)
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), ConfigError> {
            Err(ConfigError::Unavailable("quota exceeded".into()))
        }
    }

    fn host<S: PreferenceStore>(store: S) -> AvatarHost<Unloaded, S> {
        let session = EffectSession::new(Rc::new(FrameQueue::new()));
        let controls = HolographicControls::new(session, EffectParameters::default());
        AvatarHost::from_parts(controls, Unloaded, Some(QualityStore::new(store)))
    }

    fn drain_all<S: PreferenceStore>(host: &mut AvatarHost<Unloaded, S>) -> Vec<AvatarToUi> {
        let mut replies = Vec::new();
        host.drain(&mut |reply| replies.push(reply.clone()));
        replies
    }

    #[test]
    fn test_queue_is_drained_with_one_reply_each() {
        let mut host = host(MemoryPreferenceStore::new());
        let red = Rgb::new(255, 0, 0);
        enqueue(UiToAvatar::SetHolographicColor { color: red });
        enqueue(UiToAvatar::RequestState);

        let replies = drain_all(&mut host);
        assert_eq!(replies.len(), 2);
        assert_eq!(
            replies[1],
            AvatarToUi::HolographicChanged {
                active: false,
                color: red
            }
        );
        assert!(bridge::poll_ui_message().is_none());
    }

    #[test]
    fn test_quality_choice_is_persisted() {
        let mut host = host(MemoryPreferenceStore::new());
        enqueue(UiToAvatar::SetQuality {
            level: QualityLevel::Low,
        });

        let replies = drain_all(&mut host);
        assert_eq!(
            replies,
            vec![AvatarToUi::QualityChanged {
                level: QualityLevel::Low
            }]
        );
        let store = host.store.take().unwrap();
        assert_eq!(store.current(), QualityLevel::Low);
    }

    #[test]
    fn test_failed_save_is_reported_to_ui() {
        let mut host = host(BrokenStore);
        enqueue(UiToAvatar::SetQuality {
            level: QualityLevel::High,
        });

        let replies = drain_all(&mut host);
        assert_eq!(replies.len(), 2);
        assert!(matches!(
            &replies[1],
            AvatarToUi::Error { code, .. } if code == "quality-not-saved"
        ));
        assert_eq!(host.controls().quality(), Some(QualityLevel::High));
    }
}
