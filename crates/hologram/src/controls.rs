//! UI-facing holographic toggle and color picker
//!
//! Holds the user's chosen parameters independently of the session, so a
//! color picked while the effect is off is used the next time it turns on.

use holoavatar_config::{QualityLevel, QualitySettings};
use holoavatar_ipc::{AvatarToUi, Rgb, UiToAvatar};
use tracing::debug;

use crate::graph::AvatarHandle;
use crate::params::EffectParameters;
use crate::session::EffectSession;

#[derive(Debug)]
pub struct HolographicControls {
    session: EffectSession,
    params: EffectParameters,
    quality: Option<QualityLevel>,
}

impl HolographicControls {
    pub fn new(session: EffectSession, params: EffectParameters) -> Self {
        Self {
            session,
            params,
            quality: None,
        }
    }

    pub fn session(&self) -> &EffectSession {
        &self.session
    }

    pub fn params(&self) -> &EffectParameters {
        &self.params
    }

    pub fn is_enabled(&self) -> bool {
        self.params.enabled
    }

    pub fn color(&self) -> Rgb {
        self.params.color
    }

    pub fn quality(&self) -> Option<QualityLevel> {
        self.quality
    }

    /// Push the chosen parameters to the session (for instance once the avatar
    /// finishes loading)
    pub fn sync(&self, handle: &dyn AvatarHandle) {
        if self.params.enabled {
            self.session.apply_effect(handle, &self.params);
        } else if self.session.patched_count() > 0 {
            self.session.disable_effect(handle);
        }
    }

    /// Flip the effect. Ignored while the session is mid-transition.
    /// Returns whether the effect is now wanted.
    pub fn toggle(&mut self, handle: &dyn AvatarHandle) -> bool {
        if self.session.state().is_transient() {
            debug!("Toggle ignored while the effect is {:?}", self.session.state());
            return self.params.enabled;
        }
        self.set_enabled(handle, !self.params.enabled);
        self.params.enabled
    }

    pub fn set_enabled(&mut self, handle: &dyn AvatarHandle, enabled: bool) {
        self.params.enabled = enabled;
        self.sync(handle);
    }

    /// Update live when the effect is on; otherwise remember for later
    pub fn set_color(&mut self, handle: &dyn AvatarHandle, color: Rgb) {
        self.params.color = color;
        if !self.params.enabled {
            return;
        }
        if self.session.is_effect_active() {
            self.session.update_color(color);
        } else {
            self.session.apply_effect(handle, &self.params);
        }
    }

    /// Re-derive the effect from a quality tier and cap the frame rate to it
    pub fn set_quality(&mut self, handle: &dyn AvatarHandle, settings: &QualitySettings) {
        self.params = self.params.clone().with_quality(&settings.holographic);
        self.session.set_frame_rate_limit(Some(settings.target_fps));
        self.sync(handle);
    }

    pub fn set_quality_level(&mut self, handle: &dyn AvatarHandle, level: QualityLevel) {
        self.quality = Some(level);
        self.set_quality(handle, &level.settings());
    }

    /// Current state as a UI message
    pub fn status(&self) -> AvatarToUi {
        AvatarToUi::HolographicChanged {
            active: self.session.is_effect_active(),
            color: self.params.color,
        }
    }

    /// Apply a UI message and produce the reply
    pub fn handle_message(&mut self, handle: &dyn AvatarHandle, message: UiToAvatar) -> AvatarToUi {
        match message {
            UiToAvatar::ToggleHolographic => {
                self.toggle(handle);
                self.status()
            }
            UiToAvatar::SetHolographicColor { color } => {
                self.set_color(handle, color);
                self.status()
            }
            UiToAvatar::SetQuality { level } => {
                self.set_quality_level(handle, level);
                AvatarToUi::QualityChanged { level }
            }
            UiToAvatar::RequestState => self.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::animation::FrameQueue;
    use crate::test_support::TestAvatar;

    fn controls() -> (HolographicControls, TestAvatar) {
        let session = EffectSession::new(Rc::new(FrameQueue::new()));
        let avatar = TestAvatar::with_meshes(&[("Head", "head_mat"), ("Body", "body_mat")]);
        (HolographicControls::new(session, EffectParameters::default()), avatar)
    }

    #[test]
    fn test_toggle_round_trip() {
        let (mut controls, avatar) = controls();
        controls.sync(&avatar);
        assert!(controls.session().is_effect_active());

        assert!(!controls.toggle(&avatar));
        assert!(!controls.session().is_effect_active());
        assert!(avatar.material(0).borrow().on_before_compile.is_none());

        assert!(controls.toggle(&avatar));
        assert!(controls.session().is_effect_active());
    }

    #[test]
    fn test_color_while_disabled_is_remembered() {
        let (mut controls, avatar) = controls();
        controls.set_enabled(&avatar, false);

        let pink = Rgb::new(255, 105, 180);
        controls.set_color(&avatar, pink);
        assert_eq!(controls.session().patched_count(), 0);

        controls.toggle(&avatar);
        assert_eq!(controls.session().current_color(), Some(pink));
    }

    #[test]
    fn test_color_while_enabled_updates_live() {
        let (mut controls, avatar) = controls();
        controls.sync(&avatar);
        let key = avatar.material(1).borrow().cache_key();

        controls.set_color(&avatar, Rgb::new(10, 20, 30));
        assert_eq!(avatar.material(1).borrow().cache_key(), key);
        assert_eq!(controls.session().current_color(), Some(Rgb::new(10, 20, 30)));
    }

    #[test]
    fn test_quality_without_glitch_reinjects() {
        let (mut controls, avatar) = controls();
        controls.sync(&avatar);
        let key = avatar.material(0).borrow().cache_key();

        controls.set_quality_level(&avatar, QualityLevel::UltraLow);
        assert!(!controls.params().glitch_enabled);
        assert_ne!(avatar.material(0).borrow().cache_key(), key);
        assert_eq!(controls.quality(), Some(QualityLevel::UltraLow));
        assert!(controls.session().is_effect_active());
    }

    #[test]
    fn test_messages() {
        let (mut controls, avatar) = controls();
        controls.sync(&avatar);

        let reply = controls.handle_message(&avatar, UiToAvatar::ToggleHolographic);
        assert_eq!(
            reply,
            AvatarToUi::HolographicChanged {
                active: false,
                color: Rgb::HOLOGRAM_BLUE
            }
        );

        let reply = controls.handle_message(
            &avatar,
            UiToAvatar::SetQuality {
                level: QualityLevel::High,
            },
        );
        assert_eq!(reply, AvatarToUi::QualityChanged { level: QualityLevel::High });
        // Quality changes do not re-enable a disabled effect
        assert!(!controls.session().is_effect_active());

        let reply = controls.handle_message(&avatar, UiToAvatar::RequestState);
        assert!(matches!(reply, AvatarToUi::HolographicChanged { active: false, .. }));
    }
}
