//! Disable path: put every patched material back exactly as it was

use std::mem;

use tracing::{debug, info, warn};

use crate::error::HologramError;
use crate::events::EffectEvent;
use crate::graph::{AvatarHandle, MaterialId, RenderBackend};

use super::{EffectSession, EffectState};

impl EffectSession {
    /// Remove the effect. `RestoreSkipped` when nothing is patched.
    pub fn try_disable_effect(&self, handle: &dyn AvatarHandle) -> Result<(), HologramError> {
        self.guard("disable_effect")?;

        let nothing_patched = self
            .core
            .inner
            .try_borrow()
            .map(|inner| inner.patched.is_empty())
            .unwrap_or(false);
        if nothing_patched {
            self.driver.stop();
            self.core.state.set(EffectState::Disabled);
            return Err(HologramError::RestoreSkipped);
        }

        let restored = self.restore_all(handle.renderer());
        info!("Holographic effect removed from {} materials", restored);
        self.emit(EffectEvent::Deactivated);
        Ok(())
    }

    /// Restore every patched material. Leaves the session `Disabled` and
    /// keeps its clock. Returns how many materials were restored.
    pub(crate) fn restore_all(&self, renderer: Option<&dyn RenderBackend>) -> usize {
        self.core.state.set(EffectState::Disabling);
        self.driver.stop();

        match renderer {
            Some(renderer) => {
                let cached = renderer.program_count();
                renderer.clear_programs();
                debug!("Cleared {} cached programs", cached);
            }
            None => warn!("No renderer available, restoring materials without clearing programs"),
        }

        let mut restored = 0;
        {
            let mut inner = self.core.inner.borrow_mut();
            let patched = mem::take(&mut inner.patched);
            let mut kept = Vec::new();

            for material in patched {
                let Ok(mut mat) = material.try_borrow_mut() else {
                    warn!("Material is borrowed elsewhere, leaving it patched");
                    kept.push(material);
                    continue;
                };

                if let Some(slot) = mat.user_data.holographic_shader.take() {
                    slot.clear();
                }
                match inner.original_state.remove(&MaterialId::of(&material)) {
                    Some(original) => {
                        mat.on_before_compile = original.on_before_compile;
                        mat.custom_program_cache_key = original.custom_program_cache_key;
                        mat.set_flags(original.flags);
                        restored += 1;
                    }
                    None => warn!("No original state recorded for '{}'", mat.name),
                }
                mat.invalidate();
            }

            inner.patched = kept;
            inner.params = None;
            inner.uniforms = None;
        }

        self.core.state.set(EffectState::Disabled);
        restored
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::animation::FrameQueue;
    use crate::graph::{Blending, MaterialFlags, Side};
    use crate::params::{BlendProfile, EffectParameters};
    use crate::test_support::{TestAvatar, counting_hook};

    fn session() -> EffectSession {
        EffectSession::new(Rc::new(FrameQueue::new()))
    }

    #[test]
    fn test_disable_restores_exactly() {
        let session = session();
        let avatar = TestAvatar::with_meshes(&[("Body", "body_mat")]);
        let material = avatar.material(0);

        let (hook, _) = counting_hook();
        let key: crate::graph::CacheKeyFn = Rc::new(|| "talking-head".to_string());
        let original_flags = MaterialFlags {
            transparent: false,
            side: Side::Back,
            depth_write: true,
            blending: Blending::Multiply,
        };
        {
            let mut m = material.borrow_mut();
            m.on_before_compile = Some(Rc::clone(&hook));
            m.custom_program_cache_key = Some(Rc::clone(&key));
            m.set_flags(original_flags);
        }

        let additive = EffectParameters {
            blend_profile: BlendProfile::Additive,
            ..EffectParameters::default()
        };
        session.apply_effect(&avatar, &additive);
        avatar.render();
        session.disable_effect(&avatar);

        let m = material.borrow();
        assert!(Rc::ptr_eq(m.on_before_compile.as_ref().unwrap(), &hook));
        assert!(Rc::ptr_eq(m.custom_program_cache_key.as_ref().unwrap(), &key));
        assert_eq!(m.flags(), original_flags);
        assert!(m.user_data.holographic_shader.is_none());
        assert_eq!(m.program, None);
        assert!(m.needs_update);
        assert_eq!(m.version, 2);
        assert_eq!(session.state(), EffectState::Disabled);
    }

    #[test]
    fn test_restore_of_unhooked_material_clears_hook() {
        let session = session();
        let avatar = TestAvatar::with_meshes(&[("Body", "body_mat")]);
        session.apply_effect(&avatar, &EffectParameters::default());
        session.disable_effect(&avatar);

        let m = avatar.material(0);
        let m = m.borrow();
        assert!(m.on_before_compile.is_none());
        assert!(m.custom_program_cache_key.is_none());
        assert_eq!(m.flags(), MaterialFlags::default());
    }

    #[test]
    fn test_disable_when_nothing_patched_is_skipped() {
        let session = session();
        let avatar = TestAvatar::with_meshes(&[("Body", "body_mat")]);
        assert!(matches!(
            session.try_disable_effect(&avatar),
            Err(HologramError::RestoreSkipped)
        ));
        assert_eq!(avatar.backend().clears(), 0);
    }

    #[test]
    fn test_disable_twice_is_idempotent() {
        let session = session();
        let avatar = TestAvatar::with_meshes(&[("Body", "body_mat")]);
        session.apply_effect(&avatar, &EffectParameters::default());

        session.try_disable_effect(&avatar).unwrap();
        let version = avatar.material(0).borrow().version;
        assert!(matches!(
            session.try_disable_effect(&avatar),
            Err(HologramError::RestoreSkipped)
        ));
        assert_eq!(avatar.material(0).borrow().version, version);
    }

    #[test]
    fn test_disable_without_renderer_still_restores() {
        let session = session();
        let mut avatar = TestAvatar::with_meshes(&[("Body", "body_mat")]);
        session.apply_effect(&avatar, &EffectParameters::default());

        let renderer = avatar.renderer.take();
        session.try_disable_effect(&avatar).unwrap();
        assert!(avatar.material(0).borrow().on_before_compile.is_none());
        assert_eq!(session.patched_count(), 0);
        // Only the enable cleared programs
        assert_eq!(renderer.unwrap().clears(), 1);
    }

    #[test]
    fn test_disabled_params_route_to_restore() {
        let session = session();
        let avatar = TestAvatar::with_meshes(&[("Body", "body_mat")]);
        session.apply_effect(&avatar, &EffectParameters::default());

        session.apply_effect(&avatar, &EffectParameters::default().with_enabled(false));
        assert!(!session.is_effect_active());
        assert!(avatar.material(0).borrow().on_before_compile.is_none());
    }

    #[test]
    fn test_restored_material_compiles_without_effect() {
        let session = session();
        let avatar = TestAvatar::with_meshes(&[("Body", "body_mat")]);
        let (hook, calls) = counting_hook();
        avatar.material(0).borrow_mut().on_before_compile = Some(hook);

        session.apply_effect(&avatar, &EffectParameters::default());
        session.disable_effect(&avatar);
        let shaders = avatar.render();

        assert_eq!(calls.get(), 1);
        assert!(!shaders[0].fragment_shader.contains("hgAlpha"));
        assert!(shaders[0].uniforms.is_empty());
    }

    #[test]
    fn test_deactivation_event_emitted_once() {
        let session = session();
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        session.subscribe(move |event| {
            if matches!(event, EffectEvent::Deactivated) {
                seen.set(seen.get() + 1);
            }
        });
        let avatar = TestAvatar::with_meshes(&[("Body", "body_mat")]);
        session.apply_effect(&avatar, &EffectParameters::default());
        session.disable_effect(&avatar);
        session.disable_effect(&avatar);
        assert_eq!(count.get(), 1);
    }
}
