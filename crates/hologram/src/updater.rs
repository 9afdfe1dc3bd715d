//! Live parameter edits on an injected session
//!
//! Everything here writes uniform cells only. Programs, cache keys and
//! material versions are left alone, so nothing recompiles.

use holoavatar_ipc::Rgb;
use tracing::debug;

use crate::error::HologramError;
use crate::events::EffectEvent;
use crate::params::{EffectParameters, ParamChange};
use crate::session::EffectSession;

impl EffectSession {
    /// Write `color` into every injected program. `NotActive` when nothing
    /// is patched.
    pub fn try_update_color(&self, color: Rgb) -> Result<(), HologramError> {
        self.guard("update_color")?;
        {
            let mut inner = self.core.inner.borrow_mut();
            if inner.patched.is_empty() {
                return Err(HologramError::NotActive);
            }

            for material in &inner.patched {
                let Ok(material) = material.try_borrow() else {
                    continue;
                };
                if let Some(uniforms) = material
                    .user_data
                    .holographic_shader
                    .as_ref()
                    .and_then(|slot| slot.uniforms())
                {
                    uniforms.set_color(color);
                }
            }
            // Programs compiled later pick the color up from here
            if let Some(uniforms) = &inner.uniforms {
                uniforms.set_color(color);
            }
            if let Some(params) = inner.params.as_mut() {
                params.color = color;
            }
            inner.current_color = Some(color);
        }

        debug!("Holographic color updated to {}", color);
        self.emit(EffectEvent::ColorChanged { color });
        Ok(())
    }

    /// Write every uniform-backed value of `params`. Structural fields are
    /// ignored; apply the parameters through
    /// [`EffectSession::try_apply_effect`] to change those.
    pub fn try_update_uniforms(&self, params: &EffectParameters) -> Result<(), HologramError> {
        self.guard("update_uniforms")?;
        params.validate()?;

        let color_changed = {
            let mut inner = self.core.inner.borrow_mut();
            if inner.patched.is_empty() {
                return Err(HologramError::NotActive);
            }
            let Some(active) = inner.params.as_mut() else {
                return Err(HologramError::NotActive);
            };
            if active.change_to(params) == ParamChange::Structural {
                debug!("Ignoring structural fields in uniform update");
            }
            let color_changed = active.color != params.color;
            merge_uniform_values(active, params);
            let merged = active.clone();

            if let Some(uniforms) = &inner.uniforms {
                uniforms.apply(&merged);
            }
            inner.current_color = Some(merged.color);
            color_changed
        };

        if color_changed {
            self.emit(EffectEvent::ColorChanged { color: params.color });
        }
        Ok(())
    }
}

fn merge_uniform_values(active: &mut EffectParameters, from: &EffectParameters) {
    active.color = from.color;
    active.face_intensity = from.face_intensity;
    active.body_intensity = from.body_intensity;
    active.upper_threshold = from.upper_threshold;
    active.lower_threshold = from.lower_threshold;
    active.glitch_intensity = from.glitch_intensity;
    active.glitch_frequency = from.glitch_frequency;
    active.stripe_count = from.stripe_count;
}
