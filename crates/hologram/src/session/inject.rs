//! Enable path: capture, hook, invalidate

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::composer::ShaderComposer;
use crate::error::HologramError;
use crate::events::EffectEvent;
use crate::graph::{
    AvatarHandle, GraphError, MaterialFlags, MaterialId, MaterialRef, RenderBackend, RenderGraph,
    ShaderSlot,
};
use crate::params::{EffectParameters, ParamChange};
use crate::shader::{HolographicUniforms, Shader};

use super::{EffectSession, EffectState, OriginalMaterialState, SessionInner};

static CACHE_KEY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A cache key no earlier program was compiled under
fn fresh_cache_key() -> String {
    format!("holographic_{}", CACHE_KEY_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Distinct, non-excluded materials in traversal order, plus how traversal ended
fn collect_targets(
    armature: &dyn RenderGraph,
    params: &EffectParameters,
) -> (Vec<MaterialRef>, Result<(), GraphError>) {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let outcome = armature.traverse(&mut |node| {
        let material_name = match node.material.try_borrow() {
            Ok(material) => material.name.clone(),
            Err(_) => {
                warn!("Material on '{}' is borrowed elsewhere, skipping", node.name);
                return;
            }
        };
        if params.is_excluded(&node.name, &material_name) {
            debug!("Skipping excluded mesh '{}' (material '{}')", node.name, material_name);
            return;
        }
        if seen.insert(MaterialId::of(&node.material)) {
            targets.push(Rc::clone(&node.material));
        }
    });
    (targets, outcome)
}

impl EffectSession {
    /// Apply the effect, reporting why nothing happened when it did not.
    ///
    /// With `params.enabled == false` this is [`EffectSession::try_disable_effect`].
    pub fn try_apply_effect(
        &self,
        handle: &dyn AvatarHandle,
        params: &EffectParameters,
    ) -> Result<(), HologramError> {
        if !params.enabled {
            return self.try_disable_effect(handle);
        }
        self.guard("apply_effect")?;
        params.validate()?;

        let renderer = handle.renderer().ok_or(HologramError::EnvironmentUnavailable)?;
        let armature = handle.armature().ok_or(HologramError::AvatarNotReady)?;

        if self.state() == EffectState::Enabled {
            let (change, has_patched) = {
                let inner = self.core.inner.borrow();
                let change = inner
                    .params
                    .as_ref()
                    .map_or(ParamChange::Structural, |active| active.change_to(params));
                (change, !inner.patched.is_empty())
            };
            match change {
                ParamChange::None if has_patched => {
                    debug!("Holographic effect already applied with these parameters");
                    return Ok(());
                }
                ParamChange::Uniforms if has_patched => {
                    debug!("Holographic parameters changed, updating uniforms in place");
                    return self.try_update_uniforms(params);
                }
                _ => {
                    debug!("Holographic structure changed, re-injecting");
                    self.restore_all(Some(renderer));
                    self.emit(EffectEvent::Deactivated);
                }
            }
        }

        self.inject(renderer, armature, params)
    }

    fn inject(
        &self,
        renderer: &dyn RenderBackend,
        armature: &dyn RenderGraph,
        params: &EffectParameters,
    ) -> Result<(), HologramError> {
        self.core.state.set(EffectState::Enabling);

        let composer = ShaderComposer::for_params(params);
        let flags = params.blend_profile.flags();
        let uniforms = HolographicUniforms::new(params);
        let (targets, traversal) = collect_targets(armature, params);

        let patched = {
            let mut inner = self.core.inner.borrow_mut();
            let busy = targets
                .iter()
                .filter(|material| {
                    !patch_material(&mut inner, material, composer, &uniforms, flags)
                })
                .count();
            if busy > 0 {
                warn!("{} materials were borrowed elsewhere and stay unpatched", busy);
            }
            inner.uniforms = Some(uniforms);
            inner.params = Some(params.clone());
            inner.current_color = Some(params.color);
            self.ensure_clock(&mut inner);
            inner.patched.len()
        };

        let cached = renderer.program_count();
        renderer.clear_programs();
        debug!("Cleared {} cached programs", cached);

        if patched == 0 {
            let mut inner = self.core.inner.borrow_mut();
            inner.params = None;
            inner.uniforms = None;
            drop(inner);
            self.core.state.set(EffectState::Disabled);
            return match traversal {
                Err(e) => Err(e.into()),
                Ok(()) => {
                    info!("No materials matched, holographic effect not applied");
                    Ok(())
                }
            };
        }
        if traversal.is_err() {
            warn!("Traversal aborted, keeping {} patched materials", patched);
        }

        self.core.state.set(EffectState::Enabled);
        self.start_animation();
        info!("Holographic effect applied to {} materials", patched);
        self.emit(EffectEvent::Activated { color: params.color });

        traversal.map_err(HologramError::from)
    }
}

/// Install the holographic hook on one material. Returns false when the
/// material could not be borrowed.
fn patch_material(
    inner: &mut SessionInner,
    material: &MaterialRef,
    composer: ShaderComposer,
    uniforms: &HolographicUniforms,
    flags: MaterialFlags,
) -> bool {
    let Ok(mut mat) = material.try_borrow_mut() else {
        warn!("Material is borrowed elsewhere, not patching");
        return false;
    };

    let original = inner
        .original_state
        .entry(MaterialId::of(material))
        .or_insert_with(|| OriginalMaterialState::capture(&mat));
    // Always chain the hook the material had before any injection
    let chained = original.on_before_compile.clone();

    let slot = ShaderSlot::new();
    let hook_slot = slot.clone();
    let hook_uniforms = uniforms.clone();
    mat.on_before_compile = Some(Rc::new(move |shader: &mut Shader| {
        if let Some(previous) = &chained {
            previous(shader);
        }
        composer.splice(shader, &hook_uniforms);
        hook_slot.publish(hook_uniforms.clone());
    }));
    mat.user_data.holographic_shader = Some(slot);

    mat.set_flags(flags);
    let key = fresh_cache_key();
    mat.custom_program_cache_key = Some(Rc::new(move || key.clone()));
    mat.invalidate();

    debug!("Patched material '{}' (version {})", mat.name, mat.version);
    drop(mat);

    if !inner.patched.iter().any(|m| Rc::ptr_eq(m, material)) {
        inner.patched.push(Rc::clone(material));
    }
    true
}
