//! Holoavatar holographic effect
//!
//! Non-destructive shader injection for an already-loaded avatar:
//! - [`graph`] - the avatar, material and backend interface the effect works against
//! - [`composer`] - GLSL chunks and the splice that inserts them
//! - [`session`] - enable/disable state machine with exact restore
//! - [`animation`] - clocks, frame schedulers and the `uTime` driver
//! - [`updater`] - live color and uniform edits without recompiling
//! - [`controls`] - toggle/color state for a UI
//!
//! With the `bevy` feature, [`plugin::HolographicFramePlugin`] drives the
//! frame queue from Bevy's `Update` schedule.

pub mod animation;
pub mod composer;
pub mod controls;
pub mod error;
pub mod events;
pub mod graph;
pub mod params;
pub mod session;
pub mod shader;
pub mod updater;

#[cfg(feature = "bevy")]
pub mod plugin;

#[cfg(test)]
mod test_support;

pub use animation::{
    AnimationDriver, Clock, FrameHandle, FrameQueue, FrameScheduler, FrameStats, ManualClock,
    MonotonicClock,
};
pub use composer::{ShaderComposer, SpliceReport};
pub use controls::HolographicControls;
pub use error::HologramError;
pub use events::EffectEvent;
pub use graph::{
    AvatarHandle, Blending, DrawableNode, GraphError, Material, MaterialFlags, MaterialId,
    MaterialRef, RenderBackend, RenderGraph, ShaderSlot, Side,
};
pub use params::{BlendProfile, EffectParameters, GlitchVariant};
pub use session::{EffectSession, EffectState, OriginalMaterialState};
pub use shader::{HolographicUniforms, Shader, Uniform, UniformValue};
