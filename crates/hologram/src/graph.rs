//! Collaborator interface: the avatar's render graph, its materials and the
//! rendering backend that compiles them.
//!
//! Materials are shared by reference between drawable nodes, so they live
//! behind `Rc<RefCell<_>>` and are identified by allocation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::shader::{HolographicUniforms, Shader};

/// Callback run by the backend right before it compiles a material
pub type CompileHook = Rc<dyn Fn(&mut Shader)>;

/// Produces the key the backend uses to reuse compiled programs
pub type CacheKeyFn = Rc<dyn Fn() -> String>;

/// Shared handle to a material
pub type MaterialRef = Rc<RefCell<Material>>;

/// Identity of a material allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(usize);

impl MaterialId {
    pub fn of(material: &MaterialRef) -> Self {
        Self(Rc::as_ptr(material) as *const () as usize)
    }
}

/// Handle to a compiled backend program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u64);

/// Which faces are rasterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Framebuffer blend mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blending {
    No,
    #[default]
    Normal,
    Additive,
    Subtractive,
    Multiply,
}

/// The four render-state flags the effect overrides and later restores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialFlags {
    pub transparent: bool,
    pub side: Side,
    pub depth_write: bool,
    pub blending: Blending,
}

impl Default for MaterialFlags {
    fn default() -> Self {
        Self {
            transparent: false,
            side: Side::Front,
            depth_write: true,
            blending: Blending::Normal,
        }
    }
}

/// Where a compiled holographic program publishes its uniforms.
///
/// Empty until the backend has actually run the pre-compile hook, which may
/// happen frames after injection.
#[derive(Debug, Clone, Default)]
pub struct ShaderSlot {
    inner: Rc<RefCell<Option<HolographicUniforms>>>,
}

impl ShaderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, uniforms: HolographicUniforms) {
        *self.inner.borrow_mut() = Some(uniforms);
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().take();
    }

    pub fn is_compiled(&self) -> bool {
        self.inner.borrow().is_some()
    }

    /// Uniforms of the compiled program, if it exists yet
    pub fn uniforms(&self) -> Option<HolographicUniforms> {
        self.inner.borrow().clone()
    }
}

/// Free-form per-material data owned by the application
#[derive(Debug, Clone, Default)]
pub struct MaterialUserData {
    pub holographic_shader: Option<ShaderSlot>,
}

/// Mutable shading descriptor compiled by the backend
pub struct Material {
    pub name: String,
    pub on_before_compile: Option<CompileHook>,
    pub custom_program_cache_key: Option<CacheKeyFn>,
    pub program: Option<ProgramId>,
    pub version: u32,
    pub needs_update: bool,
    pub transparent: bool,
    pub side: Side,
    pub depth_write: bool,
    pub blending: Blending,
    pub user_data: MaterialUserData,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        let flags = MaterialFlags::default();
        Self {
            name: name.into(),
            on_before_compile: None,
            custom_program_cache_key: None,
            program: None,
            version: 0,
            needs_update: false,
            transparent: flags.transparent,
            side: flags.side,
            depth_write: flags.depth_write,
            blending: flags.blending,
            user_data: MaterialUserData::default(),
        }
    }

    /// Wrap into a shareable handle
    pub fn into_ref(self) -> MaterialRef {
        Rc::new(RefCell::new(self))
    }

    pub fn flags(&self) -> MaterialFlags {
        MaterialFlags {
            transparent: self.transparent,
            side: self.side,
            depth_write: self.depth_write,
            blending: self.blending,
        }
    }

    pub fn set_flags(&mut self, flags: MaterialFlags) {
        self.transparent = flags.transparent;
        self.side = flags.side;
        self.depth_write = flags.depth_write;
        self.blending = flags.blending;
    }

    /// Drop the compiled program and flag the material for recompilation
    pub fn invalidate(&mut self) {
        self.program = None;
        self.version = self.version.wrapping_add(1);
        self.needs_update = true;
    }

    /// Current cache key, if a key function is installed
    pub fn cache_key(&self) -> Option<String> {
        self.custom_program_cache_key.as_ref().map(|key| key())
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("has_hook", &self.on_before_compile.is_some())
            .field("cache_key", &self.cache_key())
            .field("program", &self.program)
            .field("version", &self.version)
            .field("needs_update", &self.needs_update)
            .field("flags", &self.flags())
            .finish()
    }
}

/// A renderable node in the avatar hierarchy
#[derive(Debug, Clone)]
pub struct DrawableNode {
    /// May be empty or shared with other nodes
    pub name: String,
    pub material: MaterialRef,
    pub stable_id: u64,
}

impl DrawableNode {
    pub fn new(stable_id: u64, name: impl Into<String>, material: MaterialRef) -> Self {
        Self {
            name: name.into(),
            material,
            stable_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("render graph was detached during traversal")]
    Detached,
}

/// The avatar's node hierarchy
pub trait RenderGraph {
    /// Visit every drawable node once
    fn traverse(&self, visit: &mut dyn FnMut(&DrawableNode)) -> Result<(), GraphError>;
}

impl RenderGraph for Vec<DrawableNode> {
    fn traverse(&self, visit: &mut dyn FnMut(&DrawableNode)) -> Result<(), GraphError> {
        self.iter().for_each(|node| visit(node));
        Ok(())
    }
}

/// The backend's program cache
pub trait RenderBackend {
    fn program_count(&self) -> usize;
    /// Drop every cached program so patched materials must recompile
    fn clear_programs(&self);
}

/// A loaded avatar as seen by the effect
pub trait AvatarHandle {
    fn armature(&self) -> Option<&dyn RenderGraph>;
    fn renderer(&self) -> Option<&dyn RenderBackend>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_identity_follows_allocation() {
        let a = Material::new("skin").into_ref();
        let b = Material::new("skin").into_ref();
        assert_eq!(MaterialId::of(&a), MaterialId::of(&Rc::clone(&a)));
        assert_ne!(MaterialId::of(&a), MaterialId::of(&b));
    }

    #[test]
    fn test_invalidate_bumps_version() {
        let mut material = Material::new("skin");
        material.program = Some(ProgramId(7));
        material.invalidate();
        assert_eq!(material.program, None);
        assert_eq!(material.version, 1);
        assert!(material.needs_update);
    }

    #[test]
    fn test_flags_round_trip() {
        let mut material = Material::new("skin");
        let flags = MaterialFlags {
            transparent: true,
            side: Side::Double,
            depth_write: false,
            blending: Blending::Additive,
        };
        material.set_flags(flags);
        assert_eq!(material.flags(), flags);
    }

    #[test]
    fn test_vec_graph_visits_all_nodes() {
        let shared = Material::new("shared").into_ref();
        let graph = vec![
            DrawableNode::new(1, "Head", Rc::clone(&shared)),
            DrawableNode::new(2, "Body", shared),
        ];
        let mut seen = Vec::new();
        graph.traverse(&mut |node| seen.push(node.stable_id)).unwrap();
        assert_eq!(seen, vec![1, 2]);
    }
}
