//! Simulated avatar and backend for unit tests

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::graph::{
    AvatarHandle, CompileHook, DrawableNode, GraphError, Material, MaterialId, MaterialRef,
    ProgramId, RenderBackend, RenderGraph,
};
use crate::shader::Shader;

/// Minimal stock vertex program containing both vertex anchors
pub const BASE_VERTEX: &str = "\
#include <common>
void main() {
#include <begin_vertex>
#include <project_vertex>
#include <worldpos_vertex>
}
";

/// Minimal stock fragment program containing the diffuse anchor
pub const BASE_FRAGMENT: &str = "\
uniform vec3 diffuse;
uniform float opacity;
void main() {
vec4 diffuseColor = vec4( diffuse, opacity );
gl_FragColor = diffuseColor;
}
";

/// Hook that only counts its invocations
pub fn counting_hook() -> (CompileHook, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let hook: CompileHook = Rc::new(move |_shader: &mut Shader| counter.set(counter.get() + 1));
    (hook, calls)
}

/// Program cache that compiles like a real backend: run the hook, then
/// record the program under the material's cache key
#[derive(Default)]
pub struct TestRenderer {
    programs: RefCell<Vec<String>>,
    clears: Cell<usize>,
    compiles: Cell<usize>,
}

impl TestRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_programs(&self, count: usize) {
        let mut programs = self.programs.borrow_mut();
        programs.extend((0..count).map(|i| format!("stock_{i}")));
    }

    pub fn clears(&self) -> usize {
        self.clears.get()
    }

    pub fn compiles(&self) -> usize {
        self.compiles.get()
    }

    pub fn compile(&self, material: &MaterialRef) -> Shader {
        let hook = material.borrow().on_before_compile.clone();
        let mut shader = Shader::new(BASE_VERTEX, BASE_FRAGMENT);
        if let Some(hook) = hook {
            hook(&mut shader);
        }

        let id = self.compiles.get() as u64;
        self.compiles.set(self.compiles.get() + 1);
        let mut material = material.borrow_mut();
        self.programs
            .borrow_mut()
            .push(material.cache_key().unwrap_or_else(|| material.name.clone()));
        material.program = Some(ProgramId(id));
        material.needs_update = false;
        shader
    }
}

impl RenderBackend for TestRenderer {
    fn program_count(&self) -> usize {
        self.programs.borrow().len()
    }

    fn clear_programs(&self) {
        self.programs.borrow_mut().clear();
        self.clears.set(self.clears.get() + 1);
    }
}

/// Node list that can simulate being detached mid-traversal
pub struct TestGraph {
    pub nodes: Vec<DrawableNode>,
    /// Fail with `Detached` after visiting this many nodes
    pub detach_after: Option<usize>,
}

impl TestGraph {
    pub fn new(nodes: Vec<DrawableNode>) -> Self {
        Self {
            nodes,
            detach_after: None,
        }
    }
}

impl RenderGraph for TestGraph {
    fn traverse(&self, visit: &mut dyn FnMut(&DrawableNode)) -> Result<(), GraphError> {
        for (index, node) in self.nodes.iter().enumerate() {
            if self.detach_after == Some(index) {
                return Err(GraphError::Detached);
            }
            visit(node);
        }
        Ok(())
    }
}

pub struct TestAvatar {
    pub graph: Option<TestGraph>,
    pub renderer: Option<TestRenderer>,
}

impl TestAvatar {
    pub fn new(graph: TestGraph, renderer: TestRenderer) -> Self {
        Self {
            graph: Some(graph),
            renderer: Some(renderer),
        }
    }

    /// One node per `(node name, material name)` pair, each with its own material
    pub fn with_meshes(meshes: &[(&str, &str)]) -> Self {
        let nodes = meshes
            .iter()
            .enumerate()
            .map(|(i, (node, material))| {
                DrawableNode::new(i as u64, *node, Material::new(*material).into_ref())
            })
            .collect();
        Self::new(TestGraph::new(nodes), TestRenderer::new())
    }

    pub fn material(&self, index: usize) -> MaterialRef {
        let graph = self.graph.as_ref().expect("avatar has no graph");
        Rc::clone(&graph.nodes[index].material)
    }

    pub fn backend(&self) -> &TestRenderer {
        self.renderer.as_ref().expect("avatar has no renderer")
    }

    /// Compile every distinct material that has no program, as a frame
    /// render would. Returns the compiled shaders in node order.
    pub fn render(&self) -> Vec<Shader> {
        let (Some(graph), Some(renderer)) = (&self.graph, &self.renderer) else {
            return Vec::new();
        };
        let mut seen = Vec::new();
        let mut shaders = Vec::new();
        for node in &graph.nodes {
            let id = MaterialId::of(&node.material);
            if seen.contains(&id) || node.material.borrow().program.is_some() {
                continue;
            }
            seen.push(id);
            shaders.push(renderer.compile(&node.material));
        }
        shaders
    }
}

impl AvatarHandle for TestAvatar {
    fn armature(&self) -> Option<&dyn RenderGraph> {
        self.graph.as_ref().map(|g| g as &dyn RenderGraph)
    }

    fn renderer(&self) -> Option<&dyn RenderBackend> {
        self.renderer.as_ref().map(|r| r as &dyn RenderBackend)
    }
}
