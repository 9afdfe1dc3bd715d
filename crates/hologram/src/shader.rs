//! Shader program representation handed to pre-compile hooks, and the shared
//! uniform cells the holographic effect registers into it.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use holoavatar_ipc::Rgb;

use crate::params::EffectParameters;

pub const U_TIME: &str = "uTime";
pub const U_COLOR: &str = "uColor";
pub const U_FACE_INTENSITY: &str = "uFaceIntensity";
pub const U_BODY_INTENSITY: &str = "uBodyIntensity";
pub const U_UPPER_THRESHOLD: &str = "uUpperThreshold";
pub const U_LOWER_THRESHOLD: &str = "uLowerThreshold";
pub const U_STRIPE_COUNT: &str = "uStripeCount";
pub const U_GLITCH_INTENSITY: &str = "uGlitchIntensity";
pub const U_GLITCH_FREQUENCY: &str = "uGlitchFrequency";

/// Value held by a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec3([f32; 3]),
}

/// A single uniform. Shared by reference between the compiled program and
/// whoever updates it, so writes take effect on the next draw without
/// recompiling.
#[derive(Debug)]
pub struct Uniform {
    value: Cell<UniformValue>,
}

pub type UniformRef = Rc<Uniform>;

impl Uniform {
    pub fn new(value: UniformValue) -> UniformRef {
        Rc::new(Self {
            value: Cell::new(value),
        })
    }

    pub fn float(value: f32) -> UniformRef {
        Self::new(UniformValue::Float(value))
    }

    pub fn get(&self) -> UniformValue {
        self.value.get()
    }

    pub fn set(&self, value: UniformValue) {
        self.value.set(value);
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self.get() {
            UniformValue::Float(v) => Some(v),
            UniformValue::Vec3(_) => None,
        }
    }

    pub fn set_f32(&self, value: f32) {
        self.set(UniformValue::Float(value));
    }
}

/// Program source and uniforms as seen by a pre-compile hook.
///
/// Hooks mutate this in place; the backend compiles whatever is left.
#[derive(Default)]
pub struct Shader {
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub uniforms: BTreeMap<String, UniformRef>,
}

impl Shader {
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            uniforms: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("vertex_len", &self.vertex_shader.len())
            .field("fragment_len", &self.fragment_shader.len())
            .field("uniforms", &self.uniforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The uniform set for one enable cycle. Every patched material's program
/// shares these cells.
#[derive(Debug, Clone)]
pub struct HolographicUniforms {
    pub time: UniformRef,
    pub color: UniformRef,
    pub face_intensity: UniformRef,
    pub body_intensity: UniformRef,
    pub upper_threshold: UniformRef,
    pub lower_threshold: UniformRef,
    pub stripe_count: UniformRef,
    pub glitch_intensity: UniformRef,
    pub glitch_frequency: UniformRef,
}

impl HolographicUniforms {
    /// Fresh cells initialized from `params`, time at zero
    pub fn new(params: &EffectParameters) -> Self {
        let uniforms = Self {
            time: Uniform::float(0.0),
            color: Uniform::new(UniformValue::Vec3(params.color.to_vec3())),
            face_intensity: Uniform::float(0.0),
            body_intensity: Uniform::float(0.0),
            upper_threshold: Uniform::float(0.0),
            lower_threshold: Uniform::float(0.0),
            stripe_count: Uniform::float(0.0),
            glitch_intensity: Uniform::float(0.0),
            glitch_frequency: Uniform::float(0.0),
        };
        uniforms.apply(params);
        uniforms
    }

    /// Push every uniform-backed parameter into the cells
    pub fn apply(&self, params: &EffectParameters) {
        self.set_color(params.color);
        self.face_intensity.set_f32(params.face_intensity);
        self.body_intensity.set_f32(params.body_intensity);
        self.upper_threshold.set_f32(params.upper_threshold);
        self.lower_threshold.set_f32(params.lower_threshold);
        self.stripe_count.set_f32(params.stripe_count);
        self.glitch_intensity.set_f32(params.glitch_intensity);
        self.glitch_frequency.set_f32(params.glitch_frequency);
    }

    pub fn set_color(&self, color: Rgb) {
        self.color.set(UniformValue::Vec3(color.to_vec3()));
    }

    pub fn set_time(&self, seconds: f32) {
        self.time.set_f32(seconds);
    }

    pub fn time(&self) -> f32 {
        self.time.as_f32().unwrap_or(0.0)
    }

    /// Register the cells in a shader's uniform table. Glitch uniforms are
    /// only registered when the glitch code is spliced in.
    pub fn register(&self, shader: &mut Shader, with_glitch: bool) {
        let mut insert = |name: &str, uniform: &UniformRef| {
            shader.uniforms.insert(name.to_string(), Rc::clone(uniform));
        };
        insert(U_TIME, &self.time);
        insert(U_COLOR, &self.color);
        insert(U_FACE_INTENSITY, &self.face_intensity);
        insert(U_BODY_INTENSITY, &self.body_intensity);
        insert(U_UPPER_THRESHOLD, &self.upper_threshold);
        insert(U_LOWER_THRESHOLD, &self.lower_threshold);
        insert(U_STRIPE_COUNT, &self.stripe_count);
        if with_glitch {
            insert(U_GLITCH_INTENSITY, &self.glitch_intensity);
            insert(U_GLITCH_FREQUENCY, &self.glitch_frequency);
        }
    }
}
