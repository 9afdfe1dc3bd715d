//! Shader effect composer
//!
//! Splices the holographic effect into an existing material program at three
//! anchors the stock mesh shaders always contain. Only the caller's [`Shader`]
//! is modified; the chunks themselves are static.
//!
//! The math here is mirrored on the CPU in [`math`].

pub mod math;

use tracing::{debug, warn};

use self::math::GLITCH_AMPLITUDE;
use crate::params::{EffectParameters, GlitchVariant};
use crate::shader::{HolographicUniforms, Shader};

/// Vertex anchor: `transformed` holds the object-space position
pub const BEGIN_VERTEX_ANCHOR: &str = "#include <begin_vertex>";
/// Vertex anchor: after the model transform
pub const WORLDPOS_VERTEX_ANCHOR: &str = "#include <worldpos_vertex>";
/// Fragment anchor: the base color assignment, replaced outright
pub const DIFFUSE_COLOR_ANCHOR: &str = "vec4 diffuseColor = vec4( diffuse, opacity );";

/// First line of a spliced vertex shader
pub const SPLICE_MARKER: &str = "// holographic:spliced";

const VERTEX_PRELUDE: &str = "\
uniform float uTime;
uniform float uUpperThreshold;
uniform float uLowerThreshold;
varying vec3 vWorldPosition;
";

const VERTEX_GLITCH_PRELUDE: &str = "\
uniform float uGlitchIntensity;
uniform float uGlitchFrequency;
float hgRandom(vec2 st) {
    return fract(sin(dot(st, vec2(12.9898, 78.233))) * 43758.5453123);
}
float hgGlitchWave(float t) {
    return (sin(t) + sin(t * 3.45) + sin(t * 8.76)) / 3.0;
}
";

const FRAGMENT_PRELUDE: &str = "\
uniform float uTime;
uniform vec3 uColor;
uniform float uFaceIntensity;
uniform float uBodyIntensity;
uniform float uUpperThreshold;
uniform float uLowerThreshold;
uniform float uStripeCount;
varying vec3 vWorldPosition;
";

const GLITCH_EVERYWHERE: &str = "
    vec4 hgWorld = modelMatrix * vec4(transformed, 1.0);
    float hgStrength = hgGlitchWave(uTime * uGlitchFrequency - hgWorld.y)
        * uGlitchIntensity * hgGlitchAmplitude;
    float hgJitter = hgRandom(transformed.xz + uTime) - 0.5;
    transformed.x += hgJitter * hgStrength;
    transformed.z += hgJitter * hgStrength * 0.5;
";

const GLITCH_BODY_ANIMATED: &str = "
    vec4 hgWorld = modelMatrix * vec4(transformed, 1.0);
    float hgAnimated = hgGlitchWave(uTime * uGlitchFrequency - hgWorld.y)
        * (hgRandom(transformed.xz + uTime) - 0.5);
    float hgStatic = hgGlitchWave(-hgWorld.y) * (hgRandom(transformed.xz) - 0.5);
    float hgFace = smoothstep(uLowerThreshold, uUpperThreshold, hgWorld.y);
    float hgOffset = mix(hgAnimated, hgStatic, hgFace) * uGlitchIntensity * hgGlitchAmplitude;
    transformed.x += hgOffset;
    transformed.z += hgOffset * 0.5;
";

const WORLDPOS_CHUNK: &str = "
    vWorldPosition = (modelMatrix * vec4(transformed, 1.0)).xyz;
";

const FRAGMENT_CHUNK: &str = "
    float hgStripes = fract((vWorldPosition.y - uTime * 0.02) * uStripeCount);
    hgStripes = hgStripes * hgStripes;
    float hgRim = dot(normalize(vWorldPosition - cameraPosition), normalize(vNormal));
    hgRim = hgRim * hgRim;
    float hgSpan = max(uUpperThreshold - uLowerThreshold, 1e-4);
    float hgFade = clamp((uUpperThreshold - vWorldPosition.y) / hgSpan, 0.0, 1.0);
    float hgIntensity = mix(uFaceIntensity, uBodyIntensity, hgFade);
    float hgAlpha = (hgStripes + hgRim) * hgIntensity * 0.5;
    vec4 diffuseColor = vec4(uColor, hgAlpha);
";

/// Outcome of a splice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpliceReport {
    /// The shader already carried the marker; nothing was inserted
    pub already_spliced: bool,
    /// Anchors not found; their chunks were skipped
    pub missing_anchors: Vec<&'static str>,
}

impl SpliceReport {
    pub fn is_complete(&self) -> bool {
        self.missing_anchors.is_empty()
    }
}

/// Splices the effect for one structural configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderComposer {
    glitch: Option<GlitchVariant>,
}

impl Default for ShaderComposer {
    fn default() -> Self {
        Self::for_params(&EffectParameters::default())
    }
}

impl ShaderComposer {
    pub fn for_params(params: &EffectParameters) -> Self {
        Self {
            glitch: params.glitch_enabled.then_some(params.glitch_variant),
        }
    }

    pub fn includes_glitch(&self) -> bool {
        self.glitch.is_some()
    }

    /// Declarations prepended to the vertex shader
    pub fn vertex_prelude(&self) -> String {
        let mut prelude = format!("{SPLICE_MARKER}\n{VERTEX_PRELUDE}");
        if self.glitch.is_some() {
            prelude.push_str(&format!("const float hgGlitchAmplitude = {GLITCH_AMPLITUDE:.4};\n"));
            prelude.push_str(VERTEX_GLITCH_PRELUDE);
        }
        prelude
    }

    pub fn fragment_prelude(&self) -> &'static str {
        FRAGMENT_PRELUDE
    }

    /// Code inserted after `#include <begin_vertex>`, empty without glitch
    pub fn begin_vertex_chunk(&self) -> &'static str {
        match self.glitch {
            Some(GlitchVariant::BodyAnimated) => GLITCH_BODY_ANIMATED,
            Some(GlitchVariant::Everywhere) => GLITCH_EVERYWHERE,
            None => "",
        }
    }

    pub fn worldpos_chunk(&self) -> &'static str {
        WORLDPOS_CHUNK
    }

    /// Replacement for the diffuse color line
    pub fn fragment_chunk(&self) -> &'static str {
        FRAGMENT_CHUNK
    }

    /// Inject the effect into `shader` and register `uniforms` with it.
    ///
    /// Splicing a shader that already carries the marker only re-registers the
    /// uniforms.
    pub fn splice(&self, shader: &mut Shader, uniforms: &HolographicUniforms) -> SpliceReport {
        uniforms.register(shader, self.includes_glitch());

        if shader.vertex_shader.starts_with(SPLICE_MARKER) {
            debug!("Shader already spliced, re-registering uniforms only");
            return SpliceReport {
                already_spliced: true,
                missing_anchors: Vec::new(),
            };
        }

        let mut report = SpliceReport::default();

        let mut vertex = self.vertex_prelude();
        let mut body = std::mem::take(&mut shader.vertex_shader);
        if self.glitch.is_some() {
            insert_after(&mut body, BEGIN_VERTEX_ANCHOR, self.begin_vertex_chunk(), &mut report);
        }
        insert_after(&mut body, WORLDPOS_VERTEX_ANCHOR, WORLDPOS_CHUNK, &mut report);
        vertex.push_str(&body);
        shader.vertex_shader = vertex;

        let mut fragment = std::mem::take(&mut shader.fragment_shader);
        if fragment.contains(DIFFUSE_COLOR_ANCHOR) {
            fragment = fragment.replacen(DIFFUSE_COLOR_ANCHOR, FRAGMENT_CHUNK, 1);
        } else {
            report.missing_anchors.push(DIFFUSE_COLOR_ANCHOR);
        }
        shader.fragment_shader = format!("{FRAGMENT_PRELUDE}{fragment}");

        for anchor in &report.missing_anchors {
            warn!("Shader anchor not found, skipping chunk: {}", anchor);
        }
        report
    }
}

fn insert_after(
    source: &mut String,
    anchor: &'static str,
    chunk: &str,
    report: &mut SpliceReport,
) {
    match source.find(anchor) {
        Some(at) => source.insert_str(at + anchor.len(), chunk),
        None => report.missing_anchors.push(anchor),
    }
}
