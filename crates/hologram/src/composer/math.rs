//! CPU mirrors of the spliced GLSL, for tests and for hosts that shade on the
//! CPU. Each function matches the corresponding shader expression.

/// Scroll speed of the scan lines, in world units per second
pub const STRIPE_SCROLL_SPEED: f32 = 0.02;

/// Peak glitch displacement in world units at full intensity, before the
/// per-vertex jitter in `[-0.5, 0.5]` is applied
pub const GLITCH_AMPLITUDE: f32 = 0.08;

/// Frequencies summed by the glitch wave
pub const GLITCH_HARMONICS: [f32; 3] = [1.0, 3.45, 8.76];

/// GLSL `fract`
fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// GLSL `smoothstep`
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Scrolling scan lines, squared to sharpen the bright edge
pub fn stripes(world_y: f32, time: f32, stripe_count: f32) -> f32 {
    let s = fract((world_y - time * STRIPE_SCROLL_SPEED) * stripe_count);
    s * s
}

/// Rim term from the cosine between view direction and surface normal
pub fn rim(view_dot_normal: f32) -> f32 {
    view_dot_normal * view_dot_normal
}

/// Face intensity at `upper`, body intensity at `lower`, linear between
pub fn height_intensity(world_y: f32, face: f32, body: f32, upper: f32, lower: f32) -> f32 {
    let span = (upper - lower).max(1e-4);
    let fade = ((upper - world_y) / span).clamp(0.0, 1.0);
    face + (body - face) * fade
}

/// Final fragment alpha
pub fn holographic_alpha(stripes: f32, rim: f32, intensity: f32) -> f32 {
    (stripes + rim) * intensity * 0.5
}

/// Multi-sine glitch strength for a vertex at `world_y`, in world units
pub fn glitch_strength(time: f32, frequency: f32, world_y: f32, intensity: f32) -> f32 {
    let t = time * frequency - world_y;
    let wave: f32 = GLITCH_HARMONICS.iter().map(|h| (t * h).sin()).sum();
    wave / GLITCH_HARMONICS.len() as f32 * intensity * GLITCH_AMPLITUDE
}

/// Horizontal offset of a vertex given its jitter in `[-0.5, 0.5]`
pub fn glitch_offset(strength: f32, jitter: f32) -> f32 {
    strength * jitter
}

/// How much of the static (face) jitter a vertex takes in the body-animated
/// variant: 0 at `lower`, 1 at `upper`
pub fn face_weight(world_y: f32, lower: f32, upper: f32) -> f32 {
    smoothstep(lower, upper, world_y)
}
