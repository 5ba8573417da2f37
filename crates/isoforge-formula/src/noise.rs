//! Noise functions available to formulas
//!
//! The generators are seeded once and shared read-only by every evaluation.

use glam::{Vec2, Vec3};
use noise::{NoiseFn, Perlin, Simplex, Value};
use std::sync::LazyLock;

/// Seed shared by all generators so meshes are reproducible across runs
pub const NOISE_SEED: u32 = 0;

/// Upper bound on fbm octaves taken from formula input
pub const MAX_OCTAVES: i32 = 16;

struct NoiseSources {
    value: Value,
    perlin: Perlin,
    simplex: Simplex,
}

static SOURCES: LazyLock<NoiseSources> = LazyLock::new(|| NoiseSources {
    value: Value::new(NOISE_SEED),
    perlin: Perlin::new(NOISE_SEED),
    simplex: Simplex::new(NOISE_SEED),
});

fn point(p: Vec3) -> [f64; 3] {
    [f64::from(p.x), f64::from(p.y), f64::from(p.z)]
}

/// Value noise (interpolated lattice values)
pub fn value_noise(p: Vec3) -> f32 {
    SOURCES.value.get(point(p)) as f32
}

/// Classic Perlin gradient noise
pub fn perlin_noise(p: Vec3) -> f32 {
    SOURCES.perlin.get(point(p)) as f32
}

/// Simplex gradient noise
pub fn simplex_noise(p: Vec3) -> f32 {
    SOURCES.simplex.get(point(p)) as f32
}

/// Rotating-gradient simplex noise over the xy plane
///
/// Each lattice corner's gradient is turned by `rotation` radians, so sweeping
/// the rotation makes the pattern swirl in place. Returns the noise value in
/// `x` and its analytic partial derivatives along x and y in `y` and `z`.
pub fn rotating_simplex_noise(p: Vec2, rotation: f32) -> Vec3 {
    // Nudged off y = 0 where the skewed lattice shows seams
    let p = Vec2::new(p.x, p.y + 0.001);

    let uv = Vec2::new(p.x + p.y * 0.5, p.y);
    let i0 = uv.floor();
    let f0 = uv - i0;
    let step = if f0.x > f0.y { Vec2::X } else { Vec2::Y };

    let p0 = Vec2::new(i0.x - i0.y * 0.5, i0.y);
    let p1 = Vec2::new(p0.x + step.x - step.y * 0.5, p0.y + step.y);
    let p2 = Vec2::new(p0.x + 0.5, p0.y + 1.0);

    let mut value = 0.0;
    let mut derivative = Vec2::ZERO;
    for corner in [p0, p1, p2] {
        let d = p - corner;
        let falloff = (0.8 - d.length_squared()).max(0.0);
        let hash = permute(permute(mod289(corner.x + 0.5 * corner.y)) + mod289(corner.y));
        let angle = hash * 0.07482 + rotation;
        let gradient = Vec2::new(angle.cos(), angle.sin());

        let g_dot_d = gradient.dot(d);
        let f2 = falloff * falloff;
        let f4 = f2 * f2;
        value += f4 * g_dot_d;
        derivative += f4 * gradient - 8.0 * f2 * falloff * g_dot_d * d;
    }

    11.0 * Vec3::new(value, derivative.x, derivative.y)
}

fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: f32) -> f32 {
    mod289((34.0 * x + 1.0) * x)
}

/// Fractal Brownian motion over simplex noise
///
/// Amplitude starts at 1 and is scaled by `2^-persistence` per octave while the
/// frequency is multiplied by `lacunarity`.
pub fn fbm(p: Vec3, persistence: f32, octaves: i32, lacunarity: f32) -> f32 {
    let gain = (-persistence).exp2();
    let mut frequency = 1.0;
    let mut amplitude = 1.0;
    let mut total = 0.0;

    for _ in 0..octaves.clamp(0, MAX_OCTAVES) {
        total += amplitude * simplex_noise(p * frequency);
        frequency *= lacunarity;
        amplitude *= gain;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_noise_is_deterministic() {
        let p = Vec3::new(1.3, -2.7, 0.4);
        assert_eq!(value_noise(p), value_noise(p));
        assert_eq!(perlin_noise(p), perlin_noise(p));
        assert_eq!(simplex_noise(p), simplex_noise(p));
    }

    #[test]
    fn test_noise_is_bounded() {
        for i in 0..64 {
            let p = Vec3::new(i as f32 * 0.37, i as f32 * -0.11, i as f32 * 0.53);
            for n in [value_noise(p), perlin_noise(p), simplex_noise(p)] {
                assert!(n.is_finite());
                assert!(n.abs() <= 2.0, "noise value {} out of range", n);
            }
        }
    }

    #[test]
    fn test_rotating_noise_derivatives_match_finite_differences() {
        let h = 0.01;
        for p in [Vec2::new(0.3, 0.7), Vec2::new(1.7, -2.4), Vec2::new(5.2, 3.1)] {
            let n = rotating_simplex_noise(p, 0.0);
            let dx = (rotating_simplex_noise(p + Vec2::X * h, 0.0).x
                - rotating_simplex_noise(p - Vec2::X * h, 0.0).x)
                / (2.0 * h);
            let dy = (rotating_simplex_noise(p + Vec2::Y * h, 0.0).x
                - rotating_simplex_noise(p - Vec2::Y * h, 0.0).x)
                / (2.0 * h);
            assert!((n.y - dx).abs() < 0.01, "d/dx {} vs {} at {}", n.y, dx, p);
            assert!((n.z - dy).abs() < 0.01, "d/dy {} vs {} at {}", n.z, dy, p);
        }
    }

    #[test]
    fn test_rotation_changes_the_pattern() {
        let p = Vec2::new(0.3, 0.7);
        let still = rotating_simplex_noise(p, 0.0);
        assert_eq!(still, rotating_simplex_noise(p, 0.0));
        assert!((still.x - rotating_simplex_noise(p, 1.0).x).abs() > 0.05);
        assert!(rotating_simplex_noise(p, 0.0).x.abs() <= 1.05);
    }

    #[test]
    fn test_single_octave_fbm_is_simplex() {
        let p = Vec3::new(0.3, 0.6, 0.9);
        assert_relative_eq!(fbm(p, 1.0, 1, 0.4), simplex_noise(p));
    }

    #[test]
    fn test_fbm_octave_clamping() {
        let p = Vec3::new(0.3, 0.6, 0.9);
        assert_eq!(fbm(p, 1.0, 0, 2.0), 0.0);
        assert_eq!(fbm(p, 1.0, -5, 2.0), 0.0);
        assert_eq!(fbm(p, 1.0, 1000, 2.0), fbm(p, 1.0, MAX_OCTAVES, 2.0));
    }
}
