use serde::{Deserialize, Serialize};

/// Runtime configuration for the solver, the post effects and the splat
/// injection model.
///
/// All fields may be changed between frames. Toggling `shading`, `bloom` or
/// `sunrays` swaps the display shader variant on the next composite; changing
/// a resolution rebuilds the affected render targets at the next frame start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Minor-axis texel count of the velocity/pressure grid
    pub sim_resolution: u32,
    /// Minor-axis texel count of the visible dye grid
    pub dye_resolution: u32,
    /// Minor-axis texel count of the bloom chain base
    pub bloom_resolution: u32,
    /// Minor-axis texel count of the sunrays buffers
    pub sunrays_resolution: u32,

    /// Dye fade rate, applied as 1 / (1 + k * dt) per step
    pub density_dissipation: f32,
    /// Velocity fade rate, same form
    pub velocity_dissipation: f32,
    /// Multiplicative decay of the previous frame's pressure (warm start)
    pub pressure: f32,
    /// Jacobi iterations per pressure solve
    pub pressure_iterations: u32,
    /// Vorticity confinement strength
    pub curl: f32,

    /// Normalized splat radius
    pub splat_radius: f32,
    /// Momentum injected per unit of pointer movement
    pub splat_force: f32,

    pub shading: bool,
    pub colorful: bool,
    /// Pointer recolor rate; the palette rotates when the accumulated
    /// dt * speed crosses 1.0
    pub color_update_speed: f32,
    pub paused: bool,
    /// Composite over a checkerboard instead of `back_color`
    pub transparent: bool,
    /// sRGB fill behind the dye when not transparent
    pub back_color: [f32; 3],

    pub bloom: bool,
    pub bloom_iterations: u32,
    pub bloom_intensity: f32,
    pub bloom_threshold: f32,
    pub bloom_soft_knee: f32,

    pub sunrays: bool,
    pub sunrays_weight: f32,

    /// Allocate the pressure pair as full 32-bit float when the adapter can
    /// render to it; the Jacobi solve is the one place half precision runs
    /// out of headroom at high curl.
    pub high_precision_pressure: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sim_resolution: 128,
            dye_resolution: 1024,
            bloom_resolution: 256,
            sunrays_resolution: 196,

            density_dissipation: 1.0,
            velocity_dissipation: 0.2,
            pressure: 0.8,
            pressure_iterations: 20,
            curl: 30.0,

            splat_radius: 0.25,
            splat_force: 6000.0,

            shading: true,
            colorful: true,
            color_update_speed: 10.0,
            paused: false,
            transparent: false,
            back_color: [0.0, 0.0, 0.0],

            bloom: true,
            bloom_iterations: 8,
            bloom_intensity: 0.8,
            bloom_threshold: 0.6,
            bloom_soft_knee: 0.7,

            sunrays: true,
            sunrays_weight: 1.0,

            high_precision_pressure: false,
        }
    }
}

impl SimConfig {
    /// Soft-knee curve for the bloom prefilter:
    /// `(threshold - knee, 2 * knee, 0.25 / knee)`.
    pub fn bloom_curve(&self) -> [f32; 3] {
        let knee = (self.bloom_threshold * self.bloom_soft_knee + 0.0001).max(0.0001);
        [self.bloom_threshold - knee, knee * 2.0, 0.25 / knee]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_spec_ranges() {
        let c = SimConfig::default();
        assert!(c.sim_resolution > 0 && c.dye_resolution > 0);
        assert!(c.bloom_resolution > 0 && c.sunrays_resolution > 0);
        assert!(c.density_dissipation >= 0.0);
        assert!(c.velocity_dissipation >= 0.0);
        assert!((0.0..=1.0).contains(&c.pressure));
        assert!((20..=50).contains(&c.pressure_iterations));
        assert!(c.curl >= 0.0);
        assert!(c.bloom_iterations > 0);
    }

    #[test]
    fn bloom_curve_matches_soft_knee_form() {
        let c = SimConfig::default();
        let knee = c.bloom_threshold * c.bloom_soft_knee + 0.0001;
        let curve = c.bloom_curve();
        assert!((curve[0] - (c.bloom_threshold - knee)).abs() < 1e-6);
        assert!((curve[1] - 2.0 * knee).abs() < 1e-6);
        assert!((curve[2] - 0.25 / knee).abs() < 1e-6);
    }

    #[test]
    fn config_round_trips_through_serde() {
        let c = SimConfig {
            dye_resolution: 512,
            bloom: false,
            ..SimConfig::default()
        };
        let text = serde_json::to_string(&c).unwrap();
        let back: SimConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.dye_resolution, 512);
        assert!(!back.bloom);
    }
}
