//! WGSL sources and compile-time keyword composition.
//!
//! Each kernel file declares its `Params` struct and fragment stage; the
//! shared full-screen vertex stage is concatenated in at compose time (WGSL
//! module-scope declarations are order-independent). Keywords become `const`
//! bool declarations prepended to the source, so disabled branches fold away
//! at pipeline creation.

pub mod src {
    pub const COMMON: &str = include_str!("../../shaders/common.wgsl");

    pub const COPY: &str = include_str!("../../shaders/copy.wgsl");
    pub const CLEAR: &str = include_str!("../../shaders/clear.wgsl");
    pub const COLOR: &str = include_str!("../../shaders/color.wgsl");
    pub const CHECKERBOARD: &str = include_str!("../../shaders/checkerboard.wgsl");
    pub const SPLAT: &str = include_str!("../../shaders/splat.wgsl");
    pub const ADVECTION: &str = include_str!("../../shaders/advection.wgsl");
    pub const DIVERGENCE: &str = include_str!("../../shaders/divergence.wgsl");
    pub const CURL: &str = include_str!("../../shaders/curl.wgsl");
    pub const VORTICITY: &str = include_str!("../../shaders/vorticity.wgsl");
    pub const PRESSURE: &str = include_str!("../../shaders/pressure.wgsl");
    pub const GRADIENT_SUBTRACT: &str = include_str!("../../shaders/gradient_subtract.wgsl");
    pub const BLUR: &str = include_str!("../../shaders/blur.wgsl");
    pub const BLOOM_PREFILTER: &str = include_str!("../../shaders/bloom_prefilter.wgsl");
    pub const BLOOM_BLUR: &str = include_str!("../../shaders/bloom_blur.wgsl");
    pub const BLOOM_FINAL: &str = include_str!("../../shaders/bloom_final.wgsl");
    pub const SUNRAYS_MASK: &str = include_str!("../../shaders/sunrays_mask.wgsl");
    pub const SUNRAYS: &str = include_str!("../../shaders/sunrays.wgsl");
    pub const DISPLAY: &str = include_str!("../../shaders/display.wgsl");
}

/// Compose a kernel source with the shared vertex stage and keyword consts.
pub fn compose(source: &str, keywords: &[(&str, bool)]) -> String {
    let mut out = String::new();
    for (name, value) in keywords {
        out.push_str("const ");
        out.push_str(name);
        out.push_str(": bool = ");
        out.push_str(if *value { "true" } else { "false" });
        out.push_str(";\n");
    }
    out.push_str(src::COMMON);
    out.push('\n');
    out.push_str(source);
    out
}

/// Compose a source that carries its own vertex stage (the separable blur).
pub fn compose_standalone(source: &str) -> String {
    source.to_string()
}

pub const SHADING_BIT: u8 = 1 << 0;
pub const BLOOM_BIT: u8 = 1 << 1;
pub const SUNRAYS_BIT: u8 = 1 << 2;

/// Bitmask identifying a display shader variant.
pub fn display_mask(shading: bool, bloom: bool, sunrays: bool) -> u8 {
    (shading as u8) * SHADING_BIT + (bloom as u8) * BLOOM_BIT + (sunrays as u8) * SUNRAYS_BIT
}

/// Keyword set for a display variant bitmask.
pub fn display_keywords(mask: u8) -> [(&'static str, bool); 3] {
    [
        ("SHADING", mask & SHADING_BIT != 0),
        ("BLOOM", mask & BLOOM_BIT != 0),
        ("SUNRAYS", mask & SUNRAYS_BIT != 0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_round_trips_through_keywords() {
        for mask in 0u8..8 {
            let kw = display_keywords(mask);
            assert_eq!(display_mask(kw[0].1, kw[1].1, kw[2].1), mask);
        }
    }

    #[test]
    fn compose_prepends_keyword_consts() {
        let composed = compose("fn f() {}", &[("MANUAL_FILTERING", true)]);
        assert!(composed.starts_with("const MANUAL_FILTERING: bool = true;\n"));
        assert!(composed.contains("vs_main"));
        assert!(composed.ends_with("fn f() {}"));
    }

    #[test]
    fn every_kernel_declares_a_params_struct() {
        for source in [
            src::COPY,
            src::CLEAR,
            src::COLOR,
            src::CHECKERBOARD,
            src::SPLAT,
            src::ADVECTION,
            src::DIVERGENCE,
            src::CURL,
            src::VORTICITY,
            src::PRESSURE,
            src::GRADIENT_SUBTRACT,
            src::BLUR,
            src::BLOOM_PREFILTER,
            src::BLOOM_BLUR,
            src::BLOOM_FINAL,
            src::SUNRAYS_MASK,
            src::SUNRAYS,
            src::DISPLAY,
        ] {
            assert!(source.contains("struct Params"));
            assert!(source.contains("fs_main"));
        }
    }
}
