use thiserror::Error;

/// Failure taxonomy for the simulator.
///
/// `UnsupportedGpu` is fatal at startup. Allocation and shader errors bubble
/// up to the frame driver, which decides whether to abort or degrade;
/// per-frame errors never propagate across frames.
#[derive(Debug, Error)]
pub enum FluidError {
    /// The adapter cannot render to half-float color targets.
    #[error("required GPU capabilities are unavailable: {0}")]
    UnsupportedGpu(String),

    /// A texture or framebuffer allocation failed.
    #[error("GPU resource allocation failed for `{label}`: {message}")]
    ResourceAlloc { label: String, message: String },

    /// A WGSL module failed to compile.
    #[error("shader `{name}` failed to compile: {message}")]
    ShaderCompile { name: String, message: String },

    /// A pipeline failed validation after its module compiled.
    #[error("pipeline `{name}` failed to build: {message}")]
    PipelineBuild { name: String, message: String },

    /// A simulation pass raised a device error.
    #[error("simulation step failed: {0}")]
    Step(String),

    /// An asset (the bloom dithering texture) could not be loaded.
    #[error("failed to load asset `{path}`: {message}")]
    AssetLoad { path: String, message: String },
}
