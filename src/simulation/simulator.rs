//! Top-level simulator.
//!
//! Owns the GPU context, every kernel and field texture, the post-effect
//! chains, the pointer registry and the configuration. The host drives it
//! with `handle_event` / `poll_landmarks` as input arrives, then once per
//! frame `update(dt)` followed by `render(target)`.

use std::path::Path;

use glam::Vec2;
use rand::Rng;

use super::fields::{grid_resolution, FieldSet};
use super::stepper::{splat_radius_uv, Stepper};
use crate::config::SimConfig;
use crate::error::FluidError;
use crate::gpu::{FullscreenQuad, GpuContext};
use crate::input::{InputAdapter, InputEvent, LandmarkSource, PointerRegistry, SplatRequest};
use crate::rendering::{Bloom, Compositor, DisplayInputs, DitherTexture, Sunrays};

/// Integration is clamped to this step so a stalled frame scheduler cannot
/// blow up the advection on resume.
pub const MAX_DT: f32 = 0.05;

const DITHER_PATH: &str = "assets/dither.png";

pub fn clamp_dt(dt: f32) -> f32 {
    dt.clamp(0.0, MAX_DT)
}

pub struct Simulator {
    ctx: GpuContext,
    quad: FullscreenQuad,
    stepper: Stepper,
    fields: FieldSet,
    bloom: Bloom,
    sunrays: Sunrays,
    compositor: Compositor,
    dither: DitherTexture,

    pointers: PointerRegistry,
    input: InputAdapter,
    config: SimConfig,
    surface_size: (u32, u32),
    applied_resolutions: (u32, u32, u32, u32, u32),
}

impl Simulator {
    pub fn new(
        adapter: &wgpu::Adapter,
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
        mut config: SimConfig,
    ) -> Result<Self, FluidError> {
        let ctx = GpuContext::new(adapter)?;
        let quad = FullscreenQuad::new(&ctx.device);

        let fields = FieldSet::new(&ctx, &config, surface_size)?;
        let stepper = Stepper::new(&ctx, fields.pressure_format())?;
        let bloom = Bloom::new(
            &ctx,
            grid_resolution(surface_size, config.bloom_resolution),
            config.bloom_iterations,
        )?;
        let sunrays = Sunrays::new(
            &ctx,
            grid_resolution(surface_size, config.sunrays_resolution),
        )?;

        let dither = match DitherTexture::load(&ctx, Path::new(DITHER_PATH)) {
            Ok(dither) => dither,
            Err(e) => {
                log::warn!("{e}; bloom disabled");
                config.bloom = false;
                DitherTexture::fallback(&ctx)
            }
        };
        let compositor = Compositor::new(&ctx, surface_format, &config)?;

        // Seed the canvas the way the original does on load
        let mut input = InputAdapter::new();
        input.queue_burst(rand::thread_rng().gen_range(5..25));

        let applied_resolutions = applied_resolutions(&config);
        Ok(Self {
            ctx,
            quad,
            stepper,
            fields,
            bloom,
            sunrays,
            compositor,
            dither,
            pointers: PointerRegistry::new(),
            input,
            config,
            surface_size,
            applied_resolutions,
        })
    }

    /// Device handle for host-side surface configuration.
    pub fn device(&self) -> &wgpu::Device {
        &self.ctx.device
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SimConfig {
        &mut self.config
    }

    pub fn pointers(&self) -> &PointerRegistry {
        &self.pointers
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Keyword set the active display program carries, for the frame driver
    /// and tests.
    pub fn display_mask(&self) -> u8 {
        self.compositor.active_mask()
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        let surface = (self.surface_size.0 as f32, self.surface_size.1 as f32);
        self.input
            .handle_event(event, &mut self.pointers, surface, &mut self.config);
    }

    /// Poll the landmark source once; call at most once per frame.
    pub fn poll_landmarks(&mut self, source: &mut dyn LandmarkSource) {
        let hands = source.poll();
        let surface = (self.surface_size.0 as f32, self.surface_size.1 as f32);
        self.input
            .apply_landmarks(&hands, &mut self.pointers, surface);
    }

    pub fn queue_splat_burst(&mut self, count: u32) {
        self.input.queue_burst(count);
    }

    /// React to a surface resize. On allocation failure the old targets stay
    /// live and the next resize retries.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), FluidError> {
        if width == 0 || height == 0 || (width, height) == self.surface_size {
            return Ok(());
        }
        self.surface_size = (width, height);
        self.rebuild_targets()
    }

    /// One frame of input application and simulation.
    pub fn update(&mut self, dt: f32) {
        let dt = clamp_dt(dt);

        if self.applied_resolutions != applied_resolutions(&self.config) {
            if let Err(e) = self.rebuild_targets() {
                log::error!("render target rebuild failed, skipping frame: {e}");
                return;
            }
        }

        if self.config.colorful {
            self.pointers
                .advance_colors(dt, self.config.color_update_speed);
        }

        let requests = self.input.frame(&mut self.pointers, &self.config);
        for request in requests {
            self.apply_splat(&request);
        }

        if self.config.paused {
            return;
        }

        // A device error inside the step pauses the simulation instead of
        // propagating; the user can resume after the log line.
        self.ctx
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);
        self.stepper
            .step(&self.ctx, &self.quad, &mut self.fields, &self.config, dt);
        let _ = self.ctx.device.poll(wgpu::PollType::Poll);
        if let Some(e) = pollster::block_on(self.ctx.device.pop_error_scope()) {
            self.config.paused = true;
            let err = FluidError::Step(e.to_string());
            log::error!("{err}; pausing until resumed");
        }
    }

    /// Post effects and the composite onto `target`.
    pub fn render(&mut self, target: &wgpu::TextureView) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if self.config.bloom {
            self.bloom.apply(
                &self.ctx,
                &self.quad,
                &mut encoder,
                self.fields.dye.read().view(),
                &self.config,
            );
        }
        if self.config.sunrays {
            self.sunrays.apply(
                &self.ctx,
                &self.quad,
                &mut encoder,
                self.fields.dye.read().view(),
                &self.config,
            );
        }

        let inputs = DisplayInputs {
            dye: self.fields.dye.read().view(),
            bloom: self.bloom.target().view(),
            sunrays: self.sunrays.target().view(),
            dither: self.dither.view(),
            dye_texel_size: self.fields.dye.texel_size(),
            dither_scale: self
                .dither
                .scale(self.surface_size.0, self.surface_size.1),
        };
        self.compositor.render(
            &self.ctx,
            &self.quad,
            &mut encoder,
            target,
            &inputs,
            &self.config,
            self.surface_size,
        );

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn rebuild_targets(&mut self) -> Result<(), FluidError> {
        self.fields
            .resize(&self.ctx, &self.quad, &self.config, self.surface_size)?;
        self.bloom.resize(
            &self.ctx,
            grid_resolution(self.surface_size, self.config.bloom_resolution),
            self.config.bloom_iterations,
        )?;
        self.sunrays.resize(
            &self.ctx,
            grid_resolution(self.surface_size, self.config.sunrays_resolution),
        )?;
        self.applied_resolutions = applied_resolutions(&self.config);
        Ok(())
    }

    /// Convert a splat request from pointer space (origin bottom-left) to
    /// texture space and draw it into velocity and dye.
    fn apply_splat(&mut self, request: &SplatRequest) {
        let aspect_ratio = self.surface_size.0 as f32 / self.surface_size.1 as f32;
        let position = Vec2::new(request.position.x, 1.0 - request.position.y);
        let velocity_delta = Vec2::new(request.delta.x, -request.delta.y);
        let radius = splat_radius_uv(self.config.splat_radius, request.radius_scale);
        self.stepper.splat(
            &self.ctx,
            &self.quad,
            &mut self.fields,
            aspect_ratio,
            position,
            velocity_delta,
            request.color,
            radius,
        );
    }
}

fn applied_resolutions(config: &SimConfig) -> (u32, u32, u32, u32, u32) {
    (
        config.sim_resolution,
        config.dye_resolution,
        config.bloom_resolution,
        config.sunrays_resolution,
        config.bloom_iterations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_is_clamped_to_the_stability_window() {
        assert_eq!(clamp_dt(0.0), 0.0);
        assert_eq!(clamp_dt(1.0 / 60.0), 1.0 / 60.0);
        assert_eq!(clamp_dt(0.06), MAX_DT);
        assert_eq!(clamp_dt(-0.01), 0.0);
    }
}
