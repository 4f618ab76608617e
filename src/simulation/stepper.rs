//! The operator-splitting simulation step and the splat injection passes.
//!
//! One frame advances (velocity, dye) through eight sub-passes in fixed
//! order: curl, vorticity confinement, divergence, pressure fade, the Jacobi
//! pressure solve, gradient subtraction, velocity self-advection and dye
//! advection. Every pass samples `read` and rasterizes into `write`; the
//! pair swaps once the pass is encoded. All passes of a frame go through one
//! command encoder so the queue sees them in program order.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use super::fields::FieldSet;
use crate::config::SimConfig;
use crate::error::FluidError;
use crate::gpu::{FullscreenQuad, GpuContext};
use crate::rendering::kernel::{Kernel, TexelParams};
use crate::rendering::shaders::{self, compose};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ClearParams {
    texel_size: [f32; 2],
    value: f32,
    _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct VorticityParams {
    texel_size: [f32; 2],
    curl: f32,
    dt: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct AdvectionParams {
    texel_size: [f32; 2],
    dye_texel_size: [f32; 2],
    dt: f32,
    dissipation: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SplatParams {
    texel_size: [f32; 2],
    aspect_ratio: f32,
    radius: f32,
    point: [f32; 2],
    _pad: [f32; 2],
    color: [f32; 4],
}

pub struct Stepper {
    curl: Kernel,
    vorticity: Kernel,
    divergence: Kernel,
    clear_pressure: Kernel,
    pressure: Kernel,
    gradient_subtract: Kernel,
    advect_velocity: Kernel,
    advect_dye: Kernel,
    splat_velocity: Kernel,
    splat_dye: Kernel,
}

impl Stepper {
    pub fn new(ctx: &GpuContext, pressure_format: wgpu::TextureFormat) -> Result<Self, FluidError> {
        let rg = ctx.formats.rg;
        let rgba = ctx.formats.rgba;
        let r = ctx.formats.r;
        let texel_size = std::mem::size_of::<TexelParams>() as u64;

        let advection_src = compose(
            shaders::src::ADVECTION,
            &[("MANUAL_FILTERING", !ctx.formats.linear_filtering)],
        );

        Ok(Self {
            curl: Kernel::new(
                ctx,
                "Curl",
                &compose(shaders::src::CURL, &[]),
                texel_size,
                1,
                r,
                None,
            )?,
            vorticity: Kernel::new(
                ctx,
                "Vorticity",
                &compose(shaders::src::VORTICITY, &[]),
                std::mem::size_of::<VorticityParams>() as u64,
                2,
                rg,
                None,
            )?,
            divergence: Kernel::new(
                ctx,
                "Divergence",
                &compose(shaders::src::DIVERGENCE, &[]),
                texel_size,
                1,
                r,
                None,
            )?,
            clear_pressure: Kernel::new(
                ctx,
                "Pressure Fade",
                &compose(shaders::src::CLEAR, &[]),
                std::mem::size_of::<ClearParams>() as u64,
                1,
                pressure_format,
                None,
            )?,
            pressure: Kernel::new(
                ctx,
                "Pressure Solve",
                &compose(shaders::src::PRESSURE, &[]),
                texel_size,
                2,
                pressure_format,
                None,
            )?,
            gradient_subtract: Kernel::new(
                ctx,
                "Gradient Subtract",
                &compose(shaders::src::GRADIENT_SUBTRACT, &[]),
                texel_size,
                2,
                rg,
                None,
            )?,
            advect_velocity: Kernel::new(
                ctx,
                "Advect Velocity",
                &advection_src,
                std::mem::size_of::<AdvectionParams>() as u64,
                2,
                rg,
                None,
            )?,
            advect_dye: Kernel::new(
                ctx,
                "Advect Dye",
                &advection_src,
                std::mem::size_of::<AdvectionParams>() as u64,
                2,
                rgba,
                None,
            )?,
            splat_velocity: Kernel::new(
                ctx,
                "Splat Velocity",
                &compose(shaders::src::SPLAT, &[]),
                std::mem::size_of::<SplatParams>() as u64,
                1,
                rg,
                None,
            )?,
            splat_dye: Kernel::new(
                ctx,
                "Splat Dye",
                &compose(shaders::src::SPLAT, &[]),
                std::mem::size_of::<SplatParams>() as u64,
                1,
                rgba,
                None,
            )?,
        })
    }

    /// Advance the fields by one clamped time step.
    pub fn step(
        &self,
        ctx: &GpuContext,
        quad: &FullscreenQuad,
        fields: &mut FieldSet,
        config: &SimConfig,
        dt: f32,
    ) {
        let sim_texel = fields.velocity.texel_size();
        let dye_texel = fields.dye.texel_size();

        self.curl.write_params(&ctx.queue, &TexelParams::new(sim_texel));
        self.vorticity.write_params(
            &ctx.queue,
            &VorticityParams {
                texel_size: sim_texel.to_array(),
                curl: config.curl,
                dt,
            },
        );
        self.divergence
            .write_params(&ctx.queue, &TexelParams::new(sim_texel));
        self.clear_pressure.write_params(
            &ctx.queue,
            &ClearParams {
                texel_size: sim_texel.to_array(),
                value: config.pressure,
                _pad: 0.0,
            },
        );
        self.pressure
            .write_params(&ctx.queue, &TexelParams::new(sim_texel));
        self.gradient_subtract
            .write_params(&ctx.queue, &TexelParams::new(sim_texel));
        self.advect_velocity.write_params(
            &ctx.queue,
            &AdvectionParams {
                texel_size: sim_texel.to_array(),
                dye_texel_size: sim_texel.to_array(),
                dt,
                dissipation: config.velocity_dissipation,
                _pad: [0.0; 2],
            },
        );
        self.advect_dye.write_params(
            &ctx.queue,
            &AdvectionParams {
                texel_size: sim_texel.to_array(),
                dye_texel_size: dye_texel.to_array(),
                dt,
                dissipation: config.density_dissipation,
                _pad: [0.0; 2],
            },
        );

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Simulation Step Encoder"),
            });

        {
            let bind = self.curl.bind(ctx, &[fields.velocity.read().view()]);
            let mut pass = fields.curl.begin_pass(&mut encoder, false);
            pass.set_pipeline(self.curl.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }

        {
            let bind = self
                .vorticity
                .bind(ctx, &[fields.velocity.read().view(), fields.curl.view()]);
            let mut pass = fields.velocity.write().begin_pass(&mut encoder, false);
            pass.set_pipeline(self.vorticity.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
        fields.velocity.swap();

        {
            let bind = self.divergence.bind(ctx, &[fields.velocity.read().view()]);
            let mut pass = fields.divergence.begin_pass(&mut encoder, false);
            pass.set_pipeline(self.divergence.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }

        {
            let bind = self
                .clear_pressure
                .bind(ctx, &[fields.pressure.read().view()]);
            let mut pass = fields.pressure.write().begin_pass(&mut encoder, false);
            pass.set_pipeline(self.clear_pressure.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
        fields.pressure.swap();

        for _ in 0..config.pressure_iterations {
            let bind = self.pressure.bind(
                ctx,
                &[fields.pressure.read().view(), fields.divergence.view()],
            );
            {
                let mut pass = fields.pressure.write().begin_pass(&mut encoder, false);
                pass.set_pipeline(self.pressure.pipeline());
                pass.set_bind_group(0, &bind, &[]);
                quad.draw(&mut pass);
            }
            fields.pressure.swap();
        }

        {
            let bind = self.gradient_subtract.bind(
                ctx,
                &[fields.pressure.read().view(), fields.velocity.read().view()],
            );
            let mut pass = fields.velocity.write().begin_pass(&mut encoder, false);
            pass.set_pipeline(self.gradient_subtract.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
        fields.velocity.swap();

        {
            let bind = self.advect_velocity.bind(
                ctx,
                &[fields.velocity.read().view(), fields.velocity.read().view()],
            );
            let mut pass = fields.velocity.write().begin_pass(&mut encoder, false);
            pass.set_pipeline(self.advect_velocity.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
        fields.velocity.swap();

        {
            let bind = self.advect_dye.bind(
                ctx,
                &[fields.velocity.read().view(), fields.dye.read().view()],
            );
            let mut pass = fields.dye.write().begin_pass(&mut encoder, false);
            pass.set_pipeline(self.advect_dye.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
        fields.dye.swap();

        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Inject one Gaussian of momentum and dye. `position` and
    /// `velocity_delta` are already in texture space.
    pub fn splat(
        &self,
        ctx: &GpuContext,
        quad: &FullscreenQuad,
        fields: &mut FieldSet,
        aspect_ratio: f32,
        position: Vec2,
        velocity_delta: Vec2,
        color: Vec3,
        radius: f32,
    ) {
        self.splat_velocity.write_params(
            &ctx.queue,
            &SplatParams {
                texel_size: fields.velocity.texel_size().to_array(),
                aspect_ratio,
                radius,
                point: position.to_array(),
                _pad: [0.0; 2],
                color: [velocity_delta.x, velocity_delta.y, 0.0, 1.0],
            },
        );
        self.splat_dye.write_params(
            &ctx.queue,
            &SplatParams {
                texel_size: fields.dye.texel_size().to_array(),
                aspect_ratio,
                radius,
                point: position.to_array(),
                _pad: [0.0; 2],
                color: [color.x, color.y, color.z, 1.0],
            },
        );

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Splat Encoder"),
            });
        {
            let bind = self
                .splat_velocity
                .bind(ctx, &[fields.velocity.read().view()]);
            let mut pass = fields.velocity.write().begin_pass(&mut encoder, false);
            pass.set_pipeline(self.splat_velocity.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
        fields.velocity.swap();
        {
            let bind = self.splat_dye.bind(ctx, &[fields.dye.read().view()]);
            let mut pass = fields.dye.write().begin_pass(&mut encoder, false);
            pass.set_pipeline(self.splat_dye.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
        fields.dye.swap();
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Gaussian width in UV units for a configured splat radius; `scale` is the
/// per-splat multiplier (0.7 for the one-shot press splat).
pub fn splat_radius_uv(splat_radius: f32, scale: f32) -> f32 {
    ((splat_radius * scale) / 100.0).max(1.0e-6).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_radius_maps_to_five_percent_uv() {
        assert!((splat_radius_uv(0.25, 1.0) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn press_splat_is_narrower() {
        assert!(splat_radius_uv(0.25, 0.7) < splat_radius_uv(0.25, 1.0));
    }

    #[test]
    fn radius_never_reaches_zero() {
        assert!(splat_radius_uv(0.0, 1.0) > 0.0);
    }
}
