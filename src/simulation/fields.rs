//! Field textures at the two grid resolutions.
//!
//! Velocity, pressure, divergence and curl live on the coarse simulation
//! grid; the visible dye field lives on the fine dye grid. Both grids keep
//! the aspect ratio of the drawing surface. On resize, velocity and dye are
//! re-sampled into the new allocation so the visible state survives; the
//! solver scratch fields are simply recreated.

use crate::config::SimConfig;
use crate::error::FluidError;
use crate::gpu::{DoubleTarget, FullscreenQuad, GpuContext, RenderTarget};
use crate::rendering::kernel::{Kernel, TexelParams};
use crate::rendering::shaders::{self, compose};

pub struct FieldSet {
    pub velocity: DoubleTarget,
    pub dye: DoubleTarget,
    pub pressure: DoubleTarget,
    pub divergence: RenderTarget,
    pub curl: RenderTarget,

    copy_dye: Kernel,
    copy_velocity: Kernel,
    pressure_format: wgpu::TextureFormat,
    sim_size: (u32, u32),
    dye_size: (u32, u32),
}

impl FieldSet {
    pub fn new(
        ctx: &GpuContext,
        config: &SimConfig,
        surface: (u32, u32),
    ) -> Result<Self, FluidError> {
        let sim_size = grid_resolution(surface, config.sim_resolution);
        let dye_size = grid_resolution(surface, config.dye_resolution);
        let pressure_format = pressure_format(ctx, config);

        let copy_dye = Kernel::new(
            ctx,
            "Copy Dye",
            &compose(shaders::src::COPY, &[]),
            std::mem::size_of::<TexelParams>() as u64,
            1,
            ctx.formats.rgba,
            None,
        )?;
        let copy_velocity = Kernel::new(
            ctx,
            "Copy Velocity",
            &compose(shaders::src::COPY, &[]),
            std::mem::size_of::<TexelParams>() as u64,
            1,
            ctx.formats.rg,
            None,
        )?;

        Ok(Self {
            velocity: DoubleTarget::new(ctx, "Velocity", sim_size.0, sim_size.1, ctx.formats.rg)?,
            dye: DoubleTarget::new(ctx, "Dye", dye_size.0, dye_size.1, ctx.formats.rgba)?,
            pressure: DoubleTarget::new(ctx, "Pressure", sim_size.0, sim_size.1, pressure_format)?,
            divergence: RenderTarget::new(
                ctx,
                "Divergence",
                sim_size.0,
                sim_size.1,
                ctx.formats.r,
            )?,
            curl: RenderTarget::new(ctx, "Curl", sim_size.0, sim_size.1, ctx.formats.r)?,
            copy_dye,
            copy_velocity,
            pressure_format,
            sim_size,
            dye_size,
        })
    }

    pub fn sim_size(&self) -> (u32, u32) {
        self.sim_size
    }

    pub fn dye_size(&self) -> (u32, u32) {
        self.dye_size
    }

    pub fn pressure_format(&self) -> wgpu::TextureFormat {
        self.pressure_format
    }

    /// Re-derive both grids from the surface size and rebuild what changed.
    /// Velocity and dye contents are preserved under re-sampling; pressure,
    /// divergence and curl restart from scratch.
    pub fn resize(
        &mut self,
        ctx: &GpuContext,
        quad: &FullscreenQuad,
        config: &SimConfig,
        surface: (u32, u32),
    ) -> Result<(), FluidError> {
        let sim_size = grid_resolution(surface, config.sim_resolution);
        let dye_size = grid_resolution(surface, config.dye_resolution);

        if dye_size != self.dye_size {
            resize_double(ctx, quad, &self.copy_dye, &mut self.dye, dye_size)?;
            self.dye_size = dye_size;
        }
        if sim_size != self.sim_size {
            resize_double(ctx, quad, &self.copy_velocity, &mut self.velocity, sim_size)?;
            self.pressure = DoubleTarget::new(
                ctx,
                "Pressure",
                sim_size.0,
                sim_size.1,
                self.pressure_format,
            )?;
            self.divergence =
                RenderTarget::new(ctx, "Divergence", sim_size.0, sim_size.1, ctx.formats.r)?;
            self.curl = RenderTarget::new(ctx, "Curl", sim_size.0, sim_size.1, ctx.formats.r)?;
            self.sim_size = sim_size;
        }
        Ok(())
    }
}

/// Resize a ping-pong pair: `read` is re-sampled into the new allocation so
/// contents survive, `write` comes back fresh. Same-size calls are no-ops.
fn resize_double(
    ctx: &GpuContext,
    quad: &FullscreenQuad,
    copy: &Kernel,
    pair: &mut DoubleTarget,
    size: (u32, u32),
) -> Result<(), FluidError> {
    if (pair.width(), pair.height()) == size {
        return Ok(());
    }
    let format = pair.format();

    let new_read = RenderTarget::new(ctx, pair.read().label(), size.0, size.1, format)?;
    copy.write_params(&ctx.queue, &TexelParams::new(pair.read().texel_size()));
    let bind = copy.bind(ctx, &[pair.read().view()]);

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Resize Copy Encoder"),
        });
    {
        let mut pass = new_read.begin_pass(&mut encoder, true);
        pass.set_pipeline(copy.pipeline());
        pass.set_bind_group(0, &bind, &[]);
        quad.draw(&mut pass);
    }
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let new_write = RenderTarget::new(ctx, pair.write().label(), size.0, size.1, format)?;
    pair.replace_read(new_read);
    pair.replace_write(new_write);
    Ok(())
}

/// Grid size for a configured minor-axis resolution: the minor axis takes the
/// resolution, the major axis is rounded to preserve the surface aspect.
pub fn grid_resolution(surface: (u32, u32), resolution: u32) -> (u32, u32) {
    let mut aspect = surface.0 as f32 / surface.1 as f32;
    if aspect < 1.0 {
        aspect = 1.0 / aspect;
    }
    let min = resolution;
    let max = (resolution as f32 * aspect).round() as u32;
    if surface.0 > surface.1 {
        (max, min)
    } else {
        (min, max)
    }
}

fn pressure_format(ctx: &GpuContext, config: &SimConfig) -> wgpu::TextureFormat {
    if config.high_precision_pressure && ctx.formats.float32_pressure {
        wgpu::TextureFormat::R32Float
    } else {
        ctx.formats.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_surface_widens_the_major_axis() {
        assert_eq!(grid_resolution((640, 480), 128), (171, 128));
        assert_eq!(grid_resolution((1920, 1080), 128), (228, 128));
    }

    #[test]
    fn portrait_surface_transposes() {
        assert_eq!(grid_resolution((480, 640), 128), (128, 171));
    }

    #[test]
    fn square_surface_is_square() {
        assert_eq!(grid_resolution((512, 512), 128), (128, 128));
    }

    #[test]
    fn grid_aspect_tracks_surface_aspect() {
        let (w, h) = grid_resolution((640, 480), 128);
        let grid_aspect = w as f32 / h as f32;
        let surface_aspect = 640.0 / 480.0;
        assert!((grid_aspect - surface_aspect).abs() < 0.01);
    }
}
