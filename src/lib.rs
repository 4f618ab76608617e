//! # inkflow: real-time 2D fluid simulation on the GPU
//!
//! inkflow integrates the incompressible Navier-Stokes equations on a pair of
//! GPU-resident texture grids and composites the advected dye to a surface
//! with optional bloom and radial light-scattering effects. Injection comes
//! from pointers (mouse, touch) or an external hand-landmark stream.
//!
//! ## Architecture
//!
//! - [`gpu`] — device acquisition, half-float format probing, render targets
//!   and ping-pong pairs, the shared full-screen quad.
//! - [`rendering`] — the WGSL kernel set with keyword variants, the bloom and
//!   sunrays chains, the display compositor.
//! - [`simulation`] — field textures on the coarse simulation grid and the
//!   fine dye grid, the eight-pass operator-splitting stepper, and
//!   [`simulation::Simulator`] which owns everything.
//! - [`input`] — the pointer registry, the event adapter and the landmark
//!   stream interface.
//!
//! Per frame the data flows one way:
//!
//! ```text
//! input events -> pointer state -> splats -> step -> post effects -> display
//! ```
//!
//! ## Driving it
//!
//! The host owns the window and surface; [`app::run`] is the reference
//! driver. The core loop is three calls:
//!
//! ```ignore
//! simulator.handle_event(event);   // as input arrives
//! simulator.update(dt);            // once per frame
//! simulator.render(&surface_view); // once per frame
//! ```
//!
//! All GPU resources live in the [`simulation::Simulator`]; components
//! borrow them for the duration of a call, and a resize swaps every affected
//! target in one step between frames.

pub mod app;
pub mod config;
pub mod error;
pub mod gpu;
pub mod input;
pub mod rendering;
pub mod simulation;

pub use config::SimConfig;
pub use error::FluidError;
pub use input::{HandRecord, InputEvent, Key, LandmarkSource};
pub use simulation::Simulator;
