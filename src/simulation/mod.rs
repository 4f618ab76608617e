//! The fluid solver: field textures, the operator-splitting stepper and the
//! top-level simulator.

pub mod fields;
pub mod simulator;
pub mod stepper;

pub use fields::{grid_resolution, FieldSet};
pub use simulator::{clamp_dt, Simulator, MAX_DT};
pub use stepper::{splat_radius_uv, Stepper};
