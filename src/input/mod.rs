//! Pointer state, input events and the landmark stream.

pub mod adapter;
pub mod landmarks;
pub mod pointer;

pub use adapter::{InputAdapter, InputEvent, Key, SplatRequest};
pub use landmarks::{HandRecord, LandmarkSource};
pub use pointer::{Pointer, PointerId, PointerRegistry};
