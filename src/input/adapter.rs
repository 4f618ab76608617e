//! Input adapter: raw events in, pointer operations and splat requests out.
//!
//! Events and landmark frames mutate the pointer registry as they arrive;
//! once per frame the adapter drains everything into a list of splat
//! requests for the simulator to draw. The adapter never touches the GPU.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use rand::Rng;

use super::landmarks::HandRecord;
use super::pointer::{generate_color, PointerId, PointerRegistry};
use crate::config::SimConfig;

/// Synthetic pointer ids for landmark-driven hands live above this base so
/// they never collide with host pointer ids.
const HAND_POINTER_BASE: PointerId = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    P,
    Space,
    Other,
}

/// Push-style event stream from the host surface. Coordinates are surface
/// pixels with origin at top-left, device pixel ratio already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { id: PointerId, x: f32, y: f32 },
    PointerMove { id: PointerId, x: f32, y: f32 },
    PointerUp { id: PointerId },
    PointerCancel { id: PointerId },
    Key { code: Key },
}

/// One pending Gaussian injection, in pointer coordinates (origin
/// bottom-left). `delta` already carries the force factor.
#[derive(Debug, Clone, Copy)]
pub struct SplatRequest {
    pub position: Vec2,
    pub delta: Vec2,
    pub color: Vec3,
    pub radius_scale: f32,
}

pub struct InputAdapter {
    splat_stack: Vec<u32>,
    pending: Vec<SplatRequest>,
    active_hands: BTreeMap<usize, PointerId>,
}

impl InputAdapter {
    pub fn new() -> Self {
        Self {
            splat_stack: Vec::new(),
            pending: Vec::new(),
            active_hands: BTreeMap::new(),
        }
    }

    /// Feed one host event. `surface` is the drawing-surface pixel size.
    pub fn handle_event(
        &mut self,
        event: InputEvent,
        pointers: &mut PointerRegistry,
        surface: (f32, f32),
        config: &mut SimConfig,
    ) {
        let (width, height) = surface;
        match event {
            InputEvent::PointerDown { id, x, y } => {
                pointers.down(id, x, y, width, height);
                if let Some(p) = pointers.get(id) {
                    self.pending.push(SplatRequest {
                        position: p.coord,
                        delta: Vec2::ZERO,
                        color: p.color,
                        radius_scale: 0.7,
                    });
                }
            }
            InputEvent::PointerMove { id, x, y } => {
                pointers.update_position(id, x, y, width, height);
            }
            InputEvent::PointerUp { id } => pointers.up(id),
            InputEvent::PointerCancel { id } => pointers.remove(id),
            InputEvent::Key { code } => match code {
                Key::P => config.paused = !config.paused,
                Key::Space => self
                    .splat_stack
                    .push(rand::thread_rng().gen_range(5..25)),
                Key::Other => {}
            },
        }
    }

    /// Consume a frame of landmark hands. An open hand pins a synthetic
    /// pointer to its index tip; closing or losing the hand removes it.
    pub fn apply_landmarks(
        &mut self,
        hands: &[HandRecord],
        pointers: &mut PointerRegistry,
        surface: (f32, f32),
    ) {
        let (width, height) = surface;
        for (index, hand) in hands.iter().enumerate() {
            let id = HAND_POINTER_BASE + index as PointerId;
            let tip = hand.index_tip();
            let (x, y) = (tip.x * width, tip.y * height);
            if hand.is_open {
                if self.active_hands.contains_key(&index) {
                    pointers.update_position(id, x, y, width, height);
                } else {
                    pointers.down(id, x, y, width, height);
                    self.active_hands.insert(index, id);
                }
            } else if self.active_hands.remove(&index).is_some() {
                pointers.remove(id);
            }
        }
        self.active_hands.retain(|&index, &mut id| {
            if index < hands.len() {
                true
            } else {
                pointers.remove(id);
                false
            }
        });
    }

    /// Queue a random-burst request, popped one per frame.
    pub fn queue_burst(&mut self, count: u32) {
        self.splat_stack.push(count);
    }

    /// Drain this frame's splats: one-shot requests from down events, one
    /// splat per moved-while-down pointer, plus one popped burst.
    pub fn frame(&mut self, pointers: &mut PointerRegistry, config: &SimConfig) -> Vec<SplatRequest> {
        let mut requests = std::mem::take(&mut self.pending);

        for pointer in pointers.iter_mut() {
            if pointer.down && pointer.moved {
                pointer.moved = false;
                requests.push(SplatRequest {
                    position: pointer.coord,
                    delta: pointer.delta * config.splat_force,
                    color: pointer.color,
                    radius_scale: 1.0,
                });
            }
        }

        if let Some(count) = self.splat_stack.pop() {
            let mut rng = rand::thread_rng();
            for _ in 0..count {
                requests.push(SplatRequest {
                    position: Vec2::new(rng.gen::<f32>(), rng.gen::<f32>()),
                    delta: Vec2::new(
                        1000.0 * (rng.gen::<f32>() - 0.5),
                        1000.0 * (rng.gen::<f32>() - 0.5),
                    ),
                    color: generate_color(&mut rng) * 10.0,
                    radius_scale: 1.0,
                });
            }
        }

        requests
    }
}

impl Default for InputAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::landmarks::{HandRecord, INDEX_TIP, LANDMARK_COUNT, THUMB_TIP};

    const SURFACE: (f32, f32) = (640.0, 480.0);

    fn open_hand_at(tip: Vec2) -> HandRecord {
        let mut landmarks = [tip; LANDMARK_COUNT];
        landmarks[THUMB_TIP] = tip + Vec2::new(0.3, 0.0);
        landmarks[INDEX_TIP] = tip;
        HandRecord::from_landmarks(landmarks)
    }

    fn closed_hand_at(tip: Vec2) -> HandRecord {
        let mut landmarks = [tip; LANDMARK_COUNT];
        landmarks[THUMB_TIP] = tip;
        landmarks[INDEX_TIP] = tip;
        HandRecord::from_landmarks(landmarks)
    }

    #[test]
    fn pointer_down_emits_one_shot_splat() {
        let mut adapter = InputAdapter::new();
        let mut pointers = PointerRegistry::new();
        let mut config = SimConfig::default();
        adapter.handle_event(
            InputEvent::PointerDown { id: 1, x: 320.0, y: 240.0 },
            &mut pointers,
            SURFACE,
            &mut config,
        );
        let requests = adapter.frame(&mut pointers, &config);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].delta, Vec2::ZERO);
        assert!((requests[0].radius_scale - 0.7).abs() < 1e-6);
    }

    #[test]
    fn moved_pointer_splats_once_per_frame() {
        let mut adapter = InputAdapter::new();
        let mut pointers = PointerRegistry::new();
        let mut config = SimConfig::default();
        adapter.handle_event(
            InputEvent::PointerDown { id: 1, x: 100.0, y: 240.0 },
            &mut pointers,
            SURFACE,
            &mut config,
        );
        adapter.frame(&mut pointers, &config);

        adapter.handle_event(
            InputEvent::PointerMove { id: 1, x: 164.0, y: 240.0 },
            &mut pointers,
            SURFACE,
            &mut config,
        );
        let requests = adapter.frame(&mut pointers, &config);
        assert_eq!(requests.len(), 1);
        assert!(requests[0].delta.x > 0.0);
        assert_eq!(requests[0].delta.y, 0.0);

        // moved was cleared, so the next frame is quiet
        assert!(adapter.frame(&mut pointers, &config).is_empty());
    }

    #[test]
    fn stationary_pointer_produces_no_splat() {
        let mut adapter = InputAdapter::new();
        let mut pointers = PointerRegistry::new();
        let mut config = SimConfig::default();
        adapter.handle_event(
            InputEvent::PointerDown { id: 1, x: 100.0, y: 240.0 },
            &mut pointers,
            SURFACE,
            &mut config,
        );
        adapter.frame(&mut pointers, &config);
        adapter.handle_event(
            InputEvent::PointerMove { id: 1, x: 100.0, y: 240.0 },
            &mut pointers,
            SURFACE,
            &mut config,
        );
        assert!(adapter.frame(&mut pointers, &config).is_empty());
    }

    #[test]
    fn key_p_toggles_pause() {
        let mut adapter = InputAdapter::new();
        let mut pointers = PointerRegistry::new();
        let mut config = SimConfig::default();
        adapter.handle_event(
            InputEvent::Key { code: Key::P },
            &mut pointers,
            SURFACE,
            &mut config,
        );
        assert!(config.paused);
        adapter.handle_event(
            InputEvent::Key { code: Key::P },
            &mut pointers,
            SURFACE,
            &mut config,
        );
        assert!(!config.paused);
    }

    #[test]
    fn space_queues_a_burst_of_five_to_twenty_four() {
        let mut adapter = InputAdapter::new();
        let mut pointers = PointerRegistry::new();
        let mut config = SimConfig::default();
        adapter.handle_event(
            InputEvent::Key { code: Key::Space },
            &mut pointers,
            SURFACE,
            &mut config,
        );
        let requests = adapter.frame(&mut pointers, &config);
        assert!((5..=24).contains(&requests.len()));
    }

    #[test]
    fn burst_pops_one_entry_per_frame() {
        let mut adapter = InputAdapter::new();
        let mut pointers = PointerRegistry::new();
        let config = SimConfig::default();
        adapter.queue_burst(2);
        adapter.queue_burst(3);
        assert_eq!(adapter.frame(&mut pointers, &config).len(), 3);
        assert_eq!(adapter.frame(&mut pointers, &config).len(), 2);
        assert!(adapter.frame(&mut pointers, &config).is_empty());
    }

    #[test]
    fn open_hand_drives_splats_like_a_mouse() {
        let mut adapter = InputAdapter::new();
        let mut pointers = PointerRegistry::new();
        let config = SimConfig::default();

        // frame 0: hand appears, open
        adapter.apply_landmarks(&[open_hand_at(Vec2::new(0.3, 0.4))], &mut pointers, SURFACE);
        adapter.frame(&mut pointers, &config);
        assert_eq!(pointers.len(), 1);

        // frame 1: hand moves right
        adapter.apply_landmarks(&[open_hand_at(Vec2::new(0.5, 0.4))], &mut pointers, SURFACE);
        let requests = adapter.frame(&mut pointers, &config);
        assert_eq!(requests.len(), 1);
        let expected = 0.2 * (SURFACE.0 / SURFACE.1) * config.splat_force;
        assert!((requests[0].delta.x - expected).abs() / expected < 1e-3);
        assert!(requests[0].delta.y.abs() < 1e-4);

        // frame 2: hand closes, pointer is removed
        adapter.apply_landmarks(&[closed_hand_at(Vec2::new(0.5, 0.4))], &mut pointers, SURFACE);
        adapter.frame(&mut pointers, &config);
        assert!(pointers.is_empty());
    }

    #[test]
    fn vanished_hand_removes_its_pointer() {
        let mut adapter = InputAdapter::new();
        let mut pointers = PointerRegistry::new();
        adapter.apply_landmarks(&[open_hand_at(Vec2::new(0.3, 0.4))], &mut pointers, SURFACE);
        assert_eq!(pointers.len(), 1);
        adapter.apply_landmarks(&[], &mut pointers, SURFACE);
        assert!(pointers.is_empty());
    }
}
