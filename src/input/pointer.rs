//! Pointer registry.
//!
//! One record per input source (mouse, touch contact, synthetic hand
//! pointer), keyed by id. Coordinates are normalized to [0,1] with the origin
//! at the bottom-left; deltas are corrected for the surface aspect ratio so a
//! diagonal gesture injects isotropic momentum.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use rand::Rng;

pub type PointerId = i64;

const MOVE_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone)]
pub struct Pointer {
    pub id: PointerId,
    /// Current position, normalized, origin bottom-left
    pub coord: Vec2,
    pub prev: Vec2,
    /// Aspect-corrected movement since the previous event
    pub delta: Vec2,
    pub down: bool,
    pub moved: bool,
    pub color: Vec3,
}

pub struct PointerRegistry {
    pointers: BTreeMap<PointerId, Pointer>,
    color_timer: f32,
}

impl PointerRegistry {
    pub fn new() -> Self {
        Self {
            pointers: BTreeMap::new(),
            color_timer: 0.0,
        }
    }

    pub fn get(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pointer> {
        self.pointers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pointer> {
        self.pointers.values_mut()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Press at surface pixel `(x, y)` (origin top-left). Inserts the record
    /// if unknown; an existing pointer keeps its color.
    pub fn down(&mut self, id: PointerId, x: f32, y: f32, width: f32, height: f32) {
        let coord = Vec2::new(x / width, 1.0 - y / height);
        let pointer = self.pointers.entry(id).or_insert_with(|| Pointer {
            id,
            coord,
            prev: coord,
            delta: Vec2::ZERO,
            down: false,
            moved: false,
            color: generate_color(&mut rand::thread_rng()),
        });
        pointer.down = true;
        pointer.moved = false;
        pointer.coord = coord;
        pointer.prev = coord;
        pointer.delta = Vec2::ZERO;
    }

    /// Move to surface pixel `(x, y)`. Unknown ids are ignored.
    pub fn update_position(&mut self, id: PointerId, x: f32, y: f32, width: f32, height: f32) {
        let Some(pointer) = self.pointers.get_mut(&id) else {
            return;
        };
        pointer.prev = pointer.coord;
        pointer.coord = Vec2::new(x / width, 1.0 - y / height);
        pointer.delta = correct_delta(pointer.coord - pointer.prev, width / height);
        if pointer.delta.x.abs() + pointer.delta.y.abs() > MOVE_EPSILON {
            pointer.moved = true;
        }
    }

    pub fn up(&mut self, id: PointerId) {
        if let Some(pointer) = self.pointers.get_mut(&id) {
            pointer.down = false;
            pointer.moved = false;
        }
    }

    pub fn remove(&mut self, id: PointerId) {
        self.pointers.remove(&id);
    }

    /// Advance the recolor timer by `dt * speed`; when it crosses 1.0 every
    /// pointer gets a fresh color. Returns whether a rotation happened.
    pub fn advance_colors(&mut self, dt: f32, speed: f32) -> bool {
        self.color_timer += dt * speed;
        if self.color_timer < 1.0 {
            return false;
        }
        self.color_timer -= self.color_timer.floor();
        let mut rng = rand::thread_rng();
        for pointer in self.pointers.values_mut() {
            pointer.color = generate_color(&mut rng);
        }
        true
    }
}

impl Default for PointerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Make a normalized-space delta isotropic on screen: the major axis is
/// stretched to the square reference frame.
pub fn correct_delta(delta: Vec2, aspect_ratio: f32) -> Vec2 {
    let mut d = delta;
    if aspect_ratio > 1.0 {
        d.x *= aspect_ratio;
    } else if aspect_ratio < 1.0 {
        d.y /= aspect_ratio;
    }
    d
}

/// Random bright hue, scaled down to dye range.
pub fn generate_color(rng: &mut impl Rng) -> Vec3 {
    hsv_to_rgb(rng.gen::<f32>(), 1.0, 1.0) * 0.15
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    match (i as i32).rem_euclid(6) {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_normalizes_and_flips_y() {
        let mut registry = PointerRegistry::new();
        registry.down(1, 320.0, 120.0, 640.0, 480.0);
        let p = registry.get(1).unwrap();
        assert!(p.down);
        assert!(!p.moved);
        assert_eq!(p.coord, Vec2::new(0.5, 0.75));
        assert_eq!(p.prev, p.coord);
        assert_eq!(p.delta, Vec2::ZERO);
    }

    #[test]
    fn stationary_move_does_not_set_moved() {
        let mut registry = PointerRegistry::new();
        registry.down(1, 100.0, 100.0, 640.0, 480.0);
        registry.update_position(1, 100.0, 100.0, 640.0, 480.0);
        assert!(!registry.get(1).unwrap().moved);
    }

    #[test]
    fn move_sets_delta_and_moved() {
        let mut registry = PointerRegistry::new();
        registry.down(1, 100.0, 100.0, 640.0, 480.0);
        registry.update_position(1, 164.0, 100.0, 640.0, 480.0);
        let p = registry.get(1).unwrap();
        assert!(p.moved);
        // 64 px on a 640-wide, 4:3 surface: 0.1 normalized, stretched by 4/3
        assert!((p.delta.x - 0.1 * (640.0 / 480.0)).abs() < 1e-6);
        assert_eq!(p.delta.y, 0.0);
    }

    #[test]
    fn delta_correction_is_isotropic() {
        let wide = correct_delta(Vec2::new(0.1, 0.1), 2.0);
        assert!((wide.x - 0.2).abs() < 1e-6);
        assert!((wide.y - 0.1).abs() < 1e-6);

        let tall = correct_delta(Vec2::new(0.1, 0.1), 0.5);
        assert!((tall.x - 0.1).abs() < 1e-6);
        assert!((tall.y - 0.2).abs() < 1e-6);

        let square = correct_delta(Vec2::new(0.1, 0.1), 1.0);
        assert_eq!(square, Vec2::new(0.1, 0.1));
    }

    #[test]
    fn down_preserves_existing_color() {
        let mut registry = PointerRegistry::new();
        registry.down(1, 0.0, 0.0, 100.0, 100.0);
        let color = registry.get(1).unwrap().color;
        registry.up(1);
        registry.down(1, 50.0, 50.0, 100.0, 100.0);
        assert_eq!(registry.get(1).unwrap().color, color);
    }

    #[test]
    fn up_clears_down_and_moved() {
        let mut registry = PointerRegistry::new();
        registry.down(1, 0.0, 0.0, 100.0, 100.0);
        registry.update_position(1, 40.0, 40.0, 100.0, 100.0);
        registry.up(1);
        let p = registry.get(1).unwrap();
        assert!(!p.down);
        assert!(!p.moved);
    }

    #[test]
    fn remove_deletes_record() {
        let mut registry = PointerRegistry::new();
        registry.down(7, 0.0, 0.0, 100.0, 100.0);
        registry.remove(7);
        assert!(registry.get(7).is_none());
    }

    #[test]
    fn color_timer_rotates_at_one() {
        let mut registry = PointerRegistry::new();
        registry.down(1, 0.0, 0.0, 100.0, 100.0);
        assert!(!registry.advance_colors(0.04, 10.0));
        assert!(registry.advance_colors(0.08, 10.0));
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        let g = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert!(g.y > 0.99 && g.x < 0.01 && g.z < 0.01);
        let b = hsv_to_rgb(2.0 / 3.0, 1.0, 1.0);
        assert!(b.z > 0.99 && b.x < 0.01);
    }

    #[test]
    fn generated_colors_stay_in_dye_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let c = generate_color(&mut rng);
            assert!(c.max_element() <= 0.15 + 1e-6);
            assert!(c.max_element() > 0.0);
        }
    }
}
