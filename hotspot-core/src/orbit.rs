/// Orbit camera controller: spherical rotation and dolly around a target
use std::f32::consts::{PI, TAU};

use nalgebra::{Point3, Vector3};

use crate::config::OrbitConfig;
use crate::projection::Camera;

/// Keeps the polar angle off the poles so `look_at` has a usable up vector
const POLE_EPSILON: f32 = 1e-6;

/// Dolly factor for one wheel step at zoom speed 1
const DOLLY_BASE: f32 = 0.95;

/// Spherical orbit state around `target`
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    /// Distance from target to camera
    pub radius: f32,
    /// Angle around the Y axis, measured from +Z toward +X
    pub azimuth: f32,
    /// Angle from the +Y axis
    pub polar: f32,
    config: OrbitConfig,
}

impl OrbitControls {
    /// Derive orbit state from the camera's current offset to `target`
    pub fn new(camera: &Camera, target: Point3<f32>, config: OrbitConfig) -> Self {
        let offset = camera.position - target;
        let radius = offset.norm();
        let (azimuth, polar) = if radius > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI / 2.0)
        };

        let mut controls = Self {
            target,
            radius,
            azimuth,
            polar,
            config,
        };
        controls.clamp();
        controls
    }

    /// Rotate by a pointer drag of `(dx, dy)` pixels inside a viewport `height` pixels tall.
    ///
    /// A drag across the full height turns the camera one full revolution.
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        if height <= 0.0 {
            return;
        }
        let speed = self.config.rotate_speed;
        self.azimuth -= TAU * dx / height * speed;
        self.polar -= TAU * dy / height * speed;
        self.clamp();
    }

    /// Dolly toward (negative delta) or away from (positive delta) the target
    pub fn dolly(&mut self, delta: f32) {
        if delta == 0.0 {
            return;
        }
        let scale = DOLLY_BASE.powf(self.config.zoom_speed);
        if delta < 0.0 {
            self.radius *= scale;
        } else {
            self.radius /= scale;
        }
        self.clamp();
    }

    /// Pinch dolly: `scale` below 1 moves toward the target
    pub fn scale_radius(&mut self, scale: f32) {
        if !(scale.is_finite() && scale > 0.0) {
            return;
        }
        self.radius *= scale.powf(self.config.zoom_speed);
        self.clamp();
    }

    /// Camera position implied by the orbit state
    pub fn position(&self) -> Point3<f32> {
        let sin_polar = self.polar.sin();
        let offset = Vector3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        );
        self.target + offset
    }

    /// Move the camera onto the orbit and aim it at the target
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.position();
        camera.look_at(self.target);
    }

    fn clamp(&mut self) {
        self.polar = self.polar.clamp(POLE_EPSILON, PI - POLE_EPSILON);
        let max = self.config.max_distance.unwrap_or(f32::INFINITY);
        self.radius = self.radius.clamp(self.config.min_distance, max);
    }
}

/// What one pointer move does to the orbit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureStep {
    Rotate { dx: f32, dy: f32 },
    Pinch { scale: f32 },
    Idle,
}

/// Pointers pressed on the viewer: one rotates, two pinch-dolly.
/// Further pointers are ignored until one of the two lifts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrbitGesture {
    pointers: Vec<(i32, (f64, f64))>,
}

impl OrbitGesture {
    pub fn press(&mut self, pointer_id: i32, at: (f64, f64)) {
        if let Some(pointer) = self.pointers.iter_mut().find(|p| p.0 == pointer_id) {
            pointer.1 = at;
        } else if self.pointers.len() < 2 {
            self.pointers.push((pointer_id, at));
        }
    }

    pub fn release(&mut self, pointer_id: i32) {
        self.pointers.retain(|p| p.0 != pointer_id);
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Track a move of `pointer_id`; pointers never pressed produce `Idle`
    pub fn move_to(&mut self, pointer_id: i32, at: (f64, f64)) -> GestureStep {
        let Some(index) = self.pointers.iter().position(|p| p.0 == pointer_id) else {
            return GestureStep::Idle;
        };
        let previous = std::mem::replace(&mut self.pointers[index].1, at);
        if self.pointers.len() == 1 {
            return GestureStep::Rotate {
                dx: (at.0 - previous.0) as f32,
                dy: (at.1 - previous.1) as f32,
            };
        }

        let other = self.pointers[1 - index].1;
        let before = distance(previous, other);
        let after = distance(at, other);
        if before <= 0.0 || after <= 0.0 {
            return GestureStep::Idle;
        }
        GestureStep::Pinch {
            scale: (before / after) as f32,
        }
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(position: Point3<f32>) -> Camera {
        let mut camera = Camera::new(800, 600);
        camera.position = position;
        camera
    }

    #[test]
    fn test_apply_preserves_initial_position() {
        let target = Point3::new(0.0, 0.5, 0.0);
        let mut camera = camera_at(Point3::new(1.0, 1.0, -4.0));
        let controls = OrbitControls::new(&camera, target, OrbitConfig::default());
        controls.apply(&mut camera);
        assert!((camera.position - Point3::new(1.0, 1.0, -4.0)).norm() < 1e-5);
        assert_eq!(camera.target, target);
    }

    #[test]
    fn test_full_height_drag_is_full_turn() {
        let mut camera = camera_at(Point3::new(0.0, 0.0, 5.0));
        let mut controls = OrbitControls::new(&camera, Point3::origin(), OrbitConfig::default());
        controls.rotate(600.0, 0.0, 600.0);
        controls.apply(&mut camera);
        assert!((camera.position - Point3::new(0.0, 0.0, 5.0)).norm() < 1e-4);

        controls.rotate(150.0, 0.0, 600.0);
        controls.apply(&mut camera);
        assert!((camera.position - Point3::new(-5.0, 0.0, 0.0)).norm() < 1e-4);
    }

    #[test]
    fn test_polar_is_clamped() {
        let camera = camera_at(Point3::new(0.0, 0.0, 5.0));
        let mut controls = OrbitControls::new(&camera, Point3::origin(), OrbitConfig::default());
        controls.rotate(0.0, 10_000.0, 600.0);
        assert_eq!(controls.polar, POLE_EPSILON);
        assert!((controls.position() - Point3::origin()).norm() > 4.99);

        controls.rotate(0.0, -10_000.0, 600.0);
        assert_eq!(controls.polar, PI - POLE_EPSILON);
    }

    #[test]
    fn test_dolly_in_and_out() {
        let camera = camera_at(Point3::new(0.0, 0.0, 10.0));
        let config = OrbitConfig {
            min_distance: 9.6,
            max_distance: Some(10.2),
            ..OrbitConfig::default()
        };
        let mut controls = OrbitControls::new(&camera, Point3::origin(), config);
        controls.dolly(-1.0);
        assert!((controls.radius - 9.6).abs() < 1e-5);
        controls.dolly(1.0);
        controls.dolly(1.0);
        assert!((controls.radius - 10.2).abs() < 1e-5);
        controls.dolly(0.0);
        assert!((controls.radius - 10.2).abs() < 1e-5);
    }

    #[test]
    fn test_zero_height_viewport_ignored() {
        let camera = camera_at(Point3::new(0.0, 0.0, 5.0));
        let mut controls = OrbitControls::new(&camera, Point3::origin(), OrbitConfig::default());
        let before = controls.clone();
        controls.rotate(100.0, 100.0, 0.0);
        assert_eq!(controls, before);
    }

    #[test]
    fn test_pinch_scales_radius() {
        let camera = camera_at(Point3::new(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(&camera, Point3::origin(), OrbitConfig::default());
        controls.scale_radius(0.5);
        assert!((controls.radius - 5.0).abs() < 1e-5);
        controls.scale_radius(0.0);
        controls.scale_radius(f32::NAN);
        assert!((controls.radius - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_single_pointer_rotates() {
        let mut gesture = OrbitGesture::default();
        assert_eq!(gesture.move_to(1, (5.0, 5.0)), GestureStep::Idle);

        gesture.press(1, (10.0, 20.0));
        assert_eq!(
            gesture.move_to(1, (15.0, 18.0)),
            GestureStep::Rotate { dx: 5.0, dy: -2.0 }
        );
        // Unpressed pointers do nothing
        assert_eq!(gesture.move_to(2, (0.0, 0.0)), GestureStep::Idle);

        gesture.release(1);
        assert_eq!(gesture.pointer_count(), 0);
        assert_eq!(gesture.move_to(1, (30.0, 30.0)), GestureStep::Idle);
    }

    #[test]
    fn test_two_pointers_pinch() {
        let mut gesture = OrbitGesture::default();
        gesture.press(1, (0.0, 0.0));
        gesture.press(2, (100.0, 0.0));
        gesture.press(3, (50.0, 50.0));
        assert_eq!(gesture.pointer_count(), 2);

        // Spreading the fingers zooms in
        assert_eq!(gesture.move_to(2, (200.0, 0.0)), GestureStep::Pinch { scale: 0.5 });
        assert_eq!(gesture.move_to(1, (100.0, 0.0)), GestureStep::Pinch { scale: 2.0 });

        // Lifting one finger goes back to rotating from the last position
        gesture.release(1);
        assert_eq!(
            gesture.move_to(2, (210.0, 0.0)),
            GestureStep::Rotate { dx: 10.0, dy: 0.0 }
        );
    }
}
