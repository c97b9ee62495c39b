/// Perspective camera and ray unprojection
use nalgebra::{Matrix4, Point2, Point3, Vector3};

use crate::raycast::Ray;

/// Perspective camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: 40.0_f32.to_radians(),
            aspect: aspect_ratio(width, height),
            near: 0.1,
            far: 100.0,
        }
    }

    /// Update the aspect ratio after a viewport change
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Point the camera at `target` without moving it
    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Cast a ray from the camera through a point in normalized device coordinates.
    ///
    /// `ndc` is in `[-1, 1]` on both axes, x left-to-right and y bottom-to-top.
    pub fn ray_through(&self, ndc: Point2<f32>) -> Option<Ray> {
        let inverse = self.view_projection().try_inverse()?;
        let far = inverse.transform_point(&Point3::new(ndc.x, ndc.y, 1.0));
        let direction = (far - self.position).try_normalize(f32::EPSILON)?;
        Some(Ray::new(self.position, direction))
    }

    /// Project a world-space point to screen pixels, `None` when outside the frustum
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let view = self.view_matrix().transform_point(point);
        // Behind the camera or outside the depth range
        if -view.z < self.near || -view.z > self.far {
            return None;
        }

        let ndc = self.projection_matrix().transform_point(&view);
        if ndc.x < -1.0 || ndc.x > 1.0 || ndc.y < -1.0 || ndc.y > 1.0 {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;
        Some((screen_x, screen_y, ndc.z))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}
