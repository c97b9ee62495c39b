/// Ray casting against model objects
use nalgebra::{Matrix4, Point3, Vector3};

use crate::geometry::{SceneObject, Triangle};

const EPSILON: f32 = 1e-7;

/// Half-line starting at `origin`, `direction` is unit length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }

    /// Möller–Trumbore intersection, returns the distance along the ray.
    ///
    /// Both faces count as hits.
    pub fn intersect_triangle(
        &self,
        a: &Point3<f32>,
        b: &Point3<f32>,
        c: &Point3<f32>,
    ) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(&edge2);
        let det = edge1.dot(&p);
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = self.direction.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(&q) * inv_det;
        (t > EPSILON).then_some(t)
    }

    /// Whether the ray passes within `radius` of `center` in front of the origin
    pub fn intersects_sphere(&self, center: &Point3<f32>, radius: f32) -> bool {
        let to_center = center - self.origin;
        let along = to_center.dot(&self.direction);
        let distance_sq = to_center.norm_squared() - along * along;
        if distance_sq > radius * radius {
            return false;
        }
        // Sphere entirely behind the origin
        along >= -radius
    }
}

/// One ray hit against a scene object
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Distance from the ray origin in world units
    pub distance: f32,
    pub point: Point3<f32>,
    /// Index of the hit object in the slice passed to [`intersect_objects`]
    pub object_index: usize,
    /// Name label of the hit object
    pub name: String,
}

/// Intersect `ray` with each object's own mesh (descendants are skipped).
///
/// `parent` is the world matrix the objects hang from. At most one
/// intersection is reported per object, the nearest; results come back
/// sorted nearest-first.
pub fn intersect_objects(
    ray: &Ray,
    objects: &[SceneObject],
    parent: &Matrix4<f32>,
) -> Vec<Intersection> {
    let mut hits: Vec<Intersection> = objects
        .iter()
        .enumerate()
        .filter_map(|(index, object)| {
            let world = parent * object.transform;
            nearest_hit(ray, object, &world).map(|distance| Intersection {
                distance,
                point: ray.at(distance),
                object_index: index,
                name: object.name.clone(),
            })
        })
        .collect();

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

fn nearest_hit(ray: &Ray, object: &SceneObject, world: &Matrix4<f32>) -> Option<f32> {
    let (center, radius) = object.mesh.bounding_sphere()?;
    let world_center = world.transform_point(&center);
    if !ray.intersects_sphere(&world_center, radius * max_scale(world)) {
        return None;
    }

    object
        .mesh
        .triangles
        .iter()
        .filter_map(|triangle| intersect_world_triangle(ray, triangle, world))
        .min_by(f32::total_cmp)
}

fn intersect_world_triangle(ray: &Ray, triangle: &Triangle, world: &Matrix4<f32>) -> Option<f32> {
    let [a, b, c] = &triangle.vertices;
    ray.intersect_triangle(
        &world.transform_point(&a.position),
        &world.transform_point(&b.position),
        &world.transform_point(&c.position),
    )
}

/// Largest axis scale of an affine matrix, bounds how far a sphere can grow
fn max_scale(m: &Matrix4<f32>) -> f32 {
    (0..3)
        .map(|i| m.fixed_view::<3, 1>(0, i).norm())
        .fold(0.0_f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;

    fn forward_ray() -> Ray {
        Ray::new(Point3::new(0.0, 0.0, 10.0), -Vector3::z())
    }

    fn cube_at(name: &str, z: f32) -> SceneObject {
        SceneObject::new(name, Mesh::cube(1.0))
            .with_transform(Matrix4::new_translation(&Vector3::new(0.0, 0.0, z)))
    }

    #[test]
    fn test_triangle_hit_and_miss() {
        let ray = forward_ray();
        let a = Point3::new(-1.0, -1.0, 0.0);
        let b = Point3::new(1.0, -1.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let t = ray.intersect_triangle(&a, &b, &c).unwrap();
        assert!((t - 10.0).abs() < 1e-5);

        // Back face counts too
        assert!(ray.intersect_triangle(&a, &c, &b).is_some());

        let offset = Ray::new(Point3::new(5.0, 0.0, 10.0), -Vector3::z());
        assert!(offset.intersect_triangle(&a, &b, &c).is_none());
    }

    #[test]
    fn test_triangle_behind_origin_is_ignored() {
        let ray = Ray::new(Point3::new(0.0, 0.0, -1.0), -Vector3::z());
        let a = Point3::new(-1.0, -1.0, 0.0);
        let b = Point3::new(1.0, -1.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        assert!(ray.intersect_triangle(&a, &b, &c).is_none());
    }

    #[test]
    fn test_intersections_sorted_nearest_first() {
        let objects = vec![cube_at("far", -3.0), cube_at("near", 2.0), cube_at("", 0.0)];
        let hits = intersect_objects(&forward_ray(), &objects, &Matrix4::identity());
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["near", "", "far"]);
        assert!((hits[0].distance - 7.5).abs() < 1e-4);
        assert_eq!(hits[0].object_index, 1);
    }

    #[test]
    fn test_parent_transform_applies() {
        let objects = vec![cube_at("moved", 0.0)];
        let parent = Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0));
        assert!(intersect_objects(&forward_ray(), &objects, &parent).is_empty());

        let ray = Ray::new(Point3::new(5.0, 0.0, 10.0), -Vector3::z());
        assert_eq!(intersect_objects(&ray, &objects, &parent).len(), 1);
    }

    #[test]
    fn test_nested_children_are_not_hit() {
        let mut group = SceneObject::new("Group", Mesh::new());
        group.children.push(cube_at("Inner", 0.0));
        let hits = intersect_objects(&forward_ray(), &[group], &Matrix4::identity());
        assert!(hits.is_empty());
    }

    #[test]
    fn test_scaled_object_sphere_rejection() {
        let big = SceneObject::new("big", Mesh::cube(1.0))
            .with_transform(Matrix4::new_scaling(10.0));
        let ray = Ray::new(Point3::new(4.0, 0.0, 20.0), -Vector3::z());
        let hits = intersect_objects(&ray, &[big], &Matrix4::identity());
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 15.0).abs() < 1e-4);
    }
}
