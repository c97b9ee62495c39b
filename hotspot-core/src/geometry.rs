/// Geometry primitives and the loaded model hierarchy
use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::{Result, ViewerError};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Build a triangle from bare positions, using the face normal for every vertex
    pub fn from_points(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        let normal = face_normal(&a, &b, &c);
        Self::new(
            Vertex::new(a, normal),
            Vertex::new(b, normal),
            Vertex::new(c, normal),
        )
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f32> {
        face_normal(
            &self.vertices[0].position,
            &self.vertices[1].position,
            &self.vertices[2].position,
        )
    }
}

fn face_normal(a: &Point3<f32>, b: &Point3<f32>, c: &Point3<f32>) -> Vector3<f32> {
    let n = (b - a).cross(&(c - a));
    n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Build a mesh from a flat `[x, y, z, ...]` position array, optionally indexed.
    ///
    /// Without an index every three consecutive positions form a triangle.
    pub fn from_positions(positions: &[f32], indices: Option<&[u32]>) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(ViewerError::parse(format!(
                "position array length {} is not a multiple of 3",
                positions.len()
            )));
        }
        let points: Vec<Point3<f32>> = positions
            .chunks_exact(3)
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect();

        let order: Vec<u32> = match indices {
            Some(indices) => indices.to_vec(),
            None => (0..points.len() as u32).collect(),
        };
        if order.len() % 3 != 0 {
            return Err(ViewerError::parse(format!(
                "index count {} is not a multiple of 3",
                order.len()
            )));
        }

        let mut mesh = Self::with_capacity(order.len() / 3);
        for face in order.chunks_exact(3) {
            let mut corners = [Point3::origin(); 3];
            for (corner, &index) in corners.iter_mut().zip(face) {
                *corner = *points.get(index as usize).ok_or_else(|| {
                    ViewerError::parse(format!(
                        "index {} out of range for {} positions",
                        index,
                        points.len()
                    ))
                })?;
            }
            mesh.add_triangle(Triangle::from_points(corners[0], corners[1], corners[2]));
        }
        Ok(mesh)
    }

    /// Axis-aligned cube centered on the origin
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        // Each face: outward normal, then two in-plane axes (u, v) with u x v == normal.
        let faces = [
            (Vector3::x(), Vector3::y(), Vector3::z()),
            (-Vector3::x(), Vector3::z(), Vector3::y()),
            (Vector3::y(), Vector3::z(), Vector3::x()),
            (-Vector3::y(), Vector3::x(), Vector3::z()),
            (Vector3::z(), Vector3::x(), Vector3::y()),
            (-Vector3::z(), Vector3::y(), Vector3::x()),
        ];

        let mut mesh = Self::with_capacity(12);
        for (normal, u, v) in faces {
            let center = Point3::from(normal * h);
            let corner = |su: f32, sv: f32| center + u * (su * h) + v * (sv * h);
            let (a, b, c, d) = (
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            );
            mesh.add_triangle(Triangle::new(
                Vertex::new(a, normal),
                Vertex::new(b, normal),
                Vertex::new(c, normal),
            ));
            mesh.add_triangle(Triangle::new(
                Vertex::new(a, normal),
                Vertex::new(c, normal),
                Vertex::new(d, normal),
            ));
        }
        mesh
    }

    /// Smallest sphere around the vertex centroid that contains every vertex
    pub fn bounding_sphere(&self) -> Option<(Point3<f32>, f32)> {
        let count = self.triangles.len() * 3;
        if count == 0 {
            return None;
        }
        let sum = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter())
            .fold(Vector3::zeros(), |acc, v| acc + v.position.coords);
        let center = Point3::from(sum / count as f32);
        let radius = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter())
            .map(|v| (v.position - center).norm())
            .fold(0.0_f32, f32::max);
        Some((center, radius))
    }
}

/// Linear RGB color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Decode a packed `0xRRGGBB` color
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::new(0.8, 0.8, 0.8)
    }
}

/// A named node of the loaded model
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Label used for hotspot lookup; may be empty
    pub name: String,
    pub mesh: Mesh,
    /// Local transform relative to the parent
    pub transform: Matrix4<f32>,
    pub color: Rgb,
    /// Nested nodes; rendered, but not considered by hit-testing
    pub children: Vec<SceneObject>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            transform: Matrix4::identity(),
            color: Rgb::default(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// Visit this node and its descendants with their world matrices
    pub fn visit<F>(&self, parent: &Matrix4<f32>, f: &mut F)
    where
        F: FnMut(&SceneObject, &Matrix4<f32>),
    {
        let world = parent * self.transform;
        f(self, &world);
        for child in &self.children {
            child.visit(&world, f);
        }
    }
}

/// Root of a loaded model asset
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub transform: Matrix4<f32>,
    pub children: Vec<SceneObject>,
}

impl Model {
    pub fn new(children: Vec<SceneObject>) -> Self {
        Self {
            name: String::new(),
            transform: Matrix4::identity(),
            children,
        }
    }

    /// Direct child lookup by name
    pub fn child(&self, name: &str) -> Option<&SceneObject> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn triangle_count(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |object, _| count += object.mesh.triangles.len());
        count
    }

    /// Visit every node of the model with its world matrix
    pub fn visit<F>(&self, f: &mut F)
    where
        F: FnMut(&SceneObject, &Matrix4<f32>),
    {
        for child in &self.children {
            child.visit(&self.transform, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_normals_point_outward() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.triangles.len(), 12);
        for triangle in &cube.triangles {
            let centroid = triangle
                .vertices
                .iter()
                .fold(Vector3::zeros(), |acc, v| acc + v.position.coords)
                / 3.0;
            assert!(triangle.calculate_normal().dot(&centroid) > 0.0);
        }
    }

    #[test]
    fn test_from_positions_indexed() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let mesh = Mesh::from_positions(&positions, Some(&[0, 1, 2, 0, 2, 3])).unwrap();
        assert_eq!(mesh.triangles.len(), 2);
        assert!((mesh.triangles[0].calculate_normal() - Vector3::z()).norm() < 1e-6);
    }

    #[test]
    fn test_from_positions_rejects_bad_input() {
        assert!(Mesh::from_positions(&[0.0, 1.0], None).is_err());
        let positions = [0.0; 9];
        assert!(Mesh::from_positions(&positions, Some(&[0, 1, 7])).is_err());
    }

    #[test]
    fn test_hex_color() {
        let c = Rgb::from_hex(0xeeeeee);
        assert!((c.r - 238.0 / 255.0).abs() < 1e-6);
        assert_eq!(Rgb::from_hex(0x000000), Rgb::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_bounding_sphere() {
        let (center, radius) = Mesh::cube(2.0).bounding_sphere().unwrap();
        assert!(center.coords.norm() < 1e-6);
        assert!((radius - 3.0_f32.sqrt()).abs() < 1e-5);
        assert!(Mesh::new().bounding_sphere().is_none());
    }

    #[test]
    fn test_model_visit_composes_transforms() {
        let mut parent = SceneObject::new("parent", Mesh::new())
            .with_transform(Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)));
        parent.children.push(
            SceneObject::new("child", Mesh::cube(1.0))
                .with_transform(Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0))),
        );
        let model = Model::new(vec![parent]);

        let mut seen = Vec::new();
        model.visit(&mut |object, world| {
            seen.push((object.name.clone(), world.transform_point(&Point3::origin())));
        });
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].0, "child");
        assert!((seen[1].1 - Point3::new(1.0, 2.0, 0.0)).norm() < 1e-6);
        assert_eq!(model.triangle_count(), 12);
    }
}
