/// Model asset parsing: JSON object scenes and STL solids
use std::collections::HashMap;

use nalgebra::Matrix4;
use serde::Deserialize;

use crate::error::{Result, ViewerError};
use crate::geometry::{Mesh, Model, Rgb, SceneObject};
use crate::stl;

/// Parse a fetched model asset, choosing the format from the path extension.
///
/// `.stl` files become one child per solid; anything else is read as a JSON
/// object scene.
pub fn parse_model(path: &str, bytes: &[u8]) -> Result<Model> {
    let extension = path
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    let model = match extension.as_deref() {
        Some("stl") => model_from_stl(bytes)?,
        _ => parse_object_json(bytes)?,
    };
    log::debug!(
        "parsed model {} with {} children, {} triangles",
        path,
        model.children.len(),
        model.triangle_count()
    );
    Ok(model)
}

fn model_from_stl(bytes: &[u8]) -> Result<Model> {
    let children = stl::parse_stl(bytes)?
        .into_iter()
        .map(|solid| SceneObject::new(solid.name, solid.mesh))
        .collect();
    Ok(Model::new(children))
}

#[derive(Debug, Deserialize)]
struct ObjectDocument {
    #[serde(default)]
    geometries: Vec<GeometryEntry>,
    #[serde(default)]
    materials: Vec<MaterialEntry>,
    object: ObjectNode,
}

#[derive(Debug, Deserialize)]
struct GeometryEntry {
    uuid: String,
    data: GeometryData,
}

#[derive(Debug, Deserialize)]
struct GeometryData {
    attributes: GeometryAttributes,
    #[serde(default)]
    index: Option<IndexAttribute>,
}

#[derive(Debug, Deserialize)]
struct GeometryAttributes {
    position: FloatAttribute,
}

#[derive(Debug, Deserialize)]
struct FloatAttribute {
    #[serde(rename = "itemSize", default = "default_item_size")]
    item_size: usize,
    array: Vec<f32>,
}

fn default_item_size() -> usize {
    3
}

#[derive(Debug, Deserialize)]
struct IndexAttribute {
    array: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct MaterialEntry {
    uuid: String,
    #[serde(default)]
    color: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ObjectNode {
    #[serde(default)]
    name: String,
    #[serde(default)]
    geometry: Option<String>,
    #[serde(default)]
    material: Option<MaterialRef>,
    #[serde(default)]
    matrix: Option<Vec<f32>>,
    #[serde(default)]
    children: Vec<ObjectNode>,
}

/// Objects reference one material or a list of them; the first one wins
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaterialRef {
    Single(String),
    Multi(Vec<String>),
}

impl MaterialRef {
    fn first(&self) -> Option<&str> {
        match self {
            MaterialRef::Single(uuid) => Some(uuid.as_str()),
            MaterialRef::Multi(uuids) => uuids.first().map(String::as_str),
        }
    }
}

struct Library {
    meshes: HashMap<String, Mesh>,
    colors: HashMap<String, Rgb>,
}

/// Parse the JSON object scene format: shared geometry/material tables and
/// an object tree referencing them by uuid.
pub fn parse_object_json(bytes: &[u8]) -> Result<Model> {
    let document: ObjectDocument = serde_json::from_slice(bytes)?;

    let mut meshes = HashMap::with_capacity(document.geometries.len());
    for entry in document.geometries {
        let position = &entry.data.attributes.position;
        if position.item_size != 3 {
            return Err(ViewerError::parse(format!(
                "geometry {}: position item size must be 3, got {}",
                entry.uuid, position.item_size
            )));
        }
        let indices = entry.data.index.as_ref().map(|i| i.array.as_slice());
        let mesh = Mesh::from_positions(&position.array, indices)
            .map_err(|e| ViewerError::parse(format!("geometry {}: {}", entry.uuid, e)))?;
        meshes.insert(entry.uuid, mesh);
    }

    let colors = document
        .materials
        .into_iter()
        .filter_map(|m| m.color.map(|c| (m.uuid, Rgb::from_hex(c))))
        .collect();

    let library = Library { meshes, colors };
    let root = document.object;
    let children = root
        .children
        .iter()
        .map(|node| build_object(node, &library))
        .collect::<Result<Vec<_>>>()?;

    Ok(Model {
        name: root.name,
        transform: node_matrix(root.matrix.as_deref())?,
        children,
    })
}

fn build_object(node: &ObjectNode, library: &Library) -> Result<SceneObject> {
    let mesh = match &node.geometry {
        Some(uuid) => library
            .meshes
            .get(uuid)
            .cloned()
            .ok_or_else(|| ViewerError::parse(format!("unknown geometry {}", uuid)))?,
        None => Mesh::new(),
    };
    let color = node
        .material
        .as_ref()
        .and_then(MaterialRef::first)
        .and_then(|uuid| library.colors.get(uuid).copied())
        .unwrap_or_default();

    let children = node
        .children
        .iter()
        .map(|child| build_object(child, library))
        .collect::<Result<Vec<_>>>()?;

    let mut object = SceneObject::new(node.name.clone(), mesh)
        .with_transform(node_matrix(node.matrix.as_deref())?)
        .with_color(color);
    object.children = children;
    Ok(object)
}

/// Column-major 4x4 matrix, identity when absent
fn node_matrix(matrix: Option<&[f32]>) -> Result<Matrix4<f32>> {
    match matrix {
        None => Ok(Matrix4::identity()),
        Some(values) if values.len() == 16 => Ok(Matrix4::from_column_slice(values)),
        Some(values) => Err(ViewerError::parse(format!(
            "object matrix needs 16 values, got {}",
            values.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    const SCENE: &str = r#"{
        "metadata": {"version": 4.5, "type": "Object"},
        "geometries": [
            {"uuid": "g-quad", "type": "BufferGeometry", "data": {
                "attributes": {"position": {"itemSize": 3, "type": "Float32Array",
                    "array": [0,0,0, 1,0,0, 1,1,0, 0,1,0]}},
                "index": {"type": "Uint16Array", "array": [0,1,2, 0,2,3]}
            }}
        ],
        "materials": [{"uuid": "m-blue", "type": "MeshStandardMaterial", "color": 255}],
        "object": {
            "type": "Scene",
            "name": "Links",
            "children": [
                {"type": "Mesh", "name": "Twitter", "geometry": "g-quad", "material": "m-blue",
                 "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 2,0,0,1]},
                {"type": "Group", "name": "Deco", "children": [
                    {"type": "Mesh", "name": "Leaf", "geometry": "g-quad", "material": ["m-missing"]}
                ]}
            ]
        }
    }"#;

    #[test]
    fn test_parse_object_scene() {
        let model = parse_model("/3d/model.json", SCENE.as_bytes()).unwrap();
        assert_eq!(model.name, "Links");
        assert_eq!(model.children.len(), 2);

        let twitter = model.child("Twitter").unwrap();
        assert_eq!(twitter.mesh.triangles.len(), 2);
        assert_eq!(twitter.color, Rgb::from_hex(0x0000ff));
        let origin = twitter.transform.transform_point(&Point3::origin());
        assert_eq!(origin, Point3::new(2.0, 0.0, 0.0));

        let deco = model.child("Deco").unwrap();
        assert!(deco.mesh.is_empty());
        assert_eq!(deco.children[0].name, "Leaf");
        assert_eq!(deco.children[0].color, Rgb::default());
        assert_eq!(model.triangle_count(), 4);
    }

    #[test]
    fn test_unknown_geometry() {
        let json = r#"{"object": {"children": [{"name": "A", "geometry": "nope"}]}}"#;
        match parse_object_json(json.as_bytes()) {
            Err(ViewerError::Parse(msg)) => assert!(msg.contains("nope")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_matrix_and_positions() {
        let json = r#"{"object": {"matrix": [1, 0, 0]}}"#;
        assert!(parse_object_json(json.as_bytes()).is_err());

        let json = r#"{"geometries": [{"uuid": "g", "data": {"attributes":
            {"position": {"array": [0, 0]}}}}], "object": {}}"#;
        assert!(parse_object_json(json.as_bytes()).is_err());
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            parse_model("/3d/model.json", b"<html>404</html>"),
            Err(ViewerError::Parse(_))
        ));
    }

    #[test]
    fn test_stl_by_extension() {
        let stl = "solid YouTube
facet normal 0 0 1
outer loop
vertex 0 0 0
vertex 1 0 0
vertex 0 1 0
endloop
endfacet
endsolid YouTube
";
        let model = parse_model("/3d/Model.STL", stl.as_bytes()).unwrap();
        assert_eq!(model.children.len(), 1);
        assert_eq!(model.children[0].name, "YouTube");
        assert_eq!(model.children[0].mesh.triangles[0].vertices[0].normal, Vector3::z());
    }
}
