/// Scene description handed to render surfaces
use nalgebra::{Point3, Vector3};

use crate::config::{FogConfig, GridConfig, LightingConfig, ViewerConfig};
use crate::geometry::{Model, Rgb};

/// Linear fog between `near` and `far` camera distances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    /// Blend weight toward the fog color at `distance` from the camera
    pub fn factor(&self, distance: f32) -> f32 {
        if self.far <= self.near {
            return if distance >= self.far { 1.0 } else { 0.0 };
        }
        ((distance - self.near) / (self.far - self.near)).clamp(0.0, 1.0)
    }
}

impl From<&FogConfig> for Fog {
    fn from(config: &FogConfig) -> Self {
        Self {
            color: Rgb::from_hex(config.color),
            near: config.near,
            far: config.far,
        }
    }
}

/// One colored line segment of the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub from: Point3<f32>,
    pub to: Point3<f32>,
    pub color: Rgb,
}

/// Square grid on the XZ plane centered on the origin
#[derive(Debug, Clone, PartialEq)]
pub struct GridHelper {
    pub size: f32,
    pub divisions: u32,
    pub color: Rgb,
    pub center_color: Rgb,
    pub opacity: f32,
}

impl GridHelper {
    /// Line segments, two per division boundary (one along X, one along Z)
    pub fn lines(&self) -> Vec<GridLine> {
        let half = self.size / 2.0;
        let step = self.size / self.divisions as f32;
        let center = self.divisions / 2;

        (0..=self.divisions)
            .flat_map(|i| {
                let k = -half + i as f32 * step;
                let color = if i == center && self.divisions % 2 == 0 {
                    self.center_color
                } else {
                    self.color
                };
                [
                    GridLine {
                        from: Point3::new(-half, 0.0, k),
                        to: Point3::new(half, 0.0, k),
                        color,
                    },
                    GridLine {
                        from: Point3::new(k, 0.0, -half),
                        to: Point3::new(k, 0.0, half),
                        color,
                    },
                ]
            })
            .collect()
    }
}

impl From<&GridConfig> for GridHelper {
    fn from(config: &GridConfig) -> Self {
        Self {
            size: config.size,
            divisions: config.divisions,
            color: Rgb::from_hex(config.color),
            center_color: Rgb::from_hex(config.center_color),
            opacity: config.opacity,
        }
    }
}

/// Ambient plus directional lighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: f32,
    pub key: f32,
    /// Unit vector pointing toward the light
    pub key_direction: Vector3<f32>,
}

impl Lighting {
    /// Lambert intensity for a surface normal
    pub fn intensity(&self, normal: &Vector3<f32>) -> f32 {
        self.ambient + self.key * normal.dot(&self.key_direction).max(0.0)
    }
}

impl From<&LightingConfig> for Lighting {
    fn from(config: &LightingConfig) -> Self {
        let direction = Vector3::from(config.key_direction);
        Self {
            ambient: config.ambient,
            key: config.key,
            key_direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y),
        }
    }
}

/// Everything a render surface draws in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: Rgb,
    pub fog: Fog,
    pub grid: GridHelper,
    pub lighting: Lighting,
    model: Option<Model>,
    revision: u64,
}

impl Scene {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            background: Rgb::from_hex(config.background),
            fog: Fog::from(&config.fog),
            grid: GridHelper::from(&config.grid),
            lighting: Lighting::from(&config.lighting),
            model: None,
            revision: 0,
        }
    }

    /// The loaded model, `None` while the asset is still in flight
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Attach the loaded model, replacing any previous one
    pub fn attach_model(&mut self, model: Model) {
        self.model = Some(model);
        self.revision += 1;
    }

    /// Bumped whenever the model changes so surfaces can re-upload geometry
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, SceneObject};

    #[test]
    fn test_default_scene() {
        let scene = Scene::from_config(&ViewerConfig::default());
        assert_eq!(scene.background, Rgb::from_hex(0xeeeeee));
        assert_eq!(scene.fog.color, scene.background);
        assert!(scene.model().is_none());
        assert_eq!(scene.revision(), 0);
    }

    #[test]
    fn test_fog_factor() {
        let fog = Fog::from(&FogConfig::default());
        assert_eq!(fog.factor(5.0), 0.0);
        assert_eq!(fog.factor(30.0), 0.5);
        assert_eq!(fog.factor(80.0), 1.0);
    }

    #[test]
    fn test_grid_lines() {
        let grid = GridHelper::from(&GridConfig::default());
        let lines = grid.lines();
        assert_eq!(lines.len(), 82);
        assert_eq!(lines[0].from, Point3::new(-50.0, 0.0, -50.0));
        assert!(lines.iter().all(|l| l.from.y == 0.0 && l.to.y == 0.0));
        // Spacing of 2.5 units between neighbouring lines
        assert!((lines[2].from.z - lines[0].from.z - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_attach_model_bumps_revision() {
        let mut scene = Scene::from_config(&ViewerConfig::default());
        scene.attach_model(Model::new(vec![SceneObject::new("Twitter", Mesh::cube(1.0))]));
        assert_eq!(scene.revision(), 1);
        assert!(scene.model().unwrap().child("Twitter").is_some());
    }

    #[test]
    fn test_lighting_intensity() {
        let lighting = Lighting::from(&LightingConfig {
            ambient: 0.5,
            key: 0.5,
            key_direction: [0.0, 2.0, 0.0],
        });
        assert_eq!(lighting.intensity(&Vector3::y()), 1.0);
        assert_eq!(lighting.intensity(&-Vector3::y()), 0.5);
    }
}
