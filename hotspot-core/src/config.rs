/// Viewer configuration with the widget's externally visible defaults
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::hit_targets::HitTargets;

/// Container looked up when the host does not pass one
pub const DEFAULT_CONTAINER_ID: &str = "index-3d-viewer";
/// Model asset requested on start
pub const DEFAULT_MODEL_PATH: &str = "/3d/model.json";

/// Camera placement and frustum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Initial position when the container is at least as wide as tall
    pub position: [f32; 3],
    /// Initial position for portrait containers, pulled back to keep the model framed
    pub portrait_position: [f32; 3],
    /// Orbit pivot the camera looks at
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 40.0,
            near: 0.1,
            far: 100.0,
            position: [1.0, 1.0, -4.0],
            portrait_position: [1.0, 1.0, -12.0],
            target: [0.0, 0.5, 0.0],
        }
    }
}

impl CameraConfig {
    /// Initial camera position for a container of the given size
    pub fn initial_position(&self, width: u32, height: u32) -> Point3<f32> {
        let p = if width < height {
            self.portrait_position
        } else {
            self.position
        };
        Point3::from(p)
    }

    pub fn target_point(&self) -> Point3<f32> {
        Point3::from(self.target)
    }
}

/// Linear fog blending into the background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub color: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: 0xeeeeee,
            near: 10.0,
            far: 50.0,
        }
    }
}

/// Ground grid helper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: f32,
    pub divisions: u32,
    pub color: u32,
    pub center_color: u32,
    /// Grid material is transparent and never writes depth
    pub opacity: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 100.0,
            divisions: 40,
            color: 0x000000,
            center_color: 0x000000,
            opacity: 0.1,
        }
    }
}

/// Soft room-style lighting: an ambient term plus one key light
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: f32,
    pub key: f32,
    /// Direction the key light comes from, normalized at use
    pub key_direction: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: 0.55,
            key: 0.6,
            key_direction: [0.5, 1.0, -0.75],
        }
    }
}

/// Orbit controller tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    /// `None` leaves dolly-out unbounded
    pub max_distance: Option<f32>,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: None,
        }
    }
}

/// Everything the widget needs to bootstrap a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub container_id: String,
    pub model_path: String,
    pub antialias: bool,
    pub background: u32,
    pub camera: CameraConfig,
    pub fog: FogConfig,
    pub grid: GridConfig,
    pub lighting: LightingConfig,
    pub orbit: OrbitConfig,
    pub hotspots: HitTargets,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            model_path: DEFAULT_MODEL_PATH.to_string(),
            antialias: true,
            background: 0xeeeeee,
            camera: CameraConfig::default(),
            fog: FogConfig::default(),
            grid: GridConfig::default(),
            lighting: LightingConfig::default(),
            orbit: OrbitConfig::default(),
            hotspots: HitTargets::default(),
        }
    }
}

impl ViewerConfig {
    /// Parse a JSON override document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ViewerError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ViewerError::config(format!(
                "fov must be within (0, 180) degrees, got {}",
                camera.fov_degrees
            )));
        }
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(ViewerError::config(format!(
                "clip planes must satisfy 0 < near < far, got {} / {}",
                camera.near, camera.far
            )));
        }
        if self.fog.near > self.fog.far {
            return Err(ViewerError::config("fog near must not exceed fog far"));
        }
        if !(0.0..=1.0).contains(&self.grid.opacity) {
            return Err(ViewerError::config("grid opacity must be within [0, 1]"));
        }
        if self.grid.divisions == 0 || self.grid.size <= 0.0 {
            return Err(ViewerError::config("grid needs a positive size and divisions"));
        }
        if self.model_path.is_empty() {
            return Err(ViewerError::config("model path must not be empty"));
        }
        if let Some(max) = self.orbit.max_distance {
            if max < self.orbit.min_distance {
                return Err(ViewerError::config("orbit max distance below min distance"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.container_id, "index-3d-viewer");
        assert_eq!(config.model_path, "/3d/model.json");
        assert_eq!(config.camera.fov_degrees, 40.0);
        assert_eq!((config.fog.near, config.fog.far), (10.0, 50.0));
        assert_eq!((config.grid.size, config.grid.divisions), (100.0, 40));
        assert_eq!(config.grid.opacity, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_initial_position_policy() {
        let camera = CameraConfig::default();
        assert_eq!(camera.initial_position(800, 600).z, -4.0);
        assert_eq!(camera.initial_position(600, 600).z, -4.0);
        assert_eq!(camera.initial_position(400, 900).z, -12.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(
            r#"{"model_path": "/3d/other.json", "fog": {"far": 80.0}}"#,
        )
        .unwrap();
        assert_eq!(config.model_path, "/3d/other.json");
        assert_eq!(config.fog.far, 80.0);
        assert_eq!(config.fog.near, 10.0);
        assert_eq!(config.hotspots, HitTargets::default());
    }

    #[test]
    fn test_custom_hotspots() {
        let config = ViewerConfig::from_json(
            r#"{"hotspots": [{"name": "Docs", "url": "https://docs.example/"}]}"#,
        )
        .unwrap();
        assert_eq!(config.hotspots.len(), 1);
        assert_eq!(config.hotspots.resolve("Twitter"), None);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(ViewerConfig::from_json(r#"{"camera": {"fov_degrees": 0.0}}"#).is_err());
        assert!(ViewerConfig::from_json(r#"{"camera": {"near": 5.0, "far": 1.0}}"#).is_err());
        assert!(ViewerConfig::from_json(r#"{"grid": {"opacity": 2.0}}"#).is_err());
        assert!(ViewerConfig::from_json(r#"{"orbit": {"min_distance": 5.0, "max_distance": 1.0}}"#).is_err());
        assert!(ViewerConfig::from_json("not json").is_err());
    }
}
