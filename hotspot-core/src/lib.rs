/// hotspot3d core - host-agnostic viewer logic
///
/// This library holds everything about the 3D hotspot viewer that does not
/// touch a browser: camera and orbit math, ray casting, the hotspot table,
/// model parsing and the widget lifecycle. Hosts plug in through [`Host`].

pub mod config;
pub mod error;
pub mod geometry;
pub mod hit_targets;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod orbit;
pub mod pointer;
pub mod projection;
pub mod raycast;
pub mod scene;
pub mod stl;
pub mod widget;

// Re-export commonly used types
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use geometry::{Mesh, Model, Rgb, SceneObject, Triangle, Vertex};
pub use hit_targets::{HitTarget, HitTargets};
pub use host::{Host, HostEvent, ListenerHandle, RenderSurface};
pub use lifecycle::{LoadTicket, Phase};
pub use pointer::{ContainerBox, PointerSample};
pub use projection::Camera;
pub use scene::Scene;
pub use widget::ViewerWidget;
