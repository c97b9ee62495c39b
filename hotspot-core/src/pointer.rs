/// Pointer event coordinates and normalization
use nalgebra::Point2;

/// Layout box of the container element, in client pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ContainerBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Sized box at the page origin
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Whole-pixel dimensions used for the drawing surface
    pub fn pixel_size(&self) -> (u32, u32) {
        (to_pixels(self.width), to_pixels(self.height))
    }

    /// Normalize container-relative pixels to device coordinates.
    ///
    /// x runs left-to-right, y bottom-to-top, both in `[-1, 1]` inside the box.
    pub fn normalize(&self, x: f64, y: f64) -> Option<Point2<f32>> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let nx = (x / self.width) * 2.0 - 1.0;
        let ny = -(y / self.height) * 2.0 + 1.0;
        Some(Point2::new(nx as f32, ny as f32))
    }
}

fn to_pixels(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

/// The parts of a pointer, click or touch event the widget reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerSample {
    /// Mouse client coordinates, absent for touch events
    pub client: Option<(f64, f64)>,
    /// `changedTouches` client coordinates, in event order
    pub changed_touches: Vec<(f64, f64)>,
    /// `pointerId` of a pointer event, 0 otherwise
    pub pointer_id: i32,
    /// `buttons` bitmask; touch and pen contact report 1
    pub buttons: u16,
}

impl PointerSample {
    pub fn mouse(x: f64, y: f64) -> Self {
        Self {
            client: Some((x, y)),
            ..Self::default()
        }
    }

    pub fn touch(x: f64, y: f64) -> Self {
        Self {
            changed_touches: vec![(x, y)],
            ..Self::default()
        }
    }

    pub fn with_pointer(mut self, pointer_id: i32, buttons: u16) -> Self {
        self.pointer_id = pointer_id;
        self.buttons = buttons;
        self
    }

    /// Whether any button is held (or a touch/pen is in contact)
    pub fn is_pressed(&self) -> bool {
        self.buttons != 0
    }

    /// Client position, preferring mouse coordinates over the first touch
    pub fn client_position(&self) -> Option<(f64, f64)> {
        self.client
            .or_else(|| self.changed_touches.first().copied())
    }

    /// Position relative to the container's top-left corner
    pub fn resolve(&self, container: &ContainerBox) -> Option<(f64, f64)> {
        let (x, y) = self.client_position()?;
        Some((x - container.left, y - container.top))
    }

    /// Device coordinates inside `container`, `None` for empty events or boxes
    pub fn to_ndc(&self, container: &ContainerBox) -> Option<Point2<f32>> {
        let (x, y) = self.resolve(container)?;
        container.normalize(x, y)
    }
}
