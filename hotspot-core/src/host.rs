/// The seam between the viewer core and the page it is embedded in
use crate::config::ViewerConfig;
use crate::error::Result;
use crate::lifecycle::LoadTicket;
use crate::pointer::ContainerBox;
use crate::projection::Camera;
use crate::scene::Scene;

/// Registration id returned by [`Host::listen`] and passed back to [`Host::unlisten`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Events the widget subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    /// Window-level resize
    Resize,
    Click,
    TouchEnd,
    PointerDown,
    PointerMove,
    PointerUp,
    /// Browser took over the pointer (scroll, gesture, lost capture)
    PointerCancel,
    Wheel,
}

impl HostEvent {
    /// Container-level events registered on every start
    pub const CONTAINER: [HostEvent; 7] = [
        HostEvent::Click,
        HostEvent::TouchEnd,
        HostEvent::PointerDown,
        HostEvent::PointerMove,
        HostEvent::PointerUp,
        HostEvent::PointerCancel,
        HostEvent::Wheel,
    ];

    /// DOM event type name
    pub fn dom_name(self) -> &'static str {
        match self {
            HostEvent::Resize => "resize",
            HostEvent::Click => "click",
            HostEvent::TouchEnd => "touchend",
            HostEvent::PointerDown => "pointerdown",
            HostEvent::PointerMove => "pointermove",
            HostEvent::PointerUp => "pointerup",
            HostEvent::PointerCancel => "pointercancel",
            HostEvent::Wheel => "wheel",
        }
    }

    /// Whether the listener attaches to the window rather than the container
    pub fn on_window(self) -> bool {
        self == HostEvent::Resize
    }
}

/// Something that can draw a scene, typically a canvas inside the container
pub trait RenderSurface {
    /// Resize the drawing surface to `width` x `height` layout pixels
    fn set_size(&mut self, width: u32, height: u32);

    /// Draw one frame
    fn render(&mut self, scene: &Scene, camera: &Camera);
}

/// Side effects the widget asks of its embedding environment.
///
/// Every callback the host receives (frames, listener events, model loads,
/// teardown ticks) is forwarded back to the matching `ViewerWidget` method.
pub trait Host {
    type Surface: RenderSurface;

    /// Current layout box of the container, `None` when it is not in the document
    fn container_box(&self, container_id: &str) -> Option<ContainerBox>;

    /// Create a render surface attached to the container
    fn create_surface(&mut self, container_id: &str, config: &ViewerConfig) -> Result<Self::Surface>;

    /// Subscribe to `event`; window events ignore `container_id`
    fn listen(&mut self, container_id: &str, event: HostEvent) -> Result<ListenerHandle>;

    /// Remove a subscription; unknown handles are ignored
    fn unlisten(&mut self, handle: ListenerHandle);

    /// Schedule one `on_frame` call for the next animation frame
    fn request_frame(&mut self);

    /// Schedule one `finish_teardown` call on the next event-loop tick, never synchronously
    fn schedule_teardown(&mut self);

    /// Start fetching the model; the outcome goes to `on_model_loaded` with `ticket`
    fn request_model(&mut self, path: &str, ticket: LoadTicket);

    /// Open `url` in a new browsing context
    fn open_url(&mut self, url: &str);
}
