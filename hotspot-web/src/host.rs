/// Browser implementation of the viewer host: DOM listeners, animation
/// frames, timers and model fetches
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

use hotspot_core::loader;
use hotspot_core::{
    ContainerBox, Host, HostEvent, ListenerHandle, LoadTicket, PointerSample, ViewerConfig,
    ViewerError, ViewerWidget,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, Element, Event, EventTarget, MouseEvent, PointerEvent, Response, TouchEvent,
    WheelEvent, Window,
};

use crate::gl::GlSurface;

/// Widget plus the host that drives it, shared with every browser callback
pub struct Viewer {
    pub widget: ViewerWidget<GlSurface>,
    pub host: BrowserHost,
}

/// Run `f` against the viewer if it is still alive and not already borrowed
pub fn dispatch<F>(viewer: &Weak<RefCell<Viewer>>, f: F)
where
    F: FnOnce(&mut Viewer),
{
    let Some(viewer) = viewer.upgrade() else {
        return;
    };
    let Ok(mut guard) = viewer.try_borrow_mut() else {
        log::warn!("viewer busy, dropping callback");
        return;
    };
    f(&mut guard);
}

struct Registration {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

pub struct BrowserHost {
    window: Window,
    document: Document,
    viewer: Weak<RefCell<Viewer>>,
    next_listener: u64,
    listeners: HashMap<ListenerHandle, Registration>,
    frame_callback: Option<Closure<dyn FnMut()>>,
    frame_request: Option<i32>,
    teardown_callback: Option<Closure<dyn FnMut()>>,
    teardown_timer: Option<i32>,
}

impl BrowserHost {
    pub fn new(window: Window, document: Document, viewer: Weak<RefCell<Viewer>>) -> Self {
        Self {
            window,
            document,
            viewer,
            next_listener: 0,
            listeners: HashMap::new(),
            frame_callback: None,
            frame_request: None,
            teardown_callback: None,
            teardown_timer: None,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn event_callback(&self, event: HostEvent) -> Closure<dyn FnMut(Event)> {
        let viewer = self.viewer.clone();
        Closure::wrap(Box::new(move |e: Event| {
            // Page scroll on wheel; emulated click after touchend would open twice
            if matches!(event, HostEvent::Wheel | HostEvent::TouchEnd) {
                e.prevent_default();
            }
            dispatch(&viewer, |v| route_event(v, event, &e));
        }) as Box<dyn FnMut(Event)>)
    }
}

/// Forward one DOM event to the matching widget entry point
fn route_event(viewer: &mut Viewer, event: HostEvent, e: &Event) {
    let Viewer { widget, host } = viewer;
    match event {
        HostEvent::Resize => widget.on_resize(host),
        HostEvent::Click | HostEvent::TouchEnd => {
            widget.on_pointer_release(host, &pointer_sample(e));
        }
        HostEvent::PointerDown => {
            capture_pointer(e, true);
            widget.on_drag_start(&pointer_sample(e));
        }
        HostEvent::PointerMove => widget.on_drag(host, &pointer_sample(e)),
        HostEvent::PointerUp | HostEvent::PointerCancel => {
            capture_pointer(e, false);
            widget.on_drag_end(&pointer_sample(e));
        }
        HostEvent::Wheel => {
            if let Some(wheel) = e.dyn_ref::<WheelEvent>() {
                widget.on_wheel(wheel.delta_y());
            }
        }
    }
}

/// Keep pointer events flowing to the container while a drag leaves it
fn capture_pointer(e: &Event, capture: bool) {
    let (Some(pointer), Some(element)) = (
        e.dyn_ref::<PointerEvent>(),
        e.current_target().and_then(|t| t.dyn_into::<Element>().ok()),
    ) else {
        return;
    };
    let id = pointer.pointer_id();
    let result = if capture {
        element.set_pointer_capture(id)
    } else if element.has_pointer_capture(id) {
        element.release_pointer_capture(id)
    } else {
        Ok(())
    };
    if let Err(e) = result {
        log::warn!("pointer capture failed for {}: {}", id, describe(&e));
    }
}

/// Client coordinates of a mouse/pointer event or the changed touches of a touch event
fn pointer_sample(e: &Event) -> PointerSample {
    if let Some(pointer) = e.dyn_ref::<PointerEvent>() {
        return PointerSample::mouse(pointer.client_x() as f64, pointer.client_y() as f64)
            .with_pointer(pointer.pointer_id(), pointer.buttons());
    }
    if let Some(mouse) = e.dyn_ref::<MouseEvent>() {
        return PointerSample::mouse(mouse.client_x() as f64, mouse.client_y() as f64);
    }
    if let Some(touch) = e.dyn_ref::<TouchEvent>() {
        let list = touch.changed_touches();
        let changed_touches = (0..list.length())
            .filter_map(|i| list.get(i))
            .map(|t| (t.client_x() as f64, t.client_y() as f64))
            .collect();
        return PointerSample {
            changed_touches,
            ..PointerSample::default()
        };
    }
    PointerSample::default()
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

async fn fetch_bytes(window: &Window, path: &str) -> Result<Vec<u8>, ViewerError> {
    let response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|e| ViewerError::asset(path, describe(&e)))?;
    let response: Response = response
        .dyn_into()
        .map_err(|e| ViewerError::asset(path, describe(&e)))?;
    if !response.ok() {
        return Err(ViewerError::asset(path, format!("HTTP {}", response.status())));
    }
    let buffer = response
        .array_buffer()
        .map_err(|e| ViewerError::asset(path, describe(&e)))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|e| ViewerError::asset(path, describe(&e)))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

impl Host for BrowserHost {
    type Surface = GlSurface;

    fn container_box(&self, container_id: &str) -> Option<ContainerBox> {
        let element = self.document.get_element_by_id(container_id)?;
        let rect = element.get_bounding_client_rect();
        Some(ContainerBox::new(
            rect.left(),
            rect.top(),
            element.client_width() as f64,
            element.client_height() as f64,
        ))
    }

    fn create_surface(
        &mut self,
        container_id: &str,
        config: &ViewerConfig,
    ) -> hotspot_core::Result<GlSurface> {
        let container = self
            .document
            .get_element_by_id(container_id)
            .ok_or_else(|| ViewerError::MissingContainer(container_id.to_string()))?;
        let pixel_ratio = self.window.device_pixel_ratio().max(1.0);
        GlSurface::new(&self.document, &container, pixel_ratio, config)
    }

    fn listen(&mut self, container_id: &str, event: HostEvent) -> hotspot_core::Result<ListenerHandle> {
        let target: EventTarget = if event.on_window() {
            self.window.clone().into()
        } else {
            self.document
                .get_element_by_id(container_id)
                .ok_or_else(|| ViewerError::MissingContainer(container_id.to_string()))?
                .into()
        };

        let callback = self.event_callback(event);
        target
            .add_event_listener_with_callback(event.dom_name(), callback.as_ref().unchecked_ref())
            .map_err(|e| ViewerError::Surface(format!("addEventListener failed: {}", describe(&e))))?;

        self.next_listener += 1;
        let handle = ListenerHandle::new(self.next_listener);
        self.listeners.insert(
            handle,
            Registration {
                target,
                event: event.dom_name(),
                callback,
            },
        );
        log::trace!("listening for {} ({})", event.dom_name(), handle.id());
        Ok(handle)
    }

    fn unlisten(&mut self, handle: ListenerHandle) {
        let Some(registration) = self.listeners.remove(&handle) else {
            return;
        };
        if let Err(e) = registration.target.remove_event_listener_with_callback(
            registration.event,
            registration.callback.as_ref().unchecked_ref(),
        ) {
            log::warn!("removeEventListener failed: {}", describe(&e));
        }
        log::trace!("stopped listening for {} ({})", registration.event, handle.id());
    }

    fn request_frame(&mut self) {
        let viewer = self.viewer.clone();
        let callback = self.frame_callback.get_or_insert_with(|| {
            Closure::wrap(Box::new(move || {
                dispatch(&viewer, |v| {
                    v.host.frame_request = None;
                    v.widget.on_frame(&mut v.host);
                });
            }) as Box<dyn FnMut()>)
        });
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(id) => self.frame_request = Some(id),
            Err(e) => log::error!("requestAnimationFrame failed: {}", describe(&e)),
        }
    }

    fn schedule_teardown(&mut self) {
        let viewer = self.viewer.clone();
        let callback = self.teardown_callback.get_or_insert_with(|| {
            Closure::wrap(Box::new(move || {
                dispatch(&viewer, |v| {
                    v.host.teardown_timer = None;
                    v.widget.finish_teardown(&mut v.host);
                });
            }) as Box<dyn FnMut()>)
        });
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), 0)
        {
            Ok(id) => self.teardown_timer = Some(id),
            Err(e) => log::error!("setTimeout failed: {}", describe(&e)),
        }
    }

    fn request_model(&mut self, path: &str, ticket: LoadTicket) {
        let window = self.window.clone();
        let viewer = self.viewer.clone();
        let path = path.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch_bytes(&window, &path)
                .await
                .and_then(|bytes| loader::parse_model(&path, &bytes));
            dispatch(&viewer, |v| v.widget.on_model_loaded(ticket, result));
        });
    }

    fn open_url(&mut self, url: &str) {
        match self.window.open_with_url_and_target(url, "_blank") {
            Ok(Some(_)) => {}
            Ok(None) => log::warn!("popup blocked for {}", url),
            Err(e) => log::error!("could not open {}: {}", url, describe(&e)),
        }
    }
}

impl Drop for BrowserHost {
    fn drop(&mut self) {
        // Pending callbacks must not fire into freed closures
        if let Some(id) = self.frame_request.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        if let Some(id) = self.teardown_timer.take() {
            self.window.clear_timeout_with_handle(id);
        }
        let handles: Vec<ListenerHandle> = self.listeners.keys().copied().collect();
        for handle in handles {
            self.unlisten(handle);
        }
    }
}
