/// hotspot3d web - WebGL2 viewer exported to JavaScript
///
/// `HotspotViewer` owns one widget and its browser host. Page scripts call
/// `start()` once the container exists and `stop()` when navigating away.

mod gl;
mod host;

use std::cell::RefCell;
use std::rc::Rc;

use hotspot_core::{ViewerConfig, ViewerWidget};
use wasm_bindgen::prelude::*;

use crate::host::{BrowserHost, Viewer};

/// Module start hook: browser logging and readable panics
#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    // A second module instance keeps the first logger
    console_log::init_with_level(log::Level::Debug).ok();
    Ok(())
}

#[wasm_bindgen]
pub struct HotspotViewer {
    inner: Rc<RefCell<Viewer>>,
}

#[wasm_bindgen]
impl HotspotViewer {
    /// Create a viewer from an optional JSON config; omitted fields take defaults
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<HotspotViewer, JsValue> {
        let config = match config_json {
            Some(json) => {
                ViewerConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?
            }
            None => ViewerConfig::default(),
        };
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let inner = Rc::new_cyclic(|weak| {
            RefCell::new(Viewer {
                widget: ViewerWidget::new(config),
                host: BrowserHost::new(window, document, weak.clone()),
            })
        });
        Ok(HotspotViewer { inner })
    }

    /// Build the scene in `container_id` (or the configured container) and start rendering
    pub fn start(&self, container_id: Option<String>) {
        let weak = Rc::downgrade(&self.inner);
        host::dispatch(&weak, |v| {
            let id = container_id.unwrap_or_else(|| v.widget.config().container_id.clone());
            v.widget.start(&mut v.host, &id);
        });
    }

    /// Stop the render loop; listeners are removed on the next tick
    pub fn stop(&self) {
        let weak = Rc::downgrade(&self.inner);
        host::dispatch(&weak, |v| v.widget.stop(&mut v.host));
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.inner.borrow().widget.is_running()
    }

    /// "idle", "loading", "active" or "stopped"
    pub fn phase(&self) -> String {
        self.inner.borrow().widget.phase().as_str().to_string()
    }

    /// Registered DOM listeners, including the window resize listener
    #[wasm_bindgen(js_name = listenerCount)]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().host.listener_count()
    }
}
