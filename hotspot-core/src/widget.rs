/// The viewer widget: bootstrap, frame loop, hit-testing, resize and teardown
use crate::config::ViewerConfig;
use crate::error::Result;
use crate::geometry::Model;
use crate::host::{Host, HostEvent, ListenerHandle, RenderSurface};
use crate::lifecycle::{Lifecycle, LoadTicket, Phase};
use crate::orbit::{GestureStep, OrbitControls, OrbitGesture};
use crate::pointer::PointerSample;
use crate::projection::Camera;
use crate::raycast::intersect_objects;
use crate::scene::Scene;

/// Everything owned while a scene is alive in a container
struct Session<S> {
    container_id: String,
    surface: S,
    camera: Camera,
    controls: OrbitControls,
    scene: Scene,
    listeners: Vec<ListenerHandle>,
    /// Pointers currently pressed for orbiting
    gesture: OrbitGesture,
}

/// A 3D canvas embedded in a host container.
///
/// The widget performs no I/O itself. The host forwards frame callbacks,
/// DOM events, model loads and teardown ticks to the `on_*` methods, and the
/// widget asks the host for side effects through [`Host`].
pub struct ViewerWidget<S> {
    config: ViewerConfig,
    state: Lifecycle,
    session: Option<Session<S>>,
    /// Stopped session waiting for `finish_teardown`
    retiring: Option<Session<S>>,
}

impl<S: RenderSurface> ViewerWidget<S> {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            state: Lifecycle::new(),
            session: None,
            retiring: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.session.as_ref().map(|s| &s.camera)
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.session.as_ref().map(|s| &s.scene)
    }

    pub fn surface(&self) -> Option<&S> {
        self.session.as_ref().map(|s| &s.surface)
    }

    /// Build the scene inside `container_id` and start the frame loop.
    ///
    /// A missing container is logged and leaves the widget untouched.
    pub fn start<H>(&mut self, host: &mut H, container_id: &str)
    where
        H: Host<Surface = S>,
    {
        // Never leave a previous loop's listeners behind
        if let Some(previous) = self.session.take() {
            self.state.stop();
            self.release(host, previous);
        }
        if let Some(previous) = self.retiring.take() {
            self.release(host, previous);
        }

        let Some(container) = host.container_box(container_id) else {
            log::warn!("no container element found: {}", container_id);
            return;
        };

        let (width, height) = container.pixel_size();
        let session = match self.build_session(host, container_id, width, height) {
            Ok(session) => session,
            Err(e) => {
                log::error!("viewer start aborted: {}", e);
                return;
            }
        };

        let resize = match host.listen(container_id, HostEvent::Resize) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("viewer start aborted: {}", e);
                self.release(host, session);
                return;
            }
        };

        let ticket = self.state.begin(resize);
        host.request_model(&self.config.model_path, ticket);
        log::info!(
            "viewer started in #{} at {}x{}, loading {}",
            container_id,
            width,
            height,
            self.config.model_path
        );

        self.session = Some(session);
        self.schedule_frame(host);
    }

    fn build_session<H>(
        &self,
        host: &mut H,
        container_id: &str,
        width: u32,
        height: u32,
    ) -> Result<Session<S>>
    where
        H: Host<Surface = S>,
    {
        let camera_config = &self.config.camera;
        let mut camera = Camera::new(width, height);
        camera.fov = camera_config.fov_degrees.to_radians();
        camera.near = camera_config.near;
        camera.far = camera_config.far;
        camera.position = camera_config.initial_position(width, height);

        let controls = OrbitControls::new(
            &camera,
            camera_config.target_point(),
            self.config.orbit.clone(),
        );
        controls.apply(&mut camera);

        let mut surface = host.create_surface(container_id, &self.config)?;
        surface.set_size(width, height);

        let mut listeners = Vec::with_capacity(HostEvent::CONTAINER.len());
        for event in HostEvent::CONTAINER {
            match host.listen(container_id, event) {
                Ok(handle) => listeners.push(handle),
                Err(e) => {
                    for handle in listeners {
                        host.unlisten(handle);
                    }
                    return Err(e);
                }
            }
        }

        Ok(Session {
            container_id: container_id.to_string(),
            surface,
            camera,
            controls,
            scene: Scene::from_config(&self.config),
            listeners,
            gesture: OrbitGesture::default(),
        })
    }

    fn schedule_frame<H: Host<Surface = S>>(&mut self, host: &mut H) {
        if self.state.claim_frame() {
            host.request_frame();
        }
    }

    /// Animation frame callback. Returns whether a frame was drawn.
    pub fn on_frame<H>(&mut self, host: &mut H) -> bool
    where
        H: Host<Surface = S>,
    {
        self.state.frame_fired();
        if !self.state.phase().renders() {
            log::debug!("stopping animation");
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        if self.state.claim_frame() {
            host.request_frame();
        }
        session.surface.render(&session.scene, &session.camera);
        true
    }

    /// Model fetch finished. Results for an earlier session are dropped.
    ///
    /// A failed load keeps the empty scene rendering; hit-testing stays off.
    pub fn on_model_loaded(&mut self, ticket: LoadTicket, result: Result<Model>) {
        if !self.state.is_current(ticket) {
            log::debug!("discarding model load {} for a finished session", ticket.id());
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match result {
            Ok(model) => {
                log::info!(
                    "model attached: {} objects, {} triangles",
                    model.children.len(),
                    model.triangle_count()
                );
                session.scene.attach_model(model);
                self.state.activate(ticket);
            }
            Err(e) => {
                log::error!("model load failed, rendering without it: {}", e);
            }
        }
    }

    /// Click or touch-end: open the hotspot URL under the pointer, if any.
    ///
    /// Returns the URL that was opened.
    pub fn on_pointer_release<H>(&mut self, host: &mut H, sample: &PointerSample) -> Option<String>
    where
        H: Host<Surface = S>,
    {
        if self.state.phase() != Phase::Active {
            return None;
        }
        let session = self.session.as_ref()?;
        let model = session.scene.model()?;
        let container = host.container_box(&session.container_id)?;

        let ndc = sample.to_ndc(&container)?;
        let ray = session.camera.ray_through(ndc)?;
        let hits = intersect_objects(&ray, &model.children, &model.transform);
        let nearest = hits.first()?;
        log::debug!("pointer hit '{}' at {:.2}", nearest.name, nearest.distance);

        let url = self.config.hotspots.resolve(&nearest.name)?.to_string();
        log::info!("opening {} for '{}'", url, nearest.name);
        host.open_url(&url);
        Some(url)
    }

    /// Pointer pressed: it joins the orbit gesture
    pub fn on_drag_start(&mut self, sample: &PointerSample) {
        if !self.state.is_running() {
            return;
        }
        let (Some(session), Some(at)) = (self.session.as_mut(), sample.client_position()) else {
            return;
        };
        session.gesture.press(sample.pointer_id, at);
    }

    /// Pointer moved: one pressed pointer rotates, two pinch-dolly.
    ///
    /// A move with no button held means the release happened out of sight;
    /// that pointer leaves the gesture instead of rotating on hover.
    pub fn on_drag<H>(&mut self, host: &mut H, sample: &PointerSample)
    where
        H: Host<Surface = S>,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !sample.is_pressed() {
            session.gesture.release(sample.pointer_id);
            return;
        }
        let Some(at) = sample.client_position() else {
            return;
        };

        match session.gesture.move_to(sample.pointer_id, at) {
            GestureStep::Rotate { dx, dy } => {
                let Some(container) = host.container_box(&session.container_id) else {
                    return;
                };
                session.controls.rotate(dx, dy, container.height as f32);
            }
            GestureStep::Pinch { scale } => session.controls.scale_radius(scale),
            GestureStep::Idle => return,
        }
        session.controls.apply(&mut session.camera);
    }

    /// Pointer released or cancelled: it leaves the gesture
    pub fn on_drag_end(&mut self, sample: &PointerSample) {
        if let Some(session) = self.session.as_mut() {
            session.gesture.release(sample.pointer_id);
        }
    }

    /// Wheel: dolly in for negative deltas, out for positive ones
    pub fn on_wheel(&mut self, delta_y: f64) {
        if !self.state.is_running() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.controls.dolly(delta_y as f32);
            session.controls.apply(&mut session.camera);
        }
    }

    /// Window resize: follow the container size.
    ///
    /// A container measuring zero width (removed or hidden) deregisters the
    /// resize listener instead of applying the degenerate size.
    pub fn on_resize<H>(&mut self, host: &mut H)
    where
        H: Host<Surface = S>,
    {
        if !self.state.is_running() || self.state.resize_listener().is_none() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let (width, height) = host
            .container_box(&session.container_id)
            .map(|b| b.pixel_size())
            .unwrap_or((0, 0));

        if width == 0 {
            if let Some(handle) = self.state.take_resize_listener() {
                host.unlisten(handle);
                log::info!("resize listener removed for #{}", session.container_id);
            }
            return;
        }
        if height == 0 {
            return;
        }

        session.camera.set_aspect(width, height);
        session.surface.set_size(width, height);
    }

    /// Phase one of teardown: stop the loop and schedule release for the next tick.
    ///
    /// Listeners and references are released in [`finish_teardown`](Self::finish_teardown),
    /// never within this call.
    pub fn stop<H>(&mut self, host: &mut H)
    where
        H: Host<Surface = S>,
    {
        if !self.state.stop() {
            return;
        }
        log::info!("viewer stopping");

        if let Some(stale) = self.retiring.take() {
            self.release(host, stale);
        }
        self.retiring = self.session.take();
        host.schedule_teardown();
    }

    /// Phase two of teardown: deregister listeners and drop the stopped session
    pub fn finish_teardown<H>(&mut self, host: &mut H)
    where
        H: Host<Surface = S>,
    {
        if let Some(session) = self.retiring.take() {
            self.release(host, session);
            log::info!("viewer resources released");
        }
    }

    fn release<H>(&mut self, host: &mut H, session: Session<S>)
    where
        H: Host<Surface = S>,
    {
        for handle in session.listeners {
            host.unlisten(handle);
        }
        if let Some(handle) = self.state.take_resize_listener() {
            host.unlisten(handle);
        }
        // Surface, camera, controls and scene drop here
    }
}
