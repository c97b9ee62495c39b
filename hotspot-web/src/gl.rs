/// WebGL2 render surface: flat-lit model, fog and a transparent grid
use hotspot_core::{Camera, Model, RenderSurface, Scene, ViewerConfig, ViewerError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject,
};

/// position, normal, color
const MESH_STRIDE: i32 = 9;
/// position, color
const LINE_STRIDE: i32 = 6;
const FLOAT_BYTES: i32 = 4;

const MESH_VERT: &str = r#"#version 300 es
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
layout(location = 2) in vec3 a_color;
uniform mat4 u_view_proj;
uniform vec3 u_eye;
out vec3 v_normal;
out vec3 v_color;
out float v_distance;
void main() {
    v_normal = a_normal;
    v_color = a_color;
    v_distance = length(a_position - u_eye);
    gl_Position = u_view_proj * vec4(a_position, 1.0);
}
"#;

const MESH_FRAG: &str = r#"#version 300 es
precision mediump float;
in vec3 v_normal;
in vec3 v_color;
in float v_distance;
uniform float u_ambient;
uniform float u_key;
uniform vec3 u_key_dir;
uniform vec3 u_fog_color;
uniform vec2 u_fog_range;
out vec4 out_color;
void main() {
    vec3 n = normalize(v_normal);
    float light = u_ambient + u_key * max(dot(n, u_key_dir), 0.0);
    float fog = clamp((v_distance - u_fog_range.x) / max(u_fog_range.y - u_fog_range.x, 1e-4), 0.0, 1.0);
    out_color = vec4(mix(v_color * light, u_fog_color, fog), 1.0);
}
"#;

const LINE_VERT: &str = r#"#version 300 es
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_color;
uniform mat4 u_view_proj;
uniform vec3 u_eye;
out vec3 v_color;
out float v_distance;
void main() {
    v_color = a_color;
    v_distance = length(a_position - u_eye);
    gl_Position = u_view_proj * vec4(a_position, 1.0);
}
"#;

const LINE_FRAG: &str = r#"#version 300 es
precision mediump float;
in vec3 v_color;
in float v_distance;
uniform float u_opacity;
uniform vec3 u_fog_color;
uniform vec2 u_fog_range;
out vec4 out_color;
void main() {
    float fog = clamp((v_distance - u_fog_range.x) / max(u_fog_range.y - u_fog_range.x, 1e-4), 0.0, 1.0);
    out_color = vec4(mix(v_color, u_fog_color, fog), u_opacity * (1.0 - fog));
}
"#;

/// GPU geometry uploaded from the CPU-side description
struct Batch {
    vao: WebGlVertexArrayObject,
    buffer: WebGlBuffer,
    vertex_count: i32,
}

/// Canvas appended to the container plus the GL objects drawing into it
pub struct GlSurface {
    canvas: HtmlCanvasElement,
    gl: GL,
    pixel_ratio: f64,
    mesh_program: WebGlProgram,
    line_program: WebGlProgram,
    model: Option<Batch>,
    model_revision: u64,
    grid: Option<Batch>,
}

impl GlSurface {
    pub fn new(
        document: &Document,
        container: &Element,
        pixel_ratio: f64,
        config: &ViewerConfig,
    ) -> Result<Self, ViewerError> {
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .and_then(|e| e.dyn_into::<HtmlCanvasElement>().map_err(JsValue::from))
            .map_err(|e| surface_error("could not create canvas", &e))?;

        let options = js_sys::Object::new();
        js_sys::Reflect::set(&options, &"antialias".into(), &config.antialias.into())
            .map_err(|e| surface_error("could not set context options", &e))?;
        let gl: GL = canvas
            .get_context_with_context_options("webgl2", &options)
            .map_err(|e| surface_error("could not get context", &e))?
            .ok_or_else(|| ViewerError::Surface("WebGL2 not supported".to_string()))?
            .dyn_into()
            .map_err(|e| surface_error("unexpected context type", &e))?;

        let mesh_program = link_program(&gl, MESH_VERT, MESH_FRAG)?;
        let line_program = link_program(&gl, LINE_VERT, LINE_FRAG)?;

        set_style(&canvas, "display", "block");
        // Touch drags orbit the camera instead of scrolling the page
        set_style(&canvas, "touch-action", "none");
        container
            .append_child(&canvas)
            .map_err(|e| surface_error("could not attach canvas", &e))?;

        log::debug!("WebGL2 surface created (pixel ratio {})", pixel_ratio);
        Ok(Self {
            canvas,
            gl,
            pixel_ratio,
            mesh_program,
            line_program,
            model: None,
            model_revision: 0,
            grid: None,
        })
    }

    fn sync_model(&mut self, scene: &Scene) -> Result<(), ViewerError> {
        if scene.revision() == self.model_revision {
            return Ok(());
        }
        if let Some(old) = self.model.take() {
            self.delete_batch(old);
        }
        if let Some(model) = scene.model() {
            let data = model_vertices(model);
            self.model = Some(self.upload(&data, &[(0, 3), (1, 3), (2, 3)], MESH_STRIDE)?);
        }
        self.model_revision = scene.revision();
        Ok(())
    }

    fn sync_grid(&mut self, scene: &Scene) -> Result<(), ViewerError> {
        if self.grid.is_some() {
            return Ok(());
        }
        let data: Vec<f32> = scene
            .grid
            .lines()
            .iter()
            .flat_map(|line| {
                let c = line.color.to_array();
                [
                    line.from.x, line.from.y, line.from.z, c[0], c[1], c[2],
                    line.to.x, line.to.y, line.to.z, c[0], c[1], c[2],
                ]
            })
            .collect();
        self.grid = Some(self.upload(&data, &[(0, 3), (1, 3)], LINE_STRIDE)?);
        Ok(())
    }

    /// Upload interleaved floats; `layout` lists (attribute location, component count)
    fn upload(&self, data: &[f32], layout: &[(u32, i32)], stride: i32) -> Result<Batch, ViewerError> {
        let gl = &self.gl;
        let vao = gl
            .create_vertex_array()
            .ok_or_else(|| ViewerError::Surface("could not create vertex array".to_string()))?;
        let buffer = gl
            .create_buffer()
            .ok_or_else(|| ViewerError::Surface("could not create buffer".to_string()))?;

        gl.bind_vertex_array(Some(&vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let array = js_sys::Float32Array::from(data);
        gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &array, GL::STATIC_DRAW);

        let mut offset = 0;
        for &(location, size) in layout {
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer_with_i32(
                location,
                size,
                GL::FLOAT,
                false,
                stride * FLOAT_BYTES,
                offset * FLOAT_BYTES,
            );
            offset += size;
        }
        gl.bind_vertex_array(None);

        Ok(Batch {
            vao,
            buffer,
            vertex_count: data.len() as i32 / stride,
        })
    }

    fn delete_batch(&self, batch: Batch) {
        self.gl.delete_vertex_array(Some(&batch.vao));
        self.gl.delete_buffer(Some(&batch.buffer));
    }

    fn uniform(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn set_common_uniforms(&self, program: &WebGlProgram, scene: &Scene, camera: &Camera) {
        let gl = &self.gl;
        let view_proj = camera.view_projection();
        gl.uniform_matrix4fv_with_f32_array(
            self.uniform(program, "u_view_proj").as_ref(),
            false,
            view_proj.as_slice(),
        );
        let eye = camera.position;
        gl.uniform3f(self.uniform(program, "u_eye").as_ref(), eye.x, eye.y, eye.z);
        let fog = scene.fog.color;
        gl.uniform3f(self.uniform(program, "u_fog_color").as_ref(), fog.r, fog.g, fog.b);
        gl.uniform2f(
            self.uniform(program, "u_fog_range").as_ref(),
            scene.fog.near,
            scene.fog.far,
        );
    }

    fn draw(&mut self, scene: &Scene, camera: &Camera) -> Result<(), ViewerError> {
        self.sync_grid(scene)?;
        self.sync_model(scene)?;

        let gl = &self.gl;
        let bg = scene.background;
        gl.viewport(0, 0, self.canvas.width() as i32, self.canvas.height() as i32);
        gl.clear_color(bg.r, bg.g, bg.b, 1.0);
        gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
        gl.enable(GL::DEPTH_TEST);

        if let Some(model) = &self.model {
            gl.use_program(Some(&self.mesh_program));
            self.set_common_uniforms(&self.mesh_program, scene, camera);
            let lighting = &scene.lighting;
            let dir = lighting.key_direction;
            gl.uniform1f(self.uniform(&self.mesh_program, "u_ambient").as_ref(), lighting.ambient);
            gl.uniform1f(self.uniform(&self.mesh_program, "u_key").as_ref(), lighting.key);
            gl.uniform3f(
                self.uniform(&self.mesh_program, "u_key_dir").as_ref(),
                dir.x,
                dir.y,
                dir.z,
            );
            gl.bind_vertex_array(Some(&model.vao));
            gl.draw_arrays(GL::TRIANGLES, 0, model.vertex_count);
        }

        // Transparent grid: blended, depth-tested, never writes depth
        if let Some(grid) = &self.grid {
            gl.use_program(Some(&self.line_program));
            self.set_common_uniforms(&self.line_program, scene, camera);
            gl.uniform1f(
                self.uniform(&self.line_program, "u_opacity").as_ref(),
                scene.grid.opacity,
            );
            gl.enable(GL::BLEND);
            gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
            gl.depth_mask(false);
            gl.bind_vertex_array(Some(&grid.vao));
            gl.draw_arrays(GL::LINES, 0, grid.vertex_count);
            gl.depth_mask(true);
            gl.disable(GL::BLEND);
        }

        gl.bind_vertex_array(None);
        Ok(())
    }
}

impl RenderSurface for GlSurface {
    fn set_size(&mut self, width: u32, height: u32) {
        let scaled = |v: u32| (v as f64 * self.pixel_ratio).round().max(1.0) as u32;
        self.canvas.set_width(scaled(width));
        self.canvas.set_height(scaled(height));
        set_style(&self.canvas, "width", &format!("{}px", width));
        set_style(&self.canvas, "height", &format!("{}px", height));
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) {
        if let Err(e) = self.draw(scene, camera) {
            log::error!("render failed: {}", e);
        }
    }
}

impl Drop for GlSurface {
    fn drop(&mut self) {
        if let Some(batch) = self.model.take() {
            self.delete_batch(batch);
        }
        if let Some(batch) = self.grid.take() {
            self.delete_batch(batch);
        }
        self.gl.delete_program(Some(&self.mesh_program));
        self.gl.delete_program(Some(&self.line_program));
        self.canvas.remove();
        log::debug!("WebGL2 surface released");
    }
}

/// World-space interleaved vertices for every mesh in the model
fn model_vertices(model: &Model) -> Vec<f32> {
    let mut data = Vec::with_capacity(model.triangle_count() * 3 * MESH_STRIDE as usize);
    model.visit(&mut |object, world| {
        let color = object.color.to_array();
        for triangle in &object.mesh.triangles {
            for vertex in &triangle.vertices {
                let p = world.transform_point(&vertex.position);
                let n = world
                    .transform_vector(&vertex.normal)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(vertex.normal);
                data.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
                data.extend_from_slice(&color);
            }
        }
    });
    data
}

fn set_style(canvas: &HtmlCanvasElement, property: &str, value: &str) {
    if let Err(e) = canvas.style().set_property(property, value) {
        log::warn!("could not set canvas {}: {:?}", property, e);
    }
}

fn surface_error(context: &str, err: &JsValue) -> ViewerError {
    ViewerError::Surface(format!("{}: {:?}", context, err))
}

fn compile_shader(gl: &GL, src: &str, shader_type: u32) -> Result<WebGlShader, ViewerError> {
    let shader = gl
        .create_shader(shader_type)
        .ok_or_else(|| ViewerError::Surface("could not create shader".to_string()))?;
    gl.shader_source(&shader, src);
    gl.compile_shader(&shader);
    if !gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        return Err(ViewerError::Surface(format!("shader compile failed: {}", log)));
    }
    Ok(shader)
}

fn link_program(gl: &GL, vert_src: &str, frag_src: &str) -> Result<WebGlProgram, ViewerError> {
    let vert = compile_shader(gl, vert_src, GL::VERTEX_SHADER)?;
    let frag = compile_shader(gl, frag_src, GL::FRAGMENT_SHADER)?;
    let program = gl
        .create_program()
        .ok_or_else(|| ViewerError::Surface("could not create program".to_string()))?;
    gl.attach_shader(&program, &vert);
    gl.attach_shader(&program, &frag);
    gl.link_program(&program);
    // Shaders are no longer needed once linked
    gl.delete_shader(Some(&vert));
    gl.delete_shader(Some(&frag));
    if !gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        return Err(ViewerError::Surface(format!("program link failed: {}", log)));
    }
    Ok(program)
}
