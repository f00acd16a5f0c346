//! The animated scene the host camera renders, plus the preview presentation shader.
//!
//! `assets/shaders/scene.frag` and `assets/shaders/present.frag` override the built-in sources
//! when present.

use anyhow::Context as _;
use glow::HasContext;

use syphoncast_engine::assets::{read_to_string_result, AssetsRoot};

use crate::gl::{compile_program, set_uniform_1f, set_uniform_2f, RenderTarget, VERT_SRC};
use crate::logi;

const SCENE_FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 o_color;
uniform vec2 u_resolution;
uniform float u_time;

void main() {
    vec2 p = (v_uv - 0.5) * vec2(u_resolution.x / max(u_resolution.y, 1.0), 1.0);
    float r = length(p);
    float a = atan(p.y, p.x);
    float bands = 0.5 + 0.5 * sin(12.0 * r - u_time * 2.0 + 3.0 * sin(a * 3.0 + u_time));
    vec3 col = mix(vec3(0.08, 0.10, 0.18), vec3(0.95, 0.55, 0.20), bands);
    col *= smoothstep(0.9, 0.2, r);
    // Alpha falls off toward the edges so keep_alpha has something to carry.
    o_color = vec4(col, smoothstep(0.75, 0.35, r));
}
"#;

/// Letterboxed presentation of the camera texture.
pub const PRESENT_FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 o_color;
uniform sampler2D u_tex;
uniform vec2 u_resolution;
uniform vec2 u_src_resolution;

void main() {
    float win_aspect = u_resolution.x / max(u_resolution.y, 1.0);
    float src_aspect = u_src_resolution.x / max(u_src_resolution.y, 1.0);
    vec2 uv = v_uv - 0.5;
    if (win_aspect > src_aspect) {
        uv.x *= win_aspect / src_aspect;
    } else {
        uv.y *= src_aspect / win_aspect;
    }
    uv += 0.5;
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0) {
        o_color = vec4(0.02, 0.02, 0.02, 1.0);
        return;
    }
    o_color = vec4(texture(u_tex, uv).rgb, 1.0);
}
"#;

/// Shader source from `assets/shaders/<name>`, or `builtin` when the file does not exist.
pub fn shader_source(assets: &AssetsRoot, name: &str, builtin: &str) -> anyhow::Result<String> {
    let path = assets.join("shaders").join(name);
    if !path.exists() {
        return Ok(builtin.to_string());
    }
    logi!("INIT", "shader override: {}", path.display());
    Ok(read_to_string_result(&path)?)
}

pub struct Scene {
    program: glow::NativeProgram,
    vao: glow::NativeVertexArray,
}

impl Scene {
    pub fn new(gl: &glow::Context, assets: &AssetsRoot) -> anyhow::Result<Self> {
        let frag = shader_source(assets, "scene.frag", SCENE_FRAG)?;
        unsafe {
            let program = compile_program(gl, VERT_SRC, &frag).context("scene shader")?;
            let vao = gl
                .create_vertex_array()
                .map_err(|e| anyhow::anyhow!(e))
                .context("scene vao")?;
            Ok(Self { program, vao })
        }
    }

    /// Render one frame of the scene into the camera target.
    pub fn render(&self, gl: &glow::Context, target: &RenderTarget, time: f32) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.fbo));
            gl.viewport(0, 0, target.w, target.h);
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(glow::COLOR_BUFFER_BIT);

            gl.use_program(Some(self.program));
            gl.bind_vertex_array(Some(self.vao));
            set_uniform_2f(gl, self.program, "u_resolution", target.w as f32, target.h as f32);
            set_uniform_1f(gl, self.program, "u_time", time);
            gl.draw_arrays(glow::TRIANGLES, 0, 3);

            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.program);
            gl.delete_vertex_array(self.vao);
        }
    }
}
