//! Small glow helpers: shader programs, FBO render targets, pixel readback and uploads.

use anyhow::{anyhow, bail};
use glow::HasContext;

use syphoncast_engine::FrameBuffer;

/// Fullscreen triangle vertex shader. `v_uv` has a bottom-left origin.
pub const VERT_SRC: &str = r#"#version 330 core
out vec2 v_uv;
void main() {
    vec2 pos;
    if (gl_VertexID == 0) pos = vec2(-1.0, -1.0);
    else if (gl_VertexID == 1) pos = vec2( 3.0, -1.0);
    else pos = vec2(-1.0,  3.0);
    v_uv = pos * 0.5 + 0.5;
    gl_Position = vec4(pos, 0.0, 1.0);
}
"#;

pub unsafe fn compile_program(
    gl: &glow::Context,
    vert_src: &str,
    frag_src: &str,
) -> anyhow::Result<glow::NativeProgram> {
    let vs = gl.create_shader(glow::VERTEX_SHADER).map_err(|e| anyhow!(e))?;
    gl.shader_source(vs, vert_src);
    gl.compile_shader(vs);
    if !gl.get_shader_compile_status(vs) {
        let log = gl.get_shader_info_log(vs);
        gl.delete_shader(vs);
        bail!("vertex shader compile error:\n{log}");
    }

    let fs = gl.create_shader(glow::FRAGMENT_SHADER).map_err(|e| anyhow!(e))?;
    gl.shader_source(fs, frag_src);
    gl.compile_shader(fs);
    if !gl.get_shader_compile_status(fs) {
        let log = gl.get_shader_info_log(fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        bail!("fragment shader compile error:\n{log}");
    }

    let program = gl.create_program().map_err(|e| anyhow!(e))?;
    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);
    gl.link_program(program);

    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);

    if !gl.get_program_link_status(program) {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        bail!("program link error:\n{log}");
    }

    Ok(program)
}

pub fn set_uniform_2f(gl: &glow::Context, prog: glow::NativeProgram, name: &str, x: f32, y: f32) {
    unsafe {
        if let Some(loc) = gl.get_uniform_location(prog, name) {
            gl.uniform_2_f32(Some(&loc), x, y);
        }
    }
}

pub fn set_uniform_1f(gl: &glow::Context, prog: glow::NativeProgram, name: &str, v: f32) {
    unsafe {
        if let Some(loc) = gl.get_uniform_location(prog, name) {
            gl.uniform_1_f32(Some(&loc), v);
        }
    }
}

pub fn set_uniform_1i(gl: &glow::Context, prog: glow::NativeProgram, name: &str, v: i32) {
    unsafe {
        if let Some(loc) = gl.get_uniform_location(prog, name) {
            gl.uniform_1_i32(Some(&loc), v);
        }
    }
}

/// Allocate (or reallocate) RGBA8 storage for the bound `TEXTURE_2D`.
unsafe fn alloc_rgba(gl: &glow::Context, w: i32, h: i32, data: Option<&[u8]>) {
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        glow::RGBA as i32,
        w,
        h,
        0,
        glow::RGBA,
        glow::UNSIGNED_BYTE,
        glow::PixelUnpackData::Slice(data),
    );
}

unsafe fn create_texture(gl: &glow::Context, filter: u32) -> anyhow::Result<glow::NativeTexture> {
    let tex = gl.create_texture().map_err(|e| anyhow!(e))?;
    gl.bind_texture(glow::TEXTURE_2D, Some(tex));
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
    Ok(tex)
}

/// Offscreen colour target (FBO + RGBA8 texture).
#[derive(Debug)]
pub struct RenderTarget {
    pub fbo: glow::NativeFramebuffer,
    pub tex: glow::NativeTexture,
    pub w: i32,
    pub h: i32,
}

impl RenderTarget {
    pub unsafe fn new(gl: &glow::Context, w: i32, h: i32) -> anyhow::Result<Self> {
        let tex = create_texture(gl, glow::LINEAR)?;
        alloc_rgba(gl, w, h, None);
        gl.bind_texture(glow::TEXTURE_2D, None);

        let fbo = gl.create_framebuffer().map_err(|e| anyhow!(e))?;
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(tex),
            0,
        );
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);

        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(fbo);
            gl.delete_texture(tex);
            bail!("FBO incomplete: 0x{status:x}");
        }

        Ok(Self { fbo, tex, w, h })
    }

    pub unsafe fn resize(&mut self, gl: &glow::Context, w: i32, h: i32) {
        if w == self.w && h == self.h {
            return;
        }
        self.w = w;
        self.h = h;
        gl.bind_texture(glow::TEXTURE_2D, Some(self.tex));
        alloc_rgba(gl, w, h, None);
        gl.bind_texture(glow::TEXTURE_2D, None);
    }

    pub unsafe fn destroy(&self, gl: &glow::Context) {
        gl.delete_framebuffer(self.fbo);
        gl.delete_texture(self.tex);
    }
}

/// Read an RGBA8 region from `fbo` (`None` = the window back buffer). Rows come back
/// bottom-up, as GL stores them.
pub unsafe fn read_rgba(
    gl: &glow::Context,
    fbo: Option<glow::NativeFramebuffer>,
    w: u32,
    h: u32,
) -> Option<FrameBuffer> {
    if w == 0 || h == 0 {
        return None;
    }
    let mut frame = FrameBuffer::new(w, h);
    gl.bind_framebuffer(glow::READ_FRAMEBUFFER, fbo);
    if fbo.is_none() {
        gl.read_buffer(glow::BACK);
    }
    gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
    gl.read_pixels(
        0,
        0,
        w as i32,
        h as i32,
        glow::RGBA,
        glow::UNSIGNED_BYTE,
        glow::PixelPackData::Slice(Some(frame.pixels_mut())),
    );
    gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
    Some(frame)
}

/// A GL texture mirroring a CPU frame. Row 0 of the frame lands in texture row 0, so a top-left
/// frame shows up vertically flipped in GL's bottom-left convention.
#[cfg_attr(not(any(all(target_os = "macos", has_syphon), target_os = "windows")), allow(dead_code))]
pub struct UploadTexture {
    gl: std::rc::Rc<glow::Context>,
    tex: glow::NativeTexture,
    w: u32,
    h: u32,
}

#[cfg_attr(not(any(all(target_os = "macos", has_syphon), target_os = "windows")), allow(dead_code))]
impl UploadTexture {
    pub fn new(gl: std::rc::Rc<glow::Context>, w: u32, h: u32) -> anyhow::Result<Self> {
        let tex = unsafe {
            let tex = create_texture(&gl, glow::NEAREST)?;
            alloc_rgba(&gl, w as i32, h as i32, None);
            gl.bind_texture(glow::TEXTURE_2D, None);
            tex
        };
        Ok(Self { gl, tex, w, h })
    }

    pub fn upload(&mut self, frame: &FrameBuffer) {
        let gl = &self.gl;
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(self.tex));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            if frame.size() == (self.w, self.h) {
                gl.tex_sub_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    0,
                    0,
                    self.w as i32,
                    self.h as i32,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(frame.pixels())),
                );
            } else {
                self.w = frame.width();
                self.h = frame.height();
                alloc_rgba(gl, self.w as i32, self.h as i32, Some(frame.pixels()));
            }
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    /// OpenGL texture name, for native sharing APIs.
    pub fn gl_name(&self) -> u32 {
        self.tex.0.get()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.w, self.h)
    }
}

impl Drop for UploadTexture {
    fn drop(&mut self) {
        unsafe { self.gl.delete_texture(self.tex) };
    }
}
