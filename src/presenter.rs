use glow::HasContext;

use crate::gl::{set_uniform_1i, set_uniform_2f};

/// Presentation-only preview renderer.
///
/// The scene always renders into the offscreen camera target. The window (the "game view")
/// simply *presents* that texture, letterboxed to fit. In headless mode the null presenter
/// leaves the back buffer untouched.
#[derive(Debug)]
pub enum Presenter {
    Window(WindowPresenter),
    Null(NullPresenter),
}

impl Presenter {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Presenter::Window(_))
    }

    /// Draw `tex` into the window back buffer. Swapping is left to the caller, which reads the
    /// back buffer first.
    pub fn present(&mut self, gl: &glow::Context, tex: glow::NativeTexture, src: (i32, i32), win: (i32, i32)) {
        match self {
            Presenter::Window(p) => p.present(gl, tex, src, win),
            Presenter::Null(_) => {}
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        if let Presenter::Window(p) = self {
            unsafe {
                gl.delete_program(p.program);
                gl.delete_vertex_array(p.vao);
            }
        }
    }
}

#[derive(Debug)]
pub struct WindowPresenter {
    pub program: glow::NativeProgram,
    pub vao: glow::NativeVertexArray,
}

impl WindowPresenter {
    pub fn present(&mut self, gl: &glow::Context, tex: glow::NativeTexture, src: (i32, i32), win: (i32, i32)) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(0, 0, win.0, win.1);
            gl.clear_color(0.02, 0.02, 0.02, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);

            gl.use_program(Some(self.program));
            gl.bind_vertex_array(Some(self.vao));

            set_uniform_2f(gl, self.program, "u_resolution", win.0 as f32, win.1 as f32);
            set_uniform_2f(gl, self.program, "u_src_resolution", src.0 as f32, src.1 as f32);
            set_uniform_1i(gl, self.program, "u_tex", 0);

            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(tex));

            gl.draw_arrays(glow::TRIANGLES, 0, 3);

            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
    }
}

#[derive(Debug, Default)]
pub struct NullPresenter;
