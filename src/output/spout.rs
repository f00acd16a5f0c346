//! Spout publish backend (Windows).
//!
//! The Spout2 bridge exposes one sender per process, so only one channel can be open at a
//! time; the session never holds more than one.

use std::rc::Rc;

use syphoncast_engine::host::{PublishChannel, PublishSink};
use syphoncast_engine::CaptureError;

#[cfg(target_os = "windows")]
mod win {
    use std::ffi::CString;
    use std::rc::Rc;

    use syphoncast_engine::host::PublishChannel;
    use syphoncast_engine::{CaptureError, FrameBuffer};

    use crate::gl::UploadTexture;

    #[link(name = "spout_bridge")]
    extern "C" {
        fn spout_init_sender(sender_name: *const i8, width: i32, height: i32) -> i32;
        fn spout_send_gl_texture(gl_tex_id: u32, width: i32, height: i32, invert: i32) -> i32;
        fn spout_shutdown();
    }

    pub struct SpoutChannel {
        tex: UploadTexture,
        invert: bool,
    }

    impl SpoutChannel {
        pub fn open(
            gl: Rc<glow::Context>,
            name: &str,
            width: u32,
            height: u32,
            invert: bool,
        ) -> Result<Self, CaptureError> {
            let c = CString::new(name)
                .map_err(|_| CaptureError::unavailable("sender name contains a NUL byte"))?;
            let tex = UploadTexture::new(gl, width, height)
                .map_err(|e| CaptureError::unavailable(format!("texture upload target: {e}")))?;
            let ok = unsafe { spout_init_sender(c.as_ptr(), width as i32, height as i32) };
            if ok != 1 {
                return Err(CaptureError::unavailable(format!(
                    "Spout sender '{name}' could not be created"
                )));
            }
            Ok(Self { tex, invert })
        }
    }

    impl PublishChannel for SpoutChannel {
        fn frame_ready(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
            self.tex.upload(frame);
            let (w, h) = self.tex.size();
            let ok = unsafe {
                spout_send_gl_texture(self.tex.gl_name(), w as i32, h as i32, self.invert as i32)
            };
            if ok == 1 {
                Ok(())
            } else {
                Err(CaptureError::unavailable("Spout send failed"))
            }
        }
    }

    impl Drop for SpoutChannel {
        fn drop(&mut self) {
            unsafe { spout_shutdown() };
        }
    }
}

pub struct SpoutSink {
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    gl: Rc<glow::Context>,
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    invert: bool,
}

impl SpoutSink {
    pub fn new(gl: Rc<glow::Context>, invert: bool) -> Self {
        Self { gl, invert }
    }
}

impl PublishSink for SpoutSink {
    #[cfg(target_os = "windows")]
    fn create(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PublishChannel>, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::unavailable("Spout sender needs a positive size"));
        }
        Ok(Box::new(win::SpoutChannel::open(
            self.gl.clone(),
            name,
            width,
            height,
            self.invert,
        )?))
    }

    #[cfg(not(target_os = "windows"))]
    fn create(
        &mut self,
        _name: &str,
        _width: u32,
        _height: u32,
    ) -> Result<Box<dyn PublishChannel>, CaptureError> {
        Err(CaptureError::unavailable("Spout is Windows-only"))
    }
}
