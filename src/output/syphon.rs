//! Syphon publish backend (macOS).
//!
//! build.rs emits `--cfg has_syphon` when it finds vendor/Syphon.framework and compiles
//! native/syphon_bridge.m. Without it the sink still exists and every `create` fails.

use std::rc::Rc;

use syphoncast_engine::host::{PublishChannel, PublishSink};
use syphoncast_engine::CaptureError;

#[cfg(all(target_os = "macos", has_syphon))]
mod imp {
    use std::ffi::{c_void, CString};
    use std::rc::Rc;

    use syphoncast_engine::host::PublishChannel;
    use syphoncast_engine::{CaptureError, FrameBuffer};

    use crate::gl::UploadTexture;

    extern "C" {
        fn syphon_server_create(name_utf8: *const std::ffi::c_char) -> *mut c_void;
        fn syphon_server_publish_texture(
            server: *mut c_void,
            tex_id: u32,
            width: i32,
            height: i32,
            flipped: i32,
        ) -> i32;
        fn syphon_server_destroy(server: *mut c_void);
    }

    pub struct SyphonChannel {
        ptr: *mut c_void,
        tex: UploadTexture,
    }

    impl SyphonChannel {
        pub fn open(
            gl: Rc<glow::Context>,
            name: &str,
            width: u32,
            height: u32,
        ) -> Result<Self, CaptureError> {
            let c = CString::new(name)
                .map_err(|_| CaptureError::unavailable("server name contains a NUL byte"))?;
            let tex = UploadTexture::new(gl, width, height)
                .map_err(|e| CaptureError::unavailable(format!("texture upload target: {e}")))?;
            let ptr = unsafe { syphon_server_create(c.as_ptr()) };
            if ptr.is_null() {
                return Err(CaptureError::unavailable(format!(
                    "Syphon server '{name}' could not be created"
                )));
            }
            Ok(Self { ptr, tex })
        }
    }

    impl PublishChannel for SyphonChannel {
        fn frame_ready(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
            self.tex.upload(frame);
            let (w, h) = self.tex.size();
            // Row 0 of the upload is the top of the image.
            let ok = unsafe {
                syphon_server_publish_texture(self.ptr, self.tex.gl_name(), w as i32, h as i32, 1)
            };
            if ok == 1 {
                Ok(())
            } else {
                Err(CaptureError::unavailable("Syphon publish failed"))
            }
        }
    }

    impl Drop for SyphonChannel {
        fn drop(&mut self) {
            unsafe { syphon_server_destroy(self.ptr) };
        }
    }
}

pub struct SyphonSink {
    #[cfg_attr(not(all(target_os = "macos", has_syphon)), allow(dead_code))]
    gl: Rc<glow::Context>,
}

impl SyphonSink {
    pub fn new(gl: Rc<glow::Context>) -> Self {
        Self { gl }
    }
}

impl PublishSink for SyphonSink {
    #[cfg(all(target_os = "macos", has_syphon))]
    fn create(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PublishChannel>, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::unavailable("Syphon server needs a positive size"));
        }
        Ok(Box::new(imp::SyphonChannel::open(self.gl.clone(), name, width, height)?))
    }

    #[cfg(not(all(target_os = "macos", has_syphon)))]
    fn create(
        &mut self,
        _name: &str,
        _width: u32,
        _height: u32,
    ) -> Result<Box<dyn PublishChannel>, CaptureError> {
        let why = if cfg!(target_os = "macos") {
            "Syphon.framework is not vendored in this build"
        } else {
            "Syphon is macOS-only"
        };
        Err(CaptureError::unavailable(why))
    }
}
