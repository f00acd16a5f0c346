//! Seams to the host engine and the native publish channel.

use crate::config::{CameraId, SpriteId, TextureId};
use crate::error::CaptureError;
use crate::frame::FrameBuffer;
use crate::watermark::Sprite;

/// Pixel sources owned by the host. All calls happen on the host's update thread.
pub trait FrameHost {
    /// Current display (window back buffer) resolution.
    fn display_size(&self) -> (u32, u32);

    /// Read back the final composited view. Rows are bottom-up, as framebuffer readback
    /// delivers them; the driver flips during the blit.
    fn read_display(&mut self) -> Option<FrameBuffer>;

    fn texture(&self, id: &TextureId) -> Option<&FrameBuffer>;

    /// Pixel size of a camera's render target.
    fn camera_size(&self, id: &CameraId) -> Option<(u32, u32)>;

    /// Last rendered output of a camera, top-left origin.
    fn camera_output(&self, id: &CameraId) -> Option<&FrameBuffer>;

    fn sprite(&self, id: &SpriteId) -> Option<&Sprite>;

    /// Per-camera render hooks, when the rendering pipeline offers them.
    fn camera_capture(&mut self) -> Option<&mut dyn CameraCapture> {
        None
    }

    /// Make the sharing output match the host's working colour space. Called once, before the
    /// first capture starts.
    fn apply_color_space(&mut self) {}
}

/// Optional capability: run capture right after a camera renders instead of at end of frame.
pub trait CameraCapture {
    /// Register interest in `camera`. `None` means the camera cannot be hooked; capture then
    /// falls back to the generic end-of-frame copy.
    fn attach(&mut self, camera: &CameraId) -> Option<Box<dyn CaptureHook>>;
}

/// Registration guard returned by [`CameraCapture::attach`]. Dropping it deregisters the hook.
pub trait CaptureHook {
    fn camera(&self) -> &CameraId;
}

/// Factory for native publish channels (Syphon server, Spout sender, NDI source, ...).
pub trait PublishSink {
    /// Create a channel named `name` that publishes `width x height` frames. Fails when the name
    /// is unavailable or the dimensions are not positive.
    fn create(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PublishChannel>, CaptureError>;
}

/// One open publish channel. Disposal is `Drop`.
pub trait PublishChannel {
    /// The destination buffer holds a finished frame; hand it to receivers.
    fn frame_ready(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError>;
}
