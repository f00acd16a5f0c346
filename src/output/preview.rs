//! Preview-only backend: channels accept frames without sharing them.

use syphoncast_engine::host::{PublishChannel, PublishSink};
use syphoncast_engine::{CaptureError, FrameBuffer};

use crate::logi;

#[derive(Debug, Default)]
pub struct PreviewSink;

impl PublishSink for PreviewSink {
    fn create(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PublishChannel>, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::unavailable(format!(
                "preview channel '{name}' needs a positive size (got {width}x{height})"
            )));
        }
        logi!("OUTPUT", "preview channel '{name}' opened ({width}x{height}); frames are not shared");
        Ok(Box::new(PreviewChannel {
            name: name.to_string(),
            frames: 0,
        }))
    }
}

pub struct PreviewChannel {
    name: String,
    frames: u64,
}

impl PublishChannel for PreviewChannel {
    fn frame_ready(&mut self, _frame: &FrameBuffer) -> Result<(), CaptureError> {
        self.frames += 1;
        Ok(())
    }
}

impl Drop for PreviewChannel {
    fn drop(&mut self) {
        logi!("OUTPUT", "preview channel '{}' closed after {} frame(s)", self.name, self.frames);
    }
}
