//! Per-frame capture: copy the source, overlay the watermark, publish.

use crate::blit::blit;
use crate::config::CaptureConfig;
use crate::error::SkipReason;
use crate::frame::FrameBuffer;
use crate::host::{FrameHost, PublishChannel};
use crate::selector::CaptureState;
use crate::watermark::{apply_watermark, WatermarkConfig};

/// The publish channel and the destination buffer it publishes, sized to the active source.
pub struct ActiveCapture {
    pub(crate) channel: Box<dyn PublishChannel>,
    pub(crate) buffer: FrameBuffer,
    pub(crate) state: CaptureState,
}

impl ActiveCapture {
    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }
}

/// What one end-of-frame tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The loop is stopped.
    Idle,
    Skipped(SkipReason),
    Published,
}

/// End-of-frame body. `camera_hooked` means camera frames arrive through
/// [`capture_camera`] and the generic copy is bypassed.
pub fn capture_frame(
    active: &mut ActiveCapture,
    config: &CaptureConfig,
    watermark: &WatermarkConfig,
    camera_hooked: bool,
    host: &mut dyn FrameHost,
) -> FrameOutcome {
    let keep_alpha = config.keep_alpha;

    match active.state {
        CaptureState::Texture => {
            let src = config.source_texture.as_ref().and_then(|id| host.texture(id));
            let Some(src) = src else {
                return FrameOutcome::Skipped(SkipReason::SourceUnavailable);
            };
            blit(src, &mut active.buffer, keep_alpha, false);
        }
        CaptureState::GameView => {
            // Temporary readback, dropped at the end of this arm.
            let Some(screen) = host.read_display() else {
                return FrameOutcome::Skipped(SkipReason::SourceUnavailable);
            };
            blit(&screen, &mut active.buffer, keep_alpha, true);
        }
        CaptureState::Camera if !camera_hooked => {
            let src = config.source_camera.as_ref().and_then(|id| host.camera_output(id));
            let Some(src) = src else {
                return FrameOutcome::Skipped(SkipReason::SourceUnavailable);
            };
            blit(src, &mut active.buffer, keep_alpha, false);
        }
        CaptureState::Camera => {}
        CaptureState::Uninitialized => {
            return FrameOutcome::Skipped(SkipReason::NoActiveCapture);
        }
    }

    let sprite = watermark.image.as_ref().and_then(|id| host.sprite(id));
    apply_watermark(&mut active.buffer, watermark, sprite, keep_alpha);

    match active.channel.frame_ready(&active.buffer) {
        Ok(()) => FrameOutcome::Published,
        Err(e) => FrameOutcome::Skipped(SkipReason::PublishFailed(e.to_string())),
    }
}

/// Per-camera hook body: runs right after the camera renders.
pub fn capture_camera(active: &mut ActiveCapture, keep_alpha: bool, source: &FrameBuffer) {
    blit(source, &mut active.buffer, keep_alpha, false);
}
