//! Capture source selection: which source feeds the destination buffer and how big it is.

use crate::config::{CaptureConfig, CaptureMethod};
use crate::error::{CaptureError, InvalidReason};
use crate::host::FrameHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Uninitialized,
    Texture,
    Camera,
    GameView,
}

impl From<CaptureMethod> for CaptureState {
    fn from(m: CaptureMethod) -> Self {
        match m {
            CaptureMethod::Texture => CaptureState::Texture,
            CaptureMethod::Camera => CaptureState::Camera,
            CaptureMethod::GameView => CaptureState::GameView,
        }
    }
}

/// Result of a successful selection: the state to enter and the destination buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePlan {
    pub state: CaptureState,
    pub width: u32,
    pub height: u32,
}

/// Decide the capture state for `config`. Never has side effects; hooking the camera is left to
/// the session once the publish channel exists.
pub fn select(config: &CaptureConfig, host: &dyn FrameHost) -> Result<SourcePlan, CaptureError> {
    config.check()?;

    let (w, h) = match config.capture_method {
        CaptureMethod::Texture => {
            let id = config
                .source_texture
                .as_ref()
                .ok_or(InvalidReason::MissingSourceTexture)?;
            host.texture(id)
                .map(|t| t.size())
                .ok_or_else(|| CaptureError::unavailable(format!("texture '{id}' is not loaded")))?
        }
        CaptureMethod::Camera => {
            let id = config
                .source_camera
                .as_ref()
                .ok_or(InvalidReason::MissingSourceCamera)?;
            host.camera_size(id)
                .ok_or_else(|| CaptureError::unavailable(format!("camera '{id}' does not exist")))?
        }
        CaptureMethod::GameView => host.display_size(),
    };

    if w == 0 || h == 0 {
        return Err(InvalidReason::ZeroSize.into());
    }

    Ok(SourcePlan {
        state: config.capture_method.into(),
        width: w,
        height: h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraId, SpriteId, TextureId};
    use crate::frame::FrameBuffer;
    use crate::watermark::Sprite;

    struct StubHost {
        display: (u32, u32),
        texture: Option<FrameBuffer>,
    }

    impl FrameHost for StubHost {
        fn display_size(&self) -> (u32, u32) {
            self.display
        }
        fn read_display(&mut self) -> Option<FrameBuffer> {
            None
        }
        fn texture(&self, _: &TextureId) -> Option<&FrameBuffer> {
            self.texture.as_ref()
        }
        fn camera_size(&self, id: &CameraId) -> Option<(u32, u32)> {
            (id.as_str() == "main").then_some((640, 360))
        }
        fn camera_output(&self, _: &CameraId) -> Option<&FrameBuffer> {
            None
        }
        fn sprite(&self, _: &SpriteId) -> Option<&Sprite> {
            None
        }
    }

    fn host() -> StubHost {
        StubHost { display: (1920, 1080), texture: Some(FrameBuffer::new(320, 240)) }
    }

    #[test]
    fn each_method_sizes_from_its_source() {
        let h = host();
        let mut cfg = CaptureConfig::default();
        assert_eq!(
            select(&cfg, &h),
            Ok(SourcePlan { state: CaptureState::GameView, width: 1920, height: 1080 })
        );

        cfg.capture_method = CaptureMethod::Texture;
        cfg.source_texture = Some(TextureId::new("feed"));
        assert_eq!(
            select(&cfg, &h),
            Ok(SourcePlan { state: CaptureState::Texture, width: 320, height: 240 })
        );

        cfg.capture_method = CaptureMethod::Camera;
        cfg.source_camera = Some(CameraId::new("main"));
        assert_eq!(
            select(&cfg, &h),
            Ok(SourcePlan { state: CaptureState::Camera, width: 640, height: 360 })
        );
    }

    #[test]
    fn invalid_configs_stay_uninitialized() {
        let h = host();
        let cfg = CaptureConfig { server_name: String::new(), ..CaptureConfig::default() };
        assert_eq!(select(&cfg, &h), Err(CaptureError::InvalidConfig(InvalidReason::EmptyServerName)));

        let cfg = CaptureConfig { capture_method: CaptureMethod::Camera, ..CaptureConfig::default() };
        assert_eq!(select(&cfg, &h), Err(CaptureError::InvalidConfig(InvalidReason::MissingSourceCamera)));

        let cfg = CaptureConfig {
            capture_method: CaptureMethod::Camera,
            source_camera: Some(CameraId::new("missing")),
            ..CaptureConfig::default()
        };
        assert!(matches!(select(&cfg, &h), Err(CaptureError::ResourceUnavailable { .. })));
    }

    #[test]
    fn zero_sized_display_is_rejected() {
        let h = StubHost { display: (0, 1080), texture: None };
        assert_eq!(
            select(&CaptureConfig::default(), &h),
            Err(CaptureError::InvalidConfig(InvalidReason::ZeroSize))
        );
    }
}
