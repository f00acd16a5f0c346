//! Publish backends
//!
//! Each backend implements the engine's `PublishSink`: it opens one named channel sized to the
//! active capture and hands finished frames to the native sharing API.
//! - **Syphon**: macOS texture sharing (needs a vendored Syphon.framework)
//! - **Spout**: Windows texture sharing
//! - **NDI**: network output (build with `--features ndi`)
//! - **Preview**: no external sharing; frames are counted and dropped
//!
//! Backends are thin shims. A backend that is unavailable in this build still constructs and
//! fails `create`, so the session keeps suppressing activation instead of aborting.

use std::rc::Rc;

use serde::Deserialize;
use syphoncast_engine::assets::{load_json_result, AssetsRoot};
use syphoncast_engine::host::PublishSink;
use syphoncast_engine::EngineError;

pub mod ndi;
pub mod preview;
pub mod spout;
pub mod syphon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputBackend {
    Syphon,
    Spout,
    Ndi,
    Preview,
}

impl OutputBackend {
    /// Syphon on macOS builds with the framework, Spout on Windows, preview elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(all(target_os = "macos", has_syphon)) {
            OutputBackend::Syphon
        } else if cfg!(target_os = "windows") {
            OutputBackend::Spout
        } else {
            OutputBackend::Preview
        }
    }
}

/// `assets/output.json`: where published frames go, plus window preferences.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputBackend::platform_default")]
    pub backend: OutputBackend,

    #[serde(default)]
    pub spout: SpoutCfg,

    #[serde(default)]
    pub ndi: NdiCfg,

    #[serde(default)]
    pub window: WindowCfg,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::platform_default(),
            spout: SpoutCfg::default(),
            ndi: NdiCfg::default(),
            window: WindowCfg::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpoutCfg {
    /// Flip on send. Published frames are already top-down, so this is normally off.
    #[serde(default)]
    pub invert: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NdiCfg {
    /// Optional comma-separated NDI groups.
    #[serde(default)]
    pub groups: Option<String>,

    #[serde(default = "default_true")]
    pub clock_video: bool,

    #[serde(default = "default_ndi_fps_n")]
    pub fps_n: i32,

    #[serde(default = "default_ndi_fps_d")]
    pub fps_d: i32,
}

impl Default for NdiCfg {
    fn default() -> Self {
        Self {
            groups: None,
            clock_video: true,
            fps_n: default_ndi_fps_n(),
            fps_d: default_ndi_fps_d(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowCfg {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,

    /// Hide the preview window; rendering and publishing continue offscreen.
    #[serde(default)]
    pub headless: bool,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
            headless: false,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_ndi_fps_n() -> i32 {
    60
}
fn default_ndi_fps_d() -> i32 {
    1
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}

/// Load `output(.<os>).json`. A missing file yields the defaults.
pub fn load_output_config(assets: &AssetsRoot) -> Result<OutputConfig, EngineError> {
    let path = assets.pick_platform_json("output");
    if !path.exists() {
        return Ok(OutputConfig::default());
    }
    load_json_result(&path)
}

/// Build the publish sink for `cfg.backend`.
pub fn create_sink(cfg: &OutputConfig, gl: &Rc<glow::Context>) -> Box<dyn PublishSink> {
    match cfg.backend {
        OutputBackend::Syphon => Box::new(syphon::SyphonSink::new(gl.clone())),
        OutputBackend::Spout => Box::new(spout::SpoutSink::new(gl.clone(), cfg.spout.invert)),
        OutputBackend::Ndi => Box::new(ndi::NdiSink::new(cfg.ndi.clone())),
        OutputBackend::Preview => Box::new(preview::PreviewSink::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_json_defaults() {
        let cfg: OutputConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.backend, OutputBackend::platform_default());
        assert_eq!((cfg.window.width, cfg.window.height), (1280, 720));
        assert!(!cfg.window.headless);
        assert!(!cfg.spout.invert);
        assert_eq!((cfg.ndi.fps_n, cfg.ndi.fps_d), (60, 1));
    }

    #[test]
    fn output_json_backend_names() {
        let cfg: OutputConfig =
            serde_json::from_str(r#"{ "backend": "ndi", "ndi": { "groups": "studio" } }"#).unwrap();
        assert_eq!(cfg.backend, OutputBackend::Ndi);
        assert_eq!(cfg.ndi.groups.as_deref(), Some("studio"));

        assert!(serde_json::from_str::<OutputConfig>(r#"{ "backend": "rtmp" }"#).is_err());
    }

    #[test]
    fn missing_output_json_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("syphoncast-output-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cfg = load_output_config(&AssetsRoot::at(&dir)).unwrap();
        assert_eq!(cfg.backend, OutputBackend::platform_default());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
