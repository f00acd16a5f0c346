//! Capture configuration: typed values used by the session plus the `server.json` file schema.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::assets::{read_to_string_result, AssetsRoot};
use crate::error::{EngineError, InvalidReason};
use crate::geometry::{PixelRect, Vec2};
use crate::watermark::{WatermarkAnchor, WatermarkConfig};

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

handle!(
    /// Host texture used by [`CaptureMethod::Texture`].
    TextureId
);
handle!(
    /// Host camera used by [`CaptureMethod::Camera`].
    CameraId
);
handle!(
    /// Host image used as the watermark.
    SpriteId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMethod {
    /// The final composited view (window back buffer).
    #[default]
    GameView,
    Camera,
    Texture,
}

pub const DEFAULT_SERVER_NAME: &str = "Syphon Server";

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub server_name: String,
    pub capture_method: CaptureMethod,
    /// Only consulted in [`CaptureMethod::Texture`].
    pub source_texture: Option<TextureId>,
    /// Only consulted in [`CaptureMethod::Camera`].
    pub source_camera: Option<CameraId>,
    pub keep_alpha: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            capture_method: CaptureMethod::GameView,
            source_texture: None,
            source_camera: None,
            keep_alpha: false,
        }
    }
}

impl CaptureConfig {
    /// Host-independent validity: a non-empty name and a source when the method needs one.
    pub fn check(&self) -> Result<(), InvalidReason> {
        if self.server_name.is_empty() {
            return Err(InvalidReason::EmptyServerName);
        }
        match self.capture_method {
            CaptureMethod::Texture if self.source_texture.is_none() => {
                Err(InvalidReason::MissingSourceTexture)
            }
            CaptureMethod::Camera if self.source_camera.is_none() => {
                Err(InvalidReason::MissingSourceCamera)
            }
            _ => Ok(()),
        }
    }

    /// Whether moving from `self` to `next` invalidates the active capture. Only the fields that
    /// decide the channel name and the destination size count; `keep_alpha` is applied live.
    pub fn requires_teardown(&self, next: &CaptureConfig) -> bool {
        self.server_name != next.server_name
            || self.capture_method != next.capture_method
            || self.source_texture != next.source_texture
            || self.source_camera != next.source_camera
    }
}

/// How strictly to interpret `server.json`.
///
/// - `Lenient` is forward-compatible: unknown fields are ignored and missing keys fall back to
///   defaults.
/// - `Strict` is fail-fast: unknown fields and unsupported versions become errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    Lenient,
    Strict,
}

/// Typed view of `assets/server.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerJson {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub capture: CaptureJson,
    #[serde(default)]
    pub watermark: WatermarkJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureJson {
    #[serde(default = "default_server_name")]
    pub server_name: String,
    #[serde(default)]
    pub capture_method: CaptureMethod,
    #[serde(default)]
    pub source_texture: Option<String>,
    #[serde(default)]
    pub source_camera: Option<String>,
    #[serde(default)]
    pub keep_alpha: bool,
}

impl Default for CaptureJson {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            capture_method: CaptureMethod::default(),
            source_texture: None,
            source_camera: None,
            keep_alpha: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkJson {
    #[serde(default)]
    pub enabled: bool,
    /// Image path, relative to `assets/` unless absolute.
    #[serde(default)]
    pub image: Option<String>,
    /// Crop rectangle inside the image; the whole image when omitted.
    #[serde(default)]
    pub region: Option<PixelRect>,
    #[serde(default)]
    pub anchor: WatermarkAnchor,
    #[serde(default = "default_offset")]
    pub offset: Vec2,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

impl Default for WatermarkJson {
    fn default() -> Self {
        Self {
            enabled: false,
            image: None,
            region: None,
            anchor: WatermarkAnchor::default(),
            offset: default_offset(),
            scale: default_scale(),
        }
    }
}

fn default_version() -> u32 {
    1
}
fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}
fn default_offset() -> Vec2 {
    Vec2::new(32.0, 32.0)
}
fn default_scale() -> f32 {
    1.0
}

/// Strict version of `ServerJson` that fails on unknown fields, nested objects included.
///
/// This is used when `ConfigMode::Strict` is requested.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerJsonStrict {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    capture: CaptureJsonStrict,
    #[serde(default)]
    watermark: WatermarkJsonStrict,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaptureJsonStrict {
    #[serde(default = "default_server_name")]
    server_name: String,
    #[serde(default)]
    capture_method: CaptureMethod,
    #[serde(default)]
    source_texture: Option<String>,
    #[serde(default)]
    source_camera: Option<String>,
    #[serde(default)]
    keep_alpha: bool,
}

impl Default for CaptureJsonStrict {
    fn default() -> Self {
        let c = CaptureJson::default();
        Self {
            server_name: c.server_name,
            capture_method: c.capture_method,
            source_texture: c.source_texture,
            source_camera: c.source_camera,
            keep_alpha: c.keep_alpha,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct WatermarkJsonStrict {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    region: Option<PixelRectStrict>,
    #[serde(default)]
    anchor: WatermarkAnchor,
    #[serde(default = "default_offset_strict")]
    offset: Vec2Strict,
    #[serde(default = "default_scale")]
    scale: f32,
}

impl Default for WatermarkJsonStrict {
    fn default() -> Self {
        Self {
            enabled: false,
            image: None,
            region: None,
            anchor: WatermarkAnchor::default(),
            offset: default_offset_strict(),
            scale: default_scale(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct Vec2Strict {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct PixelRectStrict {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

fn default_offset_strict() -> Vec2Strict {
    let v = default_offset();
    Vec2Strict { x: v.x, y: v.y }
}

impl From<ServerJsonStrict> for ServerJson {
    fn from(sj: ServerJsonStrict) -> Self {
        let (c, w) = (sj.capture, sj.watermark);
        Self {
            version: sj.version,
            capture: CaptureJson {
                server_name: c.server_name,
                capture_method: c.capture_method,
                source_texture: c.source_texture,
                source_camera: c.source_camera,
                keep_alpha: c.keep_alpha,
            },
            watermark: WatermarkJson {
                enabled: w.enabled,
                image: w.image,
                region: w.region.map(|r| PixelRect::new(r.x, r.y, r.width, r.height)),
                anchor: w.anchor,
                offset: Vec2::new(w.offset.x, w.offset.y),
                scale: w.scale,
            },
        }
    }
}

/// Resolved server config, ready for `CaptureSession::reconfigure` / `set_watermark`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// File this was loaded from (may not exist when defaults were used).
    pub path: PathBuf,
    pub capture: CaptureConfig,
    pub watermark: WatermarkConfig,
    /// Crop rectangle for the watermark image, if the file sets one.
    pub watermark_region: Option<PixelRect>,
}

impl ServerConfig {
    pub fn defaults(path: PathBuf) -> Self {
        Self {
            path,
            capture: CaptureConfig::default(),
            watermark: WatermarkConfig::default(),
            watermark_region: None,
        }
    }
}

/// Load `server(.<os>).json`. A missing file yields the defaults (game view, "Syphon Server").
pub fn load_server_config(assets: &AssetsRoot) -> Result<ServerConfig, EngineError> {
    load_server_config_with_mode(assets, ConfigMode::Lenient)
}

/// Strict version of `load_server_config`.
pub fn load_server_config_strict(assets: &AssetsRoot) -> Result<ServerConfig, EngineError> {
    load_server_config_with_mode(assets, ConfigMode::Strict)
}

fn load_server_config_with_mode(
    assets: &AssetsRoot,
    mode: ConfigMode,
) -> Result<ServerConfig, EngineError> {
    let path = assets.pick_platform_json("server");
    if !path.exists() {
        return Ok(ServerConfig::defaults(path));
    }
    let src = read_to_string_result(&path)?;
    parse_server_config(&path, &src, mode)
}

/// Parse `server.json` text. `path` is only used for error reporting.
pub fn parse_server_config(path: &Path, src: &str, mode: ConfigMode) -> Result<ServerConfig, EngineError> {
    let json_err = |e: serde_json::Error| EngineError::Json {
        path: path.to_path_buf(),
        source: e,
    };
    let value: Value = serde_json::from_str(src).map_err(json_err)?;

    if !value.is_object() {
        return Err(EngineError::InvalidConfig {
            path: path.to_path_buf(),
            msg: "server.json must be a JSON object".into(),
        });
    }

    let sj: ServerJson = match mode {
        ConfigMode::Lenient => serde_json::from_value(value).map_err(json_err)?,
        ConfigMode::Strict => serde_json::from_value::<ServerJsonStrict>(value)
            .map_err(json_err)?
            .into(),
    };

    if mode == ConfigMode::Strict && sj.version != 1 {
        return Err(EngineError::InvalidConfig {
            path: path.to_path_buf(),
            msg: format!("unsupported server.json version {} (expected 1)", sj.version),
        });
    }

    let capture = CaptureConfig {
        server_name: sj.capture.server_name,
        capture_method: sj.capture.capture_method,
        source_texture: non_empty(sj.capture.source_texture).map(TextureId::new),
        source_camera: non_empty(sj.capture.source_camera).map(CameraId::new),
        keep_alpha: sj.capture.keep_alpha,
    };

    let watermark = WatermarkConfig {
        enabled: sj.watermark.enabled,
        image: non_empty(sj.watermark.image).map(SpriteId::new),
        anchor: sj.watermark.anchor,
        offset: sj.watermark.offset,
        scale: sj.watermark.scale,
    };

    Ok(ServerConfig {
        path: path.to_path_buf(),
        capture,
        watermark,
        watermark_region: sj.watermark.region,
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str, mode: ConfigMode) -> Result<ServerConfig, EngineError> {
        parse_server_config(Path::new("server.json"), src, mode)
    }

    #[test]
    fn empty_object_uses_defaults() {
        let cfg = parse("{}", ConfigMode::Lenient).unwrap();
        assert_eq!(cfg.capture, CaptureConfig::default());
        assert_eq!(cfg.watermark, WatermarkConfig::default());
        assert_eq!(cfg.capture.server_name, "Syphon Server");
        assert_eq!(cfg.watermark.offset, Vec2::new(32.0, 32.0));
    }

    #[test]
    fn full_document_parses() {
        let src = r#"{
            "version": 1,
            "capture": {
                "server_name": "Stage",
                "capture_method": "texture",
                "source_texture": "textures/feed.png",
                "keep_alpha": true
            },
            "watermark": {
                "enabled": true,
                "image": "logo.png",
                "region": { "x": 0, "y": 0, "width": 64, "height": 32 },
                "anchor": "top_right",
                "offset": { "x": 8, "y": 4 },
                "scale": 0.5
            }
        }"#;
        let cfg = parse(src, ConfigMode::Strict).unwrap();
        assert_eq!(cfg.capture.capture_method, CaptureMethod::Texture);
        assert_eq!(cfg.capture.source_texture, Some(TextureId::new("textures/feed.png")));
        assert!(cfg.capture.keep_alpha);
        assert_eq!(cfg.watermark.anchor, WatermarkAnchor::TopRight);
        assert_eq!(cfg.watermark.image, Some(SpriteId::new("logo.png")));
        assert_eq!(cfg.watermark_region, Some(PixelRect::new(0, 0, 64, 32)));
        assert_eq!(cfg.watermark.scale, 0.5);
    }

    #[test]
    fn strict_mode_rejects_unknown_fields_and_versions() {
        assert!(parse(r#"{"capture": {"nmae": "x"}}"#, ConfigMode::Lenient).is_ok());
        assert!(matches!(
            parse(r#"{"capture": {"nmae": "x"}}"#, ConfigMode::Strict),
            Err(EngineError::Json { .. })
        ));
        assert!(matches!(
            parse(r#"{"version": 2}"#, ConfigMode::Strict),
            Err(EngineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn strict_mode_rejects_unknown_fields_in_nested_objects() {
        let offset = r#"{"watermark": {"offset": {"x": 1, "y": 2, "z": 9}}}"#;
        let region = r#"{"watermark": {"region": {"x": 0, "y": 0, "width": 4, "height": 4, "w": 3}}}"#;
        for src in [offset, region] {
            assert!(parse(src, ConfigMode::Lenient).is_ok(), "{src}");
            assert!(matches!(parse(src, ConfigMode::Strict), Err(EngineError::Json { .. })), "{src}");
        }

        let cfg = parse(
            r#"{"watermark": {"offset": {"x": 1, "y": 2}, "region": {"x": 1, "y": 2, "width": 3, "height": 4}}}"#,
            ConfigMode::Strict,
        )
        .unwrap();
        assert_eq!(cfg.watermark.offset, Vec2::new(1.0, 2.0));
        assert_eq!(cfg.watermark_region, Some(PixelRect::new(1, 2, 3, 4)));
    }

    #[test]
    fn blank_source_names_are_treated_as_missing() {
        let cfg = parse(
            r#"{"capture": {"capture_method": "camera", "source_camera": "  "}}"#,
            ConfigMode::Lenient,
        )
        .unwrap();
        assert_eq!(cfg.capture.source_camera, None);
        assert_eq!(cfg.capture.check(), Err(InvalidReason::MissingSourceCamera));
    }

    #[test]
    fn check_requires_name_and_source() {
        let mut cfg = CaptureConfig {
            capture_method: CaptureMethod::Texture,
            source_texture: Some(TextureId::new("t")),
            ..CaptureConfig::default()
        };
        assert_eq!(cfg.check(), Ok(()));
        cfg.server_name.clear();
        assert_eq!(cfg.check(), Err(InvalidReason::EmptyServerName));
        cfg.server_name = "x".into();
        cfg.source_texture = None;
        assert_eq!(cfg.check(), Err(InvalidReason::MissingSourceTexture));
        cfg.capture_method = CaptureMethod::GameView;
        assert_eq!(cfg.check(), Ok(()));
    }

    #[test]
    fn keep_alpha_alone_does_not_require_teardown() {
        let a = CaptureConfig::default();
        let mut b = a.clone();
        b.keep_alpha = true;
        assert!(!a.requires_teardown(&b));
        b.server_name = "other".into();
        assert!(a.requires_teardown(&b));
    }

    #[test]
    fn loads_from_assets_dir_or_falls_back() {
        let dir = std::env::temp_dir().join(format!("syphoncast-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let assets = AssetsRoot::at(&dir);

        let missing = load_server_config(&assets).unwrap();
        assert_eq!(missing.capture, CaptureConfig::default());

        std::fs::write(dir.join("server.json"), r#"{"capture": {"server_name": "Disk"}}"#).unwrap();
        let loaded = load_server_config(&assets).unwrap();
        assert_eq!(loaded.capture.server_name, "Disk");

        std::fs::write(dir.join("server.json"), "not json").unwrap();
        assert!(matches!(load_server_config(&assets), Err(EngineError::Json { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
