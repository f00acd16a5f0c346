//! Config validation (friendly errors)
//!
//! Purpose:
//! - Catch common misconfigurations early
//! - Explain *what* is wrong, *where* it lives, and *what to do*
//! - Never block startup: the session already suppresses captures that cannot activate

use std::path::Path;

use syphoncast_engine::config::ServerConfig;
use syphoncast_engine::{CaptureMethod, InvalidReason};

use crate::output::{OutputBackend, OutputConfig};
use crate::{loge, logi, logw};

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub level: IssueLevel,
    pub path: String,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    Warn,
    Error,
}

impl ValidationIssue {
    pub fn warn(path: impl Into<String>, message: impl Into<String>, hint: Option<String>) -> Self {
        Self { level: IssueLevel::Warn, path: path.into(), message: message.into(), hint }
    }
    pub fn error(path: impl Into<String>, message: impl Into<String>, hint: Option<String>) -> Self {
        Self { level: IssueLevel::Error, path: path.into(), message: message.into(), hint }
    }
}

pub fn emit_issues(tag: &str, issues: &[ValidationIssue]) {
    for it in issues {
        let hint = it.hint.as_deref().map(|h| format!(" (hint: {h})")).unwrap_or_default();
        match it.level {
            IssueLevel::Warn => logw!(tag, "{}: {}{}", it.path, it.message, hint),
            IssueLevel::Error => loge!(tag, "{}: {}{}", it.path, it.message, hint),
        }
    }
}

/// One summary line per validation run, even when there are zero issues.
pub fn emit_summary(tag: &str, label: &str, issues: &[ValidationIssue]) {
    let warns = issues.iter().filter(|i| i.level == IssueLevel::Warn).count();
    let errs = issues.iter().filter(|i| i.level == IssueLevel::Error).count();
    if errs == 0 && warns == 0 {
        logi!(tag, "validation: {label} OK (0 issues)");
    } else {
        logw!(tag, "validation: {label} issues found (errors={errs} warnings={warns})");
    }
}

/// What the host can resolve, so references in `server.json` can be checked up front.
pub struct HostCaps<'a> {
    pub assets_dir: &'a Path,
    pub cameras: &'a [&'a str],
    /// Whether the host offers per-camera capture hooks.
    pub camera_hooks: bool,
}

/// Validate a loaded `server.json` against what the host can provide.
pub fn validate_server_config(cfg: &ServerConfig, caps: &HostCaps<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let file = cfg
        .path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("server.json")
        .to_string();
    let capture = &cfg.capture;
    let wm = &cfg.watermark;

    if capture.check() == Err(InvalidReason::EmptyServerName) {
        issues.push(ValidationIssue::error(
            format!("{file}:/capture/server_name"),
            "server name is empty; nothing will be published",
            Some("set a name receivers will see, e.g. \"Syphon Server\"".into()),
        ));
    }

    match capture.capture_method {
        CaptureMethod::Texture => match &capture.source_texture {
            None => issues.push(ValidationIssue::error(
                format!("{file}:/capture/source_texture"),
                "capture_method is \"texture\" but no source_texture is set",
                Some("point it at an image under assets/, e.g. \"images/test_card.png\"".into()),
            )),
            Some(t) => {
                let p = caps.assets_dir.join(t.as_str());
                if !p.is_file() {
                    issues.push(ValidationIssue::error(
                        format!("{file}:/capture/source_texture"),
                        format!("texture '{t}' not found at {}", p.display()),
                        None,
                    ));
                }
            }
        },
        CaptureMethod::Camera => match &capture.source_camera {
            None => issues.push(ValidationIssue::error(
                format!("{file}:/capture/source_camera"),
                "capture_method is \"camera\" but no source_camera is set",
                Some(format!("available cameras: {}", caps.cameras.join(", "))),
            )),
            Some(c) => {
                if !caps.cameras.contains(&c.as_str()) {
                    issues.push(ValidationIssue::error(
                        format!("{file}:/capture/source_camera"),
                        format!("camera '{c}' does not exist"),
                        Some(format!("available cameras: {}", caps.cameras.join(", "))),
                    ));
                }
                if !caps.camera_hooks {
                    issues.push(ValidationIssue::warn(
                        format!("{file}:/capture/capture_method"),
                        "this host has no per-camera capture hooks",
                        Some("camera frames are copied at end of frame instead".into()),
                    ));
                }
            }
        },
        CaptureMethod::GameView => {
            if capture.source_texture.is_some() || capture.source_camera.is_some() {
                issues.push(ValidationIssue::warn(
                    format!("{file}:/capture"),
                    "source_texture/source_camera are ignored for capture_method \"gameview\"",
                    None,
                ));
            }
        }
    }

    if wm.enabled {
        match &wm.image {
            None => issues.push(ValidationIssue::warn(
                format!("{file}:/watermark/image"),
                "watermark is enabled but has no image",
                Some("set \"image\" or disable the watermark".into()),
            )),
            Some(img) => {
                let p = caps.assets_dir.join(img.as_str());
                if !p.is_file() {
                    issues.push(ValidationIssue::warn(
                        format!("{file}:/watermark/image"),
                        format!("watermark image '{img}' not found at {}", p.display()),
                        None,
                    ));
                }
            }
        }
        if !(wm.scale > 0.0) {
            issues.push(ValidationIssue::warn(
                format!("{file}:/watermark/scale"),
                format!("scale {} is not positive; the watermark will not be drawn", wm.scale),
                None,
            ));
        }
        if wm.offset.x < 0.0 || wm.offset.y < 0.0 {
            issues.push(ValidationIssue::warn(
                format!("{file}:/watermark/offset"),
                "negative offsets are clamped to the frame edge",
                None,
            ));
        }
    }

    if let Some(r) = cfg.watermark_region {
        if r.is_empty() {
            issues.push(ValidationIssue::warn(
                format!("{file}:/watermark/region"),
                "region has zero width or height; the watermark will not be drawn",
                Some("omit \"region\" to use the whole image".into()),
            ));
        }
    }

    issues
}

/// Validate `output.json` against what this build supports.
pub fn validate_output_config(cfg: &OutputConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let unsupported = match cfg.backend {
        OutputBackend::Syphon if !cfg!(all(target_os = "macos", has_syphon)) => {
            Some("Syphon needs macOS and a vendored Syphon.framework")
        }
        OutputBackend::Spout if !cfg!(target_os = "windows") => Some("Spout is Windows-only"),
        OutputBackend::Ndi if !cfg!(feature = "ndi") => Some("this build has no NDI support"),
        _ => None,
    };
    if let Some(why) = unsupported {
        issues.push(ValidationIssue::warn(
            "output.json:/backend",
            format!("backend {:?} unavailable: {why}", cfg.backend),
            Some("captures stay suppressed; pick \"preview\" to run without publishing".into()),
        ));
    }

    if cfg.window.width == 0 || cfg.window.height == 0 {
        issues.push(ValidationIssue::error(
            "output.json:/window",
            "window size must be positive",
            None,
        ));
    }

    if cfg.ndi.fps_n <= 0 || cfg.ndi.fps_d <= 0 {
        issues.push(ValidationIssue::warn(
            "output.json:/ndi",
            "fps_n and fps_d must be positive; clamped to 1",
            None,
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use syphoncast_engine::config::{parse_server_config, ConfigMode};

    fn parse(src: &str) -> ServerConfig {
        parse_server_config(&PathBuf::from("server.json"), src, ConfigMode::Lenient).unwrap()
    }

    fn caps(hooks: bool) -> HostCaps<'static> {
        HostCaps {
            assets_dir: Path::new("/nonexistent-assets"),
            cameras: &["main"],
            camera_hooks: hooks,
        }
    }

    #[test]
    fn defaults_are_clean() {
        let cfg = parse("{}");
        assert!(validate_server_config(&cfg, &caps(true)).is_empty());
    }

    #[test]
    fn empty_name_is_an_error() {
        let cfg = parse(r#"{ "capture": { "server_name": "" } }"#);
        let issues = validate_server_config(&cfg, &caps(true));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, IssueLevel::Error);
        assert_eq!(issues[0].path, "server.json:/capture/server_name");
    }

    #[test]
    fn name_check_matches_the_session() {
        let cfg = parse(r#"{ "capture": { "server_name": "  " } }"#);
        assert_eq!(cfg.capture.check(), Ok(()));
        assert!(validate_server_config(&cfg, &caps(true)).is_empty());
    }

    #[test]
    fn camera_without_hooks_warns() {
        let cfg = parse(r#"{ "capture": { "capture_method": "camera", "source_camera": "main" } }"#);
        assert!(validate_server_config(&cfg, &caps(true)).is_empty());

        let issues = validate_server_config(&cfg, &caps(false));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, IssueLevel::Warn);
    }

    #[test]
    fn unknown_camera_and_missing_texture_are_errors() {
        let cfg = parse(r#"{ "capture": { "capture_method": "camera", "source_camera": "side" } }"#);
        let issues = validate_server_config(&cfg, &caps(true));
        assert!(issues[0].message.contains("'side'"));

        let cfg = parse(r#"{ "capture": { "capture_method": "texture" } }"#);
        let issues = validate_server_config(&cfg, &caps(true));
        assert_eq!(issues[0].path, "server.json:/capture/source_texture");
    }

    #[test]
    fn enabled_watermark_without_image_warns() {
        let cfg = parse(r#"{ "watermark": { "enabled": true, "scale": 0 } }"#);
        let issues = validate_server_config(&cfg, &caps(true));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.level == IssueLevel::Warn));
    }
}
