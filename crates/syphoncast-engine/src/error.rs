use std::{fmt, path::PathBuf};

/// Failures while locating or parsing configuration on disk.
#[derive(Debug)]
pub enum EngineError {
    /// The `assets/` folder could not be found.
    AssetsNotFound { start_dir: PathBuf },
    /// I/O error reading a file.
    Io { path: PathBuf, source: std::io::Error },
    /// JSON parse error for a file.
    Json { path: PathBuf, source: serde_json::Error },
    /// Config is syntactically valid but semantically invalid.
    InvalidConfig { path: PathBuf, msg: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::AssetsNotFound { start_dir } => {
                write!(f, "Could not locate assets/ starting from {}", start_dir.display())
            }
            EngineError::Io { path, source } => {
                write!(f, "I/O error for {}: {}", path.display(), source)
            }
            EngineError::Json { path, source } => {
                write!(f, "JSON parse error for {}: {}", path.display(), source)
            }
            EngineError::InvalidConfig { path, msg } => {
                write!(f, "Invalid config {}: {}", path.display(), msg)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io { source, .. } => Some(source),
            EngineError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Why a capture config cannot be activated right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    EmptyServerName,
    MissingSourceTexture,
    MissingSourceCamera,
    /// The selected source exists but reports a zero width or height.
    ZeroSize,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvalidReason::EmptyServerName => "server name is empty",
            InvalidReason::MissingSourceTexture => "texture capture without a source texture",
            InvalidReason::MissingSourceCamera => "camera capture without a source camera",
            InvalidReason::ZeroSize => "capture source has a zero-sized frame",
        };
        f.write_str(s)
    }
}

/// Capture-time failures. None of these stop the per-frame loop: setup is retried on the next
/// tick and a failed frame is simply skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The config cannot activate a capture (suppressed, retried every tick).
    InvalidConfig(InvalidReason),
    /// The publish channel (or a source it depends on) could not be created or used.
    ResourceUnavailable { reason: String },
}

impl CaptureError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        CaptureError::ResourceUnavailable { reason: reason.into() }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::InvalidConfig(r) => write!(f, "invalid capture config: {r}"),
            CaptureError::ResourceUnavailable { reason } => {
                write!(f, "publish resource unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<InvalidReason> for CaptureError {
    fn from(r: InvalidReason) -> Self {
        CaptureError::InvalidConfig(r)
    }
}

/// Why a single frame tick did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The loop is running but there is no active capture.
    NoActiveCapture,
    /// The configured source did not produce pixels this frame.
    SourceUnavailable,
    /// The publish channel rejected the frame.
    PublishFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoActiveCapture => f.write_str("no active capture"),
            SkipReason::SourceUnavailable => f.write_str("source unavailable"),
            SkipReason::PublishFailed(e) => write!(f, "publish failed: {e}"),
        }
    }
}
