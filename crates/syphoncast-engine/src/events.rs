use crate::config::{CameraId, CaptureMethod};
use crate::error::CaptureError;

/// Why an active capture was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// Server name, capture method or source changed, or the source changed size.
    Reconfigured,
    /// The host disabled the session.
    Disabled,
    /// The host re-validated its settings.
    Validated,
    /// The session was dropped.
    Dropped,
}

/// Lifecycle notifications for host UIs and logging. Queued by the session and drained with
/// `CaptureSession::drain_events`. Nothing here is emitted per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    CaptureStarted {
        server_name: String,
        method: CaptureMethod,
        width: u32,
        height: u32,
    },

    CaptureStopped { reason: TeardownReason },

    /// Setup was attempted and suppressed. Only emitted when the reason changes, so the retry on
    /// every tick stays quiet.
    SetupSuppressed { error: CaptureError },

    /// Camera capture is running without a per-camera hook and relies on the end-of-frame copy.
    CameraHookUnavailable { camera: CameraId },

    ColorSpaceApplied,
}
