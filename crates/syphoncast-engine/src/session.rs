//! Lifecycle controller.
//!
//! A `CaptureSession` owns at most one [`ActiveCapture`] (publish channel + destination buffer)
//! plus the camera hook registration, and binds them to the host's triggers:
//!
//! - `update` every tick: colour space once, then an idempotent setup attempt
//! - `reconfigure` / setters: synchronous teardown when the capture identity changes
//! - `disable`, `on_validate`, `Drop`: teardown
//! - `end_of_frame`: the per-frame capture, only while the frame loop runs
//!
//! Teardown order is fixed: channel, destination buffer, camera hook, frame loop.

use crate::config::{CameraId, CaptureConfig, CaptureMethod, TextureId};
use crate::driver::{capture_camera, capture_frame, ActiveCapture, FrameOutcome};
use crate::error::{CaptureError, SkipReason};
use crate::events::{EngineEvent, TeardownReason};
use crate::frame::FrameBuffer;
use crate::host::{CaptureHook, FrameHost, PublishSink};
use crate::selector::{select, CaptureState};
use crate::watermark::WatermarkConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// A capture already exists; nothing was done.
    AlreadyActive,
    Started(CaptureState),
    /// Config or resources not ready; retried on the next tick.
    Suppressed(CaptureError),
}

/// Result of applying a new config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconfigured {
    /// An active capture was torn down by this change.
    pub torn_down: bool,
}

#[derive(Debug, Default)]
struct FrameLoop {
    running: bool,
    starts: u64,
}

impl FrameLoop {
    fn start(&mut self) {
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

pub struct CaptureSession {
    sink: Box<dyn PublishSink>,
    config: CaptureConfig,
    watermark: WatermarkConfig,
    active: Option<ActiveCapture>,
    camera_hook: Option<Box<dyn CaptureHook>>,
    frame_loop: FrameLoop,
    color_space_applied: bool,
    last_suppressed: Option<CaptureError>,
    events: Vec<EngineEvent>,
}

impl CaptureSession {
    pub fn new(sink: Box<dyn PublishSink>) -> Self {
        Self::with_config(sink, CaptureConfig::default(), WatermarkConfig::default())
    }

    pub fn with_config(
        sink: Box<dyn PublishSink>,
        config: CaptureConfig,
        watermark: WatermarkConfig,
    ) -> Self {
        Self {
            sink,
            config,
            watermark,
            active: None,
            camera_hook: None,
            frame_loop: FrameLoop::default(),
            color_space_applied: false,
            last_suppressed: None,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn watermark(&self) -> &WatermarkConfig {
        &self.watermark
    }

    pub fn state(&self) -> CaptureState {
        self.active.as_ref().map(|a| a.state).unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn loop_running(&self) -> bool {
        self.frame_loop.running
    }

    /// How many times the frame loop has been (re)started.
    pub fn loop_starts(&self) -> u64 {
        self.frame_loop.starts
    }

    pub fn camera_hooked(&self) -> bool {
        self.camera_hook.is_some()
    }

    /// The destination buffer of the active capture.
    pub fn destination(&self) -> Option<&FrameBuffer> {
        self.active.as_ref().map(|a| &a.buffer)
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply a new capture config.
    ///
    /// A change to the server name, method or either source tears the active capture down
    /// before the new value is stored; the next `update` recreates it. `keep_alpha` changes
    /// apply in place. The config is stored even when it cannot activate, in which case the
    /// reason is returned.
    pub fn reconfigure(&mut self, config: CaptureConfig) -> Result<Reconfigured, CaptureError> {
        let changed = self.config.requires_teardown(&config);
        let torn_down = changed && self.teardown(TeardownReason::Reconfigured);
        if changed {
            self.last_suppressed = None;
        }

        let check = config.check();
        self.config = config;
        check?;
        Ok(Reconfigured { torn_down })
    }

    pub fn set_server_name(&mut self, name: impl Into<String>) -> Result<Reconfigured, CaptureError> {
        let mut next = self.config.clone();
        next.server_name = name.into();
        self.reconfigure(next)
    }

    pub fn set_capture_method(&mut self, method: CaptureMethod) -> Result<Reconfigured, CaptureError> {
        let mut next = self.config.clone();
        next.capture_method = method;
        self.reconfigure(next)
    }

    pub fn set_source_texture(&mut self, texture: Option<TextureId>) -> Result<Reconfigured, CaptureError> {
        let mut next = self.config.clone();
        next.source_texture = texture;
        self.reconfigure(next)
    }

    pub fn set_source_camera(&mut self, camera: Option<CameraId>) -> Result<Reconfigured, CaptureError> {
        let mut next = self.config.clone();
        next.source_camera = camera;
        self.reconfigure(next)
    }

    pub fn set_keep_alpha(&mut self, keep_alpha: bool) {
        self.config.keep_alpha = keep_alpha;
    }

    /// Watermark settings are read every frame and never tear the capture down.
    pub fn set_watermark(&mut self, watermark: WatermarkConfig) {
        self.watermark = watermark;
    }

    /// Per-tick entry point: colour space normalization on the first call, then `setup`.
    pub fn update(&mut self, host: &mut dyn FrameHost) -> SetupOutcome {
        if !self.color_space_applied {
            host.apply_color_space();
            self.color_space_applied = true;
            self.events.push(EngineEvent::ColorSpaceApplied);
        }
        self.setup(host)
    }

    /// Create the active capture if the config allows it. A no-op while one exists and its
    /// buffer still matches the source size; a resized source tears it down and recreates it.
    pub fn setup(&mut self, host: &mut dyn FrameHost) -> SetupOutcome {
        if let Some(active) = &self.active {
            let resized = select(&self.config, &*host)
                .is_ok_and(|plan| (plan.width, plan.height) != active.buffer.size());
            if !resized {
                return SetupOutcome::AlreadyActive;
            }
            self.teardown(TeardownReason::Reconfigured);
        }

        let plan = match select(&self.config, &*host) {
            Ok(plan) => plan,
            Err(e) => return self.suppress(e),
        };

        let channel = match self.sink.create(&self.config.server_name, plan.width, plan.height) {
            Ok(c) => c,
            Err(e) => return self.suppress(e),
        };

        if plan.state == CaptureState::Camera {
            self.attach_camera(host);
        }

        self.active = Some(ActiveCapture {
            channel,
            buffer: FrameBuffer::new(plan.width, plan.height),
            state: plan.state,
        });
        self.last_suppressed = None;
        self.frame_loop.start();

        self.events.push(EngineEvent::CaptureStarted {
            server_name: self.config.server_name.clone(),
            method: self.config.capture_method,
            width: plan.width,
            height: plan.height,
        });
        SetupOutcome::Started(plan.state)
    }

    fn attach_camera(&mut self, host: &mut dyn FrameHost) {
        let Some(camera) = self.config.source_camera.clone() else { return };
        self.camera_hook = host.camera_capture().and_then(|c| c.attach(&camera));
        if self.camera_hook.is_none() {
            self.events.push(EngineEvent::CameraHookUnavailable { camera });
        }
    }

    fn suppress(&mut self, error: CaptureError) -> SetupOutcome {
        if self.last_suppressed.as_ref() != Some(&error) {
            self.events.push(EngineEvent::SetupSuppressed { error: error.clone() });
            self.last_suppressed = Some(error.clone());
        }
        SetupOutcome::Suppressed(error)
    }

    /// End-of-frame tick. Copies, composites and publishes when a capture is active.
    pub fn end_of_frame(&mut self, host: &mut dyn FrameHost) -> FrameOutcome {
        if !self.frame_loop.running {
            return FrameOutcome::Idle;
        }
        let hooked = self.camera_hook.is_some();
        let Some(active) = self.active.as_mut() else {
            return FrameOutcome::Skipped(SkipReason::NoActiveCapture);
        };
        capture_frame(active, &self.config, &self.watermark, hooked, host)
    }

    /// Called by the host's per-camera hook right after `camera` rendered `source`.
    /// Returns `false` if no hook is registered for that camera.
    pub fn on_camera_rendered(&mut self, camera: &CameraId, source: &FrameBuffer) -> bool {
        let hooked = self.camera_hook.as_ref().is_some_and(|h| h.camera() == camera);
        if !hooked {
            return false;
        }
        let Some(active) = self.active.as_mut() else { return false };
        capture_camera(active, self.config.keep_alpha, source);
        true
    }

    /// Release the channel, the destination buffer and the camera hook, then stop the frame loop.
    /// Safe to call at any time. Returns whether anything was active.
    pub fn teardown(&mut self, reason: TeardownReason) -> bool {
        let was_active =
            self.active.is_some() || self.camera_hook.is_some() || self.frame_loop.running;

        if let Some(ActiveCapture { channel, buffer, .. }) = self.active.take() {
            drop(channel);
            drop(buffer);
        }
        self.camera_hook = None;
        self.frame_loop.stop();

        if was_active {
            self.events.push(EngineEvent::CaptureStopped { reason });
        }
        was_active
    }

    pub fn disable(&mut self) -> bool {
        self.teardown(TeardownReason::Disabled)
    }

    pub fn on_validate(&mut self) -> bool {
        self.teardown(TeardownReason::Validated)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown(TeardownReason::Dropped);
    }
}
