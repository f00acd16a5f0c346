//! # syphoncast engine
//!
//! Host-independent core of the frame publisher: capture source selection, the per-frame
//! capture driver, the blit engine, the watermark compositor and the lifecycle rules around the
//! destination buffer and the publish channel.
//!
//! The engine never talks to a GPU or a native sharing API directly. Hosts plug in through the
//! traits in [`host`]:
//! - [`host::FrameHost`] provides pixels (display readback, textures, camera output, sprites)
//! - [`host::PublishSink`] creates publish channels (Syphon / Spout / NDI / preview)
//!
//! Everything runs on the host's update thread. A [`session::CaptureSession`] is driven by two
//! calls per frame: [`session::CaptureSession::update`] early in the frame and
//! [`session::CaptureSession::end_of_frame`] once rendering is complete.

pub mod assets;
pub mod blit;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod frame;
pub mod geometry;
pub mod host;
pub mod selector;
pub mod session;
pub mod watermark;

pub use config::{CameraId, CaptureConfig, CaptureMethod, SpriteId, TextureId};
pub use error::{CaptureError, EngineError, InvalidReason, SkipReason};
pub use frame::FrameBuffer;
pub use session::CaptureSession;
pub use watermark::{Sprite, WatermarkAnchor, WatermarkConfig};
