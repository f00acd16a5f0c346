//! NDI publish backend (optional, feature-gated).
//!
//! Build with: `cargo run --features ndi`
//!
//! Each channel owns a worker thread that holds the NDI sender. Frames are already on the CPU
//! (top-down RGBA); they are swizzled to BGRA and handed over a bounded channel, so a slow
//! receiver drops frames instead of stalling the render thread.

use syphoncast_engine::host::{PublishChannel, PublishSink};
use syphoncast_engine::CaptureError;

use super::NdiCfg;

/// RGBA → BGRA into `dst` (resized to fit).
#[cfg_attr(not(feature = "ndi"), allow(dead_code))]
fn rgba_to_bgra(src: &[u8], dst: &mut Vec<u8>) {
    dst.resize(src.len(), 0);
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
        d[3] = s[3];
    }
}

#[cfg(feature = "ndi")]
mod imp {
    use std::thread;
    use std::time::{Duration, Instant};

    use crossbeam_channel::{bounded, Sender as ChanSender, TrySendError};
    use grafton_ndi::{
        LineStrideOrSize, PixelFormat, ScanType, Sender, SenderOptions, VideoFrame, NDI,
    };
    use syphoncast_engine::host::PublishChannel;
    use syphoncast_engine::{CaptureError, FrameBuffer};

    use super::{rgba_to_bgra, NdiCfg};
    use crate::{logi, logw};

    enum NdiMsg {
        Frame { bgra: Vec<u8>, w: i32, h: i32 },
        Stop,
    }

    pub struct NdiChannel {
        tx: Option<ChanSender<NdiMsg>>,
        worker: Option<thread::JoinHandle<()>>,
        min_interval: Duration,
        last_send: Option<Instant>,
        buf_bgra: Vec<u8>,
        warned_busy: bool,
    }

    fn build_frame(w: i32, h: i32, cfg: &NdiCfg) -> Result<VideoFrame, String> {
        VideoFrame::builder()
            .resolution(w, h)
            .pixel_format(PixelFormat::BGRA)
            .frame_rate(cfg.fps_n.max(1), cfg.fps_d.max(1))
            .aspect_ratio(w as f32 / h.max(1) as f32)
            .scan_type(ScanType::Progressive)
            .build()
            .map_err(|e| format!("{e:?}"))
    }

    impl NdiChannel {
        pub fn open(cfg: NdiCfg, name: &str, width: u32, height: u32) -> Result<Self, CaptureError> {
            let (tx, rx) = bounded::<NdiMsg>(2);
            let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
            let name = name.to_string();
            let fps = cfg.fps_n.max(1) as f64 / cfg.fps_d.max(1) as f64;
            let w0 = width as i32;
            let h0 = height as i32;

            let worker = thread::Builder::new()
                .name("ndi".to_string())
                .spawn(move || {
                    let ndi = match NDI::new() {
                        Ok(v) => v,
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!("failed to init NDI: {e:?}")));
                            return;
                        }
                    };

                    let mut builder = SenderOptions::builder(&name);
                    if let Some(g) = cfg.groups.as_deref() {
                        builder = builder.groups(g);
                    }
                    let opts = builder.clock_video(cfg.clock_video).build();

                    let sender = match Sender::new(&ndi, &opts) {
                        Ok(s) => s,
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!("failed to create sender: {e:?}")));
                            return;
                        }
                    };

                    let mut frame_shell = match build_frame(w0, h0, &cfg) {
                        Ok(f) => f,
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!("failed to build video frame: {e}")));
                            return;
                        }
                    };

                    let _ = ready_tx.send(Ok(()));
                    logi!("OUTPUT", "NDI source '{name}' started ({w0}x{h0})");

                    while let Ok(NdiMsg::Frame { bgra, w, h }) = rx.recv() {
                        if w != frame_shell.width || h != frame_shell.height {
                            match build_frame(w, h, &cfg) {
                                Ok(f) => frame_shell = f,
                                Err(e) => {
                                    logw!("OUTPUT", "NDI frame rebuild failed: {e}");
                                    continue;
                                }
                            }
                        }
                        frame_shell.data = bgra;
                        frame_shell.line_stride_or_size =
                            LineStrideOrSize::LineStrideBytes(w.saturating_mul(4));
                        sender.send_video(&frame_shell);
                    }

                    logi!("OUTPUT", "NDI source '{name}' stopped");
                })
                .map_err(|e| CaptureError::unavailable(format!("spawn ndi thread: {e}")))?;

            match ready_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let _ = worker.join();
                    return Err(CaptureError::unavailable(e));
                }
                Err(_) => {
                    let _ = worker.join();
                    return Err(CaptureError::unavailable("ndi thread exited during startup"));
                }
            }

            Ok(Self {
                tx: Some(tx),
                worker: Some(worker),
                min_interval: Duration::from_secs_f64(1.0 / fps),
                last_send: None,
                buf_bgra: Vec::new(),
                warned_busy: false,
            })
        }
    }

    impl PublishChannel for NdiChannel {
        fn frame_ready(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
            let Some(tx) = self.tx.as_ref() else {
                return Err(CaptureError::unavailable("NDI sender stopped"));
            };

            if self.last_send.is_some_and(|t| t.elapsed() < self.min_interval) {
                return Ok(());
            }
            self.last_send = Some(Instant::now());

            rgba_to_bgra(frame.pixels(), &mut self.buf_bgra);
            let msg = NdiMsg::Frame {
                bgra: self.buf_bgra.clone(),
                w: frame.width() as i32,
                h: frame.height() as i32,
            };
            match tx.try_send(msg) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    if !self.warned_busy {
                        self.warned_busy = true;
                        logw!("OUTPUT", "NDI sender busy; dropping frames");
                    }
                    Ok(())
                }
                Err(TrySendError::Disconnected(_)) => {
                    Err(CaptureError::unavailable("NDI sender thread exited"))
                }
            }
        }
    }

    impl Drop for NdiChannel {
        fn drop(&mut self) {
            if let Some(tx) = self.tx.take() {
                let _ = tx.send(NdiMsg::Stop);
            }
            if let Some(h) = self.worker.take() {
                let _ = h.join();
            }
        }
    }
}

pub struct NdiSink {
    #[cfg_attr(not(feature = "ndi"), allow(dead_code))]
    cfg: NdiCfg,
}

impl NdiSink {
    pub fn new(cfg: NdiCfg) -> Self {
        Self { cfg }
    }
}

impl PublishSink for NdiSink {
    #[cfg(feature = "ndi")]
    fn create(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PublishChannel>, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::unavailable("NDI source needs a positive size"));
        }
        Ok(Box::new(imp::NdiChannel::open(self.cfg.clone(), name, width, height)?))
    }

    #[cfg(not(feature = "ndi"))]
    fn create(
        &mut self,
        _name: &str,
        _width: u32,
        _height: u32,
    ) -> Result<Box<dyn PublishChannel>, CaptureError> {
        Err(CaptureError::unavailable("built without the `ndi` feature"))
    }
}
