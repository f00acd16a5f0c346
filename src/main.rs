//! syphoncast — publish a rendered view (or a texture, or a camera) as a named shared frame
//! stream, with an optional watermark.
//!
//! Configuration lives under `assets/`:
//! - `server.json` — what is captured and how it is published (server name, capture method,
//!   sources, alpha handling, watermark). Hot-reloaded.
//! - `output.json` — which backend publishes (syphon/spout/ndi/preview) and window preferences.
//!
//! Per redraw the host does, in order:
//! 1) drain hot-reload events and apply them (`reconfigure` + `set_watermark`)
//! 2) `CaptureSession::update` (idempotent setup)
//! 3) render the scene into the offscreen camera, then run the camera hook if one is attached
//! 4) present the camera to the window back buffer (the game view)
//! 5) `CaptureSession::end_of_frame` (copy, watermark, publish)
//! 6) swap buffers
//!
//! Hotkeys: 1 = game view, 2 = camera, 3 = texture, A = toggle keep_alpha, W = toggle watermark,
//! R = re-validate (tears the capture down; the next tick recreates it).

mod gl;
mod host;
mod hotreload;
mod logging;
mod output;
mod presenter;
mod scene;
mod validate;

use std::ffi::CString;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{anyhow, Context as _};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, NotCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasRawWindowHandle;
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};

use syphoncast_engine::assets::AssetsRoot;
use syphoncast_engine::config::{load_server_config, load_server_config_strict, ServerConfig};
use syphoncast_engine::driver::FrameOutcome;
use syphoncast_engine::events::EngineEvent;
use syphoncast_engine::host::FrameHost;
use syphoncast_engine::selector::CaptureState;
use syphoncast_engine::{CameraId, CaptureMethod, CaptureSession, EngineError, SkipReason};

use crate::host::GlHost;
use crate::hotreload::{coalesce, HotEvent, HotReload};
use crate::output::{create_sink, load_output_config};
use crate::presenter::{NullPresenter, Presenter, WindowPresenter};
use crate::scene::{shader_source, Scene, PRESENT_FRAG};
use crate::validate::{emit_issues, emit_summary, validate_output_config, validate_server_config, HostCaps};

#[derive(Debug, Default)]
struct Args {
    log_file: Option<PathBuf>,
    assets: Option<PathBuf>,
    strict: bool,
    no_camera_hooks: bool,
}

/// `--log-file <path>` (or `SYPHONCAST_LOG_FILE`), `--assets <dir>`, `--strict`,
/// `--no-camera-hooks`.
fn parse_args(args: impl IntoIterator<Item = String>) -> Args {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--log-file" => out.log_file = it.next().map(PathBuf::from),
            "--assets" => out.assets = it.next().map(PathBuf::from),
            "--strict" => out.strict = true,
            "--no-camera-hooks" => out.no_camera_hooks = true,
            _ => {}
        }
    }
    if out.log_file.is_none() {
        if let Ok(p) = std::env::var("SYPHONCAST_LOG_FILE") {
            if !p.trim().is_empty() {
                out.log_file = Some(PathBuf::from(p));
            }
        }
    }
    out
}

fn main() {
    let args = parse_args(std::env::args().skip(1));
    let run_id = logging::init(args.log_file.clone());
    logi!("INIT", "run_id={run_id}");

    if let Err(e) = run(args) {
        loge!("INIT", "{e:#}");
        std::process::exit(1);
    }
}

fn find_assets(args: &Args) -> Result<AssetsRoot, EngineError> {
    if let Some(p) = &args.assets {
        return Ok(AssetsRoot::at(p));
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    AssetsRoot::discover(&cwd).or_else(|_| AssetsRoot::discover(std::path::Path::new(env!("CARGO_MANIFEST_DIR"))))
}

fn load_server(assets: &AssetsRoot, strict: bool) -> Result<ServerConfig, EngineError> {
    if strict {
        load_server_config_strict(assets)
    } else {
        load_server_config(assets)
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let assets = find_assets(&args)?;
    logi!("INIT", "assets base: {}", assets.path().display());

    let mut server_cfg = load_server(&assets, args.strict)?;
    logi!("CONFIG", "server config: {}", server_cfg.path.display());

    let output_cfg = load_output_config(&assets)?;
    let issues = validate_output_config(&output_cfg);
    emit_issues("CONFIG", &issues);
    emit_summary("CONFIG", "output.json", &issues);
    logi!(
        "OUTPUT",
        "backend={:?} window={}x{} headless={}",
        output_cfg.backend,
        output_cfg.window.width,
        output_cfg.window.height,
        output_cfg.window.headless
    );

    // --- Window + GL ---------------------------------------------------------------
    let win_w = output_cfg.window.width.max(1);
    let win_h = output_cfg.window.height.max(1);

    let event_loop = EventLoop::new().context("EventLoop::new failed")?;
    let window_builder = winit::window::WindowBuilder::new()
        .with_title("syphoncast")
        .with_visible(!output_cfg.window.headless)
        .with_inner_size(PhysicalSize::new(win_w, win_h));

    let template = ConfigTemplateBuilder::new().with_alpha_size(8).with_depth_size(0);
    let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

    let (window, gl_config) = display_builder
        .build(&event_loop, template, |configs| {
            configs
                .reduce(|a, b| if a.num_samples() > b.num_samples() { a } else { b })
                .expect("at least one GL config")
        })
        .map_err(|e| anyhow!("failed to build display: {e}"))?;
    let window = window.context("no window created")?;

    let raw_window_handle = window.raw_window_handle();
    let gl_display = gl_config.display();

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_window_handle));

    let not_current_gl_context: NotCurrentContext = unsafe {
        gl_display
            .create_context(&gl_config, &context_attributes)
            .context("create_context failed")?
    };

    let size = window.inner_size();
    let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        NonZeroU32::new(size.width.max(1)).unwrap_or(NonZeroU32::MIN),
        NonZeroU32::new(size.height.max(1)).unwrap_or(NonZeroU32::MIN),
    );
    let gl_surface = unsafe {
        gl_display
            .create_window_surface(&gl_config, &attrs)
            .context("create_window_surface failed")?
    };
    let gl_context = not_current_gl_context
        .make_current(&gl_surface)
        .context("make_current failed")?;
    gl_surface
        .set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
        .ok();

    let gl = Rc::new(unsafe {
        glow::Context::from_loader_function(|s| match CString::new(s) {
            Ok(c) => gl_display.get_proc_address(&c) as *const _,
            Err(_) => std::ptr::null(),
        })
    });

    // --- Host, session, presentation -------------------------------------------------
    let mut host = GlHost::new(
        gl.clone(),
        assets.clone(),
        (size.width.max(1), size.height.max(1)),
        !args.no_camera_hooks,
    )?;
    host.sync_assets(&server_cfg);
    validate_server(&server_cfg, &host, &assets);

    let mut session = CaptureSession::with_config(
        create_sink(&output_cfg, &gl),
        server_cfg.capture.clone(),
        server_cfg.watermark.clone(),
    );

    let scene = Scene::new(&gl, &assets)?;
    let mut presenter = if output_cfg.window.headless {
        Presenter::Null(NullPresenter)
    } else {
        let frag = shader_source(&assets, "present.frag", PRESENT_FRAG)?;
        let program = unsafe { crate::gl::compile_program(&gl, crate::gl::VERT_SRC, &frag).context("present shader")? };
        let vao = unsafe { glow::HasContext::create_vertex_array(&*gl).map_err(|e| anyhow!(e))? };
        Presenter::Window(WindowPresenter { program, vao })
    };
    logi!("RENDER", "preview presenter enabled={}", presenter.is_enabled());

    let hot = match HotReload::new(assets.path()) {
        Ok(h) => {
            logi!("WATCH", "watching {}", assets.path().display());
            Some(h)
        }
        Err(e) => {
            logw!("WATCH", "hot reload disabled: {e:#}");
            None
        }
    };

    set_title(&window, &session);
    logi!("INIT", "ready (run_id={})", logging::run_id());

    let start = Instant::now();
    let mut last_skip: Option<SkipReason> = None;

    event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => target.exit(),

                WindowEvent::Resized(new_size) => {
                    if let (Some(w), Some(h)) =
                        (NonZeroU32::new(new_size.width), NonZeroU32::new(new_size.height))
                    {
                        gl_surface.resize(&gl_context, w, h);
                    }
                }

                WindowEvent::KeyboardInput { event, .. } => {
                    if !event.state.is_pressed() {
                        return;
                    }
                    let PhysicalKey::Code(code) = event.physical_key else { return };
                    handle_key(code, &mut session, &host, &server_cfg);
                    set_title(&window, &session);
                }

                WindowEvent::RedrawRequested => {
                    let size = window.inner_size();
                    let (w, h) = (size.width.max(1), size.height.max(1));
                    host.set_display_size(w, h);

                    if let Some(hot) = &hot {
                        let pending = coalesce(hot.rx().try_iter());
                        for ev in pending {
                            match ev {
                                HotEvent::ServerConfigChanged(p) => {
                                    logi!("WATCH", "changed: {}", p.display());
                                    apply_reload(&assets, args.strict, &mut session, &mut host, &mut server_cfg);
                                    set_title(&window, &session);
                                }
                                HotEvent::ImageChanged(p) => host.reload_image(&p),
                            }
                        }
                    }

                    session.update(&mut host);

                    scene.render(&gl, host.camera_target(), start.elapsed().as_secs_f32());

                    if session.state() == CaptureState::Camera {
                        host.refresh_camera_output();
                        let cam = host.main_camera().clone();
                        if host.is_hooked(&cam) {
                            if let Some(out) = host.camera_output(&cam) {
                                session.on_camera_rendered(&cam, out);
                            }
                        }
                    }

                    let rt = host.camera_target();
                    presenter.present(&gl, rt.tex, (rt.w, rt.h), (w as i32, h as i32));

                    match session.end_of_frame(&mut host) {
                        FrameOutcome::Skipped(reason) => {
                            if last_skip.as_ref() != Some(&reason) {
                                logw!("CAPTURE", "frame skipped: {reason}");
                                last_skip = Some(reason);
                            }
                        }
                        FrameOutcome::Published | FrameOutcome::Idle => last_skip = None,
                    }

                    if let Err(e) = gl_surface.swap_buffers(&gl_context) {
                        loge!("RENDER", "swap_buffers failed: {e}");
                    }

                    log_events(session.drain_events());
                }

                _ => {}
            },

            Event::AboutToWait => window.request_redraw(),

            Event::LoopExiting => {
                session.disable();
                log_events(session.drain_events());
                presenter.destroy(&gl);
                scene.destroy(&gl);
                host.destroy();
                logi!("INIT", "shutdown");
            }

            _ => {}
        }
    })?;

    Ok(())
}

fn validate_server(cfg: &ServerConfig, host: &GlHost, assets: &AssetsRoot) {
    let cameras = host.camera_names();
    let caps = HostCaps {
        assets_dir: assets.path(),
        cameras: &cameras,
        camera_hooks: host.has_camera_hooks(),
    };
    let issues = validate_server_config(cfg, &caps);
    emit_issues("CONFIG", &issues);
    emit_summary("CONFIG", "server.json", &issues);
}

/// Re-read `server.json` and push it into the session. A file that fails to parse leaves the
/// last good config in place.
fn apply_reload(
    assets: &AssetsRoot,
    strict: bool,
    session: &mut CaptureSession,
    host: &mut GlHost,
    current: &mut ServerConfig,
) {
    let cfg = match load_server(assets, strict) {
        Ok(c) => c,
        Err(e) => {
            loge!("WATCH", "reload failed; keeping last good config: {e}");
            return;
        }
    };

    host.sync_assets(&cfg);
    validate_server(&cfg, host, assets);

    match session.reconfigure(cfg.capture.clone()) {
        Ok(r) if r.torn_down => logi!("CONFIG", "capture changed; recreating on next tick"),
        Ok(_) => {}
        Err(e) => logw!("CONFIG", "capture inactive until fixed: {e}"),
    }
    session.set_watermark(cfg.watermark.clone());
    *current = cfg;
}

fn handle_key(code: KeyCode, session: &mut CaptureSession, host: &GlHost, cfg: &ServerConfig) {
    let result = match code {
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(session.set_capture_method(CaptureMethod::GameView)),
        KeyCode::Digit2 | KeyCode::Numpad2 => {
            let mut next = session.config().clone();
            next.capture_method = CaptureMethod::Camera;
            if next.source_camera.is_none() {
                next.source_camera = Some(CameraId::new(host.main_camera().as_str()));
            }
            Some(session.reconfigure(next))
        }
        KeyCode::Digit3 | KeyCode::Numpad3 => {
            let mut next = session.config().clone();
            next.capture_method = CaptureMethod::Texture;
            if next.source_texture.is_none() {
                next.source_texture = cfg.capture.source_texture.clone();
            }
            Some(session.reconfigure(next))
        }
        KeyCode::KeyA => {
            let keep = !session.config().keep_alpha;
            session.set_keep_alpha(keep);
            logi!("CAPTURE", "keep_alpha={keep}");
            None
        }
        KeyCode::KeyW => {
            let mut wm = session.watermark().clone();
            wm.enabled = !wm.enabled;
            logi!("CAPTURE", "watermark enabled={}", wm.enabled);
            session.set_watermark(wm);
            None
        }
        KeyCode::KeyR => {
            session.on_validate();
            None
        }
        _ => None,
    };

    if let Some(Err(e)) = result {
        logw!("CAPTURE", "capture inactive until fixed: {e}");
    }
}

fn set_title(window: &winit::window::Window, session: &CaptureSession) {
    let c = session.config();
    window.set_title(&format!(
        "syphoncast – '{}' {:?} keep_alpha={} (1=GameView 2=Camera 3=Texture A=alpha W=watermark)",
        c.server_name, c.capture_method, c.keep_alpha
    ));
}

fn log_events(events: Vec<EngineEvent>) {
    for ev in events {
        match ev {
            EngineEvent::CaptureStarted {
                server_name,
                method,
                width,
                height,
            } => logi!("CAPTURE", "started '{server_name}' method={method:?} {width}x{height}"),
            EngineEvent::CaptureStopped { reason } => logi!("CAPTURE", "stopped ({reason:?})"),
            EngineEvent::SetupSuppressed { error } => logw!("CAPTURE", "setup suppressed: {error}"),
            EngineEvent::CameraHookUnavailable { camera } => logw!(
                "CAPTURE",
                "camera '{camera}' has no capture hook; frames are copied at end of frame"
            ),
            EngineEvent::ColorSpaceApplied => logi!("RENDER", "colour space applied"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Args {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags() {
        let a = args(&["--assets", "/tmp/a", "--strict", "--no-camera-hooks", "--log-file", "x.log"]);
        assert_eq!(a.assets, Some(PathBuf::from("/tmp/a")));
        assert!(a.strict);
        assert!(a.no_camera_hooks);
        assert_eq!(a.log_file, Some(PathBuf::from("x.log")));
    }

    #[test]
    fn ignores_unknown_and_dangling_flags() {
        let a = args(&["--verbose", "--assets"]);
        assert_eq!(a.assets, None);
        assert!(!a.strict);
    }
}
