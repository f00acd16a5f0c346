//! The GL host: the pixel sources the capture session reads from.
//!
//! - display readback: the window back buffer after the preview is presented
//! - one offscreen camera ("main") that renders the scene
//! - texture sources and watermark sprites loaded from image files under `assets/`
//! - per-camera capture hooks for the offscreen camera

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context as _;
use glow::HasContext;

use syphoncast_engine::assets::AssetsRoot;
use syphoncast_engine::blit::flip_vertical;
use syphoncast_engine::config::ServerConfig;
use syphoncast_engine::geometry::PixelRect;
use syphoncast_engine::host::{CameraCapture, CaptureHook, FrameHost};
use syphoncast_engine::{CameraId, FrameBuffer, Sprite, SpriteId, TextureId};

use crate::gl::{read_rgba, RenderTarget};
use crate::{logi, logw};

pub const MAIN_CAMERA: &str = "main";

/// Load an image file as a top-left RGBA8 frame.
pub fn load_image(path: &Path) -> anyhow::Result<FrameBuffer> {
    let img = image::open(path)
        .with_context(|| format!("failed to load image {}", path.display()))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    FrameBuffer::from_rgba(w, h, img.into_raw())
        .with_context(|| format!("{} decoded to an unexpected size", path.display()))
}

/// Clamp a configured crop region to the image.
fn sprite_from(texture: FrameBuffer, region: Option<PixelRect>) -> Sprite {
    let mut sprite = Sprite::full(texture);
    if let Some(r) = region {
        let (w, h) = sprite.texture.size();
        let x = r.x.min(w);
        let y = r.y.min(h);
        sprite.rect = PixelRect::new(x, y, r.width.min(w - x), r.height.min(h - y));
    }
    sprite
}

/// Remove every entry except `keep`. Returns the removed ids.
fn evict_unreferenced<K, V>(map: &mut HashMap<K, V>, keep: Option<&K>) -> Vec<K>
where
    K: Clone + Eq + std::hash::Hash,
{
    let stale: Vec<K> = map.keys().filter(|k| Some(*k) != keep).cloned().collect();
    for k in &stale {
        map.remove(k);
    }
    stale
}

struct Camera {
    id: CameraId,
    target: RenderTarget,
    /// Last readback, top-left origin.
    output: Option<FrameBuffer>,
}

struct LoadedSprite {
    path: PathBuf,
    region: Option<PixelRect>,
    sprite: Sprite,
}

pub struct GlHost {
    gl: Rc<glow::Context>,
    assets: AssetsRoot,
    display: (u32, u32),
    camera: Camera,
    textures: HashMap<TextureId, (PathBuf, FrameBuffer)>,
    sprites: HashMap<SpriteId, LoadedSprite>,
    hooks: Option<HookRegistry>,
}

impl GlHost {
    pub fn new(
        gl: Rc<glow::Context>,
        assets: AssetsRoot,
        display: (u32, u32),
        camera_hooks: bool,
    ) -> anyhow::Result<Self> {
        let target = unsafe { RenderTarget::new(&gl, display.0 as i32, display.1 as i32)? };
        Ok(Self {
            gl,
            assets,
            display,
            camera: Camera {
                id: CameraId::new(MAIN_CAMERA),
                target,
                output: None,
            },
            textures: HashMap::new(),
            sprites: HashMap::new(),
            hooks: camera_hooks.then(HookRegistry::default),
        })
    }

    pub fn camera_names(&self) -> [&str; 1] {
        [self.camera.id.as_str()]
    }

    pub fn has_camera_hooks(&self) -> bool {
        self.hooks.is_some()
    }

    pub fn main_camera(&self) -> &CameraId {
        &self.camera.id
    }

    pub fn camera_target(&self) -> &RenderTarget {
        &self.camera.target
    }

    /// Window resized: the display and the camera target follow it.
    pub fn set_display_size(&mut self, w: u32, h: u32) {
        if (w, h) == self.display || w == 0 || h == 0 {
            return;
        }
        self.display = (w, h);
        unsafe { self.camera.target.resize(&self.gl, w as i32, h as i32) };
        self.camera.output = None;
    }

    /// Read the camera target back after it rendered. Only needed while something consumes it.
    pub fn refresh_camera_output(&mut self) {
        let t = &self.camera.target;
        let frame = unsafe { read_rgba(&self.gl, Some(t.fbo), t.w as u32, t.h as u32) };
        self.camera.output = frame.map(|mut f| {
            flip_vertical(&mut f);
            f
        });
    }

    pub fn is_hooked(&self, camera: &CameraId) -> bool {
        self.hooks.as_ref().is_some_and(|h| h.contains(camera))
    }

    /// Make sure every image the config references is loaded, and drop the ones it no longer
    /// references.
    pub fn sync_assets(&mut self, cfg: &ServerConfig) {
        for id in evict_unreferenced(&mut self.textures, cfg.capture.source_texture.as_ref()) {
            logi!("CONFIG", "texture '{id}' unloaded");
        }
        for id in evict_unreferenced(&mut self.sprites, cfg.watermark.image.as_ref()) {
            logi!("CONFIG", "watermark '{id}' unloaded");
        }

        if let Some(id) = &cfg.capture.source_texture {
            if !self.textures.contains_key(id) {
                let path = self.assets.resolve(id.as_str());
                match load_image(&path) {
                    Ok(frame) => {
                        logi!("CONFIG", "texture '{id}' loaded ({}x{})", frame.width(), frame.height());
                        self.textures.insert(id.clone(), (path, frame));
                    }
                    Err(e) => logw!("CONFIG", "texture '{id}': {e:#}"),
                }
            }
        }

        if let Some(id) = &cfg.watermark.image {
            let stale = self
                .sprites
                .get(id)
                .map_or(true, |s| s.region != cfg.watermark_region);
            if stale {
                let path = self.assets.resolve(id.as_str());
                match load_image(&path) {
                    Ok(frame) => {
                        let sprite = sprite_from(frame, cfg.watermark_region);
                        logi!("CONFIG", "watermark '{id}' loaded (region {:?})", sprite.rect);
                        self.sprites.insert(
                            id.clone(),
                            LoadedSprite {
                                path,
                                region: cfg.watermark_region,
                                sprite,
                            },
                        );
                    }
                    Err(e) => logw!("CONFIG", "watermark '{id}': {e:#}"),
                }
            }
        }
    }

    /// An image file changed on disk: reload every texture or sprite that came from it.
    pub fn reload_image(&mut self, path: &Path) {
        let wanted = path.canonicalize().ok();
        let same = |p: &Path| p == path || (wanted.is_some() && p.canonicalize().ok() == wanted);

        for (id, (p, frame)) in self.textures.iter_mut() {
            if same(p) {
                match load_image(p) {
                    Ok(f) => {
                        logi!("WATCH", "texture '{id}' reloaded ({}x{})", f.width(), f.height());
                        *frame = f;
                    }
                    Err(e) => logw!("WATCH", "texture '{id}' reload failed; keeping previous: {e:#}"),
                }
            }
        }
        for (id, s) in self.sprites.iter_mut() {
            if same(&s.path) {
                match load_image(&s.path) {
                    Ok(f) => {
                        logi!("WATCH", "watermark '{id}' reloaded");
                        s.sprite = sprite_from(f, s.region);
                    }
                    Err(e) => logw!("WATCH", "watermark '{id}' reload failed; keeping previous: {e:#}"),
                }
            }
        }
    }

    pub fn destroy(&self) {
        unsafe { self.camera.target.destroy(&self.gl) };
    }
}

impl FrameHost for GlHost {
    fn display_size(&self) -> (u32, u32) {
        self.display
    }

    fn read_display(&mut self) -> Option<FrameBuffer> {
        unsafe { read_rgba(&self.gl, None, self.display.0, self.display.1) }
    }

    fn texture(&self, id: &TextureId) -> Option<&FrameBuffer> {
        self.textures.get(id).map(|(_, f)| f)
    }

    fn camera_size(&self, id: &CameraId) -> Option<(u32, u32)> {
        (id == &self.camera.id).then(|| {
            let t = &self.camera.target;
            (t.w as u32, t.h as u32)
        })
    }

    fn camera_output(&self, id: &CameraId) -> Option<&FrameBuffer> {
        if id == &self.camera.id {
            self.camera.output.as_ref()
        } else {
            None
        }
    }

    fn sprite(&self, id: &SpriteId) -> Option<&Sprite> {
        self.sprites.get(id).map(|s| &s.sprite)
    }

    fn camera_capture(&mut self) -> Option<&mut dyn CameraCapture> {
        let known = self.camera.id.clone();
        let hooks = self.hooks.as_mut()?;
        hooks.known = Some(known);
        Some(hooks)
    }

    /// Published bytes are the stored framebuffer values; no sRGB conversion on write or read.
    fn apply_color_space(&mut self) {
        unsafe { self.gl.disable(glow::FRAMEBUFFER_SRGB) };
        logi!("RENDER", "sharing colour space: sRGB-encoded RGBA8, no framebuffer conversion");
    }
}

/// Cameras with a registered capture hook.
#[derive(Default)]
struct HookRegistry {
    registered: Rc<RefCell<Vec<CameraId>>>,
    /// Camera that may be hooked; set right before `attach`.
    known: Option<CameraId>,
}

impl HookRegistry {
    fn contains(&self, camera: &CameraId) -> bool {
        self.registered.borrow().contains(camera)
    }
}

impl CameraCapture for HookRegistry {
    fn attach(&mut self, camera: &CameraId) -> Option<Box<dyn CaptureHook>> {
        if self.known.as_ref() != Some(camera) {
            return None;
        }
        let mut reg = self.registered.borrow_mut();
        if !reg.contains(camera) {
            reg.push(camera.clone());
        }
        Some(Box::new(CameraHook {
            camera: camera.clone(),
            registered: self.registered.clone(),
        }))
    }
}

struct CameraHook {
    camera: CameraId,
    registered: Rc<RefCell<Vec<CameraId>>>,
}

impl CaptureHook for CameraHook {
    fn camera(&self) -> &CameraId {
        &self.camera
    }
}

impl Drop for CameraHook {
    fn drop(&mut self) {
        self.registered.borrow_mut().retain(|c| c != &self.camera);
    }
}
