//! Hot-reload watcher.
//!
//! We watch **directories** (not individual files) because editors often save as
//! write temp → rename → delete old. Directory watching catches all of those.
//!
//! The watcher only classifies paths and forwards them; parsing, `reconfigure` and image
//! uploads happen on the render thread when it drains the channel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotEvent {
    /// `server(.<os>).json` changed.
    ServerConfigChanged(PathBuf),
    /// A raster image under the assets directory changed (texture source or watermark).
    ImageChanged(PathBuf),
}

pub struct HotReload {
    _watcher: RecommendedWatcher,
    rx: Receiver<HotEvent>,
}

impl HotReload {
    pub fn rx(&self) -> &Receiver<HotEvent> {
        &self.rx
    }

    /// Watch `assets_dir` recursively.
    pub fn new(assets_dir: &Path) -> anyhow::Result<Self> {
        let (tx, rx) = unbounded::<HotEvent>();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let Ok(ev) = res else { return };
                if matches!(ev.kind, EventKind::Access(_)) {
                    return;
                }
                for p in ev.paths {
                    if let Some(hot) = classify(p) {
                        let _ = tx.send(hot);
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_millis(250)),
        )?;

        watcher.watch(assets_dir, RecursiveMode::Recursive)?;

        Ok(Self { _watcher: watcher, rx })
    }
}

fn classify(path: PathBuf) -> Option<HotEvent> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with("server.") && name.ends_with(".json") {
        return Some(HotEvent::ServerConfigChanged(path));
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" | "jpg" | "jpeg" => Some(HotEvent::ImageChanged(path)),
        _ => None,
    }
}

/// Collapse a burst of events (one save usually fires several) into one reload per kind/path.
pub fn coalesce(events: impl IntoIterator<Item = HotEvent>) -> Vec<HotEvent> {
    let mut out: Vec<HotEvent> = Vec::new();
    for ev in events {
        let dup = match &ev {
            HotEvent::ServerConfigChanged(_) => out
                .iter()
                .any(|e| matches!(e, HotEvent::ServerConfigChanged(_))),
            HotEvent::ImageChanged(_) => out.contains(&ev),
        };
        if !dup {
            out.push(ev);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_server_json_and_platform_override() {
        assert_eq!(
            classify(PathBuf::from("assets/server.json")),
            Some(HotEvent::ServerConfigChanged(PathBuf::from("assets/server.json")))
        );
        assert!(matches!(
            classify(PathBuf::from("assets/server.macos.json")),
            Some(HotEvent::ServerConfigChanged(_))
        ));
        assert_eq!(classify(PathBuf::from("assets/output.json")), None);
    }

    #[test]
    fn classifies_images_case_insensitively() {
        assert!(matches!(
            classify(PathBuf::from("assets/images/Logo.PNG")),
            Some(HotEvent::ImageChanged(_))
        ));
        assert_eq!(classify(PathBuf::from("assets/readme.txt")), None);
        assert_eq!(classify(PathBuf::from("assets/images/.png.swp")), None);
    }

    #[test]
    fn coalesce_keeps_one_config_reload_and_distinct_images() {
        let a = PathBuf::from("assets/images/a.png");
        let b = PathBuf::from("assets/images/b.png");
        let out = coalesce([
            HotEvent::ServerConfigChanged(PathBuf::from("assets/server.json")),
            HotEvent::ImageChanged(a.clone()),
            HotEvent::ServerConfigChanged(PathBuf::from("assets/server.json")),
            HotEvent::ImageChanged(a.clone()),
            HotEvent::ImageChanged(b.clone()),
        ]);
        assert_eq!(
            out,
            vec![
                HotEvent::ServerConfigChanged(PathBuf::from("assets/server.json")),
                HotEvent::ImageChanged(a),
                HotEvent::ImageChanged(b),
            ]
        );
    }
}
