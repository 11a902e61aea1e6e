//! Asset loading off the driving thread.
//!
//! Loads run on worker threads; completions are queued on a channel and
//! delivered by [`AssetLoader::drain`] on the driving thread, so callbacks
//! always see the scene graph single-threaded. Every request carries the
//! session's [`LiveToken`]: if the session was disposed while the load was in
//! flight, the completion is dropped with a warning instead of touching a
//! dead scene.
//!
//! # Example
//!
//! ```no_run
//! use vitrine::*;
//!
//! # fn run(session: &Session) {
//! let mut loader = AssetLoader::new();
//! loader.load_model("gallery/statue.stl", session.live_token(), |scene, result| {
//!     match result {
//!         Ok(model) => {
//!             let node = scene.add_mesh("statue", Transform::new(), None);
//!             scene.attach_collider(node, Collider::box_collider(model.half_extents() * 2.0));
//!         }
//!         Err(err) => log::error!("statue failed to load: {err}"),
//!     }
//! });
//! # }
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use glam::Vec3;

use crate::error::AssetError;
use crate::scene::SceneGraph;
use crate::session::LiveToken;

/// Triangle mesh decoded from an STL file.
#[derive(Clone, Debug)]
pub struct ModelData {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl ModelData {
    /// Axis-aligned bounds of the mesh, or a zero box when empty.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in &self.positions {
            let v = Vec3::from_array(*p);
            min = min.min(v);
            max = max.max(v);
        }
        if self.positions.is_empty() {
            (Vec3::ZERO, Vec3::ZERO)
        } else {
            (min, max)
        }
    }

    /// Half-extents of the bounding box, handy for a picking collider.
    pub fn half_extents(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (max - min) * 0.5
    }
}

/// RGBA8 image decoded from any format the `image` crate understands.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

type ModelCallback = Box<dyn FnOnce(&mut SceneGraph, Result<ModelData, AssetError>)>;
type TextureCallback = Box<dyn FnOnce(&mut SceneGraph, Result<TextureData, AssetError>)>;

enum PendingCallback {
    Model(ModelCallback),
    Texture(TextureCallback),
}

enum LoadOutcome {
    Model(Result<ModelData, AssetError>),
    Texture(Result<TextureData, AssetError>),
}

struct Pending {
    token: LiveToken,
    label: PathBuf,
    callback: PendingCallback,
}

/// Threaded loader delivering completions on the driving thread.
pub struct AssetLoader {
    tx: Sender<(u64, LoadOutcome)>,
    rx: Receiver<(u64, LoadOutcome)>,
    pending: HashMap<u64, Pending>,
    next_id: u64,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Queue an STL model load.
    ///
    /// `callback` runs on the driving thread during a later
    /// [`drain`](Self::drain), unless `token` has died by then.
    pub fn load_model(
        &mut self,
        path: impl Into<PathBuf>,
        token: LiveToken,
        callback: impl FnOnce(&mut SceneGraph, Result<ModelData, AssetError>) + 'static,
    ) {
        let path = path.into();
        let id = self.next_id();
        self.pending.insert(
            id,
            Pending {
                token,
                label: path.clone(),
                callback: PendingCallback::Model(Box::new(callback)),
            },
        );
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = LoadOutcome::Model(decode_model(&path));
            // The loader may have been dropped; nothing left to deliver to.
            let _ = tx.send((id, outcome));
        });
    }

    /// Queue a texture load.
    pub fn load_texture(
        &mut self,
        path: impl Into<PathBuf>,
        token: LiveToken,
        callback: impl FnOnce(&mut SceneGraph, Result<TextureData, AssetError>) + 'static,
    ) {
        let path = path.into();
        let id = self.next_id();
        self.pending.insert(
            id,
            Pending {
                token,
                label: path.clone(),
                callback: PendingCallback::Texture(Box::new(callback)),
            },
        );
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = LoadOutcome::Texture(decode_texture(&path));
            let _ = tx.send((id, outcome));
        });
    }

    /// Number of loads still awaiting delivery.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Deliver finished loads to their callbacks. Returns how many ran.
    ///
    /// Completions whose token has died are logged and dropped; their
    /// callbacks never run.
    pub fn drain(&mut self, scene: &mut SceneGraph) -> usize {
        let mut delivered = 0;
        while let Ok((id, outcome)) = self.rx.try_recv() {
            let Some(pending) = self.pending.remove(&id) else {
                continue;
            };
            if pending.token.dead() {
                log::warn!(
                    "dropping completed load of {:?}: session disposed while in flight",
                    pending.label
                );
                continue;
            }
            match (pending.callback, outcome) {
                (PendingCallback::Model(cb), LoadOutcome::Model(result)) => cb(scene, result),
                (PendingCallback::Texture(cb), LoadOutcome::Texture(result)) => cb(scene, result),
                _ => unreachable!("request ids never change kind"),
            }
            delivered += 1;
        }
        delivered
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_model(path: &Path) -> Result<ModelData, AssetError> {
    let mut file = File::open(path)?;
    let mesh =
        stl_io::read_stl(&mut file).map_err(|e| AssetError::Decode(e.to_string()))?;

    let positions = mesh
        .vertices
        .iter()
        .map(|v| [v[0], v[1], v[2]])
        .collect();
    let indices = mesh
        .faces
        .iter()
        .flat_map(|f| f.vertices.iter().map(|&i| i as u32))
        .collect();
    Ok(ModelData { positions, indices })
}

fn decode_texture(path: &Path) -> Result<TextureData, AssetError> {
    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => AssetError::Io(io),
        other => AssetError::Decode(other.to_string()),
    })?;
    let rgba = img.to_rgba8();
    Ok(TextureData {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn drain_until(
        loader: &mut AssetLoader,
        scene: &mut SceneGraph,
        expected: usize,
    ) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut delivered = 0;
        while delivered < expected && Instant::now() < deadline {
            delivered += loader.drain(scene);
            thread::sleep(Duration::from_millis(5));
        }
        delivered
    }

    fn drain_all(loader: &mut AssetLoader, scene: &mut SceneGraph) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut delivered = 0;
        while loader.in_flight() > 0 && Instant::now() < deadline {
            delivered += loader.drain(scene);
            thread::sleep(Duration::from_millis(5));
        }
        delivered
    }

    #[test]
    fn missing_file_reports_io_error() {
        let alive = Arc::new(AtomicBool::new(true));
        let mut loader = AssetLoader::new();
        let mut scene = SceneGraph::new();

        let saw_error = Rc::new(Cell::new(false));
        let flag = saw_error.clone();
        loader.load_model(
            "/nonexistent/statue.stl",
            LiveToken::from_flag(&alive),
            move |_, result| {
                flag.set(matches!(result, Err(AssetError::Io(_))));
            },
        );

        assert_eq!(drain_until(&mut loader, &mut scene, 1), 1);
        assert!(saw_error.get());
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn dead_token_drops_completion() {
        let alive = Arc::new(AtomicBool::new(true));
        let token = LiveToken::from_flag(&alive);
        let mut loader = AssetLoader::new();
        let mut scene = SceneGraph::new();

        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        loader.load_model("/nonexistent/statue.stl", token, move |_, _| {
            flag.set(true);
        });

        alive.store(false, std::sync::atomic::Ordering::SeqCst);
        let delivered = drain_all(&mut loader, &mut scene);
        assert_eq!(delivered, 0);
        assert!(!ran.get());
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn bad_image_reports_decode_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("vitrine_not_an_image.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let alive = Arc::new(AtomicBool::new(true));
        let mut loader = AssetLoader::new();
        let mut scene = SceneGraph::new();

        let saw_error = Rc::new(Cell::new(false));
        let flag = saw_error.clone();
        loader.load_texture(&path, LiveToken::from_flag(&alive), move |_, result| {
            flag.set(matches!(result, Err(AssetError::Decode(_))));
        });

        assert_eq!(drain_until(&mut loader, &mut scene, 1), 1);
        assert!(saw_error.get());
        let _ = std::fs::remove_file(&path);
    }
}
