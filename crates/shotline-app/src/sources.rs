//! Still-image pixel sources decoded on a background loader thread.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use shotline_core::{Color, FrameBuffer, PixelSourceRef, SharedFrameBuffer, Shot};
use shotline_effects::{PixelSourceProvider, SourceFrame};
use tracing::{debug, warn};

/// Size of the generated stand-in for sources that cannot be loaded.
const FALLBACK_SIZE: (u32, u32) = (640, 360);

enum LoaderMessage {
    Load(PixelSourceRef),
    Shutdown,
}

#[derive(Clone)]
enum Entry {
    Pending,
    Ready {
        frame: SharedFrameBuffer,
        decode_time: Duration,
    },
}

type Cache = Arc<Mutex<HashMap<PixelSourceRef, Entry>>>;

/// Serves shots' pixels from image files relative to a root directory.
/// Frames are `NotReady` until the loader thread has decoded them.
pub struct ImageSourceProvider {
    cache: Cache,
    sender: Sender<LoaderMessage>,
    worker: Option<JoinHandle<()>>,
}

impl ImageSourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cache: Cache = Arc::new(Mutex::new(HashMap::new()));
        let (sender, receiver) = unbounded();

        let worker_cache = Arc::clone(&cache);
        let worker = std::thread::Builder::new()
            .name("shotline-loader".into())
            .spawn(move || {
                while let Ok(LoaderMessage::Load(source)) = receiver.recv() {
                    let started = Instant::now();
                    let frame = load_or_fallback(&root, &source);
                    let entry = Entry::Ready {
                        frame: Arc::new(frame),
                        decode_time: started.elapsed(),
                    };
                    worker_cache.lock().insert(source, entry);
                }
                debug!("Image loader exiting");
            });
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to spawn image loader: {}", e);
                None
            }
        };

        Self {
            cache,
            sender,
            worker,
        }
    }

    /// Queue a source for decoding unless it is known already.
    fn request(&self, source: &PixelSourceRef) {
        let mut cache = self.cache.lock();
        if cache.contains_key(source) {
            return;
        }
        cache.insert(source.clone(), Entry::Pending);
        if self.sender.send(LoaderMessage::Load(source.clone())).is_err() {
            warn!("Image loader unavailable, {} stays pending", source);
        }
    }

    /// Queue every shot's source.
    pub fn preload(&self, shots: &[Shot]) {
        for shot in shots {
            self.request(&shot.pixel_source);
        }
    }

    /// Block until nothing is pending or `timeout` passes. Returns whether
    /// everything was decoded.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let pending = self
                .cache
                .lock()
                .values()
                .any(|entry| matches!(entry, Entry::Pending));
            if !pending {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl PixelSourceProvider for ImageSourceProvider {
    fn frame(&self, shot: &Shot, _shot_time: f64) -> SourceFrame {
        let entry = self.cache.lock().get(&shot.pixel_source).cloned();
        match entry {
            Some(Entry::Ready { frame, decode_time }) => SourceFrame::Ready { frame, decode_time },
            Some(Entry::Pending) => SourceFrame::NotReady,
            None => {
                self.request(&shot.pixel_source);
                SourceFrame::NotReady
            }
        }
    }
}

impl Drop for ImageSourceProvider {
    fn drop(&mut self) {
        let _ = self.sender.send(LoaderMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn load_or_fallback(root: &Path, source: &PixelSourceRef) -> FrameBuffer {
    let path = root.join(source.as_str());
    match image::open(&path) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            debug!("Decoded {} ({}x{})", path.display(), width, height);
            FrameBuffer {
                width,
                height,
                data: rgba.into_raw(),
            }
        }
        Err(e) => {
            warn!("Cannot load {}: {}; using test pattern", path.display(), e);
            tinted_pattern(source)
        }
    }
}

/// Colour bars tinted by a hash of the source name, so distinct missing
/// sources stay distinguishable.
pub fn tinted_pattern(source: &PixelSourceRef) -> FrameBuffer {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    source.hash(&mut hasher);
    let bytes = hasher.finish().to_le_bytes();
    let tint = Color::from_rgba8(bytes[0] | 0x40, bytes[1] | 0x40, bytes[2] | 0x40, 255);

    let mut frame = FrameBuffer::test_pattern(FALLBACK_SIZE.0, FALLBACK_SIZE.1);
    let factors = [tint.r, tint.g, tint.b];
    for px in frame.data.chunks_exact_mut(4) {
        for (c, f) in px.iter_mut().zip(factors) {
            *c = (*c as f32 * f).round() as u8;
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_after_load() {
        let provider = ImageSourceProvider::new(std::env::temp_dir());
        let shot = Shot::new(0, 1.0, "shotline-definitely-missing.png");

        assert!(matches!(provider.frame(&shot, 0.0), SourceFrame::NotReady));
        assert!(provider.wait_ready(Duration::from_secs(5)));
        match provider.frame(&shot, 0.0) {
            SourceFrame::Ready { frame, .. } => {
                assert_eq!((frame.width, frame.height), FALLBACK_SIZE);
            }
            SourceFrame::NotReady => panic!("fallback should be ready"),
        }
    }

    #[test]
    fn test_png_is_decoded() {
        let dir = std::env::temp_dir().join(format!("shotline-src-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        img.save(dir.join("tiny.png")).unwrap();

        let provider = ImageSourceProvider::new(dir.clone());
        let shot = Shot::new(0, 1.0, "tiny.png");
        provider.preload(std::slice::from_ref(&shot));
        assert!(provider.wait_ready(Duration::from_secs(5)));
        match provider.frame(&shot, 0.0) {
            SourceFrame::Ready { frame, .. } => {
                assert_eq!((frame.width, frame.height), (4, 2));
                assert_eq!(frame.pixel(3, 1), Some([10, 20, 30, 255]));
            }
            SourceFrame::NotReady => panic!("png should be ready"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_tints_differ_per_source() {
        let a = tinted_pattern(&PixelSourceRef::new("a"));
        let b = tinted_pattern(&PixelSourceRef::new("b"));
        assert_ne!(a, b);
    }
}
