//! Frame buffers shared between ingest and renderer.

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::stats::FrameStats;
use crate::types::config::CameraResolution;

/// Which eye a buffer or stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    /// Left eye.
    Left,
    /// Right eye.
    Right,
}

impl Eye {
    /// Index into two-element per-eye arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// Sink for completed decoded frames.
///
/// Implemented by [`FramePair`]; the ingest pipelines call it from their
/// decode tasks with the finished RGB buffer.
pub trait FrameSink: Send + Sync {
    /// Deliver one decoded frame.
    fn on_frame(&self, eye: Eye, data: &[u8], width: u32, height: u32);
}

/// A GPU-backed texture handle passed through without a CPU copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTexture {
    /// Driver texture handle.
    pub handle: u32,
    /// Texture target enum of the graphics API.
    pub target: u32,
}

#[derive(Debug)]
struct FrameContents {
    width: u32,
    height: u32,
    data: Vec<u8>,
    gpu: Option<GpuTexture>,
}

/// One eye's current frame.
///
/// The ingest thread exclusively mutates the contents; the renderer
/// reads them. Tearing between the two eyes over a single frame is
/// tolerated, so there is no cross-eye lock.
#[derive(Debug)]
pub struct FrameBuffer {
    contents: RwLock<FrameContents>,
    stats: RwLock<Arc<FrameStats>>,
}

impl FrameBuffer {
    /// Create a zero-filled buffer at the given resolution.
    #[must_use]
    pub fn new(resolution: &CameraResolution) -> Self {
        Self {
            contents: RwLock::new(FrameContents {
                width: resolution.width,
                height: resolution.height,
                data: vec![0; resolution.frame_bytes()],
                gpu: None,
            }),
            stats: RwLock::new(Arc::new(FrameStats::new())),
        }
    }

    /// Current `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        let contents = self.contents.read().expect("frame buffer lock poisoned");
        (contents.width, contents.height)
    }

    /// Current buffer size in bytes (`width * height * 3`).
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.contents.read().expect("frame buffer lock poisoned").data.len()
    }

    /// Read the current frame bytes.
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let contents = self.contents.read().expect("frame buffer lock poisoned");
        f(&contents.data)
    }

    /// Overwrite the frame bytes. Oversized input is truncated to the
    /// buffer; undersized input leaves the tail untouched.
    pub fn write(&self, data: &[u8]) {
        let mut contents = self.contents.write().expect("frame buffer lock poisoned");
        let n = data.len().min(contents.data.len());
        contents.data[..n].copy_from_slice(&data[..n]);
    }

    /// Install a GPU texture for the zero-copy path.
    pub fn set_gpu_texture(&self, texture: GpuTexture) {
        self.contents.write().expect("frame buffer lock poisoned").gpu = Some(texture);
    }

    /// The GPU texture, if the zero-copy path is active.
    #[must_use]
    pub fn gpu_texture(&self) -> Option<GpuTexture> {
        self.contents.read().expect("frame buffer lock poisoned").gpu
    }

    /// Whether the renderer should sample the GPU texture instead of
    /// the CPU buffer.
    #[must_use]
    pub fn has_gpu_texture(&self) -> bool {
        self.gpu_texture().is_some()
    }

    /// Statistics of the stream feeding this buffer.
    #[must_use]
    pub fn stats(&self) -> Arc<FrameStats> {
        self.stats.read().expect("frame stats lock poisoned").clone()
    }

    /// Resize, zero-fill and attach fresh statistics.
    pub(crate) fn reset(&self, resolution: &CameraResolution, stats: Arc<FrameStats>) {
        let mut contents = self.contents.write().expect("frame buffer lock poisoned");
        contents.width = resolution.width;
        contents.height = resolution.height;
        contents.data.clear();
        contents.data.resize(resolution.frame_bytes(), 0);
        contents.gpu = None;
        drop(contents);
        *self.stats.write().expect("frame stats lock poisoned") = stats;
    }
}

/// Both eyes' frame buffers, shared with the renderer for the lifetime
/// of the client.
#[derive(Debug)]
pub struct FramePair {
    left: FrameBuffer,
    right: FrameBuffer,
    mirror: AtomicBool,
}

impl FramePair {
    /// Create a pair of zero-filled buffers.
    #[must_use]
    pub fn new(resolution: &CameraResolution) -> Self {
        Self {
            left: FrameBuffer::new(resolution),
            right: FrameBuffer::new(resolution),
            mirror: AtomicBool::new(false),
        }
    }

    /// Buffer of one eye.
    #[must_use]
    pub fn eye(&self, eye: Eye) -> &FrameBuffer {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    /// Left-eye buffer.
    #[must_use]
    pub fn left(&self) -> &FrameBuffer {
        &self.left
    }

    /// Right-eye buffer.
    #[must_use]
    pub fn right(&self) -> &FrameBuffer {
        &self.right
    }

    /// Whether left frames are mirrored into the right buffer.
    #[must_use]
    pub fn is_mirroring(&self) -> bool {
        self.mirror.load(Ordering::Relaxed)
    }

    /// Resize and zero both buffers, attach fresh stats, and set the
    /// mono-mirroring flag. The renderer may observe one black frame.
    pub(crate) fn reconfigure(
        &self,
        resolution: &CameraResolution,
        left_stats: Arc<FrameStats>,
        right_stats: Arc<FrameStats>,
        mirror: bool,
    ) {
        self.left.reset(resolution, left_stats);
        self.right.reset(resolution, right_stats);
        self.mirror.store(mirror, Ordering::Relaxed);
    }
}

impl FrameSink for FramePair {
    fn on_frame(&self, eye: Eye, data: &[u8], _width: u32, _height: u32) {
        self.eye(eye).write(data);
        if eye == Eye::Left && self.is_mirroring() {
            self.right.write(data);
        }
    }
}
