pub mod errors;

pub const VALID_IMAGE_EXTENSIONS: &'static [&'static str] = &[
    "jpg", "jpeg", "jfif", "jpe", "png", "tif", "tiff", "webp", "bmp",
];

pub const VALID_VIDEO_EXTENSIONS: &'static [&'static str] = &[
    "mp4", "webm", "mkv", "mov", "avi", "flv", "wmv", "mpeg",
];

/// Name of the driver script generated into each request's input directory.
pub const DRIVER_SCRIPT_NAME: &str = "threat_detection.py";

/// Prefix of every annotated artifact the detector writes.
pub const DETECTED_PREFIX: &str = "detected_";

use std::num::NonZeroUsize;
use std::sync::LazyLock;

use tokio::runtime::{Builder, Runtime};

pub static CURRENT_NUM_THREADS: LazyLock<usize> = LazyLock::new(|| {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
});

// Rocket-specific Tokio Runtime
// Request handling and detector child processes both live here.
pub static ROCKET_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(*CURRENT_NUM_THREADS)
        .thread_name("rocket-io-worker")
        .enable_all()
        .build()
        .expect("Failed to build Rocket Tokio runtime")
});
