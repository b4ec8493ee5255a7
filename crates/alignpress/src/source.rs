//! Frame sources: ordered grayscale frames with ids and timestamps.

use std::path::{Path, PathBuf};

use alignpress_core::{GrayImage, GrayImageView};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("dataset not found: {0}")]
    NotFound(PathBuf),
    #[error("no supported images in {0}")]
    Empty(PathBuf),
    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },
}

/// One frame in presentation order.
#[derive(Clone, Debug)]
pub struct FramePacket {
    pub frame_id: String,
    /// Seconds since the start of the sequence.
    pub timestamp: f64,
    pub image: GrayImage,
}

impl FramePacket {
    pub fn view(&self) -> GrayImageView<'_> {
        self.image.view()
    }
}

/// Anything yielding frames in order. Restart by building a new source.
pub trait FrameSource: Iterator<Item = Result<FramePacket, SourceError>> {}

impl<T: Iterator<Item = Result<FramePacket, SourceError>>> FrameSource for T {}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Convert an `image` buffer into the core grayscale type.
pub fn from_luma(img: ::image::GrayImage) -> GrayImage {
    GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.into_raw(),
    }
}

/// Decode any supported image file as 8-bit grayscale.
pub fn load_gray(path: &Path) -> Result<GrayImage, SourceError> {
    let decoded = ::image::open(path).map_err(|source| SourceError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(from_luma(decoded.to_luma8()))
}

/// Images from a directory (sorted by file name) or a single image file.
///
/// `frame_id` is the file name and `timestamp` is `index / fps` (or the
/// index itself when `fps <= 0`). With `looping`, the sequence repeats and
/// the index keeps counting.
#[derive(Debug)]
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    fps: f64,
    looping: bool,
    cursor: usize,
    index: usize,
}

impl ImageSequenceSource {
    pub fn open(path: impl AsRef<Path>, fps: f64, looping: bool) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        let files = if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            files.sort();
            if files.is_empty() {
                return Err(SourceError::Empty(path.to_path_buf()));
            }
            files
        } else if is_image(path) {
            vec![path.to_path_buf()]
        } else {
            return Err(SourceError::Unsupported(path.to_path_buf()));
        };
        log::info!("frame source: {} image(s) from {}", files.len(), path.display());
        Ok(Self {
            files,
            fps,
            looping,
            cursor: 0,
            index: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn timestamp(&self) -> f64 {
        if self.fps > 0.0 {
            self.index as f64 / self.fps
        } else {
            self.index as f64
        }
    }
}

impl Iterator for ImageSequenceSource {
    type Item = Result<FramePacket, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == self.files.len() {
            if !self.looping {
                return None;
            }
            self.cursor = 0;
        }
        let path = &self.files[self.cursor];
        let frame_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = self.timestamp();
        let packet = load_gray(path).map(|image| FramePacket {
            frame_id,
            timestamp,
            image,
        });
        self.cursor += 1;
        self.index += 1;
        Some(packet)
    }
}
