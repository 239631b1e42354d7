//! Traits for the frame producer and the output consumer around the tracker.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::debug;

use crate::error::Result;
use crate::integration::events::InteractionEvent;
use crate::integration::orchestrator::FrameOutput;

/// A frame and its position in the stream.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }
}

/// Producer of frames.
///
/// Implement this trait to feed the tracker from a camera, a video decoder or
/// a network stream.
///
/// # Example
///
/// ```ignore
/// use usv_tracker::FrameSource;
///
/// struct Camera {
///     // Device handle here
/// }
///
/// impl FrameSource for Camera {
///     type Error = std::io::Error;
///
///     fn next_frame(&mut self) -> Result<Option<image::RgbImage>, Self::Error> {
///         // Grab the next frame, or `None` at end of stream
///         Ok(None)
///     }
/// }
/// ```
pub trait FrameSource {
    /// Error type for acquisition failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> std::result::Result<Option<RgbImage>, Self::Error>;
}

/// Consumer of per-frame output, typically a renderer or recorder.
///
/// The sink also reports the interaction events that happened while it handled
/// the output; they are applied before the next frame.
pub trait FrameSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn consume(
        &mut self,
        output: &FrameOutput,
    ) -> std::result::Result<Vec<InteractionEvent>, Self::Error>;
}

/// Image files of a directory, read in lexical file name order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: std::vec::IntoIter<PathBuf>,
}

impl ImageSequenceSource {
    const EXTENSIONS: [&'static str; 4] = ["png", "jpg", "jpeg", "bmp"];

    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() && Self::is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        debug!(dir = %dir.as_ref().display(), frames = paths.len(), "image sequence opened");
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            paths: paths.into_iter(),
        }
    }

    /// Frames not read yet.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                Self::EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }
}

impl FrameSource for ImageSequenceSource {
    type Error = image::ImageError;

    fn next_frame(&mut self) -> std::result::Result<Option<RgbImage>, Self::Error> {
        match self.paths.next() {
            Some(path) => Ok(Some(image::open(&path)?.to_rgb8())),
            None => Ok(None),
        }
    }
}

/// Frames taken from any iterator of images.
#[derive(Debug, Clone)]
pub struct IterFrameSource<I> {
    frames: I,
}

impl<I: Iterator<Item = RgbImage>> IterFrameSource<I> {
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl<I: Iterator<Item = RgbImage>> FrameSource for IterFrameSource<I> {
    type Error = Infallible;

    fn next_frame(&mut self) -> std::result::Result<Option<RgbImage>, Self::Error> {
        Ok(self.frames.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_source_ends() {
        let mut source = IterFrameSource::new(vec![RgbImage::new(4, 4), RgbImage::new(2, 2)]);
        assert_eq!(source.next_frame().unwrap().unwrap().dimensions(), (4, 4));
        assert_eq!(source.next_frame().unwrap().unwrap().dimensions(), (2, 2));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_sequence_reads_in_lexical_order() {
        let dir = std::env::temp_dir().join(format!("usv-tracker-seq-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        RgbImage::new(3, 1).save(dir.join("frame_002.png")).unwrap();
        RgbImage::new(1, 1).save(dir.join("frame_001.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(&dir).unwrap();
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_frame().unwrap().unwrap().dimensions(), (1, 1));
        assert_eq!(source.next_frame().unwrap().unwrap().dimensions(), (3, 1));
        assert!(source.next_frame().unwrap().is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
