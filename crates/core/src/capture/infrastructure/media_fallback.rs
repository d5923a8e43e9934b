use std::path::PathBuf;

use crate::capture::domain::fallback_opener::FallbackOpener;
use crate::capture::domain::frame_grabber::FrameGrabber;
use crate::shared::config::CameraConfig;

use super::ffmpeg_clip_grabber::FfmpegClipGrabber;
use super::still_image_grabber::StillImageGrabber;

/// Fallback media read from files on disk.
pub struct MediaFileFallback {
    clip: Option<PathBuf>,
    image: Option<PathBuf>,
}

impl MediaFileFallback {
    pub fn new(clip: Option<PathBuf>, image: Option<PathBuf>) -> Self {
        Self { clip, image }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.fallback_clip.clone(), config.fallback_image.clone())
    }
}

impl FallbackOpener for MediaFileFallback {
    fn open_clip(&self) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>> {
        let path = self.clip.as_ref().ok_or("no fallback clip configured")?;
        Ok(Box::new(FfmpegClipGrabber::open(path)?))
    }

    fn open_image(&self) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>> {
        let path = self.image.as_ref().ok_or("no fallback image configured")?;
        Ok(Box::new(StillImageGrabber::open(path)?))
    }
}
