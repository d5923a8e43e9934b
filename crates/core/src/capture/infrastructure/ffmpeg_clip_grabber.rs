use std::path::{Path, PathBuf};

use crate::capture::domain::frame_grabber::FrameGrabber;
use crate::shared::frame::Frame;

use super::ffmpeg_stream::FfmpegStream;

/// Plays a pre-recorded clip. Rewinding reopens the demuxer, which also
/// works for containers without a seek index.
pub struct FfmpegClipGrabber {
    path: PathBuf,
    stream: Option<FfmpegStream>,
}

impl FfmpegClipGrabber {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut grabber = Self {
            path: path.to_path_buf(),
            stream: None,
        };
        grabber.rewind()?;
        log::info!("Opened fallback clip {}", path.display());
        Ok(grabber)
    }
}

impl FrameGrabber for FfmpegClipGrabber {
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_frame(),
            None => Err(format!("clip {} is released", self.path.display()).into()),
        }
    }

    fn rewind(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.stream = None;
        let ictx = ffmpeg_next::format::input(&self.path)?;
        self.stream = Some(FfmpegStream::new(ictx)?);
        Ok(())
    }

    fn release(&mut self) {
        self.stream = None;
    }
}
