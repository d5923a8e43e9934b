use std::path::Path;

use crate::capture::domain::frame_grabber::FrameGrabber;
use crate::shared::frame::Frame;

/// Repeats one decoded image forever.
pub struct StillImageGrabber {
    frame: Option<Frame>,
    served: usize,
}

impl StillImageGrabber {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        let (width, height) = img.dimensions();
        log::info!("Opened fallback image {} ({}x{})", path.display(), width, height);
        Ok(Self::from_frame(Frame::new(img.into_raw(), width, height, 3, 0)))
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self {
            frame: Some(frame),
            served: 0,
        }
    }
}

impl FrameGrabber for StillImageGrabber {
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(frame) = self.frame.as_ref() else {
            return Err("still image is released".into());
        };
        let copy = frame.clone().with_index(self.served);
        self.served += 1;
        Ok(Some(copy))
    }

    fn rewind(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.served = 0;
        Ok(())
    }

    fn release(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_png_repeats_forever() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        image::RgbImage::from_pixel(6, 4, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let mut grabber = StillImageGrabber::open(&path).unwrap();
        for i in 0..5 {
            let frame = grabber.grab().unwrap().unwrap();
            assert_eq!(frame.width(), 6);
            assert_eq!(frame.height(), 4);
            assert_eq!(frame.index(), i);
            assert_eq!(&frame.data()[..3], &[10, 20, 30]);
        }
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StillImageGrabber::open(&dir.path().join("absent.jpg")).is_err());
    }

    #[test]
    fn test_released_grabber_errors() {
        let mut grabber = StillImageGrabber::from_frame(Frame::new(vec![0; 3], 1, 1, 3, 0));
        grabber.release();
        grabber.release();
        assert!(grabber.grab().is_err());
    }
}
