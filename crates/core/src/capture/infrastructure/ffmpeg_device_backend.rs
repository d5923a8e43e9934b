//! Live camera capture through libavdevice.
//!
//! Each platform exposes cameras through a different input format and
//! addresses them differently; a backend pairs the two.
use crate::capture::domain::capture_backend::CaptureBackend;
use crate::capture::domain::frame_grabber::FrameGrabber;
use crate::shared::frame::Frame;

use super::ffmpeg_stream::FfmpegStream;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeviceAddressing {
    /// `/dev/video{index}`
    DevicePath,
    /// The bare index, as a string.
    Index,
}

pub struct FfmpegDeviceBackend {
    format_name: &'static str,
    addressing: DeviceAddressing,
}

impl FfmpegDeviceBackend {
    pub fn video4linux2() -> Self {
        Self {
            format_name: "video4linux2",
            addressing: DeviceAddressing::DevicePath,
        }
    }

    pub fn avfoundation() -> Self {
        Self {
            format_name: "avfoundation",
            addressing: DeviceAddressing::Index,
        }
    }

    pub fn vfwcap() -> Self {
        Self {
            format_name: "vfwcap",
            addressing: DeviceAddressing::Index,
        }
    }

    /// Backends worth probing on the current platform, in preference order.
    pub fn platform_default() -> Vec<Self> {
        #[cfg(target_os = "linux")]
        {
            vec![Self::video4linux2()]
        }
        #[cfg(target_os = "macos")]
        {
            vec![Self::avfoundation()]
        }
        #[cfg(target_os = "windows")]
        {
            vec![Self::vfwcap()]
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            Vec::new()
        }
    }

    fn url(&self, index: u32) -> String {
        match self.addressing {
            DeviceAddressing::DevicePath => format!("/dev/video{index}"),
            DeviceAddressing::Index => index.to_string(),
        }
    }

    fn input_format(&self) -> Option<ffmpeg_next::format::format::Input> {
        ffmpeg_next::device::input::video()
            .find(|fmt| fmt.name().split(',').any(|n| n == self.format_name))
    }

    fn open_input(
        &self,
        index: u32,
    ) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();
        let fmt = self
            .input_format()
            .ok_or_else(|| format!("input format {} is not available", self.format_name))?;
        let url = self.url(index);
        let ctx = ffmpeg_next::format::open_with(
            &url,
            &ffmpeg_next::format::Format::Input(fmt),
            ffmpeg_next::Dictionary::new(),
        )?;
        Ok(ctx.input())
    }
}

impl CaptureBackend for FfmpegDeviceBackend {
    fn name(&self) -> &str {
        self.format_name
    }

    fn probe(&self, index: u32) -> bool {
        // The context is dropped before returning, closing the device.
        match self.open_input(index) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("{} device {} did not open: {}", self.format_name, index, e);
                false
            }
        }
    }

    fn open(&self, index: u32) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>> {
        let stream = FfmpegStream::new(self.open_input(index)?)?;
        log::info!("Opened camera {} via {}", self.url(index), self.format_name);
        Ok(Box::new(DeviceGrabber {
            stream: Some(stream),
        }))
    }
}

/// A live camera handle. Empty reads surface as `Ok(None)`.
struct DeviceGrabber {
    stream: Option<FfmpegStream>,
}

impl FrameGrabber for DeviceGrabber {
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_frame(),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.stream = None;
    }
}
