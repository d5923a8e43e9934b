use crate::shared::frame::Frame;

/// Decodes the best video stream of an opened ffmpeg input to RGB24.
///
/// Shared by live devices and clip files. The scaler is built from the
/// first decoded frame, since device inputs may only report their pixel
/// format once data flows.
pub struct FfmpegStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegStream is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegStream {}

impl FfmpegStream {
    pub fn new(
        ictx: ffmpeg_next::format::context::Input,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        Ok(Self {
            ictx,
            decoder,
            scaler: None,
            video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    /// Decodes the next frame; `Ok(None)` once the input is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }
        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }
        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                let frame = self.try_receive()?;
                if frame.is_none() {
                    self.done = true;
                }
                return Ok(frame);
            };

            if stream.index() != self.video_stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let width = decoded.width();
        let height = decoded.height();
        let stale = self
            .scaler
            .as_ref()
            .map(|s| s.input().width != width || s.input().height != height)
            .unwrap_or(true);
        if stale {
            self.scaler = Some(ffmpeg_next::software::scaling::Context::get(
                decoded.format(),
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?);
        }
        let scaler = self.scaler.as_mut().ok_or("scaler unavailable")?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        let frame = Frame::new(pixels, width, height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

/// Copies RGB24 rows out of a possibly padded ffmpeg frame.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
