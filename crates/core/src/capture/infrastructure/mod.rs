pub mod ffmpeg_clip_grabber;
pub mod ffmpeg_device_backend;
pub mod ffmpeg_stream;
pub mod media_fallback;
pub mod still_image_grabber;
