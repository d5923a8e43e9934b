//! Uniform frame acquisition over live cameras and fallback media.
//!
//! Discovery probes a bounded range of device indices on every backend.
//! When no camera opens the source degrades to a looping clip, then to a
//! repeated still image. Connection state changes only on initialization,
//! explicit reselection or release.
use std::fmt;
use std::ops::Range;

use crate::shared::connection_state::ConnectionState;
use crate::shared::error::SortingError;
use crate::shared::frame::Frame;

use super::domain::capture_backend::{BackendDescriptor, CaptureBackend};
use super::domain::fallback_opener::FallbackOpener;
use super::domain::frame_grabber::FrameGrabber;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceMode {
    Live(BackendDescriptor),
    Clip,
    Image,
    Closed,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Live(desc) => write!(f, "live {desc}"),
            SourceMode::Clip => write!(f, "looping clip"),
            SourceMode::Image => write!(f, "still image"),
            SourceMode::Closed => write!(f, "closed"),
        }
    }
}

pub struct FrameSource {
    backends: Vec<Box<dyn CaptureBackend>>,
    fallback: Box<dyn FallbackOpener>,
    probe_indices: Range<u32>,
    descriptors: Vec<BackendDescriptor>,
    active: Option<Box<dyn FrameGrabber>>,
    mode: SourceMode,
    state: ConnectionState,
    frames_served: usize,
}

impl FrameSource {
    /// Discovers cameras and opens the preferred one (or the first found),
    /// falling back to the clip and then the image.
    ///
    /// Fails only when none of the three levels can produce frames.
    pub fn initialize(
        backends: Vec<Box<dyn CaptureBackend>>,
        fallback: Box<dyn FallbackOpener>,
        probe_indices: Range<u32>,
        preferred_index: Option<u32>,
    ) -> Result<Self, SortingError> {
        let mut source = Self {
            backends,
            fallback,
            probe_indices,
            descriptors: Vec::new(),
            active: None,
            mode: SourceMode::Closed,
            state: ConnectionState::Disconnected,
            frames_served: 0,
        };

        let found = source.discover();
        log::info!("Discovered {} camera(s)", found.len());
        let choice = preferred_index
            .and_then(|i| found.iter().find(|d| d.index == i).cloned())
            .or_else(|| found.first().cloned());

        match choice {
            Some(desc) => {
                source.open(&desc);
            }
            None => {
                source.open_fallback();
            }
        }

        if source.active.is_none() {
            return Err(SortingError::HardwareUnavailable(
                "no camera, fallback clip or fallback image could be opened".to_string(),
            ));
        }
        Ok(source)
    }

    /// Probes every backend over the configured index range. Probes never
    /// leave a handle open.
    pub fn discover(&mut self) -> Vec<BackendDescriptor> {
        let mut found = Vec::new();
        for backend in &self.backends {
            for index in self.probe_indices.clone() {
                if backend.probe(index) {
                    found.push(backend.describe(index));
                }
            }
        }
        self.descriptors = found.clone();
        found
    }

    /// Replaces the current input with `descriptor`; on failure the
    /// fallback chain takes over and `Disconnected` is reported.
    pub fn open(&mut self, descriptor: &BackendDescriptor) -> ConnectionState {
        self.close_active();

        let opened: Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>> = self
            .backends
            .iter()
            .find(|b| b.name() == descriptor.backend)
            .ok_or_else(|| format!("unknown capture backend {}", descriptor.backend).into())
            .and_then(|b| b.open(descriptor.index));

        match opened {
            Ok(grabber) => {
                log::info!("Camera connected: {descriptor}");
                self.active = Some(grabber);
                self.mode = SourceMode::Live(descriptor.clone());
                self.state = ConnectionState::Connected;
            }
            Err(e) => {
                log::warn!("Failed to open {descriptor}: {e}");
                self.open_fallback();
            }
        }
        self.state
    }

    /// Switches to the `position`-th discovered camera.
    pub fn select(&mut self, position: usize) -> Result<ConnectionState, SortingError> {
        let desc = self.descriptors.get(position).cloned().ok_or_else(|| {
            SortingError::HardwareUnavailable(format!(
                "camera {position} not found ({} available)",
                self.descriptors.len()
            ))
        })?;
        Ok(self.open(&desc))
    }

    /// Next frame from whatever is active.
    ///
    /// A live empty read yields `None`. The clip rewinds and retries once on
    /// end of stream, so it only yields `None` if the file itself fails.
    pub fn next_frame(&mut self) -> Option<Frame> {
        let grabber = self.active.as_mut()?;
        let looping = self.mode == SourceMode::Clip;

        let frame = match grabber.grab() {
            Ok(Some(frame)) => Some(frame),
            Ok(None) if looping => rewind_and_grab(&mut **grabber),
            Ok(None) => None,
            Err(e) if looping => {
                log::warn!("Fallback clip read failed ({e}), rewinding");
                rewind_and_grab(&mut **grabber)
            }
            Err(e) => {
                log::warn!("Frame read failed: {e}");
                None
            }
        };

        frame.map(|f| {
            let index = self.frames_served;
            self.frames_served += 1;
            f.with_index(index)
        })
    }

    /// Closes the active input. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.active.is_some() {
            log::info!("Releasing frame source ({})", self.mode);
        }
        self.close_active();
        self.state = ConnectionState::Disconnected;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn available(&self) -> &[BackendDescriptor] {
        &self.descriptors
    }

    pub fn mode(&self) -> &SourceMode {
        &self.mode
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    fn close_active(&mut self) {
        if let Some(mut grabber) = self.active.take() {
            grabber.release();
        }
        self.mode = SourceMode::Closed;
    }

    /// Clip first, then image. Leaves the source closed if neither opens.
    fn open_fallback(&mut self) -> bool {
        self.close_active();
        self.state = ConnectionState::Disconnected;

        match self.fallback.open_clip() {
            Ok(grabber) => {
                log::info!("Using fallback clip");
                self.active = Some(grabber);
                self.mode = SourceMode::Clip;
                return true;
            }
            Err(e) => log::warn!("Fallback clip unavailable: {e}"),
        }
        match self.fallback.open_image() {
            Ok(grabber) => {
                log::info!("Using fallback image");
                self.active = Some(grabber);
                self.mode = SourceMode::Image;
                true
            }
            Err(e) => {
                log::error!("Fallback image unavailable: {e}");
                false
            }
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close_active();
    }
}

fn rewind_and_grab(grabber: &mut dyn FrameGrabber) -> Option<Frame> {
    if let Err(e) = grabber.rewind() {
        log::error!("Fallback clip could not rewind: {e}");
        return None;
    }
    match grabber.grab() {
        Ok(frame) => frame,
        Err(e) => {
            log::error!("Fallback clip read failed after rewind: {e}");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) fn solid_frame(value: u8) -> Frame {
        Frame::new(vec![value; 4 * 4 * 3], 4, 4, 3, 0)
    }

    /// Finite clip of `len` frames.
    struct StubClip {
        len: usize,
        pos: usize,
        rewinds: Arc<AtomicUsize>,
    }

    impl FrameGrabber for StubClip {
        fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.pos >= self.len {
                return Ok(None);
            }
            self.pos += 1;
            Ok(Some(solid_frame(self.pos as u8)))
        }

        fn rewind(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.pos = 0;
            self.rewinds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Repeating(u8);

    impl FrameGrabber for Repeating {
        fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            Ok(Some(solid_frame(self.0)))
        }
    }

    /// Live camera that returns a fixed number of frames, then empty reads.
    struct StubCamera {
        remaining: usize,
        released: Arc<AtomicUsize>,
    }

    impl FrameGrabber for StubCamera {
        fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(solid_frame(200)))
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(crate) struct StubBackend {
        pub(crate) present: HashSet<u32>,
        pub(crate) broken: HashSet<u32>,
        pub(crate) released: Arc<AtomicUsize>,
    }

    impl StubBackend {
        pub(crate) fn with_devices(indices: &[u32]) -> Self {
            Self {
                present: indices.iter().copied().collect(),
                broken: HashSet::new(),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CaptureBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        fn probe(&self, index: u32) -> bool {
            self.present.contains(&index)
        }

        fn open(&self, index: u32) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>> {
            if !self.present.contains(&index) || self.broken.contains(&index) {
                return Err(format!("device {index} busy").into());
            }
            Ok(Box::new(StubCamera {
                remaining: 2,
                released: self.released.clone(),
            }))
        }
    }

    pub(crate) struct StubFallback {
        pub(crate) clip_len: Option<usize>,
        pub(crate) image: bool,
        pub(crate) rewinds: Arc<AtomicUsize>,
    }

    impl StubFallback {
        pub(crate) fn clip(len: usize) -> Self {
            Self {
                clip_len: Some(len),
                image: true,
                rewinds: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn none() -> Self {
            Self {
                clip_len: None,
                image: false,
                rewinds: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FallbackOpener for StubFallback {
        fn open_clip(&self) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>> {
            match self.clip_len {
                Some(len) => Ok(Box::new(StubClip {
                    len,
                    pos: 0,
                    rewinds: self.rewinds.clone(),
                })),
                None => Err("clip missing".into()),
            }
        }

        fn open_image(&self) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>> {
            if self.image {
                Ok(Box::new(Repeating(77)))
            } else {
                Err("image missing".into())
            }
        }
    }

    #[test]
    fn test_clip_loops_past_its_length() {
        let fallback = StubFallback::clip(3);
        let rewinds = fallback.rewinds.clone();
        let mut source =
            FrameSource::initialize(vec![], Box::new(fallback), 0..10, None).unwrap();

        assert_eq!(source.mode(), &SourceMode::Clip);
        assert_eq!(source.connection_state(), ConnectionState::Disconnected);
        for i in 0..10 {
            let frame = source.next_frame().expect("clip must wrap");
            assert_eq!(frame.index(), i);
        }
        assert_eq!(rewinds.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_image_used_when_clip_missing() {
        let fallback = StubFallback {
            clip_len: None,
            image: true,
            rewinds: Arc::new(AtomicUsize::new(0)),
        };
        let mut source =
            FrameSource::initialize(vec![], Box::new(fallback), 0..10, None).unwrap();
        assert_eq!(source.mode(), &SourceMode::Image);
        for _ in 0..5 {
            assert_eq!(source.next_frame().unwrap().data()[0], 77);
        }
    }

    #[test]
    fn test_nothing_available_is_hardware_unavailable() {
        let result = FrameSource::initialize(vec![], Box::new(StubFallback::none()), 0..10, None);
        assert!(matches!(result, Err(SortingError::HardwareUnavailable(_))));
    }

    #[test]
    fn test_discovery_prefers_requested_index() {
        let backend = StubBackend::with_devices(&[0, 2, 4]);
        let mut source = FrameSource::initialize(
            vec![Box::new(backend)],
            Box::new(StubFallback::none()),
            0..10,
            Some(2),
        )
        .unwrap();

        assert_eq!(source.available().len(), 3);
        assert_eq!(source.connection_state(), ConnectionState::Connected);
        match source.mode() {
            SourceMode::Live(desc) => assert_eq!(desc.index, 2),
            other => panic!("expected live source, got {other}"),
        }
        assert!(source.next_frame().is_some());
    }

    #[test]
    fn test_probe_range_is_bounded() {
        let backend = StubBackend::with_devices(&[1, 12]);
        let source = FrameSource::initialize(
            vec![Box::new(backend)],
            Box::new(StubFallback::none()),
            0..10,
            None,
        )
        .unwrap();
        let indices: Vec<u32> = source.available().iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![1]);
    }

    #[test]
    fn test_live_empty_read_returns_none_without_fallback() {
        let backend = StubBackend::with_devices(&[0]);
        let mut source = FrameSource::initialize(
            vec![Box::new(backend)],
            Box::new(StubFallback::clip(3)),
            0..10,
            None,
        )
        .unwrap();

        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_none());
        assert_eq!(source.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_broken_camera_falls_back_to_clip() {
        let mut backend = StubBackend::with_devices(&[0]);
        backend.broken.insert(0);
        let mut source = FrameSource::initialize(
            vec![Box::new(backend)],
            Box::new(StubFallback::clip(2)),
            0..10,
            None,
        )
        .unwrap();
        assert_eq!(source.mode(), &SourceMode::Clip);
        assert_eq!(source.connection_state(), ConnectionState::Disconnected);
        assert!(source.next_frame().is_some());
    }

    #[test]
    fn test_select_switches_and_releases_previous() {
        let backend = StubBackend::with_devices(&[0, 1]);
        let released = backend.released.clone();
        let mut source = FrameSource::initialize(
            vec![Box::new(backend)],
            Box::new(StubFallback::none()),
            0..10,
            None,
        )
        .unwrap();

        assert_eq!(source.select(1).unwrap(), ConnectionState::Connected);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        match source.mode() {
            SourceMode::Live(desc) => assert_eq!(desc.index, 1),
            other => panic!("expected live source, got {other}"),
        }
        assert!(source.select(5).is_err());
    }

    #[test]
    fn test_release_is_idempotent() {
        let backend = StubBackend::with_devices(&[0]);
        let released = backend.released.clone();
        let mut source = FrameSource::initialize(
            vec![Box::new(backend)],
            Box::new(StubFallback::none()),
            0..10,
            None,
        )
        .unwrap();

        source.release();
        source.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(!source.is_open());
        assert!(source.next_frame().is_none());
        assert_eq!(source.connection_state(), ConnectionState::Disconnected);
    }
}
