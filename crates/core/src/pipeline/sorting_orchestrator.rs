//! Drives one perception-to-actuation pass per tick and owns the run state.
//!
//! Every stage failure is recovered at tick granularity: the loop keeps
//! going and the troubleshooting indicator carries the latest problem.
use std::collections::HashSet;
use std::time::Instant;

use crate::actuation::actuator_controller::SharedActuator;
use crate::capture::domain::capture_backend::BackendDescriptor;
use crate::capture::frame_source::FrameSource;
use crate::color::domain::color_classifier::ColorClassifier;
use crate::color::domain::color_label::ColorLabel;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::material_detector::MaterialDetector;
use crate::routing::bin_router::SortDecision;
use crate::shared::connection_state::ConnectionState;
use crate::shared::error::SortingError;
use crate::shared::frame::Frame;
use crate::tracking::domain::track::Track;
use crate::tracking::identity_tracker::IdentityTracker;

use super::display_overlay::annotate;
use super::pipeline_logger::PipelineLogger;
use super::run_state::RunState;
use super::sorter_status::{
    arm_text, camera_text, SorterStatus, STATUS_CAMERA_NOT_INITIALIZED,
    STATUS_DETECTOR_NOT_INITIALIZED, STATUS_IDLE, STATUS_NO_FRAME, STATUS_RUNNING,
    STATUS_STOPPED,
};

/// What a single tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub frame_available: bool,
    pub detections: usize,
    pub confirmed_tracks: usize,
    pub sorted: Vec<SortDecision>,
}

pub struct SortingOrchestrator {
    source: Result<FrameSource, String>,
    detector: Option<Box<dyn MaterialDetector>>,
    tracker: IdentityTracker,
    classifier: Box<dyn ColorClassifier>,
    actuator: SharedActuator,
    logger: Box<dyn PipelineLogger>,
    confidence_threshold: f64,
    run_state: RunState,
    status_line: String,
    troubleshooting: String,
    display: Option<Frame>,
    latest_tracks: Vec<Track>,
    sorted_ids: HashSet<u32>,
    pending_unrecognized: Option<Frame>,
    ticks: usize,
}

impl SortingOrchestrator {
    pub fn new(
        source: Result<FrameSource, SortingError>,
        detector: Option<Box<dyn MaterialDetector>>,
        tracker: IdentityTracker,
        classifier: Box<dyn ColorClassifier>,
        actuator: SharedActuator,
        logger: Box<dyn PipelineLogger>,
        confidence_threshold: f64,
    ) -> Self {
        let source = source.map_err(|e| e.to_string());
        let status_line = match (&source, &detector) {
            (Err(_), _) => STATUS_CAMERA_NOT_INITIALIZED,
            (_, None) => STATUS_DETECTOR_NOT_INITIALIZED,
            _ => STATUS_IDLE,
        };
        Self {
            source,
            detector,
            tracker,
            classifier,
            actuator,
            logger,
            confidence_threshold,
            run_state: RunState::Idle,
            status_line: status_line.to_string(),
            troubleshooting: String::new(),
            display: None,
            latest_tracks: Vec::new(),
            sorted_ids: HashSet::new(),
            pending_unrecognized: None,
            ticks: 0,
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Idle → Sorting. Rejected (state unchanged) without a frame source or
    /// detector, and always once stopped.
    pub fn start(&mut self) -> Result<(), SortingError> {
        match self.run_state {
            RunState::Stopped => return Err(invalid("start", RunState::Stopped)),
            RunState::Sorting => return Ok(()),
            RunState::Idle => {}
        }
        if !matches!(&self.source, Ok(source) if source.is_open()) {
            self.status_line = STATUS_CAMERA_NOT_INITIALIZED.to_string();
            return Err(SortingError::HardwareUnavailable(
                "camera not initialized".to_string(),
            ));
        }
        if self.detector.is_none() {
            self.status_line = STATUS_DETECTOR_NOT_INITIALIZED.to_string();
            return Err(SortingError::DetectionFailure(
                "detector not initialized".to_string(),
            ));
        }

        self.run_state = RunState::Sorting;
        self.status_line = STATUS_RUNNING.to_string();
        self.logger.info("Sorting started");
        Ok(())
    }

    /// Sorting → Idle. The current tick, if any, has already finished.
    pub fn stop(&mut self) -> Result<(), SortingError> {
        match self.run_state {
            RunState::Stopped => Err(invalid("stop", RunState::Stopped)),
            RunState::Idle => Ok(()),
            RunState::Sorting => {
                self.run_state = RunState::Idle;
                self.status_line = STATUS_IDLE.to_string();
                self.logger.info("Sorting stopped");
                Ok(())
            }
        }
    }

    /// Terminal transition: releases the camera and closes the arm.
    pub fn shutdown(&mut self) {
        if self.run_state == RunState::Stopped {
            return;
        }
        self.run_state = RunState::Stopped;
        self.status_line = STATUS_STOPPED.to_string();
        if let Ok(source) = self.source.as_mut() {
            source.release();
        }
        self.actuator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .close();
        self.logger.info("Sorter shut down");
        self.logger.summary();
    }

    /// One scheduler tick: Idle refreshes the display, Sorting runs the
    /// full pipeline.
    pub fn tick(&mut self) -> TickReport {
        if self.run_state == RunState::Stopped {
            return TickReport::default();
        }
        self.logger.tick(self.ticks);
        self.ticks += 1;

        let started = Instant::now();
        let frame = match self.source.as_mut() {
            Ok(source) => source.next_frame(),
            Err(_) => {
                self.status_line = STATUS_CAMERA_NOT_INITIALIZED.to_string();
                return TickReport::default();
            }
        };
        self.logger.timing("capture", elapsed_ms(started));

        let Some(frame) = frame else {
            self.status_line = STATUS_NO_FRAME.to_string();
            return TickReport::default();
        };

        match self.run_state {
            RunState::Sorting => {
                self.status_line = STATUS_RUNNING.to_string();
                self.run_pipeline(frame)
            }
            _ => {
                if self.status_line == STATUS_NO_FRAME {
                    self.status_line = STATUS_IDLE.to_string();
                }
                self.display = Some(frame);
                TickReport {
                    frame_available: true,
                    ..TickReport::default()
                }
            }
        }
    }

    fn run_pipeline(&mut self, frame: Frame) -> TickReport {
        let mut report = TickReport {
            frame_available: true,
            ..TickReport::default()
        };

        let Some(detections) = self.detect(&frame) else {
            self.display = Some(frame);
            return report;
        };
        report.detections = detections.len();

        let started = Instant::now();
        let tracks = match self.tracker.update(&detections, &frame) {
            Ok(tracks) => tracks,
            Err(e) => {
                log::warn!("{e}");
                self.troubleshooting = format!("Tracking failed ({e})");
                self.display = Some(self.annotated(frame));
                return report;
            }
        };
        self.logger.timing("track", elapsed_ms(started));
        self.sorted_ids.retain(|id| self.tracker.is_alive(*id));
        report.confirmed_tracks = tracks.len();
        self.logger.metric("confirmed_tracks", tracks.len() as f64);

        self.troubleshooting = if detections.is_empty() {
            "No objects detected".to_string()
        } else if tracks.is_empty() {
            "No objects detected after tracking".to_string()
        } else {
            format!("Detected {} objects", tracks.len())
        };
        self.latest_tracks = tracks;

        let mut ready: Vec<Track> = self
            .latest_tracks
            .iter()
            .filter(|t| t.is_fresh() && !self.sorted_ids.contains(&t.track_id))
            .cloned()
            .collect();
        ready.sort_by_key(|t| t.track_id);
        for track in ready {
            if let Some(decision) = self.sort_track(&track, &frame) {
                self.sorted_ids.insert(track.track_id);
                report.sorted.push(decision);
            }
        }

        self.display = Some(self.annotated(frame));
        report
    }

    /// Runs the detector and applies the confidence cut. `None` means this
    /// tick's detections are discarded.
    fn detect(&mut self, frame: &Frame) -> Option<Vec<Detection>> {
        let detector = self.detector.as_mut()?;
        let started = Instant::now();
        let raw = match detector.detect(frame) {
            Ok(raw) => raw,
            Err(e) => {
                let err = SortingError::DetectionFailure(e.to_string());
                log::warn!("{err}");
                self.troubleshooting = format!("Invalid detection result ({e})");
                return None;
            }
        };
        self.logger.timing("detect", elapsed_ms(started));

        if let Some(reason) = raw.iter().find_map(|d| d.validate().err()) {
            log::warn!("Discarding detections for this tick: {reason}");
            self.troubleshooting = format!("Invalid detection result ({reason})");
            return None;
        }

        let (accepted, rejected): (Vec<Detection>, Vec<Detection>) = raw
            .into_iter()
            .partition(|d| d.confidence >= self.confidence_threshold);
        self.logger.metric("detections", accepted.len() as f64);

        if detector.supports_label_capture() {
            let best_rejected = rejected.iter().max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            if let Some(candidate) = best_rejected {
                let crop = frame.crop(&candidate.bbox);
                if !crop.is_empty() {
                    log::info!(
                        "Unrecognized object pending label (best guess {} at {:.2})",
                        candidate.class_label,
                        candidate.confidence
                    );
                    self.pending_unrecognized = Some(crop);
                }
            }
        }
        Some(accepted)
    }

    fn sort_track(&mut self, track: &Track, frame: &Frame) -> Option<SortDecision> {
        let started = Instant::now();
        let region = frame.crop(&track.bbox);
        let color = if region.is_empty() {
            let err = SortingError::EmptyRegion {
                track_id: track.track_id,
            };
            log::debug!("{err}");
            ColorLabel::Unknown
        } else {
            self.classifier.classify(&region)
        };
        self.logger.timing("classify", elapsed_ms(started));

        let (cx, cy) = track.bbox.center();
        let started = Instant::now();
        let result = self
            .actuator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pick_and_deposit(cx, cy, &track.class_label, color);
        self.logger.timing("actuate", elapsed_ms(started));

        match result {
            Ok(decision) => {
                log::info!(
                    "Track {}: {} {} at ({}, {}) -> bin {}",
                    track.track_id,
                    decision.class_label,
                    decision.color,
                    cx,
                    cy,
                    decision.bin
                );
                Some(decision)
            }
            Err(e) => {
                log::warn!("Track {}: {e}", track.track_id);
                self.troubleshooting = format!("Actuation failed ({e})");
                None
            }
        }
    }

    fn annotated(&self, mut frame: Frame) -> Frame {
        annotate(&mut frame, &self.latest_tracks);
        frame
    }

    /// Switches to another discovered camera.
    pub fn select_camera(&mut self, position: usize) -> Result<ConnectionState, SortingError> {
        if self.run_state == RunState::Stopped {
            return Err(invalid("select a camera", RunState::Stopped));
        }
        let source = self
            .source
            .as_mut()
            .map_err(|e| SortingError::HardwareUnavailable(e.clone()))?;
        source.select(position)
    }

    pub fn cameras(&self) -> Vec<BackendDescriptor> {
        match &self.source {
            Ok(source) => source.available().to_vec(),
            Err(_) => Vec::new(),
        }
    }

    /// Moves the arm by hand. Only allowed while idle.
    pub fn jog(&mut self, x: i32, y: i32, z: i32) -> Result<(), SortingError> {
        if self.run_state != RunState::Idle {
            return Err(invalid("jog the arm", self.run_state));
        }
        self.actuator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .move_to(x, y, z)
    }

    /// Hands the pending unrecognized crop and its label to the detector.
    pub fn capture_label(&mut self, label: &str) -> Result<(), SortingError> {
        let detector = self
            .detector
            .as_mut()
            .filter(|d| d.supports_label_capture())
            .ok_or_else(|| {
                SortingError::DetectionFailure("detector does not accept labels".to_string())
            })?;
        let region = self.pending_unrecognized.take().ok_or_else(|| {
            SortingError::DetectionFailure("no unrecognized object pending".to_string())
        })?;
        detector
            .capture_label(&region, label)
            .map_err(|e| SortingError::DetectionFailure(e.to_string()))?;
        self.logger.info(&format!("Captured label '{label}'"));
        Ok(())
    }

    pub fn has_pending_label(&self) -> bool {
        self.pending_unrecognized.is_some()
    }

    pub fn status(&self) -> SorterStatus {
        let camera = match &self.source {
            Ok(source) => camera_text(Ok(source.connection_state())),
            Err(e) => camera_text(Err(e.as_str())),
        };
        let arm = self
            .actuator
            .lock()
            .map(|a| a.connection_state())
            .unwrap_or(ConnectionState::Disconnected);
        SorterStatus {
            run_state: self.run_state,
            camera,
            arm: arm_text(arm),
            status: self.status_line.clone(),
            troubleshooting: self.troubleshooting.clone(),
        }
    }

    /// Latest frame for display, annotated while sorting.
    pub fn display_frame(&self) -> Option<&Frame> {
        self.display.as_ref()
    }

    pub fn latest_tracks(&self) -> &[Track] {
        &self.latest_tracks
    }
}

fn invalid(action: &str, state: RunState) -> SortingError {
    SortingError::InvalidTransition {
        action: action.to_string(),
        state: state.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
