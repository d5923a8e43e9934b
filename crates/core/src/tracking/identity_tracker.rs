/// Multi-object identity tracker.
///
/// Detections are associated to existing tracks by greedy highest-score
/// matching over a pluggable similarity. Tracks start tentative and are
/// exposed only once confirmed; a confirmed track survives up to `max_age`
/// consecutive misses. Identities are never reused.
use std::collections::HashSet;

use crate::detection::domain::detection::Detection;
use crate::shared::config::TrackerConfig;
use crate::shared::error::SortingError;
use crate::shared::frame::Frame;

use super::domain::similarity_scorer::SimilarityScorer;
use super::domain::track::Track;

#[derive(Clone, Debug)]
struct TrackState {
    track: Track,
    confirmed: bool,
    matched: bool,
}

pub struct IdentityTracker {
    tracks: Vec<TrackState>,
    next_id: u32,
    max_age: usize,
    min_hits: usize,
    match_threshold: f64,
    scorer: Box<dyn SimilarityScorer>,
}

impl IdentityTracker {
    pub fn new(
        scorer: Box<dyn SimilarityScorer>,
        max_age: usize,
        min_hits: usize,
        match_threshold: f64,
    ) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_age,
            min_hits: min_hits.max(1),
            match_threshold,
            scorer,
        }
    }

    pub fn from_config(scorer: Box<dyn SimilarityScorer>, config: &TrackerConfig) -> Self {
        Self::new(scorer, config.max_age, config.min_hits, config.match_threshold)
    }

    /// Advances one tick and returns every confirmed track.
    ///
    /// A scoring error leaves the tracker exactly as it was.
    pub fn update(
        &mut self,
        detections: &[Detection],
        frame: &Frame,
    ) -> Result<Vec<Track>, SortingError> {
        let pairs = self.score_pairs(detections, frame)?;

        for state in &mut self.tracks {
            state.matched = false;
        }
        let num_existing = self.tracks.len();
        let matched_dets = self.apply_matches(&greedy_match(pairs), detections);
        self.age_unmatched_tracks(num_existing);
        self.create_new_tracks(detections, &matched_dets);

        Ok(self.confirmed_tracks())
    }

    /// Whether `track_id` still has a live (tentative or confirmed) track.
    pub fn is_alive(&self, track_id: u32) -> bool {
        self.tracks.iter().any(|s| s.track.track_id == track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// All scores at or above the threshold, computed before any mutation.
    fn score_pairs(
        &mut self,
        detections: &[Detection],
        frame: &Frame,
    ) -> Result<Vec<(usize, usize, f64)>, SortingError> {
        let mut pairs = Vec::new();
        for (ti, state) in self.tracks.iter().enumerate() {
            for (di, det) in detections.iter().enumerate() {
                let score = self
                    .scorer
                    .score(&state.track.bbox, det, frame)
                    .map_err(|e| SortingError::TrackingFailure(e.to_string()))?;
                if !score.is_finite() {
                    return Err(SortingError::TrackingFailure(format!(
                        "non-finite similarity for track {}",
                        state.track.track_id
                    )));
                }
                if score >= self.match_threshold {
                    pairs.push((ti, di, score));
                }
            }
        }
        Ok(pairs)
    }

    fn apply_matches(
        &mut self,
        matches: &[(usize, usize)],
        detections: &[Detection],
    ) -> HashSet<usize> {
        let min_hits = self.min_hits;
        let mut matched_dets = HashSet::new();
        for &(ti, di) in matches {
            let det = &detections[di];
            let state = &mut self.tracks[ti];
            state.track.bbox = det.bbox;
            state.track.class_label = det.class_label.clone();
            state.track.hit_count += 1;
            state.track.miss_count = 0;
            state.matched = true;
            if state.track.hit_count >= min_hits {
                state.confirmed = true;
            }
            matched_dets.insert(di);
        }
        matched_dets
    }

    /// Confirmed tracks coast on a miss; tentative ones are dropped.
    fn age_unmatched_tracks(&mut self, num_existing: usize) {
        for state in self.tracks.iter_mut().take(num_existing) {
            if !state.matched {
                state.track.miss_count += 1;
                state.track.hit_count = 0;
            }
        }
        let max_age = self.max_age;
        self.tracks.retain(|s| {
            if s.matched {
                true
            } else {
                s.confirmed && s.track.miss_count <= max_age
            }
        });
    }

    fn create_new_tracks(&mut self, detections: &[Detection], matched: &HashSet<usize>) {
        for (di, det) in detections.iter().enumerate() {
            if matched.contains(&di) {
                continue;
            }
            self.tracks.push(TrackState {
                track: Track {
                    track_id: self.next_id,
                    class_label: det.class_label.clone(),
                    bbox: det.bbox,
                    hit_count: 1,
                    miss_count: 0,
                },
                confirmed: self.min_hits <= 1,
                matched: true,
            });
            self.next_id += 1;
        }
    }

    fn confirmed_tracks(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|s| s.confirmed)
            .map(|s| s.track.clone())
            .collect()
    }
}

/// Greedy matching: pairs sorted by descending score, each track and
/// detection used at most once.
fn greedy_match(mut pairs: Vec<(usize, usize, f64)>) -> Vec<(usize, usize)> {
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();
    for (ti, di, _) in pairs {
        if !used_tracks.contains(&ti) && !used_dets.contains(&di) {
            used_tracks.insert(ti);
            used_dets.insert(di);
            matches.push((ti, di));
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use crate::tracking::infrastructure::iou_scorer::IouScorer;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 200 * 200 * 3], 200, 200, 3, 0)
    }

    fn det(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection::new("PET", 0.9, BoundingBox::new(x1, y1, x2, y2))
    }

    fn tracker(max_age: usize, min_hits: usize) -> IdentityTracker {
        IdentityTracker::new(Box::new(IouScorer::new()), max_age, min_hits, 0.3)
    }

    struct FailingScorer;

    impl SimilarityScorer for FailingScorer {
        fn score(
            &mut self,
            _track_box: &BoundingBox,
            _detection: &Detection,
            _frame: &Frame,
        ) -> Result<f64, Box<dyn std::error::Error>> {
            Err("embedding backend offline".into())
        }
    }

    #[test]
    fn test_track_confirmed_after_min_hits() {
        let mut t = tracker(30, 3);
        let f = frame();
        assert!(t.update(&[det(10, 10, 60, 60)], &f).unwrap().is_empty());
        assert!(t.update(&[det(12, 10, 62, 60)], &f).unwrap().is_empty());
        let tracks = t.update(&[det(14, 10, 64, 60)], &f).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, 1);
        assert_eq!(tracks[0].hit_count, 3);
        assert_eq!(tracks[0].bbox, BoundingBox::new(14, 10, 64, 60));
    }

    #[test]
    fn test_identity_stable_across_ticks() {
        let mut t = tracker(30, 1);
        let f = frame();
        let first = t.update(&[det(10, 10, 60, 60), det(120, 120, 170, 170)], &f).unwrap();
        let second = t.update(&[det(122, 121, 172, 171), det(11, 11, 61, 61)], &f).unwrap();

        let id_of = |tracks: &[Track], x: i32| {
            tracks.iter().find(|tr| (tr.bbox.x1 - x).abs() < 5).unwrap().track_id
        };
        assert_eq!(id_of(&first, 10), id_of(&second, 11));
        assert_eq!(id_of(&first, 120), id_of(&second, 122));
    }

    #[test]
    fn test_confirmed_track_evicted_after_max_age() {
        let mut t = tracker(2, 1);
        let f = frame();
        t.update(&[det(10, 10, 60, 60)], &f).unwrap();

        // Misses 1 and 2 keep the track coasting.
        for expected_miss in 1..=2 {
            let tracks = t.update(&[], &f).unwrap();
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].miss_count, expected_miss);
            assert!(!tracks[0].is_fresh());
        }
        // Miss 3 exceeds max_age.
        assert!(t.update(&[], &f).unwrap().is_empty());
        assert!(!t.is_alive(1));
    }

    #[test]
    fn test_evicted_identity_is_not_reused() {
        let mut t = tracker(0, 1);
        let f = frame();
        t.update(&[det(10, 10, 60, 60)], &f).unwrap();
        t.update(&[], &f).unwrap();
        let tracks = t.update(&[det(10, 10, 60, 60)], &f).unwrap();
        assert_eq!(tracks[0].track_id, 2);
    }

    #[test]
    fn test_tentative_track_dropped_on_miss() {
        let mut t = tracker(30, 3);
        let f = frame();
        t.update(&[det(10, 10, 60, 60)], &f).unwrap();
        assert!(t.is_alive(1));
        t.update(&[], &f).unwrap();
        assert!(!t.is_alive(1));
        assert!(t.is_empty());
    }

    #[test]
    fn test_scoring_error_keeps_prior_state() {
        let mut t = tracker(30, 1);
        let f = frame();
        t.update(&[det(10, 10, 60, 60)], &f).unwrap();

        t.scorer = Box::new(FailingScorer);
        let err = t.update(&[det(12, 12, 62, 62)], &f).unwrap_err();
        assert!(matches!(err, SortingError::TrackingFailure(_)));
        assert_eq!(t.len(), 1);
        assert_eq!(t.tracks[0].track.bbox, BoundingBox::new(10, 10, 60, 60));
        assert_eq!(t.tracks[0].track.miss_count, 0);
    }

    #[test]
    fn test_greedy_prefers_highest_score() {
        let matches = greedy_match(vec![(0, 0, 0.4), (0, 1, 0.9), (1, 1, 0.8), (1, 0, 0.5)]);
        assert_eq!(matches, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_low_overlap_spawns_new_identity() {
        let mut t = tracker(30, 1);
        let f = frame();
        t.update(&[det(10, 10, 60, 60)], &f).unwrap();
        let tracks = t.update(&[det(100, 100, 150, 150)], &f).unwrap();
        let ids: Vec<u32> = tracks.iter().map(|tr| tr.track_id).collect();
        assert!(ids.contains(&1));
        assert!(ids.contains(&2));
    }
}
