// src/matcher.rs - Descriptor scoring and ranked classification
use crate::config::DetectionParameters;
use crate::descriptor::{DescriptorLibrary, PoseDescriptor, ValueRange};
use crate::joints::{Finger, HandJointSet};
use crate::metrics::{compute_hand_metrics, HandMetrics};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Flat multiplier applied when the observed orientation is not allowed.
pub const ORIENTATION_PENALTY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    pub name: String,
    pub confidence: f64,
}

/// One out-of-range metric and the multiplier it contributed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangePenalty {
    pub finger: Finger,
    pub metric: Metric,
    pub actual: f64,
    pub expected_min: f64,
    pub expected_max: f64,
    pub factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Extension,
    Curl,
}

/// Breakdown of how a single descriptor scored one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptorEvaluation {
    pub name: String,
    pub confidence: f64,
    pub used_custom_scorer: bool,
    pub range_penalties: Vec<RangePenalty>,
    pub palm_orientation_matched: bool,
    pub hand_orientation_matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Best match, present only when it clears the confidence threshold.
    pub primary: Option<MatchScore>,
    /// Best matches above the noise floor, highest first, regardless of threshold.
    pub alternatives: Vec<MatchScore>,
    pub metrics: HandMetrics,
    /// Every descriptor's breakdown, in library order.
    pub evaluations: Vec<DescriptorEvaluation>,
}

impl ClassificationResult {
    fn no_detection(metrics: HandMetrics) -> Self {
        Self {
            primary: None,
            alternatives: Vec::new(),
            metrics,
            evaluations: Vec::new(),
        }
    }

    pub fn primary_name(&self) -> Option<&str> {
        self.primary.as_ref().map(|m| m.name.as_str())
    }

    pub fn primary_confidence(&self) -> f64 {
        self.primary.as_ref().map(|m| m.confidence).unwrap_or(0.0)
    }
}

/// Linear penalty for a value outside `range`: 1 inside, falling by the
/// distance to the nearest bound, floored at 0.
pub fn range_factor(range: &ValueRange, actual: f64) -> f64 {
    (1.0 - range.distance_outside(actual)).max(0.0)
}

fn sanitize(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

pub fn evaluate_detailed(
    metrics: &HandMetrics,
    descriptor: &PoseDescriptor,
    params: &DetectionParameters,
) -> DescriptorEvaluation {
    if let Some(scorer) = descriptor.custom_scorer() {
        return DescriptorEvaluation {
            name: descriptor.name().to_string(),
            confidence: sanitize(scorer(metrics, params)),
            used_custom_scorer: true,
            range_penalties: Vec::new(),
            palm_orientation_matched: true,
            hand_orientation_matched: true,
        };
    }

    let mut confidence = 1.0;
    let mut range_penalties = Vec::new();

    for finger in Finger::ALL {
        let expected = descriptor.finger(finger);
        let actual = metrics.finger(finger);

        for (metric, range, value) in [
            (Metric::Extension, expected.extension, actual.extension),
            (Metric::Curl, expected.curl, actual.curl),
        ] {
            let Some(range) = range else { continue };
            if range.contains(value) {
                continue;
            }
            let factor = range_factor(&range, value);
            confidence *= factor;
            range_penalties.push(RangePenalty {
                finger,
                metric,
                actual: value,
                expected_min: range.min,
                expected_max: range.max,
                factor,
            });
        }
    }

    let allowed_palm = descriptor.palm_orientations();
    let palm_orientation_matched = allowed_palm.is_empty()
        || metrics
            .orientation
            .palm
            .map(|p| allowed_palm.contains(&p))
            .unwrap_or(false);
    if !palm_orientation_matched {
        confidence *= ORIENTATION_PENALTY;
    }

    let allowed_hand = descriptor.hand_orientations();
    let hand_orientation_matched = allowed_hand.is_empty()
        || metrics
            .orientation
            .hand
            .map(|h| allowed_hand.contains(&h))
            .unwrap_or(false);
    if !hand_orientation_matched {
        confidence *= ORIENTATION_PENALTY;
    }

    DescriptorEvaluation {
        name: descriptor.name().to_string(),
        confidence: sanitize(confidence),
        used_custom_scorer: false,
        range_penalties,
        palm_orientation_matched,
        hand_orientation_matched,
    }
}

pub fn evaluate(metrics: &HandMetrics, descriptor: &PoseDescriptor, params: &DetectionParameters) -> f64 {
    evaluate_detailed(metrics, descriptor, params).confidence
}

/// Rank every descriptor in `library` against one frame.
pub fn classify(
    joint_set: &HandJointSet,
    library: &DescriptorLibrary,
    params: &DetectionParameters,
) -> ClassificationResult {
    classify_metrics(compute_hand_metrics(joint_set), library, params)
}

pub fn classify_metrics(
    metrics: HandMetrics,
    library: &DescriptorLibrary,
    params: &DetectionParameters,
) -> ClassificationResult {
    if !metrics.is_active {
        debug!(hand = metrics.handedness.as_str(), "Hand not tracked, skipping classification");
        return ClassificationResult::no_detection(metrics);
    }

    let evaluations: Vec<DescriptorEvaluation> = library
        .iter()
        .map(|d| evaluate_detailed(&metrics, d, params))
        .collect();

    let mut ranked: Vec<MatchScore> = evaluations
        .iter()
        .filter(|e| e.confidence > params.noise_floor)
        .map(|e| MatchScore {
            name: e.name.clone(),
            confidence: e.confidence,
        })
        .collect();
    // Stable sort keeps library order among equal confidences.
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked.truncate(params.max_alternatives);

    let primary = ranked
        .first()
        .filter(|m| m.confidence >= params.confidence_threshold)
        .cloned();

    if let Some(ref best) = primary {
        debug!(
            hand = metrics.handedness.as_str(),
            pose = %best.name,
            confidence = best.confidence,
            "Pose matched"
        );
    }

    ClassificationResult {
        primary,
        alternatives: ranked,
        metrics,
        evaluations,
    }
}

/// Holds a shared descriptor library and tunable parameters.
///
/// The library is never mutated, so one classifier (or clones of it) can
/// serve any number of threads.
#[derive(Debug, Clone)]
pub struct Classifier {
    library: Arc<DescriptorLibrary>,
    params: DetectionParameters,
}

impl Classifier {
    pub fn new(library: Arc<DescriptorLibrary>, params: DetectionParameters) -> Self {
        Self { library, params }
    }

    pub fn library(&self) -> &DescriptorLibrary {
        &self.library
    }

    pub fn parameters(&self) -> &DetectionParameters {
        &self.params
    }

    pub fn parameters_mut(&mut self) -> &mut DetectionParameters {
        &mut self.params
    }

    pub fn set_parameters(&mut self, params: DetectionParameters) {
        self.params = params;
    }

    pub fn classify(&self, joint_set: &HandJointSet) -> ClassificationResult {
        classify(joint_set, &self.library, &self.params)
    }

    /// Breakdown for a single named descriptor, `None` if it is not in the library.
    pub fn evaluate_detailed(&self, joint_set: &HandJointSet, name: &str) -> Option<DescriptorEvaluation> {
        let descriptor = self.library.get(name)?;
        let metrics = compute_hand_metrics(joint_set);
        Some(evaluate_detailed(&metrics, descriptor, &self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::{HandJoint, Handedness};
    use crate::metrics::FingerMetrics;
    use crate::orientation::{HandOrientation, HandOrientationSnapshot, PalmOrientation};
    use crate::testing::{approx_eq, open_hand};
    use nalgebra::Vector3;

    fn metrics_with(extensions: [f64; 5], curls: [f64; 5], palm: Option<PalmOrientation>) -> HandMetrics {
        let mut fingers = [FingerMetrics::default(); 5];
        for i in 0..5 {
            fingers[i] = FingerMetrics {
                extension: extensions[i],
                curl: curls[i],
                direction: Vector3::y(),
            };
        }
        HandMetrics {
            handedness: Handedness::Right,
            is_active: true,
            has_all_required_joints: true,
            missing_joints: Vec::new(),
            fingers,
            orientation: HandOrientationSnapshot {
                palm,
                hand: Some(HandOrientation::Upright),
                palm_normal: None,
            },
            thumb_tip_distances: [None; 4],
        }
    }

    fn index_pointing() -> PoseDescriptor {
        PoseDescriptor::builder("point")
            .extension(Finger::Index, 0.8, 1.0)
            .curl(Finger::Index, 0.0, 0.2)
            .extension(Finger::Middle, 0.2, 0.5)
            .palm(&[PalmOrientation::FacingAway])
            .build()
            .unwrap()
    }

    fn scorer_nan(_: &HandMetrics, _: &DetectionParameters) -> f64 {
        f64::NAN
    }

    fn scorer_big(_: &HandMetrics, _: &DetectionParameters) -> f64 {
        3.0
    }

    #[test]
    fn test_midpoint_metrics_score_one() {
        let m = metrics_with(
            [0.5, 0.9, 0.35, 0.5, 0.5],
            [0.5, 0.1, 0.5, 0.5, 0.5],
            Some(PalmOrientation::FacingAway),
        );
        let params = DetectionParameters::default();
        assert_eq!(evaluate(&m, &index_pointing(), &params), 1.0);
    }

    #[test]
    fn test_range_penalty_is_linear() {
        // Middle extension 0.8 is 0.3 above the max: factor 0.7.
        let m = metrics_with(
            [0.5, 0.9, 0.8, 0.5, 0.5],
            [0.5, 0.1, 0.5, 0.5, 0.5],
            Some(PalmOrientation::FacingAway),
        );
        let eval = evaluate_detailed(&m, &index_pointing(), &DetectionParameters::default());
        assert!(approx_eq(eval.confidence, 0.7, 1e-9));
        assert_eq!(eval.range_penalties.len(), 1);
        assert_eq!(eval.range_penalties[0].finger, Finger::Middle);
        assert_eq!(eval.range_penalties[0].metric, Metric::Extension);
    }

    #[test]
    fn test_orientation_penalty_is_flat() {
        let params = DetectionParameters::default();
        for palm in [Some(PalmOrientation::FacingUser), Some(PalmOrientation::Down), None] {
            let m = metrics_with([0.5, 0.9, 0.35, 0.5, 0.5], [0.5, 0.1, 0.5, 0.5, 0.5], palm);
            let eval = evaluate_detailed(&m, &index_pointing(), &params);
            assert!(!eval.palm_orientation_matched);
            assert_eq!(eval.confidence, 0.5);
        }
    }

    #[test]
    fn test_all_penalties_apply_together() {
        let m = metrics_with(
            [0.5, 0.6, 0.8, 0.5, 0.5],
            [0.5, 0.1, 0.5, 0.5, 0.5],
            Some(PalmOrientation::Up),
        );
        // 0.8 (index ext) * 0.7 (middle ext) * 0.5 (palm)
        let eval = evaluate_detailed(&m, &index_pointing(), &DetectionParameters::default());
        assert!(approx_eq(eval.confidence, 0.28, 1e-9));
        assert_eq!(eval.range_penalties.len(), 2);
    }

    #[test]
    fn test_penalty_floors_at_zero_and_keeps_applying() {
        let d = PoseDescriptor::builder("strict")
            .extension(Finger::Index, 0.0, 0.0)
            .curl(Finger::Index, 1.0, 1.0)
            .curl(Finger::Ring, 1.0, 1.0)
            .build()
            .unwrap();
        let m = metrics_with([0.5, 1.0, 0.5, 0.5, 0.5], [0.5, 0.0, 0.5, 0.5, 0.5], None);
        let eval = evaluate_detailed(&m, &d, &DetectionParameters::default());
        assert_eq!(eval.confidence, 0.0);
        // All three terms recorded even after hitting zero.
        assert_eq!(eval.range_penalties.len(), 3);
    }

    #[test]
    fn test_penalty_is_monotonic() {
        let params = DetectionParameters::default();
        let d = index_pointing();
        let mut last = f64::INFINITY;
        for step in 0..=20 {
            let middle_ext = 0.5 + step as f64 * 0.025;
            let m = metrics_with(
                [0.5, 0.9, middle_ext, 0.5, 0.5],
                [0.5, 0.1, 0.5, 0.5, 0.5],
                Some(PalmOrientation::FacingAway),
            );
            let c = evaluate(&m, &d, &params);
            assert!((0.0..=1.0).contains(&c));
            assert!(c <= last, "confidence rose from {} to {}", last, c);
            last = c;
        }
    }

    #[test]
    fn test_custom_scorer_is_clamped() {
        let m = metrics_with([0.5; 5], [0.5; 5], None);
        let params = DetectionParameters::default();
        let nan = PoseDescriptor::builder("nan").scorer(scorer_nan).build().unwrap();
        let big = PoseDescriptor::builder("big")
            .scorer(scorer_big)
            .palm(&[PalmOrientation::Up])
            .build()
            .unwrap();

        assert_eq!(evaluate(&m, &nan, &params), 0.0);
        // The scorer replaces every other rule, including orientation.
        let eval = evaluate_detailed(&m, &big, &params);
        assert!(eval.used_custom_scorer);
        assert_eq!(eval.confidence, 1.0);
    }

    #[test]
    fn test_classify_empty_library() {
        let result = classify(
            &open_hand(Handedness::Right),
            &DescriptorLibrary::empty(),
            &DetectionParameters::default(),
        );
        assert!(result.primary.is_none());
        assert!(result.alternatives.is_empty());
        assert!(result.evaluations.is_empty());
    }

    #[test]
    fn test_classify_ranks_and_thresholds() {
        let open = PoseDescriptor::builder("open")
            .extended(Finger::Index)
            .extended(Finger::Middle)
            .palm(&[PalmOrientation::FacingUser])
            .build()
            .unwrap();
        let open_away = PoseDescriptor::builder("open-away")
            .extended(Finger::Index)
            .extended(Finger::Middle)
            .palm(&[PalmOrientation::FacingAway])
            .build()
            .unwrap();
        let closed = PoseDescriptor::builder("closed")
            .curl(Finger::Index, 1.0, 1.0)
            .curl(Finger::Middle, 1.0, 1.0)
            .build()
            .unwrap();
        let library = DescriptorLibrary::new(vec![closed, open_away, open]).unwrap();
        let hand = open_hand(Handedness::Right);

        let result = classify(&hand, &library, &DetectionParameters::default());
        assert_eq!(result.primary_name(), Some("open"));
        assert_eq!(result.alternatives.len(), 2);
        assert_eq!(result.alternatives[1].name, "open-away");
        assert!(approx_eq(result.alternatives[1].confidence, 0.5, 1e-9));
        // "closed" scored zero and sits below the noise floor.
        assert_eq!(result.evaluations.len(), 3);
        assert!(result.alternatives.iter().all(|m| m.name != "closed"));

        let strict = DetectionParameters {
            confidence_threshold: 1.0,
            max_alternatives: 1,
            ..Default::default()
        };
        let result = classify(&hand, &library, &strict);
        assert_eq!(result.primary_name(), Some("open"));
        assert_eq!(result.alternatives.len(), 1);
    }

    #[test]
    fn test_primary_requires_threshold() {
        let away = PoseDescriptor::builder("away-only")
            .palm(&[PalmOrientation::FacingAway])
            .build()
            .unwrap();
        let library = DescriptorLibrary::new(vec![away]).unwrap();
        let result = classify(&open_hand(Handedness::Left), &library, &DetectionParameters::default());
        assert!(result.primary.is_none());
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.primary_confidence(), 0.0);
    }

    #[test]
    fn test_inactive_hand_short_circuits() {
        let mut hand = open_hand(Handedness::Right);
        hand.is_active = false;
        let library = DescriptorLibrary::new(vec![index_pointing()]).unwrap();
        let result = classify(&hand, &library, &DetectionParameters::default());
        assert!(result.primary.is_none());
        assert!(result.alternatives.is_empty());
        assert!(!result.metrics.is_active);
    }

    #[test]
    fn test_classifier_parameters_adjust_at_runtime() {
        let library = Arc::new(DescriptorLibrary::new(vec![index_pointing()]).unwrap());
        let mut classifier = Classifier::new(library, DetectionParameters::default());
        let mut hand = open_hand(Handedness::Right);
        hand.remove(HandJoint::Wrist);

        let eval = classifier.evaluate_detailed(&hand, "point").unwrap();
        assert!(!eval.palm_orientation_matched);
        assert!(classifier.evaluate_detailed(&hand, "missing").is_none());

        classifier.parameters_mut().noise_floor = 0.99;
        assert!(classifier.classify(&hand).alternatives.is_empty());
        classifier.set_parameters(DetectionParameters::default());
        assert_eq!(classifier.parameters().noise_floor, 0.1);
    }

    #[test]
    fn test_classifier_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Classifier>();
        assert_send_sync::<DescriptorLibrary>();
    }
}
