// src/metrics.rs - Per-finger extension / curl / direction and whole-hand metrics
use crate::config::DetectionParameters;
use crate::joints::{extract_finger_chain, Finger, FingerChain, HandJoint, HandJointSet, Handedness};
use crate::orientation::{compute_orientation_snapshot, HandOrientationSnapshot};
use nalgebra::Vector3;
use serde::Serialize;

/// Base-to-tip distance below which the finger direction falls back to the
/// first segment (1 cm).
pub const DIRECTION_EPSILON: f64 = 0.01;

/// Segment lengths at or below this are treated as collapsed.
pub const LENGTH_EPSILON: f64 = 1e-6;

/// Chains need at least this many interior joints before curl comes from joint angles.
const MIN_ANGLE_CHAIN: usize = 5;

/// Every joint a full classification looks at. The palm joint is only
/// used by the open-palm / fist detector.
pub const REQUIRED_JOINTS: [HandJoint; 25] = [
    HandJoint::Wrist,
    HandJoint::ThumbMetacarpal,
    HandJoint::ThumbProximal,
    HandJoint::ThumbDistal,
    HandJoint::ThumbTip,
    HandJoint::IndexMetacarpal,
    HandJoint::IndexProximal,
    HandJoint::IndexIntermediate,
    HandJoint::IndexDistal,
    HandJoint::IndexTip,
    HandJoint::MiddleMetacarpal,
    HandJoint::MiddleProximal,
    HandJoint::MiddleIntermediate,
    HandJoint::MiddleDistal,
    HandJoint::MiddleTip,
    HandJoint::RingMetacarpal,
    HandJoint::RingProximal,
    HandJoint::RingIntermediate,
    HandJoint::RingDistal,
    HandJoint::RingTip,
    HandJoint::LittleMetacarpal,
    HandJoint::LittleProximal,
    HandJoint::LittleIntermediate,
    HandJoint::LittleDistal,
    HandJoint::LittleTip,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FingerMetrics {
    /// Base-to-tip distance over summed segment length, 1.0 = straight.
    pub extension: f64,
    /// Joint bend, 0.0 = straight, 1.0 = fully bent.
    pub curl: f64,
    /// Unit base-to-tip vector, or the zero vector for degenerate chains.
    pub direction: Vector3<f64>,
}

impl Default for FingerMetrics {
    fn default() -> Self {
        Self {
            extension: 0.0,
            curl: 0.0,
            direction: Vector3::zeros(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerState {
    Extended,
    Curled,
    Partial,
}

impl FingerMetrics {
    pub fn state(&self, params: &DetectionParameters) -> FingerState {
        if self.extension >= params.extension_threshold {
            FingerState::Extended
        } else if self.curl >= params.curl_threshold {
            FingerState::Curled
        } else {
            FingerState::Partial
        }
    }

    /// Straightness score `1 - curl`, used by the thumbs-up detector.
    pub fn curl_proxy(&self) -> f64 {
        1.0 - self.curl
    }
}

pub fn compute_finger_metrics(chain: &FingerChain) -> FingerMetrics {
    let joints = &chain.joints;
    if joints.len() < 3 {
        return FingerMetrics::default();
    }

    let total_length: f64 = joints.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    let base_to_tip = joints[joints.len() - 1] - joints[0];
    let base_to_tip_distance = base_to_tip.norm();

    let extension = if total_length > LENGTH_EPSILON {
        (base_to_tip_distance / total_length).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let fallback_curl = (1.0 - extension).clamp(0.0, 1.0);
    let curl = if joints.len() >= MIN_ANGLE_CHAIN {
        joint_angle_curl(joints).unwrap_or(fallback_curl)
    } else {
        fallback_curl
    };

    let direction = if base_to_tip_distance > DIRECTION_EPSILON {
        base_to_tip / base_to_tip_distance
    } else {
        let first = joints[1] - joints[0];
        let n = first.norm();
        if n > LENGTH_EPSILON {
            first / n
        } else {
            Vector3::zeros()
        }
    };

    FingerMetrics {
        extension,
        curl,
        direction,
    }
}

/// Weighted mean of per-joint bend over the interior joints, weights
/// growing toward the tip. `None` when every joint has a collapsed segment.
fn joint_angle_curl(joints: &[Vector3<f64>]) -> Option<f64> {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;

    for (i, w) in joints.windows(3).enumerate() {
        let to_prev = w[0] - w[1];
        let to_next = w[2] - w[1];
        let (a, b) = (to_prev.norm(), to_next.norm());
        if a <= LENGTH_EPSILON || b <= LENGTH_EPSILON {
            continue;
        }

        let cos = (to_prev.dot(&to_next) / (a * b)).clamp(-1.0, 1.0);
        let angle_deg = cos.acos().to_degrees();
        let joint_curl = ((180.0 - angle_deg) / 90.0).clamp(0.0, 1.0);

        let weight = (i + 1) as f64;
        weighted += joint_curl * weight;
        weight_sum += weight;
    }

    if weight_sum > 0.0 {
        Some((weighted / weight_sum).clamp(0.0, 1.0))
    } else {
        None
    }
}

/// Everything computed from one hand in one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandMetrics {
    pub handedness: Handedness,
    pub is_active: bool,
    pub has_all_required_joints: bool,
    pub missing_joints: Vec<HandJoint>,
    /// Indexed by `Finger::index()`.
    pub fingers: [FingerMetrics; 5],
    pub orientation: HandOrientationSnapshot,
    /// Thumb tip to index, middle, ring and little tips.
    pub thumb_tip_distances: [Option<f64>; 4],
}

impl HandMetrics {
    pub fn finger(&self, finger: Finger) -> &FingerMetrics {
        &self.fingers[finger.index()]
    }

    pub fn finger_states(&self, params: &DetectionParameters) -> [FingerState; 5] {
        let mut states = [FingerState::Partial; 5];
        for (state, metrics) in states.iter_mut().zip(self.fingers.iter()) {
            *state = metrics.state(params);
        }
        states
    }

    /// Distance from the thumb tip to another fingertip. `None` for the
    /// thumb itself or when either tip is missing.
    pub fn thumb_tip_distance(&self, finger: Finger) -> Option<f64> {
        match finger {
            Finger::Thumb => None,
            other => self.thumb_tip_distances[other.index() - 1],
        }
    }
}

pub fn compute_hand_metrics(joint_set: &HandJointSet) -> HandMetrics {
    let missing_joints = joint_set.missing(&REQUIRED_JOINTS);

    let mut fingers = [FingerMetrics::default(); 5];
    for finger in Finger::ALL {
        let chain = extract_finger_chain(joint_set, finger);
        fingers[finger.index()] = compute_finger_metrics(&chain);
    }

    let mut thumb_tip_distances = [None; 4];
    for (slot, finger) in thumb_tip_distances.iter_mut().zip(Finger::NON_THUMB.iter()) {
        *slot = joint_set.distance(HandJoint::ThumbTip, finger.tip());
    }

    HandMetrics {
        handedness: joint_set.handedness,
        is_active: joint_set.is_active,
        has_all_required_joints: missing_joints.is_empty(),
        missing_joints,
        fingers,
        orientation: compute_orientation_snapshot(joint_set),
        thumb_tip_distances,
    }
}
