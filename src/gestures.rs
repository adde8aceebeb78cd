// src/gestures.rs - Fixed-threshold detectors for thumbs-up and open palm / closed fist
use crate::joints::{extract_finger_chain, Finger, HandJoint, HandJointSet, Handedness};
use crate::metrics::{compute_finger_metrics, LENGTH_EPSILON};
use crate::orientation::hand_palm_normal;
use nalgebra::Vector3;
use serde::Serialize;
use tracing::debug;

/// Minimum dot product between the thumb and the hand's up axis.
pub const THUMB_UP_ALIGNMENT: f64 = 0.45;
/// Thumb tip must be this many times farther from the wrist than the thumb knuckle.
pub const THUMB_EXTENSION_RATIO: f64 = 1.5;
/// Non-thumb fingers count as folded below this curl proxy.
pub const CURLED_PROXY_MAX: f64 = 0.7;

/// Minimum dot product between the palm normal and the camera direction.
pub const PALM_FACING_DOT: f64 = 0.5;
/// Tip-to-wrist over knuckle-to-wrist ratio above which a finger is open,
/// for index, middle, ring and little.
pub const OPEN_FINGER_RATIOS: [f64; 4] = [1.7, 1.8, 1.7, 1.5];
/// Tip-to-palm distance over palm length below which a finger is closed.
pub const CLOSED_FINGER_RATIO: f64 = 1.0;
/// Fingers out of four that must agree for open or closed.
const FINGER_QUORUM: usize = 3;

const THUMBS_UP_JOINTS: [HandJoint; 7] = [
    HandJoint::Wrist,
    HandJoint::Palm,
    HandJoint::IndexMetacarpal,
    HandJoint::LittleMetacarpal,
    HandJoint::ThumbMetacarpal,
    HandJoint::ThumbProximal,
    HandJoint::ThumbTip,
];

/// Guess which hand this is from knuckle layout, assuming the palm faces
/// the viewer. `None` when either metacarpal is missing.
pub fn infer_handedness(joint_set: &HandJointSet) -> Option<Handedness> {
    let index = joint_set.position(HandJoint::IndexMetacarpal)?;
    let little = joint_set.position(HandJoint::LittleMetacarpal)?;
    Some(if index.x > little.x {
        Handedness::Right
    } else {
        Handedness::Left
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ThumbsUpFeatures {
    /// Dot product of the thumb direction with the hand's up axis.
    pub up_alignment: f64,
    /// Thumb tip distance over thumb knuckle distance, both from the wrist.
    pub extension_ratio: f64,
    /// Curl proxy of index, middle, ring and little.
    pub curl_proxies: [f64; 4],
}

impl ThumbsUpFeatures {
    pub fn is_thumb_up(&self) -> bool {
        self.up_alignment > THUMB_UP_ALIGNMENT
    }

    pub fn is_thumb_extended(&self) -> bool {
        self.extension_ratio > THUMB_EXTENSION_RATIO
    }

    pub fn are_fingers_curled(&self) -> bool {
        self.curl_proxies.iter().all(|p| *p < CURLED_PROXY_MAX)
    }

    pub fn is_thumbs_up(&self) -> bool {
        self.is_thumb_up() && self.is_thumb_extended() && self.are_fingers_curled()
    }

    /// Alignment of the thumb with the up axis, 0 when the pose is not a thumbs-up.
    pub fn confidence(&self) -> f64 {
        if self.is_thumbs_up() {
            self.up_alignment.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThumbsUpDetection {
    pub is_thumbs_up: bool,
    pub confidence: f64,
    pub features: ThumbsUpFeatures,
    pub has_all_required_joints: bool,
}

impl ThumbsUpDetection {
    fn rejected(has_all_required_joints: bool) -> Self {
        Self {
            is_thumbs_up: false,
            confidence: 0.0,
            features: ThumbsUpFeatures::default(),
            has_all_required_joints,
        }
    }
}

/// Orthonormal up axis of the hand: forward runs wrist to palm, side runs
/// across the metacarpals, up is their cross product (out of the palm).
fn hand_up_axis(joint_set: &HandJointSet) -> Option<Vector3<f64>> {
    let wrist = joint_set.position(HandJoint::Wrist)?;
    let palm = joint_set.position(HandJoint::Palm)?;
    let index = joint_set.position(HandJoint::IndexMetacarpal)?;
    let little = joint_set.position(HandJoint::LittleMetacarpal)?;

    let forward = (palm - wrist).try_normalize(LENGTH_EPSILON)?;
    let across = match joint_set.handedness {
        Handedness::Right => little - index,
        Handedness::Left => index - little,
    };
    let side = (across - forward * across.dot(&forward)).try_normalize(LENGTH_EPSILON)?;

    Some(forward.cross(&side))
}

fn thumbs_up_features(joint_set: &HandJointSet) -> Option<ThumbsUpFeatures> {
    let up = hand_up_axis(joint_set)?;

    let wrist = joint_set.position(HandJoint::Wrist)?;
    let thumb_base = joint_set.position(HandJoint::ThumbMetacarpal)?;
    let thumb_knuckle = joint_set.position(HandJoint::ThumbProximal)?;
    let thumb_tip = joint_set.position(HandJoint::ThumbTip)?;

    let thumb_direction = (thumb_tip - thumb_base).try_normalize(LENGTH_EPSILON)?;
    let knuckle_distance = (thumb_knuckle - wrist).norm();
    if knuckle_distance <= LENGTH_EPSILON {
        return None;
    }

    let mut curl_proxies = [0.0; 4];
    for (proxy, finger) in curl_proxies.iter_mut().zip(Finger::NON_THUMB.iter()) {
        let chain = extract_finger_chain(joint_set, *finger);
        *proxy = compute_finger_metrics(&chain).curl_proxy();
    }

    Some(ThumbsUpFeatures {
        up_alignment: thumb_direction.dot(&up),
        extension_ratio: (thumb_tip - wrist).norm() / knuckle_distance,
        curl_proxies,
    })
}

pub fn detect_thumbs_up(joint_set: &HandJointSet) -> ThumbsUpDetection {
    let has_all_required_joints = joint_set.has_all(&THUMBS_UP_JOINTS)
        && Finger::NON_THUMB.iter().all(|f| joint_set.has_all(f.joints()));

    if !joint_set.is_active || !has_all_required_joints {
        return ThumbsUpDetection::rejected(has_all_required_joints);
    }

    let Some(features) = thumbs_up_features(joint_set) else {
        debug!(hand = joint_set.handedness.as_str(), "Degenerate hand frame, skipping thumbs-up");
        return ThumbsUpDetection::rejected(true);
    };

    ThumbsUpDetection {
        is_thumbs_up: features.is_thumbs_up(),
        confidence: features.confidence(),
        features,
        has_all_required_joints,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandGesture {
    Other,
    OpenPalm,
    ClosedFist,
}

impl HandGesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::OpenPalm => "open-palm",
            Self::ClosedFist => "closed-fist",
        }
    }
}

fn is_palm_facing(joint_set: &HandJointSet, toward_camera: &Vector3<f64>) -> bool {
    let Some(camera) = toward_camera.try_normalize(LENGTH_EPSILON) else {
        return false;
    };
    hand_palm_normal(joint_set)
        .map(|n| n.dot(&camera) > PALM_FACING_DOT)
        .unwrap_or(false)
}

fn open_finger_count(joint_set: &HandJointSet, wrist: &Vector3<f64>) -> usize {
    Finger::NON_THUMB
        .iter()
        .zip(OPEN_FINGER_RATIOS.iter())
        .filter(|(finger, threshold)| {
            let tip = joint_set.position(finger.tip());
            let knuckle = joint_set.position(finger.proximal());
            let (Some(tip), Some(knuckle)) = (tip, knuckle) else {
                return false;
            };
            let base = (knuckle - wrist).norm();
            base > LENGTH_EPSILON && (tip - wrist).norm() / base > **threshold
        })
        .count()
}

fn closed_finger_count(joint_set: &HandJointSet, wrist: &Vector3<f64>) -> usize {
    let (Some(palm), Some(middle_knuckle)) = (
        joint_set.position(HandJoint::Palm),
        joint_set.position(HandJoint::MiddleProximal),
    ) else {
        return 0;
    };
    let palm_length = (middle_knuckle - wrist).norm();
    if palm_length <= LENGTH_EPSILON {
        return 0;
    }

    Finger::NON_THUMB
        .iter()
        .filter_map(|finger| joint_set.position(finger.tip()))
        .filter(|tip| (tip - palm).norm() / palm_length < CLOSED_FINGER_RATIO)
        .count()
}

/// Classify a frame as open palm, closed fist or neither. Open palm also
/// requires the palm to face `toward_camera`.
pub fn detect_hand_gesture(joint_set: &HandJointSet, toward_camera: &Vector3<f64>) -> HandGesture {
    if !joint_set.is_active {
        return HandGesture::Other;
    }
    let Some(wrist) = joint_set.position(HandJoint::Wrist) else {
        return HandGesture::Other;
    };

    if is_palm_facing(joint_set, toward_camera) && open_finger_count(joint_set, &wrist) >= FINGER_QUORUM {
        HandGesture::OpenPalm
    } else if closed_finger_count(joint_set, &wrist) >= FINGER_QUORUM {
        HandGesture::ClosedFist
    } else {
        HandGesture::Other
    }
}
