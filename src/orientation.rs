// src/orientation.rs - Palm facing direction and whole-hand rotation classification
use crate::joints::{HandJoint, HandJointSet, Handedness};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Below this norm the palm normal is treated as degenerate.
const NORMAL_EPSILON: f64 = 1e-9;

/// Magnitude a wrist-to-knuckle component must exceed to count as dominant.
const HAND_AXIS_THRESHOLD: f64 = 0.7;

/// Which way the palm surface faces, in the tracking frame (+z toward the user, +y up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PalmOrientation {
    FacingUser,
    FacingAway,
    Up,
    Down,
    Left,
    Right,
}

impl PalmOrientation {
    pub const ALL: [PalmOrientation; 6] = [
        Self::FacingUser,
        Self::FacingAway,
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FacingUser => "facing-user",
            Self::FacingAway => "facing-away",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Rotation of the whole hand about the wrist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandOrientation {
    Upright,
    UpsideDown,
    RotatedLeft,
    RotatedRight,
    Sideways,
}

impl HandOrientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upright => "upright",
            Self::UpsideDown => "upside-down",
            Self::RotatedLeft => "rotated-left",
            Self::RotatedRight => "rotated-right",
            Self::Sideways => "sideways",
        }
    }
}

/// Orientation of one hand in one frame. Each field is `None` when the
/// joints it is derived from are missing or collapse onto each other.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HandOrientationSnapshot {
    pub palm: Option<PalmOrientation>,
    pub hand: Option<HandOrientation>,
    pub palm_normal: Option<Vector3<f64>>,
}

/// Unit normal of the plane through wrist, index base and pinky base.
///
/// Returns the zero vector when the three points are collinear.
pub fn palm_normal(wrist: &Vector3<f64>, index_base: &Vector3<f64>, pinky_base: &Vector3<f64>) -> Vector3<f64> {
    let across_hand = index_base - wrist;
    let across_knuckles = pinky_base - index_base;
    let normal = across_hand.cross(&across_knuckles);
    let norm = normal.norm();

    if norm <= NORMAL_EPSILON {
        Vector3::zeros()
    } else {
        normal / norm
    }
}

/// Label a palm normal by its dominant axis.
///
/// Ties go to z, then y, then x. The zero vector therefore resolves to
/// `FacingUser`.
pub fn classify_palm_normal(normal: &Vector3<f64>) -> PalmOrientation {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());

    if az >= ay && az >= ax {
        if normal.z >= 0.0 {
            PalmOrientation::FacingUser
        } else {
            PalmOrientation::FacingAway
        }
    } else if ay >= ax {
        if normal.y >= 0.0 {
            PalmOrientation::Up
        } else {
            PalmOrientation::Down
        }
    } else if normal.x >= 0.0 {
        PalmOrientation::Right
    } else {
        PalmOrientation::Left
    }
}

pub fn compute_palm_orientation(
    wrist: &Vector3<f64>,
    index_base: &Vector3<f64>,
    pinky_base: &Vector3<f64>,
) -> PalmOrientation {
    classify_palm_normal(&palm_normal(wrist, index_base, pinky_base))
}

pub fn compute_hand_orientation(wrist: &Vector3<f64>, middle_base: &Vector3<f64>) -> HandOrientation {
    let along = middle_base - wrist;
    let norm = along.norm();
    if norm <= NORMAL_EPSILON {
        return HandOrientation::Sideways;
    }
    let dir = along / norm;

    if dir.y.abs() > HAND_AXIS_THRESHOLD {
        if dir.y > 0.0 {
            HandOrientation::Upright
        } else {
            HandOrientation::UpsideDown
        }
    } else if dir.x.abs() > HAND_AXIS_THRESHOLD {
        if dir.x > 0.0 {
            HandOrientation::RotatedRight
        } else {
            HandOrientation::RotatedLeft
        }
    } else {
        HandOrientation::Sideways
    }
}

/// Palm normal of a tracked hand, pointing out of the palm for either hand.
///
/// The wrist -> index -> little winding flips between hands, so the raw
/// normal is negated for left hands.
pub fn hand_palm_normal(joint_set: &HandJointSet) -> Option<Vector3<f64>> {
    let wrist = joint_set.position(HandJoint::Wrist)?;
    let index = joint_set.position(HandJoint::IndexProximal)?;
    let little = joint_set.position(HandJoint::LittleProximal)?;

    let normal = palm_normal(&wrist, &index, &little);
    if normal == Vector3::zeros() {
        return None;
    }

    Some(match joint_set.handedness {
        Handedness::Right => normal,
        Handedness::Left => -normal,
    })
}

pub fn compute_orientation_snapshot(joint_set: &HandJointSet) -> HandOrientationSnapshot {
    let palm_normal = hand_palm_normal(joint_set);

    let hand = match (
        joint_set.position(HandJoint::Wrist),
        joint_set.position(HandJoint::MiddleProximal),
    ) {
        (Some(wrist), Some(middle)) if (middle - wrist).norm() > NORMAL_EPSILON => {
            Some(compute_hand_orientation(&wrist, &middle))
        }
        _ => None,
    };

    HandOrientationSnapshot {
        palm: palm_normal.as_ref().map(classify_palm_normal),
        hand,
        palm_normal,
    }
}
