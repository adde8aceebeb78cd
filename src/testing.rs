// src/testing.rs - Synthetic hand skeletons shared by unit tests
//
// Right hand held up in front of the user: wrist at the origin, fingers
// along +y, palm facing +z. Left hands are the same skeleton mirrored in x.
use crate::joints::{Finger, HandJoint, HandJointSet, Handedness, JointPose};
use nalgebra::{UnitQuaternion, Vector3};

/// Phalanx lengths after the knuckle: proximal, intermediate, distal.
const PHALANGES: [f64; 3] = [0.045, 0.025, 0.02];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThumbShape {
    /// Straight out to the side, in the palm plane.
    Open,
    /// Folded across the palm.
    Tucked,
    /// Sticking straight out of the palm toward the user.
    Raised,
    /// Tip pressed against the index fingertip of a half-bent index.
    TouchingIndex,
}

pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

/// Knuckle x offset and height for each non-thumb finger.
fn knuckle(finger: Finger) -> (f64, f64) {
    match finger {
        Finger::Index => (0.02, 0.09),
        Finger::Middle => (0.0, 0.09),
        Finger::Ring => (-0.02, 0.088),
        Finger::Little => (-0.04, 0.08),
        Finger::Thumb => (0.025, 0.02),
    }
}

/// Build a hand with each non-thumb finger bent by `bend_deg` at every
/// interior joint (index, middle, ring, little order).
pub fn hand_with(handedness: Handedness, bends_deg: [f64; 4], thumb: ThumbShape) -> HandJointSet {
    let mut positions: Vec<(HandJoint, Vector3<f64>)> = vec![
        (HandJoint::Wrist, Vector3::new(0.0, 0.0, 0.0)),
        (HandJoint::Palm, Vector3::new(0.0, 0.05, 0.0)),
    ];

    for (finger, bend) in Finger::NON_THUMB.iter().zip(bends_deg.iter()) {
        let (x, y) = knuckle(*finger);
        let joints = finger.joints();
        positions.push((joints[0], Vector3::new(x, 0.01, 0.0)));

        let mut at = Vector3::new(x, y, 0.0);
        positions.push((joints[1], at));

        // Fingers fold toward +z, the palm side.
        let mut angle: f64 = 0.0;
        for (joint, length) in joints[2..].iter().zip(PHALANGES.iter()) {
            angle += bend.to_radians();
            at += Vector3::new(0.0, angle.cos(), angle.sin()) * *length;
            positions.push((*joint, at));
        }
    }

    let thumb_points = match thumb {
        ThumbShape::Open => [
            Vector3::new(0.025, 0.02, 0.0),
            Vector3::new(0.055, 0.045, 0.0),
            Vector3::new(0.075, 0.062, 0.0),
            Vector3::new(0.092, 0.076, 0.0),
        ],
        ThumbShape::Tucked => [
            Vector3::new(0.025, 0.02, 0.0),
            Vector3::new(0.035, 0.045, 0.015),
            Vector3::new(0.015, 0.06, 0.03),
            Vector3::new(-0.005, 0.05, 0.035),
        ],
        ThumbShape::Raised => [
            Vector3::new(0.025, 0.02, 0.0),
            Vector3::new(0.035, 0.04, 0.02),
            Vector3::new(0.035, 0.045, 0.05),
            Vector3::new(0.035, 0.048, 0.075),
        ],
        // Meets the tip of an index finger bent 45 degrees per joint.
        ThumbShape::TouchingIndex => [
            Vector3::new(0.025, 0.02, 0.0),
            Vector3::new(0.045, 0.05, 0.02),
            Vector3::new(0.04, 0.08, 0.05),
            Vector3::new(0.025, 0.1, 0.068),
        ],
    };
    for (joint, point) in Finger::Thumb.joints().iter().zip(thumb_points.iter()) {
        positions.push((*joint, *point));
    }

    let mut set = HandJointSet::new(handedness);
    for (joint, mut p) in positions {
        if handedness == Handedness::Left {
            p.x = -p.x;
        }
        set.insert(joint, JointPose::new(p, UnitQuaternion::identity()));
    }
    set
}

pub fn open_hand(handedness: Handedness) -> HandJointSet {
    hand_with(handedness, [0.0; 4], ThumbShape::Open)
}

pub fn fist(handedness: Handedness) -> HandJointSet {
    hand_with(handedness, [90.0; 4], ThumbShape::Tucked)
}

pub fn thumbs_up(handedness: Handedness) -> HandJointSet {
    hand_with(handedness, [90.0; 4], ThumbShape::Raised)
}

pub fn pointing(handedness: Handedness) -> HandJointSet {
    hand_with(handedness, [0.0, 90.0, 90.0, 90.0], ThumbShape::Tucked)
}

pub fn victory(handedness: Handedness) -> HandJointSet {
    hand_with(handedness, [0.0, 0.0, 90.0, 90.0], ThumbShape::Tucked)
}

/// Swing a finger sideways about its knuckle (positive = toward -x).
pub fn splayed(hand: &HandJointSet, finger: Finger, degrees: f64) -> HandJointSet {
    let mut out = hand.clone();
    let Some(knuckle) = hand.position(finger.proximal()) else {
        return out;
    };
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), degrees.to_radians());
    for joint in &finger.joints()[2..] {
        if let Some(pose) = hand.get(*joint) {
            let p = knuckle + rotation * (pose.position - knuckle);
            out.insert(*joint, JointPose::new(p, pose.orientation));
        }
    }
    out
}

/// Rotate every joint of `hand` about the wrist.
pub fn rotated(hand: &HandJointSet, rotation: UnitQuaternion<f64>) -> HandJointSet {
    let wrist = hand.position(HandJoint::Wrist).unwrap_or_else(Vector3::zeros);
    let mut out = HandJointSet::new(hand.handedness);
    out.is_active = hand.is_active;
    for joint in HandJoint::ALL {
        if let Some(pose) = hand.get(joint) {
            let p = wrist + rotation * (pose.position - wrist);
            out.insert(joint, JointPose::new(p, rotation * pose.orientation));
        }
    }
    out
}
