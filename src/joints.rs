// src/joints.rs - Hand skeleton joints, per-frame joint sets and finger chain extraction
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The 26 joints of the XR hand skeleton. Thumb has no intermediate joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandJoint {
    Palm,
    Wrist,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    LittleMetacarpal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
    LittleTip,
}

pub const JOINT_COUNT: usize = 26;

impl HandJoint {
    pub const ALL: [HandJoint; JOINT_COUNT] = [
        Self::Palm,
        Self::Wrist,
        Self::ThumbMetacarpal,
        Self::ThumbProximal,
        Self::ThumbDistal,
        Self::ThumbTip,
        Self::IndexMetacarpal,
        Self::IndexProximal,
        Self::IndexIntermediate,
        Self::IndexDistal,
        Self::IndexTip,
        Self::MiddleMetacarpal,
        Self::MiddleProximal,
        Self::MiddleIntermediate,
        Self::MiddleDistal,
        Self::MiddleTip,
        Self::RingMetacarpal,
        Self::RingProximal,
        Self::RingIntermediate,
        Self::RingDistal,
        Self::RingTip,
        Self::LittleMetacarpal,
        Self::LittleProximal,
        Self::LittleIntermediate,
        Self::LittleDistal,
        Self::LittleTip,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Palm => "palm",
            Self::Wrist => "wrist",
            Self::ThumbMetacarpal => "thumb-metacarpal",
            Self::ThumbProximal => "thumb-proximal",
            Self::ThumbDistal => "thumb-distal",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMetacarpal => "index-metacarpal",
            Self::IndexProximal => "index-proximal",
            Self::IndexIntermediate => "index-intermediate",
            Self::IndexDistal => "index-distal",
            Self::IndexTip => "index-tip",
            Self::MiddleMetacarpal => "middle-metacarpal",
            Self::MiddleProximal => "middle-proximal",
            Self::MiddleIntermediate => "middle-intermediate",
            Self::MiddleDistal => "middle-distal",
            Self::MiddleTip => "middle-tip",
            Self::RingMetacarpal => "ring-metacarpal",
            Self::RingProximal => "ring-proximal",
            Self::RingIntermediate => "ring-intermediate",
            Self::RingDistal => "ring-distal",
            Self::RingTip => "ring-tip",
            Self::LittleMetacarpal => "little-metacarpal",
            Self::LittleProximal => "little-proximal",
            Self::LittleIntermediate => "little-intermediate",
            Self::LittleDistal => "little-distal",
            Self::LittleTip => "little-tip",
        }
    }

    pub fn from_name(name: &str) -> Option<HandJoint> {
        Self::ALL.iter().copied().find(|j| j.as_str() == name)
    }
}

impl fmt::Display for HandJoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Self::Thumb,
        Self::Index,
        Self::Middle,
        Self::Ring,
        Self::Little,
    ];

    /// The four non-thumb fingers, index first.
    pub const NON_THUMB: [Finger; 4] = [Self::Index, Self::Middle, Self::Ring, Self::Little];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumb => "thumb",
            Self::Index => "index",
            Self::Middle => "middle",
            Self::Ring => "ring",
            Self::Little => "little",
        }
    }

    /// Joints of this finger ordered from base to tip.
    pub fn joints(&self) -> &'static [HandJoint] {
        use HandJoint::*;
        match self {
            Self::Thumb => &[ThumbMetacarpal, ThumbProximal, ThumbDistal, ThumbTip],
            Self::Index => &[IndexMetacarpal, IndexProximal, IndexIntermediate, IndexDistal, IndexTip],
            Self::Middle => &[MiddleMetacarpal, MiddleProximal, MiddleIntermediate, MiddleDistal, MiddleTip],
            Self::Ring => &[RingMetacarpal, RingProximal, RingIntermediate, RingDistal, RingTip],
            Self::Little => &[LittleMetacarpal, LittleProximal, LittleIntermediate, LittleDistal, LittleTip],
        }
    }

    pub fn metacarpal(&self) -> HandJoint {
        self.joints()[0]
    }

    /// Knuckle joint at the far end of the metacarpal bone.
    pub fn proximal(&self) -> HandJoint {
        self.joints()[1]
    }

    pub fn tip(&self) -> HandJoint {
        let joints = self.joints();
        joints[joints.len() - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Rigid pose of one tracked joint. Position is in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl JointPose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self { position, orientation }
    }

    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            orientation: UnitQuaternion::identity(),
        }
    }
}

/// All joint poses reported for one hand in one tracking frame.
///
/// The set may be partial. Lookups return `None` for absent joints and
/// nothing in this crate substitutes a zero pose for them.
#[derive(Debug, Clone)]
pub struct HandJointSet {
    pub handedness: Handedness,
    pub is_active: bool,
    joints: HashMap<HandJoint, JointPose>,
}

impl HandJointSet {
    pub fn new(handedness: Handedness) -> Self {
        Self {
            handedness,
            is_active: true,
            joints: HashMap::with_capacity(JOINT_COUNT),
        }
    }

    pub fn inactive(handedness: Handedness) -> Self {
        Self {
            is_active: false,
            ..Self::new(handedness)
        }
    }

    pub fn insert(&mut self, joint: HandJoint, pose: JointPose) {
        self.joints.insert(joint, pose);
    }

    pub fn remove(&mut self, joint: HandJoint) -> Option<JointPose> {
        self.joints.remove(&joint)
    }

    pub fn with_joint(mut self, joint: HandJoint, pose: JointPose) -> Self {
        self.insert(joint, pose);
        self
    }

    pub fn get(&self, joint: HandJoint) -> Option<&JointPose> {
        self.joints.get(&joint)
    }

    pub fn position(&self, joint: HandJoint) -> Option<Vector3<f64>> {
        self.joints.get(&joint).map(|p| p.position)
    }

    pub fn contains(&self, joint: HandJoint) -> bool {
        self.joints.contains_key(&joint)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// True when every joint in `required` is present.
    pub fn has_all(&self, required: &[HandJoint]) -> bool {
        required.iter().all(|j| self.contains(*j))
    }

    /// Joints from `required` that are absent, in the order given.
    pub fn missing(&self, required: &[HandJoint]) -> Vec<HandJoint> {
        required.iter().copied().filter(|j| !self.contains(*j)).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.has_all(&HandJoint::ALL)
    }

    pub fn distance(&self, a: HandJoint, b: HandJoint) -> Option<f64> {
        Some((self.position(a)? - self.position(b)?).norm())
    }
}

/// Ordered joint positions of one finger, base to tip, absent joints skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerChain {
    pub finger: Finger,
    pub joints: Vec<Vector3<f64>>,
}

impl FingerChain {
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

pub fn extract_finger_chain(joint_set: &HandJointSet, finger: Finger) -> FingerChain {
    let joints = finger
        .joints()
        .iter()
        .filter_map(|j| joint_set.position(*j))
        .collect();

    FingerChain { finger, joints }
}
