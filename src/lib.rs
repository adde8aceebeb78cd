//! Hand pose classification from tracked XR hand joints.
//!
//! A frame of joint poses goes through [`metrics::compute_hand_metrics`]
//! (finger extension, curl and direction plus palm and hand orientation),
//! then [`matcher::classify`] ranks it against a [`descriptor::DescriptorLibrary`]
//! such as the built-in ASL letters in [`library`]. The [`gestures`] module
//! holds fixed-threshold detectors for thumbs-up and open palm / closed fist.

pub mod config;
pub mod descriptor;
pub mod gestures;
pub mod joints;
pub mod library;
pub mod matcher;
pub mod metrics;
pub mod orientation;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, DetectionParameters};
pub use descriptor::{DescriptorError, DescriptorLibrary, PoseDescriptor, ValueRange};
pub use gestures::{detect_hand_gesture, detect_thumbs_up, HandGesture, ThumbsUpDetection};
pub use joints::{Finger, HandJoint, HandJointSet, Handedness, JointPose};
pub use matcher::{classify, ClassificationResult, Classifier, MatchScore};
pub use metrics::{compute_hand_metrics, FingerMetrics, HandMetrics};
pub use orientation::{HandOrientation, PalmOrientation};
