// src/session.rs - Recorded frame loading, per-frame analysis and CSV export
use crate::gestures::{detect_hand_gesture, detect_thumbs_up, infer_handedness, HandGesture, ThumbsUpDetection};
use crate::joints::{Finger, HandJoint, HandJointSet, Handedness, JointPose};
use crate::matcher::{ClassificationResult, Classifier};
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const QUATERNION_EPSILON: f64 = 1e-9;

#[derive(Debug, Deserialize)]
struct JointRecord {
    position: [f64; 3],
    /// x, y, z, w
    #[serde(default)]
    orientation: Option<[f64; 4]>,
}

#[derive(Debug, Deserialize)]
struct FrameRecord {
    #[serde(default)]
    timestamp: f64,
    #[serde(default)]
    hand: Option<Handedness>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    joints: HashMap<String, JointRecord>,
}

fn default_active() -> bool {
    true
}

/// One hand in one recorded frame.
#[derive(Debug, Clone)]
pub struct TrackedFrame {
    pub timestamp: f64,
    pub joint_set: HandJointSet,
}

fn to_orientation(xyzw: Option<[f64; 4]>) -> UnitQuaternion<f64> {
    match xyzw {
        Some([x, y, z, w]) => {
            let q = Quaternion::new(w, x, y, z);
            if q.norm() > QUATERNION_EPSILON && q.coords.iter().all(|c| c.is_finite()) {
                UnitQuaternion::from_quaternion(q)
            } else {
                UnitQuaternion::identity()
            }
        }
        None => UnitQuaternion::identity(),
    }
}

impl FrameRecord {
    fn into_tracked(self, index: usize) -> TrackedFrame {
        let mut joints = Vec::with_capacity(self.joints.len());
        for (name, record) in self.joints {
            let Some(joint) = HandJoint::from_name(&name) else {
                warn!(frame = index, joint = %name, "Unknown joint name, ignoring");
                continue;
            };
            if !record.position.iter().all(|c| c.is_finite()) {
                warn!(frame = index, %joint, "Non-finite joint position, ignoring");
                continue;
            }
            let [x, y, z] = record.position;
            joints.push((joint, JointPose::new(Vector3::new(x, y, z), to_orientation(record.orientation))));
        }

        let mut joint_set = HandJointSet::new(Handedness::Right);
        joint_set.is_active = self.active;
        for (joint, pose) in joints {
            joint_set.insert(joint, pose);
        }

        joint_set.handedness = match self.hand.or_else(|| infer_handedness(&joint_set)) {
            Some(hand) => hand,
            None => {
                warn!(frame = index, "Hand not given and not inferable, assuming right");
                Handedness::Right
            }
        };

        TrackedFrame {
            timestamp: self.timestamp,
            joint_set,
        }
    }
}

/// Parse a JSON array of frames.
pub fn parse_frames(json: &str) -> Result<Vec<TrackedFrame>> {
    let records: Vec<FrameRecord> = serde_json::from_str(json).context("Invalid frame data")?;
    Ok(records
        .into_iter()
        .enumerate()
        .map(|(i, record)| record.into_tracked(i))
        .collect())
}

pub fn load_frames<P: AsRef<Path>>(path: P) -> Result<Vec<TrackedFrame>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read frames from {}", path.display()))?;
    let frames = parse_frames(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    info!(?path, frames = frames.len(), "Loaded frames");
    Ok(frames)
}

/// Everything computed for one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub timestamp: f64,
    pub classification: ClassificationResult,
    pub gesture: HandGesture,
    pub thumbs_up: ThumbsUpDetection,
}

/// Classify one frame and run both fixed-threshold detectors.
/// `toward_viewer` is the direction the palm faces when shown to the camera.
pub fn analyze_frame(classifier: &Classifier, frame: &TrackedFrame, toward_viewer: &Vector3<f64>) -> FrameAnalysis {
    let classification = classifier.classify(&frame.joint_set);
    let gesture = detect_hand_gesture(&frame.joint_set, toward_viewer);
    let thumbs_up = detect_thumbs_up(&frame.joint_set);

    debug!(
        timestamp = frame.timestamp,
        pose = classification.primary_name().unwrap_or("-"),
        gesture = gesture.as_str(),
        thumbs_up = thumbs_up.is_thumbs_up,
        "Analyzed frame"
    );

    FrameAnalysis {
        timestamp: frame.timestamp,
        classification,
        gesture,
        thumbs_up,
    }
}

#[derive(Debug, Serialize)]
struct ClassificationRecord {
    timestamp: f64,
    frame: usize,
    hand: &'static str,
    active: bool,
    all_joints: bool,

    primary: Option<String>,
    primary_confidence: Option<f64>,
    runner_up: Option<String>,
    runner_up_confidence: Option<f64>,

    thumb_extension: f64,
    thumb_curl: f64,
    index_extension: f64,
    index_curl: f64,
    middle_extension: f64,
    middle_curl: f64,
    ring_extension: f64,
    ring_curl: f64,
    little_extension: f64,
    little_curl: f64,

    palm_orientation: Option<&'static str>,
    hand_orientation: Option<&'static str>,

    gesture: &'static str,
    thumbs_up: bool,
}

impl ClassificationRecord {
    fn new(frame: usize, analysis: &FrameAnalysis) -> Self {
        let result = &analysis.classification;
        let metrics = &result.metrics;
        let finger = |f: Finger| metrics.finger(f);
        let runner_up = result.alternatives.get(1);

        Self {
            timestamp: analysis.timestamp,
            frame,
            hand: metrics.handedness.as_str(),
            active: metrics.is_active,
            all_joints: metrics.has_all_required_joints,
            primary: result.primary.as_ref().map(|m| m.name.clone()),
            primary_confidence: result.primary.as_ref().map(|m| m.confidence),
            runner_up: runner_up.map(|m| m.name.clone()),
            runner_up_confidence: runner_up.map(|m| m.confidence),
            thumb_extension: finger(Finger::Thumb).extension,
            thumb_curl: finger(Finger::Thumb).curl,
            index_extension: finger(Finger::Index).extension,
            index_curl: finger(Finger::Index).curl,
            middle_extension: finger(Finger::Middle).extension,
            middle_curl: finger(Finger::Middle).curl,
            ring_extension: finger(Finger::Ring).extension,
            ring_curl: finger(Finger::Ring).curl,
            little_extension: finger(Finger::Little).extension,
            little_curl: finger(Finger::Little).curl,
            palm_orientation: metrics.orientation.palm.map(|p| p.as_str()),
            hand_orientation: metrics.orientation.hand.map(|h| h.as_str()),
            gesture: analysis.gesture.as_str(),
            thumbs_up: analysis.thumbs_up.is_thumbs_up,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub frames: usize,
    pub active_frames: usize,
    /// Frames per primary label, unmatched frames excluded.
    pub poses: BTreeMap<String, usize>,
    pub open_palm_frames: usize,
    pub closed_fist_frames: usize,
    pub thumbs_up_frames: usize,
}

/// Collects analyzed frames for one session and writes them out.
pub struct SessionExporter {
    output_dir: PathBuf,
    session_name: String,
    frames: Vec<FrameAnalysis>,
}

impl SessionExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            frames: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn add_frame(&mut self, analysis: FrameAnalysis) {
        self.frames.push(analysis);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    /// Write `classification.csv` under the session directory. The file is
    /// written beside the target and renamed into place once complete.
    pub fn export_csv(&self) -> Result<PathBuf> {
        let dir = self.session_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session directory {}", dir.display()))?;

        let csv_path = dir.join("classification.csv");
        let tmp_path = dir.join(format!(".classification-{}.csv.tmp", uuid::Uuid::new_v4()));

        let file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        let mut writer = Writer::from_writer(file);
        for (i, analysis) in self.frames.iter().enumerate() {
            writer.serialize(ClassificationRecord::new(i, analysis))?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp_path, &csv_path)
            .with_context(|| format!("Failed to move export into {}", csv_path.display()))?;
        info!(path = ?csv_path, rows = self.frames.len(), "Exported classification CSV");
        Ok(csv_path)
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            frames: self.frames.len(),
            ..Default::default()
        };

        for analysis in &self.frames {
            if analysis.classification.metrics.is_active {
                summary.active_frames += 1;
            }
            if let Some(name) = analysis.classification.primary_name() {
                *summary.poses.entry(name.to_string()).or_default() += 1;
            }
            match analysis.gesture {
                HandGesture::OpenPalm => summary.open_palm_frames += 1,
                HandGesture::ClosedFist => summary.closed_fist_frames += 1,
                HandGesture::Other => {}
            }
            if analysis.thumbs_up.is_thumbs_up {
                summary.thumbs_up_frames += 1;
            }
        }

        summary
    }
}
