// src/descriptor.rs - Static pose descriptors and descriptor libraries
use crate::config::DetectionParameters;
use crate::joints::Finger;
use crate::metrics::HandMetrics;
use crate::orientation::{HandOrientation, PalmOrientation};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Scores a frame directly, replacing range-based scoring for a descriptor.
pub type CustomScorer = fn(&HandMetrics, &DetectionParameters) -> f64;

#[derive(Debug, Error, PartialEq)]
pub enum DescriptorError {
    #[error("descriptor name must not be empty")]
    EmptyName,
    #[error("descriptor {descriptor}: {finger} {metric} range bound {value} is not in [0, 1]")]
    BoundOutOfRange {
        descriptor: String,
        finger: &'static str,
        metric: &'static str,
        value: f64,
    },
    #[error("descriptor {descriptor}: {finger} {metric} range is inverted ({min} > {max})")]
    InvertedRange {
        descriptor: String,
        finger: &'static str,
        metric: &'static str,
        min: f64,
        max: f64,
    },
    #[error("descriptor {0}: no finger ranges, orientations or custom scorer given")]
    Unconstrained(String),
    #[error("duplicate descriptor name {0}")]
    DuplicateName(String),
}

/// Inclusive range of accepted values for one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Distance from `value` to the nearest bound, 0 inside the range.
    pub fn distance_outside(&self, value: f64) -> f64 {
        if self.contains(value) {
            0.0
        } else {
            (value - self.min).abs().min((value - self.max).abs())
        }
    }
}

/// Ranges behind the `extended` / `curled` builder shorthands.
pub const EXTENDED_EXTENSION: ValueRange = ValueRange::new(0.8, 1.0);
pub const EXTENDED_CURL: ValueRange = ValueRange::new(0.0, 0.3);
pub const CURLED_EXTENSION: ValueRange = ValueRange::new(0.0, 0.6);
pub const CURLED_CURL: ValueRange = ValueRange::new(0.6, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FingerExpectation {
    pub extension: Option<ValueRange>,
    pub curl: Option<ValueRange>,
}

/// Immutable description of one hand configuration.
#[derive(Clone)]
pub struct PoseDescriptor {
    name: String,
    description: String,
    fingers: [FingerExpectation; 5],
    palm_orientations: Vec<PalmOrientation>,
    hand_orientations: Vec<HandOrientation>,
    custom_scorer: Option<CustomScorer>,
}

impl fmt::Debug for PoseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseDescriptor")
            .field("name", &self.name)
            .field("fingers", &self.fingers)
            .field("palm_orientations", &self.palm_orientations)
            .field("hand_orientations", &self.hand_orientations)
            .field("custom_scorer", &self.custom_scorer.is_some())
            .finish()
    }
}

impl PoseDescriptor {
    pub fn builder(name: impl Into<String>) -> PoseDescriptorBuilder {
        PoseDescriptorBuilder {
            name: name.into(),
            description: String::new(),
            fingers: [FingerExpectation::default(); 5],
            palm_orientations: Vec::new(),
            hand_orientations: Vec::new(),
            custom_scorer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn finger(&self, finger: Finger) -> &FingerExpectation {
        &self.fingers[finger.index()]
    }

    /// Accepted palm orientations. Empty means any orientation.
    pub fn palm_orientations(&self) -> &[PalmOrientation] {
        &self.palm_orientations
    }

    /// Accepted hand orientations. Empty means any orientation.
    pub fn hand_orientations(&self) -> &[HandOrientation] {
        &self.hand_orientations
    }

    pub fn custom_scorer(&self) -> Option<CustomScorer> {
        self.custom_scorer
    }
}

pub struct PoseDescriptorBuilder {
    name: String,
    description: String,
    fingers: [FingerExpectation; 5],
    palm_orientations: Vec<PalmOrientation>,
    hand_orientations: Vec<HandOrientation>,
    custom_scorer: Option<CustomScorer>,
}

impl PoseDescriptorBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn extension(mut self, finger: Finger, min: f64, max: f64) -> Self {
        self.fingers[finger.index()].extension = Some(ValueRange::new(min, max));
        self
    }

    pub fn curl(mut self, finger: Finger, min: f64, max: f64) -> Self {
        self.fingers[finger.index()].curl = Some(ValueRange::new(min, max));
        self
    }

    /// Shorthand for an extended finger: high extension, low curl.
    pub fn extended(self, finger: Finger) -> Self {
        self.extension(finger, EXTENDED_EXTENSION.min, EXTENDED_EXTENSION.max)
            .curl(finger, EXTENDED_CURL.min, EXTENDED_CURL.max)
    }

    /// Shorthand for a finger folded into the palm.
    pub fn curled(self, finger: Finger) -> Self {
        self.extension(finger, CURLED_EXTENSION.min, CURLED_EXTENSION.max)
            .curl(finger, CURLED_CURL.min, CURLED_CURL.max)
    }

    pub fn palm(mut self, orientations: &[PalmOrientation]) -> Self {
        self.palm_orientations.extend_from_slice(orientations);
        self
    }

    pub fn hand(mut self, orientations: &[HandOrientation]) -> Self {
        self.hand_orientations.extend_from_slice(orientations);
        self
    }

    pub fn scorer(mut self, scorer: CustomScorer) -> Self {
        self.custom_scorer = Some(scorer);
        self
    }

    pub fn build(mut self) -> Result<PoseDescriptor, DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyName);
        }

        for finger in Finger::ALL {
            let expectation = self.fingers[finger.index()];
            for (metric, range) in [("extension", expectation.extension), ("curl", expectation.curl)] {
                if let Some(range) = range {
                    self.check_range(finger, metric, range)?;
                }
            }
        }

        let has_ranges = self
            .fingers
            .iter()
            .any(|f| f.extension.is_some() || f.curl.is_some());
        if !has_ranges
            && self.custom_scorer.is_none()
            && self.palm_orientations.is_empty()
            && self.hand_orientations.is_empty()
        {
            return Err(DescriptorError::Unconstrained(self.name));
        }

        dedup_in_order(&mut self.palm_orientations);
        dedup_in_order(&mut self.hand_orientations);

        Ok(PoseDescriptor {
            name: self.name,
            description: self.description,
            fingers: self.fingers,
            palm_orientations: self.palm_orientations,
            hand_orientations: self.hand_orientations,
            custom_scorer: self.custom_scorer,
        })
    }

    fn check_range(&self, finger: Finger, metric: &'static str, range: ValueRange) -> Result<(), DescriptorError> {
        for value in [range.min, range.max] {
            // NaN fails the contains check as well.
            if !(0.0..=1.0).contains(&value) {
                return Err(DescriptorError::BoundOutOfRange {
                    descriptor: self.name.clone(),
                    finger: finger.as_str(),
                    metric,
                    value,
                });
            }
        }
        if range.min > range.max {
            return Err(DescriptorError::InvertedRange {
                descriptor: self.name.clone(),
                finger: finger.as_str(),
                metric,
                min: range.min,
                max: range.max,
            });
        }
        Ok(())
    }
}

fn dedup_in_order<T: PartialEq + Copy>(items: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(*item);
            true
        }
    });
}

/// Ordered set of descriptors with unique names. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct DescriptorLibrary {
    descriptors: Vec<PoseDescriptor>,
}

impl DescriptorLibrary {
    pub fn new(descriptors: Vec<PoseDescriptor>) -> Result<Self, DescriptorError> {
        let mut names = HashSet::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            if !names.insert(descriptor.name()) {
                return Err(DescriptorError::DuplicateName(descriptor.name().to_string()));
            }
        }
        Ok(Self { descriptors })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenate two libraries, rejecting names present in both.
    pub fn merged(&self, other: &DescriptorLibrary) -> Result<Self, DescriptorError> {
        let mut all = self.descriptors.clone();
        all.extend(other.descriptors.iter().cloned());
        Self::new(all)
    }

    pub fn get(&self, name: &str) -> Option<&PoseDescriptor> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoseDescriptor> {
        self.descriptors.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
