// src/library.rs - Built-in descriptor libraries: ASL static letters and common gestures
//
// Letters that need motion (J, Z) are not included. Letters that differ only
// in where the thumb touches, or in finger spread, use custom scorers built
// from the same range penalties plus a distance or angle term.
use crate::config::DetectionParameters;
use crate::descriptor::{
    DescriptorError, DescriptorLibrary, PoseDescriptor, PoseDescriptorBuilder, ValueRange, CURLED_CURL,
    CURLED_EXTENSION, EXTENDED_CURL, EXTENDED_EXTENSION,
};
use crate::joints::Finger;
use crate::matcher::{range_factor, ORIENTATION_PENALTY};
use crate::metrics::HandMetrics;
use crate::orientation::{HandOrientation, PalmOrientation};
use nalgebra::Vector3;
use once_cell::sync::OnceCell;

static ASL_ALPHABET: OnceCell<DescriptorLibrary> = OnceCell::new();
static GESTURES: OnceCell<DescriptorLibrary> = OnceCell::new();
static ALL: OnceCell<DescriptorLibrary> = OnceCell::new();

/// Spread between index and middle below which they count as together.
const CLOSED_SPREAD_DEG: f64 = 10.0;
/// Spread above which index and middle count as a V.
const OPEN_SPREAD_DEG: f64 = 15.0;

const SIGNING_PALM: &[PalmOrientation] = &[PalmOrientation::FacingAway];
const SIDE_PALM: &[PalmOrientation] = &[PalmOrientation::Left, PalmOrientation::Right];

pub fn asl_alphabet() -> Result<&'static DescriptorLibrary, DescriptorError> {
    ASL_ALPHABET.get_or_try_init(build_asl_alphabet)
}

pub fn gestures() -> Result<&'static DescriptorLibrary, DescriptorError> {
    GESTURES.get_or_try_init(build_gestures)
}

/// Gestures followed by letters.
pub fn all() -> Result<&'static DescriptorLibrary, DescriptorError> {
    ALL.get_or_try_init(|| gestures()?.merged(asl_alphabet()?))
}

fn build_gestures() -> Result<DescriptorLibrary, DescriptorError> {
    let non_thumb_curled =
        |b: PoseDescriptorBuilder| Finger::NON_THUMB.iter().fold(b, |b, f| b.curled(*f));

    DescriptorLibrary::new(vec![
        PoseDescriptor::builder("open-palm")
            .description("All five fingers extended, palm toward the user")
            .extended(Finger::Thumb)
            .extended(Finger::Index)
            .extended(Finger::Middle)
            .extended(Finger::Ring)
            .extended(Finger::Little)
            .palm(&[PalmOrientation::FacingUser])
            .build()?,
        non_thumb_curled(PoseDescriptor::builder("fist"))
            .description("All fingers folded, thumb wrapped")
            .extension(Finger::Thumb, 0.0, 0.8)
            .build()?,
        non_thumb_curled(PoseDescriptor::builder("thumbs-up"))
            .description("Fingers folded, thumb straight")
            .extension(Finger::Thumb, 0.85, 1.0)
            .build()?,
        PoseDescriptor::builder("point")
            .description("Index extended, other fingers folded")
            .extended(Finger::Index)
            .curled(Finger::Middle)
            .curled(Finger::Ring)
            .curled(Finger::Little)
            .build()?,
        PoseDescriptor::builder("pinch")
            .description("Thumb tip touching index tip")
            .scorer(score_pinch)
            .build()?,
    ])
}

fn build_asl_alphabet() -> Result<DescriptorLibrary, DescriptorError> {
    use Finger::*;

    DescriptorLibrary::new(vec![
        PoseDescriptor::builder("A")
            .description("Fist with the thumb straight along the side of the index")
            .curled(Index)
            .curled(Middle)
            .curled(Ring)
            .curled(Little)
            .extension(Thumb, 0.85, 1.0)
            .palm(&[PalmOrientation::FacingAway, PalmOrientation::Left, PalmOrientation::Right])
            .build()?,
        PoseDescriptor::builder("B")
            .description("Flat hand, fingers together, thumb across the palm")
            .extended(Index)
            .extended(Middle)
            .extended(Ring)
            .extended(Little)
            .extension(Thumb, 0.4, 0.85)
            .palm(SIGNING_PALM)
            .hand(&[HandOrientation::Upright])
            .build()?,
        PoseDescriptor::builder("C")
            .description("Fingers and thumb curved into a C")
            .extension(Index, 0.5, 0.85)
            .curl(Index, 0.25, 0.7)
            .extension(Middle, 0.5, 0.85)
            .curl(Middle, 0.25, 0.7)
            .extension(Ring, 0.5, 0.85)
            .curl(Ring, 0.25, 0.7)
            .extension(Little, 0.5, 0.85)
            .curl(Little, 0.25, 0.7)
            .extension(Thumb, 0.7, 1.0)
            .palm(SIDE_PALM)
            .build()?,
        PoseDescriptor::builder("D")
            .description("Index up, other fingers curled onto the thumb")
            .extended(Index)
            .curled(Middle)
            .curled(Ring)
            .curled(Little)
            .extension(Thumb, 0.4, 0.8)
            .palm(SIGNING_PALM)
            .build()?,
        PoseDescriptor::builder("E")
            .description("Fingertips bent down over the tucked thumb")
            .extension(Index, 0.35, 0.65)
            .curl(Index, 0.5, 0.9)
            .extension(Middle, 0.35, 0.65)
            .curl(Middle, 0.5, 0.9)
            .extension(Ring, 0.35, 0.65)
            .curl(Ring, 0.5, 0.9)
            .extension(Little, 0.35, 0.65)
            .curl(Little, 0.5, 0.9)
            .extension(Thumb, 0.3, 0.7)
            .palm(SIGNING_PALM)
            .build()?,
        PoseDescriptor::builder("F")
            .description("Thumb and index form a circle, other fingers up")
            .scorer(score_f)
            .build()?,
        PoseDescriptor::builder("I")
            .description("Little finger up, others in a fist")
            .curled(Index)
            .curled(Middle)
            .curled(Ring)
            .extended(Little)
            .extension(Thumb, 0.0, 0.85)
            .palm(SIGNING_PALM)
            .build()?,
        PoseDescriptor::builder("L")
            .description("Index up and thumb out at a right angle")
            .extended(Index)
            .curled(Middle)
            .curled(Ring)
            .curled(Little)
            .extension(Thumb, 0.85, 1.0)
            .palm(SIGNING_PALM)
            .hand(&[HandOrientation::Upright])
            .build()?,
        PoseDescriptor::builder("O")
            .description("All fingertips meet the thumb tip")
            .scorer(score_o)
            .build()?,
        PoseDescriptor::builder("S")
            .description("Fist with the thumb across the fingers")
            .curled(Index)
            .curled(Middle)
            .curled(Ring)
            .curled(Little)
            .extension(Thumb, 0.4, 0.8)
            .palm(SIGNING_PALM)
            .build()?,
        PoseDescriptor::builder("U")
            .description("Index and middle up and together")
            .scorer(score_u)
            .build()?,
        PoseDescriptor::builder("V")
            .description("Index and middle up and spread")
            .scorer(score_v)
            .build()?,
        PoseDescriptor::builder("W")
            .description("Index, middle and ring up")
            .extended(Index)
            .extended(Middle)
            .extended(Ring)
            .curled(Little)
            .extension(Thumb, 0.0, 0.85)
            .palm(SIGNING_PALM)
            .build()?,
        PoseDescriptor::builder("X")
            .description("Index hooked, other fingers in a fist")
            .extension(Index, 0.5, 0.8)
            .curl(Index, 0.4, 0.9)
            .curled(Middle)
            .curled(Ring)
            .curled(Little)
            .extension(Thumb, 0.0, 0.85)
            .palm(SIGNING_PALM)
            .build()?,
        PoseDescriptor::builder("Y")
            .description("Thumb and little finger out, others folded")
            .curled(Index)
            .curled(Middle)
            .curled(Ring)
            .extended(Little)
            .extension(Thumb, 0.85, 1.0)
            .palm(SIGNING_PALM)
            .build()?,
    ])
}

fn extended_factor(metrics: &HandMetrics, finger: Finger) -> f64 {
    let m = metrics.finger(finger);
    range_factor(&EXTENDED_EXTENSION, m.extension) * range_factor(&EXTENDED_CURL, m.curl)
}

fn curled_factor(metrics: &HandMetrics, finger: Finger) -> f64 {
    let m = metrics.finger(finger);
    range_factor(&CURLED_EXTENSION, m.extension) * range_factor(&CURLED_CURL, m.curl)
}

fn palm_factor(metrics: &HandMetrics, allowed: &[PalmOrientation]) -> f64 {
    match metrics.orientation.palm {
        Some(palm) if allowed.contains(&palm) => 1.0,
        _ => ORIENTATION_PENALTY,
    }
}

/// 1.0 while the tips are within `threshold`, falling to 0 at twice that.
fn touch_factor(distance: Option<f64>, threshold: f64) -> f64 {
    match distance {
        Some(d) if d <= threshold => 1.0,
        Some(d) if threshold > 0.0 => (1.0 - (d - threshold) / threshold).max(0.0),
        _ => 0.0,
    }
}

/// Angle between index and middle finger directions in degrees, `None`
/// when either direction is degenerate.
fn index_middle_spread(metrics: &HandMetrics) -> Option<f64> {
    let a = metrics.finger(Finger::Index).direction;
    let b = metrics.finger(Finger::Middle).direction;
    if a == Vector3::zeros() || b == Vector3::zeros() {
        return None;
    }
    Some(a.dot(&b).clamp(-1.0, 1.0).acos().to_degrees())
}

fn score_pinch(metrics: &HandMetrics, params: &DetectionParameters) -> f64 {
    touch_factor(metrics.thumb_tip_distance(Finger::Index), params.distance_threshold)
}

fn score_f(metrics: &HandMetrics, params: &DetectionParameters) -> f64 {
    touch_factor(metrics.thumb_tip_distance(Finger::Index), params.distance_threshold)
        * extended_factor(metrics, Finger::Middle)
        * extended_factor(metrics, Finger::Ring)
        * extended_factor(metrics, Finger::Little)
        * palm_factor(metrics, SIGNING_PALM)
}

fn score_o(metrics: &HandMetrics, params: &DetectionParameters) -> f64 {
    let rounded = ValueRange::new(0.3, 0.8);
    let fingers: f64 = Finger::NON_THUMB
        .iter()
        .map(|f| range_factor(&rounded, metrics.finger(*f).extension))
        .product();

    touch_factor(metrics.thumb_tip_distance(Finger::Index), params.distance_threshold)
        * fingers
        * palm_factor(metrics, &[PalmOrientation::FacingAway, PalmOrientation::Left, PalmOrientation::Right])
}

fn two_finger_shape(metrics: &HandMetrics) -> f64 {
    extended_factor(metrics, Finger::Index)
        * extended_factor(metrics, Finger::Middle)
        * curled_factor(metrics, Finger::Ring)
        * curled_factor(metrics, Finger::Little)
        * palm_factor(metrics, SIGNING_PALM)
}

fn score_u(metrics: &HandMetrics, _params: &DetectionParameters) -> f64 {
    let spread = match index_middle_spread(metrics) {
        Some(s) if s <= CLOSED_SPREAD_DEG => 1.0,
        Some(s) => (1.0 - (s - CLOSED_SPREAD_DEG) / OPEN_SPREAD_DEG).max(0.0),
        None => 0.0,
    };
    two_finger_shape(metrics) * spread
}

fn score_v(metrics: &HandMetrics, _params: &DetectionParameters) -> f64 {
    let spread = match index_middle_spread(metrics) {
        Some(s) if s >= OPEN_SPREAD_DEG => 1.0,
        Some(s) => s / OPEN_SPREAD_DEG,
        None => 0.0,
    };
    two_finger_shape(metrics) * spread
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::{HandJointSet, Handedness};
    use crate::matcher::classify;
    use crate::testing::{fist, hand_with, open_hand, pointing, rotated, splayed, thumbs_up, victory, ThumbShape};
    use nalgebra::UnitQuaternion;
    use std::f64::consts::PI;

    fn palm_away(hand: &HandJointSet) -> HandJointSet {
        rotated(hand, UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI))
    }

    fn top(hand: &HandJointSet, library: &DescriptorLibrary) -> Option<String> {
        classify(hand, library, &DetectionParameters::default())
            .primary
            .map(|m| m.name)
    }

    #[test]
    fn test_libraries_build() {
        let asl = asl_alphabet().unwrap();
        assert_eq!(asl.len(), 15);
        assert!(asl.get("J").is_none());
        let gestures = gestures().unwrap();
        assert_eq!(gestures.names(), vec!["open-palm", "fist", "thumbs-up", "point", "pinch"]);
        assert_eq!(all().unwrap().len(), asl.len() + gestures.len());
    }

    #[test]
    fn test_libraries_are_built_once() {
        let a = asl_alphabet().unwrap() as *const DescriptorLibrary;
        let b = asl_alphabet().unwrap() as *const DescriptorLibrary;
        assert_eq!(a, b);
    }

    #[test]
    fn test_gesture_library_on_fixtures() {
        let lib = gestures().unwrap();
        for handedness in [Handedness::Right, Handedness::Left] {
            assert_eq!(top(&open_hand(handedness), lib).as_deref(), Some("open-palm"));
            assert_eq!(top(&fist(handedness), lib).as_deref(), Some("fist"));
            assert_eq!(top(&thumbs_up(handedness), lib).as_deref(), Some("thumbs-up"));
            assert_eq!(top(&pointing(handedness), lib).as_deref(), Some("point"));
        }
    }

    #[test]
    fn test_pinch_uses_distance_threshold() {
        let lib = gestures().unwrap();
        let hand = hand_with(Handedness::Right, [45.0, 0.0, 0.0, 0.0], ThumbShape::TouchingIndex);
        assert_eq!(top(&hand, lib).as_deref(), Some("pinch"));

        // Tips are about 1 cm apart; a 4 mm threshold rejects them.
        let tight = DetectionParameters {
            distance_threshold: 0.004,
            ..Default::default()
        };
        let result = classify(&hand, lib, &tight);
        let pinch = result.evaluations.iter().find(|e| e.name == "pinch").unwrap();
        assert_eq!(pinch.confidence, 0.0);
    }

    #[test]
    fn test_asl_letters_on_fixtures() {
        let asl = asl_alphabet().unwrap();

        let l_shape = palm_away(&hand_with(Handedness::Right, [0.0, 90.0, 90.0, 90.0], ThumbShape::Open));
        assert_eq!(top(&l_shape, asl).as_deref(), Some("L"));

        let u_shape = palm_away(&victory(Handedness::Right));
        assert_eq!(top(&u_shape, asl).as_deref(), Some("U"));

        let spread = splayed(&splayed(&victory(Handedness::Right), Finger::Index, -20.0), Finger::Middle, 20.0);
        assert_eq!(top(&palm_away(&spread), asl).as_deref(), Some("V"));

        let f_shape = palm_away(&hand_with(Handedness::Right, [45.0, 0.0, 0.0, 0.0], ThumbShape::TouchingIndex));
        assert_eq!(top(&f_shape, asl).as_deref(), Some("F"));
    }

    #[test]
    fn test_letters_penalise_wrong_palm() {
        let asl = asl_alphabet().unwrap();
        let facing_user = hand_with(Handedness::Right, [0.0, 90.0, 90.0, 90.0], ThumbShape::Open);
        let result = classify(&facing_user, asl, &DetectionParameters::default());
        let l = result.evaluations.iter().find(|e| e.name == "L").unwrap();
        assert!(!l.palm_orientation_matched);
        assert!((l.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_touch_factor() {
        assert_eq!(touch_factor(Some(0.01), 0.03), 1.0);
        assert!((touch_factor(Some(0.045), 0.03) - 0.5).abs() < 1e-9);
        assert_eq!(touch_factor(Some(0.09), 0.03), 0.0);
        assert_eq!(touch_factor(None, 0.03), 0.0);
    }
}
