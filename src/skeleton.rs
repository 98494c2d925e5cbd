//! Per-frame body data as delivered by the frame source.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Allowance for the part of the head above the head joint, in meters.
const HEAD_DIVERGENCE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    HipCenter,
    Spine,
    ShoulderCenter,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointTrackingState {
    #[default]
    Tracked,
    Inferred,
    NotTracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonTrackingState {
    #[default]
    Tracked,
    NotTracked,
    PositionOnly,
}

/// Sensor-space position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    #[serde(rename = "type")]
    pub joint_type: JointType,
    pub position: Position,
    #[serde(default)]
    pub tracking_state: JointTrackingState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub tracking_id: i32,
    #[serde(default)]
    pub tracking_state: SkeletonTrackingState,
    #[serde(with = "joint_list")]
    pub joints: HashMap<JointType, Joint>,
}

impl Skeleton {
    pub fn new(tracking_id: i32) -> Self {
        Self {
            tracking_id,
            tracking_state: SkeletonTrackingState::Tracked,
            joints: HashMap::new(),
        }
    }

    /// Builder-style insert of a tracked joint.
    pub fn with_joint(mut self, joint_type: JointType, x: f32, y: f32, z: f32) -> Self {
        self.set_joint(joint_type, Position::new(x, y, z), JointTrackingState::Tracked);
        self
    }

    pub fn set_joint(&mut self, joint_type: JointType, position: Position, state: JointTrackingState) {
        self.joints.insert(
            joint_type,
            Joint {
                joint_type,
                position,
                tracking_state: state,
            },
        );
    }

    pub fn joint(&self, joint_type: JointType) -> Option<&Joint> {
        self.joints.get(&joint_type)
    }

    pub fn position(&self, joint_type: JointType) -> Option<Position> {
        self.joints.get(&joint_type).map(|j| j.position)
    }

    pub fn is_tracked(&self) -> bool {
        self.tracking_state == SkeletonTrackingState::Tracked
    }

    pub fn tracked_joint_count(&self, joints: &[JointType]) -> usize {
        joints
            .iter()
            .filter(|j| {
                self.joint(**j)
                    .is_some_and(|j| j.tracking_state == JointTrackingState::Tracked)
            })
            .count()
    }

    /// Head-to-foot height estimate: spine chain plus the better tracked leg.
    pub fn estimate_height(&self) -> Option<f32> {
        use JointType::*;

        let torso = self.chain(&[Head, ShoulderCenter, Spine, HipCenter])?;
        let left = [HipLeft, KneeLeft, AnkleLeft, FootLeft];
        let right = [HipRight, KneeRight, AnkleRight, FootRight];

        // ties go to the right leg
        let leg = if self.tracked_joint_count(&left) > self.tracked_joint_count(&right) {
            self.chain(&left)?
        } else {
            self.chain(&right)?
        };

        Some(torso + leg + HEAD_DIVERGENCE)
    }

    fn chain(&self, joints: &[JointType]) -> Option<f32> {
        let points = joints
            .iter()
            .map(|j| self.position(*j))
            .collect::<Option<Vec<_>>>()?;
        Some(chain_length(&points))
    }
}

/// Summed length of the polyline through `points`.
pub fn chain_length(points: &[Position]) -> f32 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

// Joints travel as a list on the wire; each entry names its own type.
mod joint_list {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(joints: &HashMap<JointType, Joint>, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut list: Vec<&Joint> = joints.values().collect();
        list.sort_by_key(|j| j.joint_type as u8);
        list.serialize(ser)
    }

    pub fn deserialize<'de, D>(de: D) -> Result<HashMap<JointType, Joint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<Joint>::deserialize(de)?;
        Ok(list.into_iter().map(|j| (j.joint_type, j)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use JointType::*;

    fn standing() -> Skeleton {
        Skeleton::new(7)
            .with_joint(Head, 0.0, 1.6, 2.0)
            .with_joint(ShoulderCenter, 0.0, 1.4, 2.0)
            .with_joint(Spine, 0.0, 1.1, 2.0)
            .with_joint(HipCenter, 0.0, 0.9, 2.0)
            .with_joint(HipLeft, -0.1, 0.9, 2.0)
            .with_joint(KneeLeft, -0.1, 0.5, 2.0)
            .with_joint(AnkleLeft, -0.1, 0.1, 2.0)
            .with_joint(FootLeft, -0.1, 0.0, 2.0)
            .with_joint(HipRight, 0.1, 0.9, 2.0)
            .with_joint(KneeRight, 0.1, 0.5, 2.0)
            .with_joint(AnkleRight, 0.1, 0.1, 2.0)
            .with_joint(FootRight, 0.1, 0.0, 2.0)
    }

    #[test]
    fn height_sums_torso_and_leg() {
        let h = standing().estimate_height().unwrap();
        // torso 0.7 + leg 0.9 + head allowance 0.1
        assert!((h - 1.7).abs() < 1e-4, "got {h}");
    }

    #[test]
    fn height_prefers_better_tracked_leg() {
        let mut s = standing();
        s.set_joint(KneeRight, Position::new(0.1, 0.2, 2.0), JointTrackingState::Inferred);
        let h = s.estimate_height().unwrap();
        assert!((h - 1.7).abs() < 1e-4, "left leg should be used, got {h}");
    }

    #[test]
    fn height_needs_all_joints() {
        let mut s = standing();
        s.joints.remove(&Spine);
        assert_eq!(s.estimate_height(), None);
    }

    #[test]
    fn decodes_joint_list() {
        let txt = r#"{
            "tracking_id": 3,
            "joints": [
                {"type": "hand_right", "position": {"x": 0.4, "y": 1.2, "z": 1.8}},
                {"type": "elbow_right", "position": {"x": 0.3, "y": 1.0, "z": 1.9},
                 "tracking_state": "inferred"}
            ]
        }"#;
        let s: Skeleton = serde_json::from_str(txt).unwrap();
        assert_eq!(s.tracking_id, 3);
        assert!(s.is_tracked());
        assert_eq!(s.position(HandRight), Some(Position::new(0.4, 1.2, 1.8)));
        assert_eq!(
            s.joint(ElbowRight).map(|j| j.tracking_state),
            Some(JointTrackingState::Inferred)
        );
        assert_eq!(s.tracked_joint_count(&[HandRight, ElbowRight, Head]), 1);
    }
}
