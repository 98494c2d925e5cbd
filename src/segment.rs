//! Pose segments: single stages of a multi-stage gesture.

use std::fmt;
use std::sync::Arc;

use crate::skeleton::{JointType, Position, Skeleton};

/// Outcome of evaluating one segment against one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentResult {
    /// The pose holds; move on to the next segment.
    Succeeded,
    /// A disqualifying pose; the gesture starts over.
    Failed,
    /// Inside the probe region but not there yet; keep waiting.
    Undetermined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Horizontal band relative to the shoulders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    LeftOfBody,
    BetweenShoulders,
    RightOfBody,
}

pub type SegmentFn = Arc<dyn Fn(&Skeleton) -> SegmentResult + Send + Sync>;

#[derive(Clone)]
pub enum PoseSegment {
    /// Hand above its elbow and displaced toward `toward` on the x axis.
    HandRaised { hand: Side, toward: Side },
    /// Hand in front of its elbow, between hip and head, inside `zone`.
    HandForward { hand: Side, zone: Zone },
    Custom(SegmentFn),
}

impl PoseSegment {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Skeleton) -> SegmentResult + Send + Sync + 'static,
    {
        PoseSegment::Custom(Arc::new(f))
    }

    pub fn evaluate(&self, skeleton: &Skeleton) -> SegmentResult {
        match self {
            PoseSegment::HandRaised { hand, toward } => {
                hand_raised(skeleton, *hand, *toward).unwrap_or(SegmentResult::Failed)
            }
            PoseSegment::HandForward { hand, zone } => {
                hand_forward(skeleton, *hand, *zone).unwrap_or(SegmentResult::Failed)
            }
            PoseSegment::Custom(f) => f(skeleton),
        }
    }
}

impl fmt::Debug for PoseSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseSegment::HandRaised { hand, toward } => f
                .debug_struct("HandRaised")
                .field("hand", hand)
                .field("toward", toward)
                .finish(),
            PoseSegment::HandForward { hand, zone } => f
                .debug_struct("HandForward")
                .field("hand", hand)
                .field("zone", zone)
                .finish(),
            PoseSegment::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn hand_and_elbow(side: Side) -> (JointType, JointType) {
    match side {
        Side::Left => (JointType::HandLeft, JointType::ElbowLeft),
        Side::Right => (JointType::HandRight, JointType::ElbowRight),
    }
}

// None means a referenced joint is missing from the frame.
fn hand_raised(s: &Skeleton, hand: Side, toward: Side) -> Option<SegmentResult> {
    let (hand_j, elbow_j) = hand_and_elbow(hand);
    let h = s.position(hand_j)?;
    let e = s.position(elbow_j)?;

    // hand dropped
    if h.y <= e.y {
        return Some(SegmentResult::Failed);
    }

    let reached = match toward {
        Side::Right => h.x > e.x,
        Side::Left => h.x < e.x,
    };
    Some(if reached {
        SegmentResult::Succeeded
    } else {
        SegmentResult::Undetermined
    })
}

fn hand_forward(s: &Skeleton, hand: Side, zone: Zone) -> Option<SegmentResult> {
    let (hand_j, elbow_j) = hand_and_elbow(hand);
    let h = s.position(hand_j)?;
    let e = s.position(elbow_j)?;
    let head = s.position(JointType::Head)?;
    let hip = s.position(JointType::HipCenter)?;

    let in_front = h.z < e.z;
    let at_torso_height = h.y < head.y && h.y > hip.y;
    if !(in_front && at_torso_height) {
        return Some(SegmentResult::Failed);
    }

    let reached = in_zone(s, &h, zone)?;
    Some(if reached {
        SegmentResult::Succeeded
    } else {
        SegmentResult::Undetermined
    })
}

fn in_zone(s: &Skeleton, h: &Position, zone: Zone) -> Option<bool> {
    Some(match zone {
        Zone::LeftOfBody => h.x < s.position(JointType::ShoulderLeft)?.x,
        Zone::RightOfBody => h.x > s.position(JointType::ShoulderRight)?.x,
        Zone::BetweenShoulders => {
            let l = s.position(JointType::ShoulderLeft)?;
            let r = s.position(JointType::ShoulderRight)?;
            h.x > l.x && h.x < r.x
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::JointType::*;

    fn arm(hand: (f32, f32, f32), elbow: (f32, f32, f32)) -> Skeleton {
        Skeleton::new(1)
            .with_joint(HandRight, hand.0, hand.1, hand.2)
            .with_joint(ElbowRight, elbow.0, elbow.1, elbow.2)
            .with_joint(Head, 0.0, 1.6, 2.0)
            .with_joint(HipCenter, 0.0, 0.9, 2.0)
            .with_joint(ShoulderLeft, -0.2, 1.4, 2.0)
            .with_joint(ShoulderRight, 0.2, 1.4, 2.0)
    }

    #[test]
    fn raised_hand_three_way() {
        let seg = PoseSegment::HandRaised {
            hand: Side::Right,
            toward: Side::Right,
        };
        let ok = arm((0.5, 1.4, 2.0), (0.4, 1.1, 2.0));
        let waiting = arm((0.3, 1.4, 2.0), (0.4, 1.1, 2.0));
        let dropped = arm((0.5, 0.9, 2.0), (0.4, 1.1, 2.0));

        assert_eq!(seg.evaluate(&ok), SegmentResult::Succeeded);
        assert_eq!(seg.evaluate(&waiting), SegmentResult::Undetermined);
        assert_eq!(seg.evaluate(&dropped), SegmentResult::Failed);
    }

    #[test]
    fn raised_hand_toward_left() {
        let seg = PoseSegment::HandRaised {
            hand: Side::Right,
            toward: Side::Left,
        };
        let s = arm((0.3, 1.4, 2.0), (0.4, 1.1, 2.0));
        assert_eq!(seg.evaluate(&s), SegmentResult::Succeeded);
    }

    #[test]
    fn forward_zones() {
        let right = PoseSegment::HandForward {
            hand: Side::Right,
            zone: Zone::RightOfBody,
        };
        let middle = PoseSegment::HandForward {
            hand: Side::Right,
            zone: Zone::BetweenShoulders,
        };
        let left = PoseSegment::HandForward {
            hand: Side::Right,
            zone: Zone::LeftOfBody,
        };

        let s = arm((0.0, 1.2, 1.6), (0.2, 1.1, 1.9));
        assert_eq!(middle.evaluate(&s), SegmentResult::Succeeded);
        assert_eq!(right.evaluate(&s), SegmentResult::Undetermined);
        assert_eq!(left.evaluate(&s), SegmentResult::Undetermined);

        let s = arm((-0.4, 1.2, 1.6), (0.0, 1.1, 1.9));
        assert_eq!(left.evaluate(&s), SegmentResult::Succeeded);
    }

    #[test]
    fn forward_fails_behind_elbow_or_out_of_band() {
        let seg = PoseSegment::HandForward {
            hand: Side::Right,
            zone: Zone::RightOfBody,
        };
        // hand behind the elbow
        assert_eq!(
            seg.evaluate(&arm((0.5, 1.2, 2.1), (0.3, 1.1, 1.9))),
            SegmentResult::Failed
        );
        // hand above head
        assert_eq!(
            seg.evaluate(&arm((0.5, 1.8, 1.6), (0.3, 1.1, 1.9))),
            SegmentResult::Failed
        );
        // hand below hip
        assert_eq!(
            seg.evaluate(&arm((0.5, 0.7, 1.6), (0.3, 1.1, 1.9))),
            SegmentResult::Failed
        );
    }

    #[test]
    fn missing_joint_fails() {
        let seg = PoseSegment::HandRaised {
            hand: Side::Left,
            toward: Side::Right,
        };
        let s = arm((0.5, 1.4, 2.0), (0.4, 1.1, 2.0));
        assert_eq!(seg.evaluate(&s), SegmentResult::Failed);
    }

    #[test]
    fn custom_segment() {
        let seg = PoseSegment::custom(|s| {
            if s.tracking_id > 0 {
                SegmentResult::Succeeded
            } else {
                SegmentResult::Undetermined
            }
        });
        assert_eq!(seg.evaluate(&Skeleton::new(2)), SegmentResult::Succeeded);
        assert_eq!(seg.evaluate(&Skeleton::new(0)), SegmentResult::Undetermined);
        assert_eq!(format!("{seg:?}"), "Custom(..)");
    }
}
