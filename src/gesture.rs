use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::segment::{PoseSegment, SegmentResult, Side, Zone};
use crate::skeleton::Skeleton;

/// Frames a gesture may linger in one segment before it is abandoned.
pub const MAX_FRAMES_PER_SEGMENT: u32 = 50;

/// How many out-and-back cycles make up a wave.
pub const DEFAULT_WAVE_REPETITIONS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureType {
    WaveLeft,
    WaveRight,
    SwipeLeft,
    SwipeRight,
}

impl GestureType {
    pub const ALL: [GestureType; 4] = [
        GestureType::WaveLeft,
        GestureType::WaveRight,
        GestureType::SwipeLeft,
        GestureType::SwipeRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GestureType::WaveLeft => "wave_left",
            GestureType::WaveRight => "wave_right",
            GestureType::SwipeLeft => "swipe_left",
            GestureType::SwipeRight => "swipe_right",
        }
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        GestureType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| Error::InvalidProfile(format!("unknown gesture '{s}'")))
    }
}

/// A recognized gesture and the person who made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub gesture: GestureType,
    pub tracking_id: i32,
}

#[derive(Debug, Clone)]
pub struct GestureDefinition {
    pub gesture_type: GestureType,
    pub segments: Vec<PoseSegment>,
}

impl GestureDefinition {
    pub fn new(gesture_type: GestureType, segments: Vec<PoseSegment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::EmptyGesture(gesture_type.to_string()));
        }
        Ok(Self {
            gesture_type,
            segments,
        })
    }

    /// The stock segment chain for `gesture_type`. Waves repeat their
    /// out-and-back pair `wave_repetitions` times (at least once).
    pub fn builtin(gesture_type: GestureType, wave_repetitions: u32) -> Self {
        let reps = wave_repetitions.max(1) as usize;
        let wave = |hand: Side| {
            let out = PoseSegment::HandRaised {
                hand,
                toward: Side::Right,
            };
            let back = PoseSegment::HandRaised {
                hand,
                toward: Side::Left,
            };
            std::iter::repeat([out, back])
                .take(reps)
                .flatten()
                .collect::<Vec<_>>()
        };
        let swipe = |hand: Side, zones: [Zone; 3]| {
            zones
                .into_iter()
                .map(|zone| PoseSegment::HandForward { hand, zone })
                .collect::<Vec<_>>()
        };

        let segments = match gesture_type {
            GestureType::WaveRight => wave(Side::Right),
            GestureType::WaveLeft => wave(Side::Left),
            // right hand sweeping across the body
            GestureType::SwipeLeft => swipe(
                Side::Right,
                [Zone::RightOfBody, Zone::BetweenShoulders, Zone::LeftOfBody],
            ),
            GestureType::SwipeRight => swipe(
                Side::Left,
                [Zone::LeftOfBody, Zone::BetweenShoulders, Zone::RightOfBody],
            ),
        };

        Self {
            gesture_type,
            segments,
        }
    }
}

/// One gesture's segment-chain state machine.
#[derive(Debug, Clone)]
pub struct Gesture {
    definition: GestureDefinition,
    current_segment: usize,
    frame_count: u32,
    max_frames: u32,
}

impl Gesture {
    pub fn new(definition: GestureDefinition) -> Self {
        Self::with_max_frames(definition, MAX_FRAMES_PER_SEGMENT)
    }

    pub fn with_max_frames(definition: GestureDefinition, max_frames: u32) -> Self {
        Self {
            definition,
            current_segment: 0,
            frame_count: 0,
            max_frames: max_frames.max(1),
        }
    }

    pub fn gesture_type(&self) -> GestureType {
        self.definition.gesture_type
    }

    pub fn current_segment(&self) -> usize {
        self.current_segment
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn segment_count(&self) -> usize {
        self.definition.segments.len()
    }

    pub fn update(&mut self, skeleton: &Skeleton) -> Option<GestureEvent> {
        let Some(segment) = self.definition.segments.get(self.current_segment) else {
            self.reset();
            return None;
        };

        match segment.evaluate(skeleton) {
            SegmentResult::Succeeded => {
                if self.current_segment + 1 < self.definition.segments.len() {
                    self.current_segment += 1;
                    self.frame_count = 0;
                    None
                } else {
                    self.reset();
                    Some(GestureEvent {
                        gesture: self.definition.gesture_type,
                        tracking_id: skeleton.tracking_id,
                    })
                }
            }
            SegmentResult::Failed => {
                self.reset();
                None
            }
            SegmentResult::Undetermined => {
                self.frame_count += 1;
                if self.frame_count >= self.max_frames {
                    debug!(
                        "{}: segment {} timed out after {} frames",
                        self.definition.gesture_type, self.current_segment, self.frame_count
                    );
                    self.reset();
                }
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.current_segment = 0;
        self.frame_count = 0;
    }
}
