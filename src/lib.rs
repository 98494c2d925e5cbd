//! Skeleton gesture recognition and polygon hit-testing.
//!
//! The gesture side chains pose segments into per-gesture state machines
//! driven one skeleton frame at a time. The geometry side answers whether two
//! hand-drawn polygons touch.

pub mod collider;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod gesture;
pub mod segment;
pub mod session;
pub mod skeleton;

pub use collider::{PolygonCollider, are_intersecting};
pub use config::{Profile, ProfileStore, Thresholds};
pub use controller::{GestureController, GestureSettings};
pub use error::{Error, Result};
pub use geometry::{Point, Rect, Size};
pub use gesture::{Gesture, GestureDefinition, GestureEvent, GestureType, MAX_FRAMES_PER_SEGMENT};
pub use segment::{PoseSegment, SegmentResult, Side, Zone};
pub use session::Sessions;
pub use skeleton::{Joint, JointTrackingState, JointType, Position, Skeleton, SkeletonTrackingState};
