//! One controller per tracked person.

use log::debug;
use std::collections::HashMap;

use crate::controller::GestureController;
use crate::gesture::GestureEvent;
use crate::skeleton::Skeleton;

/// Frames after which a person who stopped appearing is forgotten.
pub const SESSION_IDLE_FRAMES: u64 = 300;

#[derive(Debug, Clone)]
struct Session {
    controller: GestureController,
    last_seen: u64,
}

/// Routes skeletons to per-tracking-id copies of a template controller so
/// two people never advance each other's gestures.
#[derive(Debug, Clone)]
pub struct Sessions {
    template: GestureController,
    sessions: HashMap<i32, Session>,
    frame: u64,
    idle_frames: u64,
}

impl Sessions {
    pub fn new(template: GestureController) -> Self {
        Self {
            template,
            sessions: HashMap::new(),
            frame: 0,
            idle_frames: SESSION_IDLE_FRAMES,
        }
    }

    pub fn with_idle_frames(mut self, idle_frames: u64) -> Self {
        self.idle_frames = idle_frames;
        self
    }

    /// Skeletons that are not fully tracked are counted but not evaluated.
    pub fn update(&mut self, skeleton: &Skeleton) -> Option<GestureEvent> {
        self.frame += 1;
        self.prune();
        if !skeleton.is_tracked() {
            return None;
        }

        let frame = self.frame;
        let template = &self.template;
        let session = self
            .sessions
            .entry(skeleton.tracking_id)
            .or_insert_with(|| {
                debug!("session: new tracking id {}", skeleton.tracking_id);
                Session {
                    controller: template.clone(),
                    last_seen: frame,
                }
            });
        session.last_seen = frame;
        session.controller.update(skeleton)
    }

    /// Swap in a new template; existing sessions are dropped.
    pub fn replace_template(&mut self, template: GestureController) {
        self.template = template;
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn controller(&self, tracking_id: i32) -> Option<&GestureController> {
        self.sessions.get(&tracking_id).map(|s| &s.controller)
    }

    fn prune(&mut self) {
        let (now, idle) = (self.frame, self.idle_frames);
        self.sessions.retain(|id, s| {
            let keep = now - s.last_seen <= idle;
            if !keep {
                debug!("session: dropping idle tracking id {id}");
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::GestureSettings;
    use crate::gesture::GestureType;
    use crate::skeleton::{JointType::*, SkeletonTrackingState};

    fn wave_frame(id: i32, hand_x: f32) -> Skeleton {
        Skeleton::new(id)
            .with_joint(HandRight, hand_x, 1.4, 2.0)
            .with_joint(ElbowRight, 0.3, 1.1, 2.0)
    }

    fn one_wave() -> GestureController {
        let settings = GestureSettings {
            wave_repetitions: 1,
            ..GestureSettings::default()
        };
        GestureController::new(&[GestureType::WaveRight], &settings)
    }

    #[test]
    fn people_do_not_share_progress() {
        let mut s = Sessions::new(one_wave());
        assert_eq!(s.update(&wave_frame(1, 0.4)), None);
        // second person's inward swing must not complete the first person's wave
        assert_eq!(s.update(&wave_frame(2, 0.2)), None);
        assert_eq!(s.len(), 2);

        let ev = s.update(&wave_frame(1, 0.2)).unwrap();
        assert_eq!(ev.tracking_id, 1);
    }

    #[test]
    fn untracked_skeletons_ignored() {
        let mut s = Sessions::new(one_wave());
        let mut sk = wave_frame(3, 0.4);
        sk.tracking_state = SkeletonTrackingState::PositionOnly;
        assert_eq!(s.update(&sk), None);
        assert!(s.is_empty());
        assert_eq!(s.frames(), 1);
    }

    #[test]
    fn idle_sessions_pruned() {
        let mut s = Sessions::new(one_wave()).with_idle_frames(2);
        s.update(&wave_frame(1, 0.4));
        s.update(&wave_frame(2, 0.4));
        s.update(&wave_frame(2, 0.4));
        assert!(s.controller(1).is_some());
        s.update(&wave_frame(2, 0.4));
        assert!(s.controller(1).is_none());
        assert!(s.controller(2).is_some());
    }
}
