//! Fan-out of one skeleton stream to many gesture state machines.

use log::{debug, info};

use crate::gesture::{
    DEFAULT_WAVE_REPETITIONS, Gesture, GestureDefinition, GestureEvent, GestureType,
    MAX_FRAMES_PER_SEGMENT,
};
use crate::skeleton::Skeleton;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureSettings {
    pub max_frames_per_segment: u32,
    pub wave_repetitions: u32,
    /// Collapse repeated gesture types into a single state machine.
    pub dedupe: bool,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            max_frames_per_segment: MAX_FRAMES_PER_SEGMENT,
            wave_repetitions: DEFAULT_WAVE_REPETITIONS,
            dedupe: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GestureController {
    gestures: Vec<Gesture>,
}

impl GestureController {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(types: &[GestureType], settings: &GestureSettings) -> Self {
        let mut picked: Vec<GestureType> = Vec::with_capacity(types.len());
        for t in types {
            if settings.dedupe && picked.contains(t) {
                debug!("controller: dropping duplicate {t}");
                continue;
            }
            picked.push(*t);
        }

        let defs = picked
            .into_iter()
            .map(|t| GestureDefinition::builtin(t, settings.wave_repetitions))
            .collect();
        Self::from_definitions(defs, settings.max_frames_per_segment)
    }

    pub fn from_definitions(defs: Vec<GestureDefinition>, max_frames: u32) -> Self {
        Self {
            gestures: defs
                .into_iter()
                .map(|d| Gesture::with_max_frames(d, max_frames))
                .collect(),
        }
    }

    pub fn add(&mut self, gesture: Gesture) {
        self.gestures.push(gesture);
    }

    pub fn gestures(&self) -> &[Gesture] {
        &self.gestures
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }

    /// Feed one frame to every gesture. A recognition resets all of them;
    /// gestures after the one that fired are still updated from the reset
    /// state. Only the first recognition of a frame is reported.
    pub fn update(&mut self, skeleton: &Skeleton) -> Option<GestureEvent> {
        let mut recognized: Option<GestureEvent> = None;

        for i in 0..self.gestures.len() {
            let Some(ev) = self.gestures[i].update(skeleton) else {
                continue;
            };
            match recognized {
                None => {
                    info!(
                        "recognized {} (tracking id {})",
                        ev.gesture, ev.tracking_id
                    );
                    recognized = Some(ev);
                }
                Some(first) => {
                    debug!("dropping {} in the same frame as {}", ev.gesture, first.gesture);
                }
            }
            self.reset_all();
        }

        recognized
    }

    pub fn reset_all(&mut self) {
        debug!("controller: resetting {} gestures", self.gestures.len());
        for g in &mut self.gestures {
            g.reset();
        }
    }
}
