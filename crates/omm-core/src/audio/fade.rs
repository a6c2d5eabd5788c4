//! Linear volume fades.
//!
//! A [`Fade`] is stepped by its owner at a fixed interval. It yields one
//! volume per step and, on the last step, hands back its continuation.
//! The continuation is moved out of the fade, so it can be observed at
//! most once; a fade dropped before its last step never completes.

use serde::{Deserialize, Serialize};

/// Default number of steps in a fade.
pub const DEFAULT_FADE_STEPS: u32 = 20;

/// What to do once a fade reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfterFade {
    Nothing,
    PlayChime(super::ChimeKind),
    Pause,
}

/// Result of stepping a fade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeStep {
    /// Intermediate volume.
    Step(f32),
    /// Final volume, exactly the target, plus the continuation.
    Last(f32, AfterFade),
}

#[derive(Debug, Clone)]
pub struct Fade {
    from: f32,
    to: f32,
    steps: u32,
    taken: u32,
    then: Option<AfterFade>,
}

impl Fade {
    /// Fade from `from` to `to` in `steps` steps. Volumes are clamped to [0, 1]
    /// and a step count of zero is treated as one.
    pub fn new(from: f32, to: f32, steps: u32) -> Self {
        Self {
            from: from.clamp(0.0, 1.0),
            to: to.clamp(0.0, 1.0),
            steps: steps.max(1),
            taken: 0,
            then: Some(AfterFade::Nothing),
        }
    }

    pub fn then(mut self, then: AfterFade) -> Self {
        self.then = Some(then);
        self
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    /// Continuation still pending on this fade, if it has not completed.
    pub fn pending(&self) -> Option<AfterFade> {
        self.then
    }

    pub fn is_finished(&self) -> bool {
        self.taken >= self.steps
    }

    /// Advance one step. Returns `None` once the fade has finished.
    pub fn step(&mut self) -> Option<FadeStep> {
        if self.is_finished() {
            return None;
        }
        self.taken += 1;

        if self.taken == self.steps {
            let then = self.then.take().unwrap_or(AfterFade::Nothing);
            return Some(FadeStep::Last(self.to, then));
        }

        let t = self.taken as f32 / self.steps as f32;
        let (lo, hi) = if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        };
        let volume = (self.from + (self.to - self.from) * t).clamp(lo, hi);
        Some(FadeStep::Step(volume))
    }
}
