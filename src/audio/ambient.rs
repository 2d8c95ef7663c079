// Ambient background bed sharing the assistant's output clock
//
// The bed never stops for voice playback; it ducks. Both the ambient bed and
// the assistant's speech may be audible at once, which is the intended
// behavior, so there is no mutual exclusion here, only cooperative gain
// ramps.

use std::sync::Arc;

use super::playback::OutputClock;

/// Cruising gain once the bed has faded in
const CRUISE_GAIN: f32 = 0.1;
/// Ducked gain while the assistant is speaking or listening
const DUCKED_GAIN: f32 = 0.02;
/// Fade-in duration at start, seconds
const FADE_IN_SECS: f64 = 2.0;
/// Time constant of the duck ramp, seconds
const DUCK_TAU: f64 = 0.2;
/// Time constant of the recovery ramp, seconds
const RESUME_TAU: f64 = 0.5;

#[derive(Clone, Copy)]
enum Ramp {
    /// Linear ramp from `from` to `to` over [start, start + duration]
    Linear {
        start: f64,
        duration: f64,
        from: f32,
        to: f32,
    },
    /// Exponential approach toward `target` with time constant `tau`
    Target {
        start: f64,
        from: f32,
        target: f32,
        tau: f64,
    },
}

/// Background audio bed with cooperative volume ducking
pub struct AmbientBed {
    clock: Arc<dyn OutputClock>,
    ramp: Ramp,
}

impl AmbientBed {
    /// Create the bed and begin its fade-in to cruising volume
    pub fn new(clock: Arc<dyn OutputClock>) -> Self {
        let now = clock.now_secs();
        Self {
            clock,
            ramp: Ramp::Linear {
                start: now,
                duration: FADE_IN_SECS,
                from: 0.0,
                to: CRUISE_GAIN,
            },
        }
    }

    /// Duck the bed under assistant speech
    pub fn pause_for_voice(&mut self) {
        let now = self.clock.now_secs();
        self.ramp = Ramp::Target {
            start: now,
            from: self.gain_at(now),
            target: DUCKED_GAIN,
            tau: DUCK_TAU,
        };
    }

    /// Ramp back to cruising volume after the assistant goes quiet
    pub fn resume_after_voice(&mut self) {
        let now = self.clock.now_secs();
        self.ramp = Ramp::Target {
            start: now,
            from: self.gain_at(now),
            target: CRUISE_GAIN,
            tau: RESUME_TAU,
        };
    }

    /// Gain value at a given clock time
    pub fn gain_at(&self, t: f64) -> f32 {
        match self.ramp {
            Ramp::Linear {
                start,
                duration,
                from,
                to,
            } => {
                if t <= start {
                    from
                } else if t >= start + duration {
                    to
                } else {
                    let progress = ((t - start) / duration) as f32;
                    from + (to - from) * progress
                }
            }
            Ramp::Target {
                start,
                from,
                target,
                tau,
            } => {
                if t <= start {
                    from
                } else {
                    let decay = (-(t - start) / tau).exp() as f32;
                    target + (from - target) * decay
                }
            }
        }
    }

    pub fn current_gain(&self) -> f32 {
        self.gain_at(self.clock.now_secs())
    }
}
