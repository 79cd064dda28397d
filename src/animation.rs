//! Value tweening: easing curves, clocks and the cancellable animator.
//!
//! The animator is a plain state machine. Callers feed it timestamps through
//! [`Animator::tick`] and apply the returned frame; nothing here schedules
//! work on its own, which keeps the whole pipeline testable with a
//! [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

// =============================================================================
// Easing
// =============================================================================

/// Timing curve mapping linear progress `t` in `[0, 1]` to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    EaseOut,
    EaseIn,
    EaseInOut,
    Bounce,
    Elastic,
    BackIn,
    BackOut,
}

impl Easing {
    /// Look up an easing by any of its accepted names.
    ///
    /// # Example
    /// ```
    /// use svg_gauge::animation::Easing;
    ///
    /// assert_eq!(Easing::from_name(">"), Some(Easing::EaseOut));
    /// assert_eq!(Easing::from_name("back-in"), Some(Easing::BackIn));
    /// assert_eq!(Easing::from_name("wobble"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" | "-" => Some(Easing::Linear),
            ">" | "easeOut" | "ease-out" => Some(Easing::EaseOut),
            "<" | "easeIn" | "ease-in" => Some(Easing::EaseIn),
            "<>" | "easeInOut" | "ease-in-out" => Some(Easing::EaseInOut),
            "bounce" => Some(Easing::Bounce),
            "elastic" => Some(Easing::Elastic),
            "backIn" | "back-in" => Some(Easing::BackIn),
            "backOut" | "back-out" => Some(Easing::BackOut),
            _ => None,
        }
    }

    /// Evaluate the curve. `t` is clamped to `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOut => t.powf(0.48),
            Easing::EaseIn => t.powf(1.7),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::Bounce => bounce(t),
            Easing::Elastic => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                2f64.powf(-10.0 * t) * ((t - 0.075) * (2.0 * std::f64::consts::PI) / 0.3).sin()
                    + 1.0
            }
            Easing::BackIn => {
                let c1 = 1.70158;
                let c3 = c1 + 1.0;
                c3 * t * t * t - c1 * t * t
            }
            Easing::BackOut => {
                let c1 = 1.70158;
                let c3 = c1 + 1.0;
                1.0 + c3 * (t - 1.0).powi(3) + c1 * (t - 1.0).powi(2)
            }
        }
    }
}

fn bounce(t: f64) -> f64 {
    let n1 = 7.5625;
    let d1 = 2.75;
    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

/// Duration and curve for one kind of transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSpec {
    pub duration: Duration,
    pub easing: Easing,
}

impl AnimationSpec {
    pub fn immediate() -> Self {
        Self {
            duration: Duration::ZERO,
            easing: Easing::Linear,
        }
    }
}

// =============================================================================
// Clocks
// =============================================================================

/// Source of "now" for the animator.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock for tests and offline frame rendering.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to a gauge.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

// =============================================================================
// Animator
// =============================================================================

/// Identifies one started animation; stale tokens cancel nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationToken(u64);

/// One computed step of a running animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub value: f64,
    /// Set on the terminal frame, whose value is exactly the target.
    pub done: bool,
}

/// Outcome of [`Animator::start`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Started {
    /// Zero duration: the caller should apply the target right away.
    Immediate(f64),
    Running(AnimationToken),
}

#[derive(Debug, Clone, Copy)]
struct Animation {
    token: AnimationToken,
    from: f64,
    to: f64,
    spec: AnimationSpec,
    started_at: Instant,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Running(Animation),
}

/// Single-slot tween driver. Starting a new animation replaces the old one.
#[derive(Debug)]
pub struct Animator {
    state: State,
    next_token: u64,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            next_token: 0,
        }
    }

    /// Begin tweening `from -> to`. Any running animation is dropped first.
    pub fn start(&mut self, from: f64, to: f64, spec: AnimationSpec, now: Instant) -> Started {
        self.cancel_all();
        if spec.duration.is_zero() {
            return Started::Immediate(to);
        }

        self.next_token += 1;
        let token = AnimationToken(self.next_token);
        self.state = State::Running(Animation {
            token,
            from,
            to,
            spec,
            started_at: now,
        });
        log::trace!("Animation {:?} started: {} -> {} over {:?}", token, from, to, spec.duration);
        Started::Running(token)
    }

    /// Cancel the animation owning `token`. Returns whether anything stopped.
    pub fn cancel(&mut self, token: AnimationToken) -> bool {
        match self.state {
            State::Running(anim) if anim.token == token => {
                self.state = State::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&mut self) {
        if let State::Running(anim) = self.state {
            log::trace!("Animation {:?} cancelled", anim.token);
        }
        self.state = State::Idle;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    pub fn current_token(&self) -> Option<AnimationToken> {
        match self.state {
            State::Running(anim) => Some(anim.token),
            State::Idle => None,
        }
    }

    /// Target of the running animation, if any.
    pub fn target(&self) -> Option<f64> {
        match self.state {
            State::Running(anim) => Some(anim.to),
            State::Idle => None,
        }
    }

    /// Jump straight to the terminal frame of the running animation.
    pub fn finish(&mut self) -> Option<Frame> {
        let State::Running(anim) = self.state else {
            return None;
        };
        self.state = State::Idle;
        Some(Frame {
            value: anim.to,
            done: true,
        })
    }

    /// Compute the frame for `now`. Returns `None` when idle.
    ///
    /// The terminal frame carries exactly `to` and returns the animator to idle.
    pub fn tick(&mut self, now: Instant) -> Option<Frame> {
        let State::Running(anim) = self.state else {
            return None;
        };

        let elapsed = now.saturating_duration_since(anim.started_at);
        if elapsed >= anim.spec.duration {
            self.state = State::Idle;
            return Some(Frame {
                value: anim.to,
                done: true,
            });
        }

        let t = elapsed.as_secs_f64() / anim.spec.duration.as_secs_f64();
        let eased = anim.spec.easing.apply(t);
        Some(Frame {
            value: anim.from + (anim.to - anim.from) * eased,
            done: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 8] = [
        Easing::Linear,
        Easing::EaseOut,
        Easing::EaseIn,
        Easing::EaseInOut,
        Easing::Bounce,
        Easing::Elastic,
        Easing::BackIn,
        Easing::BackOut,
    ];

    fn spec(ms: u64, easing: Easing) -> AnimationSpec {
        AnimationSpec {
            duration: Duration::from_millis(ms),
            easing,
        }
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-9, "{:?} at 0", easing);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{:?} at 1", easing);
        }
    }

    #[test]
    fn test_easing_names() {
        assert_eq!(Easing::from_name("linear"), Some(Easing::Linear));
        assert_eq!(Easing::from_name("-"), Some(Easing::Linear));
        assert_eq!(Easing::from_name("<"), Some(Easing::EaseIn));
        assert_eq!(Easing::from_name("<>"), Some(Easing::EaseInOut));
        assert_eq!(Easing::from_name("easeInOut"), Some(Easing::EaseInOut));
        assert_eq!(Easing::from_name("backOut"), Some(Easing::BackOut));
        assert_eq!(Easing::from_name(""), None);
    }

    #[test]
    fn test_back_in_dips_below_zero() {
        assert!(Easing::BackIn.apply(0.2) < 0.0);
        assert!(Easing::BackOut.apply(0.8) > 1.0);
    }

    #[test]
    fn test_zero_duration_is_immediate() {
        let mut animator = Animator::new();
        let started = animator.start(0.0, 10.0, AnimationSpec::immediate(), Instant::now());
        assert_eq!(started, Started::Immediate(10.0));
        assert!(!animator.is_running());
        assert_eq!(animator.tick(Instant::now()), None);
    }

    #[test]
    fn test_linear_progress_and_terminal_frame() {
        let clock = ManualClock::new();
        let mut animator = Animator::new();
        animator.start(0.0, 100.0, spec(1000, Easing::Linear), clock.now());

        clock.advance(Duration::from_millis(250));
        let frame = animator.tick(clock.now()).unwrap();
        assert!((frame.value - 25.0).abs() < 1e-9);
        assert!(!frame.done);

        clock.advance(Duration::from_millis(2000));
        let frame = animator.tick(clock.now()).unwrap();
        assert_eq!(frame, Frame { value: 100.0, done: true });
        assert!(!animator.is_running());
        assert_eq!(animator.tick(clock.now()), None);
    }

    #[test]
    fn test_restart_invalidates_old_token() {
        let clock = ManualClock::new();
        let mut animator = Animator::new();
        let Started::Running(first) = animator.start(0.0, 1.0, spec(100, Easing::Linear), clock.now())
        else {
            panic!("expected running animation");
        };
        let Started::Running(second) = animator.start(1.0, 2.0, spec(100, Easing::Linear), clock.now())
        else {
            panic!("expected running animation");
        };
        assert_ne!(first, second);
        assert!(!animator.cancel(first));
        assert_eq!(animator.target(), Some(2.0));
        assert!(animator.cancel(second));
        assert!(!animator.is_running());
    }

    #[test]
    fn test_finish_jumps_to_target() {
        let mut animator = Animator::new();
        assert_eq!(animator.finish(), None);
        animator.start(5.0, 50.0, spec(700, Easing::Bounce), Instant::now());
        assert_eq!(animator.finish(), Some(Frame { value: 50.0, done: true }));
        assert!(!animator.is_running());
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let before = other.now();
        clock.advance(Duration::from_millis(40));
        assert_eq!(other.now() - before, Duration::from_millis(40));
        assert_eq!(other.elapsed(), Duration::from_millis(40));
    }
}
