use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;

/// Kinds of events the engine schedules.
///
/// Particle references are stable indices into the system's particle slab.
/// Tie-breaking for deterministic ordering at equal times prefers
/// `Pair` < `VerticalWall` < `HorizontalWall` < `Frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Contact between particles `a` and `b`.
    Pair { a: usize, b: usize },
    /// Particle `a` reaches a vertical box face.
    VerticalWall { a: usize },
    /// Particle `a` reaches a horizontal box face.
    HorizontalWall { a: usize },
    /// Periodic rendering tick; references no particles.
    Frame,
}

impl EventKind {
    #[inline]
    fn order_key(&self) -> (u8, usize, usize) {
        match *self {
            EventKind::Pair { a, b } => (0, a, b),
            EventKind::VerticalWall { a } => (1, a, 0),
            EventKind::HorizontalWall { a } => (2, a, 0),
            EventKind::Frame => (3, 0, 0),
        }
    }
}

/// A scheduled future occurrence with its invalidation stamps.
///
/// Construction captures the collision counts of the referenced particles;
/// at pop time a mismatch against the current counts means some
/// intervening collision rewrote the participants' trajectories and the
/// event is silently discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Absolute simulation time at which the event fires.
    pub time: NotNan<f64>,
    /// Event kind and participants.
    pub kind: EventKind,
    /// Collision-count stamp of the `a` slot, if the kind uses it.
    pub cc_a: Option<u64>,
    /// Collision-count stamp of the `b` slot, if the kind uses it.
    pub cc_b: Option<u64>,
}

impl Event {
    /// Create a new event, validating that time is finite and non-NaN.
    pub fn new(time: f64, kind: EventKind, cc_a: Option<u64>, cc_b: Option<u64>) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::MathError("event time must be finite".into()));
        }
        let time =
            NotNan::new(time).map_err(|_| Error::MathError("event time cannot be NaN".into()))?;
        Ok(Self {
            time,
            kind,
            cc_a,
            cc_b,
        })
    }

    /// Returns the raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }

    /// Validate each stamp against its own particle's current count.
    /// `None` for a current count means the particle no longer exists,
    /// which invalidates any event that stamped it.
    #[inline]
    pub fn is_valid(&self, cc_a_now: Option<u64>, cc_b_now: Option<u64>) -> bool {
        stamp_matches(self.cc_a, cc_a_now) && stamp_matches(self.cc_b, cc_b_now)
    }
}

#[inline]
fn stamp_matches(stamp: Option<u64>, now: Option<u64>) -> bool {
    match (stamp, now) {
        (Some(s), Some(n)) => s == n,
        (Some(_), None) => false,
        // Unstamped slot is valid regardless of what exists there now.
        (None, _) => true,
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => match self.kind.order_key().cmp(&other.kind.order_key()) {
                Ordering::Equal => (self.cc_a, self.cc_b).cmp(&(other.cc_a, other.cc_b)),
                o => o,
            },
            o => o,
        }
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventKind::{Frame, HorizontalWall, Pair, VerticalWall};

    #[test]
    fn new_event_rejects_nan_time() {
        let err = Event::new(f64::NAN, Pair { a: 1, b: 2 }, Some(0), Some(0)).unwrap_err();
        assert!(err.to_string().contains("finite") || err.to_string().contains("NaN"));
    }

    #[test]
    fn new_event_rejects_infinite_time() {
        assert!(Event::new(f64::INFINITY, Frame, None, None).is_err());
    }

    #[test]
    fn ordering_by_time() -> Result<()> {
        let e1 = Event::new(1.0, Pair { a: 0, b: 1 }, Some(0), Some(0))?;
        let e2 = Event::new(2.0, VerticalWall { a: 0 }, Some(0), None)?;
        assert!(e1 < e2);
        Ok(())
    }

    #[test]
    fn tie_breaker_prefers_pair_over_walls_over_frame() -> Result<()> {
        let t = 5.0;
        let pair = Event::new(t, Pair { a: 0, b: 1 }, Some(3), Some(4))?;
        let vwall = Event::new(t, VerticalWall { a: 0 }, Some(3), None)?;
        let hwall = Event::new(t, HorizontalWall { a: 0 }, Some(3), None)?;
        let frame = Event::new(t, Frame, None, None)?;
        assert!(pair < vwall);
        assert!(vwall < hwall);
        assert!(hwall < frame);
        Ok(())
    }

    #[test]
    fn is_valid_checks_each_stamp_against_its_own_count() -> Result<()> {
        let pair = Event::new(1.0, Pair { a: 1, b: 2 }, Some(10), Some(20))?;
        assert!(pair.is_valid(Some(10), Some(20)));
        assert!(!pair.is_valid(Some(11), Some(20)));
        assert!(!pair.is_valid(Some(10), Some(21)));
        // A removed participant invalidates the event.
        assert!(!pair.is_valid(None, Some(20)));

        let wall = Event::new(1.0, VerticalWall { a: 3 }, Some(7), None)?;
        assert!(wall.is_valid(Some(7), None));
        assert!(!wall.is_valid(Some(8), None));
        Ok(())
    }

    #[test]
    fn frame_events_are_always_valid() -> Result<()> {
        let frame = Event::new(0.0, Frame, None, None)?;
        assert!(frame.is_valid(None, None));
        Ok(())
    }
}
