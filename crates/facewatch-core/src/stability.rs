//! Counts consecutive recognition cycles in which the tracked face held still.

use crate::types::Position;

/// Per-axis movement, in pixels, below which the face counts as still.
pub const DEFAULT_MOVEMENT_THRESHOLD: f32 = 50.0;

#[derive(Debug, Clone)]
pub struct StabilityTracker {
    movement_threshold: f32,
    previous: Option<Position>,
    still_count: u32,
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MOVEMENT_THRESHOLD)
    }
}

impl StabilityTracker {
    pub fn new(movement_threshold: f32) -> Self {
        Self {
            movement_threshold,
            previous: None,
            still_count: 0,
        }
    }

    /// Compare `position` with the previous one and update the still count.
    ///
    /// The count only grows once an age estimate is available
    /// (`representative_ready`); movement or a missing estimate resets it.
    /// `position` always becomes the new reference.
    pub fn observe(&mut self, position: Position, representative_ready: bool) -> u32 {
        if let Some(prev) = self.previous {
            let dx = (position.x - prev.x).abs();
            let dy = (position.y - prev.y).abs();
            let still = dx < self.movement_threshold && dy < self.movement_threshold;

            if still && representative_ready {
                self.still_count += 1;
            } else {
                self.still_count = 0;
            }
            tracing::debug!(dx, dy, still, still_count = self.still_count, "stability");
        }
        self.previous = Some(position);
        self.still_count
    }

    pub fn still_count(&self) -> u32 {
        self.still_count
    }

    pub fn reset_count(&mut self) {
        self.still_count = 0;
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.still_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> Position {
        Position { x, y }
    }

    #[test]
    fn test_first_observation_does_not_count() {
        let mut t = StabilityTracker::default();
        assert_eq!(t.observe(at(100.0, 100.0), true), 0);
    }

    #[test]
    fn test_still_increments_by_one() {
        let mut t = StabilityTracker::default();
        t.observe(at(100.0, 100.0), true);
        assert_eq!(t.observe(at(120.0, 90.0), true), 1);
        assert_eq!(t.observe(at(130.0, 95.0), true), 2);
    }

    #[test]
    fn test_movement_on_either_axis_resets() {
        let mut t = StabilityTracker::default();
        t.observe(at(0.0, 0.0), true);
        t.observe(at(1.0, 1.0), true);
        assert_eq!(t.still_count(), 1);

        assert_eq!(t.observe(at(51.0, 1.0), true), 0);
        t.observe(at(51.0, 1.0), true);
        // Exactly at the threshold counts as movement.
        assert_eq!(t.observe(at(51.0, 51.0), true), 0);
    }

    #[test]
    fn test_no_estimate_resets_even_when_still() {
        let mut t = StabilityTracker::default();
        t.observe(at(0.0, 0.0), true);
        t.observe(at(0.0, 0.0), true);
        assert_eq!(t.observe(at(0.0, 0.0), false), 0);
    }

    #[test]
    fn test_position_updates_on_every_branch() {
        let mut t = StabilityTracker::default();
        t.observe(at(0.0, 0.0), true);
        // Moves away: reset, but the new spot becomes the reference.
        t.observe(at(200.0, 200.0), true);
        assert_eq!(t.observe(at(210.0, 205.0), true), 1);
    }

    #[test]
    fn test_reset_forgets_reference() {
        let mut t = StabilityTracker::default();
        t.observe(at(0.0, 0.0), true);
        t.observe(at(0.0, 0.0), true);
        t.reset();
        assert_eq!(t.observe(at(0.0, 0.0), true), 0);
        assert_eq!(t.observe(at(0.0, 0.0), true), 1);
    }
}
