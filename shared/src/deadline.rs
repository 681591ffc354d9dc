use crate::{types::BidWindow, utils::now_nanos};

/// Seconds kept in hand between our last check and the server's receive deadline.
pub const SAFETY_MARGIN_SECS: f64 = 0.5;

/// Absolute wall clock instant at which the search stops, in Unix nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(i64);

impl Deadline {
    /// `server deadline + skew estimate - safety margin`.
    pub fn from_window(window: &BidWindow, safety_margin_secs: f64) -> Self {
        let receive = i64::try_from(window.server_receive_deadline_nanos).unwrap_or(i64::MAX);
        let adjust = ((window.clock_skew_estimate_seconds - safety_margin_secs) * 1e9) as i64;
        Self(receive.saturating_add(adjust))
    }

    pub fn nanos(&self) -> i64 {
        self.0
    }

    pub fn passed_at(&self, now: i64) -> bool {
        now >= self.0
    }

    pub fn passed(&self) -> bool {
        self.passed_at(now_nanos())
    }

    pub fn remaining_secs(&self, now: i64) -> f64 {
        (self.0 as f64 - now as f64) * 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_skew_and_margin() {
        let window = BidWindow {
            server_receive_deadline_nanos: 10_000_000_000,
            clock_skew_estimate_seconds: 1.25,
            period_seconds: 3.0,
        };
        let deadline = Deadline::from_window(&window, SAFETY_MARGIN_SECS);
        assert_eq!(deadline.nanos(), 10_750_000_000);
        assert!(!deadline.passed_at(10_749_999_999));
        assert!(deadline.passed_at(10_750_000_000));
        assert!((deadline.remaining_secs(10_000_000_000) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn negative_skew_pulls_the_deadline_in() {
        let window = BidWindow {
            server_receive_deadline_nanos: 5_000_000_000,
            clock_skew_estimate_seconds: -2.0,
            period_seconds: 1.0,
        };
        assert_eq!(Deadline::from_window(&window, 0.5).nanos(), 2_500_000_000);
    }

    #[test]
    fn far_future_windows_saturate() {
        let window = BidWindow {
            server_receive_deadline_nanos: u64::MAX,
            clock_skew_estimate_seconds: 10.0,
            period_seconds: 1.0,
        };
        assert_eq!(Deadline::from_window(&window, 0.0).nanos(), i64::MAX);
    }

    #[test]
    fn past_windows_have_passed() {
        let window = BidWindow::ending_in(0.0);
        assert!(Deadline::from_window(&window, SAFETY_MARGIN_SECS).passed());
    }
}
