use crate::collectors::SystemSnapshot;
use crate::state::Position;
use eframe::egui::{pos2, Pos2, Vec2};
use std::time::{Duration, Instant};

/// Label text for one snapshot. Always four lines; an unmeasurable GPU is
/// shown as `N/A` while a measured zero stays numeric.
pub fn format_snapshot(snapshot: &SystemSnapshot) -> String {
    let gpu = match snapshot.gpu_percent {
        Some(gpu) => format!("GPU: {gpu:5.1}%"),
        None => "GPU: N/A".to_string(),
    };
    format!(
        "CPU: {:5.1}%\nRAM: {:5.1}%\nDisk: {:5.1}%\n{gpu}",
        snapshot.cpu_percent, snapshot.ram_percent, snapshot.disk_percent
    )
}

/// Top-left corner of the window for a screen corner, or the screen centre
/// when no corner is given.
pub fn window_origin(
    position: Option<Position>,
    screen: Vec2,
    window: Vec2,
    margin: f32,
) -> Pos2 {
    let right = screen.x - window.x - margin;
    let bottom = screen.y - window.y - margin;
    match position {
        Some(Position::TopLeft) => pos2(margin, margin),
        Some(Position::TopRight) => pos2(right, margin),
        Some(Position::BottomLeft) => pos2(margin, bottom),
        Some(Position::BottomRight) => pos2(right, bottom),
        None => pos2(
            ((screen.x - window.x) / 2.0).floor(),
            ((screen.y - window.y) / 2.0).floor(),
        ),
    }
}

/// Cooperative fixed-cadence timer polled from the GUI frame callback.
///
/// The first poll fires immediately. A late poll fires once and re-arms from
/// that moment, so missed ticks are skipped rather than replayed.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
    cancelled: bool,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            cancelled: false,
        }
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if self.cancelled {
            return false;
        }
        match self.next_due {
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now + self.interval);
                true
            }
        }
    }

    /// Time left until the next tick; `None` once cancelled.
    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        if self.cancelled {
            return None;
        }
        Some(
            self.next_due
                .map(|due| due.saturating_duration_since(now))
                .unwrap_or(Duration::ZERO),
        )
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    fn snapshot(gpu: Option<f64>) -> SystemSnapshot {
        SystemSnapshot {
            cpu_percent: 5.0,
            ram_percent: 63.24,
            disk_percent: 100.0,
            gpu_percent: gpu,
        }
    }

    #[test]
    fn formats_four_padded_lines() {
        let text = format_snapshot(&snapshot(Some(37.2)));
        assert_eq!(
            text,
            "CPU:   5.0%\nRAM:  63.2%\nDisk: 100.0%\nGPU:  37.2%"
        );
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn unmeasurable_gpu_is_na() {
        let text = format_snapshot(&snapshot(None));
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.lines().last(), Some("GPU: N/A"));
    }

    #[test]
    fn measured_zero_gpu_stays_numeric() {
        let text = format_snapshot(&snapshot(Some(0.0)));
        assert_eq!(text.lines().last(), Some("GPU:   0.0%"));
    }

    #[test]
    fn corner_placement() {
        let screen = vec2(1920.0, 1080.0);
        let window = vec2(200.0, 120.0);
        let cases = [
            (Position::TopLeft, pos2(10.0, 10.0)),
            (Position::TopRight, pos2(1710.0, 10.0)),
            (Position::BottomLeft, pos2(10.0, 950.0)),
            (Position::BottomRight, pos2(1710.0, 950.0)),
        ];
        for (position, expected) in cases {
            assert_eq!(
                window_origin(Some(position), screen, window, 10.0),
                expected,
                "{position}"
            );
        }
    }

    #[test]
    fn centre_placement_without_position() {
        let origin = window_origin(None, vec2(1366.0, 769.0), vec2(200.0, 120.0), 10.0);
        assert_eq!(origin, pos2(583.0, 324.0));
    }

    #[test]
    fn ticker_fires_immediately_then_on_cadence() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));

        assert_eq!(ticker.until_next(start), Some(Duration::ZERO));
        assert!(ticker.poll(start));
        assert!(!ticker.poll(start + Duration::from_millis(400)));
        assert_eq!(
            ticker.until_next(start + Duration::from_millis(400)),
            Some(Duration::from_millis(600))
        );
        assert!(ticker.poll(start + Duration::from_secs(1)));
    }

    #[test]
    fn ticker_skips_missed_ticks() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        assert!(ticker.poll(start));

        let late = start + Duration::from_millis(3500);
        assert!(ticker.poll(late));
        assert!(!ticker.poll(late + Duration::from_millis(999)));
        assert!(ticker.poll(late + Duration::from_secs(1)));
    }

    #[test]
    fn cancelled_ticker_never_fires() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        ticker.cancel();

        assert!(ticker.is_cancelled());
        assert!(!ticker.poll(start));
        assert!(!ticker.poll(start + Duration::from_secs(10)));
        assert_eq!(ticker.until_next(start), None);
    }
}
