use std::time::{Duration, Instant};

use crate::config::{MIN_TAPS_FOR_BPM, TAP_BUFFER_CAP, TAP_RESET_TIMEOUT_MS};

/// Snaps `time` to the nearest beat boundary for the given BPM, clamped into
/// `[0, duration]`. Identity when no positive BPM is known. Idempotent for
/// any in-range input.
pub fn snap_to_beat(time: f64, bpm: Option<f64>, duration: f64) -> f64 {
    let beat = match bpm {
        Some(b) if b > 0.0 => 60.0 / b,
        _ => return time,
    };
    let snapped = (time / beat).round() * beat;
    snapped.clamp(0.0, duration.max(0.0))
}

/// Tap-tempo accumulator.
///
/// Taps are buffered until a gap exceeds the reset timeout; once at least
/// four taps are in, the BPM is derived from the interquartile-trimmed mean
/// of the inter-tap intervals. The buffer is capped so that only the most
/// recent taps stay influential.
#[derive(Debug, Default)]
pub struct TapTempo {
    taps: Vec<Instant>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self { taps: Vec::new() }
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }

    /// Registers a tap at `now` and returns the derived BPM once enough taps
    /// have accumulated.
    pub fn register(&mut self, now: Instant) -> Option<f64> {
        if let Some(&last) = self.taps.last() {
            if now.saturating_duration_since(last) > Duration::from_millis(TAP_RESET_TIMEOUT_MS) {
                log::debug!("Tap gap exceeded timeout; restarting tap measurement");
                self.taps.clear();
            }
        }

        self.taps.push(now);
        if self.taps.len() > TAP_BUFFER_CAP {
            self.taps.remove(0);
        }

        if self.taps.len() < MIN_TAPS_FOR_BPM {
            return None;
        }

        let mut intervals_ms: Vec<f64> = self
            .taps
            .windows(2)
            .map(|w| w[1].saturating_duration_since(w[0]).as_secs_f64() * 1000.0)
            .collect();
        intervals_ms.sort_by(f64::total_cmp);

        // Interquartile trim: drop the fastest and slowest quartile of
        // intervals so a single flubbed tap does not skew the result.
        let quartile = intervals_ms.len() / 4;
        let kept = &intervals_ms[quartile..intervals_ms.len() - quartile];
        let avg_ms = kept.iter().sum::<f64>() / kept.len() as f64;
        if avg_ms <= 0.0 {
            return None;
        }
        Some(60_000.0 / avg_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taps_spaced(base: Instant, count: usize, spacing_ms: u64) -> Vec<Instant> {
        (0..count)
            .map(|i| base + Duration::from_millis(spacing_ms * i as u64))
            .collect()
    }

    #[test]
    fn four_even_taps_at_500ms_give_120_bpm() {
        let mut tempo = TapTempo::new();
        let base = Instant::now();
        let mut bpm = None;
        for t in taps_spaced(base, 4, 500) {
            bpm = tempo.register(t);
        }
        let bpm = bpm.expect("four taps should produce a BPM");
        assert!((bpm - 120.0).abs() < 1e-6, "got {bpm}");
    }

    #[test]
    fn fewer_than_four_taps_give_nothing() {
        let mut tempo = TapTempo::new();
        let base = Instant::now();
        assert!(tempo.register(base).is_none());
        assert!(tempo.register(base + Duration::from_millis(500)).is_none());
        assert!(tempo.register(base + Duration::from_millis(1000)).is_none());
    }

    #[test]
    fn long_gap_resets_the_buffer() {
        let mut tempo = TapTempo::new();
        let base = Instant::now();
        for t in taps_spaced(base, 3, 500) {
            tempo.register(t);
        }
        // 3s gap: measurement starts over, so the next tap is tap #1.
        let late = base + Duration::from_millis(1000 + 3000);
        assert!(tempo.register(late).is_none());
        assert!(tempo.register(late + Duration::from_millis(500)).is_none());
    }

    #[test]
    fn trimming_discards_outlier_intervals() {
        let mut tempo = TapTempo::new();
        let base = Instant::now();
        // Seven even taps plus one badly late tap still inside the timeout.
        let mut at = base;
        for _ in 0..7 {
            tempo.register(at);
            at += Duration::from_millis(500);
        }
        at += Duration::from_millis(1400); // outlier interval of 1900ms
        let bpm = tempo.register(at).expect("enough taps for a BPM");
        // With the top/bottom quartiles dropped the outlier has no weight.
        assert!((bpm - 120.0).abs() < 1.0, "got {bpm}");
    }

    #[test]
    fn buffer_is_capped_at_eight_taps() {
        let mut tempo = TapTempo::new();
        let base = Instant::now();
        // 12 taps; only the most recent 8 may matter. Early taps are at a
        // different tempo to prove they fall out of the window.
        let mut at = base;
        for _ in 0..4 {
            tempo.register(at);
            at += Duration::from_millis(1000);
        }
        let mut bpm = None;
        for _ in 0..8 {
            bpm = tempo.register(at);
            at += Duration::from_millis(500);
        }
        let bpm = bpm.unwrap();
        assert!((bpm - 120.0).abs() < 1e-6, "got {bpm}");
    }

    #[test]
    fn snap_to_beat_rounds_to_nearest_beat() {
        // 120 BPM -> 0.5s beats.
        assert!((snap_to_beat(1.26, Some(120.0), 300.0) - 1.5).abs() < 1e-9);
        assert!((snap_to_beat(1.24, Some(120.0), 300.0) - 1.0).abs() < 1e-9);
        assert!((snap_to_beat(0.1, Some(120.0), 300.0) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn snap_to_beat_is_identity_without_bpm() {
        assert_eq!(snap_to_beat(1.26, None, 300.0), 1.26);
        assert_eq!(snap_to_beat(1.26, Some(0.0), 300.0), 1.26);
        assert_eq!(snap_to_beat(1.26, Some(-10.0), 300.0), 1.26);
    }

    #[test]
    fn snap_to_beat_clamps_to_duration() {
        let snapped = snap_to_beat(299.9, Some(120.0), 299.95);
        assert!(snapped <= 299.95);
    }

    #[test]
    fn snap_to_beat_is_idempotent() {
        for &t in &[0.0, 0.3, 1.26, 17.77, 299.9] {
            let once = snap_to_beat(t, Some(128.0), 300.0);
            let twice = snap_to_beat(once, Some(128.0), 300.0);
            assert!((once - twice).abs() < 1e-9, "t={t}: {once} vs {twice}");
        }
    }
}
