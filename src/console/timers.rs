use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::mixer::FaderPair;

/// Timer classes owned by the console loop. At most one timer of each kind
/// is alive at a time: scheduling a kind again replaces the previous
/// instance, so ticks are never double-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Per-deck position poll while playing.
    Poll(u8),
    /// Periodic stutter re-trigger.
    StutterTick(u8),
    /// One-shot end of the stutter short-play window.
    StutterPause(u8),
    /// Crossfade animation step for one pair.
    FadeStep(FaderPair),
}

impl TimerKind {
    fn deck_slot(&self) -> Option<u8> {
        match self {
            TimerKind::Poll(s) | TimerKind::StutterTick(s) | TimerKind::StutterPause(s) => Some(*s),
            TimerKind::FadeStep(_) => None,
        }
    }
}

#[derive(Debug)]
struct TimerEntry {
    deadline: Instant,
    period: Option<Duration>,
}

/// Software-timer table polled by the console's select loop.
#[derive(Debug, Default)]
pub struct TimerTable {
    entries: HashMap<TimerKind, TimerEntry>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a one-shot timer, replacing any existing timer of `kind`.
    pub fn schedule_once(&mut self, kind: TimerKind, delay: Duration) {
        self.entries.insert(
            kind,
            TimerEntry {
                deadline: Instant::now() + delay,
                period: None,
            },
        );
    }

    /// Schedules a repeating timer first firing after one `period`,
    /// replacing any existing timer of `kind`.
    pub fn schedule_periodic(&mut self, kind: TimerKind, period: Duration) {
        self.entries.insert(
            kind,
            TimerEntry {
                deadline: Instant::now() + period,
                period: Some(period),
            },
        );
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.entries.remove(&kind).is_some()
    }

    /// Cancels every deck-scoped timer for `slot`. Fade timers belong to
    /// pairs, not decks, and are unaffected.
    pub fn cancel_deck(&mut self, slot: u8) {
        self.entries.retain(|kind, _| kind.deck_slot() != Some(slot));
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Earliest pending deadline, for the loop's sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|e| e.deadline).min()
    }

    /// Removes and returns all timers due at `now`, ordered by deadline.
    /// Periodic timers are rescheduled one period ahead.
    pub fn pop_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<(Instant, TimerKind)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .map(|(kind, e)| (e.deadline, *kind))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);

        for (_, kind) in &due {
            if let Some(entry) = self.entries.get_mut(kind) {
                match entry.period {
                    Some(period) => entry.deadline += period,
                    None => {
                        self.entries.remove(kind);
                    }
                }
            }
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fires_once() {
        let mut timers = TimerTable::new();
        timers.schedule_once(TimerKind::StutterPause(1), Duration::from_millis(100));
        let later = Instant::now() + Duration::from_millis(150);
        assert_eq!(timers.pop_due(later), vec![TimerKind::StutterPause(1)]);
        assert!(timers.pop_due(later + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn periodic_reschedules() {
        let mut timers = TimerTable::new();
        timers.schedule_periodic(TimerKind::Poll(2), Duration::from_millis(250));
        let later = Instant::now() + Duration::from_millis(260);
        assert_eq!(timers.pop_due(later), vec![TimerKind::Poll(2)]);
        assert!(timers.is_scheduled(TimerKind::Poll(2)));
        assert_eq!(
            timers.pop_due(later + Duration::from_millis(250)),
            vec![TimerKind::Poll(2)]
        );
    }

    #[test]
    fn rescheduling_replaces_existing_instance() {
        let mut timers = TimerTable::new();
        timers.schedule_periodic(TimerKind::StutterTick(1), Duration::from_millis(250));
        timers.schedule_periodic(TimerKind::StutterTick(1), Duration::from_millis(125));
        let later = Instant::now() + Duration::from_millis(130);
        // A single fire: the earlier instance was replaced, not duplicated.
        assert_eq!(timers.pop_due(later), vec![TimerKind::StutterTick(1)]);
        assert!(timers.pop_due(later + Duration::from_millis(10)).is_empty());
    }

    #[test]
    fn cancel_deck_spares_other_decks_and_fades() {
        let mut timers = TimerTable::new();
        timers.schedule_periodic(TimerKind::Poll(1), Duration::from_millis(250));
        timers.schedule_periodic(TimerKind::StutterTick(1), Duration::from_millis(125));
        timers.schedule_periodic(TimerKind::Poll(2), Duration::from_millis(250));
        timers.schedule_periodic(
            TimerKind::FadeStep(FaderPair::Pair12),
            Duration::from_millis(40),
        );
        timers.cancel_deck(1);
        assert!(!timers.is_scheduled(TimerKind::Poll(1)));
        assert!(!timers.is_scheduled(TimerKind::StutterTick(1)));
        assert!(timers.is_scheduled(TimerKind::Poll(2)));
        assert!(timers.is_scheduled(TimerKind::FadeStep(FaderPair::Pair12)));
    }

    #[test]
    fn due_timers_fire_in_deadline_order() {
        let mut timers = TimerTable::new();
        timers.schedule_once(TimerKind::StutterPause(1), Duration::from_millis(100));
        timers.schedule_once(TimerKind::Poll(1), Duration::from_millis(50));
        let later = Instant::now() + Duration::from_millis(200);
        assert_eq!(
            timers.pop_due(later),
            vec![TimerKind::Poll(1), TimerKind::StutterPause(1)]
        );
    }
}
