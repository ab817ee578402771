use serde::Serialize;

use crate::config::FADER_MIDPOINT;

/// Deck topology currently shown. Slots beyond the active count contribute
/// zero output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    TwoDecks,
    FourDecks,
}

impl ViewMode {
    pub fn active_slots(&self) -> u8 {
        match self {
            ViewMode::TwoDecks => 2,
            ViewMode::FourDecks => 4,
        }
    }
}

/// A crossfader pair of adjacent deck slots. The four pairs form a ring in
/// 4-deck topology; 2-deck topology uses only the primary pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FaderPair {
    Pair12,
    Pair23,
    Pair34,
    Pair41,
}

pub const ALL_PAIRS: [FaderPair; 4] = [
    FaderPair::Pair12,
    FaderPair::Pair23,
    FaderPair::Pair34,
    FaderPair::Pair41,
];

impl FaderPair {
    pub fn left_slot(&self) -> u8 {
        match self {
            FaderPair::Pair12 => 1,
            FaderPair::Pair23 => 2,
            FaderPair::Pair34 => 3,
            FaderPair::Pair41 => 4,
        }
    }

    pub fn right_slot(&self) -> u8 {
        match self {
            FaderPair::Pair12 => 2,
            FaderPair::Pair23 => 3,
            FaderPair::Pair34 => 4,
            FaderPair::Pair41 => 1,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            FaderPair::Pair12 => 0,
            FaderPair::Pair23 => 1,
            FaderPair::Pair34 => 2,
            FaderPair::Pair41 => 3,
        }
    }

    /// Pairs applicable in a topology.
    pub fn for_mode(mode: ViewMode) -> &'static [FaderPair] {
        match mode {
            ViewMode::TwoDecks => &ALL_PAIRS[..1],
            ViewMode::FourDecks => &ALL_PAIRS,
        }
    }
}

impl std::fmt::Display for FaderPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.left_slot(), self.right_slot())
    }
}

/// Which side of a pair a deck sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Crossfader {
    /// 0 = fully left deck, 100 = fully right deck.
    pub position: f64,
    pub auto_enabled: bool,
    pub beats_for_fade: u32,
    /// Mutual-exclusion guard: one fade animation per pair.
    pub is_fading: bool,
}

impl Default for Crossfader {
    fn default() -> Self {
        Self {
            position: FADER_MIDPOINT,
            auto_enabled: false,
            beats_for_fade: 8,
            is_fading: false,
        }
    }
}

impl Crossfader {
    /// The side the fader majority favors, if any.
    pub fn dominant_side(&self) -> Option<Side> {
        if self.position < FADER_MIDPOINT {
            Some(Side::Left)
        } else if self.position > FADER_MIDPOINT {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Gain factor this fader contributes to the deck on `side`.
    pub fn factor_for(&self, side: Side) -> f64 {
        match side {
            Side::Left => (100.0 - self.position) / 100.0,
            Side::Right => self.position / 100.0,
        }
    }
}

/// Master level plus the crossfader ring.
#[derive(Debug, Clone, PartialEq)]
pub struct MixerState {
    pub master: u8,
    pub faders: [Crossfader; 4],
    pub view: ViewMode,
}

impl Default for MixerState {
    fn default() -> Self {
        Self {
            master: 100,
            faders: Default::default(),
            view: ViewMode::TwoDecks,
        }
    }
}

impl MixerState {
    pub fn fader(&self, pair: FaderPair) -> &Crossfader {
        &self.faders[pair.index()]
    }

    pub fn fader_mut(&mut self, pair: FaderPair) -> &mut Crossfader {
        &mut self.faders[pair.index()]
    }

    /// The crossfader pairs touching `slot` in the active topology, with the
    /// side the slot sits on for each.
    fn pairs_touching(&self, slot: u8) -> Vec<(FaderPair, Side)> {
        FaderPair::for_mode(self.view)
            .iter()
            .filter_map(|&pair| {
                if pair.left_slot() == slot {
                    Some((pair, Side::Left))
                } else if pair.right_slot() == slot {
                    Some((pair, Side::Right))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Effective output level for `slot` given its user-intended level.
    ///
    /// `intended × master/100 × Π(fader factors)`, clamped and rounded.
    /// Always a full recompute; with at most four decks the fan-out does not
    /// justify caching.
    pub fn effective_volume(&self, slot: u8, intended: u8) -> u8 {
        if slot > self.view.active_slots() {
            return 0;
        }
        let mut level = intended as f64 * self.master as f64 / 100.0;
        for (pair, side) in self.pairs_touching(slot) {
            level *= self.fader(pair).factor_for(side);
        }
        level.clamp(0.0, 100.0).round() as u8
    }

    /// Default fader arrangement when expanding to four decks: the new decks
    /// start silent (pair 2-3 fully left, 3-4 centered, 4-1 fully right).
    pub fn apply_four_deck_defaults(&mut self) {
        self.view = ViewMode::FourDecks;
        self.fader_mut(FaderPair::Pair23).position = 0.0;
        self.fader_mut(FaderPair::Pair34).position = FADER_MIDPOINT;
        self.fader_mut(FaderPair::Pair41).position = 100.0;
    }

    /// Collapsing to two decks recenters the non-primary faders and disables
    /// their auto flags.
    pub fn apply_two_deck_defaults(&mut self) {
        self.view = ViewMode::TwoDecks;
        for pair in &ALL_PAIRS[1..] {
            let fader = self.fader_mut(*pair);
            fader.position = FADER_MIDPOINT;
            fader.auto_enabled = false;
        }
    }
}

/// Explicit crossfade target, overriding the dominant-side default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    ToLeft,
    ToRight,
}

impl FadeDirection {
    pub fn target_position(&self) -> f64 {
        match self {
            FadeDirection::ToLeft => 0.0,
            FadeDirection::ToRight => 100.0,
        }
    }
}

/// Bookkeeping for one running fade animation: a fixed number of discrete
/// steps linearly interpolating the fader position.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeAnim {
    pub from: f64,
    pub target: f64,
    pub step: u32,
    pub steps: u32,
}

impl FadeAnim {
    pub fn new(from: f64, target: f64, steps: u32) -> Self {
        Self {
            from,
            target,
            step: 0,
            steps: steps.max(1),
        }
    }

    /// Advances one step. Returns the new fader position and whether the
    /// fade just completed; completion snaps exactly to the target.
    pub fn advance(&mut self) -> (f64, bool) {
        self.step += 1;
        if self.step >= self.steps {
            (self.target, true)
        } else {
            let t = self.step as f64 / self.steps as f64;
            (self.from + (self.target - self.from) * t, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_anim_interpolates_and_snaps() {
        let mut anim = FadeAnim::new(20.0, 100.0, 50);
        let (first, done) = anim.advance();
        assert!(!done);
        assert!((first - 21.6).abs() < 1e-9);
        let mut last = (first, done);
        for _ in 0..49 {
            last = anim.advance();
        }
        assert_eq!(last, (100.0, true));
    }

    #[test]
    fn fade_direction_targets() {
        assert_eq!(FadeDirection::ToLeft.target_position(), 0.0);
        assert_eq!(FadeDirection::ToRight.target_position(), 100.0);
    }

    #[test]
    fn two_deck_factors_at_extremes_and_midpoint() {
        let mut mixer = MixerState::default();
        mixer.fader_mut(FaderPair::Pair12).position = 0.0;
        assert_eq!(mixer.effective_volume(1, 100), 100);
        assert_eq!(mixer.effective_volume(2, 100), 0);

        mixer.fader_mut(FaderPair::Pair12).position = 100.0;
        assert_eq!(mixer.effective_volume(1, 100), 0);
        assert_eq!(mixer.effective_volume(2, 100), 100);

        mixer.fader_mut(FaderPair::Pair12).position = 50.0;
        assert_eq!(mixer.effective_volume(1, 100), 50);
        assert_eq!(mixer.effective_volume(2, 100), 50);
    }

    #[test]
    fn master_and_intended_scale_multiplicatively() {
        let mut mixer = MixerState::default();
        mixer.master = 50;
        mixer.fader_mut(FaderPair::Pair12).position = 50.0;
        assert_eq!(mixer.effective_volume(1, 80), 20);
    }

    #[test]
    fn slots_beyond_two_deck_topology_are_silent() {
        let mixer = MixerState::default();
        assert_eq!(mixer.effective_volume(3, 100), 0);
        assert_eq!(mixer.effective_volume(4, 100), 0);
    }

    #[test]
    fn four_deck_slot_is_scaled_by_both_neighbors() {
        let mut mixer = MixerState::default();
        mixer.view = ViewMode::FourDecks;
        // Slot 2 sits right of 1-2 and left of 2-3.
        mixer.fader_mut(FaderPair::Pair12).position = 100.0; // favors slot 2
        mixer.fader_mut(FaderPair::Pair23).position = 0.0; // favors slot 2
        assert_eq!(mixer.effective_volume(2, 100), 100);

        mixer.fader_mut(FaderPair::Pair23).position = 50.0;
        assert_eq!(mixer.effective_volume(2, 100), 50);
    }

    #[test]
    fn four_deck_defaults_silence_new_decks() {
        let mut mixer = MixerState::default();
        mixer.apply_four_deck_defaults();
        // Pair 2-3 fully left and 4-1 fully right keep decks 3 and 4 silent
        // regardless of the centered 3-4 fader.
        assert_eq!(mixer.effective_volume(3, 100), 0);
        assert_eq!(mixer.effective_volume(4, 100), 0);
    }

    #[test]
    fn two_deck_defaults_recenter_and_disarm() {
        let mut mixer = MixerState::default();
        mixer.apply_four_deck_defaults();
        mixer.fader_mut(FaderPair::Pair34).auto_enabled = true;
        mixer.apply_two_deck_defaults();
        for pair in &ALL_PAIRS[1..] {
            assert_eq!(mixer.fader(*pair).position, FADER_MIDPOINT);
            assert!(!mixer.fader(*pair).auto_enabled);
        }
    }

    #[test]
    fn dominant_side() {
        let mut fader = Crossfader::default();
        assert_eq!(fader.dominant_side(), None);
        fader.position = 10.0;
        assert_eq!(fader.dominant_side(), Some(Side::Left));
        fader.position = 90.0;
        assert_eq!(fader.dominant_side(), Some(Side::Right));
    }
}
