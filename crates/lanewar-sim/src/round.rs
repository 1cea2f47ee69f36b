//! Round controller: the match-level state machine.
//!
//! Tracks the loaded level, the current round, pick progress and the
//! pending battle start. Spawning and world resets are driven by the
//! engine; this type only decides transitions.

use lanewar_core::constants::MIN_PLAYER_PICKS;
use lanewar_core::definitions::{LevelDefinition, RoundDefinition, UnitCatalog};
use lanewar_core::enums::{MatchOutcome, RoundPhase};
use lanewar_core::error::DefinitionError;

/// Outcome of an end-of-tick elimination check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundResolution {
    /// No living allies remain. Also covers mutual wipeout.
    Lost,
    /// Enemies eliminated; planning for round `.0` follows.
    NextRound(usize),
    /// Enemies eliminated in the last round.
    Won,
}

#[derive(Debug, Default)]
pub struct RoundController {
    phase: RoundPhase,
    level: Option<LevelDefinition>,
    round_index: usize,
    picks_done: u32,
    picks_required: u32,
    /// Simulation time at which combat starts once the pick quota is met.
    battle_starts_at: Option<f64>,
    outcome: Option<MatchOutcome>,
    halt_reason: Option<String>,
}

impl RoundController {
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn rounds_total(&self) -> usize {
        self.level.as_ref().map_or(0, |l| l.rounds_count())
    }

    pub fn picks_done(&self) -> u32 {
        self.picks_done
    }

    pub fn picks_required(&self) -> u32 {
        self.picks_required
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halt_reason.as_deref()
    }

    pub fn battle_starts_at(&self) -> Option<f64> {
        self.battle_starts_at
    }

    pub fn level(&self) -> Option<&LevelDefinition> {
        self.level.as_ref()
    }

    pub fn current_round(&self) -> Option<&RoundDefinition> {
        self.level.as_ref()?.rounds.get(self.round_index)
    }

    /// Whether a new level may be started now.
    pub fn can_start_level(&self) -> bool {
        self.phase == RoundPhase::NotStarted || self.phase.is_terminal()
    }

    /// Validate and load a level. The phase is left untouched; the engine
    /// enters planning for round 0 once its world is reset.
    pub fn begin_level(
        &mut self,
        level: LevelDefinition,
        catalog: &UnitCatalog,
    ) -> Result<(), DefinitionError> {
        level.validate(catalog)?;
        self.level = Some(level);
        self.round_index = 0;
        self.picks_done = 0;
        self.picks_required = 0;
        self.battle_starts_at = None;
        self.outcome = None;
        self.halt_reason = None;
        Ok(())
    }

    /// Stop the match for good after invalid or missing level data.
    pub fn halt(&mut self, reason: impl Into<String>) {
        self.phase = RoundPhase::Halted;
        self.battle_starts_at = None;
        self.halt_reason = Some(reason.into());
    }

    /// Enter planning for round `index`, resetting pick progress.
    /// Returns the number of picks required this round.
    pub fn enter_planning(&mut self, index: usize) -> Result<u32, DefinitionError> {
        let level = self.level.as_ref().ok_or(DefinitionError::EmptyLevel)?;
        let round = level
            .rounds
            .get(index)
            .ok_or(DefinitionError::RoundOutOfRange(index))?;
        let required = round.player_picks.max(MIN_PLAYER_PICKS);

        self.phase = RoundPhase::Planning;
        self.round_index = index;
        self.picks_done = 0;
        self.picks_required = required;
        self.battle_starts_at = None;
        Ok(required)
    }

    pub fn quota_met(&self) -> bool {
        self.picks_done >= self.picks_required
    }

    /// Count one completed pick. Returns true when this pick meets the
    /// quota, in which case combat is scheduled `delay_secs` after `now`.
    pub fn record_pick(&mut self, now: f64, delay_secs: f64) -> bool {
        if self.phase != RoundPhase::Planning || self.quota_met() {
            return false;
        }
        self.picks_done += 1;
        if self.quota_met() {
            self.battle_starts_at = Some(now + delay_secs);
            return true;
        }
        false
    }

    /// Whether the scheduled battle start has come due.
    pub fn battle_due(&self, now: f64) -> bool {
        self.phase == RoundPhase::Planning && self.battle_starts_at.is_some_and(|t| now >= t)
    }

    /// Planning → Battle. Returns false if not in planning.
    pub fn enter_battle(&mut self) -> bool {
        if self.phase != RoundPhase::Planning {
            return false;
        }
        self.phase = RoundPhase::Battle;
        self.battle_starts_at = None;
        true
    }

    /// Jump straight into battle without a level (for tests).
    #[cfg(test)]
    pub(crate) fn force_battle(&mut self) {
        self.phase = RoundPhase::Battle;
        self.battle_starts_at = None;
    }

    /// End-of-tick elimination check. Loss takes precedence, so a tick in
    /// which both teams are wiped out is a loss.
    pub fn resolve_battle(&mut self, allies_alive: bool, enemies_alive: bool) -> Option<RoundResolution> {
        if self.phase != RoundPhase::Battle {
            return None;
        }
        if !allies_alive {
            self.phase = RoundPhase::MatchLost;
            self.outcome = Some(MatchOutcome::Lost);
            return Some(RoundResolution::Lost);
        }
        if enemies_alive {
            return None;
        }

        self.phase = RoundPhase::RoundResolved;
        let next = self.round_index + 1;
        if next < self.rounds_total() {
            Some(RoundResolution::NextRound(next))
        } else {
            self.phase = RoundPhase::MatchWon;
            self.outcome = Some(MatchOutcome::Won);
            Some(RoundResolution::Won)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanewar_core::definitions::{EnemySpawnEntry, UnitDefinition};
    use lanewar_core::enums::Archetype;
    use lanewar_core::definitions::AttackProfile;

    fn catalog() -> UnitCatalog {
        UnitCatalog::new(vec![UnitDefinition::new(
            "grunt",
            Archetype::Melee,
            AttackProfile::Melee,
        )])
        .unwrap()
    }

    fn level(rounds: usize, picks: u32) -> LevelDefinition {
        LevelDefinition {
            name: "test".into(),
            rounds: (0..rounds)
                .map(|_| RoundDefinition {
                    enemy_spawns: vec![EnemySpawnEntry {
                        unit: "grunt".into(),
                        count: 1,
                        level: 1,
                    }],
                    player_picks: picks,
                    souls_reward: 0,
                })
                .collect(),
        }
    }

    fn planning(rounds: usize, picks: u32) -> RoundController {
        let mut rc = RoundController::default();
        rc.begin_level(level(rounds, picks), &catalog()).unwrap();
        rc.enter_planning(0).unwrap();
        rc
    }

    #[test]
    fn test_quota_is_at_least_one() {
        let rc = planning(1, 0);
        assert_eq!(rc.picks_required(), 1);
        assert_eq!(rc.phase(), RoundPhase::Planning);
    }

    #[test]
    fn test_record_pick_schedules_battle() {
        let mut rc = planning(1, 2);
        assert!(!rc.record_pick(1.0, 2.0));
        assert!(rc.battle_starts_at().is_none());
        assert!(rc.record_pick(1.5, 2.0));
        assert_eq!(rc.battle_starts_at(), Some(3.5));
        // Quota already met: further picks are ignored.
        assert!(!rc.record_pick(1.6, 2.0));
        assert_eq!(rc.picks_done(), 2);

        assert!(!rc.battle_due(3.4));
        assert!(rc.battle_due(3.5));
        assert!(rc.enter_battle());
        assert_eq!(rc.phase(), RoundPhase::Battle);
        assert!(!rc.enter_battle());
    }

    #[test]
    fn test_loss_precedence_on_mutual_wipeout() {
        let mut rc = planning(2, 1);
        rc.enter_battle();
        assert_eq!(rc.resolve_battle(false, false), Some(RoundResolution::Lost));
        assert_eq!(rc.phase(), RoundPhase::MatchLost);
        assert_eq!(rc.outcome(), Some(MatchOutcome::Lost));
        // Terminal: nothing further resolves.
        assert_eq!(rc.resolve_battle(true, false), None);
    }

    #[test]
    fn test_round_advance_then_win() {
        let mut rc = planning(2, 1);
        rc.enter_battle();
        assert_eq!(rc.resolve_battle(true, true), None);
        assert_eq!(rc.resolve_battle(true, false), Some(RoundResolution::NextRound(1)));
        assert_eq!(rc.phase(), RoundPhase::RoundResolved);

        rc.enter_planning(1).unwrap();
        rc.enter_battle();
        assert_eq!(rc.resolve_battle(true, false), Some(RoundResolution::Won));
        assert_eq!(rc.phase(), RoundPhase::MatchWon);
        assert!(rc.can_start_level());
    }

    #[test]
    fn test_invalid_level_rejected() {
        let mut rc = RoundController::default();
        let err = rc.begin_level(level(0, 1), &catalog()).unwrap_err();
        assert_eq!(err, DefinitionError::EmptyLevel);
        rc.halt(err.to_string());
        assert_eq!(rc.phase(), RoundPhase::Halted);
        assert!(rc.halt_reason().is_some());
    }

    #[test]
    fn test_enter_planning_out_of_range() {
        let mut rc = planning(1, 1);
        assert_eq!(
            rc.enter_planning(3),
            Err(DefinitionError::RoundOutOfRange(3))
        );
    }
}
