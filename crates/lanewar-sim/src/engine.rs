//! Simulation engine: the core of the game.
//!
//! `SimulationEngine` owns the hecs ECS world, processes host commands,
//! runs all systems, and produces `GameStateSnapshot`s. Completely headless
//! (no rendering or navigation dependency), enabling deterministic testing.

use std::collections::VecDeque;
use std::path::Path;

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use lanewar_core::commands::Command;
use lanewar_core::components::*;
use lanewar_core::config::{CombatConfig, FormationConfig, WindupMode};
use lanewar_core::constants::{DT, MAX_TIME_SCALE};
use lanewar_core::definitions::{LevelDefinition, RoundDefinition, UnitCatalog, UnitDefinition};
use lanewar_core::enums::{AiState, RoundPhase, Team};
use lanewar_core::error::{ConfigError, DefinitionError};
use lanewar_core::events::PresentationEvent;
use lanewar_core::state::GameStateSnapshot;
use lanewar_core::types::{Position, SimTime, UnitId, Velocity};

use crate::combat::{CombatCtx, ScoreState};
use crate::economy::{SoulBank, SoulLedger};
use crate::navigation::Navigator;
use crate::obstacles::ObstacleMap;
use crate::registry::SpatialRegistry;
use crate::round::{RoundController, RoundResolution};
use crate::schedule::HitSchedule;
use crate::systems;
use crate::systems::attack::HitOutcome;
use crate::world_setup::{self, RosterEntry};

/// Configuration for starting a new simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    /// Initial time scale (1.0 = normal). Pacing hint for the host.
    pub time_scale: f64,
    pub combat: CombatConfig,
    pub formation: FormationConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            time_scale: 1.0,
            combat: CombatConfig::default(),
            formation: FormationConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// The simulation engine. Owns the ECS world and all sim state.
pub struct SimulationEngine {
    world: World,
    registry: SpatialRegistry,
    time: SimTime,
    paused: bool,
    time_scale: f64,
    rng: ChaCha8Rng,
    config: SimConfig,
    catalog: UnitCatalog,
    obstacles: ObstacleMap,
    navigator: Option<Box<dyn Navigator>>,
    souls: Box<dyn SoulBank>,
    round: RoundController,
    hit_schedule: HitSchedule,
    roster: Vec<RosterEntry>,
    next_unit_id: u32,
    command_queue: VecDeque<Command>,
    despawn_buffer: Vec<Entity>,
    events: Vec<PresentationEvent>,
    score: ScoreState,
}

impl SimulationEngine {
    /// Create a new simulation engine with the given config and unit catalog.
    pub fn new(config: SimConfig, catalog: UnitCatalog) -> Self {
        Self {
            world: World::new(),
            registry: SpatialRegistry::new(),
            time: SimTime::default(),
            paused: false,
            time_scale: config.time_scale.clamp(0.0, MAX_TIME_SCALE),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            souls: Box::new(SoulLedger::new(config.combat.starting_souls)),
            config,
            catalog,
            obstacles: ObstacleMap::default(),
            navigator: None,
            round: RoundController::default(),
            hit_schedule: HitSchedule::default(),
            roster: Vec::new(),
            next_unit_id: 1,
            command_queue: VecDeque::new(),
            despawn_buffer: Vec::new(),
            events: Vec::new(),
            score: ScoreState::default(),
        }
    }

    /// Use static obstacles for line-of-sight checks.
    pub fn with_obstacles(mut self, obstacles: ObstacleMap) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Delegate unit movement to a host navigator.
    pub fn with_navigator(mut self, navigator: Box<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Replace the built-in soul ledger.
    pub fn with_soul_bank(mut self, souls: Box<dyn SoulBank>) -> Self {
        self.souls = souls;
        self
    }

    /// Queue a host command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: Command) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.command_queue.extend(commands);
    }

    /// Advance the simulation by one fixed tick and return the resulting snapshot.
    pub fn tick(&mut self) -> GameStateSnapshot {
        self.tick_with_dt(DT)
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick_with_dt(&mut self, dt: f64) -> GameStateSnapshot {
        self.process_commands();

        if self.is_running() {
            self.run_systems(dt.max(0.0));
            self.time.advance(dt.max(0.0));
        }

        let events = std::mem::take(&mut self.events);
        systems::snapshot::build_snapshot(
            &self.world,
            &self.registry,
            systems::snapshot::SnapshotInputs {
                time: &self.time,
                round: &self.round,
                paused: self.paused,
                souls: self.souls.balance(),
                score: &self.score,
            },
            events,
        )
    }

    /// Get the current round phase.
    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    /// Get the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Get the current time scale.
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn registry(&self) -> &SpatialRegistry {
        &self.registry
    }

    pub fn round(&self) -> &RoundController {
        &self.round
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn souls(&self) -> u32 {
        self.souls.balance()
    }

    /// Player units that persist across rounds.
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// Current health of a unit still present in the world.
    pub fn unit_health(&self, id: UnitId) -> Option<u32> {
        let entity = self.registry.entity(id)?;
        self.world.get::<&Health>(entity).ok().map(|h| h.current)
    }

    pub fn unit_position(&self, id: UnitId) -> Option<Position> {
        let entity = self.registry.entity(id)?;
        self.world.get::<&Position>(entity).ok().map(|p| *p)
    }

    pub fn unit_ai_state(&self, id: UnitId) -> Option<AiState> {
        let entity = self.registry.entity(id)?;
        self.world.get::<&AiController>(entity).ok().map(|ai| ai.state)
    }

    /// The attack intent a unit is currently winding up, if any.
    pub fn pending_intent(&self, id: UnitId) -> Option<AttackIntent> {
        let entity = self.registry.entity(id)?;
        self.world
            .get::<&AttackStrategy>(entity)
            .ok()
            .and_then(|s| s.pending)
    }

    /// Spawn a unit directly (for tests). AI stays disabled until a battle starts.
    #[cfg(test)]
    pub fn spawn_test_unit(&mut self, def: &UnitDefinition, team: Team, position: Position) -> UnitId {
        let id = allocate_id(&mut self.next_unit_id);
        world_setup::spawn_unit(
            &mut self.world,
            &mut self.registry,
            def,
            team,
            1,
            id,
            position,
            false,
        );
        id
    }

    /// Enter battle without a level (for tests). Clearing either team wins.
    #[cfg(test)]
    pub fn start_test_battle(&mut self) {
        self.round.force_battle();
        self.engage_all();
    }

    #[cfg(test)]
    pub fn set_test_position(&mut self, id: UnitId, position: Position) {
        if let Some(entity) = self.registry.entity(id) {
            if let Ok(mut pos) = self.world.get::<&mut Position>(entity) {
                *pos = position;
            }
        }
    }

    fn is_running(&self) -> bool {
        !self.paused && !matches!(self.round.phase(), RoundPhase::NotStarted | RoundPhase::Halted)
    }

    /// Process all queued commands. Hit callbacks that arrive while paused
    /// stay queued until the simulation resumes.
    fn process_commands(&mut self) {
        let mut deferred = Vec::new();
        while let Some(command) = self.command_queue.pop_front() {
            if self.paused && matches!(command, Command::ResolveHit { .. }) {
                deferred.push(command);
            } else {
                self.handle_command(command);
            }
        }
        if self.paused {
            self.command_queue.extend(deferred);
        } else {
            for command in deferred {
                self.handle_command(command);
            }
        }
    }

    /// Handle a single host command.
    fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartLevel { level } => self.start_level(level),
            Command::PickUnit { definition_id } => self.pick_unit(&definition_id),
            Command::PlaceUnit {
                definition_id,
                position,
            } => self.place_unit(&definition_id, position),
            Command::CommitBattle => {
                if self.round.phase() == RoundPhase::Planning {
                    self.start_battle();
                } else {
                    self.reject("battle can only be committed during planning");
                }
            }
            Command::ResolveHit { unit } => {
                let now = self.time.elapsed_secs;
                let outcome = self.resolve_hit(unit, None, now);
                if outcome != HitOutcome::Resolved {
                    tracing::debug!(%unit, ?outcome, "resolve-hit had no effect");
                }
            }
            Command::SetTimeScale { scale } => {
                self.time_scale = scale.clamp(0.0, MAX_TIME_SCALE);
            }
            Command::Pause => {
                if self.is_running() {
                    self.paused = true;
                }
            }
            Command::Resume => {
                self.paused = false;
            }
        }
    }

    fn reject(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(%reason, "command rejected");
        self.events.push(PresentationEvent::CommandRejected { reason });
    }

    // ---- Round flow ----

    fn start_level(&mut self, level: LevelDefinition) {
        if !self.round.can_start_level() {
            self.reject("a level is already in progress");
            return;
        }
        let name = level.name.clone();
        if let Err(err) = self.round.begin_level(level, &self.catalog) {
            self.halt(&name, err);
            return;
        }

        self.roster.clear();
        self.score = ScoreState::default();
        self.time = SimTime::default();
        self.paused = false;
        let rounds = self.round.rounds_total();
        tracing::info!(level = %name, rounds, "level started");
        self.events.push(PresentationEvent::LevelStarted { rounds });
        self.enter_planning(0);
    }

    fn halt(&mut self, level: &str, err: DefinitionError) {
        tracing::error!(%level, error = %err, "invalid level data, halting");
        self.clear_world();
        let reason = err.to_string();
        self.round.halt(reason.clone());
        self.events.push(PresentationEvent::LevelHalted { reason });
    }

    /// Full reset into planning for round `index`: every unit is despawned,
    /// the player roster comes back at full health and the next wave spawns.
    fn enter_planning(&mut self, index: usize) {
        self.clear_world();
        let level_name = self
            .round
            .level()
            .map(|l| l.name.clone())
            .unwrap_or_default();

        let required = match self.round.enter_planning(index) {
            Ok(required) => required,
            Err(err) => return self.halt(&level_name, err),
        };
        let Some(round) = self.round.current_round().cloned() else {
            return self.halt(&level_name, DefinitionError::RoundOutOfRange(index));
        };

        self.respawn_roster(index > 0);
        if let Err(err) = self.spawn_enemy_wave(&round) {
            return self.halt(&level_name, err);
        }
        self.arrange_formations();

        tracing::info!(round = index, picks_required = required, "round planning");
        self.events.push(PresentationEvent::RoundStarted {
            round: index,
            picks_required: required,
        });
    }

    fn clear_world(&mut self) {
        self.world.clear();
        self.registry.clear();
        self.hit_schedule.clear();
    }

    fn respawn_roster(&mut self, revive: bool) {
        let level = self.config.combat.player_unit_level.max(1);
        for entry in &self.roster {
            let Some(def) = self.catalog.get(&entry.definition_id) else {
                tracing::warn!(unit = %entry.id, definition = %entry.definition_id, "roster unit missing from catalog");
                continue;
            };
            world_setup::spawn_unit(
                &mut self.world,
                &mut self.registry,
                def,
                Team::Ally,
                entry.level.max(level),
                entry.id,
                entry.placement.unwrap_or_default(),
                entry.placement.is_some(),
            );
            self.events.push(if revive {
                PresentationEvent::UnitRevived { unit: entry.id }
            } else {
                PresentationEvent::UnitSpawned {
                    unit: entry.id,
                    team: Team::Ally,
                }
            });
        }
    }

    fn spawn_enemy_wave(&mut self, round: &RoundDefinition) -> Result<(), DefinitionError> {
        for spawn in &round.enemy_spawns {
            let def = self
                .catalog
                .get(&spawn.unit)
                .ok_or_else(|| DefinitionError::UnknownUnit(spawn.unit.clone()))?;
            for _ in 0..spawn.count {
                let id = allocate_id(&mut self.next_unit_id);
                world_setup::spawn_unit(
                    &mut self.world,
                    &mut self.registry,
                    def,
                    Team::Enemy,
                    spawn.level.max(1),
                    id,
                    Position::default(),
                    false,
                );
                self.events.push(PresentationEvent::UnitSpawned {
                    unit: id,
                    team: Team::Enemy,
                });
            }
        }
        Ok(())
    }

    fn arrange_formations(&mut self) {
        let layouts = self.config.formation;
        systems::formation::arrange(&mut self.world, Team::Ally, &layouts.ally);
        systems::formation::arrange(&mut self.world, Team::Enemy, &layouts.enemy);
    }

    fn pick_unit(&mut self, definition_id: &str) {
        if self.round.phase() != RoundPhase::Planning {
            return self.reject("picks are only accepted during planning");
        }
        if self.round.quota_met() {
            return self.reject("pick quota already met");
        }
        let Some(def) = self.catalog.get(definition_id).cloned() else {
            return self.reject(format!("unknown unit '{definition_id}'"));
        };
        if !self.charge(def.soul_cost) {
            return self.reject(format!(
                "cannot afford '{definition_id}': costs {}, have {}",
                def.soul_cost,
                self.souls.balance()
            ));
        }

        for _ in 0..def.spawn_count {
            self.enlist(&def, None);
        }
        systems::formation::arrange(&mut self.world, Team::Ally, &self.config.formation.ally);

        let now = self.time.elapsed_secs;
        let delay = self.config.combat.start_battle_delay_secs;
        if self.round.record_pick(now, delay) {
            tracing::info!(delay_secs = delay, "pick quota met, battle scheduled");
        } else {
            tracing::debug!(
                picks = self.round.picks_done(),
                required = self.round.picks_required(),
                "unit picked"
            );
        }
    }

    fn place_unit(&mut self, definition_id: &str, position: Position) {
        if self.round.phase() != RoundPhase::Planning {
            return self.reject("placements are only accepted during planning");
        }
        let Some(def) = self.catalog.get(definition_id).cloned() else {
            return self.reject(format!("unknown unit '{definition_id}'"));
        };
        if !self.charge(def.soul_cost) {
            return self.reject(format!("cannot afford '{definition_id}'"));
        }
        self.enlist(&def, Some(position));
    }

    /// Spend `cost` souls. Free picks always succeed.
    fn charge(&mut self, cost: u32) -> bool {
        if cost == 0 {
            return true;
        }
        if !self.souls.spend(cost) {
            return false;
        }
        self.events.push(PresentationEvent::SoulsChanged {
            balance: self.souls.balance(),
        });
        true
    }

    /// Spawn a player unit and add it to the persistent roster.
    fn enlist(&mut self, def: &UnitDefinition, placement: Option<Position>) {
        let id = allocate_id(&mut self.next_unit_id);
        let level = self.config.combat.player_unit_level.max(1);
        world_setup::spawn_unit(
            &mut self.world,
            &mut self.registry,
            def,
            Team::Ally,
            level,
            id,
            placement.unwrap_or_default(),
            placement.is_some(),
        );
        self.roster.push(RosterEntry {
            id,
            definition_id: def.id.clone(),
            level,
            placement,
        });
        self.events.push(PresentationEvent::UnitSpawned {
            unit: id,
            team: Team::Ally,
        });
    }

    fn start_battle(&mut self) {
        if !self.round.enter_battle() {
            return;
        }
        self.engage_all();
        let round = self.round.round_index();
        tracing::info!(round, "battle started");
        self.events.push(PresentationEvent::BattleStarted { round });
    }

    /// Lock every unit in place and hand living ones to their AI.
    fn engage_all(&mut self) {
        for (_entity, (lifecycle, ai)) in self
            .world
            .query_mut::<(&mut Lifecycle, &mut AiController)>()
        {
            lifecycle.locked = true;
            ai.enabled = lifecycle.alive;
        }
    }

    /// Switch every AI controller off and drop in-flight intents.
    fn disengage_all(&mut self) {
        for (_entity, (id, ai, strategy, vel)) in self.world.query_mut::<(
            &UnitId,
            &mut AiController,
            &mut AttackStrategy,
            &mut Velocity,
        )>() {
            ai.enabled = false;
            ai.state = AiState::Suppressed;
            ai.target = None;
            strategy.pending = None;
            *vel = Velocity::default();
            if ai.moving {
                ai.moving = false;
                self.events.push(PresentationEvent::MovingChanged {
                    unit: *id,
                    moving: false,
                });
                if let Some(nav) = self.navigator.as_deref_mut() {
                    nav.stop(*id);
                }
            }
        }
        self.hit_schedule.clear();
    }

    /// End-of-tick elimination check.
    fn check_round_end(&mut self) {
        let allies = self.registry.any_alive(&self.world, Team::Ally);
        let enemies = self.registry.any_alive(&self.world, Team::Enemy);
        let Some(resolution) = self.round.resolve_battle(allies, enemies) else {
            return;
        };

        self.disengage_all();
        match resolution {
            RoundResolution::Lost => {
                tracing::info!(round = self.round.round_index(), "match lost");
                self.events.push(PresentationEvent::MatchLost);
            }
            RoundResolution::NextRound(next) => {
                self.finish_round();
                self.enter_planning(next);
            }
            RoundResolution::Won => {
                self.finish_round();
                tracing::info!("match won");
                self.events.push(PresentationEvent::MatchWon);
            }
        }
    }

    /// Grant the cleared round's reward.
    fn finish_round(&mut self) {
        let round = self.round.round_index();
        let reward = self.round.current_round().map_or(0, |r| r.souls_reward);
        if reward > 0 {
            self.souls.earn(reward);
            self.events.push(PresentationEvent::SoulsChanged {
                balance: self.souls.balance(),
            });
        }
        self.score.rounds_won += 1;
        tracing::info!(round, reward, "round won");
        self.events.push(PresentationEvent::RoundWon { round });
    }

    // ---- Combat ----

    fn resolve_hit(&mut self, unit: UnitId, expected_issue: Option<f64>, now: f64) -> HitOutcome {
        let mut ctx = CombatCtx {
            world: &mut self.world,
            registry: &mut self.registry,
            events: &mut self.events,
            score: &mut self.score,
            now,
        };
        systems::attack::resolve_hit(
            &mut ctx,
            unit,
            expected_issue,
            self.config.combat.max_windup_secs,
        )
    }

    /// Run all systems in order.
    fn run_systems(&mut self, dt: f64) {
        let now = self.time.elapsed_secs;

        // 1. Round timers
        if self.round.battle_due(now) {
            self.start_battle();
        }

        // 2. Unit AI: targeting, movement, attack starts
        let started = systems::unit_ai::run(&mut systems::unit_ai::AiCtx {
            world: &mut self.world,
            registry: &self.registry,
            obstacles: &self.obstacles,
            navigator: self.navigator.as_deref_mut(),
            rng: &mut self.rng,
            config: &self.config.combat,
            events: &mut self.events,
            now,
            dt,
        });
        if let WindupMode::Timeline { secs } = self.config.combat.windup {
            for attack in started {
                self.hit_schedule.schedule(
                    now + secs.max(0.0),
                    attack.attacker,
                    attack.intent.issued_at,
                );
            }
        }

        // 3. Attack effects: due wind-ups, then projectile flight
        for hit in self.hit_schedule.drain_due(now) {
            self.resolve_hit(hit.attacker, Some(hit.issued_at), now);
        }
        systems::projectiles::run(
            &mut CombatCtx {
                world: &mut self.world,
                registry: &mut self.registry,
                events: &mut self.events,
                score: &mut self.score,
                now,
            },
            dt,
            &mut self.despawn_buffer,
        );

        // 4. Death processing and corpse cleanup
        systems::death::run(&mut systems::death::DeathCtx {
            world: &mut self.world,
            catalog: &self.catalog,
            souls: self.souls.as_mut(),
            rng: &mut self.rng,
            navigator: self.navigator.as_deref_mut(),
            events: &mut self.events,
            score: &mut self.score,
            grace_secs: self.config.combat.death_grace_secs,
        });
        systems::death::despawn_corpses(
            &mut self.world,
            &mut self.registry,
            now,
            &mut self.despawn_buffer,
        );

        // 5. Elimination check
        self.check_round_end();
    }
}

fn allocate_id(next: &mut u32) -> UnitId {
    let id = UnitId(*next);
    *next += 1;
    id
}
