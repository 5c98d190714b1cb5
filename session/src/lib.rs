#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame driver that wires the world and every system into one game session.
//!
//! A [`Session`] owns the world, the frame systems, the difficulty director
//! and an optional adaptive opponent. Hosts call [`Session::update`] once per
//! rendered frame and consume the returned events; waves start through
//! [`Session::start_wave`].

mod config;
mod stats;

use std::time::Duration;

use conquer_core::{
    CellCoord, Command, Event, PlacementError, TowerKind, TowerTarget, WaveOutcome, WavePlan,
};
use conquer_system_difficulty::{DifficultyDirector, PlayerSnapshot};
use conquer_system_opponent::{Action, AdaptiveOpponent, Observation};
use conquer_system_spawning::Spawning;
use conquer_system_tower_combat::TowerCombat;
use conquer_system_tower_targeting::TowerTargeting;
use conquer_world::{self as world, query, World};
use log::{debug, info, warn};

pub use config::{ConfigError, FrameConfig, SessionConfig};
pub use stats::AiStats;

#[derive(Clone, Debug)]
struct ActiveWave {
    plan: WavePlan,
    started_at: Duration,
    lives_at_start: u32,
    damage_dealt: f32,
    towers_lost: u32,
}

/// Frame tallies gathered from the events of one update.
#[derive(Clone, Copy, Debug, Default)]
struct FrameTally {
    bounty: u32,
    kills: u32,
    damage: f32,
    towers_lost: u32,
}

impl FrameTally {
    fn from_events(events: &[Event]) -> Self {
        let mut tally = Self::default();
        for event in events {
            match event {
                Event::EnemyKilled { bounty, .. } => {
                    tally.bounty = tally.bounty.saturating_add(*bounty);
                    tally.kills += 1;
                }
                Event::ProjectileHit { damage, .. }
                | Event::SplashDamage { damage, .. }
                | Event::ChainJump { damage, .. }
                | Event::BurnDamage { damage, .. } => tally.damage += damage,
                Event::TowerRemoved { .. } => tally.towers_lost += 1,
                _ => {}
            }
        }
        tally
    }
}

/// A running game: world, frame systems, director and optional opponent.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    world: World,
    spawning: Spawning,
    targeting: TowerTargeting,
    combat: TowerCombat,
    director: DifficultyDirector,
    opponent: Option<AdaptiveOpponent>,
    decision_interval: Duration,
    next_decision: Duration,
    targets: Vec<TowerTarget>,
    commands: Vec<Command>,
    pending: Vec<Event>,
    events: Vec<Event>,
    active_wave: Option<ActiveWave>,
    next_wave: u32,
    waves_completed: u32,
    kills: u32,
    result: Option<bool>,
}

impl Session {
    /// Creates a session without an adaptive opponent.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let decision_interval = Duration::try_from_secs_f32(config.frame.decision_interval_secs)
            .unwrap_or(Duration::from_secs(2));
        Self {
            world: World::new(config.grid.clone()),
            spawning: Spawning::new(config.spawning),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(config.combat.clone()),
            director: DifficultyDirector::new(config.difficulty.clone()),
            opponent: None,
            decision_interval,
            next_decision: Duration::ZERO,
            targets: Vec::new(),
            commands: Vec::new(),
            pending: Vec::new(),
            events: Vec::new(),
            active_wave: None,
            next_wave: 1,
            waves_completed: 0,
            kills: 0,
            result: None,
            config,
        }
    }

    /// Lets `opponent` build towers for the defending side.
    #[must_use]
    pub fn with_opponent(mut self, opponent: AdaptiveOpponent) -> Self {
        self.opponent = Some(opponent);
        self
    }

    /// Configuration the session runs with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Difficulty director.
    #[must_use]
    pub fn director(&self) -> &DifficultyDirector {
        &self.director
    }

    /// Adaptive opponent, if one plays.
    #[must_use]
    pub fn opponent(&self) -> Option<&AdaptiveOpponent> {
        self.opponent.as_ref()
    }

    /// Projectile system.
    #[must_use]
    pub fn combat(&self) -> &TowerCombat {
        &self.combat
    }

    /// Plan of the wave in progress.
    #[must_use]
    pub fn active_wave(&self) -> Option<&WavePlan> {
        self.active_wave.as_ref().map(|active| &active.plan)
    }

    /// Number of waves that ran to completion.
    #[must_use]
    pub fn waves_completed(&self) -> u32 {
        self.waves_completed
    }

    /// `Some(true)` once won, `Some(false)` once lost, `None` while playing.
    #[must_use]
    pub fn result(&self) -> Option<bool> {
        self.result
    }

    /// Applies a host command immediately; its events are returned by the next update.
    pub fn submit(&mut self, command: Command) {
        world::apply(&mut self.world, command, &mut self.pending);
    }

    /// Places a tower for the host and reports the outcome.
    pub fn place_tower(&mut self, kind: TowerKind, cell: CellCoord) -> Result<(), PlacementError> {
        let start = self.pending.len();
        self.submit(Command::PlaceTower { kind, cell });
        match self.pending[start..].iter().find_map(|event| match event {
            Event::TowerPlacementRejected { reason, .. } => Some(*reason),
            _ => None,
        }) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Plans the next wave and queues its enemies.
    ///
    /// Returns `None` while a wave is running or after the game ended.
    pub fn start_wave(&mut self) -> Option<WavePlan> {
        if self.result.is_some() || self.active_wave.is_some() {
            return None;
        }

        let wave = self.next_wave;
        let plan = self.director.plan_wave(wave, &self.player_snapshot());
        self.spawning.begin_wave(&plan);
        self.next_wave = self.next_wave.saturating_add(1);
        self.active_wave = Some(ActiveWave {
            plan: plan.clone(),
            started_at: query::clock(&self.world),
            lives_at_start: query::lives(&self.world),
            damage_dealt: 0.0,
            towers_lost: 0,
        });
        self.pending.push(Event::WavePlanned { plan: plan.clone() });
        Some(plan)
    }

    /// Advances the simulation by `dt_seconds` and returns what happened.
    ///
    /// The step is clamped to the configured maximum; non-finite and
    /// non-positive steps only flush pending host events.
    pub fn update(&mut self, dt_seconds: f32) -> &[Event] {
        self.events.clear();
        self.events.append(&mut self.pending);
        if self.result.is_some() || !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return &self.events;
        }

        let max_step = self.config.frame.max_frame_dt;
        let dt_seconds = if max_step.is_finite() && max_step > 0.0 {
            dt_seconds.min(max_step)
        } else {
            dt_seconds
        };
        let dt = Duration::from_secs_f32(dt_seconds);

        self.commands.clear();
        self.spawning
            .handle(&[Event::TimeAdvanced { dt }], &mut self.commands);
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
        world::apply(&mut self.world, Command::Tick { dt }, &mut self.events);

        self.targeting.handle(
            query::towers(&self.world),
            query::enemies(&self.world),
            query::enemy_index(&self.world),
            &mut self.targets,
        );
        {
            let mut scene = self.world.combat_scene();
            self.combat.fire(&mut scene, &self.targets, &mut self.events);
            self.combat.advance(&mut scene, dt_seconds, &mut self.events);
        }

        let tally = FrameTally::from_events(&self.events);
        if tally.bounty > 0 {
            world::apply(
                &mut self.world,
                Command::AwardGold {
                    amount: tally.bounty,
                },
                &mut self.events,
            );
        }
        self.kills = self.kills.saturating_add(tally.kills);
        if let Some(active) = self.active_wave.as_mut() {
            active.damage_dealt += tally.damage;
            active.towers_lost += tally.towers_lost;
        }

        let _ = self.world.cull();
        self.run_opponent();
        self.check_wave_completion();
        self.check_game_over();

        &self.events
    }

    /// Snapshot of the adaptive systems for display.
    #[must_use]
    pub fn ai_stats(&self) -> AiStats {
        let difficulty = self.director.stats();
        AiStats {
            difficulty_factor: difficulty.difficulty_factor,
            aggressiveness: difficulty.aggressiveness,
            momentum: difficulty.momentum,
            exploration_rate: self.opponent.as_ref().map(AdaptiveOpponent::exploration_rate),
            q_table_size: self.opponent.as_ref().map(|opponent| opponent.table().len()),
            last_archetype: difficulty.last_archetype,
        }
    }

    /// Takes the serialized table the opponent asked to persist, if any.
    pub fn take_save_request(&mut self) -> Option<String> {
        self.opponent
            .as_mut()
            .and_then(AdaptiveOpponent::take_save_request)
    }

    fn player_snapshot(&self) -> PlayerSnapshot {
        let starting_lives = self.config.grid.starting_lives;
        let towers = query::towers(&self.world);
        PlayerSnapshot {
            health_ratio: (starting_lives > 0)
                .then(|| query::lives(&self.world) as f32 / starting_lives as f32),
            gold: Some(query::gold(&self.world)),
            tower_dps: (!towers.is_empty()).then(|| towers.total_dps()),
        }
    }

    fn run_opponent(&mut self) {
        let Some(opponent) = self.opponent.as_mut() else {
            return;
        };
        let now = query::clock(&self.world);
        if now < self.next_decision {
            return;
        }
        self.next_decision = now.saturating_add(self.decision_interval);

        let observation = Observation {
            lives: query::lives(&self.world),
            max_lives: self.config.grid.starting_lives,
            gold: query::gold(&self.world),
            towers: u32::try_from(query::towers(&self.world).len()).unwrap_or(u32::MAX),
            live_enemies: u32::try_from(query::enemies(&self.world).active_count())
                .unwrap_or(u32::MAX),
            wave: self.next_wave.saturating_sub(1),
            kills: self.kills,
        };
        let decision = opponent.decide(&observation);
        if let Action::Build(kind) = decision.action {
            let placed = place_near_route(&mut self.world, kind, &mut self.events);
            opponent.record_build_result(placed);
        }
    }

    fn check_wave_completion(&mut self) {
        if self.active_wave.is_none()
            || !self.spawning.is_idle()
            || query::enemies(&self.world).active_count() > 0
            || query::lives(&self.world) == 0
        {
            return;
        }
        let Some(active) = self.active_wave.take() else {
            return;
        };

        let lives = query::lives(&self.world);
        let outcome = WaveOutcome {
            lives_lost: active.lives_at_start.saturating_sub(lives),
            completion_time: query::clock(&self.world).saturating_sub(active.started_at),
            damage_dealt: active.damage_dealt,
            towers_lost: active.towers_lost,
        };
        self.director.record_wave_outcome(&outcome);
        if let Some(opponent) = self.opponent.as_mut() {
            opponent.on_wave_complete(lives > 0);
        }
        self.waves_completed += 1;
        info!(
            "wave {} ({}) completed: {} lives lost, {:.0} damage dealt",
            active.plan.wave(),
            active.plan.archetype(),
            outcome.lives_lost,
            outcome.damage_dealt
        );
        self.events.push(Event::WaveCompleted {
            outcome,
            wave: active.plan.wave(),
        });
    }

    fn check_game_over(&mut self) {
        let won = if query::lives(&self.world) == 0 {
            false
        } else if self.active_wave.is_none()
            && self.config.frame.waves_to_win > 0
            && self.waves_completed >= self.config.frame.waves_to_win
        {
            true
        } else {
            return;
        };

        self.result = Some(won);
        self.combat.clear();
        if let Some(opponent) = self.opponent.as_mut() {
            opponent.on_game_end(won);
        }
        info!(
            "game over after {} waves: {}",
            self.waves_completed,
            if won { "defenders win" } else { "defenders lose" }
        );
        self.events.push(Event::GameOver { won });
    }
}

/// Tries buildable cells by distance to the current route, adjacent cells first.
///
/// Cells on the route itself are tried last. Only the accepted placement's
/// events reach `out`.
fn place_near_route(world: &mut World, kind: TowerKind, out: &mut Vec<Event>) -> bool {
    let grid = query::grid(world);
    let route = query::route(world).map(|path| path.cells()).unwrap_or_default();
    let mut candidates: Vec<(u32, CellCoord)> = grid
        .buildable_cells()
        .filter(|cell| grid.can_build(*cell))
        .map(|cell| {
            let full = grid.to_full(cell);
            let distance = route
                .iter()
                .map(|waypoint| waypoint.manhattan_distance(full))
                .min()
                .filter(|distance| *distance > 0)
                .unwrap_or(u32::MAX);
            (distance, cell)
        })
        .collect();
    candidates.sort_by_key(|(distance, cell)| (*distance, cell.row(), cell.column()));

    let mut attempt = Vec::new();
    for (_, cell) in candidates {
        attempt.clear();
        world::apply(world, Command::PlaceTower { kind, cell }, &mut attempt);
        if attempt
            .iter()
            .any(|event| matches!(event, Event::TowerPlaced { .. }))
        {
            debug!("opponent placed {kind} tower at {cell:?}");
            out.append(&mut attempt);
            return true;
        }
        if attempt.iter().any(|event| {
            matches!(
                event,
                Event::TowerPlacementRejected {
                    reason: PlacementError::InsufficientGold,
                    ..
                }
            )
        }) {
            return false;
        }
    }

    warn!("opponent found no cell for a {kind} tower");
    false
}
