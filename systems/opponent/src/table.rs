//! Tabular action values and their persisted key-value shape.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use conquer_core::TowerKind;
use log::warn;

use crate::store::StoreError;

/// Discretized observation used as the first half of a table key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    /// Health bucket in `0..=4`.
    pub health: u8,
    /// Gold bucket, one step per fifty gold, capped.
    pub gold: u8,
    /// Tower count, capped.
    pub towers: u8,
    /// Live enemy count, capped.
    pub enemies: u8,
    /// Wave number.
    pub wave: u32,
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h{}_g{}_t{}_e{}_w{}",
            self.health, self.gold, self.towers, self.enemies, self.wave
        )
    }
}

/// Error returned when a persisted key cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed table key `{0}`")]
pub struct MalformedKey(String);

impl FromStr for StateKey {
    type Err = MalformedKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedKey(value.to_owned());
        let mut parts = value.split('_');
        let mut field = |prefix: char| {
            parts
                .next()
                .and_then(|part| part.strip_prefix(prefix))
                .ok_or_else(malformed)
        };

        let health = field('h')?;
        let gold = field('g')?;
        let towers = field('t')?;
        let enemies = field('e')?;
        let wave = field('w')?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Self {
            health: health.parse().map_err(|_| malformed())?,
            gold: gold.parse().map_err(|_| malformed())?,
            towers: towers.parse().map_err(|_| malformed())?,
            enemies: enemies.parse().map_err(|_| malformed())?,
            wave: wave.parse().map_err(|_| malformed())?,
        })
    }
}

/// Decision the opponent can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Save gold this turn.
    Wait,
    /// Construct a tower of the given kind.
    Build(TowerKind),
}

impl Action {
    /// Every action in enumeration order: wait first, then builds by tier.
    pub fn all() -> impl Iterator<Item = Action> {
        std::iter::once(Action::Wait).chain(TowerKind::ALL.into_iter().map(Action::Build))
    }

    /// Actions available with the given amount of gold, in enumeration order.
    pub fn affordable(gold: u32) -> impl Iterator<Item = Action> {
        Self::all().filter(move |action| match action {
            Action::Wait => true,
            Action::Build(kind) => kind.profile().cost <= gold,
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Wait => f.write_str("wait"),
            Action::Build(kind) => write!(f, "build_{}", kind.name()),
        }
    }
}

impl FromStr for Action {
    type Err = MalformedKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "wait" {
            return Ok(Action::Wait);
        }
        value
            .strip_prefix("build_")
            .and_then(TowerKind::parse)
            .map(Action::Build)
            .ok_or_else(|| MalformedKey(value.to_owned()))
    }
}

/// Learned value per `(state, action)` pair. Missing pairs are worth zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QTable {
    values: HashMap<(StateKey, Action), f32>,
}

impl QTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no pair has been learned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored value of the pair, zero when unknown.
    #[must_use]
    pub fn value(&self, state: StateKey, action: Action) -> f32 {
        self.values.get(&(state, action)).copied().unwrap_or(0.0)
    }

    /// Overwrites the value of the pair.
    pub fn set(&mut self, state: StateKey, action: Action, value: f32) {
        let _ = self.values.insert((state, action), value);
    }

    /// Highest value over every action in `state`, zero when nothing is known.
    #[must_use]
    pub fn max_value(&self, state: StateKey) -> f32 {
        Action::all()
            .map(|action| self.value(state, action))
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Best of `actions` in `state`. Ties resolve to the first enumerated action.
    #[must_use]
    pub fn best_action(&self, state: StateKey, actions: &[Action]) -> Option<Action> {
        let mut best: Option<(Action, f32)> = None;
        for &action in actions {
            let value = self.value(state, action);
            if best.map_or(true, |(_, incumbent)| value > incumbent) {
                best = Some((action, value));
            }
        }
        best.map(|(action, _)| action)
    }

    /// Parses a JSON object of `"state:action": value` entries.
    ///
    /// Entries whose key cannot be parsed are skipped with a warning.
    pub fn from_blob(blob: &str) -> Result<Self, StoreError> {
        let raw: BTreeMap<String, f32> = serde_json::from_str(blob)?;
        let mut table = Self::new();
        for (key, value) in raw {
            match parse_key(&key) {
                Ok((state, action)) => table.set(state, action, value),
                Err(error) => warn!("skipping persisted q-value: {error}"),
            }
        }
        Ok(table)
    }

    /// Serializes the table as a JSON object with sorted keys.
    pub fn to_blob(&self) -> Result<String, StoreError> {
        let raw: BTreeMap<String, f32> = self
            .values
            .iter()
            .map(|((state, action), value)| (format!("{state}:{action}"), *value))
            .collect();
        Ok(serde_json::to_string(&raw)?)
    }
}

fn parse_key(key: &str) -> Result<(StateKey, Action), MalformedKey> {
    let (state, action) = key
        .split_once(':')
        .ok_or_else(|| MalformedKey(key.to_owned()))?;
    Ok((state.parse()?, action.parse()?))
}
