// Completeness check for provider creature payloads.

use std::collections::HashMap;

use crate::db::CreatureRecord;
use crate::error::ValidationError;
use crate::provider::{CreaturePayload, MoveRef};

pub const HP: &str = "hp";
pub const ATTACK: &str = "attack";
pub const DEFENSE: &str = "defense";
pub const SPECIAL_ATTACK: &str = "special-attack";
pub const SPECIAL_DEFENSE: &str = "special-defense";
pub const SPEED: &str = "speed";

/// Stats every persisted creature must have, in report order.
pub const REQUIRED_STATS: [&str; 6] = [HP, ATTACK, DEFENSE, SPECIAL_ATTACK, SPECIAL_DEFENSE, SPEED];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseStats {
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub special_attack: i32,
    pub special_defense: i32,
    pub speed: i32,
}

/// A payload that passed validation: ready to persist, plus its move candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCreature {
    pub record: CreatureRecord,
    pub moves: Vec<MoveRef>,
}

/// Look up the six required stats by name. Order and extra entries don't matter;
/// values are taken as-is.
pub fn base_stats(creature: &str, stats: &[(String, i32)]) -> Result<BaseStats, ValidationError> {
    let by_name: HashMap<&str, i32> = stats.iter().map(|(n, v)| (n.as_str(), *v)).collect();
    let get = |stat: &'static str| {
        by_name
            .get(stat)
            .copied()
            .ok_or_else(|| ValidationError::MissingStat {
                creature: creature.to_string(),
                stat,
            })
    };

    Ok(BaseStats {
        hp: get(HP)?,
        attack: get(ATTACK)?,
        defense: get(DEFENSE)?,
        special_attack: get(SPECIAL_ATTACK)?,
        special_defense: get(SPECIAL_DEFENSE)?,
        speed: get(SPEED)?,
    })
}

pub fn validate(payload: CreaturePayload) -> Result<ValidatedCreature, ValidationError> {
    let stats = base_stats(&payload.name, &payload.stats)?;

    let mut types = payload.types.into_iter();
    let type1 = types.next().ok_or_else(|| ValidationError::MissingType {
        creature: payload.name.clone(),
    })?;
    let type2 = types.next();

    let record = CreatureRecord {
        id: payload.id,
        name: payload.name,
        type1,
        type2,
        hp: stats.hp,
        attack: stats.attack,
        defense: stats.defense,
        special_attack: stats.special_attack,
        special_defense: stats.special_defense,
        speed: stats.speed,
        artwork_url: payload.artwork_url,
    };

    Ok(ValidatedCreature {
        record,
        moves: payload.moves,
    })
}
