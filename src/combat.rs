// Matchup tables and combat resolution.

use serde::{Deserialize, Serialize};

use crate::enums::UnitKind;
use crate::enums::UnitKind::*;

/// Directed melee "defeats" table (orthogonal adjacency)
pub fn melee_defeats(attacker: UnitKind) -> &'static [UnitKind] {
    match attacker {
        Swordsman => &[Archer, Cavalry, Axeman, Swordsman, Spearman],
        Shieldman => &[Archer],
        Axeman => &[Archer, Shieldman, Cavalry, Axeman, Spearman],
        Cavalry => &[Archer, Cavalry, Spearman],
        Archer => &[Archer],
        Spearman => &[Archer, Shieldman, Cavalry, Spearman],
    }
}

/// Directed ranged table (distance 2). Only Archer and Spearman shoot;
/// nobody can shoot a Shieldman.
pub fn ranged_defeats(attacker: UnitKind) -> &'static [UnitKind] {
    match attacker {
        Archer => &[Archer, Cavalry, Axeman, Swordsman, Spearman],
        Spearman => &[Archer, Cavalry, Spearman],
        _ => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engagement {
    Melee,
    Ranged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub attacker_dies: bool,
    pub defender_dies: bool,
}

pub fn defeats(attacker: UnitKind, defender: UnitKind, engagement: Engagement) -> bool {
    match engagement {
        Engagement::Melee => melee_defeats(attacker).contains(&defender),
        Engagement::Ranged => defender != Shieldman && ranged_defeats(attacker).contains(&defender),
    }
}

/// Applies both directed tables. Legality (attacker must be able to win) is
/// checked by the rules engine, not here.
pub fn resolve(attacker: UnitKind, defender: UnitKind, engagement: Engagement) -> CombatOutcome {
    CombatOutcome {
        attacker_dies: defeats(defender, attacker, engagement),
        defender_dies: defeats(attacker, defender, engagement),
    }
}

/// True if none of `threats` can defeat `unit` by melee or ranged rules.
pub fn is_invincible_against(unit: UnitKind, threats: &[UnitKind]) -> bool {
    !threats.iter().any(|t| {
        defeats(*t, unit, Engagement::Melee) || defeats(*t, unit, Engagement::Ranged)
    })
}
