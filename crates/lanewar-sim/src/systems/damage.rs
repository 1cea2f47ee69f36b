//! Damage application, the single choke point for health changes.

use lanewar_core::components::{Health, Lifecycle};
use lanewar_core::enums::Team;
use lanewar_core::events::PresentationEvent;
use lanewar_core::types::UnitId;

use crate::combat::CombatCtx;

/// What a call to `apply_damage` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageReport {
    pub applied: u32,
    pub remaining: u32,
    /// This hit brought the unit to zero.
    pub killed: bool,
}

/// Deal `amount` damage to `target`.
///
/// Returns `None` when the target is unknown or already dead; dead units
/// absorb nothing. Health saturates at zero. The killing hit marks the unit
/// dead and removes it from the live registry before returning, so no later
/// query in the same tick can select it.
pub fn apply_damage(ctx: &mut CombatCtx<'_>, target: UnitId, amount: u32) -> Option<DamageReport> {
    let entity = ctx.registry.live_entity(target)?;

    let report = {
        let mut lifecycle = ctx.world.get::<&mut Lifecycle>(entity).ok()?;
        if !lifecycle.alive {
            return None;
        }
        let mut health = ctx.world.get::<&mut Health>(entity).ok()?;
        let applied = amount.min(health.current);
        health.current -= applied;
        let killed = health.current == 0;
        if killed {
            lifecycle.alive = false;
            lifecycle.died_at = Some(ctx.now);
        }
        DamageReport {
            applied,
            remaining: health.current,
            killed,
        }
    };

    if report.killed {
        ctx.registry.deregister(target);
        tracing::debug!(unit = %target, "unit killed");
    }
    if amount == 0 {
        return Some(report);
    }

    let team = ctx.world.get::<&Team>(entity).map(|t| *t).ok();
    if team == Some(Team::Enemy) {
        ctx.score.damage_dealt += u64::from(report.applied);
    }
    ctx.events.push(PresentationEvent::UnitDamaged {
        unit: target,
        amount: report.applied,
        remaining: report.remaining,
    });
    Some(report)
}
