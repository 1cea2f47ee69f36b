//! Attack strategies: the two-phase attack protocol.
//!
//! Phase 1 (`begin_attack`) records an intent against the chosen target and
//! signals presentation. Phase 2 (`resolve_hit`) fires later, from the
//! engine's wind-up timeline or a host `ResolveHit` command, and applies the
//! strategy's effect. Phase 2 re-validates everything it touches; a stale,
//! expired or already-consumed intent is a silent no-op.

use glam::Vec2;
use hecs::{Entity, World};

use lanewar_core::components::*;
use lanewar_core::definitions::{scale_damage, AttackProfile};
use lanewar_core::enums::{ProjectileKind, Team};
use lanewar_core::events::PresentationEvent;
use lanewar_core::types::{Position, UnitId};

use crate::combat::CombatCtx;
use crate::registry::SpatialRegistry;
use crate::systems::damage::apply_damage;
use crate::world_setup::spawn_projectile;

/// Why a `resolve_hit` call did or did not take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Resolved,
    /// Attacker dead or despawned.
    AttackerGone,
    /// Nothing pending (already resolved, or never started).
    NoIntent,
    /// The pending intent is not the one this continuation was issued for.
    Stale,
    /// Wind-up exceeded the configured cap.
    Expired,
    /// Target died or was despawned during the wind-up.
    TargetGone,
}

/// Phase 1: commit to an attack on `target`. Replaces any pending intent.
pub fn begin_attack(
    world: &mut World,
    entity: Entity,
    attacker: UnitId,
    target: UnitId,
    now: f64,
    events: &mut Vec<PresentationEvent>,
) -> Option<AttackIntent> {
    let mut strategy = world.get::<&mut AttackStrategy>(entity).ok()?;
    let intent = AttackIntent {
        target,
        issued_at: now,
    };
    strategy.pending = Some(intent);
    events.push(PresentationEvent::AttackStarted {
        unit: attacker,
        target,
    });
    Some(intent)
}

/// Phase 2: consume the pending intent of `attacker` and apply its effect.
///
/// `expected_issue` pins the call to one specific intent (timeline
/// continuations); host-driven calls pass `None` and resolve whatever is
/// pending.
pub fn resolve_hit(
    ctx: &mut CombatCtx<'_>,
    attacker: UnitId,
    expected_issue: Option<f64>,
    max_windup_secs: Option<f64>,
) -> HitOutcome {
    let Some(entity) = ctx.registry.live_entity(attacker) else {
        return HitOutcome::AttackerGone;
    };

    let (intent, profile) = {
        let Ok(mut strategy) = ctx.world.get::<&mut AttackStrategy>(entity) else {
            return HitOutcome::AttackerGone;
        };
        let Some(pending) = strategy.pending else {
            return HitOutcome::NoIntent;
        };
        if expected_issue.is_some_and(|t| t != pending.issued_at) {
            return HitOutcome::Stale;
        }
        strategy.pending = None;
        (pending, strategy.profile.clone())
    };

    if max_windup_secs.is_some_and(|max| ctx.now - intent.issued_at > max) {
        tracing::debug!(unit = %attacker, "attack wind-up expired");
        return HitOutcome::Expired;
    }
    let Some(target_entity) = ctx.registry.live_entity(intent.target) else {
        return HitOutcome::TargetGone;
    };
    let (Some(origin), Some(target_pos), Some(damage), Some(team)) = (
        position_of(ctx.world, entity),
        position_of(ctx.world, target_entity),
        ctx.world.get::<&UnitStats>(entity).ok().map(|s| s.damage),
        ctx.world.get::<&Team>(entity).ok().map(|t| *t),
    ) else {
        return HitOutcome::AttackerGone;
    };

    match profile {
        AttackProfile::Melee => {
            apply_damage(ctx, intent.target, damage);
        }
        AttackProfile::Ranged {
            projectile_speed,
            impact_radius,
        } => {
            let projectile = Projectile {
                kind: ProjectileKind::Seeking,
                attacker,
                attacker_team: team,
                target: intent.target,
                damage,
                speed: projectile_speed,
                impact_radius,
                splash: None,
                launched_at: ctx.now,
            };
            launch(ctx, projectile, origin);
        }
        AttackProfile::Chain {
            chain_range,
            max_bounces,
            secondary_multiplier,
        } => {
            let links = build_chain(
                ctx.world,
                ctx.registry,
                intent.target,
                target_pos,
                team,
                chain_range,
                max_bounces,
            );
            ctx.events.push(PresentationEvent::ChainLightning {
                attacker,
                links: links.clone(),
            });
            let secondary = scale_damage(damage, secondary_multiplier);
            for (hop, link) in links.into_iter().enumerate() {
                let amount = if hop == 0 { damage } else { secondary };
                apply_damage(ctx, link, amount);
            }
        }
        AttackProfile::AreaSplash {
            fall_speed,
            impact_radius,
            splash_radius,
            splash_fraction,
            spawn_height,
        } => {
            let projectile = Projectile {
                kind: ProjectileKind::Meteor,
                attacker,
                attacker_team: team,
                target: intent.target,
                damage,
                speed: fall_speed,
                impact_radius,
                splash: Some(Splash {
                    radius: splash_radius,
                    fraction: splash_fraction,
                }),
                launched_at: ctx.now,
            };
            launch(ctx, projectile, target_pos.offset(Vec2::new(0.0, spawn_height)));
        }
    }
    HitOutcome::Resolved
}

/// Build a lightning chain starting at `primary`.
///
/// Each hop goes from the current tail to the nearest living enemy of
/// `attacker_team` not yet in the chain, provided it lies within
/// `chain_range` of the tail. The chain holds at most `1 + max_bounces`
/// distinct units.
pub fn build_chain(
    world: &World,
    registry: &SpatialRegistry,
    primary: UnitId,
    primary_pos: Position,
    attacker_team: Team,
    chain_range: f32,
    max_bounces: u32,
) -> Vec<UnitId> {
    let mut links = vec![primary];
    let mut tail = primary_pos;

    for _ in 0..max_bounces {
        let next = registry.nearest(world, &tail, |id, team| {
            team != attacker_team && !links.contains(&id)
        });
        let Some(hit) = next.filter(|h| h.distance <= chain_range) else {
            break;
        };
        let Some(pos) = position_of(world, hit.entity) else {
            break;
        };
        links.push(hit.id);
        tail = pos;
    }
    links
}

fn launch(ctx: &mut CombatCtx<'_>, projectile: Projectile, origin: Position) {
    ctx.events.push(PresentationEvent::ProjectileLaunched {
        attacker: projectile.attacker,
        target: projectile.target,
        kind: projectile.kind,
    });
    spawn_projectile(ctx.world, projectile, origin);
}

fn position_of(world: &World, entity: Entity) -> Option<Position> {
    world.get::<&Position>(entity).ok().map(|p| *p)
}
