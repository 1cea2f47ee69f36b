//! Projectile flight: seeking arrows and falling meteors.
//!
//! Both kinds home on the target's live position on every tick after the
//! one they were launched in. A projectile whose target is dead or gone
//! removes itself without dealing damage.

use hecs::Entity;

use lanewar_core::components::Projectile;
use lanewar_core::definitions::scale_damage;
use lanewar_core::events::PresentationEvent;
use lanewar_core::types::Position;

use crate::combat::CombatCtx;
use crate::systems::damage::apply_damage;

pub fn run(ctx: &mut CombatCtx<'_>, dt: f64, despawn_buffer: &mut Vec<Entity>) {
    despawn_buffer.clear();

    let in_flight: Vec<(Entity, Projectile, Position)> = ctx
        .world
        .query::<(&Projectile, &Position)>()
        .iter()
        .map(|(entity, (projectile, pos))| (entity, *projectile, *pos))
        .collect();

    for (entity, projectile, pos) in in_flight {
        let target_pos = ctx
            .registry
            .live_entity(projectile.target)
            .and_then(|target| ctx.world.get::<&Position>(target).ok().map(|p| *p));
        let Some(target_pos) = target_pos else {
            despawn_buffer.push(entity);
            continue;
        };
        if projectile.launched_at >= ctx.now {
            continue;
        }

        let next = pos.step_toward(&target_pos, projectile.speed * dt as f32);
        if next.range_to(&target_pos) <= projectile.impact_radius {
            impact(ctx, &projectile, target_pos);
            despawn_buffer.push(entity);
        } else if let Ok(mut p) = ctx.world.get::<&mut Position>(entity) {
            *p = next;
        }
    }

    for entity in despawn_buffer.drain(..) {
        let _ = ctx.world.despawn(entity);
    }
}

fn impact(ctx: &mut CombatCtx<'_>, projectile: &Projectile, point: Position) {
    ctx.events.push(PresentationEvent::ProjectileImpact {
        attacker: projectile.attacker,
        target: projectile.target,
        kind: projectile.kind,
        position: point,
    });
    apply_damage(ctx, projectile.target, projectile.damage);

    let Some(splash) = projectile.splash else {
        return;
    };
    let amount = scale_damage(projectile.damage, splash.fraction);
    if amount == 0 {
        return;
    }
    // Snapshot first: splash kills must not disturb the iteration.
    let victims = ctx
        .registry
        .within_radius(ctx.world, &point, splash.radius, |id, team| {
            team != projectile.attacker_team && id != projectile.target
        });
    for victim in victims {
        apply_damage(ctx, victim.id, amount);
    }
}
