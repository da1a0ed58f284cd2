use bevy::prelude::*;

use crate::shared::*;

/// What the combat system needs from a fighter. Both the player and enemies
/// are driven through this, one `&mut dyn Combatant` per side.
pub trait Combatant {
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    fn facing(&self) -> Facing;
    fn set_facing(&mut self, facing: Facing);
    fn scale(&self) -> f32;
    fn set_scale(&mut self, scale: f32);
    fn anim(&self) -> AnimState;
    fn set_anim(&mut self, anim: AnimState);
    fn health(&self) -> f32;
    fn max_health(&self) -> f32;
    /// Health never drops below zero.
    fn take_damage(&mut self, amount: f32);
    fn heal_full(&mut self);
}

/// Borrowed view over one fighter's ECS components.
pub struct FighterMut<'a> {
    pub position: &'a mut LogicalPosition,
    pub body: &'a mut Body,
    pub vitals: &'a mut Vitals,
}

impl Combatant for FighterMut<'_> {
    fn position(&self) -> Vec2 {
        self.position.0
    }

    fn set_position(&mut self, position: Vec2) {
        self.position.0 = position;
    }

    fn facing(&self) -> Facing {
        self.body.facing
    }

    fn set_facing(&mut self, facing: Facing) {
        self.body.facing = facing;
    }

    fn scale(&self) -> f32 {
        self.body.scale
    }

    fn set_scale(&mut self, scale: f32) {
        self.body.scale = scale;
    }

    fn anim(&self) -> AnimState {
        self.body.anim
    }

    fn set_anim(&mut self, anim: AnimState) {
        self.body.anim = anim;
    }

    fn health(&self) -> f32 {
        self.vitals.health
    }

    fn max_health(&self) -> f32 {
        self.vitals.max_health
    }

    fn take_damage(&mut self, amount: f32) {
        self.vitals.health = (self.vitals.health - amount).max(0.0);
    }

    fn heal_full(&mut self) {
        self.vitals.health = self.vitals.max_health;
    }
}

/// Owned fighter for exercising the combat system without a `World`.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct TestFighter {
    pub position: LogicalPosition,
    pub body: Body,
    pub vitals: Vitals,
}

#[cfg(test)]
impl TestFighter {
    pub fn new(x: f32, y: f32, health: f32) -> Self {
        Self {
            position: LogicalPosition(Vec2::new(x, y)),
            body: Body::default(),
            vitals: Vitals::full(health),
        }
    }

    pub fn view(&mut self) -> FighterMut<'_> {
        FighterMut {
            position: &mut self.position,
            body: &mut self.body,
            vitals: &mut self.vitals,
        }
    }
}
