use std::collections::VecDeque;

use bevy::prelude::*;

use crate::shared::*;

/// Within this distance a waypoint counts as reached.
pub const ARRIVAL_THRESHOLD: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Npc {
    pub npc_id: String,
    pub name: String,
    pub dialogue: String,
    /// Absolute map positions, visited front to back.
    pub waypoints: VecDeque<Vec2>,
    pub speed: f32,
}

impl Npc {
    pub fn new(npc_id: impl Into<String>, name: impl Into<String>, dialogue: impl Into<String>) -> Self {
        Self {
            npc_id: npc_id.into(),
            name: name.into(),
            dialogue: dialogue.into(),
            waypoints: VecDeque::new(),
            speed: 40.0,
        }
    }

    pub fn queue_walk(&mut self, points: impl IntoIterator<Item = Vec2>) {
        self.waypoints.extend(points);
    }

    pub fn is_walking(&self) -> bool {
        !self.waypoints.is_empty()
    }

    /// Moves `position` toward the front waypoint. Returns the facing of the
    /// step taken, or `None` when standing still.
    pub fn step(&mut self, position: &mut Vec2, dt: f32) -> Option<Facing> {
        let target = *self.waypoints.front()?;
        let to_target = target - *position;

        if to_target.length() <= ARRIVAL_THRESHOLD {
            *position = target;
            self.waypoints.pop_front();
            return None;
        }

        let velocity = to_target.normalize_or_zero() * self.speed;
        let step = velocity * dt;
        *position += step.clamp_length_max(to_target.length());
        Facing::from_velocity(velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walks_waypoints_in_order_and_faces_travel() {
        let mut npc = Npc::new("mira", "Mira", "mira_intro");
        npc.queue_walk([Vec2::new(20.0, 0.0), Vec2::new(20.0, -30.0)]);
        let mut pos = Vec2::ZERO;

        let mut facings = Vec::new();
        let mut reached = Vec::new();
        for _ in 0..200 {
            let before = npc.waypoints.len();
            if let Some(facing) = npc.step(&mut pos, 0.05) {
                if facings.last() != Some(&facing) {
                    facings.push(facing);
                }
            }
            if npc.waypoints.len() < before {
                reached.push(pos);
            }
        }

        assert_eq!(facings, vec![Facing::Right, Facing::Up]);
        assert_eq!(reached, vec![Vec2::new(20.0, 0.0), Vec2::new(20.0, -30.0)]);
        assert!(!npc.is_walking());
    }

    #[test]
    fn test_idle_without_waypoints() {
        let mut npc = Npc::new("mira", "Mira", "mira_intro");
        let mut pos = Vec2::new(5.0, 5.0);
        assert_eq!(npc.step(&mut pos, 1.0), None);
        assert_eq!(pos, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_close_waypoint_snaps() {
        let mut npc = Npc::new("mira", "Mira", "mira_intro");
        npc.queue_walk([Vec2::new(1.5, 0.0)]);
        let mut pos = Vec2::ZERO;
        npc.step(&mut pos, 0.016);
        assert_eq!(pos, Vec2::new(1.5, 0.0));
        assert!(!npc.is_walking());
    }
}
