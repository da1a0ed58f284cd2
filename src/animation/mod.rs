//! Per-entity animation state.
//!
//! Every animated entity owns an `AnimationSet`: a map from `AnimState` to an
//! immutable descriptor. The `Animator` walks the descriptor for the body's
//! current state and counts completed cycles, which the mining logic uses as
//! its clock. Visuals are placeholder: the descriptor shades the tint.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::shared::*;

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (advance_animators, apply_body_visuals).chain());
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationDescriptor {
    pub frame_count: usize,
    /// Seconds per frame.
    pub frame_time: f32,
    pub looping: bool,
    /// Brightness multiplier applied to the entity's tint.
    pub shade: f32,
}

impl AnimationDescriptor {
    pub const fn new(frame_count: usize, frame_time: f32, looping: bool, shade: f32) -> Self {
        Self {
            frame_count,
            frame_time,
            looping,
            shade,
        }
    }
}

const FALLBACK: AnimationDescriptor = AnimationDescriptor::new(1, 1.0, true, 1.0);

#[derive(Component, Debug, Clone)]
pub struct AnimationSet {
    clips: HashMap<AnimState, AnimationDescriptor>,
}

impl AnimationSet {
    pub fn new(clips: impl IntoIterator<Item = (AnimState, AnimationDescriptor)>) -> Self {
        Self {
            clips: clips.into_iter().collect(),
        }
    }

    /// Missing states fall back to `Idle`, then to a single still frame.
    pub fn get(&self, state: AnimState) -> AnimationDescriptor {
        self.clips
            .get(&state)
            .or_else(|| self.clips.get(&AnimState::Idle))
            .copied()
            .unwrap_or(FALLBACK)
    }

    /// Player, enemies and NPCs share this layout.
    pub fn humanoid() -> Self {
        Self::new([
            (AnimState::Idle, AnimationDescriptor::new(2, 0.5, true, 1.0)),
            (AnimState::Walk, AnimationDescriptor::new(4, 0.15, true, 1.0)),
            (AnimState::Run, AnimationDescriptor::new(4, 0.1, true, 1.05)),
            (AnimState::Mining, AnimationDescriptor::new(4, 0.12, true, 0.9)),
            (AnimState::Attack, AnimationDescriptor::new(4, 0.1, false, 1.2)),
            (AnimState::Roll, AnimationDescriptor::new(6, 0.08, false, 1.1)),
            (AnimState::Slam, AnimationDescriptor::new(5, 0.12, false, 1.25)),
            (AnimState::Hurt, AnimationDescriptor::new(2, 0.1, true, 0.6)),
            (AnimState::Counter, AnimationDescriptor::new(3, 0.1, false, 1.4)),
            (AnimState::Dead, AnimationDescriptor::new(1, 1.0, false, 0.35)),
        ])
    }
}

#[derive(Component, Debug, Clone, Default)]
pub struct Animator {
    pub state: AnimState,
    pub frame: usize,
    pub elapsed: f32,
    /// Completed passes through a looping clip since the state was entered.
    pub cycle: u32,
}

impl Animator {
    pub fn advance(&mut self, dt: f32, state: AnimState, set: &AnimationSet) {
        if state != self.state {
            *self = Animator {
                state,
                ..default()
            };
        }
        let clip = set.get(state);
        if clip.frame_count <= 1 || clip.frame_time <= 0.0 {
            return;
        }

        self.elapsed += dt;
        while self.elapsed >= clip.frame_time {
            self.elapsed -= clip.frame_time;
            if self.frame + 1 < clip.frame_count {
                self.frame += 1;
            } else if clip.looping {
                self.frame = 0;
                self.cycle += 1;
            } else {
                self.elapsed = 0.0;
                break;
            }
        }
    }
}

fn advance_animators(time: Res<Time>, mut query: Query<(&Body, &AnimationSet, &mut Animator)>) {
    let dt = time.delta_secs();
    for (body, set, mut animator) in &mut query {
        animator.advance(dt, body.anim, set);
    }
}

fn apply_body_visuals(mut query: Query<(&Body, &AnimationSet, &Animator, &Tint, &mut Sprite)>) {
    for (body, set, animator, tint, mut sprite) in &mut query {
        let clip = set.get(animator.state);
        // Odd frames pulse slightly so loops read as motion.
        let pulse = if animator.frame % 2 == 1 { 0.92 } else { 1.0 };
        let base = tint.0.to_srgba();
        let shade = clip.shade * pulse;
        sprite.color = Color::srgba(
            (base.red * shade).min(1.0),
            (base.green * shade).min(1.0),
            (base.blue * shade).min(1.0),
            base.alpha,
        );
        sprite.flip_x = body.facing == Facing::Left;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looping_clip_counts_cycles() {
        let set = AnimationSet::humanoid();
        let mut animator = Animator::default();
        let mining = set.get(AnimState::Mining);

        // One full pass plus one frame.
        let steps = mining.frame_count + 1;
        for _ in 0..steps {
            animator.advance(mining.frame_time, AnimState::Mining, &set);
        }
        assert_eq!(animator.cycle, 1);
        assert_eq!(animator.frame, 1);
    }

    #[test]
    fn test_state_change_resets_progress() {
        let set = AnimationSet::humanoid();
        let mut animator = Animator::default();
        animator.advance(1.0, AnimState::Mining, &set);
        assert!(animator.cycle > 0);

        animator.advance(0.0, AnimState::Walk, &set);
        assert_eq!(animator.state, AnimState::Walk);
        assert_eq!(animator.frame, 0);
        assert_eq!(animator.cycle, 0);
    }

    #[test]
    fn test_one_shot_clip_holds_last_frame() {
        let set = AnimationSet::humanoid();
        let mut animator = Animator::default();
        animator.advance(5.0, AnimState::Attack, &set);
        assert_eq!(animator.frame, set.get(AnimState::Attack).frame_count - 1);
        assert_eq!(animator.cycle, 0);
    }

    #[test]
    fn test_missing_state_falls_back_to_idle() {
        let set = AnimationSet::new([(AnimState::Idle, AnimationDescriptor::new(3, 0.2, true, 1.0))]);
        assert_eq!(set.get(AnimState::Slam).frame_count, 3);
        assert_eq!(AnimationSet::new([]).get(AnimState::Walk), FALLBACK);
    }
}
