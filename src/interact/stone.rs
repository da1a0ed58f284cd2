use crate::animation::Animator;
use crate::shared::*;

pub const PICKAXE: &str = "pickaxe";

/// How long a stone flashes after taking a hit.
pub const HIT_FLASH_SECS: f32 = 0.15;

/// A breakable rock. Mining is clocked by the player's `Mining` animation:
/// one hit per animation cycle, landing on `hit_frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stone {
    pub hits: u32,
    pub hits_to_break: u32,
    pub hit_frame: usize,
    pub drop: Option<(ItemId, u32)>,
    pub being_mined: bool,
    /// Seconds left on the hit flash.
    pub flash: f32,
    last_hit_cycle: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoneProgress {
    Idle,
    Hit { hits: u32 },
    Break,
}

impl Stone {
    pub fn new(hits_to_break: u32, hit_frame: usize, drop: Option<(ItemId, u32)>) -> Self {
        Self {
            hits: 0,
            hits_to_break: hits_to_break.max(1),
            hit_frame,
            drop,
            being_mined: false,
            flash: 0.0,
            last_hit_cycle: None,
        }
    }

    pub fn start_mining(&mut self) {
        self.being_mined = true;
        self.last_hit_cycle = None;
    }

    pub fn stop_mining(&mut self) {
        self.being_mined = false;
    }

    pub fn is_flashing(&self) -> bool {
        self.flash > 0.0
    }

    pub fn update(&mut self, dt: f32, player_anim: AnimState, animator: &Animator) -> StoneProgress {
        self.flash = (self.flash - dt).max(0.0);
        if !self.being_mined {
            return StoneProgress::Idle;
        }
        if player_anim != AnimState::Mining {
            self.stop_mining();
            return StoneProgress::Idle;
        }
        // The animator picks up the new state a frame later.
        if animator.state != AnimState::Mining {
            return StoneProgress::Idle;
        }
        if animator.frame < self.hit_frame || self.last_hit_cycle == Some(animator.cycle) {
            return StoneProgress::Idle;
        }

        self.last_hit_cycle = Some(animator.cycle);
        self.hits += 1;
        self.flash = HIT_FLASH_SECS;
        if self.hits >= self.hits_to_break {
            self.being_mined = false;
            StoneProgress::Break
        } else {
            StoneProgress::Hit { hits: self.hits }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationSet;

    fn mine(stone: &mut Stone, animator: &mut Animator, set: &AnimationSet, seconds: f32) -> Vec<StoneProgress> {
        let dt = 1.0 / 60.0;
        let mut events = Vec::new();
        let mut t = 0.0;
        while t < seconds {
            animator.advance(dt, AnimState::Mining, set);
            match stone.update(dt, AnimState::Mining, animator) {
                StoneProgress::Idle => {}
                progress => events.push(progress),
            }
            t += dt;
        }
        events
    }

    #[test]
    fn test_one_hit_per_cycle_until_break() {
        let set = AnimationSet::humanoid();
        let clip = set.get(AnimState::Mining);
        let cycle_secs = clip.frame_count as f32 * clip.frame_time;

        let mut stone = Stone::new(3, 2, Some(("stone".into(), 1)));
        let mut animator = Animator::default();
        stone.start_mining();

        let events = mine(&mut stone, &mut animator, &set, cycle_secs * 5.0);
        assert_eq!(
            events,
            vec![
                StoneProgress::Hit { hits: 1 },
                StoneProgress::Hit { hits: 2 },
                StoneProgress::Break
            ]
        );
        assert_eq!(stone.hits, 3);
    }

    #[test]
    fn test_hit_flash_decays_with_time() {
        let set = AnimationSet::humanoid();
        let mut stone = Stone::new(5, 0, None);
        let mut animator = Animator::default();
        stone.start_mining();

        animator.advance(0.01, AnimState::Mining, &set);
        assert_eq!(stone.update(0.01, AnimState::Mining, &animator), StoneProgress::Hit { hits: 1 });
        assert!(stone.is_flashing());

        stone.stop_mining();
        stone.update(HIT_FLASH_SECS, AnimState::Idle, &animator);
        assert!(!stone.is_flashing());
    }

    #[test]
    fn test_no_progress_before_hit_frame() {
        let set = AnimationSet::humanoid();
        let mut stone = Stone::new(3, 3, None);
        let mut animator = Animator::default();
        stone.start_mining();

        // Frames 0..=2 only.
        let clip = set.get(AnimState::Mining);
        let events = mine(&mut stone, &mut animator, &set, clip.frame_time * 2.5);
        assert!(events.is_empty());
    }

    #[test]
    fn test_leaving_mining_state_stops_progress() {
        let set = AnimationSet::humanoid();
        let mut stone = Stone::new(3, 0, None);
        let mut animator = Animator::default();
        stone.start_mining();

        animator.advance(0.01, AnimState::Mining, &set);
        assert_eq!(stone.update(0.01, AnimState::Mining, &animator), StoneProgress::Hit { hits: 1 });

        animator.advance(0.01, AnimState::Walk, &set);
        assert_eq!(stone.update(0.01, AnimState::Walk, &animator), StoneProgress::Idle);
        assert!(!stone.being_mined);

        animator.advance(1.0, AnimState::Mining, &set);
        assert_eq!(stone.update(0.01, AnimState::Mining, &animator), StoneProgress::Idle);
    }

    #[test]
    fn test_not_mining_means_idle() {
        let mut stone = Stone::new(1, 0, None);
        let animator = Animator {
            state: AnimState::Mining,
            ..Default::default()
        };
        assert_eq!(stone.update(0.01, AnimState::Mining, &animator), StoneProgress::Idle);
    }
}
