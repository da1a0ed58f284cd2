//! Turn-based battle state machine.
//!
//! One side acts per turn. A turn walks through
//! `Input → Approaching → Attacking → Returning → EndTurn`; during an enemy
//! attack the player may divert it into `Countering` by pressing counter
//! inside the attack's counter window.
//!
//! The system owns no fighters. Each `update` borrows both through
//! `&mut dyn Combatant` and holds nothing between calls.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::attack::{Attack, CounterWindow};
use super::combatant::Combatant;
use crate::config::CombatConfig;
use crate::inventory::Inventory;
use crate::shared::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatState {
    PlayerTurn,
    EnemyTurn,
    Victory,
    Defeat,
}

impl CombatState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CombatState::Victory | CombatState::Defeat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    Input,
    Approaching,
    Attacking,
    Returning,
    EndTurn,
    Countering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Basic,
    Roll,
}

/// Logical input for one combat frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombatInput {
    pub action: Option<PlayerAction>,
    pub counter: bool,
}

/// Things that happened during an update, drained by the Bevy wrapper for
/// audio and HUD feedback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatCue {
    Swing,
    Hit { on_player: bool, damage: f32 },
    CounterSuccess { damage: f32 },
    CounterMissed,
    Finished(CombatOutcome),
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    position: Vec2,
    scale: f32,
    facing: Facing,
}

impl Snapshot {
    fn take(fighter: &dyn Combatant) -> Self {
        Self {
            position: fighter.position(),
            scale: fighter.scale(),
            facing: fighter.facing(),
        }
    }

    fn restore(&self, fighter: &mut dyn Combatant) {
        fighter.set_position(self.position);
        fighter.set_scale(self.scale);
        fighter.set_facing(self.facing);
    }
}

/// Per-attack counter bookkeeping. One attempt per enemy attack.
#[derive(Debug, Clone, Copy, Default)]
struct CounterAttempt {
    attempted: bool,
    succeeded: bool,
    damage_applied: bool,
}

pub struct CombatSystem {
    config: CombatConfig,
    state: CombatState,
    phase: TurnPhase,
    active: bool,
    timer: f32,
    enemy_attacks: Vec<Attack>,
    current_attack: Option<Attack>,
    attacker_start: Vec2,
    attacker_start_facing: Facing,
    approach_x: f32,
    lunge_x: f32,
    damage_applied: bool,
    counter: CounterAttempt,
    saved: Option<(Snapshot, Snapshot)>,
    cues: Vec<CombatCue>,
    rng: StdRng,
}

impl CombatSystem {
    pub fn new(config: CombatConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn seeded(config: CombatConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: CombatConfig, rng: StdRng) -> Self {
        Self {
            config,
            state: CombatState::PlayerTurn,
            phase: TurnPhase::Input,
            active: false,
            timer: 0.0,
            enemy_attacks: Vec::new(),
            current_attack: None,
            attacker_start: Vec2::ZERO,
            attacker_start_facing: Facing::Right,
            approach_x: 0.0,
            lunge_x: 0.0,
            damage_applied: false,
            counter: CounterAttempt::default(),
            saved: None,
            cues: Vec::new(),
            rng,
        }
    }

    // ─── Queries ────────────────────────────────────────────────────────

    pub fn state(&self) -> CombatState {
        self.state
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Seconds since the current attack started swinging.
    pub fn attack_timer(&self) -> f32 {
        self.timer
    }

    pub fn current_attack(&self) -> Option<&Attack> {
        self.current_attack.as_ref()
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        match self.state {
            CombatState::Victory => Some(CombatOutcome::Victory),
            CombatState::Defeat => Some(CombatOutcome::Defeat),
            _ => None,
        }
    }

    /// True once the player has spent the counter attempt for this attack.
    pub fn counter_attempted(&self) -> bool {
        self.counter.attempted
    }

    pub fn counter_succeeded(&self) -> bool {
        self.counter.succeeded
    }

    /// The counter window the player can currently aim for, if any.
    pub fn open_counter_window(&self) -> Option<CounterWindow> {
        if self.state != CombatState::EnemyTurn || self.phase != TurnPhase::Attacking {
            return None;
        }
        self.current_attack
            .as_ref()
            .and_then(Attack::active_counter_window)
    }

    pub fn drain_cues(&mut self) -> Vec<CombatCue> {
        std::mem::take(&mut self.cues)
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────

    /// Moves both fighters onto the stage and hands the first turn to the
    /// player. Enemy attacks that fail validation are dropped.
    pub fn start_combat(
        &mut self,
        player: &mut dyn Combatant,
        enemy: &mut dyn Combatant,
        enemy_attacks: Vec<Attack>,
    ) {
        self.saved = Some((Snapshot::take(player), Snapshot::take(enemy)));

        self.enemy_attacks = enemy_attacks
            .into_iter()
            .filter(|attack| match attack.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("[Combat] dropping enemy attack: {}", e);
                    false
                }
            })
            .collect();
        if self.enemy_attacks.is_empty() {
            warn!("[Combat] enemy has no usable attacks and will pass its turns");
        }

        let player_stage = self.config.player_stage();
        let enemy_stage = self.config.enemy_stage();
        player.set_position(player_stage);
        enemy.set_position(enemy_stage);
        player.set_facing(Facing::toward_x(player_stage.x, enemy_stage.x));
        enemy.set_facing(Facing::toward_x(enemy_stage.x, player_stage.x));
        player.set_scale(self.config.battle_scale);
        enemy.set_scale(self.config.battle_scale);
        player.set_anim(AnimState::Idle);
        enemy.set_anim(AnimState::Idle);

        self.state = CombatState::PlayerTurn;
        self.phase = TurnPhase::Input;
        self.active = true;
        self.timer = 0.0;
        self.current_attack = None;
        self.counter = CounterAttempt::default();
        self.cues.clear();

        info!(
            "[Combat] started: player {:.0} hp vs enemy {:.0} hp, {} enemy attacks",
            player.health(),
            enemy.health(),
            self.enemy_attacks.len()
        );
    }

    /// Puts both fighters back where they were and fully heals the enemy.
    /// The player keeps whatever health the battle left.
    pub fn end_combat(&mut self, player: &mut dyn Combatant, enemy: &mut dyn Combatant) {
        if let Some((player_snap, enemy_snap)) = self.saved.take() {
            player_snap.restore(player);
            enemy_snap.restore(enemy);
        }
        enemy.heal_full();
        enemy.set_anim(AnimState::Idle);
        if player.health() > 0.0 {
            player.set_anim(AnimState::Idle);
        }
        self.active = false;
        self.current_attack = None;
        debug!("[Combat] ended in {:?}", self.state);
    }

    // ─── Frame update ───────────────────────────────────────────────────

    pub fn update(
        &mut self,
        dt: f32,
        input: &CombatInput,
        inventory: &Inventory,
        player: &mut dyn Combatant,
        enemy: &mut dyn Combatant,
    ) {
        if !self.active || self.state.is_terminal() {
            return;
        }

        if self.phase == TurnPhase::EndTurn {
            self.end_turn(player, enemy);
            return;
        }

        match self.state {
            CombatState::PlayerTurn => self.player_turn(dt, input, inventory, player, enemy),
            CombatState::EnemyTurn => self.enemy_turn(dt, input, player, enemy),
            CombatState::Victory | CombatState::Defeat => {}
        }
    }

    fn player_turn(
        &mut self,
        dt: f32,
        input: &CombatInput,
        inventory: &Inventory,
        player: &mut dyn Combatant,
        enemy: &mut dyn Combatant,
    ) {
        match self.phase {
            TurnPhase::Input => {
                let attack = match input.action {
                    Some(PlayerAction::Basic) => self.config.basic_attack.clone(),
                    Some(PlayerAction::Roll) if inventory.has_item(&self.config.roll_item) => {
                        self.config.roll_attack.clone()
                    }
                    Some(PlayerAction::Roll) => {
                        debug!("[Combat] roll needs '{}'", self.config.roll_item);
                        return;
                    }
                    None => return,
                };
                self.begin_attack(attack, player, enemy);
            }
            TurnPhase::Approaching => self.approach(dt, player),
            TurnPhase::Attacking => self.attack(dt, player, enemy),
            TurnPhase::Returning => self.return_home(dt, player),
            TurnPhase::EndTurn | TurnPhase::Countering => {}
        }
    }

    fn enemy_turn(
        &mut self,
        dt: f32,
        input: &CombatInput,
        player: &mut dyn Combatant,
        enemy: &mut dyn Combatant,
    ) {
        match self.phase {
            TurnPhase::Input => {
                let Some(attack) = self.enemy_attacks.choose(&mut self.rng).cloned() else {
                    debug!("[Combat] enemy passes");
                    self.phase = TurnPhase::EndTurn;
                    return;
                };
                self.begin_attack(attack, enemy, player);
            }
            TurnPhase::Approaching => self.approach(dt, enemy),
            TurnPhase::Attacking => {
                if input.counter && self.try_counter(dt, player, enemy) {
                    return;
                }
                self.attack(dt, enemy, player);
            }
            TurnPhase::Countering => self.hold_counter(dt, player, enemy),
            TurnPhase::Returning => self.return_home(dt, enemy),
            TurnPhase::EndTurn => {}
        }
    }

    // ─── Phases ─────────────────────────────────────────────────────────

    fn begin_attack(
        &mut self,
        attack: Attack,
        attacker: &mut dyn Combatant,
        defender: &mut dyn Combatant,
    ) {
        let from = attacker.position();
        let to_x = defender.position().x;
        let dir = match (to_x - from.x).partial_cmp(&0.0) {
            Some(std::cmp::Ordering::Less) => -1.0,
            Some(std::cmp::Ordering::Greater) => 1.0,
            _ if attacker.facing() == Facing::Left => -1.0,
            _ => 1.0,
        };

        self.attacker_start = from;
        self.attacker_start_facing = attacker.facing();
        self.approach_x = to_x - dir * attack.reach;
        self.lunge_x = self.approach_x + dir * attack.lunge.map_or(0.0, |l| l.target_offset);
        self.timer = 0.0;
        self.damage_applied = false;
        self.counter = CounterAttempt::default();

        attacker.set_facing(if dir < 0.0 { Facing::Left } else { Facing::Right });
        attacker.set_anim(AnimState::Run);

        debug!("[Combat] {:?} uses {}", self.state, attack.name);
        self.current_attack = Some(attack);
        self.phase = TurnPhase::Approaching;
    }

    fn approach(&mut self, dt: f32, attacker: &mut dyn Combatant) {
        let pos = attacker.position();
        let x = step_toward(pos.x, self.approach_x, self.config.approach_speed * dt);
        attacker.set_position(Vec2::new(x, pos.y));

        if (x - self.approach_x).abs() <= self.config.move_threshold {
            self.phase = TurnPhase::Attacking;
            self.timer = 0.0;
            if let Some(attack) = &self.current_attack {
                attacker.set_anim(attack.anim);
            }
            self.cues.push(CombatCue::Swing);
        }
    }

    fn attack(&mut self, dt: f32, attacker: &mut dyn Combatant, defender: &mut dyn Combatant) {
        let Some(attack) = self.current_attack.clone() else {
            self.phase = TurnPhase::Returning;
            return;
        };
        self.timer += dt;
        attacker.set_anim(attack.anim);

        if let Some(lunge) = attack.lunge.filter(|l| l.speed > 0.0) {
            let pos = attacker.position();
            if (pos.x - self.lunge_x).abs() > lunge.stop_threshold {
                let x = step_toward(pos.x, self.lunge_x, lunge.speed * dt);
                attacker.set_position(Vec2::new(x, pos.y));
            }
        }

        if self.timer < attack.impact_time {
            if defender.anim() != AnimState::Counter {
                defender.set_anim(AnimState::Idle);
            }
        } else if self.timer < attack.end_time {
            defender.set_anim(AnimState::Hurt);
        } else {
            if !self.damage_applied {
                defender.take_damage(attack.damage);
                self.damage_applied = true;
                self.cues.push(CombatCue::Hit {
                    on_player: self.state == CombatState::EnemyTurn,
                    damage: attack.damage,
                });
                debug!(
                    "[Combat] {} hits for {:.0}, defender at {:.0}",
                    attack.name,
                    attack.damage,
                    defender.health()
                );
            }
            defender.set_anim(AnimState::Idle);
            self.begin_return(attacker);
        }
    }

    /// Resolves the single counter attempt for the current enemy attack,
    /// judged at the end of this frame. Returns true when the attack was
    /// diverted into `Countering`; otherwise the timer is left for `attack`.
    fn try_counter(
        &mut self,
        dt: f32,
        player: &mut dyn Combatant,
        enemy: &mut dyn Combatant,
    ) -> bool {
        let Some(attack) = &self.current_attack else {
            return false;
        };
        let Some(window) = attack.active_counter_window() else {
            return false;
        };
        let pressed_at = self.timer + dt;
        if self.counter.attempted || pressed_at >= attack.end_time {
            return false;
        }

        self.counter.attempted = true;
        if !window.contains(pressed_at) {
            debug!("[Combat] counter missed at {:.2}s", pressed_at);
            self.cues.push(CombatCue::CounterMissed);
            return false;
        }

        self.timer = pressed_at;
        self.counter.succeeded = true;
        self.phase = TurnPhase::Countering;
        player.set_anim(AnimState::Counter);
        enemy.set_anim(AnimState::Hurt);
        if !self.counter.damage_applied {
            let damage = self.config.counter_damage;
            enemy.take_damage(damage);
            self.counter.damage_applied = true;
            self.cues.push(CombatCue::CounterSuccess { damage });
            info!("[Combat] counter landed for {:.0}", damage);
        }
        true
    }

    fn hold_counter(&mut self, dt: f32, player: &mut dyn Combatant, enemy: &mut dyn Combatant) {
        self.timer += dt;
        let window_end = self
            .current_attack
            .as_ref()
            .and_then(|a| a.counter_window)
            .map_or(0.0, |w| w.end);

        if self.timer < window_end {
            enemy.set_anim(AnimState::Hurt);
            player.set_anim(AnimState::Counter);
        } else {
            player.set_anim(AnimState::Idle);
            self.begin_return(enemy);
        }
    }

    fn begin_return(&mut self, attacker: &mut dyn Combatant) {
        let x = attacker.position().x;
        attacker.set_facing(Facing::toward_x(x, self.attacker_start.x));
        attacker.set_anim(AnimState::Walk);
        self.phase = TurnPhase::Returning;
    }

    fn return_home(&mut self, dt: f32, attacker: &mut dyn Combatant) {
        let pos = attacker.position();
        let x = step_toward(pos.x, self.attacker_start.x, self.config.approach_speed * dt);
        attacker.set_position(Vec2::new(x, pos.y));

        if (x - self.attacker_start.x).abs() <= self.config.move_threshold {
            attacker.set_position(self.attacker_start);
            attacker.set_facing(self.attacker_start_facing);
            attacker.set_anim(AnimState::Idle);
            self.phase = TurnPhase::EndTurn;
        }
    }

    /// The enemy is checked first so a counter that kills it on its own turn
    /// still counts as a win.
    fn end_turn(&mut self, player: &mut dyn Combatant, enemy: &mut dyn Combatant) {
        self.current_attack = None;

        if enemy.health() <= 0.0 {
            enemy.set_anim(AnimState::Dead);
            self.state = CombatState::Victory;
            self.cues.push(CombatCue::Finished(CombatOutcome::Victory));
            info!("[Combat] victory");
            return;
        }
        if player.health() <= 0.0 {
            player.set_anim(AnimState::Dead);
            self.state = CombatState::Defeat;
            self.cues.push(CombatCue::Finished(CombatOutcome::Defeat));
            info!("[Combat] defeat");
            return;
        }

        self.state = match self.state {
            CombatState::PlayerTurn => CombatState::EnemyTurn,
            _ => CombatState::PlayerTurn,
        };
        self.phase = TurnPhase::Input;
        self.timer = 0.0;
    }
}

fn step_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + delta.signum() * max_step
    }
}
