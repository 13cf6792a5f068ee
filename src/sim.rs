//! Deterministic game simulation.
//!
//! Everything here runs at a fixed 60 Hz tick on the main thread. The
//! session value ([`GameState`]) is mutated exclusively inside [`tick`];
//! the sensing thread only ever reaches the simulation through the
//! [`EmotionSample`] snapshot passed in each tick.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::Rect;
use crate::consts::*;
use crate::emotion::{EmotionSample, MoodDirector, MoodShift};

/// Top-level game phase; exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Menu,
    Playing,
    GameOver,
}

/// Per-tick player intent. One-shot flags are cleared by the frontend
/// after each processed tick.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Context-dependent primary action: start, jump, or restart.
    pub primary: bool,
}

/// Reusable tick countdown shared by the boost and feedback timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn start(ticks: u32) -> Self {
        Self { remaining: ticks }
    }

    /// Advances one tick; returns true on the tick the countdown expires.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Closed set of things the spawner can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Obstacle,
    Collectible,
}

/// A scrolling world object. Spawned at the right edge, removed off the
/// left edge or on collision resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub pos: Vec2,
    pub size: Vec2,
    /// Leftward scroll speed in pixels per tick.
    pub speed: f32,
}

impl Entity {
    /// Obstacle entering at `x`. Its speed scales with the boost in effect
    /// at spawn time so obstacles keep pace with a boosted player.
    pub fn obstacle(x: f32, speed_boost: f32) -> Self {
        Self {
            kind: EntityKind::Obstacle,
            pos: Vec2::new(x, FIELD_HEIGHT - GROUND_HEIGHT - OBSTACLE_HEIGHT),
            size: Vec2::new(OBSTACLE_WIDTH, OBSTACLE_HEIGHT),
            speed: SCROLL_SPEED * speed_boost,
        }
    }

    /// Collectible entering at `x`, floating at jump height.
    pub fn collectible(x: f32) -> Self {
        Self {
            kind: EntityKind::Collectible,
            pos: Vec2::new(x, FIELD_HEIGHT - GROUND_HEIGHT - 60.0),
            size: Vec2::splat(COLLECTIBLE_SIZE),
            speed: SCROLL_SPEED,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect {
            pos: self.pos,
            size: self.size,
        }
    }

    fn advance(&mut self) {
        self.pos.x -= self.speed;
    }

    /// Fully scrolled past the left edge.
    fn off_screen(&self) -> bool {
        self.pos.x < -self.size.x
    }
}

/// The player: fixed x position, vertical-only dynamics.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub y: f32,
    pub velocity_y: f32,
    pub airborne: bool,
}

impl Player {
    /// Resting y of the player's top edge.
    pub const GROUND_Y: f32 = FIELD_HEIGHT - GROUND_HEIGHT - PLAYER_HEIGHT;

    pub fn new() -> Self {
        Self {
            y: Self::GROUND_Y,
            velocity_y: 0.0,
            airborne: false,
        }
    }

    /// Starts a jump; no-op while already airborne.
    pub fn jump(&mut self) {
        if !self.airborne {
            self.velocity_y = JUMP_STRENGTH;
            self.airborne = true;
        }
    }

    /// Gravity integration; clamps to the ground, zeroes velocity, and
    /// clears the airborne flag on landing.
    fn integrate(&mut self) {
        if !self.airborne {
            return;
        }
        self.velocity_y += GRAVITY;
        self.y += self.velocity_y;
        if self.y >= Self::GROUND_Y {
            self.y = Self::GROUND_Y;
            self.velocity_y = 0.0;
            self.airborne = false;
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(PLAYER_X, self.y, PLAYER_WIDTH, PLAYER_HEIGHT)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Probabilistic spawn timer. The threshold is recomputed from the live
/// difficulty modifier every tick, so a mood shift takes effect on the
/// spawn already being counted toward.
#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    timer: u32,
    rng: Pcg32,
}

impl SpawnScheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            timer: 0,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Ticks until the next spawn at the given difficulty.
    pub fn threshold(difficulty_modifier: f32) -> u32 {
        (SPAWN_BASE_INTERVAL as f32 / difficulty_modifier) as u32
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    /// Keeps the RNG stream across session restarts; only the counter
    /// starts over.
    fn reset(&mut self) {
        self.timer = 0;
    }

    fn tick(&mut self, difficulty_modifier: f32, speed_boost: f32) -> Option<Entity> {
        self.timer += 1;
        if self.timer < Self::threshold(difficulty_modifier) {
            return None;
        }
        self.timer = 0;
        let x = FIELD_WIDTH + SPAWN_MARGIN;
        let entity = if self.rng.random::<f32>() < OBSTACLE_PROBABILITY {
            Entity::obstacle(x, speed_boost)
        } else {
            Entity::collectible(x)
        };
        Some(entity)
    }
}

/// Transient HUD banner raised by a mood shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feedback {
    pub text: &'static str,
    pub timer: Countdown,
}

impl Feedback {
    fn new(text: &'static str, ticks: u32) -> Self {
        Self {
            text,
            timer: Countdown::start(ticks),
        }
    }
}

/// A complete game session plus the top-level phase.
#[derive(Debug)]
pub struct GameState {
    pub phase: GamePhase,
    pub score: u32,
    pub lives: u32,
    /// Ground scrolled past the player this session, in pixels.
    pub distance: f64,
    /// Multiplier on the spawn rate; >1 spawns more often.
    pub difficulty_modifier: f32,
    /// Multiplier on obstacle speed while the happy boost is live.
    pub speed_boost: f32,
    boost_timer: Countdown,
    pub feedback: Option<Feedback>,
    pub player: Player,
    pub entities: Vec<Entity>,
    spawner: SpawnScheduler,
    director: MoodDirector,
}

impl GameState {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: GamePhase::Menu,
            score: 0,
            lives: START_LIVES,
            distance: 0.0,
            difficulty_modifier: 1.0,
            speed_boost: 1.0,
            boost_timer: Countdown::default(),
            feedback: None,
            player: Player::new(),
            entities: Vec::new(),
            spawner: SpawnScheduler::new(seed),
            director: MoodDirector::new(),
        }
    }

    /// Resets the session for a fresh run. The mood director's memory is
    /// deliberately kept: re-observing the label already acted upon must
    /// not fire again after a restart.
    pub fn reset_session(&mut self) {
        self.score = 0;
        self.lives = START_LIVES;
        self.distance = 0.0;
        self.difficulty_modifier = 1.0;
        self.speed_boost = 1.0;
        self.boost_timer = Countdown::default();
        self.feedback = None;
        self.player = Player::new();
        self.entities.clear();
        self.spawner.reset();
    }

    /// Remaining happy-boost ticks, 0 when no boost is live.
    pub fn boost_remaining(&self) -> u32 {
        self.boost_timer.remaining()
    }

    fn apply_shift(&mut self, shift: MoodShift) {
        let feedback = match shift {
            MoodShift::Happy => {
                self.speed_boost = BOOST_FACTOR;
                self.boost_timer = Countdown::start(BOOST_TICKS);
                self.score += HAPPY_BONUS;
                Feedback::new("You look happy! Speed boost activated!", FEEDBACK_TICKS)
            }
            MoodShift::Angry => {
                self.difficulty_modifier = ANGRY_DIFFICULTY;
                Feedback::new("Angry mode: extra obstacles incoming!", FEEDBACK_TICKS)
            }
            MoodShift::Sad => {
                self.difficulty_modifier = SAD_DIFFICULTY;
                if self.lives < MAX_LIVES {
                    self.lives += 1;
                    Feedback::new("Sad face detected. Extra life granted!", FEEDBACK_TICKS)
                } else {
                    Feedback::new("Sad face detected. Difficulty reduced!", FEEDBACK_TICKS)
                }
            }
            MoodShift::Baseline => {
                self.difficulty_modifier = 1.0;
                self.speed_boost = 1.0;
                self.boost_timer = Countdown::default();
                Feedback::new("Neutral expression. Normal gameplay.", FEEDBACK_TICKS_BASELINE)
            }
        };
        log::info!("mood shift: {}", feedback.text);
        self.feedback = Some(feedback);
    }
}

/// Advances the simulation by one fixed tick.
///
/// The emotion snapshot is read exactly once per tick by the caller and
/// handed in here; the mood director fires on label edges only.
pub fn tick(state: &mut GameState, input: &TickInput, emotion: &EmotionSample) {
    match state.phase {
        GamePhase::Menu | GamePhase::GameOver => {
            if input.primary {
                state.reset_session();
                state.phase = GamePhase::Playing;
            }
        }
        GamePhase::Playing => tick_playing(state, input, emotion),
    }
}

fn tick_playing(state: &mut GameState, input: &TickInput, emotion: &EmotionSample) {
    if input.primary {
        state.player.jump();
    }

    if let Some(shift) = state.director.observe(emotion.label) {
        state.apply_shift(shift);
    }

    // Boost decays on its own countdown, independent of transitions.
    if state.boost_timer.tick() {
        state.speed_boost = 1.0;
    }

    let feedback_expired = state
        .feedback
        .as_mut()
        .is_some_and(|feedback| feedback.timer.tick());
    if feedback_expired {
        state.feedback = None;
    }

    if let Some(entity) = state
        .spawner
        .tick(state.difficulty_modifier, state.speed_boost)
    {
        state.entities.push(entity);
    }

    state.player.integrate();
    state.distance += f64::from(SCROLL_SPEED) * f64::from(state.speed_boost);

    resolve_entities(state);
}

/// Advances every entity, then removes off-screen ones and resolves
/// player collisions. Obstacles cost a life (0 lives ends the run);
/// collectibles pay out score.
fn resolve_entities(state: &mut GameState) {
    let player_box = state.player.bounds();
    let mut i = 0;
    while i < state.entities.len() {
        state.entities[i].advance();
        let entity = &state.entities[i];

        if entity.off_screen() {
            state.entities.remove(i);
            continue;
        }

        if player_box.overlaps(&entity.bounds()) {
            match entity.kind {
                EntityKind::Obstacle => {
                    state.lives = state.lives.saturating_sub(1);
                    if state.lives == 0 {
                        state.phase = GamePhase::GameOver;
                    }
                }
                EntityKind::Collectible => {
                    state.score += COLLECTIBLE_REWARD;
                }
            }
            state.entities.remove(i);
            continue;
        }

        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionLabel;
    use proptest::prelude::*;

    fn sample(label: EmotionLabel) -> EmotionSample {
        EmotionSample {
            label,
            confidence: 90.0,
        }
    }

    fn playing_state(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        tick(
            &mut state,
            &TickInput { primary: true },
            &EmotionSample::default(),
        );
        assert_eq!(state.phase, GamePhase::Playing);
        state
    }

    /// One tick with no input.
    fn idle_tick(state: &mut GameState, label: EmotionLabel) {
        tick(state, &TickInput::default(), &sample(label));
    }

    #[test]
    fn countdown_expires_exactly_once() {
        let mut countdown = Countdown::start(3);
        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(!countdown.tick());
        assert!(!Countdown::default().is_active());
    }

    #[test]
    fn menu_primary_starts_a_session() {
        let state = GameState::new(1);
        assert_eq!(state.phase, GamePhase::Menu);
        let state = playing_state(1);
        assert_eq!(state.lives, START_LIVES);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn jump_roundtrip_returns_to_ground() {
        let mut state = playing_state(1);
        tick(
            &mut state,
            &TickInput { primary: true },
            &sample(EmotionLabel::Neutral),
        );
        assert!(state.player.airborne);
        assert!(state.player.y < Player::GROUND_Y);

        // -15 px/tick initial velocity under 0.8 px/tick² gravity is back on
        // the ground well within 40 ticks.
        for _ in 0..40 {
            idle_tick(&mut state, EmotionLabel::Neutral);
        }
        assert!(!state.player.airborne);
        assert_eq!(state.player.y, Player::GROUND_Y);
        assert_eq!(state.player.velocity_y, 0.0);
    }

    #[test]
    fn jump_is_a_noop_while_airborne() {
        let mut player = Player::new();
        player.jump();
        player.integrate();
        let velocity = player.velocity_y;
        player.jump();
        assert_eq!(player.velocity_y, velocity);
    }

    #[test]
    fn spawn_fires_exactly_at_the_threshold() {
        let mut spawner = SpawnScheduler::new(7);
        for _ in 0..SPAWN_BASE_INTERVAL - 1 {
            assert!(spawner.tick(1.0, 1.0).is_none());
            assert!(spawner.timer() < SpawnScheduler::threshold(1.0));
        }
        assert!(spawner.tick(1.0, 1.0).is_some());
        assert_eq!(spawner.timer(), 0);
    }

    #[test]
    fn spawn_threshold_scales_with_difficulty() {
        assert_eq!(SpawnScheduler::threshold(1.0), 90);
        assert_eq!(SpawnScheduler::threshold(ANGRY_DIFFICULTY), 50);
        assert_eq!(SpawnScheduler::threshold(SAD_DIFFICULTY), 150);
    }

    #[test]
    fn spawner_produces_both_kinds() {
        let mut spawner = SpawnScheduler::new(11);
        let mut obstacles = 0;
        let mut collectibles = 0;
        for _ in 0..100 {
            for _ in 0..SPAWN_BASE_INTERVAL - 1 {
                assert!(spawner.tick(1.0, 1.0).is_none());
            }
            match spawner.tick(1.0, 1.0).map(|e| e.kind) {
                Some(EntityKind::Obstacle) => obstacles += 1,
                Some(EntityKind::Collectible) => collectibles += 1,
                None => panic!("threshold tick must spawn"),
            }
        }
        assert!(obstacles > collectibles);
        assert!(collectibles > 0);
    }

    #[test]
    fn obstacle_speed_scales_with_boost_at_spawn_time() {
        assert_eq!(Entity::obstacle(0.0, 1.0).speed, SCROLL_SPEED);
        assert_eq!(
            Entity::obstacle(0.0, BOOST_FACTOR).speed,
            SCROLL_SPEED * BOOST_FACTOR
        );
        assert_eq!(Entity::collectible(0.0).speed, SCROLL_SPEED);
    }

    #[test]
    fn happy_transition_pays_once_and_boost_reverts_after_300_ticks() {
        let mut state = playing_state(3);
        // Headroom so stray obstacle hits can't end the run mid-test.
        state.lives = MAX_LIVES;

        idle_tick(&mut state, EmotionLabel::Happy);
        assert_eq!(state.score, HAPPY_BONUS);
        assert_eq!(state.speed_boost, BOOST_FACTOR);
        assert_eq!(state.boost_remaining(), BOOST_TICKS - 1);

        // Repeating the label never pays again; collectibles are the only
        // other score source and none can reach the player this early.
        idle_tick(&mut state, EmotionLabel::Happy);
        assert_eq!(state.score, HAPPY_BONUS);

        for _ in 0..BOOST_TICKS - 3 {
            idle_tick(&mut state, EmotionLabel::Happy);
        }
        assert_eq!(state.speed_boost, BOOST_FACTOR);
        idle_tick(&mut state, EmotionLabel::Happy);
        assert_eq!(state.speed_boost, 1.0);
        assert_eq!(state.boost_remaining(), 0);
    }

    #[test]
    fn baseline_transition_resets_difficulty_and_boost() {
        let mut state = playing_state(3);
        idle_tick(&mut state, EmotionLabel::Angry);
        assert_eq!(state.difficulty_modifier, ANGRY_DIFFICULTY);
        idle_tick(&mut state, EmotionLabel::Happy);
        assert_eq!(state.speed_boost, BOOST_FACTOR);

        idle_tick(&mut state, EmotionLabel::Neutral);
        assert_eq!(state.difficulty_modifier, 1.0);
        assert_eq!(state.speed_boost, 1.0);
        assert_eq!(state.boost_remaining(), 0);
    }

    #[test]
    fn sad_transitions_grant_lives_up_to_the_cap() {
        let mut state = playing_state(3);
        assert_eq!(state.lives, START_LIVES);
        idle_tick(&mut state, EmotionLabel::Sad);
        assert_eq!(state.lives, START_LIVES + 1);

        // Bounce between sad and neutral to keep producing edges.
        idle_tick(&mut state, EmotionLabel::Neutral);
        idle_tick(&mut state, EmotionLabel::Sad);
        assert_eq!(state.lives, MAX_LIVES);
        idle_tick(&mut state, EmotionLabel::Neutral);
        idle_tick(&mut state, EmotionLabel::Sad);
        assert_eq!(state.lives, MAX_LIVES);
        assert_eq!(state.difficulty_modifier, SAD_DIFFICULTY);
    }

    #[test]
    fn obstacle_hit_costs_a_life_and_zero_ends_the_run() {
        let mut state = playing_state(5);
        state.lives = 1;
        state
            .entities
            .push(Entity::obstacle(PLAYER_X + SCROLL_SPEED, 1.0));

        idle_tick(&mut state, EmotionLabel::Neutral);
        assert_eq!(state.lives, 0);
        assert!(state.entities.is_empty());
        assert_eq!(state.phase, GamePhase::GameOver);

        // Terminal until an explicit restart.
        idle_tick(&mut state, EmotionLabel::Neutral);
        assert_eq!(state.phase, GamePhase::GameOver);

        tick(
            &mut state,
            &TickInput { primary: true },
            &sample(EmotionLabel::Neutral),
        );
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.lives, START_LIVES);
        assert_eq!(state.score, 0);
        assert!(state.entities.is_empty());
    }

    #[test]
    fn collectible_hit_pays_score_and_keeps_lives() {
        let mut state = playing_state(5);
        state
            .entities
            .push(Entity::collectible(PLAYER_X + SCROLL_SPEED));

        idle_tick(&mut state, EmotionLabel::Neutral);
        assert_eq!(state.score, COLLECTIBLE_REWARD);
        assert_eq!(state.lives, START_LIVES);
        assert!(state.entities.is_empty());
    }

    #[test]
    fn off_screen_entities_are_removed_without_effects() {
        let mut state = playing_state(5);
        let mut entity = Entity::obstacle(0.0, 1.0);
        entity.pos.x = -OBSTACLE_WIDTH + SCROLL_SPEED - 0.1;
        state.entities.push(entity);

        idle_tick(&mut state, EmotionLabel::Neutral);
        assert!(state.entities.is_empty());
        assert_eq!(state.lives, START_LIVES);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn restart_keeps_the_director_memory() {
        let mut state = playing_state(5);
        idle_tick(&mut state, EmotionLabel::Happy);
        assert_eq!(state.score, HAPPY_BONUS);

        state.lives = 1;
        state
            .entities
            .push(Entity::obstacle(PLAYER_X + SCROLL_SPEED, 1.0));
        idle_tick(&mut state, EmotionLabel::Happy);
        assert_eq!(state.phase, GamePhase::GameOver);

        tick(
            &mut state,
            &TickInput { primary: true },
            &sample(EmotionLabel::Happy),
        );
        // Still the same label: no re-fire, no bonus on the fresh session.
        idle_tick(&mut state, EmotionLabel::Happy);
        assert_eq!(state.score, 0);
        assert_eq!(state.speed_boost, 1.0);
    }

    #[test]
    fn feedback_banner_expires() {
        let mut state = playing_state(5);
        idle_tick(&mut state, EmotionLabel::Neutral);
        // The session-start baseline shift raised a banner already; the
        // second neutral tick is not an edge, so it only counts down.
        assert!(state.feedback.is_some());
        for _ in 0..FEEDBACK_TICKS_BASELINE {
            idle_tick(&mut state, EmotionLabel::Neutral);
        }
        assert!(state.feedback.is_none());
    }

    proptest! {
        /// Session invariants hold under arbitrary emotion/jump sequences.
        #[test]
        fn invariants_hold_under_arbitrary_inputs(
            commands in proptest::collection::vec((0u8..5, any::<bool>()), 1..400)
        ) {
            let labels = [
                EmotionLabel::Happy,
                EmotionLabel::Angry,
                EmotionLabel::Sad,
                EmotionLabel::Neutral,
                EmotionLabel::Unknown,
            ];
            let mut state = playing_state(99);
            for (label_index, jump) in commands {
                let input = TickInput { primary: jump };
                tick(&mut state, &input, &sample(labels[label_index as usize]));
                prop_assert!(state.lives <= MAX_LIVES);
                prop_assert!(state.speed_boost >= 1.0);
                prop_assert!(state.difficulty_modifier > 0.0);
                prop_assert!(
                    state.spawner.timer() < SpawnScheduler::threshold(state.difficulty_modifier)
                        || state.spawner.timer() == 0
                );
            }
        }
    }
}
