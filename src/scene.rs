//! Draw-list construction.
//!
//! Converts the simulation and sensing snapshots into a flat list of
//! colored rects that the renderer draws in a single instanced call. This
//! is presentation glue only: nothing here feeds back into the simulation.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::Rect;
use crate::consts::*;
use crate::emotion::{EmotionLabel, EmotionSample};
use crate::sim::{EntityKind, GamePhase, GameState};
use crate::vision::Frame;

/// Linear RGBA, components in 0..1.
pub type Color = [f32; 4];

pub const SKY: Color = [0.04, 0.05, 0.10, 1.0];
const GROUND: Color = [0.13, 0.55, 0.13, 1.0];
const GROUND_EDGE: Color = [0.35, 0.23, 0.10, 1.0];
const CLOUD: Color = [0.85, 0.88, 0.92, 1.0];
const PLAYER: Color = [0.20, 0.45, 0.95, 1.0];
const PLAYER_BOOSTED: Color = [0.95, 0.85, 0.20, 1.0];
const OBSTACLE: Color = [0.85, 0.15, 0.15, 1.0];
const COLLECTIBLE: Color = [0.15, 0.85, 0.25, 1.0];
const PANEL: Color = [0.95, 0.95, 0.95, 1.0];
const LIFE_FULL: Color = [0.90, 0.20, 0.30, 1.0];
const LIFE_EMPTY: Color = [0.25, 0.25, 0.30, 1.0];
const GAUGE_BACK: Color = [0.18, 0.18, 0.22, 1.0];
const OVERLAY: Color = [0.0, 0.0, 0.0, 0.6];

/// Mood accent used by the emotion swatch and the feedback banner.
fn emotion_color(label: EmotionLabel) -> Color {
    match label {
        EmotionLabel::Happy => [0.95, 0.85, 0.20, 1.0],
        EmotionLabel::Angry => [0.90, 0.25, 0.15, 1.0],
        EmotionLabel::Sad => [0.25, 0.45, 0.90, 1.0],
        EmotionLabel::Neutral => [0.60, 0.60, 0.65, 1.0],
        EmotionLabel::Unknown => [0.40, 0.40, 0.45, 1.0],
    }
}

/// One rectangle of the frame's draw list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub rect: Rect,
    pub color: Color,
}

#[derive(Debug, Clone, Copy)]
struct Cloud {
    pos: Vec2,
    speed: f32,
    scale: f32,
}

/// Slow-drifting background, recycled once it scrolls off the left edge.
#[derive(Debug)]
pub struct Backdrop {
    clouds: Vec<Cloud>,
    rng: Pcg32,
}

impl Backdrop {
    pub fn new(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let clouds = (0..3)
            .map(|i| Cloud {
                pos: Vec2::new(
                    i as f32 * 250.0 + rng.random_range(0.0..100.0),
                    rng.random_range(40.0..160.0),
                ),
                speed: rng.random_range(0.5..1.5),
                scale: rng.random_range(0.8..1.3),
            })
            .collect();
        Self { clouds, rng }
    }

    /// Advances the drift one frame; recycled clouds re-enter at the right
    /// edge at a fresh height.
    pub fn advance(&mut self) {
        for cloud in &mut self.clouds {
            cloud.pos.x -= cloud.speed;
            if cloud.pos.x < -120.0 {
                cloud.pos.x = FIELD_WIDTH + self.rng.random_range(0.0..100.0);
                cloud.pos.y = self.rng.random_range(40.0..160.0);
            }
        }
    }
}

/// Everything the renderer needs for one frame, painter-ordered.
#[derive(Debug, Default)]
pub struct Scene {
    pub shapes: Vec<Shape>,
    /// Suppresses the flashing feedback banner (accessibility preference).
    pub reduced_motion: bool,
}

impl Scene {
    /// Rebuilds the draw list from the current snapshots.
    pub fn rebuild(
        &mut self,
        state: &GameState,
        emotion: &EmotionSample,
        preview: Option<&Frame>,
        backdrop: &Backdrop,
    ) {
        self.shapes.clear();
        match state.phase {
            GamePhase::Menu => self.push_menu(backdrop),
            GamePhase::Playing => self.push_playing(state, emotion, preview, backdrop),
            GamePhase::GameOver => self.push_game_over(state),
        }
    }

    fn push(&mut self, rect: Rect, color: Color) {
        self.shapes.push(Shape { rect, color });
    }

    fn push_backdrop(&mut self, backdrop: &Backdrop) {
        for cloud in &backdrop.clouds {
            let w = 90.0 * cloud.scale;
            let h = 28.0 * cloud.scale;
            self.push(Rect::new(cloud.pos.x, cloud.pos.y, w, h), CLOUD);
            self.push(
                Rect::new(cloud.pos.x + w * 0.2, cloud.pos.y - h * 0.4, w * 0.5, h * 0.6),
                CLOUD,
            );
        }
    }

    fn push_ground(&mut self) {
        self.push(
            Rect::new(0.0, FIELD_HEIGHT - GROUND_HEIGHT, FIELD_WIDTH, GROUND_HEIGHT),
            GROUND,
        );
        self.push(
            Rect::new(0.0, FIELD_HEIGHT - 10.0, FIELD_WIDTH, 10.0),
            GROUND_EDGE,
        );
    }

    fn push_menu(&mut self, backdrop: &Backdrop) {
        self.push_backdrop(backdrop);
        self.push_ground();
        // Title block plus a resting player silhouette.
        self.push(Rect::new(200.0, 160.0, 400.0, 70.0), PANEL);
        self.push(Rect::new(210.0, 170.0, 380.0, 50.0), SKY);
        self.push(Rect::new(300.0, 280.0, 200.0, 14.0), emotion_color(EmotionLabel::Happy));
        self.push(
            Rect::new(
                PLAYER_X,
                FIELD_HEIGHT - GROUND_HEIGHT - PLAYER_HEIGHT,
                PLAYER_WIDTH,
                PLAYER_HEIGHT,
            ),
            PLAYER,
        );
    }

    fn push_playing(
        &mut self,
        state: &GameState,
        emotion: &EmotionSample,
        preview: Option<&Frame>,
        backdrop: &Backdrop,
    ) {
        self.push_backdrop(backdrop);
        self.push_ground();

        for entity in &state.entities {
            let color = match entity.kind {
                EntityKind::Obstacle => OBSTACLE,
                EntityKind::Collectible => COLLECTIBLE,
            };
            self.push(entity.bounds(), color);
        }

        let body = if state.speed_boost > 1.0 {
            PLAYER_BOOSTED
        } else {
            PLAYER
        };
        let player_box = state.player.bounds();
        self.push(player_box, body);
        // Eyes.
        self.push(
            Rect::new(player_box.pos.x + 12.0, player_box.pos.y + 12.0, 6.0, 6.0),
            SKY,
        );
        self.push(
            Rect::new(player_box.pos.x + 32.0, player_box.pos.y + 12.0, 6.0, 6.0),
            SKY,
        );

        self.push_hud(state, emotion);
        if let Some(frame) = preview {
            self.push_preview(frame);
        }
    }

    fn push_hud(&mut self, state: &GameState, emotion: &EmotionSample) {
        // Lives pips.
        for slot in 0..MAX_LIVES {
            let color = if slot < state.lives { LIFE_FULL } else { LIFE_EMPTY };
            self.push(Rect::new(10.0 + slot as f32 * 26.0, 10.0, 20.0, 20.0), color);
        }

        // Boost gauge, only while a boost is counting down.
        if state.boost_remaining() > 0 {
            let fraction = state.boost_remaining() as f32 / BOOST_TICKS as f32;
            self.push(Rect::new(10.0, 40.0, 120.0, 10.0), GAUGE_BACK);
            self.push(
                Rect::new(10.0, 40.0, 120.0 * fraction, 10.0),
                PLAYER_BOOSTED,
            );
        }

        // Current-mood swatch; confidence sets the bar width.
        let accent = emotion_color(emotion.label);
        self.push(Rect::new(10.0, 60.0, 20.0, 20.0), accent);
        self.push(Rect::new(36.0, 66.0, 100.0, 8.0), GAUGE_BACK);
        self.push(
            Rect::new(36.0, 66.0, emotion.confidence.clamp(0.0, 100.0), 8.0),
            accent,
        );

        // Feedback banner while a mood shift is being announced.
        if self.reduced_motion {
            return;
        }
        if let Some(feedback) = &state.feedback {
            let fraction =
                feedback.timer.remaining() as f32 / FEEDBACK_TICKS as f32;
            self.push(Rect::new(200.0, 120.0, 400.0, 26.0), OVERLAY);
            self.push(
                Rect::new(204.0, 124.0, 392.0 * fraction.min(1.0), 18.0),
                emotion_color(emotion.label),
            );
        }
    }

    /// Mirror panel: the preview frame downsampled into a coarse mosaic of
    /// rect instances, bordered in white.
    fn push_preview(&mut self, frame: &Frame) {
        if frame.width == 0 || frame.height == 0 {
            return;
        }
        const COLS: u32 = 32;
        const ROWS: u32 = 24;
        let panel = Rect::new(FIELD_WIDTH - 170.0, 10.0, 160.0, 120.0);
        self.push(
            Rect::new(panel.pos.x - 2.0, panel.pos.y - 2.0, panel.size.x + 4.0, panel.size.y + 4.0),
            PANEL,
        );
        let cell_w = panel.size.x / COLS as f32;
        let cell_h = panel.size.y / ROWS as f32;
        for row in 0..ROWS {
            let sy = (row * frame.height / ROWS).min(frame.height - 1);
            for col in 0..COLS {
                let sx = (col * frame.width / COLS).min(frame.width - 1);
                let idx = ((sy * frame.width + sx) * 3) as usize;
                let color = [
                    f32::from(frame.pixels[idx]) / 255.0,
                    f32::from(frame.pixels[idx + 1]) / 255.0,
                    f32::from(frame.pixels[idx + 2]) / 255.0,
                    1.0,
                ];
                self.push(
                    Rect::new(
                        panel.pos.x + col as f32 * cell_w,
                        panel.pos.y + row as f32 * cell_h,
                        cell_w,
                        cell_h,
                    ),
                    color,
                );
            }
        }
    }

    fn push_game_over(&mut self, state: &GameState) {
        self.push_ground();
        self.push(Rect::new(0.0, 0.0, FIELD_WIDTH, FIELD_HEIGHT), OVERLAY);
        self.push(Rect::new(220.0, 220.0, 360.0, 60.0), OBSTACLE);
        // Final score echoed as a row of collectible-colored pips.
        let pips = (state.score / COLLECTIBLE_REWARD).min(20);
        for pip in 0..pips {
            self.push(
                Rect::new(220.0 + pip as f32 * 18.0, 300.0, 12.0, 12.0),
                COLLECTIBLE,
            );
        }
    }
}
