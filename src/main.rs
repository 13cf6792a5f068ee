//! Mood Dash entry point
//!
//! Native window, fixed-timestep simulation, and the sensing thread's
//! lifecycle around the game phases.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use mood_dash::EmotionSample;
use mood_dash::backend::{LumaClassifier, SyntheticCamera};
use mood_dash::consts::{FIELD_HEIGHT, FIELD_WIDTH, MAX_SUBSTEPS, SIM_DT};
use mood_dash::highscores::{self, HighScores};
use mood_dash::renderer::Renderer;
use mood_dash::scene::{Backdrop, Scene};
use mood_dash::settings::{CameraBackend, Settings};
use mood_dash::sim::{self, GamePhase, GameState, TickInput};
use mood_dash::vision::{SamplerConfig, VisionSampler};

#[derive(Debug, Parser)]
#[command(author, version, about = "An emotion-reactive endless runner", long_about = None)]
struct Cli {
    /// Spawn-schedule RNG seed (wall clock when omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Capture backend: synthetic | disabled
    #[arg(long)]
    camera: Option<String>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::load();
    if let Some(name) = cli.camera.as_deref() {
        match CameraBackend::from_str(name) {
            Some(backend) => settings.camera = backend,
            None => log::warn!(
                "Unknown camera backend '{name}', keeping '{}'",
                settings.camera.as_str()
            ),
        }
    }

    let seed = cli.seed.unwrap_or_else(highscores::unix_timestamp);
    log::info!("Mood Dash starting (seed {seed})");

    let mut high_scores = HighScores::load();
    let mut state = GameState::new(seed);
    let mut backdrop = Backdrop::new(seed ^ 0x9e37_79b9);
    let mut scene = Scene::default();
    scene.reduced_motion = settings.reduced_motion;
    let mut input = TickInput::default();

    let event_loop = EventLoop::new().unwrap();
    let window_attributes = Window::default_attributes()
        .with_title("Mood Dash")
        .with_inner_size(winit::dpi::LogicalSize::new(
            f64::from(FIELD_WIDTH),
            f64::from(FIELD_HEIGHT),
        ))
        .with_resizable(false);
    let window = Arc::new(event_loop.create_window(window_attributes).unwrap());
    let mut renderer = pollster::block_on(Renderer::new(window.clone()));

    let mut sampler: Option<VisionSampler> = None;
    let mut sampler_attempted = false;
    let mut last_phase = state.phase;
    let mut accumulator = 0.0f32;
    let mut last_frame = Instant::now();
    let mut last_title = String::new();
    let mut frame_count = 0u32;
    let mut fps = 0u32;
    let mut last_fps_update = Instant::now();

    event_loop
        .run(move |event, control_flow| match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state: ElementState::Pressed,
                            physical_key: PhysicalKey::Code(KeyCode::Escape),
                            ..
                        },
                    ..
                } => {
                    // The sampler is dropped with the closure; its Drop
                    // joins the sensing thread and releases the camera.
                    log::info!("Quit requested");
                    control_flow.exit();
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state: ElementState::Pressed,
                            physical_key: PhysicalKey::Code(KeyCode::Space),
                            repeat: false,
                            ..
                        },
                    ..
                } => {
                    input.primary = true;
                }
                WindowEvent::Resized(physical_size) => {
                    renderer.resize(*physical_size);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32().min(0.1);
                    last_frame = now;
                    accumulator += dt;

                    // One non-blocking emotion snapshot per tick.
                    let mut substeps = 0;
                    while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                        let emotion = sampler
                            .as_ref()
                            .map(|s| s.state().sample())
                            .unwrap_or_default();
                        sim::tick(&mut state, &input, &emotion);
                        // Clear one-shot inputs after processing
                        input.primary = false;
                        accumulator -= SIM_DT;
                        substeps += 1;
                    }

                    // Phase edges: sensing starts with play, scores are
                    // recorded on entering game over.
                    if state.phase != last_phase {
                        match state.phase {
                            GamePhase::Playing => {
                                if !sampler_attempted {
                                    sampler_attempted = true;
                                    sampler = start_sampler(&settings);
                                }
                            }
                            GamePhase::GameOver => {
                                log::info!(
                                    "Game over: score {}, distance {:.0}",
                                    state.score,
                                    state.distance
                                );
                                if let Some(rank) = high_scores.add_score(
                                    state.score,
                                    state.distance as u64,
                                    highscores::unix_timestamp(),
                                ) {
                                    log::info!("New high score at rank {rank}");
                                    high_scores.save();
                                }
                            }
                            GamePhase::Menu => {}
                        }
                        last_phase = state.phase;
                    }

                    backdrop.advance();
                    let emotion = sampler
                        .as_ref()
                        .map(|s| s.state().sample())
                        .unwrap_or_default();
                    let preview = if settings.show_preview {
                        sampler.as_ref().and_then(|s| s.state().preview())
                    } else {
                        None
                    };
                    scene.rebuild(&state, &emotion, preview.as_ref(), &backdrop);

                    match renderer.render(&scene) {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                        Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                        Err(e) => log::warn!("Render error: {e:?}"),
                    }

                    frame_count += 1;
                    if (now - last_fps_update).as_secs_f32() >= 1.0 {
                        fps = frame_count;
                        frame_count = 0;
                        last_fps_update = now;
                    }

                    let title = window_title(&state, &emotion, &high_scores, &settings, fps);
                    if title != last_title {
                        window.set_title(&title);
                        last_title = title;
                    }
                }
                _ => {}
            },
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        })
        .unwrap();
}

/// Opens the configured capture backend and spawns the sensing thread.
/// Any failure degrades to the plain game.
fn start_sampler(settings: &Settings) -> Option<VisionSampler> {
    match settings.camera {
        CameraBackend::Disabled => {
            log::info!("Sensing disabled; running the plain game");
            None
        }
        CameraBackend::Synthetic => {
            let camera = match SyntheticCamera::open() {
                Ok(camera) => camera,
                Err(err) => {
                    log::warn!("Camera unavailable: {err}. Emotion features disabled.");
                    return None;
                }
            };
            match VisionSampler::spawn(
                Box::new(camera),
                Box::new(LumaClassifier),
                SamplerConfig::default(),
            ) {
                Ok(sampler) => {
                    log::info!("Vision sampler started");
                    Some(sampler)
                }
                Err(err) => {
                    log::warn!("Could not start vision sampler: {err}. Emotion features disabled.");
                    None
                }
            }
        }
    }
}

/// Numeric readouts live in the title; the in-field HUD is rect-only.
fn window_title(
    state: &GameState,
    emotion: &EmotionSample,
    high_scores: &HighScores,
    settings: &Settings,
    fps: u32,
) -> String {
    let mut title = match state.phase {
        GamePhase::Menu => format!(
            "Mood Dash - Space to start | top score {}",
            high_scores.top_score().unwrap_or(0)
        ),
        GamePhase::Playing => format!(
            "Mood Dash - score {} | lives {} | mood {} ({:.0})",
            state.score, state.lives, emotion.label, emotion.confidence
        ),
        GamePhase::GameOver => format!(
            "Mood Dash - game over! score {} | Space to restart",
            state.score
        ),
    };
    if settings.show_fps {
        title.push_str(&format!(" | {fps} fps"));
    }
    title
}
