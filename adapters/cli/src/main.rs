#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that reveals prompts on a terminal flipboard.

mod bell;
mod config;
mod prompts;

use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use clap::Parser;
use flipboard_engine::Engine;
use flipboard_rendering::{FrameInput, Palette, Presentation, RenderingBackend, Scene};
use flipboard_rendering_terminal::TerminalBackend;
use flipboard_system_audio_cues::{ClockedBackend, CueBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

use self::{bell::BellBackend, config::CliConfig, prompts::PromptDeck};

const TITLE: &str = "flipboard";

/// Reveals prompts with a character-scramble animation.
#[derive(Debug, Parser)]
#[command(name = "flipboard", version, about)]
struct Args {
    /// Prompts to cycle through; defaults to the configured or built-in deck.
    prompts: Vec<String>,

    /// TOML file with `[reveal]`, `[hover]`, `[audio]` and `[prompts]` sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for scramble glyphs and prompt selection.
    #[arg(long)]
    seed: Option<u64>,

    /// Disable audio cues.
    #[arg(long)]
    no_audio: bool,

    /// Draw prompts only from this configured category.
    #[arg(long)]
    category: Option<String>,

    /// Ring the terminal bell for audio cues.
    #[arg(long)]
    bell: bool,

    /// Reveal one prompt without the interactive display and print the result.
    #[arg(long)]
    headless: bool,

    /// In headless mode, print every intermediate frame.
    #[arg(long, requires = "headless")]
    frames: bool,

    /// Write logs to this file instead of discarding them in interactive mode.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Entry point for the Flipboard command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let mut config = config::load(args.config.as_deref())?;
    if args.no_audio {
        config.engine.audio.enabled = false;
    }
    if let Some(category) = args.category.clone() {
        config.prompts.category = Some(category);
    }
    let seed = args.seed.unwrap_or_else(seed_from_clock);
    info!(seed, "starting flipboard");

    let deck = PromptDeck::from_settings(&config.prompts, args.prompts.clone(), seed)
        .context("failed to build prompt deck")?;

    if args.bell {
        let backend = BellBackend::new(config.engine.audio.cue_length());
        run(&args, config, backend, deck, seed)
    } else {
        let backend = ClockedBackend::from_settings(&config.engine.audio);
        run(&args, config, backend, deck, seed)
    }
}

fn run<B>(args: &Args, config: CliConfig, backend: B, deck: PromptDeck, seed: u64) -> Result<()>
where
    B: CueBackend + 'static,
{
    let engine =
        Engine::new(config.engine, backend, seed).context("invalid engine configuration")?;
    if args.headless {
        run_headless(engine, deck, args.frames)
    } else {
        run_interactive(engine, deck)
    }
}

fn run_headless<B: CueBackend>(
    mut engine: Engine<B>,
    mut deck: PromptDeck,
    frames: bool,
) -> Result<()> {
    let prompt = deck
        .draw(engine.now())
        .context("prompt deck refused the first draw")?;
    engine.start(&prompt);

    let mut stdout = io::stdout().lock();
    let step = engine.config().reveal.frame_interval();
    let mut last = String::new();
    while !engine.is_settled() {
        engine.advance(step);
        if frames {
            let text = engine.grid().display_text();
            if text != last {
                writeln!(stdout, "{text}")?;
                last = text;
            }
        }
    }

    let text = engine.grid().display_text();
    if !frames || text != last {
        writeln!(stdout, "{text}")?;
    }

    let diagnostics = engine.diagnostics();
    info!(
        elapsed_ms = engine.now().as_millis() as u64,
        cues_played = diagnostics.cues.played,
        cues_dropped = diagnostics.cues.denied + diagnostics.cues.rejected,
        "prompt revealed"
    );
    Ok(())
}

fn run_interactive<B>(mut engine: Engine<B>, mut deck: PromptDeck) -> Result<()>
where
    B: CueBackend + 'static,
{
    if let Some(prompt) = deck.draw(engine.now()) {
        engine.start(&prompt);
    }

    let mut scene = Scene::new(80)?;
    scene.update(&engine.grid());
    let presentation = Presentation::new(TITLE, Palette::default(), scene);

    TerminalBackend::default().run(presentation, move |dt, input, scene| {
        apply_input(&mut engine, &mut deck, input);
        engine.advance(dt);
        scene.update(&engine.grid());
        scene.status = status_line(&engine, &deck);
    })
}

fn apply_input<B: CueBackend>(engine: &mut Engine<B>, deck: &mut PromptDeck, input: FrameInput) {
    if input.next_prompt {
        if let Some(prompt) = deck.draw(engine.now()) {
            engine.start(&prompt);
        }
    }
    if input.toggle_audio {
        let enabled = !engine.audio_enabled();
        engine.set_audio_enabled(enabled);
        info!(enabled, "audio toggled");
    }
    if let Some(address) = input.hovered {
        engine.hover(address);
    }
}

fn status_line<B: CueBackend>(engine: &Engine<B>, deck: &PromptDeck) -> String {
    let audio = if engine.audio_enabled() { "on" } else { "off" };
    let remaining = deck.remaining(engine.now());
    let next = if remaining.is_zero() {
        "[n] next prompt".to_owned()
    } else {
        // Tenths of a second keep the line stable between redraws.
        format!("next prompt in {:.1}s", round_tenths(remaining))
    };
    format!("{next}   [a] audio {audio}   [q] quit")
}

fn round_tenths(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 10.0).ceil() / 10.0
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if let Some(path) = args.log_file.as_deref() {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else if args.headless {
        builder.with_writer(io::stderr).init();
    } else {
        builder.with_writer(io::sink).init();
    }
    Ok(())
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipboard_core::{CellAddress, EngineConfig};

    fn engine() -> Engine {
        Engine::with_clocked_audio(EngineConfig::default(), 5).expect("engine")
    }

    fn deck() -> PromptDeck {
        PromptDeck::new(vec!["hello world".to_owned()], Duration::from_secs(6), 5)
            .expect("deck")
    }

    #[test]
    fn args_parse_flags_and_prompts() {
        let args = Args::try_parse_from([
            "flipboard",
            "--seed",
            "9",
            "--no-audio",
            "--headless",
            "--frames",
            "one prompt",
        ])
        .expect("valid args");
        assert_eq!(args.seed, Some(9));
        assert!(args.no_audio && args.headless && args.frames);
        assert_eq!(args.prompts, vec!["one prompt".to_owned()]);
    }

    #[test]
    fn frames_flag_requires_headless() {
        assert!(Args::try_parse_from(["flipboard", "--frames"]).is_err());
    }

    #[test]
    fn next_prompt_input_respects_rotation_cooldown() {
        let mut engine = engine();
        let mut deck = deck();
        let next = FrameInput {
            next_prompt: true,
            ..FrameInput::default()
        };

        apply_input(&mut engine, &mut deck, next);
        assert_eq!(engine.grid().session.map(|token| token.get()), Some(1));

        engine.advance(Duration::from_secs(1));
        apply_input(&mut engine, &mut deck, next);
        assert_eq!(engine.grid().session.map(|token| token.get()), Some(1));

        engine.advance(Duration::from_secs(5));
        apply_input(&mut engine, &mut deck, next);
        assert_eq!(engine.grid().session.map(|token| token.get()), Some(2));
    }

    #[test]
    fn hover_and_audio_inputs_reach_the_engine() {
        let mut engine = engine();
        let mut deck = deck();
        engine.start("ab");
        engine.advance(engine.reveal_duration());

        apply_input(
            &mut engine,
            &mut deck,
            FrameInput {
                hovered: Some(CellAddress::new(0, 0)),
                toggle_audio: true,
                next_prompt: false,
            },
        );
        assert_eq!(engine.live_bursts(), 1);
        assert!(!engine.audio_enabled());
    }

    #[test]
    fn status_line_counts_down_rotation() {
        let engine = engine();
        let mut deck = deck();
        assert!(status_line(&engine, &deck).starts_with("[n] next prompt"));

        let _ = deck.draw(engine.now());
        assert!(status_line(&engine, &deck).starts_with("next prompt in 6.0s"));
        assert!(status_line(&engine, &deck).contains("audio on"));
    }
}
