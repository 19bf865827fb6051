use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use log::info;

use texteffects::{
    config::AppConfig,
    effects::EffectKind,
    engine::terminal::Terminal,
    player::Player,
};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const RUN_USAGE: &str = "texteffects <effect> [--config <config.json>] < input.txt";
const LIST_USAGE: &str = "texteffects --list";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("--list") => {
            list();
            Ok(())
        }
        Some(name) if !name.starts_with('-') => {
            let kind = EffectKind::from_name(name)
                .with_context(|| format!("Unknown effect '{name}' (see {LIST_USAGE})"))?;
            let mut config_path = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--config" => config_path = Some(PathBuf::from(args.next().context(RUN_USAGE)?)),
                    other => bail!("Unexpected argument '{other}'\n\nUsage:\n  {RUN_USAGE}"),
                }
            }
            play(kind, config_path)
        }
        _ => bail!(
            "texteffects — terminal text effects\n\nUsage:\n  {RUN_USAGE}\n  {LIST_USAGE}"
        ),
    }
}

fn list() {
    for kind in EffectKind::ALL {
        println!("{:<14} {}", kind.name(), kind.description());
    }
}

fn play(kind: EffectKind, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read input from stdin")?;
    if input.trim().is_empty() {
        bail!("No input text on stdin\n\nUsage:\n  {RUN_USAGE}");
    }

    let terminal = Terminal::new(&input, config.terminal.clone());
    let canvas = *terminal.canvas();
    info!(
        "{}: {} characters on a {}x{} canvas",
        kind.name(),
        terminal.characters().len(),
        canvas.width,
        canvas.height,
    );
    let frames = kind
        .build(terminal, config.effect)
        .with_context(|| format!("Failed to build effect '{}'", kind.name()))?;

    let player = Player::new(canvas, &config.terminal);
    player.play(frames)
}
