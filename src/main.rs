use MIDI_LIMITER::{Args, Command, DefaultCodec, LimitArgs, limit_midi_bytes, serve};
use anyhow::{Result, anyhow};
use clap::Parser;
use log::{info, warn};
use std::fs;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Serve(config) => serve(config).await,
        Command::Limit(limit) => limit_file(&limit),
    }
}

fn limit_file(args: &LimitArgs) -> Result<()> {
    let range = args.velocity.range();
    if !range.is_well_formed() {
        warn!(
            "Velocity range [{}..={}] is outside 1..=127 or inverted, results will saturate..!",
            range.min, range.max
        );
    }

    info!("Limiting MIDI file: '{}'...", args.midi.display());
    let bytes = fs::read(&args.midi)
        .map_err(|e| anyhow!("Failed to read MIDI file {}: {}", args.midi.display(), e))?;

    let (out, report) = limit_midi_bytes(&DefaultCodec::default(), &bytes, range)?;

    let output = args.output_path();
    fs::write(&output, out)
        .map_err(|e| anyhow!("Failed to write MIDI file {}: {}", output.display(), e))?;

    info!(
        "Wrote '{}': {} raised, {} lowered, {} unchanged, {} note-off(s) left alone..!",
        output.display(),
        report.raised,
        report.lowered,
        report.unchanged,
        report.note_offs
    );

    Ok(())
}
