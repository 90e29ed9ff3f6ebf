use crate::model::velocity::{DEFAULT_MAX_VELOCITY, DEFAULT_MIN_VELOCITY, VelocityRange};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(
    name = "MIDI_LIMITER",
    about = "Clamp MIDI note-on velocities into a safe range!"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the upload form and the /process endpoint.
    Serve(ServeArgs),

    /// Limit a single MIDI file on disk.
    Limit(LimitArgs),
}

#[derive(ClapArgs, Debug, Clone, Copy)]
pub struct VelocityArgs {
    /// Lowest velocity a sounding note may have.
    #[arg(long = "min-v", default_value_t = DEFAULT_MIN_VELOCITY, allow_negative_numbers = true)]
    pub min_v: i64,

    /// Highest velocity a sounding note may have.
    #[arg(long = "max-v", default_value_t = DEFAULT_MAX_VELOCITY, allow_negative_numbers = true)]
    pub max_v: i64,
}

impl VelocityArgs {
    pub fn range(&self) -> VelocityRange {
        VelocityRange::new(self.min_v, self.max_v)
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Largest accepted upload, in bytes.
    #[arg(long = "max-upload-bytes", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    // Prefills the form, and fills in for fields a request leaves out.
    #[command(flatten)]
    pub velocity: VelocityArgs,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            velocity: VelocityArgs {
                min_v: DEFAULT_MIN_VELOCITY,
                max_v: DEFAULT_MAX_VELOCITY,
            },
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LimitArgs {
    /// Path to the MIDI file to limit.
    pub midi: PathBuf,

    /// Where to write the limited file. Defaults to `<name>_limited.mid` next to the input.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub velocity: VelocityArgs,
}

impl LimitArgs {
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }

        let stem = self
            .midi
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        self.midi.with_file_name(format!("{}_limited.mid", stem))
    }
}
