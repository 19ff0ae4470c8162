use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use particle_field::state::RunOptions;
use particle_field::FieldParams;
use std::io;

/// Animated particle field with proximity-linked discs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Number of particles in the field
  #[arg(short = 'n', long, default_value_t = 80)]
  particles: u32,
  /// Initial window width in pixels
  #[arg(long, default_value_t = 1280)]
  width: u32,
  /// Initial window height in pixels
  #[arg(long, default_value_t = 720)]
  height: u32,
  /// Seed for the field generator (omit for a fresh field every run)
  #[arg(long)]
  seed: Option<u64>,
  /// Run in headless mode (no window)
  #[arg(long, default_value_t = false)]
  headless: bool,
  /// Number of headless frames to run, 0 runs until interrupted
  #[arg(long, default_value_t = 0)]
  frames: u64,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
}

fn main() {
  let args = Args::parse();

  if let Some(Commands::Completions { shell }) = args.command {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    return;
  }

  let options = RunOptions {
    params: FieldParams {
      particle_count: args.particles,
      ..FieldParams::default()
    },
    width: args.width,
    height: args.height,
    seed: args.seed,
    headless: args.headless,
    frames: args.frames,
  };
  particle_field::state::run(&options);
}
