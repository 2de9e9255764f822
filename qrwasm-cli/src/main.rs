//! QRWASM CLI
//!
//! Pack WebAssembly modules into QR-code-sized payloads and back.

mod commands;
mod utils;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use commands::{QR_MAX_PAYLOAD_BYTES, cmd_dump, cmd_exports, cmd_info, cmd_pack, cmd_unpack};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qrwasm")]
#[command(
    author,
    version,
    about = "Pack WebAssembly modules into QR-code-sized payloads"
)]
#[command(long_about = "
QRWASM re-encodes a WebAssembly binary bit by bit, replacing each field with
the most compact representation its grammar position permits, so that small
graphical programs fit in a single QR code.

Examples:
  qrwasm pack app.wasm
  qrwasm pack app.wasm -o app.qrw --limit 0
  qrwasm unpack app.qrw -o restored.wasm
  qrwasm exports app.wasm --json
  qrwasm info app.wasm
  qrwasm dump app.wasm
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a wasm binary into a packed payload
    #[command(alias = "p")]
    Pack {
        /// Input .wasm file
        input: PathBuf,

        /// Output file (defaults to the input with a .qrw extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Payload size ceiling in bytes; 0 disables the check
        #[arg(short, long, default_value_t = QR_MAX_PAYLOAD_BYTES)]
        limit: usize,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore the standard wasm binary from a packed payload
    #[command(alias = "u")]
    Unpack {
        /// Input packed file
        input: PathBuf,

        /// Output file (defaults to the input with a .wasm extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the exports of a wasm binary
    #[command(alias = "e")]
    Exports {
        /// Input .wasm file
        input: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Show module statistics and the projected packed size
    #[command(alias = "i")]
    Info {
        /// Input .wasm file
        input: PathBuf,
    },

    /// Print a text listing of a wasm binary
    #[command(alias = "d")]
    Dump {
        /// Input .wasm file
        input: PathBuf,
    },

    /// Generate shell completion scripts
    #[command(hide = true)]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pack {
            input,
            output,
            limit,
            verbose,
        } => cmd_pack(&input, output, limit, verbose),
        Commands::Unpack {
            input,
            output,
            verbose,
        } => cmd_unpack(&input, output, verbose),
        Commands::Exports { input, json } => cmd_exports(&input, json),
        Commands::Info { input } => cmd_info(&input),
        Commands::Dump { input } => cmd_dump(&input),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "qrwasm", &mut io::stdout());
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
