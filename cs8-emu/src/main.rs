use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::error;

/// Runs a cs8 ELF executable on the bus-driven emulator.
#[derive(Parser, Debug)]
#[command(name = "emulator", about = "Runs a cs8 ELF executable")]
struct Args {
    /// Path to the ELF executable to load and run.
    elf_file: PathBuf,
}

fn main() {
    pretty_env_logger::init();
    let args = Args::parse();

    if let Err(err) = cs8_emu::run_file(&args.elf_file) {
        error!("{}", err);
        process::exit(1);
    }
}
