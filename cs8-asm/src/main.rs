use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, info};

/// Assembles cs8 source into an ELF executable.
#[derive(Parser, Debug)]
#[command(name = "assembler", about = "Assembles cs8 source into out.elf")]
struct Args {
    /// Path to the assembly source file.
    input: PathBuf,
}

fn run(input: &Path) -> cs8_asm::Result<()> {
    let filename = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let source = fs::read_to_string(input)?;

    let original_dir = env::current_dir()?;
    if let Some(parent) = input.parent().filter(|p| !p.as_os_str().is_empty()) {
        env::set_current_dir(parent)?;
    }

    let result = cs8_asm::assemble(&filename, &source);

    env::set_current_dir(&original_dir)?;

    let elf = result?;
    fs::write("out.elf", elf)?;
    info!("wrote out.elf ({} bytes)", fs::metadata("out.elf")?.len());
    Ok(())
}

fn main() {
    pretty_env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(&args.input) {
        error!("{}", err);
        process::exit(1);
    }
}
