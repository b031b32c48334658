// Writes the bao(1) man page to the given path, or to stdout

use clap::CommandFactory;
use baoflow::cli::Cli;
use std::io::Write;

fn main() -> std::io::Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    let mut buffer: Vec<u8> = Vec::new();
    man.render(&mut buffer)?;

    match std::env::args().nth(1) {
        Some(path) => {
            std::fs::write(&path, buffer)?;
            eprintln!("Wrote man page to {}", path);
        }
        None => std::io::stdout().write_all(&buffer)?,
    }
    Ok(())
}
