//! CLI tool for reading telemetry logs.
//!
//! Splits `log<N>.bin` files back into packets and prints every block in
//! physical units, or just a per-file summary.
//!
//! # Usage
//!
//! ```bash
//! telemetry-dump /pwrfs/log3.bin
//! telemetry-dump --summary /pwrfs
//! ```

use pygmy_packets::{BlockKind, PacketReader};
use pygmy_telemetry::storage::parse_log_seq;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let args: Vec<String> = env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Config {
    paths: Vec<PathBuf>,
    summary: bool,
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut paths = Vec::new();
    let mut summary = false;

    for arg in &args[1..] {
        match arg.as_str() {
            "--summary" | "-s" => summary = true,
            "--help" | "-h" => return Err("Help requested".to_string()),
            arg if !arg.starts_with('-') => paths.push(PathBuf::from(arg)),
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    if paths.is_empty() {
        return Err("Missing log file or directory argument".to_string());
    }
    Ok(Config { paths, summary })
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Usage: {} [OPTIONS] <LOG_FILE | LOG_DIR>...

Decode telemetry log files. Directories are expanded to their
log<N>.bin files in sequence order.

OPTIONS:
    -s, --summary   Print packet and block counts instead of every block
    -h, --help      Show this help message
"#,
        program
    );
}

/// Log files in a directory, ordered by sequence number
fn log_files(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(seq) = name.to_str().and_then(parse_log_seq) {
            files.push((seq, entry.path()));
        }
    }
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for path in &config.paths {
        if path.is_dir() {
            files.extend(log_files(path)?);
        } else {
            files.push(path.clone());
        }
    }

    for file in files {
        let bytes = fs::read(&file)?;
        if config.summary {
            summarize(&file, &bytes);
        } else {
            dump(&file, &bytes);
        }
    }
    Ok(())
}

fn dump(file: &Path, bytes: &[u8]) {
    println!("== {} ({} bytes)", file.display(), bytes.len());
    let mut reader = PacketReader::new(bytes);
    loop {
        let offset = reader.position();
        let Some(result) = reader.next() else {
            break;
        };
        match result {
            Ok(packet) => {
                println!(
                    "{} #{:<3} {} bytes",
                    packet.header.callsign_str(),
                    packet.header.seq(),
                    packet.raw.len()
                );
                for block in &packet.blocks {
                    println!("    {}", block);
                }
            }
            Err(e) => {
                println!("!! {} (packet at byte {})", e, offset);
            }
        }
    }
}

fn summarize(file: &Path, bytes: &[u8]) {
    let mut packets = 0usize;
    let mut gaps = 0usize;
    let mut last_seq: Option<u8> = None;
    let mut counts = [0usize; BlockKind::ALL.len()];
    let mut error = None;

    for result in PacketReader::new(bytes) {
        match result {
            Ok(packet) => {
                packets += 1;
                let seq = packet.header.seq();
                if last_seq.is_some_and(|last| last.wrapping_add(1) != seq) {
                    gaps += 1;
                }
                last_seq = Some(seq);
                for block in &packet.blocks {
                    counts[block.kind().tag() as usize] += 1;
                }
            }
            Err(e) => error = Some(e),
        }
    }

    println!("{}", file.display());
    println!("  Bytes: {}", bytes.len());
    println!("  Packets: {} ({} sequence gaps)", packets, gaps);
    for kind in BlockKind::ALL {
        let count = counts[kind.tag() as usize];
        if count > 0 {
            println!("  {:?}: {}", kind, count);
        }
    }
    if let Some(e) = error {
        println!("  Stopped early: {}", e);
    }
}
