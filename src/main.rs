// Fri Jul 31 2026 - Alex

use clap::Parser;
use colored::Colorize;
use memmap2::Mmap;
use sigscan::utils::LoggingUtils;
use sigscan::{compile, Address, MemoryRegion, PatternScanner};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Binary signature scanner", long_about = None)]
struct Args {
    /// File to scan
    #[arg(short, long)]
    binary: PathBuf,

    /// Signature, e.g. "48 8B ?? ?? 05"
    #[arg(short, long)]
    pattern: String,

    /// Load address reported matches are relative to (hex accepted)
    #[arg(long, default_value = "0")]
    base: String,

    /// Force the single-threaded scan path
    #[arg(long)]
    serial: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    LoggingUtils::init_logger(LoggingUtils::level_from_verbosity(args.verbose as usize));

    let base = match parse_base(&args.base) {
        Ok(base) => base,
        Err(()) => {
            eprintln!("{} Invalid base address: {}", "[!]".red(), args.base);
            std::process::exit(1);
        }
    };

    let pattern = match compile(&args.pattern) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{} {}", "[!]".red(), e);
            std::process::exit(1);
        }
    };

    println!(
        "{} Pattern: {} ({} cells, {} wildcards, {} strategy)",
        "[*]".blue(),
        pattern,
        pattern.len(),
        pattern.wildcard_count(),
        pattern.strategy_kind()
    );

    let file = match File::open(&args.binary) {
        Ok(f) => f,
        Err(e) => {
            eprintln!(
                "{} Failed to open {}: {}",
                "[!]".red(),
                args.binary.display(),
                e
            );
            std::process::exit(1);
        }
    };
    let mmap = match unsafe { Mmap::map(&file) } {
        Ok(m) => m,
        Err(e) => {
            eprintln!(
                "{} Failed to map {}: {}",
                "[!]".red(),
                args.binary.display(),
                e
            );
            std::process::exit(1);
        }
    };

    println!(
        "{} Scanning {} ({} bytes)",
        "[*]".blue(),
        args.binary.display(),
        mmap.len()
    );

    let region = MemoryRegion::new(Address::new(base), &mmap);
    let scanner = PatternScanner::new().use_parallel(!args.serial);

    let start_time = Instant::now();
    let result = scanner.scan(&pattern, &region);
    let elapsed = start_time.elapsed();

    match result {
        Some(addr) => {
            println!("{} Found at {} in {:.2?}", "[+]".green(), addr, elapsed);
        }
        None => {
            println!("{} Not found ({:.2?})", "[-]".yellow(), elapsed);
            std::process::exit(2);
        }
    }
}

fn parse_base(text: &str) -> Result<u64, ()> {
    let trimmed = text.trim();
    let (digits, radix) = match trimmed.strip_prefix("0x").or(trimmed.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };
    u64::from_str_radix(digits, radix).map_err(|_| ())
}
