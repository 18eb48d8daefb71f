use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Report, Result};
use tracing_subscriber::EnvFilter;

use lc3vm::loader;
use lc3vm::term::Console;
use lc3vm::{Machine, Memory, Status, VmError};

/// lc3vm is a reference interpreter for LC3 object images.
#[derive(Parser)]
#[command(version, args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide `.obj` images to run
    images: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load one or more images and run them, overlaid in order
    Run {
        /// `.obj` images to load
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Start address, instead of the origin of the first image
        #[arg(long, value_parser = parse_addr)]
        pc: Option<u16>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Print registers once the machine stops
        #[arg(short, long)]
        registers: bool,
    },
    /// List the contents of an image as instructions
    Disasm {
        /// `.obj` image to list
        image: PathBuf,
        /// Amount of words to list, defaults to the whole image
        #[arg(short, long)]
        count: Option<usize>,
    },
}

struct RunOptions {
    pc: Option<u16>,
    minimal: bool,
    registers: bool,
}

enum Outcome {
    Halted,
    Interrupted,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    lc3vm::env::init();
    init_tracing();

    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().context_lines(2).build())
    }))?;

    let outcome = match args.command {
        Some(Command::Run {
            images,
            pc,
            minimal,
            registers,
        }) => run(
            &images,
            RunOptions {
                pc,
                minimal: minimal || lc3vm::env::is_minimal(),
                registers,
            },
        )?,
        Some(Command::Disasm { image, count }) => {
            disasm(&image, count)?;
            return Ok(());
        }
        None if !args.images.is_empty() => run(
            &args.images,
            RunOptions {
                pc: None,
                minimal: lc3vm::env::is_minimal(),
                registers: false,
            },
        )?,
        None => {
            println!("\n~ lc3vm v{VERSION} ~");
            println!("{SHORT_INFO}");
            return Ok(());
        }
    };

    match outcome {
        Outcome::Halted => Ok(()),
        // Conventional exit status for SIGINT
        Outcome::Interrupted => std::process::exit(130),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_new(lc3vm::env::log_filter())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path, minimal: bool) {
    let right = format!("image {}", right.display());
    message(color, left, &right, minimal);
}

fn message(color: MsgColor, left: &str, right: &str, minimal: bool) {
    if minimal {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}

fn run(images: &[PathBuf], opts: RunOptions) -> Result<Outcome> {
    use MsgColor::*;

    // Load everything before the console takes over the terminal
    let mut mem = Memory::new();
    let mut origin = None;
    for path in images {
        file_message(Green, "Loading", path, opts.minimal);
        match loader::load_file(path, &mut mem) {
            Ok(image) => {
                origin.get_or_insert(image.origin);
            }
            Err(err) => {
                message(Red, "Failed", "image skipped", opts.minimal);
                eprintln!("{:?}", Report::new(err));
            }
        }
    }
    let Some(origin) = origin else {
        bail!("No image could be loaded. Exiting...");
    };
    let pc = opts.pc.unwrap_or(origin);

    message(
        Green,
        "Running",
        &format!("from 0x{pc:04x}"),
        opts.minimal,
    );
    let console = Console::new().into_diagnostic()?;
    let mut machine = Machine::with_memory(console, mem, pc);
    let result = machine.run();
    let regs = machine.registers().clone();
    // Restore the terminal before printing anything else
    drop(machine);

    if !opts.minimal {
        eprintln!();
    }
    if opts.registers {
        lc3vm::output::print_registers(&mut io::stderr(), &regs, opts.minimal)
            .into_diagnostic()?;
    }

    match result {
        Ok(status) => {
            debug_assert_eq!(status, Status::Halted);
            message(Cyan, "Halted", "program finished", opts.minimal);
            Ok(Outcome::Halted)
        }
        Err(VmError::Io(err)) if err.kind() == io::ErrorKind::Interrupted => {
            message(Red, "Interrupted", "by user", opts.minimal);
            Ok(Outcome::Interrupted)
        }
        Err(err) => Err(err.into()),
    }
}

fn disasm(path: &Path, count: Option<usize>) -> Result<()> {
    let mut mem = Memory::new();
    let image = loader::load_file(path, &mut mem)?;
    let count = count.unwrap_or(image.len);
    lc3vm::output::print_listing(&mut io::stdout().lock(), &mem, image.origin, count)
        .into_diagnostic()?;
    Ok(())
}

/// Parse `0x3000`, `x3000` or a decimal address.
fn parse_addr(s: &str) -> std::result::Result<u16, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('x'))
        .or_else(|| s.strip_prefix('X'));
    let parsed = match hex {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}

const SHORT_INFO: &str = r"
Welcome to lc3vm, an interpreter for LC3 object images.
Run an image with `lc3vm <IMAGE>...` or `lc3vm run <IMAGE>...`.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
