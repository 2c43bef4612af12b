//! Command-line front end: assemble, disassemble, and run Leben-80 programs.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info, warn};
use simple_logger::SimpleLogger;

use leben_emulator::asm::{Image, assemble};
use leben_emulator::isa::{ConditionFlags, disassemble};
use leben_emulator::machine::{Machine, MachineState, TracePrinter};

#[derive(Parser)]
#[command(name = "leben-emulator", version, about = "Leben-80 assembler and emulator")]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file into a raw binary image.
    Asm {
        /// Assembly source file.
        input: PathBuf,
        /// Output path; defaults to the input with a .bin extension.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a disassembly listing of a raw binary image.
    Dis {
        /// Binary image file.
        input: PathBuf,
        /// Address the image loads at.
        #[arg(long, value_parser = parse_address, default_value = "0")]
        org: u16,
    },
    /// Assemble (or load) a program and execute it until HLT.
    Run {
        /// Assembly source file, or a raw .bin image.
        input: PathBuf,
        /// Load address for raw .bin images.
        #[arg(long, value_parser = parse_address, default_value = "0")]
        org: u16,
        /// Print each executed instruction to stderr.
        #[arg(long)]
        trace: bool,
        /// Stop after this many instructions even without HLT.
        #[arg(long, default_value_t = 10_000_000)]
        max_steps: u64,
    },
}

fn parse_address(text: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|_| format!("'{text}' is not a 16-bit address"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = SimpleLogger::new().with_level(level).init() {
        eprintln!("logger setup failed: {err}");
        return ExitCode::FAILURE;
    }

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Asm { input, output } => cmd_asm(&input, output),
        Command::Dis { input, org } => cmd_dis(&input, org),
        Command::Run {
            input,
            org,
            trace,
            max_steps,
        } => cmd_run(&input, org, trace, max_steps),
    }
}

fn cmd_asm(input: &Path, output: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(input)?;
    let image = assemble(&source)?;
    let output = output.unwrap_or_else(|| input.with_extension("bin"));
    fs::write(&output, &image.bytes)?;
    info!(
        "assembled {} bytes at origin 0x{:04X} into {}",
        image.bytes.len(),
        image.origin,
        output.display()
    );
    Ok(())
}

fn cmd_dis(input: &Path, org: u16) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(input)?;
    for entry in disassemble(&bytes, org) {
        let raw = entry
            .bytes
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("0x{:04X}: {raw:<8} {}", entry.address, entry.text);
    }
    Ok(())
}

fn cmd_run(input: &Path, org: u16, trace: bool, max_steps: u64) -> Result<(), Box<dyn Error>> {
    let image = load_program(input, org)?;
    let mut machine = Machine::with_console();
    machine.load_image(image.origin, &image.bytes);
    if trace {
        machine.set_tracer(Some(Box::new(TracePrinter)));
    }

    let steps = machine.run(max_steps)?;
    if machine.state() == MachineState::Running {
        warn!("stopped after {steps} instructions without reaching HLT");
    } else {
        info!("halted after {steps} instructions");
    }

    let console = machine.ports_mut().take_output();
    if !console.is_empty() {
        print!("{}", String::from_utf8_lossy(&console));
    }
    print_registers(&machine);
    Ok(())
}

/// Raw `.bin` files load as-is at `org`; anything else is assembled and loads
/// at its own origin.
fn load_program(input: &Path, org: u16) -> Result<Image, Box<dyn Error>> {
    if input.extension().is_some_and(|ext| ext == "bin") {
        Ok(Image {
            origin: org,
            bytes: fs::read(input)?,
        })
    } else {
        let source = fs::read_to_string(input)?;
        Ok(assemble(&source)?)
    }
}

fn print_registers(machine: &Machine) {
    use leben_emulator::isa::Register::{A, B, C, D, E, H, L};
    println!(
        "A: 0x{:02X}  B: 0x{:02X}  C: 0x{:02X}  D: 0x{:02X}  E: 0x{:02X}  H: 0x{:02X}  L: 0x{:02X}",
        machine.register(A),
        machine.register(B),
        machine.register(C),
        machine.register(D),
        machine.register(E),
        machine.register(H),
        machine.register(L),
    );
    println!(
        "PC: 0x{:04X}  SP: 0x{:04X}  flags: {}",
        machine.pc(),
        machine.sp(),
        describe_flags(machine.flags()),
    );
}

fn describe_flags(flags: ConditionFlags) -> String {
    let names = [
        (ConditionFlags::SIGN, "S"),
        (ConditionFlags::ZERO, "Z"),
        (ConditionFlags::AUX_CARRY, "AC"),
        (ConditionFlags::PARITY, "P"),
        (ConditionFlags::CARRY, "C"),
    ];
    let set: Vec<&str> = names
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        "none".to_string()
    } else {
        set.join(" ")
    }
}
