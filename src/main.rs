use std::fs;
use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;

use rust_i2l::fault::{Fault, ERR_BAD_CMD_LINE, ERR_NO_I2L_FILE};
use rust_i2l::interp;
use rust_i2l::loader;
use rust_i2l::machine::{Machine, MachineFlags};
use rust_i2l::trace::Tracer;

#[derive(Parser)]
#[command(about = "An I2L (XPL0 intermediate code) interpreter", version)]
struct Args {
    /// I2L object file to load and run
    object: PathBuf,

    /// Write a per-instruction execution trace to this file
    #[arg(long, value_name = "FILE")]
    trace: Option<PathBuf>,

    /// File backing the disk input device
    #[arg(short = 'i', value_name = "FILE")]
    disk_in: Option<PathBuf>,

    /// File backing the disk output device
    #[arg(short = 'o', value_name = "FILE")]
    disk_out: Option<PathBuf>,

    /// Seed the random number generator for reproducible runs
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
}

/// Find a flag given more than once. clap's default for a repeated flag
/// is to keep the last value; a second occurrence has to be fatal instead,
/// so count them by hand before parsing. Each flag takes a value, either
/// attached (`--trace=f`, `-if`) or as the following argument.
fn repeated_flag(argv: &[String]) -> Option<&'static str> {
    let mut seen = Vec::new();
    let mut skip_value = false;
    for arg in argv {
        let arg = arg.as_str();
        if skip_value {
            skip_value = false;
            continue;
        }
        let name = if arg == "--trace" || arg.starts_with("--trace=") {
            "--trace"
        } else if arg == "--seed" || arg.starts_with("--seed=") {
            "--seed"
        } else if arg.starts_with("-i") {
            "-i"
        } else if arg.starts_with("-o") {
            "-o"
        } else {
            continue;
        };
        skip_value = arg == name;
        if seen.contains(&name) {
            return Some(name);
        }
        seen.push(name);
    }
    None
}

fn main() {
    let progname = std::env::args().next().unwrap_or_else(|| "i2l".into());
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if let Some(flag) = repeated_flag(&argv) {
        eprintln!("{progname}: {flag} given more than once");
        process::exit(ERR_BAD_CMD_LINE);
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Keep the standard I2L exit codes instead of clap's default 2:
            // a missing object file and a malformed command line are
            // different errors to the caller.
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = e.print();
                    process::exit(0);
                }
                ErrorKind::MissingRequiredArgument => ERR_NO_I2L_FILE,
                _ => ERR_BAD_CMD_LINE,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    process::exit(run(args));
}

fn run(args: Args) -> i32 {
    let progname = std::env::args().next().unwrap_or_else(|| "i2l".into());

    let mut machine = Machine::new();
    machine.devices.disk_in_path = args.disk_in;
    machine.devices.disk_out_path = args.disk_out;
    if let Some(seed) = args.seed {
        machine.seed_random(seed);
    }

    let mut tracer = match &args.trace {
        Some(path) => match Tracer::create(path) {
            Ok(t) => Some(t),
            Err(_) => {
                return fail(&mut machine, &progname, &Fault::Io("can't open trace file".into()))
            }
        },
        None => None,
    };

    let source = match fs::read(&args.object) {
        Ok(bytes) => bytes,
        Err(_) => return fail(&mut machine, &progname, &Fault::NoObjectFile),
    };
    if let Err(fault) = loader::load(&mut machine, &source) {
        return fail(&mut machine, &progname, &fault);
    }

    // Run the program, re-entering from scratch for as long as the guest
    // keeps requesting a restart. Memory contents survive reruns; only the
    // stack, heap pointer and activation state are rebuilt.
    loop {
        let result = machine
            .reset()
            .and_then(|()| interp::run(&mut machine, &mut tracer));

        match result {
            Ok(()) if machine.flag(MachineFlags::RERUN) => {}
            Ok(()) => break,
            Err(fault) => {
                machine.err = fault.code();
                eprintln!("{progname}: {fault}");
                if !machine.flag(MachineFlags::RERUN) {
                    break;
                }
            }
        }
    }

    machine.devices.close_disk();
    machine.devices.flush();
    machine.err
}

fn fail(machine: &mut Machine, progname: &str, fault: &Fault) -> i32 {
    machine.devices.close_disk();
    machine.devices.flush();
    eprintln!("{progname}: {fault}");
    fault.code()
}
