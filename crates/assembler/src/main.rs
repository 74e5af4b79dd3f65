//! CLI entry point for the HEX-80 assembler and run driver.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use assembler::assembler::translate;
use assembler::schedule::parse_schedule;
use emulator_core::{
    run_simulation, ProgramImage, SimulationConfig, StopReason, TraceRecord, TraceSink,
};
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: hex80-asm <command> [options]

Commands:
  build <text.asm> <data.asm> [-o <stem>] [--verbose]
      Assemble both sections into <stem>.text.lst and <stem>.data.lst
  run <text.lst> <data.lst> [--input <file>] [--limit <n>]
      [--memory <words>] [--trace]
      Load the listings and simulate the machine

Options:
  -o, --output <stem>  Listing path stem (default: text source stem)
  -v, --verbose        Print both listings to stderr (build only)
      --input <file>   Input schedule, one 'tick value' per line
      --limit <n>      Instruction limit (default 20000)
      --memory <n>     Memory size in words (default 2048)
      --trace          Print a machine-state line per instruction
  -h, --help           Show this help message

Examples:
  hex80-asm build hello.asm hello.data
  hex80-asm run hello.text.lst hello.data.lst --input keys.txt --trace
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Build(BuildArgs),
    Run(RunArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct BuildArgs {
    text: PathBuf,
    data: PathBuf,
    output: Option<PathBuf>,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    text: PathBuf,
    data: PathBuf,
    input: Option<PathBuf>,
    limit: Option<u64>,
    memory: Option<usize>,
    trace: bool,
}

#[derive(Debug)]
enum ParsedArgs {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParsedArgs, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParsedArgs::Help);
    }

    match first.to_string_lossy().as_ref() {
        "build" => parse_build_args(args)
            .map(Command::Build)
            .map(ParsedArgs::Command),
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParsedArgs::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn positional(slots: &mut [&mut Option<PathBuf>], arg: OsString) -> Result<(), String> {
    for slot in slots {
        if slot.is_none() {
            **slot = Some(PathBuf::from(arg));
            return Ok(());
        }
    }
    Err("too many paths provided".to_string())
}

#[allow(clippy::while_let_on_iterator)]
fn parse_build_args(mut args: impl Iterator<Item = OsString>) -> Result<BuildArgs, String> {
    let mut text: Option<PathBuf> = None;
    let mut data: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }
        if arg == "--verbose" || arg == "-v" {
            verbose = true;
            continue;
        }
        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            output = Some(PathBuf::from(value));
            continue;
        }
        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }
        positional(&mut [&mut text, &mut data], arg)?;
    }

    let text = text.ok_or_else(|| "missing text source path".to_string())?;
    let data = data.ok_or_else(|| "missing data source path".to_string())?;
    Ok(BuildArgs {
        text,
        data,
        output,
        verbose,
    })
}

#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut text: Option<PathBuf> = None;
    let mut data: Option<PathBuf> = None;
    let mut input: Option<PathBuf> = None;
    let mut limit: Option<u64> = None;
    let mut memory: Option<usize> = None;
    let mut trace = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }
        if arg == "--trace" {
            trace = true;
            continue;
        }
        if arg == "--input" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --input".to_string())?;
            input = Some(PathBuf::from(value));
            continue;
        }
        if arg == "--limit" {
            limit = Some(numeric_option(args.next(), "--limit")?);
            continue;
        }
        if arg == "--memory" {
            memory = Some(numeric_option(args.next(), "--memory")?);
            continue;
        }
        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }
        positional(&mut [&mut text, &mut data], arg)?;
    }

    let text = text.ok_or_else(|| "missing text listing path".to_string())?;
    let data = data.ok_or_else(|| "missing data listing path".to_string())?;
    Ok(RunArgs {
        text,
        data,
        input,
        limit,
        memory,
        trace,
    })
}

fn numeric_option<T: std::str::FromStr>(
    value: Option<OsString>,
    option: &str,
) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("missing value for {option}"))?;
    value
        .to_string_lossy()
        .parse()
        .map_err(|_| format!("bad value for {option}: {}", value.to_string_lossy()))
}

fn read_source(path: &Path) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", path.display());
        1
    })
}

fn default_output_stem(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(stem)
}

fn run_build(args: BuildArgs) -> Result<(), i32> {
    let text_source = read_source(&args.text)?;
    let data_source = read_source(&args.data)?;

    let assembly = match translate(&data_source, &text_source) {
        Ok(assembly) => assembly,
        Err(error) => {
            eprintln!("error: {error}");
            return Err(1);
        }
    };

    let stem = args.output.unwrap_or_else(|| default_output_stem(&args.text));
    let text_path = stem.with_extension("text.lst");
    let data_path = stem.with_extension("data.lst");

    for (path, listing) in [
        (&text_path, assembly.text_listing()),
        (&data_path, assembly.data_listing()),
    ] {
        if let Err(e) = fs::write(path, listing) {
            eprintln!("error: failed to write {}: {e}", path.display());
            return Err(1);
        }
    }

    if args.verbose {
        for entry in assembly.data.iter().chain(&assembly.text) {
            eprintln!("{entry}");
        }
    }

    println!(
        "Assembled {} data words, {} instructions -> {}, {}",
        assembly.data.len(),
        assembly.text.len(),
        data_path.display(),
        text_path.display()
    );
    Ok(())
}

/// Trace sink printing one machine-state line per record to stderr.
struct StderrTrace;

impl TraceSink for StderrTrace {
    fn record(&mut self, record: &TraceRecord) {
        eprintln!("{record}");
    }
}

fn run_machine(args: RunArgs) -> Result<(), i32> {
    let text_listing = read_source(&args.text)?;
    let data_listing = read_source(&args.data)?;

    let image = match ProgramImage::from_listings(&data_listing, &text_listing) {
        Ok(image) => image,
        Err(fault) => {
            eprintln!("error: {fault}");
            return Err(1);
        }
    };

    let schedule = match args.input {
        None => Vec::new(),
        Some(path) => {
            let source = read_source(&path)?;
            match parse_schedule(&source) {
                Ok(schedule) => schedule,
                Err(error) => {
                    eprintln!("error: {}: line {}: {error}", path.display(), error.line);
                    return Err(1);
                }
            }
        }
    };

    let defaults = SimulationConfig::default();
    let config = SimulationConfig {
        memory_size: args.memory.unwrap_or(defaults.memory_size),
        instruction_limit: args.limit.unwrap_or(defaults.instruction_limit),
    };

    let mut sink = StderrTrace;
    let trace_sink: Option<&mut dyn TraceSink> =
        args.trace.then_some(&mut sink as &mut dyn TraceSink);

    let outcome = match run_simulation(&image, schedule, &config, trace_sink) {
        Ok(outcome) => outcome,
        Err(fault) => {
            eprintln!("fault: {fault}");
            return Err(1);
        }
    };

    match outcome.stop {
        StopReason::Halted => {}
        StopReason::InputExhausted => eprintln!("warning: input schedule exhausted"),
        StopReason::LimitExceeded => eprintln!("warning: instruction limit exceeded"),
    }

    println!("{}", outcome.output);
    println!(
        "instr_counter: {} ticks: {}",
        outcome.instructions, outcome.ticks
    );
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParsedArgs::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParsedArgs::Command(Command::Build(args))) => match run_build(args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParsedArgs::Command(Command::Run(args))) => match run_machine(args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
                0
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
                1
            }
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::{parse_build_args, parse_run_args};

    fn os(args: &[&str]) -> impl Iterator<Item = OsString> {
        args.iter().map(OsString::from).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_build_command() {
        let args =
            parse_build_args(os(&["prog.asm", "prog.data", "-o", "out", "--verbose"])).unwrap();
        assert_eq!(args.text, PathBuf::from("prog.asm"));
        assert_eq!(args.data, PathBuf::from("prog.data"));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert!(args.verbose);
    }

    #[test]
    fn build_requires_both_sources() {
        assert!(parse_build_args(os(&["prog.asm"])).is_err());
    }

    #[test]
    fn parses_run_command() {
        let args = parse_run_args(os(&[
            "prog.text.lst",
            "prog.data.lst",
            "--input",
            "keys.txt",
            "--limit",
            "500",
            "--memory",
            "128",
            "--trace",
        ]))
        .unwrap();
        assert_eq!(args.text, PathBuf::from("prog.text.lst"));
        assert_eq!(args.data, PathBuf::from("prog.data.lst"));
        assert_eq!(args.input, Some(PathBuf::from("keys.txt")));
        assert_eq!(args.limit, Some(500));
        assert_eq!(args.memory, Some(128));
        assert!(args.trace);
    }

    #[test]
    fn unknown_options_are_rejected() {
        assert!(parse_run_args(os(&["a", "b", "--frobnicate"])).is_err());
        assert!(parse_build_args(os(&["a", "b", "c"])).is_err());
    }
}
