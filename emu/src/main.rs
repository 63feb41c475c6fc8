use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use emu::{Debugger, StepOutcome};

/// Interactive emulator and debugger for the octo16 instruction set.
#[derive(Parser, Debug)]
#[command(name = "emu")]
struct Cli {
    /// ROM image to load at address 0x0000.
    rom: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let rom_bytes = match fs::read(&cli.rom) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("reading {}: {}", cli.rom.display(), err);
            return ExitCode::FAILURE;
        }
    };

    info!("loaded {} bytes from {}", rom_bytes.len(), cli.rom.display());
    let debugger = emu::load(rom_bytes);
    repl(debugger);
    ExitCode::SUCCESS
}

fn repl(mut debugger: Debugger) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("failed to start the console: {}", err);
            return;
        }
    };

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                let words: Vec<&str> = line.split_whitespace().collect();
                if matches!(words.first(), Some(&"quit") | Some(&"exit") | Some(&"q")) {
                    break;
                }
                if let Err(message) = dispatch(&mut debugger, &words, &mut rl) {
                    println!("{}", message);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", err);
                break;
            }
        }
    }
}

fn dispatch(debugger: &mut Debugger, words: &[&str], rl: &mut DefaultEditor) -> Result<(), String> {
    match words.first() {
        None => Ok(()),
        Some(&"step") | Some(&"s") => {
            debugger.step().map_err(|e| e.to_string())?;
            print_registers(debugger);
            Ok(())
        }
        Some(&"next") | Some(&"n") => {
            let outcome = debugger.next().map_err(|e| e.to_string())?;
            print_outcome(outcome);
            print_registers(debugger);
            Ok(())
        }
        Some(&"run") | Some(&"r") => {
            let outcome = debugger.run().map_err(|e| e.to_string())?;
            print_outcome(outcome);
            print_registers(debugger);
            Ok(())
        }
        Some(&"reset") => {
            if words.contains(&"-y") || words.contains(&"--yes") || confirm(rl, "reset the machine? [y/N] ") {
                let outcome = debugger.reset().map_err(|e| e.to_string())?;
                print_outcome(outcome);
                print_registers(debugger);
            }
            Ok(())
        }
        Some(&"break") => break_command(debugger, &words[1..]),
        Some(&"list") => list_command(debugger, &words[1..]),
        Some(&"memory") => memory_command(debugger, &words[1..]),
        Some(&"registers") => {
            print_registers(debugger);
            Ok(())
        }
        Some(other) => Err(format!("unrecognized command: {}", other)),
    }
}

fn confirm(rl: &mut DefaultEditor, prompt: &str) -> bool {
    matches!(rl.readline(prompt), Ok(answer) if answer.trim().eq_ignore_ascii_case("y"))
}

fn break_command(debugger: &mut Debugger, args: &[&str]) -> Result<(), String> {
    match args.first() {
        None => {
            for address in debugger.break_list() {
                println!("{:#06x}", address);
            }
            Ok(())
        }
        Some(raw) => {
            let address = parse_u16(raw)?;
            if args.contains(&"--delete") {
                debugger.break_delete(address);
            } else {
                debugger.break_set(address);
            }
            Ok(())
        }
    }
}

fn list_command(debugger: &mut Debugger, args: &[&str]) -> Result<(), String> {
    let start = match args.first() {
        Some(raw) => parse_u16(raw)?,
        None => debugger.cpu.pc,
    };
    let count = match args.get(1) {
        Some(raw) => parse_u16(raw)?,
        None => 16,
    };
    for (address, text) in debugger.list(start, count) {
        println!("{:#06x}: {}", address, text);
    }
    Ok(())
}

fn memory_command(debugger: &mut Debugger, args: &[&str]) -> Result<(), String> {
    let start = match args.first() {
        Some(raw) => parse_u16(raw)?,
        None => return Err("usage: memory <start> [end]".to_string()),
    };
    let end = match args.get(1) {
        Some(raw) => parse_u16(raw)?,
        None => start.wrapping_add(256),
    };
    for (address, bytes) in debugger.memory(start, end) {
        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = bytes
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        println!("{:#06x}: {:<47} {}", address, hex.join(" "), ascii);
    }
    Ok(())
}

fn print_outcome(outcome: StepOutcome) {
    if let StepOutcome::Breakpoint(address) = outcome {
        println!("breakpoint hit at {:#06x}", address);
    }
}

fn print_registers(debugger: &Debugger) {
    let (pc, status, registers, instruction) = debugger.registers();
    println!("pc={:#06x} status={:#03x}  {}", pc, status, instruction);
    for (row_index, row) in registers.chunks(4).enumerate() {
        let rendered: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, value)| format!("r{:<2}={:#06x}", row_index * 4 + i, value))
            .collect();
        println!("{}", rendered.join("  "));
    }
}

fn parse_u16(text: &str) -> Result<u16, String> {
    let err = || format!("invalid number: {}", text);
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|_| err())
    } else if let Some(octal) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        u16::from_str_radix(octal, 8).map_err(|_| err())
    } else if text.len() > 1 && text.starts_with('0') {
        u16::from_str_radix(&text[1..], 8).map_err(|_| err())
    } else {
        text.parse().map_err(|_| err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_octal_and_decimal() {
        assert_eq!(parse_u16("0x1F").unwrap(), 0x1F);
        assert_eq!(parse_u16("017").unwrap(), 0o17);
        assert_eq!(parse_u16("42").unwrap(), 42);
    }
}
