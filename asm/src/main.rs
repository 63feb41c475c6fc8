use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::info;

use asm::{AssembleError, Instruction, Laid, Operand, SymbolTable};

/// Assembler for the octo16 instruction set.
#[derive(Parser, Debug)]
#[command(name = "asm")]
struct Cli {
    /// Assembly source file.
    source: PathBuf,
    /// Destination ROM file.
    destination: PathBuf,
    /// Emit two files, `<dest>_hi` and `<dest>_lo`, instead of one.
    #[arg(long)]
    split: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let source = fs::read_to_string(&cli.source)
        .map_err(|e| format!("reading {}: {}", cli.source.display(), e))?;

    let (laid, symbols, _source_map) = asm::assemble_with_layout(&source).map_err(|e| render_error(&e))?;

    let mut bytes = Vec::new();
    for item in &laid {
        let encoded = asm::emit::emit_instruction(&item.instruction, &symbols)
            .map_err(|e| render_error(&e))?;
        bytes.extend(encoded);
    }

    print_listing(&laid, &symbols);

    if cli.split {
        let hi: Vec<u8> = bytes.iter().step_by(2).copied().collect();
        let lo: Vec<u8> = bytes.iter().skip(1).step_by(2).copied().collect();
        fs::write(split_path(&cli.destination, "hi"), hi)
            .map_err(|e| format!("writing output: {}", e))?;
        fs::write(split_path(&cli.destination, "lo"), lo)
            .map_err(|e| format!("writing output: {}", e))?;
    } else {
        fs::write(&cli.destination, &bytes).map_err(|e| format!("writing output: {}", e))?;
    }

    info!("assembled {} bytes", bytes.len());
    Ok(())
}

fn split_path(path: &Path, bank: &str) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());
    let name = match &ext {
        Some(ext) => format!("{}_{}.{}", stem, bank, ext),
        None => format!("{}_{}", stem, bank),
    };
    path.with_file_name(name)
}

fn render_error(err: &AssembleError) -> String {
    format!("assembly failed: {}", err)
}

fn print_listing(laid: &[Laid], symbols: &SymbolTable) {
    let mut address = 0u16;
    for item in laid {
        let bytes = asm::emit::emit_instruction(&item.instruction, symbols).unwrap_or_default();
        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        println!(
            "{:04X}: {:<11} {}",
            address,
            hex.join(" "),
            render_instruction(&item.instruction)
        );
        address += item.instruction.size();
    }
    println!();
    println!("Symbols:");
    for (name, value) in symbols.iter() {
        println!("  {} = {:#06x}", name, value);
    }
}

fn render_instruction(instruction: &Instruction) -> String {
    match instruction {
        Instruction::DefB(bytes) => {
            let values: Vec<String> = bytes.iter().map(|b| format!("{:#04x}", b)).collect();
            format!("defb {}", values.join(", "))
        }
        Instruction::DefN { value, count } => format!("defn {:#04x}, {}", value, count),
        Instruction::OpCode { mnemonic, operands } => {
            let rendered: Vec<String> = operands.iter().map(render_operand).collect();
            if rendered.is_empty() {
                mnemonic.to_string()
            } else {
                format!("{} {}", mnemonic, rendered.join(", "))
            }
        }
    }
}

fn render_operand(operand: &Operand) -> String {
    match operand {
        Operand::Register(idx) => format!("r{}", idx),
        Operand::IndirectRegister(idx) => format!("@r{}", idx),
        Operand::Word(value) => format!("{:#06x}", value),
        Operand::Identifier(name) => name.clone(),
    }
}
