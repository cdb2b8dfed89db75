//! C5 Compiler CLI
//!
//! Compiles `.c5` source files to x86-64 GAS assembly and, by default, all
//! the way to a linked executable.

use c5c::{assemble_and_link, compile_file, setup_libs, CompilerConfig};
use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "c5c")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "C5 compiler - compile .c5 programs to x86-64 executables", long_about = None)]
struct Cli {
    /// Source .c5 file(s); multiple files are compiled and linked together
    inputs: Vec<PathBuf>,

    /// Output filename (defaults to the first input's name, extension
    /// adjusted for the chosen mode)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit assembly only, do not assemble or link
    #[arg(short = 'S')]
    assembly_only: bool,

    /// Add an include search path (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Compile as a library: emit a .o object file instead of linking an executable
    #[arg(long)]
    lib: bool,

    /// Install the bundled C5 standard headers to ~/.c5/include
    #[arg(long)]
    setup_libs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        run_completions(shell);
        return;
    }

    if cli.setup_libs {
        if let Err(e) = run_setup_libs() {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return;
    }

    if let Err(e) = run_build(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn run_setup_libs() -> Result<(), String> {
    let local = std::env::current_dir().map_err(|e| e.to_string())?.join("c5include");
    let installed = setup_libs(&local)?;
    println!("Success! Libraries installed to {}", installed.display());
    Ok(())
}

fn run_build(cli: Cli) -> Result<(), String> {
    if cli.inputs.is_empty() {
        return Err("no input files provided".to_string());
    }
    for input in &cli.inputs {
        if input.extension().and_then(|e| e.to_str()) != Some("c5") {
            return Err(format!("expected a .c5 file, got {}", input.display()));
        }
    }

    let config = CompilerConfig::new()
        .with_include_paths(cli.include.clone())
        .as_library(cli.lib)
        .assembly_only(cli.assembly_only);

    println!(
        "Compiling {} to GAS assembly...",
        cli.inputs.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    );
    let mut asm = String::new();
    for input in &cli.inputs {
        let source = std::fs::read_to_string(input).unwrap_or_default();
        let path_str = input.display().to_string();
        let (file_asm, diagnostics) = compile_file(input, &config).map_err(|diags| {
            diags.iter().map(|d| d.render(&path_str, &source)).collect::<Vec<_>>().join("\n")
        })?;
        for d in &diagnostics {
            eprintln!("{}", d.render(&path_str, &source));
        }
        asm.push_str(&file_asm);
    }

    let base_name = cli.inputs[0].with_extension("");

    if cli.assembly_only {
        let out = cli.output.unwrap_or_else(|| base_name.with_extension("s"));
        std::fs::write(&out, asm).map_err(|e| format!("could not write '{}': {}", out.display(), e))?;
        println!("Success! Assembly generated at: {}", out.display());
        return Ok(());
    }

    if cli.lib {
        let out = cli.output.unwrap_or_else(|| base_name.with_extension("o"));
        println!("Assembling to object file...");
        assemble_and_link(&asm, &out, true)?;
        println!("Success! Library object file ready at: {}", out.display());
    } else {
        let out = cli.output.unwrap_or(base_name);
        println!("Assembling...");
        println!("Linking...");
        assemble_and_link(&asm, &out, false)?;
        println!("Success! Executable ready at: {}", out.display());
    }
    Ok(())
}
