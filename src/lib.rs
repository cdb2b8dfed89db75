//! C5 Compiler Library
//!
//! Compiles C5 source to x86-64 GAS assembly and, optionally, all the way
//! through to an object file or linked executable by shelling out to `gcc`.
//!
//! # Pipeline
//!
//! lex -> parse -> resolve includes -> expand macros -> analyze -> fold
//! constants -> generate assembly -> (optionally) assemble and link.
//!
//! Grounded on `original_source/c5c/compiler.py::compile_file`/
//! `compile_files`, restructured around the teacher's own
//! `compile_file_with_config` shape (read source, run the pipeline, shell
//! out to the system toolchain, surface a `Result<_, String>`).

pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod fold;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod resolver;
pub mod types;

pub use ast::Program;
pub use codegen::CodeGen;
pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, Severity};

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Run the full front end (parse, resolve, expand, analyze, fold) and
/// return either the folded `Program` ready for codegen, or the
/// diagnostics that stopped it.
///
/// Warnings do not stop compilation; only `Error`-severity diagnostics do.
/// The caller gets every diagnostic either way, so warnings from a
/// successful compile are never silently dropped.
pub fn front_end(path: &Path, config: &CompilerConfig) -> Result<(Program, Vec<Diagnostic>), Vec<Diagnostic>> {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            return Err(vec![Diagnostic::error(0, 0, format!("could not read '{}': {}", path.display(), e))])
        }
    };

    let mut resolver = resolver::Resolver::new(config.include_paths.clone());
    let program = resolver.resolve(path, &source).map_err(|e| vec![Diagnostic::error(0, 0, e)])?;

    let program =
        macros::MacroExpander::new().expand(program).map_err(|e| vec![Diagnostic::error(0, 0, e)])?;

    let diagnostics = analyzer::Analyzer::new().analyze(&program);
    if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        return Err(diagnostics);
    }

    Ok((fold::fold_program(program), diagnostics))
}

/// Compile a single C5 source file to assembly text.
pub fn compile_file(path: &Path, config: &CompilerConfig) -> Result<(String, Vec<Diagnostic>), Vec<Diagnostic>> {
    let (program, diagnostics) = front_end(path, config)?;
    let asm = codegen::generate(&program).map_err(|e| vec![Diagnostic::error(0, 0, e.to_string())])?;
    Ok((asm, diagnostics))
}

/// Assemble and, unless `is_library`, link `asm` into `output`, shelling out
/// to `gcc`, matching `original_source/c5c/main.py`'s assemble/link
/// sequence (temp `.s`/`.o` files, cleaned up afterward).
pub fn assemble_and_link(asm: &str, output: &Path, is_library: bool) -> Result<(), String> {
    let tmp_s = output.with_extension("tmp.s");
    fs::write(&tmp_s, asm).map_err(|e| format!("could not write '{}': {}", tmp_s.display(), e))?;

    if is_library {
        let status = Command::new("gcc")
            .args(["-c"])
            .arg(&tmp_s)
            .args(["-o"])
            .arg(output)
            .status()
            .map_err(|e| format!("failed to run gcc: {}", e))?;
        let _ = fs::remove_file(&tmp_s);
        if !status.success() {
            return Err("assembling failed".to_string());
        }
        return Ok(());
    }

    let tmp_o = output.with_extension("tmp.o");
    let asm_status = Command::new("gcc")
        .args(["-c"])
        .arg(&tmp_s)
        .args(["-o"])
        .arg(&tmp_o)
        .status()
        .map_err(|e| format!("failed to run gcc: {}", e))?;
    if !asm_status.success() {
        let _ = fs::remove_file(&tmp_s);
        return Err("assembling failed".to_string());
    }

    let link_status = Command::new("gcc")
        .arg(&tmp_o)
        .args(["-o"])
        .arg(output)
        .status()
        .map_err(|e| format!("failed to run gcc: {}", e))?;
    let _ = fs::remove_file(&tmp_s);
    let _ = fs::remove_file(&tmp_o);
    if !link_status.success() {
        return Err("linking failed".to_string());
    }
    Ok(())
}

/// Copy the bundled `c5include/` headers to `~/.c5/include`, matching
/// `original_source/c5c/main.py`'s `--setup-libs` handling.
pub fn setup_libs(local_include_dir: &Path) -> Result<PathBuf, String> {
    let home = std::env::var("HOME").map_err(|_| "HOME is not set".to_string())?;
    let global_path = PathBuf::from(home).join(".c5").join("include");
    fs::create_dir_all(&global_path).map_err(|e| format!("could not create '{}': {}", global_path.display(), e))?;

    if !local_include_dir.exists() {
        return Err(format!("'{}' not found; run from the project root", local_include_dir.display()));
    }
    for entry in fs::read_dir(local_include_dir).map_err(|e| e.to_string())? {
        let entry = entry.map_err(|e| e.to_string())?;
        if entry.path().is_file() {
            let dest = global_path.join(entry.file_name());
            fs::copy(entry.path(), &dest).map_err(|e| format!("could not copy '{}': {}", entry.path().display(), e))?;
        }
    }
    Ok(global_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".c5").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn compiles_a_trivial_program_to_assembly() {
        let f = write_temp("int main() { return 0; }");
        let config = CompilerConfig::new();
        let (asm, _) = compile_file(f.path(), &config).unwrap();
        assert!(asm.contains("main:"));
    }

    #[test]
    fn undefined_symbol_is_reported_and_stops_codegen() {
        let f = write_temp("int main() { return undeclared_thing; }");
        let config = CompilerConfig::new();
        let result = compile_file(f.path(), &config);
        assert!(result.is_err());
    }
}
