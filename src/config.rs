//! Compiler configuration.
//!
//! Grounded on the teacher's `config.rs::CompilerConfig` builder pattern,
//! adapted to C5's actual driver knobs: include search paths, library mode
//! (`--lib`, emit a `.o` instead of linking an executable), and
//! assembly-only mode (`-S`).

use std::path::PathBuf;

/// Compile-time options threaded through `front_end`/`compile_file`, built
/// with a chainable setter API the way the teacher's own config is.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    pub include_paths: Vec<PathBuf>,
    pub is_library: bool,
    pub assembly_only: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn with_include_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.include_paths.extend(paths);
        self
    }

    pub fn as_library(mut self, is_library: bool) -> Self {
        self.is_library = is_library;
        self
    }

    pub fn assembly_only(mut self, assembly_only: bool) -> Self {
        self.assembly_only = assembly_only;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chains_accumulate() {
        let config = CompilerConfig::new()
            .with_include_path("/usr/local/include/c5")
            .as_library(true)
            .assembly_only(true);
        assert_eq!(config.include_paths, vec![PathBuf::from("/usr/local/include/c5")]);
        assert!(config.is_library);
        assert!(config.assembly_only);
    }
}
