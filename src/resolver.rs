//! Include resolver.
//!
//! Grounded on `original_source/c5c/compiler.py`'s include loop: for each
//! `include <path>` at the top of the file list, search (in order) the
//! including file's directory, the caller-supplied `-I` paths, `<dir>/../c5include`,
//! `./c5include`, and `~/.c5/include`; parse the found file and splice its
//! declarations in, namespacing every `func`/`extern`/`struct_decl`/
//! `enum_decl`/`macro`/`type_decl`/`pub_var` as `stem::name` per spec.md
//! §4.3's full statement (the single compiler.py snippet only shows
//! func/extern, but the design doc is explicit that all seven decl kinds are
//! namespaced).
//!
//! Unlike the original, include cycles are tracked explicitly with a stack
//! (spec.md §9's redesign flag) instead of relying on double-include being
//! merely harmless.

use crate::ast::{Decl, Program};
use crate::parser::Parser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub struct Resolver {
    include_paths: Vec<PathBuf>,
    /// Files fully resolved already; re-including one is a silent no-op,
    /// matching `original_source/c5c/compiler.py`'s behavior of skipping
    /// files it has already merged.
    seen: HashSet<PathBuf>,
    /// Files currently being resolved, for cycle detection: if a file on the
    /// stack is reached again before it is popped, the includes form a
    /// cycle rather than a harmless diamond.
    stack: Vec<PathBuf>,
}

impl Resolver {
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        Resolver { include_paths, seen: HashSet::new(), stack: Vec::new() }
    }

    /// Resolve all includes transitively reachable from `source`, which was
    /// read from `path`, and return the flattened, namespaced program.
    pub fn resolve(&mut self, path: &Path, source: &str) -> Result<Program, String> {
        let canonical = canonicalize_best_effort(path);
        self.stack.push(canonical.clone());
        let parsed = Parser::new(source)?.parse_program()?;

        let mut out = Program::new();
        for decl in parsed.decls {
            match decl {
                Decl::Include { path: inc_path, span } => {
                    let found = self.search(path, &inc_path).ok_or_else(|| {
                        format!("{}:{}: include not found: {}", span.line, span.column, inc_path)
                    })?;
                    let found_canonical = canonicalize_best_effort(&found);

                    if self.stack.contains(&found_canonical) {
                        return Err(format!(
                            "{}:{}: include cycle detected: {} includes {} which is already being resolved",
                            span.line,
                            span.column,
                            path.display(),
                            found.display()
                        ));
                    }
                    if self.seen.contains(&found_canonical) {
                        continue;
                    }
                    self.seen.insert(found_canonical);

                    let inc_source = std::fs::read_to_string(&found)
                        .map_err(|e| format!("failed to read include {}: {}", found.display(), e))?;
                    let stem = found
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .ok_or_else(|| format!("include path has no usable stem: {}", found.display()))?
                        .to_string();

                    let mut included = self.resolve(&found, &inc_source)?;
                    namespace_decls(&mut included, &stem);
                    out.decls.extend(included.decls);
                }
                other => out.decls.push(other),
            }
        }

        self.stack.pop();
        Ok(out)
    }

    /// Search order per `original_source/c5c/compiler.py::compile_file`:
    /// the including file's directory, caller `-I` paths, `<dir>/../c5include`,
    /// `./c5include`, `~/.c5/include`.
    fn search(&self, from: &Path, inc_path: &str) -> Option<PathBuf> {
        let dir = from.parent().unwrap_or_else(|| Path::new("."));

        let mut candidates = vec![dir.join(inc_path)];
        candidates.extend(self.include_paths.iter().map(|p| p.join(inc_path)));
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join("c5include").join(inc_path));
        }
        candidates.push(dir.join("c5include").join(inc_path));
        candidates.push(Path::new("c5include").join(inc_path));
        if let Some(home) = std::env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join(".c5").join("include").join(inc_path));
        }

        candidates.into_iter().find(|c| c.is_file())
    }
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Rename every declaration this include introduces to `stem::name`, per
/// spec.md §4.3.
fn namespace_decls(program: &mut Program, stem: &str) {
    for decl in &mut program.decls {
        if let Some(name) = decl.name() {
            decl.set_name(format!("{}::{}", stem, name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn namespaces_included_func() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "util.c5h", "int helper() { return 1; }");
        let main_path = write_file(dir.path(), "main.c5", "include <util.c5h>\nint main() { return util::helper(); }");
        let source = std::fs::read_to_string(&main_path).unwrap();

        let mut resolver = Resolver::new(vec![]);
        let program = resolver.resolve(&main_path, &source).unwrap();

        assert!(program.decls.iter().any(|d| d.name() == Some("util::helper")));
        assert!(!program.decls.iter().any(|d| matches!(d, Decl::Include { .. })));
    }

    #[test]
    fn diamond_include_is_merged_once() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "base.c5h", "int base_fn() { return 0; }");
        write_file(dir.path(), "a.c5h", "include <base.c5h>\nint a_fn() { return 1; }");
        write_file(dir.path(), "b.c5h", "include <base.c5h>\nint b_fn() { return 2; }");
        let main_path = write_file(
            dir.path(),
            "main.c5",
            "include <a.c5h>\ninclude <b.c5h>\nint main() { return 0; }",
        );
        let source = std::fs::read_to_string(&main_path).unwrap();

        let mut resolver = Resolver::new(vec![]);
        let program = resolver.resolve(&main_path, &source).unwrap();

        let base_count = program.decls.iter().filter(|d| d.name() == Some("base::base_fn")).count();
        assert_eq!(base_count, 1);
    }

    #[test]
    fn include_cycle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.c5h", "include <b.c5h>\nint a_fn() { return 1; }");
        write_file(dir.path(), "b.c5h", "include <a.c5h>\nint b_fn() { return 2; }");
        let main_path = write_file(dir.path(), "main.c5", "include <a.c5h>\nint main() { return 0; }");
        let source = std::fs::read_to_string(&main_path).unwrap();

        let mut resolver = Resolver::new(vec![]);
        let err = resolver.resolve(&main_path, &source).unwrap_err();
        assert!(err.contains("cycle"));
    }

    #[test]
    fn missing_include_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = write_file(dir.path(), "main.c5", "include <missing.c5h>\nint main() { return 0; }");
        let source = std::fs::read_to_string(&main_path).unwrap();

        let mut resolver = Resolver::new(vec![]);
        let err = resolver.resolve(&main_path, &source).unwrap_err();
        assert!(err.contains("not found"));
    }
}
