//! Code generation error type.

#[derive(Debug)]
pub enum CodegenError {
    /// A logical error in code generation: an unresolvable lvalue, an
    /// unknown field, a call to a signature codegen can't find. Semantic
    /// errors are caught earlier by the analyzer; reaching here means the
    /// analyzer missed something or codegen is being driven on
    /// unanalyzed input.
    Logic(String),
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenError::Logic(s) => write!(f, "{}", s),
            CodegenError::Format(e) => write!(f, "assembly generation error: {}", e),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<String> for CodegenError {
    fn from(s: String) -> Self {
        CodegenError::Logic(s)
    }
}

impl From<std::fmt::Error> for CodegenError {
    fn from(e: std::fmt::Error) -> Self {
        CodegenError::Format(e)
    }
}

pub type CgResult<T> = Result<T, CodegenError>;
