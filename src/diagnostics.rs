//! Structured diagnostics (component C9)
//!
//! Every error kind carries a source position where one is known and
//! renders as `<file>:<line>:<col>: <kind>: <message>`. Warnings use the
//! same shape with kind `warning:` and never abort compilation.

use std::fmt;
use std::path::PathBuf;

/// A 1-indexed line/column pair within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub line: usize,
    pub col: usize,
}

impl SourcePos {
    pub fn new(line: usize, col: usize) -> Self {
        SourcePos { line, col }
    }

    pub const fn start() -> Self {
        SourcePos { line: 1, col: 1 }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The error taxonomy of spec §7.
#[derive(Debug, Clone, PartialEq)]
pub enum LotusError {
    Lex { pos: SourcePos, message: String },
    Parse { pos: SourcePos, message: String },
    Name { pos: SourcePos, message: String },
    Type { pos: SourcePos, message: String },
    Codegen { pos: Option<SourcePos>, message: String },
    Io { message: String },
    Tool { message: String, output: String },
}

impl LotusError {
    pub fn lex(pos: SourcePos, message: impl Into<String>) -> Self {
        LotusError::Lex { pos, message: message.into() }
    }

    pub fn parse(pos: SourcePos, message: impl Into<String>) -> Self {
        LotusError::Parse { pos, message: message.into() }
    }

    pub fn name(pos: SourcePos, message: impl Into<String>) -> Self {
        LotusError::Name { pos, message: message.into() }
    }

    pub fn type_err(pos: SourcePos, message: impl Into<String>) -> Self {
        LotusError::Type { pos, message: message.into() }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        LotusError::Codegen { pos: None, message: message.into() }
    }

    pub fn codegen_at(pos: SourcePos, message: impl Into<String>) -> Self {
        LotusError::Codegen { pos: Some(pos), message: message.into() }
    }

    pub fn io(message: impl Into<String>) -> Self {
        LotusError::Io { message: message.into() }
    }

    pub fn tool(message: impl Into<String>, output: impl Into<String>) -> Self {
        LotusError::Tool { message: message.into(), output: output.into() }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            LotusError::Lex { .. } => "LexError",
            LotusError::Parse { .. } => "ParseError",
            LotusError::Name { .. } => "NameError",
            LotusError::Type { .. } => "TypeError",
            LotusError::Codegen { .. } => "CodegenError",
            LotusError::Io { .. } => "IOError",
            LotusError::Tool { .. } => "ToolError",
        }
    }

    /// Render this diagnostic against the given source file path, in the
    /// form `<file>:<line>:<col>: <kind>: <message>`.
    pub fn render(&self, file: &PathBuf) -> String {
        let file = file.display();
        match self {
            LotusError::Lex { pos, message }
            | LotusError::Parse { pos, message }
            | LotusError::Name { pos, message }
            | LotusError::Type { pos, message } => {
                format!("{}:{}: {}: {}", file, pos, self.kind_name(), message)
            }
            LotusError::Codegen { pos: Some(pos), message } => {
                format!("{}:{}: {}: {}", file, pos, self.kind_name(), message)
            }
            LotusError::Codegen { pos: None, message } => {
                format!("{}: {}: {}", file, self.kind_name(), message)
            }
            LotusError::Io { message } => format!("{}: {}: {}", file, self.kind_name(), message),
            LotusError::Tool { message, output } => {
                if output.is_empty() {
                    format!("{}: {}: {}", file, self.kind_name(), message)
                } else {
                    format!("{}: {}: {}\n{}", file, self.kind_name(), message, output)
                }
            }
        }
    }
}

impl fmt::Display for LotusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LotusError::Lex { pos, message }
            | LotusError::Parse { pos, message }
            | LotusError::Name { pos, message }
            | LotusError::Type { pos, message } => {
                write!(f, "{}: {}: {}", pos, self.kind_name(), message)
            }
            LotusError::Codegen { pos: Some(pos), message } => {
                write!(f, "{}: {}: {}", pos, self.kind_name(), message)
            }
            LotusError::Codegen { pos: None, message } => {
                write!(f, "{}: {}", self.kind_name(), message)
            }
            LotusError::Io { message } => write!(f, "{}: {}", self.kind_name(), message),
            LotusError::Tool { message, .. } => write!(f, "{}: {}", self.kind_name(), message),
        }
    }
}

impl std::error::Error for LotusError {}

/// A non-fatal diagnostic. Same rendering as `LotusError` but prefixed
/// `warning:` and collected rather than aborting the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub pos: SourcePos,
    pub message: String,
}

impl Warning {
    pub fn new(pos: SourcePos, message: impl Into<String>) -> Self {
        Warning { pos, message: message.into() }
    }

    pub fn render(&self, file: &PathBuf) -> String {
        format!("{}:{}: warning: {}", file.display(), self.pos, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_lex_error() {
        let err = LotusError::lex(SourcePos::new(3, 7), "unterminated string literal");
        let rendered = err.render(&PathBuf::from("main.lts"));
        assert_eq!(rendered, "main.lts:3:7: LexError: unterminated string literal");
    }

    #[test]
    fn renders_codegen_error_without_position() {
        let err = LotusError::codegen("unsupported construct");
        let rendered = err.render(&PathBuf::from("main.lts"));
        assert_eq!(rendered, "main.lts: CodegenError: unsupported construct");
    }

    #[test]
    fn renders_warning() {
        let warn = Warning::new(SourcePos::new(1, 1), "unused variable 'x'");
        assert_eq!(warn.render(&PathBuf::from("a.lts")), "a.lts:1:1: warning: unused variable 'x'");
    }
}
