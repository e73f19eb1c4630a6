//! Fatal compiler/writer errors. All of these abort the run; nothing is
//! written once one is raised.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: undefined variable ${name}")]
    UndefinedVariable { name: String, line: usize },

    #[error("line {line}: {message}")]
    Syntax { message: String, line: usize },

    #[error("{0}")]
    Format(String),
}

impl ScriptError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            line,
        }
    }

    pub fn undefined(line: usize, name: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            name: name.into(),
            line,
        }
    }
}
