//! Error types for the modc compiler.

use std::path::PathBuf;

use modc_lexer::Location;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Unsupported input filename '{0}', expecting '<file>.module.c'")]
    Naming(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{category}: {file}:{location}: {message}")]
    Syntax {
        category: &'static str,
        file: PathBuf,
        location: Location,
        message: String,
    },

    #[error("Error importing '{filename}': {source}")]
    Import {
        filename: String,
        #[source]
        source: Box<CompileError>,
    },

    #[error("{file}: {source}")]
    Lex {
        file: PathBuf,
        #[source]
        source: modc_lexer::LexError,
    },
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn import(filename: impl Into<String>, source: CompileError) -> Self {
        CompileError::Import {
            filename: filename.into(),
            source: Box::new(source),
        }
    }
}
