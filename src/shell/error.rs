use std::io;

use thiserror::Error;

use super::parser::LexError;

/// 错误大类，用于决定如何向用户报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resource,
    TokenLength,
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("No input file specified.")]
    MissingInputFile,

    #[error("No output file specified.")]
    MissingOutputFile,

    #[error("Multiple input files specified.")]
    DuplicateInputFile,

    #[error("Multiple output files specified.")]
    DuplicateOutputFile,

    #[error("Missing command next to pipe.")]
    EmptyPipelineStage,

    #[error("Unsupported token: {0}")]
    UnsupportedToken(String),

    #[error("Invalid argument: {0:?} contains a NUL byte.")]
    InvalidArgument(String),

    #[error("Failed to open input file: {path}")]
    OpenInput {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open output file: {path}")]
    OpenOutput {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create pipe.")]
    Pipe(#[source] nix::Error),

    #[error("Fork failed.")]
    Fork(#[source] nix::Error),

    #[error("Failed to wait for process {pid}.")]
    Wait {
        pid: i32,
        #[source]
        source: nix::Error,
    },
}

impl ShellError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShellError::Lex(_) => ErrorKind::TokenLength,
            ShellError::MissingInputFile
            | ShellError::MissingOutputFile
            | ShellError::DuplicateInputFile
            | ShellError::DuplicateOutputFile
            | ShellError::EmptyPipelineStage
            | ShellError::UnsupportedToken(_)
            | ShellError::InvalidArgument(_) => ErrorKind::Configuration,
            ShellError::OpenInput { .. }
            | ShellError::OpenOutput { .. }
            | ShellError::Pipe(_)
            | ShellError::Fork(_)
            | ShellError::Wait { .. } => ErrorKind::Resource,
        }
    }
}
