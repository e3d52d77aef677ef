use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent source error: {0}")]
    AgentSource(String),

    #[error("no agent definitions found in {0}")]
    NoAgents(String),

    #[error("{0}")]
    Provider(String),

    #[error("check failed: {0}")]
    CheckFailed(String),

    #[error("cannot write {}: {source}", path.display())]
    WriteFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EvalError>;
