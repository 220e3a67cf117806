//! Error types for storage and command parsing.

/// Failure talking to the key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot read {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A typed command line that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("invalid duration `{0}` (use e.g. 25, 25m, 90s or 1h30m)")]
    InvalidDuration(String),

    #[error("invalid mode `{0}` (use work or break)")]
    InvalidMode(String),

    #[error("no task matches `{0}`")]
    UnknownTask(String),
}
