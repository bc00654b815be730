//! Error Types
//!
//! Unified error type for manifest parsing, name resolution and script
//! evaluation. Nothing here is retried or caught internally: every error
//! aborts the in-flight load and propagates to the original caller.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving or executing components.
#[derive(Debug, Error)]
pub enum Error {
    /// Manifest file could not be read from disk.
    #[error("failed to read manifest {}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest file is not valid JSON.
    #[error("failed to parse manifest {}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Requested file matches no allow-listed script of the component.
    #[error("failed to require {file} of {} component", dir.display())]
    ScriptResolution { file: String, dir: PathBuf },

    /// A required short name has no entry in the component's dependency map.
    #[error("component \"{name}\" is not declared as a dependency of {}", dir.display())]
    UndeclaredDependency { name: String, dir: PathBuf },

    /// A declared dependency's qualified name could not be located, neither
    /// via this instance's lookup paths nor via the root fallback.
    #[error("failed to lookup component {name}")]
    ComponentLookup { name: String },

    /// Loader misconfiguration or misuse.
    #[error("invalid loader configuration: {0}")]
    Configuration(String),

    /// Script source could not be read from disk.
    #[error("failed to read script {}", path.display())]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data script is not valid JSON.
    #[error("failed to parse data file {}", path.display())]
    DataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Script evaluation failed inside the interpreter.
    #[error(transparent)]
    Script(#[from] mlua::Error),
}

// Errors crossing back into the interpreter (a failing `require` inside an
// executing script) travel as external errors so the full cause chain
// survives the round trip.
impl From<Error> for mlua::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Script(e) => e,
            other => mlua::Error::external(other),
        }
    }
}
