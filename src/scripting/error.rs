use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where in a script an error was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLocation {
    pub chunk: String,
    pub line: u32,
}

impl ScriptLocation {
    /// Extract `chunk:line:` from a Lua error message.
    pub fn parse(message: &str) -> Option<Self> {
        for (idx, _) in message.match_indices(':') {
            let rest = &message[idx + 1..];
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 || !rest[digits..].starts_with(':') {
                continue;
            }
            let chunk = message[..idx].trim();
            if chunk.is_empty() {
                continue;
            }
            let line = rest[..digits].parse().ok()?;
            return Some(ScriptLocation {
                chunk: chunk.to_string(),
                line,
            });
        }
        None
    }
}

impl fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chunk, self.line)
    }
}

/// The entry program could not be loaded
#[derive(Debug, Error)]
pub enum ScriptLoadError {
    #[error("failed to read script {}: {source}", path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error in {}: {message}", path.display())]
    Syntax {
        path: PathBuf,
        message: String,
        location: Option<ScriptLocation>,
    },

    #[error("error while running {}: {message}", path.display())]
    Execution {
        path: PathBuf,
        message: String,
        location: Option<ScriptLocation>,
    },
}

impl ScriptLoadError {
    pub fn location(&self) -> Option<&ScriptLocation> {
        match self {
            ScriptLoadError::Missing { .. } => None,
            ScriptLoadError::Syntax { location, .. } | ScriptLoadError::Execution { location, .. } => {
                location.as_ref()
            }
        }
    }
}

/// A native binding could not be registered in a fresh environment
#[derive(Debug, Error)]
#[error("failed to register {binding} bindings: {message}")]
pub struct ScriptBindingError {
    pub binding: &'static str,
    pub message: String,
}

impl ScriptBindingError {
    pub fn new(binding: &'static str, err: &mlua::Error) -> Self {
        Self {
            binding,
            message: describe(err),
        }
    }
}

/// An entry point raised an error while the controller was running
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{entry_point}: {message}")]
pub struct ScriptRuntimeError {
    pub entry_point: &'static str,
    pub message: String,
    pub location: Option<ScriptLocation>,
}

impl ScriptRuntimeError {
    pub fn new(entry_point: &'static str, err: &mlua::Error) -> Self {
        let message = describe(err);
        Self {
            entry_point,
            location: ScriptLocation::parse(&message),
            message,
        }
    }
}

/// Reasons `start` or `request_reload` did not reach `Running`
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Load(#[from] ScriptLoadError),

    #[error(transparent)]
    Binding(#[from] ScriptBindingError),

    #[error("no entry script has been started yet")]
    NoEntryPath,

    #[error("script controller has been shut down")]
    Terminated,
}

/// Human-readable message of a Lua error without the Rust-side wrapping.
pub(crate) fn describe(err: &mlua::Error) -> String {
    match err {
        mlua::Error::CallbackError { cause, .. } => describe(cause),
        mlua::Error::RuntimeError(message) => match message.split_once("\nstack traceback:") {
            Some((head, _)) => head.to_string(),
            None => message.clone(),
        },
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::ExternalError(source) => source.to_string(),
        other => other.to_string(),
    }
}
