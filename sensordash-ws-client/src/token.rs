//! Where the bearer token sent on every open comes from.
//!
//! The token is looked up again on each (re)connect, so a source backed by a
//! file or the environment picks up refreshed credentials without restarting
//! the connection manager.

use std::path::PathBuf;

/// Supplies the token for the `{"token": ...}` frame sent on open.
///
/// `None` is sent as `null`; rejecting it is up to the server.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl TokenSource for Option<String> {
    fn token(&self) -> Option<String> {
        self.clone()
    }
}

impl TokenSource for String {
    fn token(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl<F> TokenSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Reads the token from an environment variable at every open.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenSource for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|t| !t.is_empty())
    }
}

/// Reads the token from a file at every open. A missing or empty file means
/// no token.
#[derive(Debug, Clone)]
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenSource for FileToken {
    fn token(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Token file {} unreadable: {}", self.path.display(), _e);
                None
            }
        }
    }
}
