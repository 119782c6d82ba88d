//! Input and output delivery contracts for stage processes.

use crate::marker::MarkerPair;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How a stage receives its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InputContract {
    /// The stage takes no input.
    None,
    /// Input files were materialized at documented paths before the
    /// invocation (materialization is the caller's job, not the core's).
    FilePaths {
        /// The documented input locations.
        paths: Vec<PathBuf>,
    },
    /// A single JSON document is written to the process's stdin and the
    /// channel is then closed.
    StdinJson,
}

impl InputContract {
    /// Convenience constructor for the file-paths mode.
    #[must_use]
    pub fn file_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self::FilePaths {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for InputContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::FilePaths { .. } => write!(f, "file-paths"),
            Self::StdinJson => write!(f, "stdin-json"),
        }
    }
}

/// How a stage delivers its output.
///
/// The marker pair exists exactly when the contract is
/// marker-delimited, so a spec cannot declare marker output without
/// naming its sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputContract {
    /// The stage writes files to documented paths.
    FilePaths {
        /// The documented output locations.
        paths: Vec<PathBuf>,
    },
    /// The stage prints one marker-wrapped JSON document on stdout.
    MarkerStdoutJson {
        /// The sentinel pair framing the payload.
        marker: MarkerPair,
    },
}

impl OutputContract {
    /// Convenience constructor for the file-paths mode.
    #[must_use]
    pub fn file_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self::FilePaths {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Convenience constructor for the conventional `<TOKEN>_START` /
    /// `<TOKEN>_END` marker mode.
    #[must_use]
    pub fn marker_token(token: &str) -> Self {
        Self::MarkerStdoutJson {
            marker: MarkerPair::for_token(token),
        }
    }
}

impl fmt::Display for OutputContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilePaths { .. } => write!(f, "file-paths"),
            Self::MarkerStdoutJson { .. } => write!(f, "marker-delimited-stdout-json"),
        }
    }
}
