// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Category of a fatal error, inspected at the binary boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Malformed command line, detected before any network call.
    Syntax,
    /// Alias or local configuration could not be resolved.
    Config,
    /// The admin endpoint could not be reached or answered unexpectedly.
    Transport,
    /// The server reported that the heal sequence itself failed.
    Sequence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Config => "config",
            ErrorKind::Transport => "transport",
            ErrorKind::Sequence => "sequence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal error carrying an ordered trace of context strings.
#[derive(Clone, Debug, Error, Serialize)]
#[error("{message}")]
pub struct HealError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(rename = "trace", skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

pub type Result<T, E = HealError> = std::result::Result<T, E>;

impl HealError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn sequence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Sequence, message)
    }

    /// Appends context entries, outermost last.
    pub fn trace<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Every fatal kind maps to exit status 1.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
