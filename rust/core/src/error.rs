// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or reading the tape
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("Unknown express id: #{0}")]
    UnknownExpressId(u32),

    #[error("Unexpected token at tape offset {position}: expected {expected}, got {got}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        got: String,
    },

    #[error("Argument index {index} out of range for #{express_id}")]
    ArgumentOutOfRange { express_id: u32, index: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            position,
            message: message.into(),
        }
    }

    pub fn unexpected(position: usize, expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            position,
            expected: expected.into(),
            got: got.into(),
        }
    }
}
