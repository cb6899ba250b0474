// Copyright 2025 dentsusoken
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

use crate::error::RolloutError;
use std::fmt;

pub struct ErrorContext<'a> {
    pub error: &'a RolloutError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(error: &'a RolloutError) -> Self {
        let (suggestion, details) = match error {
            RolloutError::InvalidVersionFormat(msg) => {
                let suggestion = Some(
                    "Version format should be: 'major.minor.service' with an optional revision \
                     (e.g., '5.2.8' or '1.6.0_10')."
                        .to_string(),
                );
                let details = Some(format!("Invalid format: {msg}"));
                (suggestion, details)
            }
            RolloutError::VerificationFailed(msg) => {
                let suggestion = Some(
                    "The document was not produced with the release key, or it was corrupted in \
                     transit. Fetch a fresh copy."
                        .to_string(),
                );
                (suggestion, Some(msg.clone()))
            }
            RolloutError::InvalidDocument(msg) => {
                let suggestion = Some(
                    "The root element must be <update id=\"...\"> with <msg> children. Pass \
                     --inflate if the file is zlib-compressed."
                        .to_string(),
                );
                (suggestion, Some(format!("Parse failure: {msg}")))
            }
            RolloutError::FailoverFetch(msg) => {
                let suggestion = Some(
                    "Check your internet connection and proxy settings, then retry.".to_string(),
                );
                (suggestion, Some(msg.clone()))
            }
            RolloutError::HttpStatus(status) => {
                let suggestion = Some(
                    "The failover server rejected the request. Another mirror is picked on the \
                     next attempt."
                        .to_string(),
                );
                (suggestion, Some(format!("Server answered with status {status}")))
            }
            RolloutError::ConfigError(msg) | RolloutError::InvalidConfig(msg) => {
                let config_path = if cfg!(windows) {
                    "%USERPROFILE%\\.rollout\\config.toml"
                } else {
                    "~/.rollout/config.toml"
                };
                let suggestion = Some(format!(
                    "Check {config_path} or the ROLLOUT_* environment variables."
                ));
                (suggestion, Some(msg.clone()))
            }
            RolloutError::CoordinatorStopped => (
                Some("The coordinator was shut down before the request was queued.".to_string()),
                None,
            ),
            RolloutError::Io(io_err) => {
                let suggestion = match io_err.kind() {
                    std::io::ErrorKind::NotFound => {
                        Some("Check that the file or directory exists.".to_string())
                    }
                    std::io::ErrorKind::PermissionDenied => {
                        Some("Check the permissions of the rollout home directory.".to_string())
                    }
                    _ => None,
                };
                (suggestion, Some(io_err.to_string()))
            }
            RolloutError::Http(_) => (
                Some("Check your internet connection and proxy settings.".to_string()),
                None,
            ),
            _ => (None, None),
        };

        Self {
            error,
            suggestion,
            details,
        }
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\n\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSolution: {suggestion}")?;
        }

        Ok(())
    }
}
