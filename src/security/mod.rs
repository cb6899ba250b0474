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

use crate::error::{Result, RolloutError};
use digest::Digest;
use flate2::read::ZlibDecoder;
use sha1::Sha1;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// Upper bound on an inflated update document.
pub const MAX_INFLATED_SIZE: u64 = 4 * 1024 * 1024;

/// Checks the signature of a raw update document.
///
/// Returns the signed XML text, or `None` when the bytes are not a valid
/// signed document.
pub trait MessageVerifier: Send + Sync {
    fn verify(&self, data: &[u8]) -> Option<String>;
}

/// Accepts any UTF-8 text that looks like XML. Only for documents from a
/// trusted location, such as files inspected by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsignedVerifier;

impl MessageVerifier for UnsignedVerifier {
    fn verify(&self, data: &[u8]) -> Option<String> {
        let text = std::str::from_utf8(data).ok()?;
        let trimmed = text.trim_start_matches('\u{feff}').trim();
        if trimmed.starts_with('<') {
            Some(trimmed.to_string())
        } else {
            None
        }
    }
}

/// Decompresses a zlib stream as sent by failover servers.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data).take(MAX_INFLATED_SIZE + 1);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| RolloutError::VerificationFailed(format!("Cannot inflate document: {e}")))?;

    if inflated.len() as u64 > MAX_INFLATED_SIZE {
        return Err(RolloutError::VerificationFailed(format!(
            "Inflated document exceeds {MAX_INFLATED_SIZE} bytes"
        )));
    }
    Ok(inflated)
}

/// SHA-1 of a file as lowercase hex.
pub fn calculate_sha1(file_path: &Path) -> Result<String> {
    let mut file = File::open(file_path)?;
    let mut buffer = vec![0; CHUNK_SIZE];
    let mut hasher = Sha1::new();

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Whether `path` lies inside `root` once both are resolved.
pub fn is_within(root: &Path, path: &Path) -> bool {
    match (root.canonicalize(), path.canonicalize()) {
        (Ok(root), Ok(path)) => path.starts_with(root),
        _ => false,
    }
}
