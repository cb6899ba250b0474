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

/// Shared update documents for integration tests
use std::fs;
use std::path::{Path, PathBuf};

/// A document with one English entry for clients from 0.0.0 up to 9.9.9.
#[allow(dead_code)]
pub fn plain_document(id: i32, timestamp: i64) -> String {
    format!(
        r#"<update id="{id}" timestamp="{timestamp}">
    <msg from="0.0.0" to="9.9.9" for="9.9.9" style="1" url="http://example.com/update">
        <lang id="en" title="Update {id}">Please update</lang>
        <lang id="de">Bitte aktualisieren</lang>
    </msg>
</update>"#
    )
}

/// A document whose entry carries a downloadable installer.
#[allow(dead_code)]
pub fn download_document(id: i32, timestamp: i64, urn: &str, file_name: &str) -> String {
    format!(
        r#"<update id="{id}" timestamp="{timestamp}">
    <msg from="0.0.0" to="9.9.9" for="9.9.9" style="1" url="http://example.com/update"
         urn="{urn}" uname="{file_name}" size="1024" ucommand="$%">
        <lang id="en">Installer ready</lang>
    </msg>
</update>"#
    )
}

/// Writes `contents` to `dir/name` and returns the path.
#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[allow(dead_code)]
pub fn compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
