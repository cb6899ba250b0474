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

use crate::collection::UpdateCollection;
use crate::commands::{configured_profile, read_document};
use crate::config::RolloutConfig;
use crate::error::Result;
use crate::models::{ClientProfile, UpdateCandidate, UpdateStyle, Version};
use colored::*;
use std::path::Path;

/// Overrides of the configured client profile.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub language: Option<String>,
    pub pro: bool,
    pub style: Option<UpdateStyle>,
    pub runtime: Option<String>,
}

pub struct SelectCommand<'a> {
    config: &'a RolloutConfig,
}

impl<'a> SelectCommand<'a> {
    pub fn new(config: &'a RolloutConfig) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn execute(
        &self,
        file: &Path,
        inflate: bool,
        client_version: &str,
        options: &SelectOptions,
    ) -> Result<()> {
        let profile = self.profile(client_version, options)?;
        let xml = read_document(file, inflate)?;
        let collection = UpdateCollection::parse(&xml, &profile)?;

        match select(&collection, &profile) {
            Some(candidate) => print_candidate(&candidate),
            None => println!(
                "{} No update for {} ({}, {})",
                "✗".red(),
                profile.version,
                profile.language,
                profile.style
            ),
        }
        Ok(())
    }

    fn profile(&self, client_version: &str, options: &SelectOptions) -> Result<ClientProfile> {
        let mut profile = configured_profile(self.config, client_version.parse::<Version>()?);
        if let Some(language) = &options.language {
            profile.language = language.clone();
        }
        profile.pro |= options.pro;
        if let Some(style) = options.style {
            profile.style = style;
        }
        profile.runtime_version = options
            .runtime
            .as_deref()
            .map(str::parse::<Version>)
            .transpose()?;
        Ok(profile)
    }
}

/// Selection as the coordinator performs it, with the style ceiling capped.
fn select(collection: &UpdateCollection, profile: &ClientProfile) -> Option<UpdateCandidate> {
    let capped = ClientProfile {
        style: profile.style.capped(),
        ..profile.clone()
    };
    collection.select_best(&capped).cloned()
}

fn print_candidate(candidate: &UpdateCandidate) {
    println!(
        "{} Update to {} ({})",
        "✓".green().bold(),
        candidate.for_version,
        candidate.style
    );
    if let Some(title) = &candidate.update_title {
        println!("  {}", title.bold());
    }
    println!("  {}", candidate.update_text);
    println!("  {} {}", "URL:".dimmed(), candidate.update_url);
    if let Some(file_name) = candidate.update_file_name() {
        println!("  {} {file_name}", "File:".dimmed());
    }
    if let Some(command) = &candidate.update_command {
        println!("  {} {command}", "Command:".dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DOCUMENT: &str = r#"<update id="5">
        <msg from="0.0.0" to="9.9.9" for="9.9.9" style="4" url="http://example.com/f">
            <lang id="en">Forced</lang>
        </msg>
        <msg from="0.0.0" to="9.9.9" for="9.9.9" style="1" url="http://example.com/u">
            <lang id="en">Please update</lang>
            <lang id="de">Bitte aktualisieren</lang>
        </msg>
    </update>"#;

    fn parse(profile: &ClientProfile) -> UpdateCollection {
        UpdateCollection::parse(DOCUMENT, profile).unwrap()
    }

    #[test]
    fn test_profile_overrides() {
        let config = RolloutConfig::default();
        let command = SelectCommand::new(&config).unwrap();
        let options = SelectOptions {
            language: Some("de".to_string()),
            pro: true,
            style: Some(UpdateStyle::Major),
            runtime: Some("1.6.0".to_string()),
        };

        let profile = command.profile("3.0.0", &options).unwrap();
        assert_eq!(profile.version, Version::new(3, 0, 0));
        assert_eq!(profile.language, "de");
        assert!(profile.pro);
        assert_eq!(profile.style, UpdateStyle::Major);
        assert_eq!(profile.runtime_version, Some(Version::new(1, 6, 0)));

        assert!(command.profile("3.0", &options).is_err());
    }

    #[test]
    fn test_select_prefers_language() {
        let config = RolloutConfig::default();
        let command = SelectCommand::new(&config).unwrap();
        let options = SelectOptions {
            language: Some("de".to_string()),
            ..Default::default()
        };
        let profile = command.profile("3.0.0", &options).unwrap();

        let best = select(&parse(&profile), &profile).unwrap();
        assert_eq!(best.update_text, "Bitte aktualisieren");
    }

    #[test]
    fn test_select_caps_style() {
        let config = RolloutConfig::default();
        let command = SelectCommand::new(&config).unwrap();
        let options = SelectOptions {
            style: Some(UpdateStyle::Force),
            ..Default::default()
        };
        let profile = command.profile("3.0.0", &options).unwrap();

        let best = select(&parse(&profile), &profile).unwrap();
        assert_eq!(best.update_text, "Please update");
    }

    #[test]
    fn test_execute_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("version.xml");
        fs::write(&path, DOCUMENT).unwrap();

        let config = RolloutConfig::default();
        let command = SelectCommand::new(&config).unwrap();
        let options = SelectOptions::default();
        assert!(command.execute(&path, false, "3.0.0", &options).is_ok());
        assert!(command.execute(&path, false, "10.0.0", &options).is_ok());
        assert!(command.execute(&path, true, "3.0.0", &options).is_err());
    }
}
