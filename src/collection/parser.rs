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
use crate::collection::url::decorate_url;
use crate::error::{Result, RolloutError};
use crate::models::{
    ClientProfile, ContentId, DownloadDescriptor, OsList, UpdateCandidate, UpdateStyle, Version,
};
use log::{debug, trace, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

type Attributes = HashMap<String, String>;

/// A `lang` element being read.
struct LangItem {
    attrs: Attributes,
    text: String,
}

/// Parses a verified, decompressed update document.
///
/// Only a missing or malformed root rejects the whole document. A bad `msg`
/// or `lang` element is logged and skipped.
pub fn parse_collection(xml: &str, profile: &ClientProfile) -> Result<UpdateCollection> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut root: Option<(i32, i64)> = None;
    let mut candidates = Vec::new();
    let mut downloadable: Vec<DownloadDescriptor> = Vec::new();

    // Template of the enclosing `msg`; None when the block is invalid.
    let mut block: Option<Option<UpdateCandidate>> = None;
    let mut lang: Option<LangItem> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if root.is_none() => {
                root = Some(parse_root(e)?);
            }
            Event::Start(ref e) => match e.name().as_ref() {
                b"msg" => {
                    block = Some(parse_msg(&attributes(e), profile, &mut downloadable));
                }
                b"lang" if block.is_some() => {
                    lang = Some(LangItem {
                        attrs: attributes(e),
                        text: String::new(),
                    });
                }
                _ => {}
            },
            Event::Empty(ref e) => match e.name().as_ref() {
                b"msg" => {
                    parse_msg(&attributes(e), profile, &mut downloadable);
                }
                b"lang" => debug!("Skipping language entry without text"),
                _ => {}
            },
            Event::Text(ref e) => {
                if let Some(item) = lang.as_mut() {
                    item.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(item) = lang.as_mut() {
                    item.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"lang" => {
                    if let (Some(item), Some(Some(template))) = (lang.take(), block.as_ref()) {
                        if let Some(candidate) = localize(template, item) {
                            candidates.push(candidate);
                        }
                    }
                }
                b"msg" => block = None,
                b"update" => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let Some((id, timestamp)) = root else {
        return Err(RolloutError::InvalidDocument(
            "Document has no root element".to_string(),
        ));
    };

    debug!(
        "Parsed update collection {id}: {} candidates, {} downloadable",
        candidates.len(),
        downloadable.len()
    );

    Ok(UpdateCollection {
        id,
        timestamp,
        candidates,
        downloadable,
    })
}

fn parse_root(e: &BytesStart) -> Result<(i32, i64)> {
    if e.name().as_ref() != b"update" {
        return Err(RolloutError::InvalidDocument(format!(
            "Unexpected root element <{}>",
            String::from_utf8_lossy(e.name().as_ref())
        )));
    }

    let attrs = attributes(e);
    let id = attrs
        .get("id")
        .and_then(|id| id.trim().parse::<i32>().ok())
        .ok_or_else(|| RolloutError::InvalidDocument("Missing or invalid update id".to_string()))?;
    let timestamp = attrs
        .get("timestamp")
        .and_then(|ts| ts.trim().parse::<i64>().ok())
        .unwrap_or(0);

    Ok((id, timestamp))
}

fn attributes(e: &BytesStart) -> Attributes {
    e.attributes()
        .filter_map(|a| a.ok())
        .filter_map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
            let value = a.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect()
}

fn non_empty<'a>(attrs: &'a Attributes, name: &str) -> Option<&'a str> {
    attrs
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn required<'a>(attrs: &'a Attributes, name: &str) -> Result<&'a str> {
    non_empty(attrs, name)
        .ok_or_else(|| RolloutError::InvalidDocument(format!("Missing required attribute `{name}`")))
}

/// Registers the block's download resource, then validates the rest.
fn parse_msg(
    attrs: &Attributes,
    profile: &ClientProfile,
    downloadable: &mut Vec<DownloadDescriptor>,
) -> Option<UpdateCandidate> {
    let download = download_descriptor(attrs);
    if let Some(descriptor) = &download {
        if !downloadable
            .iter()
            .any(|d| d.content_id == descriptor.content_id)
        {
            trace!("Registered downloadable resource {}", descriptor.content_id);
            downloadable.push(descriptor.clone());
        }
    }

    match block_template(attrs, download, profile) {
        Ok(template) => Some(template),
        Err(e) => {
            warn!("Skipping update block: {e}");
            None
        }
    }
}

fn download_descriptor(attrs: &Attributes) -> Option<DownloadDescriptor> {
    let urn = non_empty(attrs, "urn")?;
    let name = non_empty(attrs, "uname")?;
    let size = non_empty(attrs, "size")?.parse::<u64>().ok()?;

    let content_id = match urn.parse::<ContentId>() {
        Ok(id) => id,
        Err(e) => {
            debug!("Ignoring download resource: {e}");
            return None;
        }
    };

    DownloadDescriptor::new(content_id, name, size)
        .map(|d| d.with_root_hash(attrs.get("ttroot").cloned()))
}

fn block_template(
    attrs: &Attributes,
    download: Option<DownloadDescriptor>,
    profile: &ClientProfile,
) -> Result<UpdateCandidate> {
    let for_version = required(attrs, "for")?.parse::<Version>()?;
    let from_version = match non_empty(attrs, "from") {
        Some(from) => from.parse::<Version>()?,
        None => Version::zero(),
    };
    let to_version = match non_empty(attrs, "to") {
        Some(to) => to.parse::<Version>()?,
        None => for_version.clone(),
    };
    let url = required(attrs, "url")?;
    let style_attr = required(attrs, "style")?;
    let style = style_attr
        .parse::<i64>()
        .ok()
        .and_then(UpdateStyle::from_level)
        .ok_or_else(|| RolloutError::InvalidDocument(format!("Invalid style `{style_attr}`")))?;

    let runtime_from = non_empty(attrs, "javafrom")
        .map(str::parse::<Version>)
        .transpose()?;
    let runtime_to = non_empty(attrs, "javato")
        .map(str::parse::<Version>)
        .transpose()?;

    let (pro, free) = match (attrs.contains_key("pro"), attrs.contains_key("free")) {
        (false, false) => (true, true),
        flags => flags,
    };

    let os_list = non_empty(attrs, "os")
        .and_then(|os| os.parse::<OsList>().ok())
        .unwrap_or_default();

    Ok(UpdateCandidate {
        from_version,
        to_version,
        for_version,
        runtime_from,
        runtime_to,
        os_list,
        pro,
        free,
        style,
        language: String::new(),
        update_text: String::new(),
        update_title: None,
        button1_text: None,
        button2_text: None,
        update_url: decorate_url(url, profile),
        update_command: non_empty(attrs, "ucommand").map(str::to_string),
        download,
    })
}

fn localize(template: &UpdateCandidate, item: LangItem) -> Option<UpdateCandidate> {
    let Some(language) = non_empty(&item.attrs, "id") else {
        debug!("Skipping language entry without id");
        return None;
    };
    let text = item.text.trim();
    if text.is_empty() {
        debug!("Skipping language entry {language} without text");
        return None;
    }

    let optional = |name: &str| non_empty(&item.attrs, name).map(str::to_string);
    Some(UpdateCandidate {
        language: language.to_string(),
        update_text: text.to_string(),
        update_title: optional("title"),
        button1_text: optional("button1"),
        button2_text: optional("button2"),
        ..template.clone()
    })
}
