use super::*;
use crate::models::{ContentId, Platform, UpdateStyle};

fn profile(version: &str, language: &str) -> ClientProfile {
    ClientProfile {
        version: version.parse().unwrap(),
        language: language.to_string(),
        pro: false,
        style: UpdateStyle::Major,
        runtime_version: Some("1.6.0".parse().unwrap()),
        platform: Platform::new("Linux", "6.1"),
    }
}

fn parse(xml: &str) -> UpdateCollection {
    UpdateCollection::parse(xml, &profile("3.0.0", "en")).unwrap()
}

const MULTI_LANGUAGE: &str = r#"<update id="42" timestamp="1150000000000">
    <msg from="0.0.0" to="9.9.9" for="4.0.0" url="http://example.com/update" style="1">
        <lang id="fr" button1="Oui" button2="Non">Nouvelle version</lang>
        <lang id="en" title="New version">A new version is available</lang>
    </msg>
    <msg from="0.0.0" to="9.9.9" for="4.0.0" url="http://example.com/update" style="1">
        <lang id="de">Neue Version</lang>
        <lang id="en">Second english entry</lang>
    </msg>
</update>"#;

#[test]
fn test_parse_root_attributes() {
    let collection = parse(MULTI_LANGUAGE);
    assert_eq!(collection.id(), 42);
    assert_eq!(collection.timestamp(), 1_150_000_000_000);
    assert!(!collection.is_ignore());
    assert_eq!(collection.candidates().len(), 4);
    assert!(collection.downloadable().is_empty());
}

#[test]
fn test_language_variants_share_applicability() {
    let collection = parse(MULTI_LANGUAGE);
    let fr = &collection.candidates()[0];
    let en = &collection.candidates()[1];

    assert_eq!(fr.language, "fr");
    assert_eq!(fr.update_text, "Nouvelle version");
    assert_eq!(fr.button1_text.as_deref(), Some("Oui"));
    assert_eq!(fr.update_title, None);

    assert_eq!(en.language, "en");
    assert_eq!(en.update_title.as_deref(), Some("New version"));
    assert_eq!(en.button1_text, None);
    assert_eq!(en.from_version, fr.from_version);
    assert_eq!(en.to_version, fr.to_version);
    assert_eq!(en.update_url, fr.update_url);
}

#[test]
fn test_exact_language_wins_even_when_last() {
    let collection = parse(MULTI_LANGUAGE);
    let best = collection.select_best(&profile("3.0.0", "de")).unwrap();
    assert_eq!(best.language, "de");
    assert_eq!(best.update_text, "Neue Version");
}

#[test]
fn test_english_fallback_is_first_english_match() {
    let collection = parse(MULTI_LANGUAGE);
    let best = collection.select_best(&profile("3.0.0", "es")).unwrap();
    assert_eq!(best.language, "en");
    assert_eq!(best.update_text, "A new version is available");
}

#[test]
fn test_no_selection_when_nothing_applies() {
    let collection = parse(MULTI_LANGUAGE);
    assert!(collection.select_best(&profile("10.0.0", "en")).is_none());

    let xml = r#"<update id="1">
        <msg for="4.0.0" url="http://example.com" style="1"><lang id="fr">Texte</lang></msg>
    </update>"#;
    assert!(parse(xml).select_best(&profile("3.0.0", "es")).is_none());
}

#[test]
fn test_defaults_for_from_and_to() {
    let xml = r#"<update id="7">
        <msg for="4.12.0" url="http://example.com" style="2"><lang id="en">Text</lang></msg>
    </update>"#;
    let collection = parse(xml);
    let candidate = &collection.candidates()[0];
    assert_eq!(candidate.from_version, "0.0.0".parse().unwrap());
    assert_eq!(candidate.to_version, "4.12.0".parse().unwrap());
    assert_eq!(candidate.style, UpdateStyle::Major);
    assert!(candidate.pro && candidate.free);
    assert_eq!(collection.timestamp(), 0);
}

#[test]
fn test_pro_free_flags_follow_presence() {
    let xml = r#"<update id="7">
        <msg for="4.0.0" url="http://example.com" style="1" pro="false"><lang id="en">Pro</lang></msg>
        <msg for="4.0.0" url="http://example.com" style="1" free=""><lang id="en">Free</lang></msg>
    </update>"#;
    let collection = parse(xml);
    let pro = &collection.candidates()[0];
    let free = &collection.candidates()[1];
    assert!(pro.pro && !pro.free);
    assert!(!free.pro && free.free);

    let best = collection.select_best(&profile("3.0.0", "en")).unwrap();
    assert_eq!(best.update_text, "Free");
}

#[test]
fn test_invalid_blocks_are_skipped() {
    let xml = r#"<update id="3">
        <msg url="http://example.com" style="1"><lang id="en">No for</lang></msg>
        <msg for="4.0.0" style="1"><lang id="en">No url</lang></msg>
        <msg for="4.0.0" url="http://example.com"><lang id="en">No style</lang></msg>
        <msg for="4.0.0" url="http://example.com" style="9"><lang id="en">Bad style</lang></msg>
        <msg for="four" url="http://example.com" style="1"><lang id="en">Bad version</lang></msg>
        <msg for="4.0.0" url="http://example.com" style="1" javafrom="x"><lang id="en">Bad runtime</lang></msg>
        <msg for="4.0.0" url="http://example.com" style="1"><lang id="en">Valid</lang></msg>
    </update>"#;
    let collection = parse(xml);
    assert_eq!(collection.candidates().len(), 1);
    assert_eq!(collection.candidates()[0].update_text, "Valid");
}

#[test]
fn test_invalid_lang_items_are_skipped() {
    let xml = r#"<update id="3">
        <msg for="4.0.0" url="http://example.com" style="1">
            <lang id="">No id</lang>
            <lang id="fr"></lang>
            <lang id="de"/>
            <lang id="en"><![CDATA[Text with <markup>]]></lang>
        </msg>
    </update>"#;
    let collection = parse(xml);
    assert_eq!(collection.candidates().len(), 1);
    assert_eq!(collection.candidates()[0].update_text, "Text with <markup>");
}

#[test]
fn test_downloadable_but_inapplicable_block() {
    let xml = r#"<update id="9">
        <msg url="http://example.com" style="1"
             urn="urn:sha1:PLSTHIPQGSSZTS5FJUPAKUZWUGYQYPFB" uname="setup.exe" size="1024"
             ucommand="$% /S" ttroot="ROOTHASH">
            <lang id="en">Never shown</lang>
        </msg>
    </update>"#;
    let collection = parse(xml);
    assert!(collection.candidates().is_empty());
    assert_eq!(collection.downloadable().len(), 1);

    let descriptor = &collection.downloadable()[0];
    assert_eq!(
        descriptor.content_id,
        "urn:sha1:plsthipqgsszts5fjupakuzwugyqypfb".parse::<ContentId>().unwrap()
    );
    assert_eq!(descriptor.file_name, "setup.exe");
    assert_eq!(descriptor.size, 1024);
    assert_eq!(descriptor.root_hash.as_deref(), Some("ROOTHASH"));
}

#[test]
fn test_partial_download_attributes_are_ignored() {
    let xml = r#"<update id="9">
        <msg for="4.0.0" url="http://example.com" style="1" urn="urn:sha1:AAAA" size="1024">
            <lang id="en">No name</lang>
        </msg>
        <msg for="4.0.0" url="http://example.com" style="1" urn="urn:sha1:BBBB" uname="a.exe" size="0">
            <lang id="en">Zero size</lang>
        </msg>
        <msg for="4.0.0" url="http://example.com" style="1" urn="garbage" uname="a.exe" size="5">
            <lang id="en">Bad urn</lang>
        </msg>
    </update>"#;
    let collection = parse(xml);
    assert!(collection.downloadable().is_empty());
    assert!(collection.candidates().iter().all(|c| !c.is_downloadable()));
}

#[test]
fn test_downloadable_candidate_and_dedup() {
    let xml = r#"<update id="9">
        <msg for="4.0.0" url="http://example.com" style="1"
             urn="urn:sha1:AAAA" uname="setup.exe" size="10" ucommand="$%">
            <lang id="en">English</lang>
            <lang id="fr">Francais</lang>
        </msg>
        <msg for="5.0.0" from="4.0.0" url="http://example.com" style="1"
             urn="urn:sha1:AAAA" uname="setup.exe" size="10"/>
    </update>"#;
    let collection = parse(xml);
    assert_eq!(collection.downloadable().len(), 1);
    assert!(collection.candidates().iter().all(|c| c.is_downloadable()));
    assert_eq!(
        collection.candidates()[0].update_command.as_deref(),
        Some("$%")
    );
}

#[test]
fn test_url_is_decorated() {
    let collection = parse(MULTI_LANGUAGE);
    let url = &collection.candidates()[0].update_url;
    assert!(url.starts_with("http://example.com/update?lang=en&lv=3.0.0&jv=1.6.0&os=Linux"));
}

#[test]
fn test_ignore_sentinel() {
    let xml = format!(r#"<update id="{IGNORE_ID}"/>"#);
    let collection = parse(&xml);
    assert!(collection.is_ignore());
    assert!(collection.candidates().is_empty());
}

#[test]
fn test_rejects_bad_documents() {
    let p = profile("3.0.0", "en");
    assert!(UpdateCollection::parse("", &p).is_err());
    assert!(UpdateCollection::parse("<other id=\"1\"/>", &p).is_err());
    assert!(UpdateCollection::parse("<update/>", &p).is_err());
    assert!(UpdateCollection::parse("<update id=\"abc\"/>", &p).is_err());
    assert!(UpdateCollection::parse("<update id=\"1\"><msg></update>", &p).is_err());
}

#[test]
fn test_end_to_end_selection() {
    let xml = r#"<update id="5">
        <msg from="0.0.0" to="9.9.9" for="9.9.9" style="1" url="http://example.com/u">
            <lang id="en">Please update</lang>
        </msg>
    </update>"#;
    let collection = parse(xml);
    let best = collection.select_best(&profile("3.0.0", "en")).unwrap();
    assert_eq!(best.update_text, "Please update");
    assert!(!best.is_downloadable());
}
