use crate::models::ClientProfile;
use urlencoding::encode;

/// Appends client metadata to a URL as query parameters.
///
/// Adds `lang`, `lv` (client version), `jv` (runtime version), `os` and `osv`.
pub fn decorate_url(url: &str, profile: &ClientProfile) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    let runtime = profile
        .runtime_version
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_default();

    format!(
        "{url}{separator}lang={}&lv={}&jv={}&os={}&osv={}",
        encode(&profile.language),
        encode(&profile.version.to_string()),
        encode(&runtime),
        encode(&profile.platform.name),
        encode(&profile.platform.version),
    )
}
