use crate::{Plugin, PluginApi, callback};
use chrono::{DateTime, Local, Locale, TimeZone};
use std::fmt::Display;
use tracing::debug;

/// Inserts the current date and time, formatted for the editor locale, at the caret.
pub struct DatePlugin;

impl Plugin for DatePlugin {
    fn name(&self) -> &'static str {
        "Date Plug-in"
    }

    fn start(&self, api: &mut dyn PluginApi) -> anyhow::Result<()> {
        api.add_button(
            "Date",
            callback(|api, _| {
                let stamp = format_stamp(&Local::now(), api.locale());
                insert_at_caret(api, &stamp);
                Ok(())
            }),
        );
        api.display_in_list_view(self.name());
        Ok(())
    }
}

/// Map a BCP-47 tag (`en-US`, `fr_FR`, `de`) onto a chrono locale.
/// Unrecognised tags fall back to POSIX formatting.
pub fn locale_for(tag: &str) -> Locale {
    let tag = tag.replace('-', "_");
    let mut parts = tag.split('_');
    let lang = parts.next().unwrap_or_default().to_ascii_lowercase();
    let region = parts.next().map(str::to_ascii_uppercase);
    match (lang.as_str(), region.as_deref()) {
        ("en", Some("GB")) => Locale::en_GB,
        ("en", Some("AU")) => Locale::en_AU,
        ("en", Some("CA")) => Locale::en_CA,
        ("en", _) => Locale::en_US,
        ("fr", Some("CA")) => Locale::fr_CA,
        ("fr", _) => Locale::fr_FR,
        ("de", Some("AT")) => Locale::de_AT,
        ("de", Some("CH")) => Locale::de_CH,
        ("de", _) => Locale::de_DE,
        ("es", Some("MX")) => Locale::es_MX,
        ("es", _) => Locale::es_ES,
        ("it", _) => Locale::it_IT,
        ("nl", _) => Locale::nl_NL,
        ("pt", Some("BR")) => Locale::pt_BR,
        ("pt", _) => Locale::pt_PT,
        ("sv", _) => Locale::sv_SE,
        ("pl", _) => Locale::pl_PL,
        ("ru", _) => Locale::ru_RU,
        ("ja", _) => Locale::ja_JP,
        ("ko", _) => Locale::ko_KR,
        ("zh", Some("TW")) => Locale::zh_TW,
        ("zh", _) => Locale::zh_CN,
        _ => Locale::POSIX,
    }
}

/// Localized medium date followed by the localized time.
pub fn format_stamp<Tz>(at: &DateTime<Tz>, tag: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format_localized("%x %X", locale_for(tag)).to_string()
}

/// Insert `stamp` at the caret and leave the caret where it was.
fn insert_at_caret(api: &mut dyn PluginApi, stamp: &str) {
    let caret = api.caret_position();
    let mut text = api.text();
    let byte = text
        .char_indices()
        .nth(caret)
        .map_or(text.len(), |(b, _)| b);
    text.insert_str(byte, stamp);
    debug!(target: "plugin.host", caret, stamp_len = stamp.chars().count(), "date_inserted");
    api.set_text(&text);
    api.set_caret_position(caret);
}
