//! Name record synthesis for one `(weight, region)` font.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{NamingError, Result, compatibility_name};

/// Windows platform.
const PLATFORM_WINDOWS: u16 = 3;
/// Unicode BMP encoding.
const ENCODING_UNICODE_BMP: u16 = 1;

/// Locales a name table is written for, each with its Windows language ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en_US")]
    EnUs,
    #[serde(rename = "zh_CN")]
    ZhCn,
    #[serde(rename = "zh_TW")]
    ZhTw,
    #[serde(rename = "zh_HK")]
    ZhHk,
    #[serde(rename = "ja_JP")]
    JaJp,
    #[serde(rename = "ko_KR")]
    KoKr,
}

impl Locale {
    pub const ALL: [Locale; 6] = [
        Locale::EnUs,
        Locale::ZhCn,
        Locale::ZhTw,
        Locale::ZhHk,
        Locale::JaJp,
        Locale::KoKr,
    ];

    pub fn language_id(self) -> u16 {
        match self {
            Locale::EnUs => 1033,
            Locale::ZhCn => 2052,
            Locale::ZhTw => 1028,
            Locale::ZhHk => 3076,
            Locale::JaJp => 1041,
            Locale::KoKr => 1042,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Locale::EnUs => "en_US",
            Locale::ZhCn => "zh_CN",
            Locale::ZhTw => "zh_TW",
            Locale::ZhHk => "zh_HK",
            Locale::JaJp => "ja_JP",
            Locale::KoKr => "ko_KR",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Name IDs written by the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum NameId {
    Copyright = 0,
    LegacyFamily = 1,
    LegacySubfamily = 2,
    UniqueFontId = 3,
    FullFontName = 4,
    VersionString = 5,
    PostscriptName = 6,
    Trademark = 7,
    Manufacturer = 8,
    Designer = 9,
    PreferredFamily = 16,
    PreferredSubfamily = 17,
}

impl NameId {
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: NameId,
    pub value: String,
}

impl NameRecord {
    fn windows(locale: Locale, name_id: NameId, value: impl Into<String>) -> Self {
        Self {
            platform_id: PLATFORM_WINDOWS,
            encoding_id: ENCODING_UNICODE_BMP,
            language_id: locale.language_id(),
            name_id,
            value: value.into(),
        }
    }

    /// Canonical ordering key of the name table.
    pub fn sort_key(&self) -> (u16, u16, u16, u16) {
        (self.platform_id, self.encoding_id, self.language_id, self.name_id.to_u16())
    }
}

/// Localized naming strings from the build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Naming {
    pub family_name: BTreeMap<Locale, String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub trademark: Option<String>,
    #[serde(default)]
    pub designer: Option<String>,
}

impl Naming {
    pub fn family_prefix(&self, locale: Locale) -> Result<&str> {
        self.family_name
            .get(&locale)
            .map(String::as_str)
            .ok_or(NamingError::MissingLocale(locale))
    }

    /// Locales without a configured family name.
    pub fn missing_locales(&self) -> Vec<Locale> {
        Locale::ALL.into_iter().filter(|l| !self.family_name.contains_key(l)).collect()
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Build the name records of one font.
///
/// `prefix` is the file-name prefix (e.g. `SourceHanSans`) used for the
/// PostScript name; the localized family prefixes come from `naming`.
/// Records are returned in canonical `(platform, encoding, language, name)`
/// order. The sort is stable, so generation order breaks any tie.
pub fn build_name_records(
    prefix: &str,
    naming: &Naming,
    style: &str,
    region: &str,
) -> Result<Vec<NameRecord>> {
    let mut records = Vec::new();

    for locale in Locale::ALL {
        let family = format!("{} {region}", naming.family_prefix(locale)?).trim().to_string();
        push_family_records(&mut records, locale, &family, style);

        if locale == Locale::EnUs {
            if let Some(copyright) = present(&naming.copyright) {
                records.push(NameRecord::windows(locale, NameId::Copyright, copyright));
            }
            if let Some(version) = present(&naming.version) {
                records.push(NameRecord::windows(locale, NameId::VersionString, version));
            }
            // Manufacturer is written from the copyright string, empty when absent.
            if present(&naming.manufacturer).is_some() {
                let value = naming.copyright.clone().unwrap_or_default();
                records.push(NameRecord::windows(locale, NameId::Manufacturer, value));
            }
            if let Some(trademark) = present(&naming.trademark) {
                records.push(NameRecord::windows(locale, NameId::Trademark, trademark));
            }
            if let Some(designer) = present(&naming.designer) {
                records.push(NameRecord::windows(locale, NameId::Designer, designer));
            }
            records.push(NameRecord::windows(
                locale,
                NameId::PostscriptName,
                format!("{prefix}{region}-{style}"),
            ));
        }
    }

    records.sort_by_key(NameRecord::sort_key);
    Ok(records)
}

fn push_family_records(records: &mut Vec<NameRecord>, locale: Locale, family: &str, style: &str) {
    records.push(NameRecord::windows(locale, NameId::PreferredFamily, family));
    records.push(NameRecord::windows(locale, NameId::PreferredSubfamily, style));

    let compat = compatibility_name(family, style);
    let subfamily = compat.subfamily(style);
    records.push(NameRecord::windows(locale, NameId::LegacyFamily, compat.family.as_str()));
    records.push(NameRecord::windows(locale, NameId::LegacySubfamily, subfamily));
    records.push(NameRecord::windows(locale, NameId::FullFontName, compat.full_name(subfamily)));
    records.push(NameRecord::windows(locale, NameId::UniqueFontId, format!("{family} {style}")));
}
