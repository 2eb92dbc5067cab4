//! Ambient device and app metadata sent with every config request.
//!
//! Captured once per launch so values cannot drift mid-sequence.

use crate::settings::LaunchSettings;

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub bundle_id: String,
    pub store_id: String,
    pub os_name: String,
    pub locale: String,
}

impl DeviceProfile {
    pub fn new(bundle_id: impl Into<String>, settings: &LaunchSettings) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            store_id: settings.store_id.clone(),
            os_name: settings.os_name.clone(),
            locale: detect_locale(),
        }
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale_language(locale);
        self
    }
}

/// Language code of the process locale, read from the POSIX locale variables
pub fn detect_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .map(|value| locale_language(&value))
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}

/// Reduce a locale tag (`en_US.UTF-8`, `pt-BR`, `de@euro`) to its language code
pub fn locale_language(tag: &str) -> String {
    let language = tag
        .trim()
        .split(|c: char| matches!(c, '_' | '-' | '.' | '@'))
        .next()
        .unwrap_or_default();

    if language.is_empty() || language == "C" || language == "POSIX" {
        DEFAULT_LOCALE.to_string()
    } else {
        language.to_lowercase()
    }
}
