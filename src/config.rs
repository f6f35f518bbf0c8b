//! Invocation configuration
//!
//! Settings for a render can be loaded from a TOML file:
//!
//! ```toml
//! locale = "de-DE"
//!
//! [parameters]
//! name = "World"
//! items = ["a", "b"]
//! ```

use std::fmt::Write;
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::value::Value;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors from a `format=` option that is not a date format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateFormatError {
    #[error("invalid date format '{0}'")]
    InvalidPattern(String),
}

/// Languages that write decimals with a comma
const COMMA_DECIMAL_LANGUAGES: &[&str] = &[
    "bg", "ca", "cs", "da", "de", "el", "es", "et", "fi", "fr", "hr", "hu", "id", "it", "lt",
    "lv", "nb", "nl", "nn", "no", "pl", "pt", "ro", "ru", "sk", "sl", "sr", "sv", "tr", "uk",
    "vi",
];

/// Languages that write numeric dates as day.month.year
const DOT_DATE_LANGUAGES: &[&str] = &[
    "cs", "da", "de", "et", "fi", "hr", "nb", "nn", "no", "pl", "ro", "ru", "sk", "sl", "sr",
    "tr", "uk",
];

/// Length of a named date or time style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLength {
    Short,
    Medium,
    Long,
    Full,
}

impl DateLength {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "short" => Some(DateLength::Short),
            "medium" => Some(DateLength::Medium),
            "long" => Some(DateLength::Long),
            "full" => Some(DateLength::Full),
            _ => None,
        }
    }
}

/// How a date value is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFormat {
    /// Short date and medium time, used when no format is given
    General,
    /// `short`, `medium`, `long` or `full`
    DateTime(DateLength),
    /// `date:short` and friends
    Date(DateLength),
    /// `time:short` and friends
    Time(DateLength),
    /// A `strftime` pattern such as `%Y-%m-%d`
    Pattern(String),
}

impl DateFormat {
    /// Read the text of a `format=` option
    pub fn parse(text: &str) -> Result<Self, DateFormatError> {
        let named = match text.split_once(':') {
            Some(("date", length)) => DateLength::parse(length).map(DateFormat::Date),
            Some(("time", length)) => DateLength::parse(length).map(DateFormat::Time),
            _ => DateLength::parse(text).map(DateFormat::DateTime),
        };
        if let Some(format) = named {
            return Ok(format);
        }

        if text.is_empty() || StrftimeItems::new(text).any(|item| item == Item::Error) {
            return Err(DateFormatError::InvalidPattern(text.to_string()));
        }
        Ok(DateFormat::Pattern(text.to_string()))
    }
}

/// Culture used when rendering values and messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    tag: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self::invariant()
    }
}

impl Locale {
    /// A locale from a language tag such as `en-US` or `de_DE`
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// The culture-neutral locale
    pub fn invariant() -> Self {
        Self { tag: String::new() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn language(&self) -> String {
        self.tag
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    fn uses_comma_decimal(&self) -> bool {
        COMMA_DECIMAL_LANGUAGES.contains(&self.language().as_str())
    }

    pub fn decimal_separator(&self) -> char {
        if self.uses_comma_decimal() {
            ','
        } else {
            '.'
        }
    }

    /// Separator between items of a list written in prose
    pub fn list_separator(&self) -> &'static str {
        if self.uses_comma_decimal() {
            "; "
        } else {
            ", "
        }
    }

    fn month_first(&self) -> bool {
        self.tag.is_empty() || self.tag.eq_ignore_ascii_case("en-US") || self.tag == "en_US"
    }

    fn date_pattern(&self, length: DateLength) -> &'static str {
        let month_first = self.month_first();
        match length {
            DateLength::Short if month_first => "%m/%d/%Y",
            DateLength::Short if DOT_DATE_LANGUAGES.contains(&self.language().as_str()) => {
                "%d.%m.%Y"
            }
            DateLength::Short => "%d/%m/%Y",
            DateLength::Medium if month_first => "%b %-d, %Y",
            DateLength::Medium => "%-d %b %Y",
            DateLength::Long if month_first => "%B %-d, %Y",
            DateLength::Long => "%-d %B %Y",
            DateLength::Full if month_first => "%A, %B %-d, %Y",
            DateLength::Full => "%A %-d %B %Y",
        }
    }

    fn time_pattern(length: DateLength) -> &'static str {
        match length {
            DateLength::Short => "%H:%M",
            DateLength::Medium => "%H:%M:%S",
            DateLength::Long | DateLength::Full => "%H:%M:%S %:z",
        }
    }

    /// Write a date in this locale's style.
    ///
    /// Named styles pick the locale's field order and separators. Month and day names are
    /// always English.
    pub fn format_datetime(&self, value: &DateTime<FixedOffset>, format: &DateFormat) -> String {
        let pattern = match format {
            DateFormat::General => format!(
                "{} {}",
                self.date_pattern(DateLength::Short),
                Self::time_pattern(DateLength::Medium)
            ),
            DateFormat::DateTime(length) => format!(
                "{} {}",
                self.date_pattern(*length),
                Self::time_pattern(*length)
            ),
            DateFormat::Date(length) => self.date_pattern(*length).to_string(),
            DateFormat::Time(length) => Self::time_pattern(*length).to_string(),
            DateFormat::Pattern(pattern) => pattern.clone(),
        };

        let mut out = String::new();
        if write!(out, "{}", value.format(&pattern)).is_err() {
            tracing::debug!(pattern = %pattern, "date pattern could not be applied");
            return value.to_rfc3339();
        }
        out
    }

    pub fn format_float(&self, value: f64) -> String {
        let text = value.to_string();
        match self.decimal_separator() {
            '.' => text,
            sep => text.replace('.', &sep.to_string()),
        }
    }
}

/// Settings for one invocation
#[derive(Debug, Clone, Default)]
pub struct InvokeConfig {
    pub locale: Locale,
    /// Arguments bound by name before the template renders
    pub parameters: IndexMap<String, Value>,
}

/// TOML structure for deserializing configuration
#[derive(Deserialize)]
struct TomlConfig {
    locale: Option<String>,
    #[serde(default)]
    parameters: toml::Table,
}

impl InvokeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;

        Ok(InvokeConfig {
            locale: parsed.locale.map(Locale::new).unwrap_or_default(),
            parameters: parsed
                .parameters
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
        })
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Add or replace a parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// The parameters as a map value, or `None` when there are none
    pub fn parameters_value(&self) -> Option<Value> {
        if self.parameters.is_empty() {
            None
        } else {
            Some(Value::Map(self.parameters.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = InvokeConfig::from_toml(
            r#"
            locale = "de-DE"

            [parameters]
            name = "World"
            count = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.locale.tag(), "de-DE");
        assert_eq!(config.parameters.get("name"), Some(&Value::from("World")));
        assert_eq!(config.parameters.get("count"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_empty_config() {
        let config = InvokeConfig::from_toml("").unwrap();
        assert_eq!(config.locale, Locale::invariant());
        assert!(config.parameters_value().is_none());
    }

    #[test]
    fn test_invalid_config() {
        let result = InvokeConfig::from_toml("locale = [");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_locale_separators() {
        let german = Locale::new("de_DE");
        assert_eq!(german.decimal_separator(), ',');
        assert_eq!(german.list_separator(), "; ");
        assert_eq!(german.format_float(2.5), "2,5");

        let english = Locale::new("en-GB");
        assert_eq!(english.format_float(2.5), "2.5");
        assert_eq!(Locale::invariant().list_separator(), ", ");
    }

    fn stamp() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-05T14:30:09+02:00").unwrap()
    }

    #[test]
    fn test_parse_date_format() {
        assert_eq!(
            DateFormat::parse("short"),
            Ok(DateFormat::DateTime(DateLength::Short))
        );
        assert_eq!(
            DateFormat::parse("date:long"),
            Ok(DateFormat::Date(DateLength::Long))
        );
        assert_eq!(
            DateFormat::parse("time:full"),
            Ok(DateFormat::Time(DateLength::Full))
        );
        assert_eq!(
            DateFormat::parse("%Y-%m-%d"),
            Ok(DateFormat::Pattern("%Y-%m-%d".to_string()))
        );
        assert_eq!(
            DateFormat::parse("%Q"),
            Err(DateFormatError::InvalidPattern("%Q".to_string()))
        );
        assert!(DateFormat::parse("").is_err());
    }

    #[test]
    fn test_format_datetime_by_locale() {
        let invariant = Locale::invariant();
        assert_eq!(
            invariant.format_datetime(&stamp(), &DateFormat::General),
            "03/05/2024 14:30:09"
        );
        assert_eq!(
            invariant.format_datetime(&stamp(), &DateFormat::Date(DateLength::Long)),
            "March 5, 2024"
        );
        assert_eq!(
            invariant.format_datetime(&stamp(), &DateFormat::Time(DateLength::Long)),
            "14:30:09 +02:00"
        );

        let german = Locale::new("de-DE");
        assert_eq!(
            german.format_datetime(&stamp(), &DateFormat::Date(DateLength::Short)),
            "05.03.2024"
        );
        assert_eq!(
            Locale::new("en-GB").format_datetime(&stamp(), &DateFormat::DateTime(DateLength::Medium)),
            "5 Mar 2024 14:30:09"
        );
        assert_eq!(
            german.format_datetime(&stamp(), &DateFormat::Pattern("%Y/%j".to_string())),
            "2024/065"
        );
    }
}
