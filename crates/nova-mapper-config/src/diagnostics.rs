use serde::de::DeserializeOwned;
use std::fmt;

/// Combined diagnostics produced while loading and validating `nova-mapper.toml`.
///
/// Loading diagnostics are "best effort": callers always get a config when deserialization
/// succeeds, plus a set of diagnostics describing issues that may change mapping behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    /// Keys present in the input TOML that were not recognized.
    ///
    /// These are collected via `serde_ignored` so nested tables use the full path (for example
    /// `options.deep_clonning`).
    pub unknown_keys: Vec<String>,
    /// Non-fatal issues such as deprecated keys or options without effect.
    pub warnings: Vec<ConfigWarning>,
    /// Semantic validation failures; the config is internally inconsistent.
    pub errors: Vec<ConfigValidationError>,
}

impl ConfigDiagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty() && self.warnings.is_empty() && self.errors.is_empty()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn extend_validation(&mut self, validation: ValidationDiagnostics) {
        self.warnings.extend(validation.warnings);
        self.errors.extend(validation.errors);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationDiagnostics {
    pub warnings: Vec<ConfigWarning>,
    pub errors: Vec<ConfigValidationError>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    DeprecatedKey {
        path: String,
        message: String,
    },
    InvalidValue {
        toml_path: String,
        message: String,
    },
    /// `enum_mapping_ignore_case` only affects name-based enum mappings.
    EnumIgnoreCaseWithoutByName,
    NoConversionsEnabled,
    LoggingLevelInvalid {
        value: String,
        normalized: String,
    },
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    InvalidValue {
        toml_path: String,
        message: String,
    },
    /// The same conversion is both enabled and disabled within one layer.
    ConflictingConversion {
        conversion: crate::ConversionType,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::DeprecatedKey { message, .. } => f.write_str(message),
            ConfigWarning::InvalidValue { toml_path, message } => {
                write!(f, "{toml_path}: {message}")
            }
            ConfigWarning::EnumIgnoreCaseWithoutByName => f.write_str(
                "options.enum_mapping_ignore_case has no effect unless enum_mapping_strategy is by_name",
            ),
            ConfigWarning::NoConversionsEnabled => {
                f.write_str("no conversions are enabled; only identical types can be mapped")
            }
            ConfigWarning::LoggingLevelInvalid { value, normalized } => write!(
                f,
                "logging.level {value:?} is not a valid filter ({normalized:?}); using the default"
            ),
        }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValidationError::InvalidValue { toml_path, message } => {
                write!(f, "{toml_path}: {message}")
            }
            ConfigValidationError::ConflictingConversion { conversion } => write!(
                f,
                "conversion {conversion:?} is both enabled and disabled in the same layer"
            ),
        }
    }
}

pub(crate) fn deserialize_toml_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::<String>::new();
    let deserializer = toml::de::Deserializer::new(text);
    let value = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(normalize_serde_ignored_path(path));
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}

fn normalize_serde_ignored_path(path: serde_ignored::Path) -> String {
    // `serde_ignored::Path` renders with a leading `.` for root paths; TOML users expect `a.b.c`.
    let raw = path.to_string();
    let raw = raw.trim_start_matches('.');
    // `serde_ignored` renders sequence indices as `.0` segments. TOML users expect `a[0].b`.
    raw.split('.')
        .enumerate()
        .fold(String::new(), |mut out, (idx, segment)| {
            let is_index =
                idx > 0 && !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
            if is_index {
                out.push('[');
                out.push_str(segment);
                out.push(']');
                return out;
            }

            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(segment);
            out
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn unknown_key_paths_include_array_indexes() {
        #[derive(Debug, Deserialize)]
        struct Root {
            #[allow(dead_code)]
            items: Vec<Item>,
        }

        #[derive(Debug, Deserialize)]
        struct Item {
            #[allow(dead_code)]
            known: String,
        }

        let text = r#"
[[items]]
known = "ok"
typo = 1
"#;

        let (_value, unknown) = deserialize_toml_with_unknown_keys::<Root>(text).expect("parse");
        assert_eq!(unknown, vec!["items[0].typo"]);
    }
}
