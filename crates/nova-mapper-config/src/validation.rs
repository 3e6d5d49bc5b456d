use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{EnumMappingStrategy, LoggingConfig, MapperOptionsLayer, NovaMapperConfig};

impl NovaMapperConfig {
    /// Validate semantic invariants for a configuration.
    ///
    /// Validation is best-effort: it attempts to report as many problems as possible in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = self.options.validate("options");
        validate_logging(&self.logging, &mut out);
        out
    }
}

impl MapperOptionsLayer {
    /// Validate one option layer. `toml_path` prefixes reported paths.
    #[must_use]
    pub fn validate(&self, toml_path: &str) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();
        validate_conversions(self, &mut out);
        validate_visibility(self, toml_path, &mut out);
        validate_enum_options(self, &mut out);
        validate_severity_overrides(self, toml_path, &mut out);
        out
    }
}

fn validate_conversions(layer: &MapperOptionsLayer, out: &mut ValidationDiagnostics) {
    let layers = (&layer.enabled_conversions, &layer.disabled_conversions);
    if let (Some(enabled), Some(disabled)) = layers {
        for conversion in enabled.intersection(disabled) {
            out.errors.push(ConfigValidationError::ConflictingConversion {
                conversion: *conversion,
            });
        }
    }

    let nothing_left = match layers {
        (Some(enabled), None) => enabled.is_empty(),
        (Some(enabled), Some(disabled)) => enabled.is_subset(disabled),
        (None, Some(disabled)) => crate::ConversionType::ALL
            .iter()
            .all(|c| disabled.contains(c)),
        (None, None) => false,
    };
    if nothing_left {
        out.warnings.push(ConfigWarning::NoConversionsEnabled);
    }
}

fn validate_visibility(layer: &MapperOptionsLayer, prefix: &str, out: &mut ValidationDiagnostics) {
    if matches!(&layer.included_members, Some(set) if set.is_empty()) {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: format!("{prefix}.included_members"),
            message: "no member would be mapped".to_string(),
        });
    }
    if matches!(&layer.included_constructors, Some(set) if set.is_empty()) {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: format!("{prefix}.included_constructors"),
            message: "must include at least one accessibility".to_string(),
        });
    }
}

fn validate_enum_options(layer: &MapperOptionsLayer, out: &mut ValidationDiagnostics) {
    if layer.enum_mapping_ignore_case == Some(true)
        && matches!(
            layer.enum_mapping_strategy,
            Some(EnumMappingStrategy::ByValue | EnumMappingStrategy::ByValueCheckDefined)
        )
    {
        out.warnings.push(ConfigWarning::EnumIgnoreCaseWithoutByName);
    }
}

fn validate_severity_overrides(
    layer: &MapperOptionsLayer,
    prefix: &str,
    out: &mut ValidationDiagnostics,
) {
    let Some(overrides) = &layer.severity_overrides else {
        return;
    };
    for code in overrides.keys() {
        let well_formed = code
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
            && code.chars().all(|c| c.is_ascii_alphanumeric());
        if !well_formed {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: format!("{prefix}.severity_overrides.{code}"),
                message: "diagnostic codes are PascalCase identifiers".to_string(),
            });
        }
    }
}

fn validate_logging(logging: &LoggingConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&logging.level);
    if !logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: logging.level.clone(),
            normalized,
        });
    }
}
