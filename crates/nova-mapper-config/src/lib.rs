//! Configuration model of the mapping engine.
//!
//! Options are layered: workspace (`nova-mapper.toml`), mapper and method layers are plain
//! [`MapperOptionsLayer`]s with every field optional. [`MapperOptions::resolve`] flattens them
//! into the immutable [`MapperOptions`] the engine works with; the engine never looks at a layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use nova_mapper_types::{Accessibility, Severity};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;

mod diagnostics;
mod method;
mod schema;
mod validation;

pub use diagnostics::{
    ConfigDiagnostics, ConfigValidationError, ConfigWarning, ValidationDiagnostics,
};
pub use method::{
    ConstantValue, EnumMappingConfig, EnumValue, EnumValueOverride, MethodConfig,
    PropertyMappingConfig, ValueMappingConfig,
};
pub use schema::json_schema;

/// Tracing target used by this crate.
pub const CONFIG_TARGET: &str = "nova.mapper.config";

/// How enum values are paired between source and target enums.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EnumMappingStrategy {
    /// Pair by numeric value.
    #[default]
    ByValue,
    /// Pair by member name.
    ByName,
    /// Pair by numeric value, but only for values defined on the target enum.
    ByValueCheckDefined,
}

/// Name transformation applied to enum member names when mapping enums from and to strings.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EnumNamingStrategy {
    #[default]
    MemberName,
    CamelCase,
    PascalCase,
    SnakeCase,
    UpperSnakeCase,
    KebabCase,
    UpperKebabCase,
    /// Use the `[Description]` attribute value, falling back to the member name.
    ComponentModelDescription,
    /// Use the `[EnumMember(Value = ..)]` attribute value, falling back to the member name.
    SerializationEnumMember,
}

/// How source member names are compared with target member names.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PropertyNameMappingStrategy {
    #[default]
    CaseSensitive,
    CaseInsensitive,
    SnakeCase,
    UpperSnakeCase,
}

/// Which unmapped-member diagnostics are reported.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RequiredMappingStrategy {
    #[default]
    Both,
    Source,
    Target,
    None,
}

impl RequiredMappingStrategy {
    pub fn reports_unmapped_source(self) -> bool {
        matches!(self, Self::Both | Self::Source)
    }

    pub fn reports_unmapped_target(self) -> bool {
        matches!(self, Self::Both | Self::Target)
    }
}

/// Conversion families that can be switched off individually.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    ImplicitCast,
    ExplicitCast,
    ParseMethod,
    ToStringMethod,
    StringToEnum,
    EnumToString,
    EnumToEnum,
    EnumUnderlyingType,
    Constructor,
    DateTimeToDateOnly,
    DateTimeToTimeOnly,
    Enumerable,
    Dictionary,
    Span,
    Memory,
    Tuple,
}

impl ConversionType {
    pub const ALL: [ConversionType; 16] = [
        ConversionType::ImplicitCast,
        ConversionType::ExplicitCast,
        ConversionType::ParseMethod,
        ConversionType::ToStringMethod,
        ConversionType::StringToEnum,
        ConversionType::EnumToString,
        ConversionType::EnumToEnum,
        ConversionType::EnumUnderlyingType,
        ConversionType::Constructor,
        ConversionType::DateTimeToDateOnly,
        ConversionType::DateTimeToTimeOnly,
        ConversionType::Enumerable,
        ConversionType::Dictionary,
        ConversionType::Span,
        ConversionType::Memory,
        ConversionType::Tuple,
    ];

    pub fn all() -> BTreeSet<ConversionType> {
        Self::ALL.into_iter().collect()
    }
}

fn default_visibility() -> BTreeSet<Accessibility> {
    [
        Accessibility::Public,
        Accessibility::Internal,
        Accessibility::ProtectedInternal,
    ]
    .into_iter()
    .collect()
}

/// Fully resolved options for one mapping method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapperOptions {
    /// Throw when a nullable source is mapped to a non-nullable target return value.
    pub throw_on_mapping_null_mismatch: bool,
    /// Throw when a nullable source member is mapped to a non-nullable target member.
    pub throw_on_property_mapping_null_mismatch: bool,
    /// Let null flow from nullable source members into nullable target members.
    pub allow_null_property_assignment: bool,
    /// Do not report nullable-to-non-nullable diagnostics.
    pub suppress_null_mismatch_diagnostic: bool,
    pub enum_mapping_strategy: EnumMappingStrategy,
    pub enum_mapping_ignore_case: bool,
    pub enum_naming_strategy: EnumNamingStrategy,
    pub property_name_mapping_strategy: PropertyNameMappingStrategy,
    pub enabled_conversions: BTreeSet<ConversionType>,
    pub included_members: BTreeSet<Accessibility>,
    pub included_constructors: BTreeSet<Accessibility>,
    pub use_reference_handling: bool,
    pub deep_cloning: bool,
    pub required_mapping_strategy: RequiredMappingStrategy,
    pub severity_overrides: BTreeMap<String, Severity>,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            throw_on_mapping_null_mismatch: true,
            throw_on_property_mapping_null_mismatch: false,
            allow_null_property_assignment: true,
            suppress_null_mismatch_diagnostic: false,
            enum_mapping_strategy: EnumMappingStrategy::default(),
            enum_mapping_ignore_case: false,
            enum_naming_strategy: EnumNamingStrategy::default(),
            property_name_mapping_strategy: PropertyNameMappingStrategy::default(),
            enabled_conversions: ConversionType::all(),
            included_members: default_visibility(),
            included_constructors: default_visibility(),
            use_reference_handling: false,
            deep_cloning: false,
            required_mapping_strategy: RequiredMappingStrategy::default(),
            severity_overrides: BTreeMap::new(),
        }
    }
}

impl MapperOptions {
    /// Apply `layers` in order on top of the defaults; later layers win.
    pub fn resolve<'a>(layers: impl IntoIterator<Item = &'a MapperOptionsLayer>) -> Self {
        let mut options = Self::default();
        for layer in layers {
            options.apply(layer);
        }
        options
    }

    pub fn apply(&mut self, layer: &MapperOptionsLayer) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &layer.$field {
                    self.$field = value.clone();
                })*
            };
        }
        take!(
            throw_on_mapping_null_mismatch,
            throw_on_property_mapping_null_mismatch,
            allow_null_property_assignment,
            suppress_null_mismatch_diagnostic,
            enum_mapping_strategy,
            enum_mapping_ignore_case,
            enum_naming_strategy,
            property_name_mapping_strategy,
            enabled_conversions,
            included_members,
            included_constructors,
            use_reference_handling,
            deep_cloning,
            required_mapping_strategy,
        );
        if let Some(disabled) = &layer.disabled_conversions {
            for conversion in disabled {
                self.enabled_conversions.remove(conversion);
            }
        }
        // Overrides merge per code instead of replacing the whole table.
        if let Some(overrides) = &layer.severity_overrides {
            self.severity_overrides
                .extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        }
    }

    pub fn is_enabled(&self, conversion: ConversionType) -> bool {
        self.enabled_conversions.contains(&conversion)
    }

    pub fn includes_member(&self, accessibility: Accessibility) -> bool {
        self.included_members.contains(&accessibility)
    }

    pub fn includes_constructor(&self, accessibility: Accessibility) -> bool {
        self.included_constructors.contains(&accessibility)
    }
}

/// One layer of options. Unset fields inherit from the previous layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(deny_unknown_fields)]
pub struct MapperOptionsLayer {
    /// Throw `ArgumentNullException` when a nullable source value is mapped to a non-nullable
    /// target value of a mapping method (default: `true`).
    pub throw_on_mapping_null_mismatch: Option<bool>,
    /// Throw when a nullable source member is mapped to a non-nullable target member
    /// (default: `false`, the assignment is skipped instead).
    pub throw_on_property_mapping_null_mismatch: Option<bool>,
    /// Assign `null` from nullable source members to nullable target members (default: `true`).
    pub allow_null_property_assignment: Option<bool>,
    /// Silence nullable-to-non-nullable diagnostics (default: `false`).
    pub suppress_null_mismatch_diagnostic: Option<bool>,
    pub enum_mapping_strategy: Option<EnumMappingStrategy>,
    /// Compare enum member names case-insensitively when mapping by name.
    pub enum_mapping_ignore_case: Option<bool>,
    pub enum_naming_strategy: Option<EnumNamingStrategy>,
    pub property_name_mapping_strategy: Option<PropertyNameMappingStrategy>,
    /// Replace the set of enabled conversion families (default: all).
    pub enabled_conversions: Option<BTreeSet<ConversionType>>,
    /// Remove conversion families from the inherited set.
    pub disabled_conversions: Option<BTreeSet<ConversionType>>,
    /// Member accessibilities considered for mapping
    /// (default: `public`, `internal`, `protected_internal`).
    pub included_members: Option<BTreeSet<Accessibility>>,
    /// Constructor accessibilities considered when instantiating targets.
    pub included_constructors: Option<BTreeSet<Accessibility>>,
    /// Preserve object identity across mapped graphs.
    pub use_reference_handling: Option<bool>,
    /// Always create new instances, even when source and target types are the same.
    #[serde(alias = "use_deep_cloning")]
    pub deep_cloning: Option<bool>,
    pub required_mapping_strategy: Option<RequiredMappingStrategy>,
    /// Override the severity of individual diagnostics by code, e.g.
    /// `SourceMemberNotFound = "error"`.
    pub severity_overrides: Option<BTreeMap<String, Severity>>,
}

/// Contents of `nova-mapper.toml`.
///
/// ```toml
/// [options]
/// enum_mapping_strategy = "by_name"
/// property_name_mapping_strategy = "case_insensitive"
/// disabled_conversions = ["span", "memory"]
///
/// [options.severity_overrides]
/// SourceMemberNotFound = "error"
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct NovaMapperConfig {
    /// Workspace-wide option layer, applied below mapper and method layers.
    #[serde(default)]
    pub options: MapperOptionsLayer,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to the given file path.
    ///
    /// If the file cannot be opened, file logging is disabled while other sinks remain active.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        })
    }

    /// Create the effective `EnvFilter`. If `RUST_LOG` is set, it is merged into the result.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_string())
    }
}

/// Keys that were renamed; the old spelling is still accepted.
const DEPRECATED_KEYS: &[(&str, &str)] = &[("use_deep_cloning", "deep_cloning")];

fn deprecation_warnings(value: &toml::Value) -> Vec<ConfigWarning> {
    let Some(options) = value.get("options").and_then(toml::Value::as_table) else {
        return Vec::new();
    };
    DEPRECATED_KEYS
        .iter()
        .filter(|(old, _)| options.contains_key(*old))
        .map(|(old, new)| ConfigWarning::DeprecatedKey {
            path: format!("options.{old}"),
            message: format!("options.{old} is deprecated; use options.{new} instead"),
        })
        .collect()
}

impl NovaMapperConfig {
    pub const FILE_NAME: &'static str = "nova-mapper.toml";

    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = read(path.as_ref())?;
        Ok(toml::from_str(&text)?)
    }

    /// Load a config file from TOML and return diagnostics (unknown keys, deprecated keys and
    /// semantic validation failures).
    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let text = read(path.as_ref())?;
        Self::load_from_str_with_diagnostics(&text)
    }

    /// Load a config from a TOML string and return diagnostics.
    pub fn load_from_str_with_diagnostics(
        text: &str,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) =
            diagnostics::deserialize_toml_with_unknown_keys::<NovaMapperConfig>(text)?;

        let mut diagnostics = ConfigDiagnostics {
            unknown_keys,
            ..ConfigDiagnostics::default()
        };

        if let Ok(value) = toml::from_str::<toml::Value>(text) {
            diagnostics.warnings.extend(deprecation_warnings(&value));
        }

        diagnostics.extend_validation(config.validate());

        for key in &diagnostics.unknown_keys {
            tracing::warn!(target: CONFIG_TARGET, key = %key, "unknown configuration key");
        }

        Ok((config, diagnostics))
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Find `nova-mapper.toml` (or `.nova-mapper.toml`) in `root`.
pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    [NovaMapperConfig::FILE_NAME, ".nova-mapper.toml"]
        .into_iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Load the configuration next to `root`, falling back to defaults when there is none.
pub fn load_for_root(
    root: &Path,
) -> Result<(NovaMapperConfig, Option<PathBuf>, ConfigDiagnostics), ConfigError> {
    let Some(path) = discover_config_path(root) else {
        return Ok((
            NovaMapperConfig::default(),
            None,
            ConfigDiagnostics::default(),
        ));
    };
    let (config, diagnostics) = NovaMapperConfig::load_from_path_with_diagnostics(&path)?;
    Ok((config, Some(path), diagnostics))
}

#[derive(Clone)]
struct MutexFileMakeWriter {
    file: Arc<Mutex<File>>,
}

struct MutexFileWriter {
    file: Arc<Mutex<File>>,
}

impl std::io::Write for MutexFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        file.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for MutexFileMakeWriter {
    type Writer = MutexFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MutexFileWriter {
            file: self.file.clone(),
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Initializes structured `tracing` logging.
///
/// This function is safe to call multiple times; only the first call installs a global
/// subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let file = config.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
        let file_failed = config.file.is_some() && file.is_none();

        let mut make_writer = BoxMakeWriter::new(std::io::sink);
        if config.stderr {
            // Keep `cargo test` output capture working in debug builds.
            make_writer = if cfg!(debug_assertions) {
                BoxMakeWriter::new(
                    make_writer.and(tracing_subscriber::fmt::writer::TestWriter::with_stderr),
                )
            } else {
                BoxMakeWriter::new(make_writer.and(std::io::stderr))
            };
        }
        if let Some(file) = file {
            let file = Arc::new(Mutex::new(file));
            make_writer = BoxMakeWriter::new(make_writer.and(MutexFileMakeWriter { file }));
        }

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() && file_failed {
            if let Some(path) = config.file.as_ref() {
                tracing::warn!(
                    target: CONFIG_TARGET,
                    path = %path.display(),
                    "failed to open log file; file logging is disabled"
                );
            }
        }
    });
}
