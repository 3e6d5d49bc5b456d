//! Diagnostics produced while resolving mappings.
//!
//! Builders never abort on a problem: they report it here and carry on with the next member,
//! builder or method.

use std::collections::BTreeMap;

use nova_mapper_types::{Diagnostic, Severity};
use parking_lot::Mutex;
use serde::Serialize;

use crate::MAPPER_TARGET;

macro_rules! diagnostic_kinds {
    ($($kind:ident => $severity:ident),* $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum DiagnosticKind {
            $($kind,)*
        }

        impl DiagnosticKind {
            pub const ALL: &'static [DiagnosticKind] = &[$(DiagnosticKind::$kind,)*];

            pub fn code(self) -> &'static str {
                match self {
                    $(DiagnosticKind::$kind => stringify!($kind),)*
                }
            }

            pub fn default_severity(self) -> Severity {
                match self {
                    $(DiagnosticKind::$kind => Severity::$severity,)*
                }
            }
        }
    };
}

diagnostic_kinds! {
    CouldNotCreateMapping => Error,
    SourceMemberNotFound => Warning,
    SourceMemberNotMapped => Info,
    RequiredMemberNotMapped => Error,
    TargetEnumValueNotMapped => Warning,
    SourceEnumValueNotMapped => Warning,
    MultipleConfigurationsForTargetMember => Warning,
    ReferencedMappingAmbiguous => Error,
    ReferencedMappingNotFound => Error,
    ReferencedMappingSourceTypeMismatch => Error,
    ReferencedMappingTargetTypeMismatch => Error,
    EnumSourceValueDuplicated => Warning,
    EnumStringSourceValueDuplicated => Warning,
    MapValueTypeMismatch => Error,
    SourceEnumValueDoesNotMatchSourceEnumType => Error,
    TargetEnumValueDoesNotMatchTargetEnumType => Error,
    CannotMapToReadOnlyType => Error,
    CannotMapToReadOnlyMember => Info,
    CannotMapToInitOnlyMemberPath => Error,
    NoConstructorFound => Error,
    CannotMapToTemporarySourceMember => Error,
    NullableSourceValueToNonNullableTargetValue => Info,
    NullableSourceTypeToNonNullableTargetType => Info,
    ConfiguredMappingSourceMemberNotFound => Error,
    ConfiguredMappingTargetMemberNotFound => Error,
    IgnoredSourceMemberNotFound => Warning,
    IgnoredTargetMemberNotFound => Warning,
    AmbiguousMappingMethod => Info,
}

impl DiagnosticKind {
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.code() == code)
    }
}

/// A diagnostic attributed to the mapping method whose resolution produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodDiagnostic {
    pub mapper: String,
    pub method: String,
    pub diagnostic: Diagnostic,
}

/// Append-only, thread-safe collection of diagnostics for one mapper.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    items: Mutex<Vec<MethodDiagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `kind`, honouring the severity overrides in effect for the reporting method.
    pub fn report(
        &self,
        mapper: &str,
        method: &str,
        kind: DiagnosticKind,
        message: impl Into<String>,
        overrides: &BTreeMap<String, Severity>,
    ) {
        let severity = overrides
            .get(kind.code())
            .copied()
            .unwrap_or_else(|| kind.default_severity());
        let message = message.into();
        tracing::debug!(
            target: MAPPER_TARGET,
            mapper,
            method,
            code = kind.code(),
            %severity,
            "{message}"
        );
        self.items.lock().push(MethodDiagnostic {
            mapper: mapper.to_string(),
            method: method.to_string(),
            diagnostic: Diagnostic::new(severity, kind.code(), message, None),
        });
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<MethodDiagnostic> {
        self.items.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for kind in DiagnosticKind::ALL {
            assert_eq!(DiagnosticKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(
            DiagnosticKind::CouldNotCreateMapping.default_severity(),
            Severity::Error
        );
    }

    #[test]
    fn overrides_change_severity() {
        let sink = DiagnosticSink::new();
        let overrides = [("SourceMemberNotFound".to_string(), Severity::Error)].into();
        sink.report(
            "CarMapper",
            "Map",
            DiagnosticKind::SourceMemberNotFound,
            "missing",
            &overrides,
        );
        sink.report(
            "CarMapper",
            "Map",
            DiagnosticKind::SourceMemberNotMapped,
            "unused",
            &overrides,
        );

        let items = sink.into_vec();
        assert_eq!(items[0].diagnostic.severity, Severity::Error);
        assert_eq!(items[1].diagnostic.severity, Severity::Info);
    }
}
