//! Mapping resolution engine for Nova mapper declarations.
//!
//! A mapper declares partial mapping methods (`Target Map(Source source)`); this crate decides
//! for every method, and every member pair reached from it, which conversion applies and turns
//! the result into [`MappingPlan`]s:
//! - shape classification of types ([`classify`])
//! - member matching with flattening, unflattening and explicit paths
//! - conversion builders for primitives, enums, collections, dictionaries, spans, tuples and
//!   object graphs
//! - a plan cache that memoizes generated methods and breaks cycles with deferred calls
//! - null handling driven by the configured null policies
//! - diagnostics collected per mapper, never aborting resolution
//!
//! Types are queried through [`nova_mapper_types::TypeEnv`]; options come from
//! [`nova_mapper_config`]. Plans can be rendered as C#-like text with [`render`].

mod builders;
mod cache;
pub mod classify;
mod context;
mod diagnostics;
mod engine;
mod enums;
mod matching;
mod members;
mod model;
mod naming;
mod nullability;
mod path;
mod plan;
pub mod render;

use std::sync::Arc;

use nova_mapper_config::MapperOptionsLayer;
use nova_mapper_types::{Severity, TypeEnv};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

pub use cache::{MappingKey, OptionScope, PlanCache};
pub use classify::ShapeCategory;
pub use context::method_base_name;
pub use diagnostics::{DiagnosticKind, MethodDiagnostic};
pub use enums::EnumMappingEntry;
pub use model::{MapperDecl, MappingMethod, MethodParam, RuntimeDispatch, UserMethod, UserMethodKind};
pub use path::{MemberHop, MemberPath};
pub use plan::{
    Conversion, Expr, MappingPlan, MethodRef, Param, Pattern, PlanId, PlanKind, Signature, Stmt,
    SwitchArm, Visibility,
};

/// Tracing target of the resolution engine.
pub const MAPPER_TARGET: &str = "nova.mapper";
/// Tracing target of the plan cache.
pub const CACHE_TARGET: &str = "nova.mapper.cache";
/// Name of the reference handler parameter of generated methods.
pub const REF_HANDLER: &str = "refHandler";

/// A mapper declaration that cannot be resolved at all.
///
/// Problems with individual mappings are diagnostics, not errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapperError {
    #[error("mapper `{mapper}`: method `{method}` has no source parameter")]
    MissingSource { mapper: String, method: String },
    #[error("mapper `{mapper}`: method `{method}` references unknown type id {id}")]
    UnknownType {
        mapper: String,
        method: String,
        id: u32,
    },
}

/// Plans and diagnostics of one mapper.
#[derive(Debug, Clone)]
pub struct ResolvedMapper {
    pub name: String,
    /// Declared methods first, in declaration order, then generated methods in creation order.
    pub plans: Vec<Arc<MappingPlan>>,
    pub diagnostics: Vec<MethodDiagnostic>,
}

impl ResolvedMapper {
    /// The plan of the method named `name`.
    pub fn plan(&self, name: &str) -> Option<&Arc<MappingPlan>> {
        self.plans.iter().find(|plan| plan.name == name)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.diagnostic.severity == Severity::Error)
    }

    /// The whole mapper as `partial class` text.
    pub fn render(&self) -> String {
        render::mapper_to_string(&self.name, self.plans.iter().map(|plan| plan.as_ref()))
    }

    pub fn report(&self) -> MapperReport {
        MapperReport {
            mapper: self.name.clone(),
            methods: self
                .plans
                .iter()
                .map(|plan| MethodReport {
                    name: plan.name.clone(),
                    kind: plan.kind.as_str(),
                    code: render::plan_to_string(plan),
                })
                .collect(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Serializable view of a [`ResolvedMapper`].
#[derive(Debug, Clone, Serialize)]
pub struct MapperReport {
    pub mapper: String,
    pub methods: Vec<MethodReport>,
    pub diagnostics: Vec<MethodDiagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodReport {
    pub name: String,
    pub kind: &'static str,
    pub code: String,
}

/// Resolve every method of `mapper`. `defaults` is the workspace-wide option layer, applied
/// before the mapper and method layers.
pub fn resolve_mapper(
    env: &dyn TypeEnv,
    defaults: &MapperOptionsLayer,
    mapper: &MapperDecl,
) -> Result<ResolvedMapper, MapperError> {
    engine::resolve(env, defaults, mapper)
}

/// Resolve independent mappers in parallel. Results keep the order of `mappers`.
pub fn resolve_mappers(
    env: &(dyn TypeEnv + Sync),
    defaults: &MapperOptionsLayer,
    mappers: &[MapperDecl],
) -> Vec<Result<ResolvedMapper, MapperError>> {
    tracing::debug!(target: MAPPER_TARGET, mappers = mappers.len(), "resolving mappers");
    mappers
        .par_iter()
        .map(|mapper| resolve_mapper(env, defaults, mapper))
        .collect()
}
