//! JSON workspace files: the types a set of mappers works on plus the mapper declarations.
//!
//! ```json
//! {
//!   "types": [
//!     { "kind": "class", "name": "Car", "members": [{ "name": "Seats", "type": "int" }] },
//!     { "kind": "class", "name": "CarDto", "members": [{ "name": "Seats", "type": "int" }] }
//!   ],
//!   "mappers": [
//!     {
//!       "name": "CarMapper",
//!       "methods": [
//!         { "name": "Map", "params": [{ "name": "source", "type": "Car" }], "returns": "CarDto" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Type references are type expressions (`List<CarDto>?`, `int[]`) resolved against the
//! declared types and the built-in ones.

use std::path::Path;

use anyhow::{bail, Context, Result};
use nova_mapper::{
    MapperDecl, MappingMethod, MethodParam, RuntimeDispatch, UserMethod, UserMethodKind,
};
use nova_mapper_config::{MapperOptionsLayer, MethodConfig};
use nova_mapper_types::{TypeDecl, TypeRef, TypeStore};
use serde::Deserialize;

use crate::CLI_TARGET;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkspaceFile {
    #[serde(default)]
    types: Vec<TypeDecl>,
    mappers: Vec<MapperFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapperFile {
    name: String,
    #[serde(default)]
    options: MapperOptionsLayer,
    #[serde(default)]
    methods: Vec<MethodFile>,
    #[serde(default)]
    user_methods: Vec<UserMethodFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamFile {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodFile {
    name: String,
    params: Vec<ParamFile>,
    /// Absent for methods mapping into an existing target.
    #[serde(default)]
    returns: Option<String>,
    /// Name of the parameter that receives the mapped values.
    #[serde(default)]
    existing_target: Option<String>,
    #[serde(default)]
    dispatch: Option<DispatchFile>,
    #[serde(default)]
    config: MethodConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DispatchFile {
    /// `object Map(object source, Type targetType)`
    TargetType,
    /// `TTarget Map<TTarget>(object source)`
    Generic,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UserMethodFile {
    name: String,
    #[serde(default)]
    params: Vec<ParamFile>,
    /// Return type; for a generic factory, the constraint of `type_param`.
    returns: String,
    #[serde(default)]
    kind: UserMethodKindFile,
    /// Type parameter returned by a generic factory.
    #[serde(default)]
    type_param: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum UserMethodKindFile {
    #[default]
    Mapping,
    Factory,
}

/// A loaded workspace: every declared type interned into one store.
#[derive(Debug)]
pub struct Workspace {
    pub store: TypeStore,
    pub mappers: Vec<MapperDecl>,
}

impl Workspace {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workspace file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("invalid workspace file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: WorkspaceFile = serde_json::from_str(text)?;
        let mut store = TypeStore::default();
        store.declare(&file.types)?;
        let mappers = file
            .mappers
            .iter()
            .map(|mapper| lower_mapper(&mut store, mapper))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            target: CLI_TARGET,
            types = file.types.len(),
            mappers = mappers.len(),
            "workspace loaded"
        );
        Ok(Self { store, mappers })
    }
}

fn lower_mapper(store: &mut TypeStore, file: &MapperFile) -> Result<MapperDecl> {
    let mut mapper = MapperDecl::new(&file.name).with_options(file.options.clone());
    for method in &file.methods {
        let lowered = lower_method(store, method)
            .with_context(|| format!("mapper `{}`, method `{}`", file.name, method.name))?;
        mapper = mapper.with_method(lowered);
    }
    for method in &file.user_methods {
        let params = lower_params(store, &method.params)
            .with_context(|| format!("mapper `{}`, method `{}`", file.name, method.name))?;
        let return_type = store
            .parse(&method.returns)
            .with_context(|| format!("mapper `{}`, method `{}`", file.name, method.name))?;
        mapper = mapper.with_user_method(UserMethod {
            name: method.name.clone(),
            params,
            return_type,
            kind: match method.kind {
                UserMethodKindFile::Mapping => UserMethodKind::Mapping,
                UserMethodKindFile::Factory => UserMethodKind::ObjectFactory,
            },
            type_param: method.type_param.clone(),
        });
    }
    Ok(mapper)
}

fn lower_params(store: &mut TypeStore, params: &[ParamFile]) -> Result<Vec<MethodParam>> {
    params
        .iter()
        .map(|p| Ok(MethodParam::new(&p.name, parse(store, &p.ty)?)))
        .collect()
}

fn parse(store: &mut TypeStore, expr: &str) -> Result<TypeRef> {
    Ok(store.parse(expr)?)
}

fn lower_method(store: &mut TypeStore, file: &MethodFile) -> Result<MappingMethod> {
    let params = lower_params(store, &file.params)?;
    let return_type = file
        .returns
        .as_deref()
        .map(|expr| parse(store, expr))
        .transpose()?;
    if let Some(existing) = &file.existing_target {
        if !params.iter().any(|p| &p.name == existing) {
            bail!("existing target `{existing}` is not a parameter");
        }
    }
    if return_type.is_none() && file.existing_target.is_none() {
        bail!("either `returns` or `existing_target` is required");
    }
    Ok(MappingMethod {
        name: file.name.clone(),
        params,
        return_type,
        existing_target: file.existing_target.clone(),
        config: file.config.clone(),
        dispatch: file.dispatch.map(|dispatch| match dispatch {
            DispatchFile::TargetType => RuntimeDispatch::TargetTypeParameter,
            DispatchFile::Generic => RuntimeDispatch::GenericTarget,
        }),
    })
}
