//! Builds an [`EntityGraph`] from GraphQL SDL.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use cynic_parser::type_system as ast;

use crate::{AnalyzeError, ConfigurationError, EntityGraph, FieldDescriptor};

const DEFAULT_ROOT_TYPES: [&str; 3] = ["Query", "Mutation", "Subscription"];

/// The fields backed by a resolver function, per type. Such fields need further retrieval,
/// so they are marked unresolved.
///
/// Deserializes from `{ "Order": ["creator", "client"] }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Resolvers(BTreeMap<String, BTreeSet<String>>);

impl Resolvers {
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(input)?)
    }

    pub fn with_resolver(mut self, type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        self.insert(type_name, field_name);
        self
    }

    pub fn insert(&mut self, type_name: impl Into<String>, field_name: impl Into<String>) {
        self.0.entry(type_name.into()).or_default().insert(field_name.into());
    }

    pub fn has_resolver(&self, type_name: &str, field_name: &str) -> bool {
        self.0
            .get(type_name)
            .is_some_and(|fields| fields.contains(field_name))
    }
}

/// Reads the object types, input objects, interfaces and unions of `sdl`.
///
/// Root operation types and introspection types are left out. Field resolution status is only
/// known when `resolvers` is given. The schema is not validated.
pub fn analyze(sdl: &str, resolvers: Option<&Resolvers>) -> Result<EntityGraph, AnalyzeError> {
    let document = cynic_parser::parse_type_system_document(sdl)
        .map_err(|error| AnalyzeError::Parse(error.to_report(sdl).to_string()))?;

    let mut root_types: Option<Vec<&str>> = None;
    let mut composite_types = HashSet::new();

    for definition in document.definitions() {
        match definition {
            ast::Definition::Schema(schema) => {
                root_types = Some(
                    [schema.query_type(), schema.mutation_type(), schema.subscription_type()]
                        .into_iter()
                        .flatten()
                        .map(|root| root.named_type())
                        .collect(),
                );
            }
            ast::Definition::Type(ty)
                if matches!(
                    ty,
                    ast::TypeDefinition::Object(_)
                        | ast::TypeDefinition::InputObject(_)
                        | ast::TypeDefinition::Interface(_)
                        | ast::TypeDefinition::Union(_)
                ) =>
            {
                composite_types.insert(ty.name());
            }
            _ => (),
        }
    }

    let root_types = root_types.unwrap_or_else(|| DEFAULT_ROOT_TYPES.to_vec());

    let describe = |type_name: &str, field_name: &str, target_type: &str| FieldDescriptor {
        target_type: target_type.to_owned(),
        resolved: resolvers.map(|resolvers| !resolvers.has_resolver(type_name, field_name)),
        nested: composite_types.contains(target_type),
    };

    let mut builder = EntityGraph::builder();

    for definition in document.definitions() {
        let ast::Definition::Type(ty) = definition else {
            continue;
        };

        let type_name = ty.name();

        if type_name.starts_with("__") || root_types.contains(&type_name) {
            continue;
        }

        builder = match ty {
            ast::TypeDefinition::Object(object) => {
                for interface in object.implements_interfaces() {
                    builder = builder.implements(type_name, interface);
                }

                builder.object(
                    type_name,
                    object
                        .fields()
                        .map(|field| (field.name(), describe(type_name, field.name(), field.ty().name()))),
                )
            }
            ast::TypeDefinition::InputObject(input) => builder.object(
                type_name,
                input
                    .fields()
                    .map(|field| (field.name(), describe(type_name, field.name(), field.ty().name()))),
            ),
            ast::TypeDefinition::Interface(interface) => builder.interface(
                type_name,
                interface
                    .fields()
                    .map(|field| (field.name(), describe(type_name, field.name(), field.ty().name()))),
            ),
            ast::TypeDefinition::Union(union) => builder.union(type_name, union.members().map(|member| member.name())),
            _ => builder,
        };
    }

    let graph = builder.build();

    tracing::debug!(entities = graph.len(), "analyzed schema");

    Ok(graph)
}
