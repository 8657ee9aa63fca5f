//! The entity graph the formatter walks.
//!
//! The graph is produced by a schema analyzer (see [`crate::analyze`]) or deserialized from
//! its JSON form. It is read-only once built.

use indexmap::IndexMap;

/// Ordered field descriptors of an entity, in declaration order.
pub type Fields = IndexMap<String, FieldDescriptor>;

/// Per-field metadata.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// The named type of the field, with list and non-null wrappers removed.
    #[serde(rename = "type", alias = "targetType")]
    pub target_type: String,
    /// `None` when no resolution metadata was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    /// The field value is itself an entity rather than a scalar or an enum.
    #[serde(default)]
    pub nested: bool,
}

impl FieldDescriptor {
    pub fn scalar(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            resolved: None,
            nested: false,
        }
    }

    pub fn nested(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            resolved: None,
            nested: true,
        }
    }

    pub fn with_resolved(mut self, resolved: bool) -> Self {
        self.resolved = Some(resolved);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Structured { fields: Fields },
    /// An interface (with its own fields) or a union (without).
    Polymorphic { fields: Fields, variants: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    name: String,
    kind: EntityKind,
    parents: Vec<String>,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn fields(&self) -> &Fields {
        match &self.kind {
            EntityKind::Structured { fields } | EntityKind::Polymorphic { fields, .. } => fields,
        }
    }

    /// Member entities of an interface or a union. Empty for structured entities.
    pub fn variants(&self) -> &[String] {
        match &self.kind {
            EntityKind::Structured { .. } => &[],
            EntityKind::Polymorphic { variants, .. } => variants,
        }
    }

    /// The interfaces this entity implements and the unions it belongs to.
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self.kind, EntityKind::Polymorphic { .. })
    }
}

/// A mapping from entity name to entity, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(from = "IndexMap<String, RawEntity>")]
pub struct EntityGraph {
    entities: IndexMap<String, Entity>,
}

impl EntityGraph {
    pub fn builder() -> EntityGraphBuilder {
        EntityGraphBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

struct PendingEntity {
    fields: Fields,
    // `None` for structured entities.
    variants: Option<Vec<String>>,
    // Interfaces get their implementors sorted, unions keep member order.
    sort_derived: bool,
}

/// Collects entities and `implements` edges in any order. Variant lists and inverse edges are
/// derived in [`EntityGraphBuilder::build`], once the whole graph is known.
#[derive(Default)]
pub struct EntityGraphBuilder {
    entities: IndexMap<String, PendingEntity>,
    implements: Vec<(String, String)>,
}

impl EntityGraphBuilder {
    pub fn object<N, F>(mut self, name: impl Into<String>, fields: F) -> Self
    where
        N: Into<String>,
        F: IntoIterator<Item = (N, FieldDescriptor)>,
    {
        self.entities.insert(
            name.into(),
            PendingEntity {
                fields: collect_fields(fields),
                variants: None,
                sort_derived: false,
            },
        );
        self
    }

    /// An interface. Its variants are the entities declared as implementing it.
    pub fn interface<N, F>(mut self, name: impl Into<String>, fields: F) -> Self
    where
        N: Into<String>,
        F: IntoIterator<Item = (N, FieldDescriptor)>,
    {
        self.entities.insert(
            name.into(),
            PendingEntity {
                fields: collect_fields(fields),
                variants: Some(Vec::new()),
                sort_derived: true,
            },
        );
        self
    }

    pub fn union<M>(mut self, name: impl Into<String>, members: M) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
    {
        self.entities.insert(
            name.into(),
            PendingEntity {
                fields: Fields::new(),
                variants: Some(members.into_iter().map(Into::into).collect()),
                sort_derived: false,
            },
        );
        self
    }

    /// Records that `entity` implements `interface`. Either may be declared later.
    pub fn implements(mut self, entity: impl Into<String>, interface: impl Into<String>) -> Self {
        self.implements.push((entity.into(), interface.into()));
        self
    }

    pub fn build(self) -> EntityGraph {
        let Self {
            entities: pending,
            implements,
        } = self;

        let mut derived: IndexMap<&str, Vec<&str>> = IndexMap::new();
        let mut parents: IndexMap<&str, Vec<&str>> = IndexMap::new();

        for (entity, interface) in &implements {
            push_unique(parents.entry(entity.as_str()).or_default(), interface.as_str());

            if pending
                .get(interface.as_str())
                .is_some_and(|parent| parent.variants.is_some())
            {
                push_unique(derived.entry(interface.as_str()).or_default(), entity.as_str());
            }
        }

        for (name, entity) in &pending {
            for member in entity.variants.iter().flatten() {
                if pending.contains_key(member.as_str()) {
                    push_unique(parents.entry(member.as_str()).or_default(), name.as_str());
                }
            }
        }

        let entities = pending
            .iter()
            .map(|(name, entity)| {
                let kind = match &entity.variants {
                    None => EntityKind::Structured {
                        fields: entity.fields.clone(),
                    },
                    Some(declared) => {
                        let mut implementors = derived.get(name.as_str()).cloned().unwrap_or_default();

                        if entity.sort_derived {
                            implementors.sort_unstable();
                        }

                        let mut variants = declared.clone();

                        for implementor in implementors {
                            if !variants.iter().any(|variant| variant == implementor) {
                                variants.push(implementor.to_owned());
                            }
                        }

                        EntityKind::Polymorphic {
                            fields: entity.fields.clone(),
                            variants,
                        }
                    }
                };

                let entity = Entity {
                    name: name.clone(),
                    kind,
                    parents: parents
                        .get(name.as_str())
                        .map(|parents| parents.iter().map(|parent| (*parent).to_owned()).collect())
                        .unwrap_or_default(),
                };

                (name.clone(), entity)
            })
            .collect();

        EntityGraph { entities }
    }
}

fn collect_fields<N, F>(fields: F) -> Fields
where
    N: Into<String>,
    F: IntoIterator<Item = (N, FieldDescriptor)>,
{
    fields.into_iter().map(|(name, field)| (name.into(), field)).collect()
}

fn push_unique<'a>(list: &mut Vec<&'a str>, item: &'a str) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// The analyzer output format: `{ "fields": {...}, "variants": [...], "implements": [...] }`.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntity {
    #[serde(default)]
    fields: Fields,
    #[serde(default, alias = "implementors", alias = "children")]
    variants: Option<Vec<String>>,
    #[serde(default, alias = "parents")]
    implements: Vec<String>,
}

impl From<IndexMap<String, RawEntity>> for EntityGraph {
    fn from(raw: IndexMap<String, RawEntity>) -> Self {
        let mut builder = EntityGraph::builder();

        for (name, entity) in raw {
            for interface in &entity.implements {
                builder = builder.implements(name.clone(), interface.clone());
            }

            builder = match entity.variants {
                Some(variants) if entity.fields.is_empty() => builder.union(name, variants),
                Some(variants) => {
                    builder.entities.insert(
                        name,
                        PendingEntity {
                            fields: entity.fields,
                            variants: Some(variants),
                            sort_derived: true,
                        },
                    );
                    builder
                }
                None => builder.object(name, entity.fields),
            };
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_variants_are_derived_in_any_declaration_order() {
        let graph = EntityGraph::builder()
            .object("ClientUser", [("id", FieldDescriptor::scalar("ID"))])
            .implements("ClientUser", "User")
            .object("AdminUser", [("id", FieldDescriptor::scalar("ID"))])
            .implements("AdminUser", "User")
            .interface("User", [("id", FieldDescriptor::scalar("ID"))])
            .build();

        let user = graph.get("User").unwrap();

        assert!(user.is_polymorphic());
        assert_eq!(user.variants(), ["AdminUser", "ClientUser"]);
        assert_eq!(user.fields().len(), 1);
        assert_eq!(graph.get("AdminUser").unwrap().parents(), ["User"]);
    }

    #[test]
    fn union_members_record_their_parent() {
        let graph = EntityGraph::builder()
            .union("SearchResult", ["Order", "Client"])
            .object("Order", [("id", FieldDescriptor::scalar("ID"))])
            .object("Client", [("id", FieldDescriptor::scalar("ID"))])
            .build();

        assert_eq!(graph.get("SearchResult").unwrap().variants(), ["Order", "Client"]);
        assert!(graph.get("SearchResult").unwrap().fields().is_empty());
        assert_eq!(graph.get("Client").unwrap().parents(), ["SearchResult"]);
        assert_eq!(graph.names().collect::<Vec<_>>(), ["SearchResult", "Order", "Client"]);
    }

    #[test]
    fn deserializes_analyzer_output() {
        let graph: EntityGraph = serde_json::from_value(serde_json::json!({
            "Order": {
                "fields": {
                    "id": { "type": "ID", "resolved": true, "nested": false },
                    "creator": { "type": "User", "resolved": false, "nested": true },
                    "note": { "type": "String" }
                }
            },
            "User": {
                "fields": { "id": { "type": "ID" } },
                "variants": []
            },
            "ClientUser": {
                "fields": { "id": { "type": "ID" } },
                "implements": ["User"]
            },
            "Anything": {
                "variants": ["Order", "ClientUser"]
            }
        }))
        .unwrap();

        let order = graph.get("Order").unwrap();
        assert_eq!(order.fields()["id"], FieldDescriptor::scalar("ID").with_resolved(true));
        assert_eq!(order.fields()["creator"], FieldDescriptor::nested("User").with_resolved(false));
        assert_eq!(order.fields()["note"].resolved, None);

        assert_eq!(graph.get("User").unwrap().variants(), ["ClientUser"]);
        assert_eq!(graph.get("Anything").unwrap().variants(), ["Order", "ClientUser"]);
        assert_eq!(graph.get("ClientUser").unwrap().parents(), ["User", "Anything"]);
    }
}
