//! Formatting options and their cascade.
//!
//! Options come in two shapes. An [`OptionsPatch`] is a partial configuration as written by a
//! user: every key is optional, and any key that is not an option names an entity whose patch
//! applies when the traversal descends into it. [`Options`] is the effective configuration at
//! one point of the traversal, computed by the [`OptionsResolver`] by layering patches over the
//! defaults.

mod resolver;

pub use resolver::{Blame, OptionsResolver};

use std::collections::BTreeMap;

use serde::{de::Error as _, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ConfigurationError, FieldDescriptor};

/// Which nested types the formatter inlines regardless of their resolution status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescendInto {
    /// Inline every nested field and every variant.
    Always,
    /// Never inline, always reference.
    Never,
    /// Inline the listed type or field names, on top of the resolution rules. Empty when no
    /// list is configured.
    Listed(Vec<String>),
}

impl Default for DescendInto {
    fn default() -> Self {
        Self::Listed(Vec::new())
    }
}

impl DescendInto {
    fn lists(&self, names: &[&str]) -> bool {
        match self {
            Self::Listed(listed) => listed.iter().any(|listed| names.contains(&listed.as_str())),
            Self::Always | Self::Never => false,
        }
    }

    /// Always-descend or allow-listed, the two ways to opt into inlining an interface.
    fn explicitly_allows(&self, names: &[&str]) -> bool {
        matches!(self, Self::Always) || self.lists(names)
    }
}

impl Serialize for DescendInto {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Always => serializer.serialize_str("always"),
            Self::Never => serializer.serialize_str("never"),
            Self::Listed(names) => names.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DescendInto {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde_json::Value;

        let invalid = || {
            D::Error::custom(
                "the `descendInto` option must be a list of type names, `true`, \"always\" or \"never\"",
            )
        };

        match Value::deserialize(deserializer)? {
            Value::Bool(true) => Ok(Self::Always),
            Value::Bool(false) | Value::Null => Ok(Self::Listed(Vec::new())),
            Value::String(sentinel) => match sentinel.as_str() {
                "always" => Ok(Self::Always),
                "never" => Ok(Self::Never),
                _ => Err(invalid()),
            },
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name),
                    _ => Err(invalid()),
                })
                .collect::<Result<_, _>>()
                .map(Self::Listed),
            _ => Err(invalid()),
        }
    }
}

fn deserialize_indentation<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(indentation) => Ok(Some(indentation)),
        serde_json::Value::Null => Ok(None),
        _ => Err(D::Error::custom("the `indentation` option must be a string")),
    }
}

/// A partial configuration: the base configuration of a formatter, the options of one
/// invocation, a per-type override or a `levels` entry.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsPatch {
    /// Field names or types always kept, bypassing the resolution filters.
    pub include: Option<Vec<String>>,
    /// Field names or types always dropped.
    pub exclude: Option<Vec<String>>,
    pub include_resolved: Option<bool>,
    pub include_unresolved: Option<bool>,
    pub include_nested: Option<bool>,
    pub descend_resolved: Option<bool>,
    pub descend_unresolved: Option<bool>,
    /// Inline nested fields whose type is an interface or a union.
    pub descend_interfaces: Option<bool>,
    /// Inline the member types of an interface or a union.
    pub descend_interface_types: Option<bool>,
    pub descend_into: Option<DescendInto>,
    pub ignore_unknown_types: Option<bool>,
    #[serde(deserialize_with = "deserialize_indentation")]
    pub indentation: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Replaces the entity name in the fragment name. Type overrides only.
    pub name: Option<String>,
    /// Replaces the whole fragment name. Type overrides only.
    pub alias: Option<String>,
    /// Annotate fragment bodies with `# Origin:` comments.
    pub debug: Option<bool>,
    /// In debug mode, also annotate where every option was last set.
    pub blame: Option<bool>,
    /// Patches indexed by traversal depth, applied after the type override of that depth.
    pub levels: Option<Vec<OptionsPatch>>,
    /// Patches applied when descending into the entity with the given name.
    #[serde(flatten)]
    pub types: BTreeMap<String, OptionsPatch>,
}

impl OptionsPatch {
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(input)?)
    }

    /// Adds a patch applied when descending into `type_name`.
    pub fn with_type(mut self, type_name: impl Into<String>, patch: OptionsPatch) -> Self {
        self.types.insert(type_name.into(), patch);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// A short code identifying this patch, used to keep fragments rendered with different
    /// options apart. Equal patches hash equally whatever order their keys were written in,
    /// and the empty patch hashes to the empty string.
    pub fn hash(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        // Struct fields serialize in declaration order and type overrides are sorted.
        let serialized = serde_json::to_vec(self).expect("options always serialize to JSON");
        let digest = <Sha256 as Digest>::digest(serialized);

        hex::encode_upper(&digest[..3])
    }

    /// `name` and `alias` are rejected outside of type overrides.
    pub(crate) fn ensure_untargeted(&self) -> Result<(), ConfigurationError> {
        if self.alias.is_some() {
            return Err(ConfigurationError::TargetedOnly("alias"));
        }

        if self.name.is_some() {
            return Err(ConfigurationError::TargetedOnly("name"));
        }

        Ok(())
    }
}

/// The effective configuration at one point of the traversal.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_resolved: bool,
    pub include_unresolved: bool,
    pub include_nested: bool,
    pub descend_resolved: bool,
    pub descend_unresolved: bool,
    pub descend_interfaces: bool,
    pub descend_interface_types: bool,
    pub descend_into: DescendInto,
    pub ignore_unknown_types: bool,
    pub indentation: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub debug: bool,
    pub blame: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            include_resolved: true,
            include_unresolved: true,
            include_nested: true,
            descend_resolved: true,
            descend_unresolved: false,
            descend_interfaces: false,
            descend_interface_types: false,
            descend_into: DescendInto::default(),
            ignore_unknown_types: false,
            indentation: String::from("  "),
            prefix: None,
            suffix: None,
            name: None,
            alias: None,
            debug: false,
            blame: false,
        }
    }
}

macro_rules! apply_patch {
    ($($field:ident => $key:literal,)*) => {
        /// Every option key, in rendering order.
        pub(crate) const OPTION_KEYS: &[&str] = &[$($key),*];

        impl Options {
            /// Overwrites every option set in `patch`, recording `source` as its origin.
            #[allow(clippy::useless_conversion)]
            pub(crate) fn apply(&mut self, patch: &OptionsPatch, blame: &mut Blame, source: &str) {
                $(
                    if let Some(value) = &patch.$field {
                        self.$field = value.clone().into();
                        blame.insert($key, source.to_owned());
                    }
                )*
            }
        }
    };
}

apply_patch! {
    include => "include",
    exclude => "exclude",
    include_resolved => "includeResolved",
    include_unresolved => "includeUnresolved",
    include_nested => "includeNested",
    descend_resolved => "descendResolved",
    descend_unresolved => "descendUnresolved",
    descend_interfaces => "descendInterfaces",
    descend_interface_types => "descendInterfaceTypes",
    descend_into => "descendInto",
    ignore_unknown_types => "ignoreUnknownTypes",
    indentation => "indentation",
    prefix => "prefix",
    suffix => "suffix",
    name => "name",
    alias => "alias",
    debug => "debug",
    blame => "blame",
}

impl Options {
    /// `alias`, or `prefix + (name or the entity name) + suffix`.
    pub fn fragment_name(&self, entity_name: &str) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }

        let prefix = self.prefix.as_deref().unwrap_or_default();
        let name = self.name.as_deref().unwrap_or(entity_name);
        let suffix = self.suffix.as_deref().unwrap_or_default();

        format!("{prefix}{name}{suffix}")
    }

    pub fn is_field_visible(&self, field_name: &str, field: &FieldDescriptor) -> bool {
        let names = [field_name, field.target_type.as_str()];

        if self.exclude.iter().any(|excluded| names.contains(&excluded.as_str())) {
            return false;
        }

        if self.include.iter().any(|included| names.contains(&included.as_str())) {
            return true;
        }

        match field.resolved {
            Some(true) if !self.include_resolved => return false,
            Some(false) if !self.include_unresolved => return false,
            _ => (),
        }

        !field.nested || self.include_nested
    }

    /// Whether a nested field is inlined. The interface restriction is applied separately, as
    /// it depends on the target entity.
    pub fn should_descend_field(&self, field_name: &str, field: &FieldDescriptor) -> bool {
        match self.descend_into {
            DescendInto::Always => true,
            DescendInto::Never => false,
            DescendInto::Listed(_) => {
                let by_resolution = match field.resolved {
                    Some(true) => self.descend_resolved,
                    Some(false) => self.descend_unresolved,
                    None => false,
                };

                by_resolution || self.descend_into.lists(&[field_name, field.target_type.as_str()])
            }
        }
    }

    /// Interfaces and unions are inlined only when enabled or explicitly asked for.
    pub fn may_descend_polymorphic(&self, field_name: &str, type_name: &str) -> bool {
        self.descend_interfaces || self.descend_into.explicitly_allows(&[type_name, field_name])
    }

    pub fn should_descend_variant(&self, variant: &str) -> bool {
        match self.descend_into {
            DescendInto::Always => true,
            DescendInto::Never => false,
            DescendInto::Listed(_) => self.descend_interface_types || self.descend_into.lists(&[variant]),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults() {
        let options = Options::default();

        assert!(options.include_resolved);
        assert!(options.include_unresolved);
        assert!(options.include_nested);
        assert!(options.descend_resolved);
        assert!(!options.descend_unresolved);
        assert!(!options.descend_interfaces);
        assert!(!options.descend_interface_types);
        assert_eq!(options.descend_into, DescendInto::Listed(Vec::new()));
        assert!(!options.ignore_unknown_types);
        assert_eq!(options.indentation, "  ");
        assert_eq!(options.fragment_name("Order"), "Order");
        assert!(!options.debug);
    }

    #[test]
    fn type_overrides_are_flattened() {
        let patch = OptionsPatch::from_json(json!({
            "descendResolved": false,
            "Order": {
                "includeNested": false,
                "Address": { "prefix": "Order" }
            }
        }))
        .unwrap();

        assert_eq!(patch.descend_resolved, Some(false));
        assert_eq!(patch.types["Order"].include_nested, Some(false));
        assert_eq!(patch.types["Order"].types["Address"].prefix.as_deref(), Some("Order"));
    }

    #[test]
    fn descend_into_forms() {
        let parse = |value| OptionsPatch::from_json(json!({ "descendInto": value })).map(|patch| patch.descend_into);

        assert_eq!(parse(json!(true)).unwrap(), Some(DescendInto::Always));
        assert_eq!(parse(json!("always")).unwrap(), Some(DescendInto::Always));
        assert_eq!(parse(json!("never")).unwrap(), Some(DescendInto::Never));
        assert_eq!(parse(json!(false)).unwrap(), Some(DescendInto::Listed(Vec::new())));
        assert_eq!(
            parse(json!(["User", "creator"])).unwrap(),
            Some(DescendInto::Listed(vec!["User".into(), "creator".into()]))
        );

        let error = parse(json!("sometimes")).unwrap_err();
        assert!(error.to_string().contains("`descendInto` option"), "{error}");

        let error = parse(json!(["User", 3])).unwrap_err();
        assert!(error.to_string().contains("`descendInto` option"), "{error}");
    }

    #[test]
    fn indentation_must_be_a_string() {
        let error = OptionsPatch::from_json(json!({ "indentation": 4 })).unwrap_err();

        assert!(matches!(error, ConfigurationError::Json(_)));
        assert!(error.to_string().contains("must be a string"), "{error}");
    }

    #[test]
    fn from_toml() {
        let patch = OptionsPatch::from_toml(
            r#"
            descendResolved = false
            descendInto = ["Address"]

            [Order]
            suffix = "Summary"
            "#,
        )
        .unwrap();

        assert_eq!(patch.descend_resolved, Some(false));
        assert_eq!(patch.descend_into, Some(DescendInto::Listed(vec!["Address".into()])));
        assert_eq!(patch.types["Order"].suffix.as_deref(), Some("Summary"));
    }

    #[test]
    fn hash_is_order_independent() {
        let first = OptionsPatch::from_json(json!({
            "descendResolved": false,
            "prefix": "A",
            "Order": { "includeNested": false },
            "Client": { "suffix": "B" }
        }))
        .unwrap();

        let second = OptionsPatch::from_json(json!({
            "Client": { "suffix": "B" },
            "Order": { "includeNested": false },
            "prefix": "A",
            "descendResolved": false
        }))
        .unwrap();

        let hash = first.hash();

        assert_eq!(hash.len(), 6);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_eq!(hash, second.hash());
        assert_ne!(hash, OptionsPatch::default().with_type("Order", first.clone()).hash());
        assert_eq!(OptionsPatch::default().hash(), "");
    }

    #[test]
    fn name_and_alias_are_targeted_only() {
        let patch = OptionsPatch {
            alias: Some("Foo".into()),
            ..Default::default()
        };
        assert!(matches!(
            patch.ensure_untargeted(),
            Err(ConfigurationError::TargetedOnly("alias"))
        ));

        let patch = OptionsPatch::default().with_type(
            "Order",
            OptionsPatch {
                name: Some("Purchase".into()),
                ..Default::default()
            },
        );
        assert!(patch.ensure_untargeted().is_ok());
    }

    #[test]
    fn fragment_names() {
        let mut options = Options {
            prefix: Some("Admin".into()),
            suffix: Some("Fields".into()),
            ..Default::default()
        };
        assert_eq!(options.fragment_name("Order"), "AdminOrderFields");

        options.name = Some("Purchase".into());
        assert_eq!(options.fragment_name("Order"), "AdminPurchaseFields");

        options.alias = Some("Everything".into());
        assert_eq!(options.fragment_name("Order"), "Everything");
    }

    #[test]
    fn visibility() {
        let resolved = FieldDescriptor::scalar("ID").with_resolved(true);
        let unresolved = FieldDescriptor::nested("User").with_resolved(false);
        let unknown = FieldDescriptor::nested("Address");

        let options = Options {
            include_resolved: false,
            include_unresolved: false,
            ..Default::default()
        };
        assert!(!options.is_field_visible("id", &resolved));
        assert!(!options.is_field_visible("creator", &unresolved));
        assert!(options.is_field_visible("address", &unknown));

        let options = Options {
            include_resolved: false,
            include: vec!["id".into()],
            exclude: vec!["User".into()],
            ..Default::default()
        };
        assert!(options.is_field_visible("id", &resolved));
        assert!(!options.is_field_visible("creator", &unresolved));

        let options = Options {
            include_nested: false,
            ..Default::default()
        };
        assert!(!options.is_field_visible("address", &unknown));
        assert!(options.is_field_visible("id", &resolved));
    }
}
