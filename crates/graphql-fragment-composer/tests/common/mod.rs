#![allow(dead_code)]

use graphql_fragment_composer::{Formatter, OptionsPatch, Resolvers};

pub const SCHEMA: &str = include_str!("schema.graphql");

pub fn resolvers() -> Resolvers {
    Resolvers::from_json(serde_json::json!({
        "Order": ["creator", "client"],
        "ClientUser": ["client"],
        "Client": ["users", "orders"]
    }))
    .unwrap()
}

pub fn patch(value: serde_json::Value) -> OptionsPatch {
    OptionsPatch::from_json(value).unwrap()
}

/// A formatter over the fixture schema, with resolver metadata.
pub fn formatter(base: serde_json::Value) -> Formatter {
    Formatter::from_sdl(SCHEMA, Some(&resolvers()), patch(base)).unwrap()
}

/// Same, without resolver metadata: every field has an unknown resolution status.
pub fn formatter_without_resolvers(base: serde_json::Value) -> Formatter {
    Formatter::from_sdl(SCHEMA, None, patch(base)).unwrap()
}
