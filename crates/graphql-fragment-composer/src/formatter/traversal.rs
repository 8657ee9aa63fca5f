use indexmap::IndexMap;
use itertools::Itertools;

use super::{Fragment, RenderHistory};
use crate::{
    graph::{Entity, EntityKind, Fields},
    EntityGraph, Error, OptionsResolver,
};

/// Fragment bodies keyed by fragment name, each listed before the fragments it requires.
pub type Dependencies = IndexMap<String, String>;

/// The state of one formatting request: the resolver path stack and the render-once history.
pub(crate) struct Traversal<'a> {
    graph: &'a EntityGraph,
    resolver: OptionsResolver,
    history: &'a mut RenderHistory,
}

/// The lines of a selection set being built, and what they reference.
#[derive(Default)]
struct Selections {
    lines: Vec<String>,
    field_count: usize,
    dependencies: Dependencies,
}

impl Selections {
    fn push(&mut self, selection: Selection) {
        self.lines.push(selection.text);
        self.field_count += 1;

        for (name, text) in selection.dependencies {
            self.dependencies.entry(name).or_insert(text);
        }
    }
}

struct Selection {
    text: String,
    dependencies: Dependencies,
}

impl Selection {
    fn leaf(name: &str) -> Self {
        Self {
            text: name.to_owned(),
            dependencies: Dependencies::new(),
        }
    }
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(graph: &'a EntityGraph, resolver: OptionsResolver, history: &'a mut RenderHistory) -> Self {
        Self {
            graph,
            resolver,
            history,
        }
    }

    /// Renders `entity_name` as a top-level fragment. Top-level fragments are rendered even if
    /// the same name was already emitted.
    pub(crate) fn format_root(&mut self, entity_name: &str) -> Result<Fragment, Error> {
        if !self.graph.contains(entity_name) {
            return Err(Error::UnknownRootType(entity_name.to_owned()));
        }

        self.descend(entity_name, |this| this.format_type(entity_name, true))
    }

    fn descend<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        self.resolver.push(name);
        let result = f(self);
        self.resolver.pop();
        result
    }

    fn format_type(&mut self, entity_name: &str, force_render: bool) -> Result<Fragment, Error> {
        let name = self.resolver.fragment_name(entity_name);
        let first_render = self.history.render_once(&name);

        if !first_render && !force_render {
            tracing::trace!(fragment = %name, "already rendered, referencing it");

            return Ok(Fragment {
                name,
                type_name: entity_name.to_owned(),
                text: None,
                dependencies: Dependencies::new(),
            });
        }

        let graph = self.graph;
        let entity = graph
            .get(entity_name)
            .ok_or_else(|| Error::UnknownRootType(entity_name.to_owned()))?;

        let indentation = self.resolver.options().indentation.clone();
        let mut selections = self.format_entity(entity)?;

        if selections.field_count == 0 {
            selections.lines.push(String::from("__typename"));
        }

        let text = format!(
            "fragment {name} on {entity_name} {{\n{}\n}}",
            indent(&selections.lines, &indentation)
        );

        tracing::trace!(fragment = %name, origin = %self.resolver.origin(), "rendered fragment");

        Ok(Fragment {
            name,
            type_name: entity_name.to_owned(),
            text: Some(text),
            dependencies: selections.dependencies,
        })
    }

    fn format_entity(&mut self, entity: &'a Entity) -> Result<Selections, Error> {
        match entity.kind() {
            EntityKind::Structured { fields } => self.format_fields(entity.name(), fields),
            EntityKind::Polymorphic { variants, .. } => self.format_variants(entity.name(), variants),
        }
    }

    /// Debug comments heading a selection set.
    fn annotations(&self) -> Selections {
        let options = self.resolver.options();
        let mut selections = Selections::default();

        if options.debug {
            selections.lines.push(format!("# Origin: {}", self.resolver.origin()));

            if options.blame {
                selections.lines.push(format!("# Blame: {}", self.resolver.render_blame()));
            }
        }

        selections
    }

    fn format_fields(&mut self, type_name: &str, fields: &'a Fields) -> Result<Selections, Error> {
        let graph = self.graph;
        let options = self.resolver.options().clone();
        let mut selections = self.annotations();

        for (field_name, field) in fields {
            if !options.is_field_visible(field_name, field) {
                continue;
            }

            if !field.nested {
                selections.push(Selection::leaf(field_name));
                continue;
            }

            // Checked before the descend decision: a reference to a missing type would have no
            // fragment to point to.
            let Some(target) = graph.get(&field.target_type) else {
                if options.ignore_unknown_types {
                    tracing::debug!(
                        %type_name,
                        %field_name,
                        target = %field.target_type,
                        "omitting field of unknown type"
                    );
                    continue;
                }

                return Err(Error::UnknownType {
                    name: field.target_type.clone(),
                    origin: format!("{type_name}.{field_name}"),
                });
            };

            let mut descend = options.should_descend_field(field_name, field);

            if descend && target.is_polymorphic() && !options.may_descend_polymorphic(field_name, target.name()) {
                descend = false;
            }

            let selection = self.descend(target.name(), |this| {
                if descend {
                    this.inline_selection(field_name, target)
                } else {
                    this.reference_selection(field_name, target.name()).map(Some)
                }
            })?;

            if let Some(selection) = selection {
                selections.push(selection);
            }
        }

        Ok(selections)
    }

    fn format_variants(&mut self, type_name: &str, variants: &'a [String]) -> Result<Selections, Error> {
        let graph = self.graph;
        let options = self.resolver.options().clone();
        let mut selections = self.annotations();

        for variant in variants {
            let Some(target) = graph.get(variant) else {
                if options.ignore_unknown_types {
                    tracing::debug!(%variant, parent = %type_name, "omitting variant of unknown type");
                    continue;
                }

                return Err(Error::UnknownType {
                    name: variant.clone(),
                    origin: type_name.to_owned(),
                });
            };

            let head = format!("... on {variant}");
            let descend = options.should_descend_variant(variant);

            let selection = self.descend(variant, |this| {
                if descend {
                    this.inline_selection(&head, target)
                } else {
                    this.reference_selection(&head, variant).map(Some)
                }
            })?;

            if let Some(selection) = selection {
                selections.push(selection);
            }
        }

        Ok(selections)
    }

    /// `head { <fields of target> }`, or nothing if no field of the target is selected.
    fn inline_selection(&mut self, head: &str, target: &'a Entity) -> Result<Option<Selection>, Error> {
        let indentation = self.resolver.options().indentation.clone();
        let selections = self.format_entity(target)?;

        if selections.field_count == 0 {
            tracing::debug!(%head, origin = %self.resolver.origin(), "omitting empty selection");
            return Ok(None);
        }

        Ok(Some(Selection {
            text: format!("{head} {{\n{}\n}}", indent(&selections.lines, &indentation)),
            dependencies: selections.dependencies,
        }))
    }

    /// `head { ... Fragment }`, rendering the fragment unless it was already emitted.
    fn reference_selection(&mut self, head: &str, entity_name: &str) -> Result<Selection, Error> {
        let fragment = self.format_type(entity_name, false)?;
        let text = format!("{head} {{ ... {} }}", fragment.name);
        let mut dependencies = Dependencies::new();

        if let Some(body) = fragment.text {
            dependencies.insert(fragment.name, body);

            for (name, body) in fragment.dependencies {
                dependencies.entry(name).or_insert(body);
            }
        }

        Ok(Selection { text, dependencies })
    }
}

fn indent(lines: &[String], unit: &str) -> String {
    lines
        .iter()
        .flat_map(|line| line.split('\n'))
        .map(|line| format!("{unit}{line}"))
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::indent;

    #[test]
    fn indents_multiline_selections() {
        let lines = vec![String::from("id"), String::from("address {\n  city\n}")];

        assert_eq!(indent(&lines, "  "), "  id\n  address {\n    city\n  }");
        assert_eq!(indent(&lines, ""), "id\naddress {\n  city\n}");
    }
}
