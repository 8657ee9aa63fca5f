//! Renders entities of an [`EntityGraph`] as GraphQL fragment definitions.
//!
//! Every nested field is either inlined as a selection set or referenced through a fragment
//! spread, following the [`Options`](crate::Options) in effect at that point of the traversal.
//! Referenced fragments are returned alongside the requested one as dependencies.
//!
//! Nothing stops a configuration from inlining a self-referencing type forever: with
//! `descendInto: "always"` over a cycle, formatting recurses until the stack overflows.

mod history;
mod traversal;

pub use history::RenderHistory;
pub use traversal::Dependencies;

use indexmap::IndexMap;
use itertools::Itertools;

use self::traversal::Traversal;
use crate::{analyze, ConfigurationError, EntityGraph, Error, OptionsPatch, OptionsResolver, Resolvers};

/// One rendered fragment and the fragments it requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    /// The entity the fragment applies to.
    pub type_name: String,
    /// `None` when the fragment was already emitted earlier in the same request.
    pub text: Option<String>,
    /// Fragments referenced from this one, transitively.
    pub dependencies: Dependencies,
}

impl Fragment {
    pub fn is_rendered(&self) -> bool {
        self.text.is_some()
    }
}

/// The result of formatting several entities with one shared render-once history.
///
/// Every fragment name appears once: a requested entity that is also required by another one
/// is only listed among the roots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentSet {
    pub roots: IndexMap<String, String>,
    pub dependencies: Dependencies,
}

impl FragmentSet {
    fn insert(&mut self, fragment: Fragment) {
        if let Some(text) = fragment.text {
            self.dependencies.shift_remove(&fragment.name);
            self.roots.insert(fragment.name, text);
        }

        for (name, text) in fragment.dependencies {
            if !self.roots.contains_key(&name) {
                self.dependencies.entry(name).or_insert(text);
            }
        }
    }

    /// Roots followed by dependencies, in one mapping.
    pub fn combined(&self) -> IndexMap<String, String> {
        self.roots
            .iter()
            .chain(&self.dependencies)
            .map(|(name, text)| (name.clone(), text.clone()))
            .collect()
    }

    /// The names of the fragments required by the roots.
    pub fn requires(&self) -> impl Iterator<Item = &str> + '_ {
        self.dependencies.keys().map(String::as_str)
    }

    /// Every fragment definition, separated by newlines.
    pub fn to_document(&self) -> String {
        self.roots.values().chain(self.dependencies.values()).join("\n")
    }
}

/// Formats entities of a graph with a base configuration, overridable per request.
pub struct Formatter {
    graph: EntityGraph,
    base: OptionsPatch,
}

impl Formatter {
    pub fn new(graph: EntityGraph, base: OptionsPatch) -> Result<Self, ConfigurationError> {
        base.ensure_untargeted()?;

        tracing::debug!(entities = graph.len(), "formatter ready");

        Ok(Self { graph, base })
    }

    /// Analyzes `sdl` and builds a formatter over the result.
    pub fn from_sdl(sdl: &str, resolvers: Option<&Resolvers>, base: OptionsPatch) -> Result<Self, Error> {
        let graph = analyze(sdl, resolvers)?;
        Ok(Self::new(graph, base)?)
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn base(&self) -> &OptionsPatch {
        &self.base
    }

    pub(crate) fn traverse<'a>(
        &'a self,
        history: &'a mut RenderHistory,
        invocation: &OptionsPatch,
    ) -> Result<Traversal<'a>, ConfigurationError> {
        let resolver = OptionsResolver::new(&self.base, invocation)?;
        Ok(Traversal::new(&self.graph, resolver, history))
    }

    /// Renders the fragment of `entity_name` and every fragment it references.
    pub fn format(&self, entity_name: &str, invocation: OptionsPatch) -> Result<Fragment, Error> {
        let mut history = RenderHistory::default();
        self.traverse(&mut history, &invocation)?.format_root(entity_name)
    }

    /// Renders several entities. A fragment required from several places is rendered once.
    pub fn format_many<I>(&self, entity_names: I, invocation: OptionsPatch) -> Result<FragmentSet, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut history = RenderHistory::default();
        let mut traversal = self.traverse(&mut history, &invocation)?;
        let mut set = FragmentSet::default();

        for entity_name in entity_names {
            set.insert(traversal.format_root(entity_name.as_ref())?);
        }

        Ok(set)
    }

    /// Renders every entity of the graph, in declaration order.
    pub fn format_all(&self, invocation: OptionsPatch) -> Result<FragmentSet, Error> {
        self.format_many(self.graph.names(), invocation)
    }
}
