use std::collections::BTreeMap;

use indexmap::IndexMap;
use itertools::Itertools;

use super::{Options, OptionsPatch, OPTION_KEYS};
use crate::ConfigurationError;

/// For every option key, the tier that set it last: `default`, `base`, `invocation`, a type
/// name or `Level N`.
pub type Blame = IndexMap<&'static str, String>;

#[derive(Clone)]
struct Layer {
    options: Options,
    // Type overrides visible from this point of the traversal.
    overrides: BTreeMap<String, OptionsPatch>,
    blame: Blame,
}

impl Layer {
    fn apply(&mut self, patch: &OptionsPatch, source: &str) {
        self.options.apply(patch, &mut self.blame, source);
        self.overrides
            .extend(patch.types.iter().map(|(name, patch)| (name.clone(), patch.clone())));
    }

    fn clear_targeted(&mut self) {
        for (key, option) in [("name", &mut self.options.name), ("alias", &mut self.options.alias)] {
            if option.take().is_some() {
                self.blame.insert(key, String::from("default"));
            }
        }
    }
}

/// Computes the effective [`Options`] along a path of entity names.
///
/// The cascade is: defaults, base, invocation, then for each entity of the path the override
/// found under its name in the configuration merged so far, followed by the `levels` entry of
/// that depth. `name` and `alias` only apply to the entity whose override sets them.
pub struct OptionsResolver {
    levels: Vec<OptionsPatch>,
    path: Vec<String>,
    // One more layer than path entries: the root layer holds base and invocation.
    stack: Vec<Layer>,
}

impl OptionsResolver {
    pub fn new(base: &OptionsPatch, invocation: &OptionsPatch) -> Result<Self, ConfigurationError> {
        base.ensure_untargeted()?;
        invocation.ensure_untargeted()?;

        let mut root = Layer {
            options: Options::default(),
            overrides: BTreeMap::new(),
            blame: OPTION_KEYS.iter().map(|key| (*key, String::from("default"))).collect(),
        };

        root.apply(base, "base");
        root.apply(invocation, "invocation");

        let levels = invocation
            .levels
            .as_ref()
            .or(base.levels.as_ref())
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            levels,
            path: Vec::new(),
            stack: vec![root],
        })
    }

    fn current(&self) -> &Layer {
        self.stack.last().expect("the root layer is never popped")
    }

    pub fn options(&self) -> &Options {
        &self.current().options
    }

    pub fn blame(&self) -> &Blame {
        &self.current().blame
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The path rendered as `A->B->C`.
    pub fn origin(&self) -> String {
        self.path.join("->")
    }

    pub fn fragment_name(&self, entity_name: &str) -> String {
        self.options().fragment_name(entity_name)
    }

    /// Enters `name`. Every push must be matched by a [`OptionsResolver::pop`].
    pub fn push(&mut self, name: &str) {
        let depth = self.path.len();
        let mut layer = self.current().clone();
        let targeted = layer.overrides.get(name).cloned();

        layer.clear_targeted();

        if let Some(patch) = targeted {
            layer.apply(&patch, name);
        }

        if let Some(level) = self.levels.get(depth) {
            layer.apply(level, &format!("Level {depth}"));
        }

        self.path.push(name.to_owned());
        self.stack.push(layer);

        tracing::trace!(origin = %self.origin(), "descending");
    }

    pub fn pop(&mut self) {
        if self.path.pop().is_some() {
            self.stack.pop();
        }
    }

    /// Runs `f` with `name` pushed onto the path. The path is restored whatever `f` returns.
    pub fn descend<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push(name);
        let output = f(self);
        self.pop();
        output
    }

    /// The provenance of every option, as rendered in debug comments.
    pub fn render_blame(&self) -> String {
        self.blame()
            .iter()
            .map(|(key, source)| format!("{key}: {source}"))
            .join(", ")
    }
}
