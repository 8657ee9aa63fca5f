use indexmap::{map::Entry, IndexMap};
use itertools::Itertools;

use crate::{Error, Formatter, OptionsPatch, RenderHistory};

/// Collects fragments call by call, for documents that spread fragments in several places.
///
/// Each [`Importer::inline`] call returns a fragment spread and records the fragment with
/// everything it requires. [`Importer::fragments`] then gives the definitions to append to the
/// document. Fragments rendered by one call are referenced, not rendered again, by later ones.
pub struct Importer<'a> {
    formatter: &'a Formatter,
    hashing: bool,
    history: RenderHistory,
    collected: IndexMap<String, String>,
}

impl<'a> Importer<'a> {
    pub fn new(formatter: &'a Formatter) -> Self {
        Self {
            formatter,
            hashing: true,
            history: RenderHistory::default(),
            collected: IndexMap::new(),
        }
    }

    /// With hashing on (the default), fragments rendered with non-empty options get a suffix
    /// derived from those options, unless the options set one.
    pub fn with_hashing(mut self, hashing: bool) -> Self {
        self.hashing = hashing;
        self
    }

    /// Renders `entity_name` with `options` on top of the formatter's base configuration and
    /// returns the spread `... FragmentName`.
    pub fn inline(&mut self, entity_name: &str, mut options: OptionsPatch) -> Result<String, Error> {
        if self.hashing && options.suffix.is_none() {
            let hash = options.hash();

            if !hash.is_empty() {
                options.suffix = Some(hash);
            }
        }

        // A failed call must not mark fragments it never hands over.
        let mut history = self.history.clone();
        let fragment = self
            .formatter
            .traverse(&mut history, &options)?
            .format_root(entity_name)?;

        self.history = history;

        let spread = format!("... {}", fragment.name);

        if let Some(text) = fragment.text {
            self.collect(fragment.name, text);
        }

        for (name, text) in fragment.dependencies {
            self.collect(name, text);
        }

        Ok(spread)
    }

    fn collect(&mut self, name: String, text: String) {
        match self.collected.entry(name) {
            Entry::Occupied(entry) => {
                if *entry.get() != text {
                    tracing::warn!(
                        fragment = %entry.key(),
                        "fragment rendered again with a different selection, keeping the first one"
                    );
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(text);
            }
        }
    }

    pub fn fragment_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.collected.keys().map(String::as_str)
    }

    /// Every collected fragment definition, separated by newlines.
    pub fn fragments(&self) -> String {
        self.collected.values().join("\n")
    }
}
