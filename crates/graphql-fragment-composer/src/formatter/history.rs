use std::collections::HashSet;

/// The fragment names rendered so far, so each name gets at most one definition.
#[derive(Clone, Debug, Default)]
pub struct RenderHistory {
    rendered: HashSet<String>,
}

impl RenderHistory {
    /// `true` the first time `name` is seen, `false` afterwards.
    pub fn render_once(&mut self, name: &str) -> bool {
        if self.rendered.contains(name) {
            return false;
        }

        self.rendered.insert(name.to_owned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rendered.contains(name)
    }

    pub fn reset(&mut self) {
        self.rendered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::RenderHistory;

    #[test]
    fn renders_once_until_reset() {
        let mut history = RenderHistory::default();

        assert!(history.render_once("Order"));
        assert!(!history.render_once("Order"));
        assert!(history.render_once("Client"));
        assert!(history.contains("Order"));

        history.reset();

        assert!(!history.contains("Order"));
        assert!(history.render_once("Order"));
    }
}
