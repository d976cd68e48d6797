use std::collections::BTreeMap;

/// Edit-group labels shown to the user, by cleanup id.
///
/// Starts from built-in defaults; configured `[messages]` entries override
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTable {
    labels: BTreeMap<String, String>,
}

impl MessageTable {
    pub fn with_defaults<'a>(defaults: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            labels: defaults
                .into_iter()
                .map(|(id, label)| (id.to_string(), label.to_string()))
                .collect(),
        }
    }

    pub fn override_with(&mut self, overrides: &BTreeMap<String, String>) {
        for (id, label) in overrides {
            self.labels.insert(id.clone(), label.clone());
        }
    }

    /// Label for `id`, falling back to the id itself.
    pub fn label<'a>(&'a self, id: &'a str) -> &'a str {
        self.labels.get(id).map_or(id, String::as_str)
    }
}
