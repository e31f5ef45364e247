//! Section/value configuration model.
//!
//! A risk definition is configured as a named section holding ordered
//! `key = value` pairs and ordered nested sections (parameters, and the
//! `var` section of named expressions). Declaration order matters:
//! variables see only the variables declared before them.

/// One configuration section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    pub name: String,
    pub values: Vec<(String, String)>,
    pub sections: Vec<Section>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value of `key`, or `""` if unset. The last assignment wins.
    pub fn value(&self, key: &str) -> &str {
        self.values
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// First nested section named `name`.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.push((key.into(), value.into()));
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }
}

/// Split a comma list and trim each token.
///
/// Empty fields (`a,,b`) are skipped, but a field holding only blanks stays
/// as `""` so positional lists keep their alignment.
pub fn split_list(s: &str) -> Vec<&str> {
    s.split(',')
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches([' ', '\t', '\r']))
        .collect()
}
