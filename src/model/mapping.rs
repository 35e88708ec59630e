use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A learned association from the description a bank uses to the description, budget and category
/// the user prefers. Created by the caller after a successful submission, never by the import
/// pipeline itself.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NameMapping {
    pub(crate) original_name: String,
    pub(crate) new_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) budget_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) category_name: String,
}

impl NameMapping {
    pub fn new(
        original_name: impl Into<String>,
        new_name: impl Into<String>,
        budget_name: impl Into<String>,
        category_name: impl Into<String>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            new_name: new_name.into(),
            budget_name: budget_name.into(),
            category_name: category_name.into(),
        }
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    pub fn budget_name(&self) -> &str {
        &self.budget_name
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }
}

/// A snapshot of the mapping store, keyed uniquely on `original_name`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameMappings(BTreeMap<String, NameMapping>);

impl NameMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `mapping`, replacing any mapping with the same `original_name`.
    pub fn insert(&mut self, mapping: NameMapping) {
        self.0.insert(mapping.original_name.clone(), mapping);
    }

    pub fn get(&self, original_name: &str) -> Option<&NameMapping> {
        self.0.get(original_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NameMapping> {
        self.0.values()
    }
}

impl FromIterator<NameMapping> for NameMappings {
    fn from_iter<T: IntoIterator<Item = NameMapping>>(iter: T) -> Self {
        let mut mappings = NameMappings::new();
        for mapping in iter {
            mappings.insert(mapping);
        }
        mappings
    }
}
