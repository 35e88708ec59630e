use serde::{Deserialize, Serialize};

/// A ledger account, e.g. a checking account that statements are imported into.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Account {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) r#type: String,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            r#type: r#type.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn r#type(&self) -> &str {
        &self.r#type
    }
}

/// A named classification label held by the ledger: a budget or a category.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Label {
    pub(crate) id: String,
    pub(crate) name: String,
}

impl Label {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The budgets and categories that exist in the ledger, offered to the user when editing a batch.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Labels {
    pub(crate) budgets: Vec<Label>,
    pub(crate) categories: Vec<Label>,
}

impl Labels {
    pub fn new(budgets: Vec<Label>, categories: Vec<Label>) -> Self {
        Self {
            budgets,
            categories,
        }
    }

    pub fn budgets(&self) -> &[Label] {
        &self.budgets
    }

    pub fn categories(&self) -> &[Label] {
        &self.categories
    }
}
