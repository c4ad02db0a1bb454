use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Caller-supplied attributes of the customer behind a conversation thread.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl UserProfile {
    pub fn named(user_name: impl Into<String>) -> Self {
        Self { user_name: Some(user_name.into()), attributes: BTreeMap::new() }
    }

    pub fn display_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or("Customer")
    }
}
