use std::collections::HashMap;
use std::sync::Arc;

use crate::action::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two actions share a name.
    Duplicate(String),
    /// An action has an empty name.
    EmptyName,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Duplicate(name) => write!(f, "action '{name}' registered twice"),
            RegistryError::EmptyName => write!(f, "action name must not be empty"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Immutable name to action mapping, built once at startup.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Action>> {
        self.actions.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Default)]
pub struct ActionRegistryBuilder {
    actions: Vec<Arc<dyn Action>>,
}

impl ActionRegistryBuilder {
    pub fn register(mut self, action: impl Action) -> Self {
        self.actions.push(Arc::new(action));
        self
    }

    pub fn register_arc(mut self, action: Arc<dyn Action>) -> Self {
        self.actions.push(action);
        self
    }

    /// Fails on the first empty or repeated name.
    pub fn build(self) -> Result<ActionRegistry, RegistryError> {
        let mut actions = HashMap::with_capacity(self.actions.len());
        for action in self.actions {
            let name = action.name().to_string();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if actions.contains_key(&name) {
                return Err(RegistryError::Duplicate(name));
            }
            actions.insert(name, action);
        }
        Ok(ActionRegistry { actions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{action_fn, ActionResponse};

    fn noop(name: &str) -> impl Action {
        action_fn(name, false, |_| async { Ok(ActionResponse::json(())) })
    }

    #[test]
    fn builds_and_looks_up() {
        let registry = ActionRegistry::builder()
            .register(noop("b"))
            .register(noop("a"))
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
        assert_eq!(registry.names(), vec!["a", "b"]);
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = ActionRegistry::builder()
            .register(noop("get_version"))
            .register(noop("get_version"))
            .build()
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::Duplicate("get_version".into()));
    }

    #[test]
    fn empty_name_rejected() {
        let err = ActionRegistry::builder().register(noop("")).build().err().unwrap();
        assert_eq!(err, RegistryError::EmptyName);
    }
}
