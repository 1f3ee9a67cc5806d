//! Class-name ignore lists.
//!
//! Host frameworks create and tear down some nodes on their own schedule
//! (keyboard surfaces, input assistants, system overlay windows). Those would
//! be reported as leaks on every run, so their class names are suppressed.

use std::collections::{BTreeSet, HashSet};
use std::sync::{PoisonError, RwLock};

use leakwatch_types::NodeKind;
use tracing::debug;

use crate::config::IgnoreListConfig;

/// Framework-internal container classes.
pub const DEFAULT_IGNORED_CONTAINERS: &[&str] = &[
    "UICompatibilityInputViewController",
    "_SFAppPasswordSavingViewController",
    "UIKeyboardHiddenViewController_Save",
    "_UIAlertControllerTextFieldViewController",
    "UISystemInputAssistantViewController",
    "UIPredictionViewController",
    "UIEditingOverlayViewController",
    "UIInputWindowController",
];

/// Framework-internal leaf classes.
pub const DEFAULT_IGNORED_LEAVES: &[&str] = &[
    "PLTileContainerView",
    "CAMPreviewView",
    "_UIPointerInteractionAssistantEffectContainerView",
];

/// Framework-internal root container classes.
pub const DEFAULT_IGNORED_ROOT_CONTAINERS: &[&str] =
    &["UIRemoteKeyboardWindow", "UITextEffectsWindow"];

/// Three class-name sets, one per node kind.
///
/// Reads are hash lookups. Writes only happen from configuration calls,
/// never from the detection path.
#[derive(Debug)]
pub struct IgnoreRegistry {
    containers: RwLock<HashSet<String>>,
    leaves: RwLock<HashSet<String>>,
    root_containers: RwLock<HashSet<String>>,
}

impl Default for IgnoreRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl IgnoreRegistry {
    /// A registry with no entries at all.
    pub fn empty() -> Self {
        Self {
            containers: RwLock::new(HashSet::new()),
            leaves: RwLock::new(HashSet::new()),
            root_containers: RwLock::new(HashSet::new()),
        }
    }

    /// A registry pre-populated with the built-in framework classes.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        registry.extend(NodeKind::Container, DEFAULT_IGNORED_CONTAINERS.iter().copied());
        registry.extend(NodeKind::Leaf, DEFAULT_IGNORED_LEAVES.iter().copied());
        registry.extend(
            NodeKind::RootContainer,
            DEFAULT_IGNORED_ROOT_CONTAINERS.iter().copied(),
        );
        registry
    }

    /// Built-in lists plus the names from configuration.
    pub fn from_config(config: &IgnoreListConfig) -> Self {
        let registry = Self::with_defaults();
        registry.extend(NodeKind::Container, config.containers.iter().cloned());
        registry.extend(NodeKind::Leaf, config.leaves.iter().cloned());
        registry.extend(NodeKind::RootContainer, config.root_containers.iter().cloned());
        registry
    }

    /// Whether `class_name` is ignored for nodes of `kind`.
    pub fn contains(&self, class_name: &str, kind: NodeKind) -> bool {
        self.set(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(class_name)
    }

    /// Add one class name. Returns false if it was already present.
    pub fn insert(&self, kind: NodeKind, class_name: impl Into<String>) -> bool {
        let class_name = class_name.into();
        debug!(kind = %kind, class_name = %class_name, "Ignoring class name");
        self.set(kind)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(class_name)
    }

    pub fn extend<I, S>(&self, kind: NodeKind, class_names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = self.set(kind).write().unwrap_or_else(PoisonError::into_inner);
        set.extend(class_names.into_iter().map(Into::into));
    }

    /// Sorted copy of the ignored container classes.
    pub fn containers(&self) -> BTreeSet<String> {
        self.snapshot(NodeKind::Container)
    }

    /// Sorted copy of the ignored leaf classes.
    pub fn leaves(&self) -> BTreeSet<String> {
        self.snapshot(NodeKind::Leaf)
    }

    /// Sorted copy of the ignored root container classes.
    pub fn root_containers(&self) -> BTreeSet<String> {
        self.snapshot(NodeKind::RootContainer)
    }

    fn snapshot(&self, kind: NodeKind) -> BTreeSet<String> {
        self.set(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn set(&self, kind: NodeKind) -> &RwLock<HashSet<String>> {
        match kind {
            NodeKind::Container => &self.containers,
            NodeKind::Leaf => &self.leaves,
            NodeKind::RootContainer => &self.root_containers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_are_populated() {
        let registry = IgnoreRegistry::with_defaults();

        assert!(registry
            .containers()
            .contains("UICompatibilityInputViewController"));
        assert!(registry.containers().contains("UIPredictionViewController"));
        assert!(registry.leaves().contains("CAMPreviewView"));
        assert!(registry.root_containers().contains("UIRemoteKeyboardWindow"));
        assert!(registry.root_containers().contains("UITextEffectsWindow"));
    }

    #[test]
    fn test_lookup_is_per_kind() {
        let registry = IgnoreRegistry::with_defaults();

        assert!(registry.contains("CAMPreviewView", NodeKind::Leaf));
        assert!(!registry.contains("CAMPreviewView", NodeKind::Container));
        assert!(!registry.contains("UITextEffectsWindow", NodeKind::Leaf));
    }

    #[test]
    fn test_default_sets_are_disjoint() {
        let registry = IgnoreRegistry::with_defaults();
        let containers = registry.containers();
        let leaves = registry.leaves();
        let roots = registry.root_containers();

        assert!(containers.is_disjoint(&leaves));
        assert!(containers.is_disjoint(&roots));
        assert!(leaves.is_disjoint(&roots));
    }

    #[test]
    fn test_from_config_extends_defaults() {
        let config = IgnoreListConfig {
            containers: vec!["SplashController".to_string()],
            leaves: vec![],
            root_containers: vec!["DebugOverlayWindow".to_string()],
        };
        let registry = IgnoreRegistry::from_config(&config);

        assert!(registry.contains("SplashController", NodeKind::Container));
        assert!(registry.contains("DebugOverlayWindow", NodeKind::RootContainer));
        assert!(registry.contains("UIPredictionViewController", NodeKind::Container));
    }

    #[test]
    fn test_insert_reports_duplicates() {
        let registry = IgnoreRegistry::empty();
        assert!(registry.insert(NodeKind::Leaf, "ShimmerView"));
        assert!(!registry.insert(NodeKind::Leaf, "ShimmerView"));
        assert_eq!(registry.leaves().len(), 1);
    }

    proptest! {
        #[test]
        fn inserted_names_are_found_only_for_their_kind(name in "[A-Za-z_][A-Za-z0-9_]{0,24}") {
            let registry = IgnoreRegistry::empty();
            registry.insert(NodeKind::Leaf, name.clone());

            prop_assert!(registry.contains(&name, NodeKind::Leaf));
            prop_assert!(!registry.contains(&name, NodeKind::Container));
            prop_assert!(!registry.contains(&name, NodeKind::RootContainer));
        }
    }
}
