use std::collections::HashMap;

use super::model::{Catalog, CatalogEntry, Category};

/// Live toggle state for the plugin and misc-file lists.
///
/// The main entry is not tracked here. It is always part of the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    toggles: HashMap<(Category, String), bool>,
}

impl SelectionSet {
    /// Every togglable entry starts enabled.
    pub fn new(catalog: &Catalog) -> Self {
        let toggles = Category::ALL
            .iter()
            .flat_map(|&category| {
                catalog
                    .entries(category)
                    .iter()
                    .map(move |entry| ((category, entry.name.clone()), true))
            })
            .collect();
        Self { toggles }
    }

    pub fn is_enabled(&self, category: Category, name: &str) -> bool {
        self.toggles
            .get(&(category, name.to_string()))
            .copied()
            .unwrap_or(false)
    }

    /// Unknown names are ignored so a stale UI message cannot add entries.
    pub fn set(&mut self, category: Category, name: &str, enabled: bool) {
        if let Some(toggle) = self.toggles.get_mut(&(category, name.to_string())) {
            *toggle = enabled;
        }
    }

    /// Enabled names of one list, in catalog declaration order.
    pub fn enabled_names(&self, catalog: &Catalog, category: Category) -> Vec<String> {
        catalog
            .entries(category)
            .iter()
            .filter(|entry| self.is_enabled(category, &entry.name))
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Owned copy of every enabled entry: plugins first, then misc files.
    pub fn snapshot(&self, catalog: &Catalog) -> Vec<CatalogEntry> {
        Category::ALL
            .iter()
            .flat_map(|&category| {
                catalog
                    .entries(category)
                    .iter()
                    .filter(move |entry| self.is_enabled(category, &entry.name))
                    .cloned()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_catalog;

    #[test]
    fn test_everything_enabled_by_default() {
        let catalog = sample_catalog();
        let selection = SelectionSet::new(&catalog);
        assert_eq!(
            selection.enabled_names(&catalog, Category::Plugins),
            vec!["A", "B"]
        );
        assert_eq!(selection.enabled_names(&catalog, Category::Other), vec!["C"]);
    }

    #[test]
    fn test_order_follows_catalog_not_interaction() {
        let catalog = sample_catalog();
        let mut selection = SelectionSet::new(&catalog);
        selection.set(Category::Plugins, "B", false);
        selection.set(Category::Plugins, "A", false);
        selection.set(Category::Plugins, "B", true);
        selection.set(Category::Plugins, "A", true);
        assert_eq!(
            selection.enabled_names(&catalog, Category::Plugins),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_toggles() {
        let catalog = sample_catalog();
        let mut selection = SelectionSet::new(&catalog);
        selection.set(Category::Plugins, "B", false);

        let snapshot = selection.snapshot(&catalog);
        selection.set(Category::Plugins, "B", true);
        selection.set(Category::Other, "C", false);

        let names: Vec<_> = snapshot.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_main_entry_is_not_togglable() {
        let catalog = sample_catalog();
        let mut selection = SelectionSet::new(&catalog);
        let main = catalog.main().name.clone();

        selection.set(Category::Plugins, &main, true);
        assert!(!selection.is_enabled(Category::Plugins, &main));
        assert!(selection
            .snapshot(&catalog)
            .iter()
            .all(|entry| entry.name != main));
    }

    #[test]
    fn test_categories_do_not_share_toggles() {
        let raw = crate::catalog::SAMPLE.replace("\"name\": \"C\"", "\"name\": \"A\"");
        let catalog = crate::catalog::loader::parse_catalog(&raw).unwrap();
        let mut selection = SelectionSet::new(&catalog);

        selection.set(Category::Other, "A", false);
        assert!(selection.is_enabled(Category::Plugins, "A"));
        assert!(!selection.is_enabled(Category::Other, "A"));
    }
}
