use serde::{Deserialize, Serialize};

/// One selectable download: where it comes from and where it lands in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub url: String,
    pub filename: String,
}

/// Validated catalog. Built only by `parse_catalog`, so there is always
/// exactly one main entry.
#[derive(Debug, Clone)]
pub struct Catalog {
    main: CatalogEntry,
    plugins: Vec<CatalogEntry>,
    other: Vec<CatalogEntry>,
}

/// The user-togglable parts of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Plugins,
    Other,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Plugins, Category::Other];

    pub fn title(self) -> &'static str {
        match self {
            Category::Plugins => "Plugins",
            Category::Other => "Misc Files",
        }
    }
}

impl Catalog {
    pub(super) fn new(
        main: CatalogEntry,
        plugins: Vec<CatalogEntry>,
        other: Vec<CatalogEntry>,
    ) -> Self {
        Self {
            main,
            plugins,
            other,
        }
    }

    /// The base archive descriptor.
    pub fn main(&self) -> &CatalogEntry {
        &self.main
    }

    pub fn entries(&self, category: Category) -> &[CatalogEntry] {
        match category {
            Category::Plugins => &self.plugins,
            Category::Other => &self.other,
        }
    }
}
