pub mod loader;
pub mod model;
pub mod selection;

pub use loader::{load_catalog, CatalogError};
pub use model::{Catalog, CatalogEntry, Category};
pub use selection::SelectionSet;

#[cfg(test)]
pub(crate) const SAMPLE: &str = r#"{
    "editor": {
        "main": [
            {"name": "Frosty Editor", "description": "Base", "url": "https://example.com/FrostyEditor.zip", "filename": "FrostyEditor.zip"}
        ],
        "plugins": [
            {"name": "A", "description": "Plugin A", "url": "https://example.com/a.dll", "filename": "Plugins/A.dll"},
            {"name": "B", "description": "Plugin B", "url": "https://example.com/b.dll", "filename": "Plugins/B.dll"}
        ],
        "other": [
            {"name": "C", "description": "Misc C", "url": "https://example.com/c.txt", "filename": "c.txt"}
        ]
    }
}"#;

#[cfg(test)]
pub(crate) fn sample_catalog() -> Catalog {
    loader::parse_catalog(SAMPLE).unwrap()
}
