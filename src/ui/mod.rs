use iced::{
    widget::{button, column, scrollable, text, toggler, Column, Space},
    Element, Length,
};

use crate::catalog::{Catalog, CatalogEntry, Category, SelectionSet};
use crate::domain::PipelineStage;

/// Main view state
pub struct CustomizerView {
    pub selection: SelectionSet,
    pub status_message: String,
    pub stage: PipelineStage,
    pub trigger_label: String,
}

impl CustomizerView {
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            selection: SelectionSet::new(catalog),
            status_message: "Pick the plugins and files to bundle, then press Download".to_string(),
            stage: PipelineStage::Idle,
            trigger_label: "Download".to_string(),
        }
    }

    pub fn can_trigger(&self) -> bool {
        !self.stage.is_busy()
    }
}

#[derive(Debug, Clone)]
pub enum CustomizerMessage {
    Toggled(Category, String, bool),
    DownloadPressed,
}

impl CustomizerView {
    pub fn update(&mut self, message: CustomizerMessage) {
        match message {
            CustomizerMessage::Toggled(category, name, enabled) => {
                self.selection.set(category, &name, enabled);
            }
            CustomizerMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view<'a>(&'a self, catalog: &'a Catalog) -> Element<'a, CustomizerMessage> {
        let editor = section(
            "Frosty Editor",
            vec![item(catalog.main(), true, None)],
        );

        let sections = Category::ALL.iter().map(|&category| {
            let items = catalog
                .entries(category)
                .iter()
                .map(|entry| {
                    let enabled = self.selection.is_enabled(category, &entry.name);
                    item(entry, enabled, Some(category))
                })
                .collect();
            section(category.title(), items)
        });

        let catalog_list = Column::new()
            .push(editor)
            .extend(sections)
            .spacing(24)
            .padding([0, 12]);

        let trigger = button(text(self.trigger_label.as_str()))
            .on_press_maybe(
                self.can_trigger()
                    .then_some(CustomizerMessage::DownloadPressed),
            )
            .padding([10, 20]);

        column![
            text("Frosty Customizer").size(32),
            Space::new().height(Length::Fixed(10.0)),
            scrollable(catalog_list).height(Length::Fill),
            Space::new().height(Length::Fixed(10.0)),
            text(&self.status_message).size(14),
            trigger,
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}

fn section<'a>(
    title: &'a str,
    items: Vec<Element<'a, CustomizerMessage>>,
) -> Element<'a, CustomizerMessage> {
    Column::new()
        .push(text(title).size(22))
        .extend(items)
        .spacing(12)
        .into()
}

/// One catalog entry. `category` is `None` for the main entry, whose toggle
/// is shown but cannot be changed.
fn item<'a>(
    entry: &'a CatalogEntry,
    enabled: bool,
    category: Option<Category>,
) -> Element<'a, CustomizerMessage> {
    let name = entry.name.clone();
    let toggle = toggler(enabled).label("Enabled").on_toggle_maybe(
        category.map(|category| {
            move |enabled| CustomizerMessage::Toggled(category, name.clone(), enabled)
        }),
    );

    column![
        text(&entry.name).size(18),
        text(&entry.description).size(14),
        toggle,
    ]
    .spacing(4)
    .into()
}
