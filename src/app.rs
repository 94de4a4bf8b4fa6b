use std::path::PathBuf;

use futures::StreamExt;
use iced::Task;
use tracing::{info, warn};

use crate::api::FetchClient;
use crate::application::progress::COMPLETE_STATUS;
use crate::application::{Orchestrator, PipelineEvent};
use crate::catalog::{Catalog, Category};
use crate::config::AppConfig;
use crate::domain::{Customization, CustomizationPlan, PipelineStage};
use crate::ui::{CustomizerMessage, CustomizerView};

pub struct CustomizerApp {
    view: CustomizerView,
    catalog: Catalog,
    orchestrator: Orchestrator,
    output_filename: String,
}

impl CustomizerApp {
    pub fn new(config: &AppConfig, catalog: Catalog) -> Self {
        let client = FetchClient::new(config.fetch_config());
        let orchestrator = Orchestrator::new(client, config.injection_dir.clone());
        let view = CustomizerView::new(&catalog);

        Self {
            view,
            catalog,
            orchestrator,
            output_filename: config.output_filename(),
        }
    }

    /// Snapshot the selection and mark the run as started. `None` while a run
    /// is already in progress.
    fn start(&mut self) -> Option<CustomizationPlan> {
        if !self.view.can_trigger() {
            return None;
        }

        let plan = CustomizationPlan {
            base: self.catalog.main().clone(),
            extras: self.view.selection.snapshot(&self.catalog),
            output_filename: self.output_filename.clone(),
        };

        info!(
            plugins = ?self.view.selection.enabled_names(&self.catalog, Category::Plugins),
            other = ?self.view.selection.enabled_names(&self.catalog, Category::Other),
            "Selection captured"
        );
        self.view.stage = PipelineStage::DownloadingBase;
        self.view.status_message = format!("Starting download of {}", plan.base.filename);
        self.view.trigger_label = "Downloading...".to_string();
        Some(plan)
    }

    fn reset(&mut self, status: String) {
        self.view.stage = PipelineStage::Idle;
        self.view.status_message = status;
        self.view.trigger_label = "Try again".to_string();
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(CustomizerMessage),
    Pipeline(PipelineEvent),
    /// (Selected Path, merged archive)
    SaveLocationSelected(Option<PathBuf>, Customization),
    /// Final result after writing the archive
    SaveCompleted(Result<PathBuf, String>),
}

pub fn update(app: &mut CustomizerApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            if let CustomizerMessage::DownloadPressed = ui_msg {
                if let Some(plan) = app.start() {
                    // Runs on the tokio executor; every event comes back as a message
                    return Task::stream(app.orchestrator.run_stream(plan).map(Message::Pipeline));
                }
            }
        }
        Message::Pipeline(PipelineEvent::Progress { stage, status }) => {
            app.view.stage = stage;
            app.view.status_message = status;
        }
        Message::Pipeline(PipelineEvent::Finished(result)) => match result {
            Ok(customization) => {
                app.view.stage = PipelineStage::AwaitingSavePath;
                app.view.status_message = "Please select save location...".to_string();

                return Task::perform(
                    async move {
                        let path = choose_save_path(&customization.filename).await;
                        (path, customization)
                    },
                    |(path, customization)| Message::SaveLocationSelected(path, customization),
                );
            }
            Err(e) => {
                app.reset(format!("Customization failed: {}", e));
            }
        },
        Message::SaveLocationSelected(path_opt, customization) => match path_opt {
            Some(path) => {
                app.view.status_message = format!("Saving to: {}", path.display());

                return Task::perform(
                    async move {
                        tokio::fs::write(&path, &customization.bytes)
                            .await
                            .map(|()| path)
                            .map_err(|e| format!("Failed to write file: {}", e))
                    },
                    Message::SaveCompleted,
                );
            }
            None => {
                // User cancelled dialog
                app.reset("Save cancelled.".to_string());
            }
        },
        Message::SaveCompleted(result) => match result {
            Ok(path) => {
                info!(path = %path.display(), "Customized archive saved");
                app.view.stage = PipelineStage::Completed;
                app.view.status_message = COMPLETE_STATUS.to_string();
                app.view.trigger_label = "Download again".to_string();
            }
            Err(e) => {
                warn!("{}", e);
                app.reset(e);
            }
        },
    }
    Task::none()
}

pub fn view(app: &CustomizerApp) -> iced::Element<'_, Message> {
    app.view.view(&app.catalog).map(Message::UiMessage)
}

async fn choose_save_path(suggested_filename: &str) -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_file_name(suggested_filename)
        .add_filter("Zip archive", &["zip"])
        .save_file()
        .await
        .map(|handle| handle.path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_catalog;
    use crate::domain::AppError;

    fn app() -> CustomizerApp {
        CustomizerApp::new(&AppConfig::default(), sample_catalog())
    }

    fn press(app: &mut CustomizerApp) {
        let _ = update(app, Message::UiMessage(CustomizerMessage::DownloadPressed));
    }

    #[test]
    fn test_toggle_updates_selection() {
        let mut app = app();
        let _ = update(
            &mut app,
            Message::UiMessage(CustomizerMessage::Toggled(
                Category::Plugins,
                "B".to_string(),
                false,
            )),
        );
        assert!(!app.view.selection.is_enabled(Category::Plugins, "B"));
        assert!(app.view.selection.is_enabled(Category::Plugins, "A"));
    }

    #[test]
    fn test_start_snapshots_selection_and_blocks_retrigger() {
        let mut app = app();
        app.view.selection.set(Category::Plugins, "B", false);

        let plan = app.start().expect("idle app starts");
        let names: Vec<_> = plan.extras.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(plan.base.name, "Frosty Editor");
        assert_eq!(plan.output_filename, "FrostyEditor-1.0.6.3-Customized.zip");

        assert!(!app.view.can_trigger());
        assert!(app.start().is_none());

        app.view.selection.set(Category::Plugins, "B", true);
        assert_eq!(plan.extras.len(), 2);
    }

    #[tokio::test]
    async fn test_progress_events_overwrite_status() {
        let mut app = app();
        press(&mut app);
        assert_eq!(app.view.stage, PipelineStage::DownloadingBase);

        let _ = update(
            &mut app,
            Message::Pipeline(PipelineEvent::Progress {
                stage: PipelineStage::FetchingExtras,
                status: "[Step 2/3] Downloading selected files.".to_string(),
            }),
        );
        assert_eq!(app.view.stage, PipelineStage::FetchingExtras);
        assert_eq!(app.view.status_message, "[Step 2/3] Downloading selected files.");
        assert!(!app.view.can_trigger());
    }

    #[tokio::test]
    async fn test_failure_resets_trigger_and_shows_error() {
        let mut app = app();
        press(&mut app);

        let _ = update(
            &mut app,
            Message::Pipeline(PipelineEvent::Finished(Err(AppError::Network(
                "a.dll returned 500".to_string(),
            )))),
        );

        assert_eq!(app.view.stage, PipelineStage::Idle);
        assert!(app.view.can_trigger());
        assert!(app.view.status_message.starts_with("Customization failed"));
        assert!(app.view.status_message.contains("a.dll returned 500"));
    }

    #[test]
    fn test_cancelled_save_returns_to_idle() {
        let mut app = app();
        app.view.stage = PipelineStage::AwaitingSavePath;

        let customization = Customization {
            filename: "FrostyEditor-1.0.6.3-Customized.zip".to_string(),
            bytes: bytes::Bytes::from_static(b"PK"),
            injected: 0,
        };
        let _ = update(&mut app, Message::SaveLocationSelected(None, customization));

        assert!(app.view.can_trigger());
        assert_eq!(app.view.status_message, "Save cancelled.");
    }

    #[test]
    fn test_saved_archive_completes_run() {
        let mut app = app();
        app.view.stage = PipelineStage::AwaitingSavePath;

        let _ = update(
            &mut app,
            Message::SaveCompleted(Ok(PathBuf::from("/tmp/out.zip"))),
        );

        assert_eq!(app.view.stage, PipelineStage::Completed);
        assert_eq!(app.view.status_message, COMPLETE_STATUS);
        assert_eq!(app.view.trigger_label, "Download again");
        assert!(app.view.can_trigger());
    }
}
