use futures::channel::mpsc::UnboundedSender;

use crate::domain::{AppError, Customization, PipelineStage};

pub const EXTRAS_STATUS: &str = "[Step 2/3] Downloading selected files.";
pub const ASSEMBLING_STATUS: &str = "[Step 3/3] Generating file for download.";
pub const COMPLETE_STATUS: &str = "Download complete.";

/// Sink for the single-line status text. Each stage overwrites the last value.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, stage: PipelineStage, status: String);
}

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Progress {
        stage: PipelineStage,
        status: String,
    },
    Finished(Result<Customization, AppError>),
}

/// Forwards reports to the UI as [`PipelineEvent::Progress`].
pub struct ChannelReporter {
    tx: UnboundedSender<PipelineEvent>,
}

impl ChannelReporter {
    pub fn new(tx: UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, stage: PipelineStage, status: String) {
        // The receiver only goes away when the UI dropped the run.
        let _ = self.tx.unbounded_send(PipelineEvent::Progress { stage, status });
    }
}

pub fn percent(received: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((received as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

pub fn base_download_status(filename: &str, percent: u8) -> String {
    format!("[Step 1/3] Downloading {} ({}%)", filename, percent)
}

pub fn serialize_status(fraction: f32) -> String {
    format!("Generating file for download... {:.2}%", fraction * 100.0)
}
