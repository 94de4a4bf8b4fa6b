use std::fmt;

use bytes::Bytes;

use crate::catalog::CatalogEntry;

/// Snapshot of the user's selection, taken when the trigger is pressed.
#[derive(Debug, Clone)]
pub struct CustomizationPlan {
    pub base: CatalogEntry,
    /// Enabled plugins followed by enabled misc files, in catalog order.
    pub extras: Vec<CatalogEntry>,
    pub output_filename: String,
}

/// The merged archive produced by a pipeline run.
#[derive(Clone)]
pub struct Customization {
    pub filename: String,
    pub bytes: Bytes,
    pub injected: usize,
}

impl fmt::Debug for Customization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Customization")
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .field("injected", &self.injected)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    DownloadingBase,
    FetchingExtras,
    Assembling,
    Serializing,
    AwaitingSavePath,
    Completed,
}

impl PipelineStage {
    /// Whether the trigger control must stay disabled in this stage.
    pub fn is_busy(self) -> bool {
        !matches!(self, PipelineStage::Idle | PipelineStage::Completed)
    }
}
