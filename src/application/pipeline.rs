use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::channel::mpsc;
use futures::future::{self, try_join_all};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::progress::{
    base_download_status, percent, serialize_status, ChannelReporter, PipelineEvent,
    ProgressReporter, ASSEMBLING_STATUS, EXTRAS_STATUS,
};
use crate::api::{FetchClient, FetchError};
use crate::archive::ArchiveTree;
use crate::catalog::CatalogEntry;
use crate::domain::{AppError, Customization, CustomizationPlan, PipelineStage};

/// An extra whose bytes have arrived.
#[derive(Debug, Clone)]
pub struct FetchedExtra {
    pub entry: CatalogEntry,
    pub bytes: Bytes,
}

/// Runs the download, merge and repack stages for one customization.
#[derive(Clone)]
pub struct Orchestrator {
    client: FetchClient,
    injection_dir: String,
}

impl Orchestrator {
    pub fn new(client: FetchClient, injection_dir: impl Into<String>) -> Self {
        Self {
            client,
            injection_dir: injection_dir.into(),
        }
    }

    /// Run every stage in order. The first failure ends the run.
    pub async fn run(
        &self,
        plan: CustomizationPlan,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<Customization, AppError> {
        info!(
            base = %plan.base.name,
            extras = plan.extras.len(),
            "Customization started"
        );

        let base = self.download_base(&plan.base, reporter.as_ref()).await?;

        reporter.report(PipelineStage::FetchingExtras, EXTRAS_STATUS.to_string());
        info!(count = plan.extras.len(), "Fetching selected files");
        let extras = self.fetch_extras(&plan.extras).await?;

        reporter.report(PipelineStage::Assembling, ASSEMBLING_STATUS.to_string());
        let injection_dir = self.injection_dir.clone();
        let injected = extras.len();
        let bytes = tokio::task::spawn_blocking(move || {
            assemble(&base, &injection_dir, &extras, reporter.as_ref())
        })
        .await
        .map_err(|e| AppError::Serialization(format!("archive task failed: {}", e)))??;

        info!(
            filename = %plan.output_filename,
            bytes = bytes.len(),
            injected,
            "Customization finished"
        );
        Ok(Customization {
            filename: plan.output_filename,
            bytes: Bytes::from(bytes),
            injected,
        })
    }

    async fn download_base(
        &self,
        base: &CatalogEntry,
        reporter: &dyn ProgressReporter,
    ) -> Result<Bytes, AppError> {
        reporter.report(
            PipelineStage::DownloadingBase,
            base_download_status(&base.filename, 0),
        );
        info!(url = %base.url, "Downloading base archive");

        let mut last_percent = 0;
        let bytes = self
            .client
            .fetch_with_progress(&base.url, |received, total| {
                let current = percent(received, total);
                if current != last_percent {
                    last_percent = current;
                    reporter.report(
                        PipelineStage::DownloadingBase,
                        base_download_status(&base.filename, current),
                    );
                }
            })
            .await?;

        debug!(bytes = bytes.len(), "Base archive downloaded");
        Ok(bytes)
    }

    /// Fetch every extra at once and wait for all of them.
    ///
    /// Results come back in the order of `extras`, whatever order the
    /// responses arrive in. One failure fails the whole set.
    pub async fn fetch_extras(&self, extras: &[CatalogEntry]) -> Result<Vec<FetchedExtra>, AppError> {
        let fetches = extras.iter().map(|entry| async move {
            let bytes = self.client.fetch(&entry.url).await?;
            debug!(name = %entry.name, bytes = bytes.len(), "Extra downloaded");
            Ok::<_, FetchError>(FetchedExtra {
                entry: entry.clone(),
                bytes,
            })
        });

        Ok(try_join_all(fetches).await?)
    }

    /// Run the pipeline as a stream of progress events ending in
    /// [`PipelineEvent::Finished`].
    pub fn run_stream(&self, plan: CustomizationPlan) -> BoxStream<'static, PipelineEvent> {
        let (tx, rx) = mpsc::unbounded();
        let reporter: Arc<dyn ProgressReporter> = Arc::new(ChannelReporter::new(tx.clone()));
        let orchestrator = self.clone();

        let run = async move {
            let result = orchestrator.run(plan, reporter).await;
            if let Err(e) = &result {
                error!("Customization failed: {}", e);
            }
            let _ = tx.unbounded_send(PipelineEvent::Finished(result));
        };

        stream::select(
            rx,
            stream::once(run).filter_map(|()| future::ready(None::<PipelineEvent>)),
        )
        .boxed()
    }
}

/// Inject `extras` into the base archive and repack it.
///
/// Extras land under `injection_dir` in the order given. Plugins and misc
/// files share that directory, so a later entry with the same filename
/// replaces an earlier one.
pub fn assemble(
    base: &[u8],
    injection_dir: &str,
    extras: &[FetchedExtra],
    reporter: &dyn ProgressReporter,
) -> Result<Vec<u8>, AppError> {
    let mut tree = ArchiveTree::open(base)?;
    let inherited = tree.len();
    if tree.is_empty() {
        warn!("Base archive has no entries");
    }

    let mut target = tree.injection_dir(injection_dir)?;
    let mut owners: HashMap<String, &str> = HashMap::new();
    for extra in extras {
        let path = target.add_file(&extra.entry.filename, extra.bytes.clone())?;
        if let Some(previous) = owners.insert(path.clone(), &extra.entry.name) {
            warn!(
                path = %path,
                previous,
                replacement = %extra.entry.name,
                "Selected files share a destination, keeping the later one"
            );
        }
    }
    info!(
        inherited,
        injected = extras.len(),
        dir = %target.prefix(),
        "Archive assembled"
    );

    reporter.report(PipelineStage::Serializing, serialize_status(0.0));
    let mut last_status = String::new();
    let bytes = tree.serialize(|fraction| {
        let status = serialize_status(fraction);
        if status != last_status {
            last_status = status.clone();
            reporter.report(PipelineStage::Serializing, status);
        }
    })?;

    Ok(bytes)
}
