use crate::error::{BuildError, Result, SerpError};
use crate::serp::{KeywordData, Serp, parse};
use indicatif::ProgressBar;
use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Observer notified once per finished ingestion item.
pub trait ProgressSink: Send + Sync {
    fn advance(&self);
}

impl ProgressSink for ProgressBar {
    fn advance(&self) {
        self.inc(1);
    }
}

/// Fetch a ranked list for every item with at most `max_in_flight` fetches
/// running at once.
///
/// Every item is attempted exactly once and the call returns only after all of
/// them finished. Successful lists are keyed by their own keyword. Failures do
/// not stop the batch; they come back as a [`BuildError`] next to whatever was
/// collected.
pub async fn build_from_sources<I, F, Fut>(
    items: Vec<I>,
    max_in_flight: usize,
    fetch_one: F,
    progress: Option<Arc<dyn ProgressSink>>,
) -> (KeywordData, Option<BuildError>)
where
    I: Display + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Serp>> + Send + 'static,
{
    let mut data = KeywordData::new();
    if items.is_empty() {
        return (data, None);
    }

    // Never more permits than items, and never past the semaphore's ceiling
    let limit = max_in_flight.clamp(1, items.len().min(Semaphore::MAX_PERMITS));
    info!("Ingesting {} item(s) with at most {} in flight", items.len(), limit);

    // Each task must hold a permit while it fetches
    let semaphore = Arc::new(Semaphore::new(limit));
    let fetch_one = Arc::new(fetch_one);

    let mut labels = Vec::with_capacity(items.len());
    let mut tasks = Vec::with_capacity(items.len());

    for item in items {
        labels.push(item.to_string());

        let semaphore = semaphore.clone();
        let fetch_one = fetch_one.clone();
        let progress = progress.clone();

        tasks.push(tokio::spawn(async move {
            // Counts the item even if the fetch panics
            let _advance = AdvanceOnDrop(progress);
            let _permit = semaphore.acquire_owned().await?;
            fetch_one(item).await
        }));
    }

    let outcomes = futures::future::join_all(tasks).await;

    // Single writer: results are merged here, after the join
    let mut errors = Vec::new();
    for (label, outcome) in labels.into_iter().zip(outcomes) {
        let fetched = match outcome {
            Ok(result) => result,
            Err(e) => Err(SerpError::from(e)),
        };

        match fetched {
            Ok(serp) if serp.keyword.is_empty() => {
                warn!("Dropping {}: ranked list has no keyword", label);
                errors.push(SerpError::for_item(label, SerpError::MissingKeyword));
            }
            Ok(serp) if data.contains_key(&serp.keyword) => {
                warn!("Dropping {}: keyword '{}' was already collected", label, serp.keyword);
                errors.push(SerpError::for_item(
                    label,
                    SerpError::DuplicateKeyword(serp.keyword),
                ));
            }
            Ok(serp) => {
                debug!("Collected {} member(s) for '{}'", serp.len(), serp.keyword);
                data.insert(serp.keyword.clone(), serp);
            }
            Err(e) => {
                warn!("Ingestion failed for {}: {}", label, e);
                errors.push(SerpError::for_item(label, e));
            }
        }
    }

    info!(
        "Ingestion complete: {} list(s) collected, {} failure(s)",
        data.len(),
        errors.len()
    );

    if errors.is_empty() {
        (data, None)
    } else {
        (data, Some(BuildError::new(errors)))
    }
}

/// Read and parse one ranked-list file.
pub async fn read_serp_file(path: PathBuf) -> Result<Serp> {
    let bytes = tokio::fs::read(&path).await?;
    parse(&bytes)
}

/// Regular files directly inside `dir`, sorted by path.
pub async fn list_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Parse every file in a directory of ranked lists.
///
/// Fails outright only when the directory itself cannot be listed.
pub async fn build_from_directory(
    dir: &Path,
    max_in_flight: usize,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Result<(KeywordData, Option<BuildError>)> {
    let paths = list_directory(dir).await?;
    debug!("Found {} file(s) in {}", paths.len(), dir.display());

    let items: Vec<PathDisplay> = paths.into_iter().map(PathDisplay).collect();
    Ok(build_from_sources(items, max_in_flight, |p: PathDisplay| read_serp_file(p.0), progress).await)
}

/// Advances the sink when the fetch task finishes, however it finishes.
struct AdvanceOnDrop(Option<Arc<dyn ProgressSink>>);

impl Drop for AdvanceOnDrop {
    fn drop(&mut self) {
        if let Some(sink) = &self.0 {
            sink.advance();
        }
    }
}

/// `PathBuf` does not implement `Display`.
struct PathDisplay(PathBuf);

impl Display for PathDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
