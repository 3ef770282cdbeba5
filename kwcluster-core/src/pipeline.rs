use crate::data::RankingStore;
use crate::error::Result;
use crate::graph::{ClusterFinder, ClusterGroup};
use indicatif::{ProgressBar, ProgressStyle};
use kwcluster_serp::{
    BuildError, KeywordData, Member, ProgressSink, Serp, SerpError, build_from_directory,
    build_from_sources,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Options for one ingestion run
pub struct IngestOptions {
    pub max_in_flight: usize,
    pub show_progress_bars: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 10,
            show_progress_bars: false,
        }
    }
}

/// Keyword data plus the aggregate of any items that could not be loaded.
pub struct Ingested {
    pub data: KeywordData,
    pub failures: Option<BuildError>,
}

impl Ingested {
    /// Fail if any item was dropped.
    pub fn into_complete(self) -> Result<KeywordData> {
        match self.failures {
            Some(err) => Err(err.into()),
            None => Ok(self.data),
        }
    }
}

fn progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Parse every ranked-list file in `dir`.
pub async fn load_from_directory(dir: &Path, options: &IngestOptions) -> Result<Ingested> {
    info!("Loading ranked lists from {}", dir.display());

    let bar = if options.show_progress_bars {
        let count = kwcluster_serp::list_directory(dir).await?.len() as u64;
        Some(progress_bar(count, "files parsed"))
    } else {
        None
    };
    let sink = bar.clone().map(|pb| Arc::new(pb) as Arc<dyn ProgressSink>);

    let (data, failures) = build_from_directory(dir, options.max_in_flight, sink).await?;

    if let Some(pb) = bar {
        pb.finish_with_message("files parsed");
    }
    Ok(Ingested { data, failures })
}

/// Fetch one keyword's ranked list from the store on the blocking pool.
pub async fn fetch_serp_from_store(
    store: Arc<RankingStore>,
    domain_id: i64,
    keyword: String,
) -> kwcluster_serp::error::Result<Serp> {
    tokio::task::spawn_blocking(move || -> kwcluster_serp::error::Result<Serp> {
        let mut serp = Serp::new(keyword.clone());
        store
            .fetch_serp(domain_id, &keyword, |kw, prominence, competitor| {
                serp.push(Member::new(kw, prominence, competitor));
                Ok(())
            })
            .map_err(|e| SerpError::Database(Box::new(e)))?;
        Ok(serp)
    })
    .await?
}

/// Fetch every keyword of a domain and its ranked list from the store.
pub async fn load_from_store(
    store: Arc<RankingStore>,
    domain_id: i64,
    options: &IngestOptions,
) -> Result<Ingested> {
    let keywords = {
        let store = store.clone();
        tokio::task::spawn_blocking(move || store.fetch_keywords(domain_id)).await??
    };
    info!("Got {} keyword(s) for domain {}", keywords.len(), domain_id);

    let bar = options
        .show_progress_bars
        .then(|| progress_bar(keywords.len() as u64, "keywords queried"));
    let sink = bar.clone().map(|pb| Arc::new(pb) as Arc<dyn ProgressSink>);

    let (data, failures) = build_from_sources(
        keywords,
        options.max_in_flight,
        move |keyword: String| fetch_serp_from_store(store.clone(), domain_id, keyword),
        sink,
    )
    .await;

    if let Some(pb) = bar {
        pb.finish_with_message("keywords queried");
    }
    Ok(Ingested { data, failures })
}

/// Copy every ranked-list file in `dir` into the store under `domain_id`.
/// Returns how many lists were imported alongside any files that failed.
pub async fn import_directory(
    store: Arc<RankingStore>,
    domain_id: i64,
    dir: &Path,
    options: &IngestOptions,
) -> Result<(usize, Option<BuildError>)> {
    let ingested = load_from_directory(dir, options).await?;
    let data = ingested.data;
    let count = data.len();

    tokio::task::spawn_blocking(move || -> Result<()> {
        for serp in data.values() {
            store.import_serp(domain_id, serp)?;
        }
        Ok(())
    })
    .await??;

    info!("Imported {} ranked list(s) into domain {}", count, domain_id);
    Ok((count, ingested.failures))
}

/// Run clustering off the async executor.
pub async fn cluster_keywords(data: KeywordData, finder: ClusterFinder) -> Result<Vec<ClusterGroup>> {
    tokio::task::spawn_blocking(move || finder.find_clusters(&data)).await?
}
