// End-to-end tests: ingestion through named clusters

use kwcluster_core::data::RankingStore;
use kwcluster_core::error::ClusterError;
use kwcluster_core::graph::ClusterFinder;
use kwcluster_core::pipeline::{
    IngestOptions, cluster_keywords, fetch_serp_from_store, import_directory, load_from_directory,
    load_from_store,
};
use kwcluster_serp::{KeywordData, Serp, SerpError};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn keyword_data(entries: &[(&str, &[&str])]) -> KeywordData {
    entries
        .iter()
        .map(|(kw, competitors)| (kw.to_string(), Serp::from_competitors(*kw, competitors)))
        .collect()
}

fn write_serp(dir: &Path, keyword: &str, competitors: &[&str]) {
    let serp = Serp::from_competitors(keyword, competitors);
    let file = dir.join(format!("{}.json", keyword.replace(' ', "_")));
    fs::write(file, serde_json::to_vec(&serp.members).unwrap()).unwrap();
}

fn options() -> IngestOptions {
    IngestOptions {
        max_in_flight: 3,
        show_progress_bars: false,
    }
}

#[test]
fn test_similar_serps_cluster_together() {
    let shared: &[&str] = &["zillow.com", "apartments.com", "rent.com", "reddit.com"];
    let data = keyword_data(&[
        ("apartment parking", shared),
        ("parking", shared),
        ("coffee shops", &["yelp.com", "starbucks.com", "tripadvisor.com"]),
    ]);

    let clusters = ClusterFinder::new().find_clusters(&data).unwrap();

    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].name, "coffee shops");
    assert_eq!(clusters[0].keywords, vec!["coffee shops"]);
    assert_eq!(clusters[1].name, "parking");
    assert_eq!(clusters[1].keywords, vec!["apartment parking", "parking"]);
}

#[test]
fn test_output_is_reproducible() {
    let data = keyword_data(&[
        ("a b", &["x", "y", "z"]),
        ("b a", &["x", "y", "z"]),
        ("c", &["x", "y", "w"]),
        ("d", &["p", "q"]),
        ("e", &["p", "q", "r"]),
    ]);

    let finder = ClusterFinder::new();
    let first = finder.find_clusters(&data).unwrap();
    for _ in 0..5 {
        assert_eq!(finder.find_clusters(&data).unwrap(), first);
    }

    let covered: usize = first.iter().map(|c| c.len()).sum();
    assert_eq!(covered, 5);
}

#[test]
fn test_empty_data_is_a_clustering_error() {
    let result = ClusterFinder::new().find_clusters(&KeywordData::new());
    assert!(matches!(result, Err(ClusterError::Clustering(_))));
}

#[tokio::test]
async fn test_directory_to_clusters() {
    let temp_dir = TempDir::new().unwrap();
    write_serp(temp_dir.path(), "apartment parking", &["a.com", "b.com", "c.com"]);
    write_serp(temp_dir.path(), "parking", &["a.com", "b.com", "c.com"]);
    write_serp(temp_dir.path(), "coffee", &["x.com", "y.com"]);

    let ingested = load_from_directory(temp_dir.path(), &options()).await.unwrap();
    let data = ingested.into_complete().unwrap();
    assert_eq!(data.len(), 3);

    let clusters = cluster_keywords(data, ClusterFinder::new()).await.unwrap();
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[1].name, "parking");
}

#[tokio::test]
async fn test_partial_directory_is_surfaced() {
    let temp_dir = TempDir::new().unwrap();
    write_serp(temp_dir.path(), "parking", &["a.com"]);
    fs::write(temp_dir.path().join("bad.json"), b"not json").unwrap();

    let ingested = load_from_directory(temp_dir.path(), &options()).await.unwrap();
    assert_eq!(ingested.data.len(), 1);
    assert_eq!(ingested.failures.as_ref().map(|f| f.len()), Some(1));
    assert!(matches!(ingested.into_complete(), Err(ClusterError::Build(_))));
}

#[tokio::test]
async fn test_store_to_clusters() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(RankingStore::open(&temp_dir.path().join("rankings.db")).unwrap());

    for keyword in ["apartment parking", "parking"] {
        store
            .import_serp(5, &Serp::from_competitors(keyword, &["a.com", "b.com", "c.com"]))
            .unwrap();
    }
    store
        .import_serp(5, &Serp::from_competitors("coffee", &["x.com", "y.com"]))
        .unwrap();

    let ingested = load_from_store(store, 5, &options()).await.unwrap();
    assert!(ingested.failures.is_none());
    assert_eq!(ingested.data.len(), 3);
    assert_eq!(ingested.data["parking"].keyword, "parking");

    let clusters = cluster_keywords(ingested.data, ClusterFinder::new()).await.unwrap();
    let names: Vec<&str> = clusters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["coffee", "parking"]);
}

#[tokio::test]
async fn test_import_directory() {
    let temp_dir = TempDir::new().unwrap();
    let serp_dir = temp_dir.path().join("serps");
    fs::create_dir(&serp_dir).unwrap();
    write_serp(&serp_dir, "parking", &["a.com", "b.com"]);
    write_serp(&serp_dir, "garage", &["b.com", "c.com"]);

    let store = Arc::new(RankingStore::open(&temp_dir.path().join("rankings.db")).unwrap());
    let (count, failures) = import_directory(store.clone(), 9, &serp_dir, &options())
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert!(failures.is_none());
    assert_eq!(store.fetch_keywords(9).unwrap(), vec!["garage", "parking"]);
    assert_eq!(store.count_rankings(9).unwrap(), 4);
}

#[tokio::test]
async fn test_store_failure_keeps_database_cause() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("rankings.db");
    let store = Arc::new(RankingStore::open(&db_path).unwrap());

    // A directory where the database file should be cannot be opened
    RankingStore::drop(&db_path).unwrap();
    fs::create_dir(&db_path).unwrap();

    let err = fetch_serp_from_store(store, 1, "parking".to_string())
        .await
        .unwrap_err();

    assert!(matches!(err, SerpError::Database(_)));
    let cause = err.source().expect("database cause is kept");
    assert!(matches!(
        cause.downcast_ref::<ClusterError>(),
        Some(ClusterError::Database(_))
    ));
}
