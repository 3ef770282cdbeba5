// Report generation for keyword clusters

use crate::error::Result;
use crate::graph::ClusterGroup;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

pub fn generate_report(clusters: &[ClusterGroup], format: &ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(clusters)),
        ReportFormat::Json => generate_json_report(clusters),
        ReportFormat::Csv => Ok(generate_csv_report(clusters)),
        ReportFormat::Markdown => Ok(generate_markdown_report(clusters)),
    }
}

fn keyword_count(clusters: &[ClusterGroup]) -> usize {
    clusters.iter().map(|c| c.keywords.len()).sum()
}

pub fn generate_text_report(clusters: &[ClusterGroup]) -> String {
    let mut report = String::new();

    report.push_str("\n═══════════════════════════════════════════════════════════════════════════════\n");
    report.push_str("                            KEYWORD CLUSTERS\n");
    report.push_str("═══════════════════════════════════════════════════════════════════════════════\n\n");

    report.push_str(&format!("Total clusters: {}\n", clusters.len()));
    report.push_str(&format!("Total keywords: {}\n\n", keyword_count(clusters)));

    for cluster in clusters {
        report.push_str(&format!("Cluster: '{}'\n", cluster.name));
        for keyword in &cluster.keywords {
            report.push_str(&format!("\t{}\n", keyword));
        }
        report.push('\n');
    }

    report.push_str("═══════════════════════════════════════════════════════════════════════════════\n");
    report.push_str("                            End of Report\n");
    report.push_str("═══════════════════════════════════════════════════════════════════════════════\n");

    report
}

pub fn generate_json_report(clusters: &[ClusterGroup]) -> Result<String> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "kwcluster",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "summary": {
                "total_clusters": clusters.len(),
                "total_keywords": keyword_count(clusters)
            },
            "clusters": clusters
        }
    });

    Ok(serde_json::to_string_pretty(&json_report)?)
}

pub fn generate_csv_report(clusters: &[ClusterGroup]) -> String {
    let mut report = String::from("cluster,keyword\n");
    for cluster in clusters {
        for keyword in &cluster.keywords {
            report.push_str(&format!(
                "{},{}\n",
                csv_escape(&cluster.name),
                csv_escape(keyword)
            ));
        }
    }
    report
}

pub fn generate_markdown_report(clusters: &[ClusterGroup]) -> String {
    let mut report = String::from("# Keyword Clusters\n\n");
    report.push_str(&format!(
        "**{}** clusters covering **{}** keywords.\n\n",
        clusters.len(),
        keyword_count(clusters)
    ));

    for cluster in clusters {
        report.push_str(&format!("## {}\n\n", cluster.name));
        for keyword in &cluster.keywords {
            report.push_str(&format!("- {}\n", keyword));
        }
        report.push('\n');
    }
    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
