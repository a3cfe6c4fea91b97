// Report generation for grouping results

use crate::coordinator::FailedDomain;
use crate::domain::Domain;
use crate::group::GroupingReport;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }
}

/// One cluster as written to JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub group_id: usize,
    pub domains: Vec<Domain>,
}

/// Clusters numbered from zero in enumeration order
pub fn group_records(report: &GroupingReport) -> Vec<GroupRecord> {
    report
        .clusters
        .iter()
        .enumerate()
        .map(|(group_id, cluster)| GroupRecord {
            group_id,
            domains: cluster.domains().to_vec(),
        })
        .collect()
}

pub fn render_report(report: &GroupingReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => generate_json_report(report),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

pub fn generate_json_report(report: &GroupingReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&group_records(report))
}

pub fn generate_text_report(report: &GroupingReport) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push_str("                         LOGOMATCH GROUPING REPORT\n");
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!("Generated:     {}\n", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(&format!("Threshold:     {} bits\n", report.similarity_threshold));
    out.push_str(&format!("Domains:       {}\n", report.total));
    out.push_str(&format!("Fingerprinted: {}\n", report.fingerprinted()));
    out.push_str(&format!("Failed:        {}\n", report.failed_count()));
    out.push_str(&format!(
        "Groups:        {} ({} shared)\n",
        report.clusters.len(),
        report.shared_clusters().count()
    ));
    if !report.source_stats.by_source.is_empty() {
        let sources = report
            .source_stats
            .by_source
            .iter()
            .map(|(source, count)| format!("{} {}", source, count))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("Sources:       {}\n", sources));
        out.push_str(&format!("Fallbacks:     {}\n", report.source_stats.fallbacks));
    }
    out.push('\n');

    if !report.clusters.is_empty() {
        out.push_str(RULE);
        out.push_str("GROUPS\n");
        out.push_str(RULE);
        out.push('\n');

        for (id, cluster) in report.clusters.iter().enumerate() {
            out.push_str(&format!("[{}] {} domain(s)\n", id, cluster.len()));
            for (i, domain) in cluster.domains().iter().enumerate() {
                let prefix = if i == cluster.len() - 1 { "└── " } else { "├── " };
                match report.fingerprints.get(domain) {
                    Some(fp) => out.push_str(&format!("  {}{}  {}\n", prefix, domain, fp)),
                    None => out.push_str(&format!("  {}{}\n", prefix, domain)),
                }
            }
            out.push('\n');
        }
    }

    if !report.failed.is_empty() {
        out.push_str(RULE);
        out.push_str("FAILED DOMAINS\n");
        out.push_str(RULE);
        out.push('\n');
        for failed in &report.failed {
            out.push_str(&format!("  {}  ({})\n", failed.domain, failed.reason));
        }
        out.push('\n');
    }

    out.push_str(RULE);
    out.push_str("                              End of Report\n");
    out.push_str(RULE);

    out
}

pub fn generate_markdown_report(report: &GroupingReport) -> String {
    let mut out = String::new();

    out.push_str("# Logomatch Grouping Report\n\n");
    out.push_str("| | |\n|---|---|\n");
    out.push_str(&format!("| Generated | {} |\n", report.generated_at.to_rfc3339()));
    out.push_str(&format!("| Threshold | {} |\n", report.similarity_threshold));
    out.push_str(&format!("| Domains | {} |\n", report.total));
    out.push_str(&format!("| Fingerprinted | {} |\n", report.fingerprinted()));
    out.push_str(&format!("| Failed | {} |\n", report.failed_count()));
    out.push_str(&format!("| Groups | {} |\n\n", report.clusters.len()));

    out.push_str("## Groups\n\n");
    if report.clusters.is_empty() {
        out.push_str("_No domains were fingerprinted._\n\n");
    }
    for (id, cluster) in report.clusters.iter().enumerate() {
        out.push_str(&format!("### Group {} ({} domains)\n\n", id, cluster.len()));
        for domain in cluster.domains() {
            match report.fingerprints.get(domain) {
                Some(fp) => out.push_str(&format!("- `{}` `{}`\n", domain, fp)),
                None => out.push_str(&format!("- `{}`\n", domain)),
            }
        }
        out.push('\n');
    }

    if !report.failed.is_empty() {
        out.push_str("## Failed Domains\n\n");
        out.push_str("| Domain | Reason |\n|---|---|\n");
        for failed in &report.failed {
            out.push_str(&format!("| `{}` | {} |\n", failed.domain, failed.reason));
        }
        out.push('\n');
    }

    out
}

/// Newline-separated failed domains, in the order they failed
pub fn generate_failed_list(failed: &[FailedDomain]) -> String {
    failed
        .iter()
        .map(|f| format!("{}\n", f.domain))
        .collect()
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
