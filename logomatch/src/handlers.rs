use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use logomatch_core::coordinator::Preview;
use logomatch_core::report::{ReportFormat, generate_failed_list, render_report, save_report};
use logomatch_core::{
    Domain, DomainSet, Fingerprint, FetchProgressCallback, GroupingOptions, GroupingReport,
    PerceptualHasher, group_domains,
};
use logomatch_scanner::{AttemptOutcome, FetchReport, FetchSettings, LogoFetcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Log to stderr so reports on stdout stay machine readable.
/// With no `-v` flags `RUST_LOG` is honoured, falling back to warnings only.
pub fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_banner() {
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
    eprintln!(
        "{}  {}",
        "  LOGOMATCH".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    eprintln!("{}", "  group domains by lookalike logos".bright_black());
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
    eprintln!();
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

// Helper functions for the group handler

/// Reduce one line of a domain list to a bare host. Blank lines and `#`
/// comments yield `None`; a scheme and any path are stripped.
pub fn parse_domain_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let without_scheme = line
        .strip_prefix("https://")
        .or_else(|| line.strip_prefix("http://"))
        .unwrap_or(line);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme)
        .trim_end_matches('.');

    if host.is_empty() {
        return None;
    }
    Some(host.to_lowercase())
}

/// Load and deduplicate domains from a newline-delimited file
pub fn load_domains_from_file(path: &Path) -> Result<DomainSet, String> {
    let path = expand_path(path);
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read domain file {}: {}", path.display(), e))?;

    let lines: Vec<String> = content.lines().filter_map(parse_domain_line).collect();
    if lines.is_empty() {
        return Err(format!("No domains found in {}", path.display()));
    }

    DomainSet::new(lines).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Options from `--config` (if any) with explicit flags layered on top
pub fn build_options(args: &ArgMatches) -> Result<GroupingOptions> {
    let mut options = match args.get_one::<PathBuf>("config") {
        Some(path) => {
            let path = expand_path(path);
            GroupingOptions::from_json_file(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => GroupingOptions::default(),
    };

    if let Some(&threshold) = args.get_one::<u32>("threshold") {
        options.similarity_threshold = threshold;
    }
    if let Some(&concurrency) = args.get_one::<usize>("concurrency") {
        options.fetch_concurrency = concurrency;
    }
    if let Some(&timeout) = args.get_one::<u64>("timeout") {
        options.fetch.image_timeout_secs = timeout;
    }
    if let Some(&timeout) = args.get_one::<u64>("homepage-timeout") {
        options.fetch.homepage_timeout_secs = timeout;
    }
    if let Some(&count) = args.get_one::<usize>("preview") {
        options.preview_count = count;
    }

    options.validate()?;
    Ok(options)
}

/// File name for the preview of the `index`-th logo
pub fn preview_file_name(index: usize, domain: &Domain) -> String {
    let safe: String = domain
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{:03}_{}.png", index + 1, safe)
}

pub fn write_previews(previews: &[Preview], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create preview directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(previews.len());
    for (index, preview) in previews.iter().enumerate() {
        let path = dir.join(preview_file_name(index, &preview.domain));
        preview
            .logo
            .image
            .write_png(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn progress_bar(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} domains")
        .map(|s| s.progress_chars("█▓░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn print_summary(report: &GroupingReport) {
    eprintln!();
    eprintln!("{} Grouping complete", "✓".green().bold());
    eprintln!(
        "  {} {}",
        "Domains:      ".blue(),
        report.total.to_string().bright_white()
    );
    eprintln!(
        "  {} {}",
        "Fingerprinted:".blue(),
        report.fingerprinted().to_string().green()
    );
    eprintln!(
        "  {} {}",
        "Failed:       ".blue(),
        if report.failed_count() > 0 {
            report.failed_count().to_string().yellow()
        } else {
            report.failed_count().to_string().green()
        }
    );
    eprintln!(
        "  {} {} ({} with lookalikes)",
        "Groups:       ".blue(),
        report.clusters.len().to_string().bright_white(),
        report.shared_clusters().count().to_string().cyan()
    );
    eprintln!();
}

pub async fn handle_group(args: &ArgMatches, quiet: bool) -> Result<()> {
    let input = args.get_one::<PathBuf>("input").context("--input is required")?;
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    let domains = load_domains_from_file(input).map_err(anyhow::Error::msg)?;
    let options = build_options(args)?;
    info!(
        "Loaded {} domains, threshold {}, concurrency {}",
        domains.len(),
        options.similarity_threshold,
        options.fetch_concurrency
    );

    if !quiet {
        eprintln!(
            "{} Fetching logos for {} domain(s) with {} workers",
            "→".blue(),
            domains.len().to_string().bright_white(),
            options.fetch_concurrency.to_string().cyan()
        );
    }

    let pb = progress_bar(quiet);
    let progress: Option<FetchProgressCallback> = pb.clone().map(|pb| {
        let callback: FetchProgressCallback = Arc::new(move |completed, total| {
            pb.set_length(total as u64);
            pb.set_position(completed as u64);
        });
        callback
    });

    let outcome = group_domains(&domains, &options, progress).await;
    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }
    let outcome = outcome?;
    let report = &outcome.report;

    let rendered = render_report(report, format)?;
    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            let path = expand_path(path);
            save_report(&rendered, &path)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            if !quiet {
                eprintln!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", rendered),
    }

    if let Some(path) = args.get_one::<PathBuf>("failed-output") {
        let path = expand_path(path);
        save_report(&generate_failed_list(&report.failed), &path)
            .with_context(|| format!("Failed to write failed list {}", path.display()))?;
        if !quiet {
            eprintln!(
                "{} {} failed domain(s) written to {}",
                "✓".green().bold(),
                report.failed_count(),
                path.display().to_string().bright_white()
            );
        }
    }

    if !outcome.previews.is_empty() {
        let dir = args
            .get_one::<PathBuf>("preview-dir")
            .map(|p| expand_path(p))
            .unwrap_or_else(|| PathBuf::from("logomatch-previews"));
        let written = write_previews(&outcome.previews, &dir)?;
        if !quiet {
            eprintln!(
                "{} {} preview(s) saved to {}",
                "✓".green().bold(),
                written.len(),
                dir.display().to_string().bright_white()
            );
        }
    }

    if !quiet {
        print_summary(report);
    }
    Ok(())
}

/// Human-readable trace of a probe
pub fn format_probe(report: &FetchReport, fingerprint: Option<Fingerprint>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Probe: {}\n\n", report.domain));

    for (i, attempt) in report.attempts.iter().enumerate() {
        let millis = attempt.response_time.as_millis();
        let line = match &attempt.outcome {
            AttemptOutcome::Image {
                width,
                height,
                quality,
            } => format!(
                "  {} [{}] {:<12} {}x{} {} ({} ms)\n",
                "✓".green(),
                i + 1,
                attempt.source,
                width,
                height,
                quality.as_str(),
                millis
            ),
            AttemptOutcome::Failed(failure) => format!(
                "  {} [{}] {:<12} {} ({} ms)\n",
                "✗".red(),
                i + 1,
                attempt.source,
                failure,
                millis
            ),
        };
        out.push_str(&line);
    }
    out.push('\n');

    match &report.logo {
        Some(logo) => {
            out.push_str(&format!(
                "Chosen:      {} ({}x{}, {})\n",
                logo.source,
                logo.image.width(),
                logo.image.height(),
                logo.quality.as_str()
            ));
            if let Some(fp) = fingerprint {
                out.push_str(&format!("Fingerprint: {}\n", fp));
            }
        }
        None => out.push_str("No usable image from any source\n"),
    }
    out
}

pub async fn handle_probe(args: &ArgMatches) -> Result<()> {
    let raw = args.get_one::<String>("DOMAIN").context("a domain is required")?;
    let domain = parse_domain_line(raw)
        .and_then(|d| Domain::parse(&d))
        .with_context(|| format!("Invalid domain {:?}", raw))?;

    let mut settings = FetchSettings::default();
    if let Some(&timeout) = args.get_one::<u64>("timeout") {
        settings.image_timeout_secs = timeout;
    }

    let fetcher = LogoFetcher::from_settings(&settings)?;
    let report = fetcher.fetch_with_report(domain.as_str()).await;

    let fingerprint = match &report.logo {
        Some(logo) => Some(PerceptualHasher::new().hash(&logo.image)?),
        None => None,
    };
    print!("{}", format_probe(&report, fingerprint));

    if let (Some(path), Some(logo)) = (args.get_one::<PathBuf>("save"), &report.logo) {
        let path = expand_path(path);
        logo.image
            .write_png(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved:       {}", path.display());
    }
    Ok(())
}

/// Hamming distance between two hex fingerprints
pub fn compare_fingerprints(first: &str, second: &str) -> Result<u32> {
    let a: Fingerprint = first.parse()?;
    let b: Fingerprint = second.parse()?;
    Ok(a.distance(&b))
}

pub fn handle_compare(args: &ArgMatches) -> Result<()> {
    let first = args.get_one::<String>("FIRST").context("two fingerprints are required")?;
    let second = args.get_one::<String>("SECOND").context("two fingerprints are required")?;
    let threshold = args.get_one::<u32>("threshold").copied().unwrap_or(10);

    let distance = compare_fingerprints(first, second)?;
    let verdict = if distance <= threshold {
        "similar".green().bold()
    } else {
        "different".yellow().bold()
    };
    println!(
        "Distance: {}/{} bits ({} at threshold {})",
        distance,
        Fingerprint::BITS,
        verdict,
        threshold
    );
    Ok(())
}
