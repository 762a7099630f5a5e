use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use stencil_diff::{ConflictResolver, ResolutionArtifact};
use stencil_fingerprint::{detect_version, Confidence, FingerprintDatabase, HashCache, VersionMatch};
use stencil_hash::ContentHasher;
use stencil_merge::{MergeOutcome, StructuralMerger};
use stencil_sdk::{
    DirectoryProvider, FileAction, FileReport, FileStatus, UpdateReport, Updater, UpdaterConfig,
};
use stencil_types::{HashAlgorithm, ReleaseVersion};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => UpdaterConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => UpdaterConfig::default(),
    };
    debug!(config = ?cli.config, algorithm = %config.algorithm, dry_run = config.dry_run, "configuration loaded");
    let json = matches!(cli.format, OutputFormat::Json);
    match cli.command {
        Command::Hash(args) => cmd_hash(args, &config, json),
        Command::Detect(args) => cmd_detect(args, json),
        Command::Merge(args) => cmd_merge(args, &config, json),
        Command::Resolve(args) => cmd_resolve(args, &config, json),
        Command::Update(args) => cmd_update(args, config, json),
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write(path: &Path, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn cmd_hash(args: HashArgs, config: &UpdaterConfig, json: bool) -> anyhow::Result<()> {
    let algorithm = match args.algorithm {
        Some(AlgorithmArg::Sha256) => HashAlgorithm::Sha256,
        Some(AlgorithmArg::Blake3) => HashAlgorithm::Blake3,
        None => config.algorithm,
    };
    let hasher = ContentHasher::new(algorithm);
    let mut hashes = BTreeMap::new();
    for path in &args.paths {
        let hash = hasher.hash_file(path)?;
        hashes.insert(path.display().to_string(), hash.to_string());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&hashes)?);
    } else {
        for (path, hash) in &hashes {
            println!("{}  {}", hash.cyan(), path);
        }
    }
    Ok(())
}

fn confidence_label(confidence: Confidence) -> colored::ColoredString {
    match confidence {
        Confidence::High => "high".green(),
        Confidence::Medium => "medium".yellow(),
        Confidence::Low => "low".red(),
    }
}

fn print_detection(detected: &VersionMatch) {
    if detected.is_detected() {
        println!(
            "Detected {} (confidence {}, {}/{} files match{})",
            detected.version.to_string().yellow().bold(),
            confidence_label(detected.confidence),
            detected.matched,
            detected.total,
            if detected.fast_path { ", signature files" } else { "" }
        );
    } else {
        println!(
            "{} No release matched; every tracked file is treated as customized.",
            "!".yellow().bold()
        );
    }
    for path in &detected.customized_paths {
        println!("  {} {}", "customized:".yellow(), path);
    }
    for path in &detected.missing_paths {
        println!("  {} {}", "missing:".dimmed(), path);
    }
}

fn cmd_detect(args: DetectArgs, json: bool) -> anyhow::Result<()> {
    let db = FingerprintDatabase::load(&args.database)?;
    let mut cache = HashCache::new(&args.root, ContentHasher::new(db.algorithm));
    let tree = cache.snapshot(db.tracked_paths.iter().map(String::as_str))?;
    let detected = detect_version(&tree.hashes, &db);
    if json {
        println!("{}", serde_json::to_string_pretty(&detected)?);
    } else {
        print_detection(&detected);
    }
    Ok(())
}

fn outcome_label(outcome: MergeOutcome) -> colored::ColoredString {
    match outcome {
        MergeOutcome::Clean => "clean".green(),
        MergeOutcome::Preserved => "preserved".cyan(),
        MergeOutcome::AutoMerged => "auto-merged".blue(),
        MergeOutcome::Conflict => "conflict".red().bold(),
    }
}

fn cmd_merge(args: MergeArgs, config: &UpdaterConfig, json: bool) -> anyhow::Result<()> {
    let current = read(&args.current)?;
    let incoming = read(&args.incoming)?;
    let base = args.base.as_deref().map(read).transpose()?;

    let merger = StructuralMerger::new(config.merge.clone());
    let output = merger.merge(
        base.as_deref(),
        &current,
        &incoming,
        &args.base_label,
        &args.incoming_label,
    )?;

    if let Some(path) = &args.output {
        write(path, &output.merged_text)?;
    }
    if json {
        let value = serde_json::json!({
            "conflict_count": output.conflict_count,
            "new_section_count": output.new_section_count,
            "sections": output.sections,
            "merged_text": output.merged_text,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    if args.output.is_none() {
        print!("{}", output.merged_text);
    }
    for section in &output.sections {
        let title = if section.level == 0 { "(preamble)" } else { section.title.as_str() };
        eprintln!("  {:<12} {}", outcome_label(section.outcome), title);
    }
    if output.is_clean() {
        eprintln!("{} Merged without conflicts.", "✓".green().bold());
    } else {
        eprintln!(
            "{} {} conflicting section(s) need attention.",
            "!".yellow().bold(),
            output.conflict_count
        );
    }
    Ok(())
}

fn cmd_resolve(args: ResolveArgs, config: &UpdaterConfig, json: bool) -> anyhow::Result<()> {
    let current = read(&args.current)?;
    let incoming = read(&args.incoming)?;
    let base = args.base.as_deref().map(read).transpose()?;

    let resolver = ConflictResolver::new(config.merge.clone(), config.report.clone());
    let resolution = resolver.resolve_file(
        &args.current,
        &current,
        base.as_deref(),
        &incoming,
        &args.base_label,
        &args.incoming_label,
    );
    for fallback in &resolution.fallbacks {
        eprintln!("{} {}", "fallback:".yellow(), fallback);
    }

    let (kind, target, text) = match &resolution.artifact {
        ResolutionArtifact::Merged(output) => {
            ("structural merge", args.current.clone(), output.merged_text.clone())
        }
        ResolutionArtifact::InlineMarkers { text } => {
            ("inline markers", args.current.clone(), text.clone())
        }
        ResolutionArtifact::DiffReport { report_path, report } => {
            ("diff report", report_path.clone(), report.render())
        }
    };

    if json {
        let value = serde_json::json!({
            "artifact": kind,
            "target": target.display().to_string(),
            "needs_attention": resolution.artifact.needs_attention(),
            "fallbacks": resolution.fallbacks.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "text": text,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if !args.write {
        print!("{text}");
    }
    if args.write {
        write(&target, &text)?;
        eprintln!("{} Wrote {} to {}", "✓".green().bold(), kind, target.display());
    }
    Ok(())
}

fn action_label(action: FileAction) -> &'static str {
    match action {
        FileAction::Added => "added",
        FileAction::Restored => "restored",
        FileAction::Updated => "updated",
        FileAction::Unchanged => "unchanged",
        FileAction::Removed => "removed",
        FileAction::Orphaned => "kept (custom)",
        FileAction::Merged => "merged",
        FileAction::Conflict => "conflict",
        FileAction::Reported => "see report",
        FileAction::Skipped => "skipped",
    }
}

fn print_file(file: &FileReport) {
    let label = format!("{:<14}", action_label(file.action));
    let label = match file.status {
        FileStatus::Preserved => label.dimmed(),
        FileStatus::Modified => label.green(),
        FileStatus::NeedsAttention => label.yellow().bold(),
    };
    println!("  {} {}", label, file.path);
    if let Some(report_path) = &file.report_path {
        println!("      report: {}", report_path.display().to_string().cyan());
    }
    for note in &file.notes {
        println!("      {}", note.dimmed());
    }
}

fn print_update(report: &UpdateReport) {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    println!(
        "Updating from {} to {}{}",
        report.from.to_string().yellow(),
        report.to.to_string().yellow().bold(),
        mode
    );
    if let Some(detected) = &report.detection {
        print_detection(detected);
    }
    for file in &report.files {
        print_file(file);
    }
    let s = &report.summary;
    println!(
        "{} added, {} updated, {} removed, {} merged, {} conflicts, {} kept as custom",
        s.added, s.updated, s.removed, s.merged, s.conflicts, s.orphaned
    );
    if report.is_clean() {
        println!("{} Update complete.", "✓".green().bold());
    } else {
        println!(
            "{} {} file(s) need attention.",
            "!".yellow().bold(),
            report.count(FileStatus::NeedsAttention)
        );
    }
}

fn cmd_update(args: UpdateArgs, mut config: UpdaterConfig, json: bool) -> anyhow::Result<()> {
    config.dry_run |= args.dry_run;
    config.assume_undetected |= args.assume_undetected;
    let provider = DirectoryProvider::new(&args.releases);
    let mut updater = Updater::new(&args.root, config, provider);
    if let Some(path) = &args.database {
        updater = updater.with_database(FingerprintDatabase::load(path)?);
    }

    let report = match &args.to {
        Some(version) => updater.update(&ReleaseVersion::new(version.as_str())?)?,
        None => updater.update_to_latest()?,
    };
    if json {
        println!("{}", report.to_json()?);
    } else {
        print_update(&report);
    }
    Ok(())
}
