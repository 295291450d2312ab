//! Diff and analytics commands

use super::{read_payload, CommandContext};
use inventory_differ::analytics::{self, format_summary};
use inventory_differ::{ClassifiedChange, DiffEngine, DiffReport, DiffSubject};
use std::path::Path;

pub struct DiffOptions<'a> {
    pub previous: &'a Path,
    pub current: &'a Path,
    pub subject: DiffSubject,
    pub significant_only: bool,
    pub json: bool,
}

fn compute(engine: &DiffEngine, opts: &DiffOptions<'_>) -> anyhow::Result<DiffReport> {
    let previous = read_payload(opts.previous)?;
    let current = read_payload(opts.current)?;
    let mut report = engine.compute_diff(opts.subject.clone(), &previous, &current)?;
    if opts.significant_only {
        report.changes.retain(|c| c.significant);
    }
    Ok(report)
}

fn print_change(change: &ClassifiedChange) {
    let marker = if change.significant { "●" } else { "○" };
    println!(
        "{} [{:<8}] {:<6} {} ({})",
        marker,
        change.severity.as_str().to_uppercase(),
        change.kind(),
        change.field_path(),
        change.category
    );
    println!(
        "      {} → {}",
        change.change.display_previous(),
        change.change.display_new()
    );
}

pub async fn run(ctx: &CommandContext, opts: DiffOptions<'_>) -> anyhow::Result<()> {
    let engine = ctx.load_engine()?;
    let report = compute(&engine, &opts)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("📊 Inventory Diff");
    println!("─────────────────");
    if !report.subject.entity_id.is_empty() {
        println!(
            "Entity: {}  ({} → {})",
            report.subject.entity_id, report.subject.previous_id, report.subject.current_id
        );
    }
    println!("Run: {}\n", report.run_id);

    for change in &report.changes {
        print_change(change);
    }

    println!("\n{}", format_summary(&report.changes));
    println!("Significant: {}/{}", report.significant_count(), report.changes.len());
    Ok(())
}

pub async fn analyze(ctx: &CommandContext, opts: DiffOptions<'_>, top: usize) -> anyhow::Result<()> {
    let engine = ctx.load_engine()?;
    let report = compute(&engine, &opts)?;
    let analytics = engine.analyze(&report.changes);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
        return Ok(());
    }

    let summary = &analytics.summary;
    println!("📈 Inventory Analytics");
    println!("──────────────────────");
    println!("Changes:      {}", summary.total_changes);
    println!("Health score: {:.1}", summary.health_score);
    println!("Noisiness:    {:.1}%", summary.noisiness);

    println!("\nBy severity:");
    for (severity, count) in &summary.severity_distribution {
        println!("  {:<10} {}", severity, count);
    }
    println!("\nBy category:");
    for (category, count) in &summary.category_distribution {
        println!("  {:<10} {}", category, count);
    }

    println!("\nTop changed paths:");
    for freq in analytics::top_changed_paths(&report.changes, top) {
        println!("  {:<24} {}", freq.path, freq.count);
    }

    println!("\nGroups:");
    for (group, members) in &analytics.groups {
        println!("  {:<24} {}", group, members.len());
    }

    if let Some(trends) = &analytics.trends {
        println!("\nTrends:");
        if let Some(category) = &trends.most_changed_category {
            println!("  most changed category: {}", category);
        }
        if let Some(severity) = trends.dominant_severity {
            println!("  dominant severity:     {}", severity);
        }
        if let Some(kind) = trends.dominant_type {
            println!("  dominant change type:  {}", kind);
        }
        println!(
            "  critical: {} ({:.1}%), configuration: {} ({:.1}%)",
            trends.change_patterns.critical_changes,
            trends.change_patterns.critical_ratio,
            trends.change_patterns.configuration_changes,
            trends.change_patterns.configuration_ratio
        );
    }

    if summary.anomalies.is_empty() {
        println!("\n✅ No anomalies");
    } else {
        println!("\n⚠️  Anomalies ({}):", summary.anomaly_count);
        for change in &summary.anomalies {
            print_change(change);
        }
    }

    Ok(())
}
