//! Rules management commands

use super::CommandContext;
use anyhow::Context;
use inventory_differ::config::RuleSet;
use inventory_differ::rules::CompiledRules;
use std::path::Path;

/// Print the active rule document as YAML
pub async fn show(ctx: &CommandContext) -> anyhow::Result<()> {
    let engine = ctx.load_engine()?;
    let active = engine.active();

    println!("# source: {}", active.source);
    println!("# digest: {}", active.digest);
    print!("{}", active.compiled.rules().to_yaml()?);
    Ok(())
}

/// Parse, validate and compile a rules file without activating it
pub async fn validate(file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read rules file {}", file.display()))?;
    let rules = RuleSet::from_yaml(&text)
        .with_context(|| format!("{} is not a valid rules document", file.display()))?;
    let compiled = CompiledRules::compile(&rules)
        .with_context(|| format!("{} contains an invalid pattern", file.display()))?;

    println!("✅ {} is valid", file.display());
    println!("   categories: {}", rules.categorization.categories.len());
    println!("   patterns:   {}", compiled.pattern_count());
    println!(
        "   limits:     depth {}, changes {}, path length {}",
        compiled.limits().max_diff_depth,
        compiled.limits().max_changes_per_run,
        compiled.limits().max_field_path_length
    );
    Ok(())
}

/// Show the limits, categories and severity levels in effect
pub async fn stats(ctx: &CommandContext, json: bool) -> anyhow::Result<()> {
    let engine = ctx.load_engine()?;
    let stats = engine.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("📋 Rules");
    println!("────────");
    println!("Source:   {}", stats.rules_source);
    println!("Digest:   {}", stats.rules_digest);
    println!("Loaded:   {}", stats.config_load_time.to_rfc3339());
    println!("Patterns: {}", stats.pattern_count);
    println!(
        "Limits:   depth {}, changes {}, path length {}",
        stats.max_diff_depth, stats.max_diffs_per_run, stats.max_field_path_length
    );

    println!("\nCategories:");
    for (name, description) in &stats.all_categories {
        println!("  {:<14} {}", name, description);
    }

    println!("\nSeverity levels:");
    for (severity, description) in &stats.all_severity_levels {
        println!("  {:<14} {}", severity, description);
    }

    let filters = &stats.significance_filters;
    println!("\nSignificance:");
    println!("  always:  {}", filters.always_significant.len());
    println!("  never:   {}", filters.never_significant.len());
    println!("  time:    {}", filters.time_filters.ignore_frequent.len());
    println!("  value:   {}", filters.value_filters.ignore_minor.len());
    Ok(())
}
