//! Spellbook Sync CLI
//!
//! Inspect and build sync payloads without a browser: validate what the web
//! app would post, preview an ops payload, diff a legacy payload against a
//! prepared list, and turn pending changes into a v2 payload.

#[cfg(feature = "e2e")]
mod e2e;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};

use sb_core::messages::PayloadSummary;
use sb_core::payload::validate_payload_str;
use sb_core::planner::{build_ops_payload, PendingChange};
use sb_core::preview::{summarize_ops, OpsPreview};
use sb_core::url::{match_character_tab, tab_character_id};
use sb_core::{compute_diff, extract_dndbeyond_character_id, is_sync_target, spell_key, SpellDiff, SyncPayload};

#[derive(Parser)]
#[command(name = "sb-cli")]
#[command(about = "Spellbook Sync payload tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a payload file with the extension's validator
    Validate {
        /// Payload JSON file
        #[arg(short, long)]
        input: String,

        /// Print the normalized payload
        #[arg(short, long)]
        verbose: bool,
    },

    /// Summarize what an ops (v2) payload would do
    Preview {
        /// Payload JSON file
        #[arg(short, long)]
        input: String,
    },

    /// Diff a legacy (v1) payload against the spells prepared now
    Diff {
        /// Payload JSON file
        #[arg(short, long)]
        input: String,

        /// JSON array of currently prepared spell names
        #[arg(short, long)]
        current: String,
    },

    /// Build a v2 payload from a JSON array of pending changes
    Plan {
        /// Pending changes JSON file
        #[arg(short, long)]
        input: String,

        /// Write the payload here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Check a tab URL and extract its character id
    CharacterId {
        url: String,
    },

    /// Write TypeScript definitions for the wire types
    #[cfg(feature = "ts")]
    ExportTypes {
        /// Output directory
        #[arg(long, default_value = "bindings")]
        out_dir: String,
    },

    /// Run the packed extension in Chrome and check its pages
    #[cfg(feature = "e2e")]
    E2e {
        /// WebDriver endpoint
        #[arg(long, default_value = "http://localhost:9515")]
        chromedriver_url: String,

        /// Unpacked extension directory
        #[arg(long)]
        extension_path: String,

        /// Run Chrome headless
        #[arg(long)]
        headless: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { input, verbose } => cmd_validate(&input, verbose),
        Commands::Preview { input } => cmd_preview(&input),
        Commands::Diff { input, current } => cmd_diff(&input, &current),
        Commands::Plan { input, output } => cmd_plan(&input, output.as_deref()),
        Commands::CharacterId { url } => cmd_character_id(&url),
        #[cfg(feature = "ts")]
        Commands::ExportTypes { out_dir } => cmd_export_types(&out_dir),
        #[cfg(feature = "e2e")]
        Commands::E2e {
            chromedriver_url,
            extension_path,
            headless,
        } => e2e::run_e2e(e2e::E2eOptions {
            chromedriver_url,
            extension_path,
            headless,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))
}

fn load_payload(path: &str) -> Result<SyncPayload, String> {
    let text = read_file(path)?;
    validate_payload_str(&text).map_err(|e| format!("Invalid payload '{}': {}", path, e))
}

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

fn cmd_validate(input: &str, verbose: bool) -> Result<(), String> {
    let payload = load_payload(input)?;
    let summary = PayloadSummary::of(&payload);

    println!("Payload '{}' is valid", input);
    println!("  Version:     {}", summary.version);
    println!("  Timestamp:   {}", summary.timestamp);
    if let Some(count) = summary.spell_count {
        println!("  Spells:      {}", count);
    }
    if let Some(count) = summary.operation_count {
        println!("  Operations:  {}", count);
        println!("  Unresolved:  {}", summary.unresolved_count);
    }
    if let Some(id) = &summary.character_id {
        println!("  Character:   {}", id);
    }

    if verbose {
        let json = serde_json::to_string_pretty(&payload).map_err(|e| e.to_string())?;
        println!("{json}");
    }
    Ok(())
}

fn cmd_preview(input: &str) -> Result<(), String> {
    match load_payload(input)? {
        SyncPayload::Ops(payload) => {
            print!("{}", render_preview(&summarize_ops(&payload)));
            Ok(())
        }
        SyncPayload::Legacy(_) => Err("Legacy payloads need the prepared list; use `diff --current`".to_string()),
    }
}

fn render_preview(preview: &OpsPreview) -> String {
    let mut out = String::new();
    if preview.already_correct {
        out.push_str("Nothing to do\n");
    }
    for list in &preview.per_list {
        out.push_str(&format!(
            "{}: {} replace, {} prepare, {} unprepare\n",
            list.list, list.replace, list.prepare, list.unprepare
        ));
        if !list.adding.is_empty() {
            out.push_str(&format!("  + {}\n", list.adding.join(", ")));
        }
        if !list.removing.is_empty() {
            out.push_str(&format!("  - {}\n", list.removing.join(", ")));
        }
    }
    out.push_str(&format!("Total: {} operations\n", preview.totals.operations));
    for skipped in &preview.skipped_from_payload {
        out.push_str(&format!(
            "  skipped #{} {}: {}\n",
            skipped.change_index,
            skipped.code.as_str(),
            skipped.detail
        ));
    }
    out
}

/// Diff `target` against the prepared names as the sheet would show them.
fn diff_against(target: &[String], current: &[String]) -> SpellDiff {
    let mut prepared_keys = HashSet::new();
    let mut name_by_key = HashMap::new();
    for name in current {
        let key = spell_key(name);
        if key.is_empty() {
            continue;
        }
        prepared_keys.insert(key.clone());
        name_by_key.entry(key).or_insert_with(|| name.trim().to_string());
    }
    compute_diff(target, &prepared_keys, &name_by_key)
}

fn cmd_diff(input: &str, current: &str) -> Result<(), String> {
    let payload = match load_payload(input)? {
        SyncPayload::Legacy(payload) => payload,
        SyncPayload::Ops(_) => return Err("Ops payloads carry their own operations; use `preview`".to_string()),
    };
    let current: Vec<String> = serde_json::from_str(&read_file(current)?)
        .map_err(|e| format!("Prepared list must be a JSON array of names: {}", e))?;

    let diff = diff_against(&payload.prepared_spells, &current);
    if diff.is_empty() {
        println!("Already correct");
        return Ok(());
    }
    for item in &diff.to_add {
        println!("+ {}", item.name);
    }
    for item in &diff.to_remove {
        println!("- {}", item.name);
    }
    println!("{} to add, {} to remove", diff.to_add.len(), diff.to_remove.len());
    Ok(())
}

fn cmd_plan(input: &str, output: Option<&str>) -> Result<(), String> {
    let changes: Vec<PendingChange> = serde_json::from_str(&read_file(input)?)
        .map_err(|e| format!("Invalid pending changes '{}': {}", input, e))?;

    let payload = build_ops_payload(&changes, now_ms()).map_err(|e| format!("Planned payload is invalid: {}", e))?;
    let json = serde_json::to_string_pretty(&payload).map_err(|e| e.to_string())?;

    match output {
        Some(path) => {
            fs::write(path, json + "\n").map_err(|e| format!("Failed to write '{}': {}", path, e))?;
            println!(
                "Planned {} operations ({} unresolved) to '{}'",
                payload.operations.len(),
                payload.unresolved.len(),
                path
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_character_id(url: &str) -> Result<(), String> {
    let strict = extract_dndbeyond_character_id(url);
    let loose = match_character_tab(url);
    println!("Sync target: {}", if is_sync_target(url) { "yes" } else { "no" });
    println!("  Strict id:   {}", strict.as_deref().unwrap_or("-"));
    println!("  Tab id:      {}", loose.as_deref().unwrap_or("-"));

    match tab_character_id(url) {
        Some(_) => Ok(()),
        None => Err(format!("'{}' is not a D&D Beyond character sheet", url)),
    }
}

#[cfg(feature = "ts")]
fn cmd_export_types(out_dir: &str) -> Result<(), String> {
    use sb_core::messages::{PageMessage, PopupStatus, RuntimeMessage};
    use sb_core::preview::SyncPreview;
    use ts_rs::TS;

    fs::create_dir_all(out_dir).map_err(|e| format!("Failed to create '{}': {}", out_dir, e))?;
    let fail = |e: ts_rs::ExportError| format!("Failed to export types: {}", e);

    SyncPayload::export_all_to(out_dir).map_err(fail)?;
    RuntimeMessage::export_all_to(out_dir).map_err(fail)?;
    PageMessage::export_all_to(out_dir).map_err(fail)?;
    PopupStatus::export_all_to(out_dir).map_err(fail)?;
    SyncPreview::export_all_to(out_dir).map_err(fail)?;
    PendingChange::export_all_to(out_dir).map_err(fail)?;

    println!("Exported TypeScript definitions to '{}'", out_dir);
    Ok(())
}
