use indexly::analysis::{self, clean, CleanOptions, DocumentFormat, StatsFormat};
use indexly::backup::{self, BackupOutcome};
use indexly::compare::{self, Comparison};
use indexly::config::{self, IndexlyConfig};
use indexly::eventlog::{self, CleanOptions as LogCleanOptions, EventLogger, ExportFormat};
use indexly::ignore::{Preset, IGNORE_FILE_NAME};
use indexly::indexer::IndexOptions;
use indexly::organize::{self, ExecuteOptions, ListFilter, ScaffoldOptions, SortBy};
use indexly::output::{emit_success, OutputMode};
use indexly::profiles::{self, ReplaySource};
use indexly::rename::{self, RenameOptions, RenameStatus};
use indexly::search::{ParsedQuery, SearchMode, SearchRequest, SearchResult};
use indexly::storage::{migrate, normalize_path};
use indexly::tags::{self, TagAction};
use indexly::ui::{self, render_rows, stats_table, Icons, IndexProgress};
use indexly::watcher::Watcher;
use indexly::{IndexStore, Indexer, SearchEngine};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tabled::Tabled;

/// Shared state for one command invocation
pub struct Context {
    pub config: IndexlyConfig,
    pub mode: OutputMode,
    pub verbose: bool,
}

impl Context {
    fn open_store(&self) -> anyhow::Result<IndexStore> {
        let path = self.config.database_path();
        config::ensure_db_dir(&path)?;
        Ok(IndexStore::open(&path)?)
    }

    fn event_logger(&self) -> EventLogger {
        match EventLogger::start(&self.config.log, self.config.log_dir()) {
            Ok(logger) => logger.with_echo(self.verbose),
            Err(e) => {
                tracing::warn!("Event log disabled: {}", e);
                EventLogger::disabled()
            }
        }
    }

    fn human(&self) -> bool {
        self.mode.is_human()
    }
}

pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "indexly".to_string())
}

fn index_options(ctx: &Context, ignore: Option<PathBuf>, preset: Option<String>) -> IndexOptions {
    let mut options = IndexOptions::from_config(&ctx.config);
    options.ignore_file = ignore;
    if let Some(preset) = preset {
        options.ignore_preset = preset;
    }
    options
}

// ========== Indexing ==========

pub fn run_index(
    ctx: &Context,
    path: &Path,
    tags: Vec<String>,
    ignore: Option<PathBuf>,
    preset: Option<String>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let logger = ctx.event_logger();
    let mut options = index_options(ctx, ignore, preset);
    options.tags = tags;
    if let Some(workers) = workers {
        options.workers = workers;
    }

    if ctx.human() {
        ui::header(&format!("Indexing {}", path.display()));
        ui::status(Icons::DATABASE, "Database", &ctx.config.database_path().display().to_string());
    }

    let (progress, indexer) = if ctx.human() {
        let (progress, tx) = IndexProgress::new();
        (Some(progress), Indexer::new(&store, &logger, options).with_progress(tx))
    } else {
        (None, Indexer::new(&store, &logger, options))
    };
    let result = indexer.index_root(path);
    // Closes the progress channel
    drop(indexer);
    if let Some(progress) = progress {
        progress.finish();
    }
    let stats = result?;
    logger.flush();

    if ctx.human() {
        IndexProgress::summary(&stats);
        if stats.failed > 0 {
            ui::warn(&format!("{} files failed, see the event log", stats.failed));
        }
    }
    emit_success(ctx.mode, "index", &stats)
}

pub fn run_watch(
    ctx: &Context,
    path: PathBuf,
    ignore: Option<PathBuf>,
    preset: Option<String>,
) -> anyhow::Result<()> {
    if !path.is_dir() {
        anyhow::bail!("not a folder: {}", path.display());
    }
    let store = ctx.open_store()?;
    let logger = ctx.event_logger();
    let indexer = Indexer::new(&store, &logger, index_options(ctx, ignore, preset));

    if ctx.human() {
        ui::header(&format!("Watching {} (Ctrl+C to stop)", path.display()));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let stats = Watcher::new(path, &indexer).with_stop(stop).run()?;
    logger.flush();
    if ctx.human() {
        ui::success(&format!(
            "Stopped: {} indexed, {} removed, {} skipped",
            stats.indexed, stats.removed, stats.skipped
        ));
    }
    emit_success(ctx.mode, "watch", stats)
}

// ========== Search ==========

fn highlight_terms(request: &SearchRequest) -> Vec<String> {
    match request.mode {
        SearchMode::Fts => ParsedQuery::parse(&request.term)
            .map(|q| q.terms())
            .unwrap_or_default(),
        SearchMode::Regex => Vec::new(),
    }
}

fn print_results(results: &[SearchResult], terms: &[String], note: &str) {
    if results.is_empty() {
        ui::warn("No results");
        return;
    }
    println!(
        "{} {} results{}",
        Icons::SEARCH,
        results.len().bold(),
        ui::dim(note)
    );
    for result in results {
        println!();
        println!("{} {}", Icons::FILE, ui::path(&result.path));
        let mut meta = format!("modified {}", result.modified);
        if !result.tags.is_empty() {
            meta.push_str(&format!("  {} {}", Icons::TAG, result.tags.join(", ")));
        }
        println!("   {}", ui::dim(&meta));
        if !result.snippet.is_empty() {
            println!("   {}", ui::highlight(&result.snippet, terms));
        }
    }
}

pub fn run_search(
    ctx: &Context,
    request: SearchRequest,
    no_cache: bool,
    save_profile: Option<String>,
    profile: Option<String>,
) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let engine = SearchEngine::new(&store, &ctx.config);

    let (results, note, source) = match &profile {
        Some(name) => {
            let stored = profiles::load(&store, name)?;
            let term = (!request.term.trim().is_empty()).then_some(request.term.as_str());
            let (results, source) = profiles::replay(&engine, &stored, term)?;
            let note = match source {
                ReplaySource::Stored => format!(" (profile '{}', stored results)", name),
                ReplaySource::Live => format!(" (profile '{}', live search)", name),
            };
            (results, note, Some(source))
        }
        None => {
            let outcome = engine.search(&request, !no_cache)?;
            let note = if outcome.cached { " (cached)" } else { "" };
            (outcome.results, note.to_string(), None)
        }
    };

    if let Some(name) = &save_profile {
        profiles::save(&store, name, &request, &results)?;
        if ctx.human() {
            ui::success(&format!("Saved profile '{}' ({} results)", name, results.len()));
        }
    }

    if ctx.human() {
        print_results(&results, &highlight_terms(&request), &note);
        return Ok(());
    }
    emit_success(
        ctx.mode,
        "search",
        serde_json::json!({
            "term": request.term,
            "profile": profile,
            "source": source,
            "count": results.len(),
            "results": results,
        }),
    )
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Results")]
    results: usize,
    #[tabled(rename = "Saved")]
    saved_at: String,
}

pub fn run_profile_list(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let saved = profiles::list(&store)?;

    if ctx.human() {
        if saved.is_empty() {
            ui::info("No saved profiles", "use --save-profile NAME");
            return Ok(());
        }
        let rows: Vec<ProfileRow> = saved
            .iter()
            .map(|p| ProfileRow {
                name: p.name.clone(),
                term: p.request.term.clone(),
                results: p.results.len(),
                saved_at: p.saved_at.clone(),
            })
            .collect();
        println!("{}", render_rows(&rows));
        return Ok(());
    }
    emit_success(ctx.mode, "search", &saved)
}

pub fn run_profile_delete(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    profiles::delete(&store, name)?;
    if ctx.human() {
        ui::success(&format!("Deleted profile '{}'", name));
    }
    emit_success(ctx.mode, "search", serde_json::json!({ "deleted": name }))
}

pub fn run_regex(ctx: &Context, request: SearchRequest, no_cache: bool) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let engine = SearchEngine::new(&store, &ctx.config);
    let outcome = engine.search(&request, !no_cache)?;

    if ctx.human() {
        let note = if outcome.cached { " (cached)" } else { "" };
        print_results(&outcome.results, &[], note);
        return Ok(());
    }
    emit_success(
        ctx.mode,
        "regex",
        serde_json::json!({
            "pattern": request.term,
            "count": outcome.results.len(),
            "results": outcome.results,
        }),
    )
}

// ========== Tags ==========

pub fn run_tag(
    ctx: &Context,
    paths: &[PathBuf],
    tag_list: &[String],
    action: TagAction,
    recursive: bool,
) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let updated = tags::apply(&store, paths, tag_list, action, recursive)?;

    if ctx.human() {
        if updated.is_empty() {
            ui::warn("No indexed files matched");
        }
        for file in &updated {
            println!("{} {} {}", Icons::TAG, file.path, ui::dim(&format!("[{}]", file.tags.join(", "))));
        }
        let verb = match action {
            TagAction::Add => "Tagged",
            TagAction::Remove => "Untagged",
        };
        ui::success(&format!("{} {} files", verb, updated.len()));
    }
    emit_success(ctx.mode, "tag", &updated)
}

pub fn run_tag_list(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let key = normalize_path(path);
    let file_tags = store.get_tags(&key)?;

    if ctx.human() {
        if file_tags.is_empty() {
            ui::info("No tags", &key);
        } else {
            println!("{} {}: {}", Icons::TAG, key, file_tags.join(", "));
        }
    }
    emit_success(ctx.mode, "tag", serde_json::json!({ "path": key, "tags": file_tags }))
}

// ========== Stats ==========

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Files")]
    files: usize,
}

pub fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let stats = store.stats()?;
    let top_tags = store.tag_counts(10)?;

    if ctx.human() {
        println!("{} Indexly Statistics ({})", Icons::STATS, ctx.config.database_path().display());
        println!(
            "{}",
            stats_table(&[
                ("Indexed files", stats.files.to_string()),
                ("Tagged files", stats.tagged.to_string()),
                ("Cached searches", stats.cache_entries.to_string()),
                ("Profiles", stats.profiles.to_string()),
                ("Generation", stats.generation.to_string()),
                ("DB size", format!("{:.1} KB", stats.db_bytes as f64 / 1024.0)),
            ])
        );
        if !top_tags.is_empty() {
            ui::section("Top tags");
            let rows: Vec<TagRow> = top_tags
                .iter()
                .map(|(tag, files)| TagRow { tag: tag.clone(), files: *files })
                .collect();
            println!("{}", render_rows(&rows));
        }
        return Ok(());
    }
    let tags_json: Vec<_> = top_tags
        .iter()
        .map(|(tag, files)| serde_json::json!({ "tag": tag, "files": files }))
        .collect();
    emit_success(ctx.mode, "stats", serde_json::json!({ "stats": stats, "top_tags": tags_json }))
}

// ========== Rename ==========

pub fn run_rename(ctx: &Context, path: &Path, options: &RenameOptions) -> anyhow::Result<()> {
    let store = if options.update_db && !options.dry_run {
        Some(ctx.open_store()?)
    } else {
        None
    };
    let outcomes = rename::rename_path(path, options, store.as_ref())?;

    if ctx.human() {
        for outcome in &outcomes {
            match outcome.status {
                RenameStatus::Renamed => println!("{} {} → {}", Icons::MOD, outcome.from, outcome.to),
                RenameStatus::WouldRename => {
                    println!("{} {} → {} {}", Icons::PREVIEW, outcome.from, outcome.to, ui::dim("(dry run)"))
                }
                RenameStatus::Unchanged => println!("{} {}", Icons::SKIP, ui::dim(&outcome.from)),
                RenameStatus::SkippedEmpty => {
                    println!("{} {} {}", Icons::SKIP, outcome.from, ui::dim("(empty file)"))
                }
            }
        }
        let renamed = outcomes
            .iter()
            .filter(|o| matches!(o.status, RenameStatus::Renamed | RenameStatus::WouldRename))
            .count();
        ui::success(&format!("{} of {} files renamed", renamed, outcomes.len()));
    }
    emit_success(ctx.mode, "rename-file", &outcomes)
}

// ========== Organize ==========

fn print_plan_summary(plan: &organize::OrganizePlan) {
    let s = &plan.summary;
    println!(
        "{}",
        stats_table(&[
            ("Files", s.total_files.to_string()),
            ("Documents", s.documents.to_string()),
            ("Pictures", s.pictures.to_string()),
            ("Videos", s.videos.to_string()),
            ("Audio", s.audio.to_string()),
            ("Archives", s.archives.to_string()),
            ("Code", s.code.to_string()),
            ("Data", s.data.to_string()),
            ("Others", s.others.to_string()),
            ("Duplicates", s.duplicates.to_string()),
        ])
    );
}

pub fn run_organize(
    ctx: &Context,
    root: &Path,
    sort: &str,
    backup_root: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let sort_by: SortBy = sort.parse()?;
    let executed_by = current_user();

    if dry_run {
        let plan = organize::plan(root, sort_by, &executed_by)?;
        if ctx.human() {
            for file in plan.files.iter().filter(|f| !f.unchanged) {
                println!("{} {} → {}", Icons::PREVIEW, file.original_path, file.new_path);
            }
            print_plan_summary(&plan);
            ui::info("Dry run", "nothing was moved");
        }
        return emit_success(ctx.mode, "organize", &plan);
    }

    let options = ExecuteOptions {
        sort_by,
        executed_by,
        backup_root,
        log_dir: None,
    };
    let report = organize::execute(root, &options)?;
    if ctx.human() {
        print_plan_summary(&report.plan);
        ui::status(Icons::EXPORT, "Log", &report.log_path.display().to_string());
        if !report.backups.is_empty() {
            ui::info("Backed up", &report.backups.len().to_string());
        }
        ui::success("Organized");
    }
    emit_success(ctx.mode, "organize", &report)
}

#[derive(Tabled)]
struct ListRow {
    #[tabled(rename = "File")]
    path: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Ext")]
    extension: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Duplicate")]
    duplicate: String,
}

pub fn run_lister(ctx: &Context, log: &Path, filter: &ListFilter) -> anyhow::Result<()> {
    let plan = organize::load_log(log)?;
    let files = organize::list(&plan, filter);

    if ctx.human() {
        if files.is_empty() {
            ui::warn("No matching files");
            return Ok(());
        }
        let rows: Vec<ListRow> = files
            .iter()
            .map(|f| ListRow {
                path: f.new_path.clone(),
                category: f.category.folder().to_string(),
                extension: f.extension.clone(),
                modified: f.modified.clone(),
                duplicate: if f.duplicate { "yes".to_string() } else { String::new() },
            })
            .collect();
        println!("{}", render_rows(&rows));
        ui::info("Files", &files.len().to_string());
        return Ok(());
    }
    emit_success(ctx.mode, "lister", &files)
}

pub fn run_organize_profile(
    ctx: &Context,
    profile: &str,
    root: &Path,
    options: &ScaffoldOptions,
    place: &[String],
) -> anyhow::Result<()> {
    if !place.is_empty() {
        let files = organize::expand_sources(place)?;
        let plan = organize::build_plan(root, &files, profile, options.shoot_name.as_deref());
        let moved = if options.apply { organize::apply_plan(&plan)? } else { 0 };
        if ctx.human() {
            for placement in &plan {
                println!(
                    "{} {} → {} {}",
                    Icons::FOLDER,
                    placement.source,
                    placement.destination,
                    ui::dim(&format!("({})", placement.rule))
                );
            }
            if options.apply {
                ui::success(&format!("Moved {} of {} files", moved, plan.len()));
            } else {
                ui::info("Dry run", "use --apply to move the files");
            }
            return Ok(());
        }
        return emit_success(
            ctx.mode,
            "organize-profile",
            serde_json::json!({ "placements": plan, "moved": moved }),
        );
    }

    let report = organize::scaffold(root, profile, options)?;
    if ctx.human() {
        ui::header(&format!("Profile '{}' in {}", report.profile, report.root));
        for folder in &report.folders {
            let marker = if report.created.contains(folder) { Icons::NEW } else { Icons::FOLDER };
            println!("  {} {}", marker, folder);
        }
        if options.apply {
            ui::success(&format!("Created {} folders", report.created.len()));
        } else {
            ui::info("Dry run", "use --apply to create the folders");
        }
        ui::section("Next steps");
        println!("{}", report.next_steps);
        return Ok(());
    }
    emit_success(ctx.mode, "organize-profile", &report)
}

// ========== Backup ==========

pub fn run_backup(ctx: &Context, root: &Path, source: &Path, incremental: bool) -> anyhow::Result<()> {
    let spinner = ctx.human().then(|| ui::Spinner::new(&format!("Backing up {}", source.display())));
    let outcome = backup::run_backup(root, source, incremental, ctx.config.backup.keep_full);
    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }
    let outcome = outcome?;

    if ctx.human() {
        match &outcome {
            BackupOutcome::Unchanged => ui::info("No changes since the last backup", &source.display().to_string()),
            BackupOutcome::Created(report) => {
                ui::success(&format!("{} backup created", report.kind));
                println!(
                    "{}",
                    stats_table(&[
                        ("Archive", report.archive.display().to_string()),
                        ("SHA-256", report.checksum.clone()),
                        ("Files copied", report.copied.to_string()),
                        ("Deleted", report.deleted.to_string()),
                        ("Bytes", report.bytes.to_string()),
                        ("Rotated out", report.rotated.to_string()),
                    ])
                );
            }
        }
        return Ok(());
    }
    emit_success(ctx.mode, "backup", &outcome)
}

pub fn run_restore(ctx: &Context, root: &Path, name: &str, target: &Path) -> anyhow::Result<()> {
    let report = backup::restore_backup(root, name, target)?;
    if ctx.human() {
        ui::success(&format!(
            "Restored {} ({} archives, {} files) into {}",
            report.backup,
            report.steps,
            report.files,
            report.target.display()
        ));
    }
    emit_success(ctx.mode, "restore", &report)
}

pub fn run_auto_init(ctx: &Context, root: &Path, source: &Path) -> anyhow::Result<()> {
    let created = backup::auto::init(root, source)?;
    if ctx.human() {
        if created {
            ui::success(&format!("Automatic backup enabled for {}", source.display()));
            ui::info(
                "Schedule",
                &format!("run `indexly backup {} --incremental` periodically", source.display()),
            );
        } else {
            ui::info("Automatic backup already enabled", &root.display().to_string());
        }
    }
    emit_success(ctx.mode, "backup-auto", serde_json::json!({ "enabled": true, "created": created }))
}

pub fn run_auto_disable(ctx: &Context, root: &Path, source: Option<&Path>, confirm: bool) -> anyhow::Result<()> {
    backup::auto::disable(root, source, confirm)?;
    if ctx.human() {
        ui::success("Automatic backup disabled; existing backups were kept");
    }
    emit_success(ctx.mode, "backup-auto", serde_json::json!({ "enabled": false }))
}

// ========== Analysis ==========

/// Where `analyze-csv` takes its rows from
pub enum CsvSource {
    File,
    Clean { options: CleanOptions, persist: bool },
    Stored,
}

fn export_format(dest: &Path, format: Option<&str>) -> anyhow::Result<StatsFormat> {
    Ok(match format {
        Some(f) => f.parse()?,
        None => match dest.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => StatsFormat::Json,
            _ => StatsFormat::Text,
        },
    })
}

pub fn run_analyze_csv(
    ctx: &Context,
    file: &Path,
    source: CsvSource,
    export: Option<&Path>,
    format: Option<&str>,
) -> anyhow::Result<()> {
    let result = match source {
        CsvSource::File => analysis::analyze_csv(file)?,
        CsvSource::Clean { options, persist } => {
            let (delimiter, table) = analysis::load_csv(file)?;
            let (cleaned, report) = clean::auto_clean(&table, &options)?;
            if persist {
                let store = ctx.open_store()?;
                clean::save(&store, file, &cleaned)?;
            }
            if ctx.human() {
                ui::header(&format!("{} Cleaning summary", Icons::CLEAN));
                println!("{}", report.render_table());
                ui::success(&format!(
                    "{} rows remain ({} duplicates, {} outliers removed)",
                    report.rows_out, report.duplicates_removed, report.outliers_removed
                ));
                if persist {
                    ui::status(Icons::EXPORT, "Saved cleaned data", &ui::path(&file.display().to_string()));
                }
            }
            let mut result = analysis::analyze_table(file, Some(delimiter), &cleaned);
            result.cleaning = Some(report);
            result
        }
        CsvSource::Stored => {
            let store = ctx.open_store()?;
            let table = clean::load(&store, file)?;
            analysis::analyze_table(file, None, &table)
        }
    };

    if let Some(dest) = export {
        result.export(dest, export_format(dest, format)?)?;
        if ctx.human() {
            ui::status(Icons::EXPORT, "Exported", &dest.display().to_string());
        }
    }

    if ctx.human() {
        ui::header(&format!("{} ({} rows)", result.path.display(), result.rows));
        if result.numeric.is_empty() {
            ui::warn("No numeric columns");
        } else {
            println!("{}", result.render_table());
        }
        if !result.non_numeric.is_empty() {
            ui::info("Non-numeric columns", &result.non_numeric.join(", "));
        }
        return Ok(());
    }
    emit_success(ctx.mode, "analyze-csv", &result)
}

pub fn run_clear_cleaned(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let cleared = clean::clear(&store, file)?;
    if ctx.human() {
        if cleared {
            ui::success(&format!("Removed cleaned data for {}", file.display()));
        } else {
            ui::warn(&format!("No cleaned data stored for {}", file.display()));
        }
    }
    emit_success(
        ctx.mode,
        "analyze-csv",
        serde_json::json!({ "path": normalize_path(file), "cleared": cleared }),
    )
}

pub fn run_analyze_document(
    ctx: &Context,
    file: &Path,
    kind: DocumentFormat,
    export: Option<&Path>,
    format: Option<&str>,
) -> anyhow::Result<()> {
    let result = analysis::document::analyze_document(file, kind)?;
    let command = match kind {
        DocumentFormat::Json => "analyze-json",
        DocumentFormat::Xml => "analyze-xml",
    };

    if let Some(dest) = export {
        result.export(dest, export_format(dest, format)?)?;
        if ctx.human() {
            ui::status(Icons::EXPORT, "Exported", &dest.display().to_string());
        }
    }

    if ctx.human() {
        let records_at = if result.records_at.is_empty() { "root" } else { result.records_at.as_str() };
        ui::header(&format!(
            "{} ({} rows at {})",
            result.path.display(),
            result.rows,
            records_at
        ));
        if result.columns.is_empty() {
            ui::warn("No data to analyze");
            return Ok(());
        }
        println!("{}", result.render_overview());
        if result.numeric.is_empty() {
            ui::warn("No numeric columns");
        } else {
            println!("{}", result.render_stats());
        }
        return Ok(());
    }
    emit_success(ctx.mode, command, &result)
}

pub fn run_compare(ctx: &Context, left: &Path, right: &Path) -> anyhow::Result<i32> {
    let comparison = compare::compare(left, right)?;
    let code = comparison.exit_code();

    if ctx.human() {
        match &comparison {
            Comparison::File(file) if file.identical => ui::success("Files are identical"),
            Comparison::File(file) => {
                ui::warn("Files differ");
                if let Some(text) = &file.text {
                    if let Some(line) = text.first_difference {
                        ui::info("First difference at line", &line.to_string());
                    }
                    ui::info("Lines added", &text.lines_added.to_string());
                    ui::info("Lines removed", &text.lines_removed.to_string());
                }
            }
            Comparison::Folder(folder) if folder.identical() => {
                ui::success(&format!("Folders are identical ({} files)", folder.unchanged))
            }
            Comparison::Folder(folder) => {
                for path in &folder.added {
                    println!("{} {}", "+".style(ui::theme().success.clone()), path);
                }
                for path in &folder.removed {
                    println!("{} {}", "-".style(ui::theme().error.clone()), path);
                }
                for path in &folder.modified {
                    println!("{} {}", "~".style(ui::theme().warn.clone()), path);
                }
                ui::warn(&format!(
                    "{} added, {} removed, {} modified",
                    folder.added.len(),
                    folder.removed.len(),
                    folder.modified.len()
                ));
            }
        }
    } else {
        emit_success(ctx.mode, "compare", &comparison)?;
    }
    Ok(code)
}

// ========== Maintenance ==========

pub fn run_update_db(ctx: &Context, apply: bool) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let steps = migrate::check_schema(store.connection())?;

    if apply && !steps.is_empty() {
        migrate::apply(store.connection(), &steps)?;
    }

    if ctx.human() {
        if steps.is_empty() {
            ui::success("Schema is up to date");
        } else {
            for step in &steps {
                println!("{} {}", Icons::MIGRATE, step);
            }
            if apply {
                ui::success(&format!("Applied {} migrations", steps.len()));
            } else {
                ui::info("Dry run", "use --apply to migrate");
            }
        }
        return Ok(());
    }
    emit_success(ctx.mode, "update-db", serde_json::json!({ "steps": steps, "applied": apply }))
}

pub fn run_cache_clear(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let removed = SearchEngine::new(&store, &ctx.config).cache().clear()?;
    if ctx.human() {
        ui::success(&format!("Removed {} cached searches", removed));
    }
    emit_success(ctx.mode, "cache", serde_json::json!({ "removed": removed }))
}

pub fn run_cache_refresh(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let refreshed = SearchEngine::new(&store, &ctx.config).refresh_cache()?;
    if ctx.human() {
        ui::success(&format!("Refreshed {} cached searches", refreshed));
    }
    emit_success(ctx.mode, "cache", serde_json::json!({ "refreshed": refreshed }))
}

pub fn run_cache_prune(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let removed = SearchEngine::new(&store, &ctx.config).cache().prune()?;
    if ctx.human() {
        ui::success(&format!("Pruned {} cached searches", removed));
    }
    emit_success(ctx.mode, "cache", serde_json::json!({ "removed": removed }))
}

pub fn run_logs_clean(
    ctx: &Context,
    source: Option<PathBuf>,
    format: &str,
    out: Option<&Path>,
    combine: bool,
    dedupe: bool,
) -> anyhow::Result<()> {
    let source = source.unwrap_or_else(|| ctx.config.log_dir());
    let format: ExportFormat = format.parse()?;
    let options = LogCleanOptions {
        format,
        out,
        combine,
        dedupe,
    };
    let report = eventlog::clean_logs(&source, &options)?;

    if ctx.human() {
        for path in &report.written {
            ui::status(Icons::EXPORT, "Wrote", &path.display().to_string());
        }
        ui::status(Icons::EXPORT, "Summary", &report.summary.display().to_string());
        ui::success(&format!("{} entries exported", report.entries));
    }
    emit_success(ctx.mode, "logs", &report)
}

pub fn run_init(ctx: &Context, path: &Path, force: bool, ignore_preset: Option<&str>) -> anyhow::Result<()> {
    config::write_config(path, &IndexlyConfig::default(), force)?;

    let ignore_path = match ignore_preset {
        Some(name) => {
            let preset = Preset::parse(name)
                .ok_or_else(|| anyhow::anyhow!("unknown ignore preset '{}'", name))?;
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let target = dir.join(IGNORE_FILE_NAME);
            if target.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", target.display());
            }
            std::fs::write(&target, preset.template())?;
            Some(target)
        }
        None => None,
    };

    if ctx.human() {
        ui::success(&format!("Wrote {}", path.display()));
        if let Some(target) = &ignore_path {
            ui::success(&format!("Wrote {}", target.display()));
        }
    }
    emit_success(
        ctx.mode,
        "init",
        serde_json::json!({ "config": path, "ignore_file": ignore_path }),
    )
}
