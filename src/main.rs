//! Indexly CLI - local file indexing and search

mod commands;

use clap::{Args, Parser, Subcommand};
use commands::Context;
use indexly::analysis::DocumentFormat;
use indexly::compare::EXIT_ERROR;
use indexly::output::{self, OutputMode};
use indexly::search::{SearchFilters, SearchRequest};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "indexly")]
#[command(version)]
#[command(about = "Local file indexing and full-text search")]
#[command(long_about = r#"
Indexly indexes the text of your files into SQLite FTS5 and lets you:
  • Search with phrases, prefixes, NEAR and fuzzy matching
  • Tag files and save search profiles
  • Rename, organize and back up folders
  • Analyze CSV files and compare files or folders

Example usage:
  indexly index ./Documents --tag work
  indexly search "invoice NEAR paid" --filetype pdf,md
  indexly backup ./Documents --incremental
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as a JSON envelope
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ./indexly.toml, then ~/.indexly/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by `search` and `regex`
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// File extensions, comma separated
    #[arg(long, value_delimiter = ',')]
    filetype: Vec<String>,

    /// Modified on or after (YYYY-MM-DD)
    #[arg(long)]
    date_from: Option<String>,

    /// Modified on or before (YYYY-MM-DD)
    #[arg(long)]
    date_to: Option<String>,

    /// Path must contain this text
    #[arg(long)]
    path_contains: Option<String>,

    /// Tag must contain this text
    #[arg(long)]
    filter_tag: Option<String>,

    #[arg(long)]
    author: Option<String>,

    /// Metadata format, e.g. md or pdf
    #[arg(long)]
    format: Option<String>,

    /// Maximum number of results
    #[arg(short, long)]
    limit: Option<usize>,

    /// Characters of context on each side of a hit
    #[arg(long)]
    context: Option<usize>,

    /// Bypass the result cache
    #[arg(long)]
    no_cache: bool,
}

impl FilterArgs {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            filetypes: self.filetype.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            path_contains: self.path_contains.clone(),
            tag: self.filter_tag.clone(),
            author: self.author.clone(),
            format: self.format.clone(),
        }
    }

    fn apply(&self, request: &mut SearchRequest) {
        request.filters = self.filters();
        if let Some(limit) = self.limit {
            request.limit = limit;
        }
        if let Some(context) = self.context {
            request.context_chars = context;
        }
    }
}

/// Cleaning switches for `analyze-csv`
#[derive(Args, Debug)]
struct CleanArgs {
    /// Clean the data before analyzing it
    #[arg(long)]
    auto_clean: bool,

    /// Fill numeric gaps with the column mean or median
    #[arg(long, default_value = "mean")]
    fill_method: String,

    /// Calendar columns derived from dates: all, minimal or none
    #[arg(long, default_value = "all")]
    derive_dates: String,

    /// Share of filled cells that must parse before a column counts as dates
    #[arg(long, default_value_t = 0.6)]
    date_threshold: f64,

    /// Drop rows whose z-score reaches --outlier-z in any numeric column
    #[arg(long)]
    remove_outliers: bool,

    #[arg(long, default_value_t = 3.0)]
    outlier_z: f64,

    /// Scale numeric columns to the 0..1 range
    #[arg(long)]
    normalize: bool,

    /// Do not store the cleaned table
    #[arg(long)]
    no_persist: bool,

    /// Analyze the stored cleaned table instead of the file
    #[arg(long, conflicts_with = "auto_clean")]
    use_cleaned: bool,

    /// Remove the stored cleaned table of this file
    #[arg(long, conflicts_with_all = ["auto_clean", "use_cleaned"])]
    clear_cleaned: bool,
}

impl CleanArgs {
    fn source(&self) -> anyhow::Result<commands::CsvSource> {
        if self.use_cleaned {
            return Ok(commands::CsvSource::Stored);
        }
        if !self.auto_clean {
            return Ok(commands::CsvSource::File);
        }
        let options = indexly::analysis::CleanOptions {
            fill: self.fill_method.parse()?,
            derive_dates: self.derive_dates.parse()?,
            date_threshold: self.date_threshold,
            remove_outliers: self.remove_outliers,
            z_threshold: self.outlier_z,
            normalize: self.normalize,
        };
        Ok(commands::CsvSource::Clean {
            options,
            persist: !self.no_persist,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index a folder
    Index {
        path: PathBuf,

        /// Tags applied to every indexed file
        #[arg(short, long, value_delimiter = ',')]
        tag: Vec<String>,

        /// Ignore file, overriding <path>/.indexlyignore
        #[arg(long)]
        ignore: Option<PathBuf>,

        /// Built-in ignore preset: minimal, standard or aggressive
        #[arg(long)]
        preset: Option<String>,

        /// Worker threads (0 = one per core)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Full-text search
    Search {
        #[arg(required_unless_present_any = ["profile", "list_profiles", "delete_profile"])]
        term: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Match human text only
        #[arg(long)]
        clean: bool,

        /// Expand words with similar indexed terms
        #[arg(long)]
        fuzzy: bool,

        /// Similarity required for fuzzy expansion (0-100)
        #[arg(long)]
        fuzzy_threshold: Option<u8>,

        /// Distance used for `a NEAR b`
        #[arg(long)]
        near: Option<usize>,

        /// Save the query and its results under a name
        #[arg(long)]
        save_profile: Option<String>,

        /// Replay a saved profile
        #[arg(long)]
        profile: Option<String>,

        /// List saved profiles and exit
        #[arg(long, conflicts_with_all = ["profile", "save_profile", "delete_profile"])]
        list_profiles: bool,

        /// Delete a saved profile and exit
        #[arg(long, conflicts_with_all = ["profile", "save_profile"])]
        delete_profile: Option<String>,
    },

    /// Regular expression search over indexed content
    Regex {
        pattern: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Add, remove or list tags
    Tag {
        #[command(subcommand)]
        action: TagCommand,
    },

    /// Watch a folder and keep the index current
    Watch {
        path: PathBuf,

        #[arg(long)]
        ignore: Option<PathBuf>,

        #[arg(long)]
        preset: Option<String>,
    },

    /// Show index statistics
    Stats,

    /// Rename files with a date/title pattern
    RenameFile {
        path: PathBuf,

        /// Placeholders: {date}, {title}, {counter}
        #[arg(short, long, default_value = indexly::rename::DEFAULT_PATTERN)]
        pattern: String,

        #[arg(long, default_value = indexly::rename::DEFAULT_DATE_FORMAT)]
        date_format: String,

        /// d, 02d or 03d
        #[arg(long, default_value = "d")]
        counter_format: String,

        #[arg(short, long)]
        recursive: bool,

        /// Report the new names without renaming
        #[arg(long)]
        dry_run: bool,

        /// Move index rows along with renamed files
        #[arg(long)]
        update_db: bool,
    },

    /// Sort a folder into category folders
    Organize {
        path: PathBuf,

        /// date, name or extension
        #[arg(short, long, default_value = "date")]
        sort: String,

        /// Copy moved files into this folder as well
        #[arg(long)]
        backup: Option<PathBuf>,

        /// Print the plan without moving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List files recorded in an organize log
    Lister {
        log: PathBuf,

        #[arg(long)]
        extension: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Prefix of the modified date, e.g. 2024-05
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        duplicates: bool,
    },

    /// Scaffold a profile folder structure or place files into it
    OrganizeProfile {
        /// it, education, researcher, engineer, health, data or media
        profile: String,

        /// Root of the structure
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// it: student/support; education: teacher/student
        #[arg(long)]
        variant: Option<String>,

        /// Data project name
        #[arg(long)]
        project: Option<String>,

        /// Media shoot name
        #[arg(long)]
        shoot: Option<String>,

        /// Files (glob patterns) to place into the structure
        #[arg(long, num_args = 1..)]
        place: Vec<String>,

        /// Create folders / move files; otherwise only report
        #[arg(long)]
        apply: bool,
    },

    /// Create a full or incremental backup of a folder
    Backup {
        source: PathBuf,

        #[arg(short, long)]
        incremental: bool,

        /// Backup root, overriding the config
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Restore a backup by archive name
    Restore {
        name: String,

        #[arg(short, long)]
        target: PathBuf,

        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Enable or disable automatic backups
    BackupAuto {
        #[command(subcommand)]
        action: AutoCommand,
    },

    /// Descriptive statistics for the numeric columns of a CSV file
    AnalyzeCsv {
        file: PathBuf,

        /// Write the statistics to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// json or txt (defaults to the export extension)
        #[arg(long)]
        format: Option<String>,

        #[command(flatten)]
        clean: CleanArgs,
    },

    /// Structure and statistics of a JSON file (`.json` or `.json.gz`)
    AnalyzeJson {
        file: PathBuf,

        #[arg(long)]
        export: Option<PathBuf>,

        #[arg(long)]
        format: Option<String>,
    },

    /// Structure and statistics of an XML file (`.xml` or `.xml.gz`)
    AnalyzeXml {
        file: PathBuf,

        #[arg(long)]
        export: Option<PathBuf>,

        #[arg(long)]
        format: Option<String>,
    },

    /// Compare two files or folders (exit 0 identical, 1 different, 2 error)
    Compare {
        left: PathBuf,
        right: PathBuf,
    },

    /// Check the database schema and migrate it
    UpdateDb {
        /// Apply the migration instead of printing the plan
        #[arg(long)]
        apply: bool,
    },

    /// Manage the search result cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Event log maintenance
    Logs {
        #[command(subcommand)]
        action: LogsCommand,
    },

    /// Write a default config file
    Init {
        /// Where to write the config
        #[arg(default_value = indexly::config::CONFIG_FILE_NAME)]
        path: PathBuf,

        #[arg(long)]
        force: bool,

        /// Also write a .indexlyignore from this preset
        #[arg(long)]
        ignore_preset: Option<String>,
    },
}

#[derive(Subcommand)]
enum TagCommand {
    /// Add tags to files or folders
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long, value_delimiter = ',', required = true)]
        tags: Vec<String>,

        #[arg(short, long)]
        recursive: bool,
    },
    /// Remove tags from files or folders
    Remove {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long, value_delimiter = ',', required = true)]
        tags: Vec<String>,

        #[arg(short, long)]
        recursive: bool,
    },
    /// Show the tags of a file
    List { path: PathBuf },
}

#[derive(Subcommand)]
enum AutoCommand {
    /// Mark a folder for automatic backups
    Init { source: PathBuf },
    /// Remove the automatic backup marker
    Disable {
        source: Option<PathBuf>,

        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Remove every cached result set
    Clear,
    /// Recompute stale entries
    Refresh,
    /// Keep only the newest entries
    Prune,
}

#[derive(Subcommand)]
enum LogsCommand {
    /// Merge, dedupe and export event logs
    Clean {
        /// Log file or folder (defaults to the log dir)
        source: Option<PathBuf>,

        /// ndjson, json or csv
        #[arg(short, long, default_value = "ndjson")]
        format: String,

        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Merge all logs into one export
        #[arg(long)]
        combine: bool,

        /// Keep only the latest event per path
        #[arg(long)]
        dedupe: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Index { .. } => "index",
            Commands::Search { .. } => "search",
            Commands::Regex { .. } => "regex",
            Commands::Tag { .. } => "tag",
            Commands::Watch { .. } => "watch",
            Commands::Stats => "stats",
            Commands::RenameFile { .. } => "rename-file",
            Commands::Organize { .. } => "organize",
            Commands::Lister { .. } => "lister",
            Commands::OrganizeProfile { .. } => "organize-profile",
            Commands::Backup { .. } => "backup",
            Commands::Restore { .. } => "restore",
            Commands::BackupAuto { .. } => "backup-auto",
            Commands::AnalyzeCsv { .. } => "analyze-csv",
            Commands::AnalyzeJson { .. } => "analyze-json",
            Commands::AnalyzeXml { .. } => "analyze-xml",
            Commands::Compare { .. } => "compare",
            Commands::UpdateDb { .. } => "update-db",
            Commands::Cache { .. } => "cache",
            Commands::Logs { .. } => "logs",
            Commands::Init { .. } => "init",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mode = OutputMode::from_flag(cli.json);
    let name = cli.command.name();
    let is_compare = matches!(cli.command, Commands::Compare { .. });

    match run(cli, mode) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if mode.is_human() {
                indexly::ui::error(&format!("{:#}", e));
            } else {
                output::emit_error(name, &format!("{:#}", e));
            }
            std::process::exit(if is_compare { EXIT_ERROR } else { 1 });
        }
    }
}

fn run(cli: Cli, mode: OutputMode) -> anyhow::Result<i32> {
    let mut config = indexly::config::load_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database = Some(db);
    }
    let ctx = Context {
        config,
        mode,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Index { path, tag, ignore, preset, workers } => {
            commands::run_index(&ctx, &path, tag, ignore, preset, workers)?;
        }

        Commands::Search {
            term,
            filters,
            clean,
            fuzzy,
            fuzzy_threshold,
            near,
            save_profile,
            profile,
            list_profiles,
            delete_profile,
        } => {
            if list_profiles {
                return commands::run_profile_list(&ctx).map(|()| 0);
            }
            if let Some(name) = delete_profile {
                return commands::run_profile_delete(&ctx, &name).map(|()| 0);
            }
            let settings = &ctx.config.search;
            let mut request = SearchRequest::new(term.unwrap_or_default());
            request.limit = settings.limit;
            request.context_chars = settings.context_chars;
            request.fuzzy_threshold = fuzzy_threshold.unwrap_or(settings.fuzzy_threshold);
            request.near_distance = near.unwrap_or(settings.near_distance);
            request.clean = clean;
            request.fuzzy = fuzzy;
            filters.apply(&mut request);
            commands::run_search(&ctx, request, filters.no_cache, save_profile, profile)?;
        }

        Commands::Regex { pattern, filters } => {
            let mut request = SearchRequest::regex(pattern);
            request.limit = ctx.config.search.limit;
            request.context_chars = ctx.config.search.context_chars;
            filters.apply(&mut request);
            commands::run_regex(&ctx, request, filters.no_cache)?;
        }

        Commands::Tag { action } => match action {
            TagCommand::Add { paths, tags, recursive } => {
                commands::run_tag(&ctx, &paths, &tags, indexly::tags::TagAction::Add, recursive)?;
            }
            TagCommand::Remove { paths, tags, recursive } => {
                commands::run_tag(&ctx, &paths, &tags, indexly::tags::TagAction::Remove, recursive)?;
            }
            TagCommand::List { path } => commands::run_tag_list(&ctx, &path)?,
        },

        Commands::Watch { path, ignore, preset } => commands::run_watch(&ctx, path, ignore, preset)?,

        Commands::Stats => commands::run_stats(&ctx)?,

        Commands::RenameFile {
            path,
            pattern,
            date_format,
            counter_format,
            recursive,
            dry_run,
            update_db,
        } => {
            let options = indexly::rename::RenameOptions {
                pattern,
                date_format,
                counter_format,
                recursive,
                dry_run,
                update_db,
            };
            commands::run_rename(&ctx, &path, &options)?;
        }

        Commands::Organize { path, sort, backup, dry_run } => {
            commands::run_organize(&ctx, &path, &sort, backup, dry_run)?;
        }

        Commands::Lister { log, extension, category, date, duplicates } => {
            let filter = indexly::organize::ListFilter {
                extension,
                category,
                date,
                duplicates_only: duplicates,
            };
            commands::run_lister(&ctx, &log, &filter)?;
        }

        Commands::OrganizeProfile {
            profile,
            root,
            variant,
            project,
            shoot,
            place,
            apply,
        } => {
            let options = indexly::organize::ScaffoldOptions {
                variant,
                project_name: project,
                shoot_name: shoot,
                apply,
                executed_by: commands::current_user(),
            };
            commands::run_organize_profile(&ctx, &profile, &root, &options, &place)?;
        }

        Commands::Backup { source, incremental, root } => {
            let root = root.unwrap_or_else(|| ctx.config.backup_root());
            commands::run_backup(&ctx, &root, &source, incremental)?;
        }

        Commands::Restore { name, target, root } => {
            let root = root.unwrap_or_else(|| ctx.config.backup_root());
            commands::run_restore(&ctx, &root, &name, &target)?;
        }

        Commands::BackupAuto { action } => {
            let root = ctx.config.backup_root();
            match action {
                AutoCommand::Init { source } => commands::run_auto_init(&ctx, &root, &source)?,
                AutoCommand::Disable { source, confirm } => {
                    commands::run_auto_disable(&ctx, &root, source.as_deref(), confirm)?
                }
            }
        }

        Commands::AnalyzeCsv { file, export, format, clean } => {
            if clean.clear_cleaned {
                commands::run_clear_cleaned(&ctx, &file)?;
            } else {
                let source = clean.source()?;
                commands::run_analyze_csv(&ctx, &file, source, export.as_deref(), format.as_deref())?;
            }
        }

        Commands::AnalyzeJson { file, export, format } => {
            commands::run_analyze_document(
                &ctx,
                &file,
                DocumentFormat::Json,
                export.as_deref(),
                format.as_deref(),
            )?;
        }

        Commands::AnalyzeXml { file, export, format } => {
            commands::run_analyze_document(
                &ctx,
                &file,
                DocumentFormat::Xml,
                export.as_deref(),
                format.as_deref(),
            )?;
        }

        Commands::Compare { left, right } => return commands::run_compare(&ctx, &left, &right),

        Commands::UpdateDb { apply } => commands::run_update_db(&ctx, apply)?,

        Commands::Cache { action } => match action {
            CacheCommand::Clear => commands::run_cache_clear(&ctx)?,
            CacheCommand::Refresh => commands::run_cache_refresh(&ctx)?,
            CacheCommand::Prune => commands::run_cache_prune(&ctx)?,
        },

        Commands::Logs { action } => match action {
            LogsCommand::Clean { source, format, out, combine, dedupe } => {
                commands::run_logs_clean(&ctx, source, &format, out.as_deref(), combine, dedupe)?;
            }
        },

        Commands::Init { path, force, ignore_preset } => {
            commands::run_init(&ctx, &path, force, ignore_preset.as_deref())?;
        }
    }

    Ok(0)
}
