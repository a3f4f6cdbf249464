use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lineforge::{
    detect_workspace_root, format_results_flat, format_results_json, format_results_tree, search,
    ConfirmGate, Decision, EditConfig, ExecutionMode, MatchSpec, OutputStyle, PathGuard,
    ReplaceEngine, ReplaceRequest, ReplaceStatus, SearchQuery, WriteEngine, WriteOperation,
    WriteSpec, WriteStatus,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a custom config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find exact line matches and replace them
    Replace {
        /// File or directory to process
        #[arg(short = 'f', long)]
        file: PathBuf,

        /// Exact line(s) to find; literal \n separates lines of a block
        #[arg(short = 's', long)]
        search: String,

        /// Replacement text; literal \n separates lines
        #[arg(short = 'r', long)]
        replace: String,

        /// Execution mode (preview|apply|preview_and_ask)
        #[arg(short = 'm', long, default_value = "preview")]
        mode: String,

        /// Output style (default|git_diff|git_conflict)
        #[arg(long, default_value = "default")]
        style: String,

        /// Output file path, instead of modifying the original
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// Glob applied to file names when the target is a directory
        #[arg(long)]
        file_pattern: Option<String>,

        /// Compare lines case-insensitively
        #[arg(short = 'i', long)]
        ignore_case: bool,

        /// First line of the search window (1-based)
        #[arg(long)]
        start_line: Option<usize>,

        /// Last line of the search window (1-based)
        #[arg(long)]
        end_line: Option<usize>,
    },

    /// Write whole-file content with create/overwrite/append/prepend
    Write {
        /// Target file path
        #[arg(short = 'f', long)]
        file: PathBuf,

        /// Content to write; literal \n separates lines
        #[arg(short = 'c', long)]
        content: String,

        /// Write operation (create|overwrite|append|prepend)
        #[arg(long, default_value = "overwrite")]
        operation: String,

        /// Execution mode (preview|apply|preview_and_ask)
        #[arg(short = 'm', long, default_value = "apply")]
        mode: String,

        /// Output style (default|git_diff|git_conflict)
        #[arg(long, default_value = "default")]
        style: String,

        /// Output file path, instead of modifying the original
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// Skip the backup copy before overwriting
        #[arg(long)]
        no_backup: bool,
    },

    /// List lines matching a regex across files
    Search {
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Regex applied to each line
        #[arg(short = 'p', long)]
        pattern: String,

        /// Glob applied to candidate file names
        #[arg(long)]
        file_pattern: Option<String>,

        /// Maximum matches shown per file
        #[arg(long)]
        max_matches: Option<usize>,

        /// Permit targets outside the workspace root
        #[arg(long)]
        allow_outside: bool,

        /// Show file names only, without match rows
        #[arg(long)]
        only_filenames: bool,

        /// Flat listing instead of the directory tree
        #[arg(long)]
        flat: bool,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a command line would read an ignored path
    CheckCommand {
        /// The command line to validate
        command: String,
    },
}

/// Interactive yes/no gate reading from stdin. EOF counts as an interrupt.
struct StdinGate;

impl ConfirmGate for StdinGate {
    fn show(&mut self, rendered: &str) {
        println!("{}", rendered);
    }

    fn confirm(&mut self, prompt: &str) -> Decision {
        loop {
            print!("{} (y[YES]|n[NO]): ", prompt);
            let _ = io::stdout().flush();

            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => return Decision::Interrupted,
                Ok(_) => match line.trim().to_lowercase().as_str() {
                    "y" | "yes" | "true" | "apply" => return Decision::Yes,
                    "n" | "no" | "false" | "cancel" => return Decision::No,
                    _ => println!("Please enter 'y'/'yes' to apply or 'n'/'no' to cancel."),
                },
            }
        }
    }
}

/// Expands literal `\n` sequences from shell arguments into real line breaks
fn expand_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = EditConfig::load_from(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let workspace_root = detect_workspace_root(&cwd)?;

    match cli.command {
        Commands::Replace {
            file,
            search,
            replace,
            mode,
            style,
            output_file,
            file_pattern,
            ignore_case,
            start_line,
            end_line,
        } => {
            let mode: ExecutionMode = mode.parse()?;
            let style: OutputStyle = style.parse()?;

            let mut spec = MatchSpec::new(expand_newlines(&search), &expand_newlines(&replace))
                .with_line_range(start_line, end_line);
            if ignore_case {
                spec = spec.case_insensitive();
            }

            let request = ReplaceRequest::new(file, spec)
                .with_file_pattern(file_pattern.unwrap_or(config.file_pattern))
                .with_mode(mode)
                .with_style(style)
                .with_output_path(output_file);

            let engine = ReplaceEngine::new(&workspace_root, config.shell);
            let outcome = engine.run(&request, &mut StdinGate)?;

            match outcome.summary.status {
                ReplaceStatus::NoChangesNeeded => {
                    println!("Search and replacement are identical - no changes needed.");
                    return Ok(());
                }
                ReplaceStatus::Cancelled => {
                    println!("{}", "Changes cancelled by user.".red());
                    return Ok(());
                }
                ReplaceStatus::Completed => {}
            }

            if mode == ExecutionMode::Preview {
                for change in &outcome.rendered {
                    println!("\n{}", "=".repeat(60));
                    println!("File: {}", change.path.display().to_string().blue());
                    println!("Matches: {}", change.match_count);
                    println!("{}", "=".repeat(60));
                    println!("{}", change.text);
                }
            }
            for written in &outcome.written {
                println!(
                    "{} {}",
                    "Applied changes to:".green(),
                    written.display()
                );
            }
            println!(
                "\nFound {} matches in {} files ({} scanned)",
                outcome.summary.total_matches(),
                outcome.summary.files_with_matches(),
                outcome.summary.files_scanned
            );
        }

        Commands::Write {
            file,
            content,
            operation,
            mode,
            style,
            output_file,
            no_backup,
        } => {
            let mode: ExecutionMode = mode.parse()?;
            let style: OutputStyle = style.parse()?;
            let operation: WriteOperation = operation.parse()?;

            let spec = WriteSpec::new(file, expand_newlines(&content), operation);
            let engine = WriteEngine::new(&workspace_root)
                .with_backup(config.backup_enabled && !no_backup);

            let report = engine.run(&spec, mode, style, output_file.as_deref(), &mut StdinGate)?;

            for warning in &report.warnings {
                println!("{} {}", "Warning:".yellow(), warning);
            }

            match report.status {
                WriteStatus::NoChangesNeeded => {
                    println!("Content is identical to existing file - no changes needed.");
                }
                WriteStatus::Cancelled => {
                    println!("{}", "Changes cancelled by user.".red());
                }
                WriteStatus::Previewed => {
                    println!("\n{}", "=".repeat(60));
                    println!("File: {}", report.path.display().to_string().blue());
                    if let Some(change) = &report.change {
                        println!(
                            "Size: {} bytes, {} lines",
                            change.content_size(),
                            change.line_count()
                        );
                    }
                    println!("Mode: PREVIEW");
                    println!("{}", "=".repeat(60));
                    println!("{}", report.rendered);
                }
                WriteStatus::Applied => {
                    if let Some(backup) = &report.backup_path {
                        println!("Backup created: {}", backup.display());
                    }
                    if let Some(written) = &report.written_path {
                        println!("{} {}", "Successfully wrote:".green(), written.display());
                    }
                }
            }
        }

        Commands::Search {
            path,
            pattern,
            file_pattern,
            max_matches,
            allow_outside,
            only_filenames,
            flat,
            json,
        } => {
            let query = SearchQuery::new(path, pattern, &workspace_root)
                .with_file_pattern(file_pattern.unwrap_or(config.file_pattern))
                .allow_outside(allow_outside);
            let results = search(&query)?;
            let max_matches = max_matches.unwrap_or(config.max_matches_per_file);

            if json {
                println!("{}", format_results_json(&results)?);
            } else if flat {
                println!("{}", format_results_flat(&results, max_matches, only_filenames));
            } else {
                println!("{}", format_results_tree(&results, max_matches, only_filenames));
            }
        }

        Commands::CheckCommand { command } => {
            let guard = PathGuard::new(&workspace_root, config.shell);
            if let Some(blocked) = guard.validate_command(&command) {
                println!("{} {}", "Blocked by rule:".red(), blocked);
                std::process::exit(1);
            }
            println!("{}", "Command allowed".green());
        }
    }

    Ok(())
}
