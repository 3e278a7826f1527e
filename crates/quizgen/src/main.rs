use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use quizgen_core::config::{PathOverrides, Runtime, resolve_runtime};
use quizgen_core::model::Theme;
use quizgen_core::persist::WriteOutcome;
use quizgen_core::pipeline::{PipelineReport, RunMode, run_pipeline};
use quizgen_core::sources::{
    DirectoryClientConfig, FixtureThemes, HttpDirectoryClient, PrefectureThemes, Source,
    WorldDirectory,
};

#[derive(Debug, Parser)]
#[command(
    name = "quizgen",
    version,
    about = "Offline quiz dataset synthesis and validation pipeline"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    output_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Collect, validate, and write dataset and theme artifacts")]
    Generate(GenerateArgs),
    #[command(about = "Run every validation gate without writing anything")]
    Check(GenerateArgs),
    #[command(about = "List theme artifacts currently on disk")]
    Themes,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, help = "Skip the remote directory source")]
    offline: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let overrides = PathOverrides {
        project_root: cli.project_root.clone(),
        config: cli.config.clone(),
        output_dir: cli.output_dir.clone(),
    };

    match cli.command {
        Some(Commands::Generate(args)) => run_generate(&overrides, &args, RunMode::Write),
        Some(Commands::Check(args)) => run_generate(&overrides, &args, RunMode::Check),
        Some(Commands::Themes) => run_themes(&overrides),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_generate(overrides: &PathOverrides, args: &GenerateArgs, mode: RunMode) -> Result<()> {
    let runtime = resolve_runtime(overrides)?;
    let mut sources = build_sources(&runtime, args.offline)?;
    let report = run_pipeline(&runtime.paths, &mut sources, mode)?;
    print_report(&runtime, &report);

    if !report.success {
        bail!("validation failed; no artifacts were written");
    }
    Ok(())
}

fn build_sources(runtime: &Runtime, offline: bool) -> Result<Vec<Box<dyn Source>>> {
    let mut sources: Vec<Box<dyn Source>> = vec![
        Box::new(FixtureThemes::new(runtime.paths.theme_fixture_path.clone())),
        Box::new(PrefectureThemes::new(
            runtime.paths.prefecture_table_path.clone(),
        )),
    ];
    if !offline {
        let client = HttpDirectoryClient::new(DirectoryClientConfig {
            endpoint: runtime.config.directory_url(),
            user_agent: runtime.config.user_agent(),
            timeout_ms: runtime.config.timeout_ms(),
        })?;
        sources.push(Box::new(WorldDirectory::new(Box::new(client))));
    }
    Ok(sources)
}

fn print_report(runtime: &Runtime, report: &PipelineReport) {
    println!("pipeline {}", report.mode);
    println!(
        "project_root: {}",
        normalize_path(&runtime.paths.project_root)
    );
    println!("output_dir: {}", normalize_path(&runtime.paths.output_dir));

    for source in &report.sources {
        match (&source.kind, &source.error) {
            (_, Some(error)) => println!("source.{}: error ({error})", source.name),
            (Some(kind), None) => {
                println!("source.{}: {} records ({kind})", source.name, source.records);
            }
            (None, None) => println!("source.{}: <no capability>", source.name),
        }
    }

    println!("dictionary.entities: {}", report.ingest.total);
    println!(
        "dictionary.localized_names: {}",
        report.ingest.with_localized_name
    );
    for note in &report.ingest.skipped {
        println!("dictionary.skipped: {note}");
    }

    println!("themes.emitted: {}", report.themes_emitted);
    for note in &report.suppressed {
        println!("themes.suppressed: {note}");
    }

    if let Some(write) = &report.write {
        println!("write.created: {}", write.created);
        println!("write.updated: {}", write.updated);
        println!("write.unchanged: {}", write.unchanged);
        for artifact in &write.artifacts {
            if artifact.outcome == WriteOutcome::Updated {
                println!(
                    "write.artifact: {} updated (+{} -{})",
                    artifact.path, artifact.lines_added, artifact.lines_removed
                );
            } else {
                println!("write.artifact: {} {}", artifact.path, artifact.outcome.as_str());
            }
        }
        for path in &write.stale {
            println!("write.stale: {path}");
        }
    }

    if !report.issues.is_empty() {
        println!("issues:");
        for issue in &report.issues {
            println!("  - [{}] {}: {}", issue.code, issue.subject, issue.message);
        }
    }
    println!("success: {}", report.success);
}

fn run_themes(overrides: &PathOverrides) -> Result<()> {
    let runtime = resolve_runtime(overrides)?;
    let themes_dir = &runtime.paths.themes_dir;
    println!("themes_dir: {}", normalize_path(themes_dir));
    if !themes_dir.exists() {
        println!("themes: <none> (run `quizgen generate` first)");
        return Ok(());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(themes_dir)
        .with_context(|| format!("failed to read {}", themes_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    entries.sort();

    println!("themes.count: {}", entries.len());
    for path in entries {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let theme: Theme = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        println!(
            "theme.{}: {} ({} answers, {})",
            theme.id,
            theme.title,
            theme.answers.len(),
            theme.category_title
        );
    }
    Ok(())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
