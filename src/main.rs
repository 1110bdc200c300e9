use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_summarizer::cli::{Cli, Commands};
use yt_summarizer::config::Config;
use yt_summarizer::http::ReqwestClient;
use yt_summarizer::output::{self, Insertion};
use yt_summarizer::summarize;
use yt_summarizer::utils::sanitize_filename;
use yt_summarizer::youtube::{
    get_thumbnail_url, is_youtube_url, resolve, TranscriptFetcher, TranscriptResult, VideoId,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", style("error:").red().bold(), err);
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let default_filter = if cli.verbose {
        "yt_summarizer=debug,ytsum=debug"
    } else {
        "yt_summarizer=info,ytsum=info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so transcripts can be piped from stdout
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Writing the defaults must not depend on an existing, valid file
    if let Commands::Config { init: true, .. } = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => Config::config_path()?,
        };
        Config::default().save(&path)?;
        println!("Default configuration written to: {}", path.display());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Transcript {
            url,
            language,
            format,
            output,
            timestamps,
        } => {
            let language = language.unwrap_or_else(|| config.youtube.language.clone());
            let result = fetch_with_progress(&config, &url, &language, cli.quiet).await?;

            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &format, timestamps)?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, &format, timestamps)?;
                }
            }
        }
        Commands::Summarize {
            url,
            language,
            output,
            provider,
            model,
            api_key,
            response_format,
            with_transcript,
        } => {
            let mut config = config;
            if let Some(provider) = provider {
                config.summary.provider = provider;
            }
            if let Some(model) = model {
                config.summary.model = model;
            }
            if api_key.is_some() {
                config.summary.api_key = api_key;
            }
            if let Some(response_format) = response_format {
                config.summary.response_format = response_format;
            }
            if with_transcript {
                config.output.include_transcript = true;
            }

            // Fail on a missing key before any network work
            let provider = summarize::build_provider(&config.summary)?;

            let language = language.unwrap_or_else(|| config.youtube.language.clone());
            let result = fetch_with_progress(&config, &url, &language, cli.quiet).await?;

            let progress = spinner(cli.quiet, format!("Summarizing with {}...", provider.name()));
            let summary = summarize::summarize(
                provider.as_ref(),
                &result,
                &config.summary,
                config.output.timestamps,
            )
            .await;
            progress.finish_and_clear();
            let summary = summary?;

            let note = output::format_note(
                &result,
                &summary,
                &config.output,
                config.youtube.thumbnail_quality,
                chrono::Utc::now(),
            );

            match output {
                Some(path) => {
                    // A directory gets one note per video, named after the title
                    let path = if path.is_dir() {
                        let stem = match sanitize_filename(&result.title) {
                            stem if stem.is_empty() => result.video_id.clone(),
                            stem => stem,
                        };
                        path.join(format!("{}.md", stem))
                    } else {
                        path
                    };
                    let insertion = output::insert_into_document(&path, &note, &config.output.insert_marker)?;
                    let verb = match insertion {
                        Insertion::ReplacedMarker => "inserted at marker in",
                        Insertion::Appended => "appended to",
                        Insertion::Created => "written to",
                    };
                    println!("{} Summary {} {}", style("✓").green(), verb, path.display());
                }
                None => println!("{}", note),
            }
        }
        Commands::Thumbnail { video, quality } => {
            let video_id = match VideoId::parse(video.trim()) {
                Some(id) => id,
                None => resolve(&video)?,
            };
            println!("{}", get_thumbnail_url(video_id.as_str(), quality));
        }
        Commands::Config { show, .. } => {
            if show {
                config.display();
            } else {
                println!("Config file: {}", Config::config_path()?.display());
                println!("Run `ytsum config --init` to write the defaults, or `--show` to print them.");
            }
        }
    }

    Ok(())
}

async fn fetch_with_progress(config: &Config, url: &str, language: &str, quiet: bool) -> Result<TranscriptResult> {
    let client = ReqwestClient::from_config(&config.youtube).context("Failed to build HTTP client")?;
    let fetcher = TranscriptFetcher::with_context(client, config.youtube.client_context());

    if !is_youtube_url(url) {
        tracing::warn!("{} does not look like a YouTube URL", url);
    }
    tracing::info!("Fetching transcript for URL: {}", url);

    let progress = spinner(quiet, "Fetching transcript...".to_string());
    let result = fetcher.fetch(url, language).await;
    progress.finish_and_clear();

    let result = result?;
    if !quiet {
        eprintln!(
            "{} {} ({} lines, {} captions)",
            style("✓").green(),
            style(&result.title).bold(),
            result.lines.len(),
            result.language_code
        );
    }

    Ok(result)
}

fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(progress_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        progress.set_style(progress_style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
