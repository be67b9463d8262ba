//! resume-relevance: score resumes against job descriptions

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use resume_relevance::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use resume_relevance::config::{Config, OutputFormat};
use resume_relevance::feedback::{FeedbackGenerator, GeminiClient};
use resume_relevance::input::{validate_document_text, InputManager};
use resume_relevance::output::formatter::{save_report_to_file, suggest_filename};
use resume_relevance::output::{RelevanceReport, ReportGenerator};
use resume_relevance::processing::analyzer::{AnalysisEngine, AnalysisPipeline};
use resume_relevance::processing::embedding_manager::EmbeddingModelManager;
use resume_relevance::processing::embeddings::EmbeddingModelHandle;
use resume_relevance::processing::scoring::ScoreWeights;
use resume_relevance::processing::skill_matcher::SkillMatcher;
use resume_relevance::processing::text_processor::{normalize, preview, word_count};
use resume_relevance::storage::{ResultStore, SqliteStore};
use resume_relevance::{RelevanceError, Result};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md", "markdown"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, cli.config).await {
        error!("Command failed ({}): {}", e.kind(), e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Analyze {
            resume,
            job,
            output,
            save,
            no_feedback,
            api_key,
            no_store,
            embedding,
        } => {
            let output_format = match output {
                Some(format) => cli::parse_output_format(&format).map_err(RelevanceError::InvalidInput)?,
                None => config.output.format,
            };

            for path in [&resume, &job] {
                cli::validate_file_extension(path, SUPPORTED_EXTENSIONS).map_err(|e| {
                    RelevanceError::DocumentExtraction(format!("{}: {}", path.display(), e))
                })?;
            }

            let model_spec = embedding.unwrap_or_else(|| config.models.embedding_model.clone());
            let model = Arc::new(EmbeddingModelHandle::new(
                config.models_dir().clone(),
                model_spec,
            ));
            let engine = AnalysisEngine::from_config(&config, Arc::clone(&model))?;
            let feedback = feedback_generator(&config, no_feedback, api_key);
            let pipeline = AnalysisPipeline::new(engine, feedback);

            info!("Analyzing {} against {}", resume.display(), job.display());
            let progress = spinner("Scoring resume against job description...");
            let outcome = pipeline
                .analyze_files(&InputManager::new(), &job, &resume)
                .await;
            progress.finish_and_clear();

            drop(pipeline);
            release_model(model);

            let report = outcome?;
            let mut view = RelevanceReport::from_analysis(&report, ScoreWeights::from(&config.scoring));

            if !no_store {
                let stored = SqliteStore::open(&config.storage.database_path)
                    .and_then(|store| store.save(&report.result));
                match stored {
                    Ok(id) => {
                        info!("Stored analysis #{}", id);
                        view = view.with_stored_id(id);
                    }
                    Err(e) => warn!("Analysis not saved to history: {}", e),
                }
            }

            let generator =
                ReportGenerator::with_options(config.output.color_output, true, true);
            println!("{}", generator.generate_report(&view, output_format)?);

            if let Some(mut save_path) = save {
                if save_path.is_dir() {
                    save_path = save_path.join(suggest_filename(output_format, &report.result.resume_name));
                }
                let plain = ReportGenerator::with_options(false, true, true);
                save_report_to_file(&plain.generate_report(&view, output_format)?, &save_path)?;
                println!("💾 Report saved to {}", save_path.display());
            }
        }

        Commands::History { limit, id } => {
            let store = SqliteStore::open(&config.storage.database_path)?;
            let generator = ReportGenerator::with_options(config.output.color_output, true, true);

            match id {
                Some(id) => {
                    let stored = store.get(id)?.ok_or_else(|| {
                        RelevanceError::InvalidInput(format!("No stored analysis with id {}", id))
                    })?;
                    let view = RelevanceReport::from_stored(&stored);
                    println!("{}", generator.generate_report(&view, OutputFormat::Console)?);
                }
                None => {
                    let mut entries = store.fetch_all()?;
                    if let Some(limit) = limit {
                        entries.truncate(limit);
                    }
                    println!("{}", generator.generate_history(&entries));
                }
            }
        }

        Commands::Skills { file } => {
            let matcher = SkillMatcher::new(&config.effective_vocabulary())?;

            match file {
                Some(path) => {
                    let text = InputManager::new().extract_text(&path).await?;
                    validate_document_text(&text)?;
                    let skills = matcher.extract_skills(&normalize(&text));

                    println!("📄 {} ({} words)", path.display(), word_count(&text));
                    println!("   {}\n", preview(&text, 160));
                    println!("🔍 Skills found ({}):", skills.len());
                    for skill in &skills {
                        println!("  • {}", skill);
                    }
                }
                None => {
                    println!("📚 Skill vocabulary ({} entries):", matcher.skill_count());
                    for skill in matcher.vocabulary() {
                        println!("  • {}", skill);
                    }
                }
            }
        }

        Commands::Models { action } => {
            let mut manager = EmbeddingModelManager::new(config.models_dir().clone()).await?;

            match action {
                ModelAction::List => {
                    println!("🧠 Embedding Models\n");
                    for (id, info) in manager.list_available_models() {
                        let status = if manager.is_model_downloaded(id) {
                            "✅ Downloaded"
                        } else {
                            "⬇️  Available"
                        };
                        let default_marker = if *id == config.models.embedding_model {
                            " (configured)"
                        } else {
                            ""
                        };
                        println!(
                            "  • {}{} - {} ({} MB, {} dims) [{}]",
                            id, default_marker, info.repo_id, info.size_mb, info.dimensions, status
                        );
                        println!("    {}", info.description);
                    }
                    if manager.list_downloaded_models().is_empty() {
                        println!("\n💡 No models downloaded yet. Get started with:");
                        println!("   resume-relevance models download {}", manager.auto_select_model());
                    }
                }

                ModelAction::Download { model } => {
                    let model_id = manager
                        .resolve_model_id(&model)
                        .ok_or(RelevanceError::ModelNotFound(model))?;
                    if manager.is_model_downloaded(&model_id) {
                        println!("✅ Model '{}' is already downloaded", model_id);
                        return Ok(());
                    }

                    let progress = spinner(&format!("Downloading {}...", model_id));
                    let outcome = manager.download_model(&model_id).await;
                    progress.finish_and_clear();

                    let path = outcome?;
                    println!("✅ Model '{}' downloaded to {}", model_id, path.display());
                }

                ModelAction::Info { model } => {
                    let model_id = manager
                        .resolve_model_id(&model)
                        .ok_or_else(|| RelevanceError::ModelNotFound(model.clone()))?;
                    let info = manager
                        .get_model_info(&model_id)
                        .ok_or(RelevanceError::ModelNotFound(model))?;

                    println!("📋 Model Information for '{}'\n", model_id);
                    println!("Name: {}", info.name);
                    println!("Repository: {}", info.repo_id);
                    println!("Size: {} MB", info.size_mb);
                    println!("Dimensions: {}", info.dimensions);
                    println!("Description: {}", info.description);
                    match manager.get_model_path(&model_id) {
                        Some(path) => println!("Status: ✅ Downloaded ({})", path.display()),
                        None => println!(
                            "Status: ⬇️  Not downloaded. Run: resume-relevance models download {}",
                            model_id
                        ),
                    }
                }
            }
        }

        Commands::Config { action } => {
            let path = config_path.unwrap_or_else(Config::config_path);

            match action {
                Some(ConfigAction::Show) | None => {
                    let content = toml::to_string_pretty(&config).map_err(|e| {
                        RelevanceError::Configuration(format!("Failed to serialize config: {}", e))
                    })?;
                    println!("⚙️  Configuration ({})\n", path.display());
                    println!("{}", content);
                }

                Some(ConfigAction::Reset) => {
                    Config::default().save_to(&path)?;
                    println!("✅ Configuration at {} reset to defaults", path.display());
                }

                Some(ConfigAction::Path) => println!("{}", path.display()),
            }
        }
    }

    Ok(())
}

/// The configured feedback service, or `None` when disabled or without a key
fn feedback_generator(
    config: &Config,
    disabled: bool,
    api_key: Option<String>,
) -> Option<Arc<dyn FeedbackGenerator>> {
    if disabled || !config.feedback.enabled {
        return None;
    }

    match GeminiClient::from_config(&config.feedback, api_key) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("Feedback generation disabled: {}", e);
            None
        }
    }
}

fn release_model(model: Arc<EmbeddingModelHandle>) {
    if let Ok(mut handle) = Arc::try_unwrap(model) {
        handle.dispose();
    }
}

fn spinner(message: &str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        progress.set_style(style);
    }
    progress.set_message(message.to_string());
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
