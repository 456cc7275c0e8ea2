// commands.rs — CLI command handlers

use crate::catalog::Placeholder;
use crate::cli::{Cli, Commands, PromptArgs};
use crate::config::{self, AppConfig, Credentials, SessionConfig};
use crate::orchestrator::{AnalysisError, AnalysisInput, AnalysisOrchestrator};
use crate::prompt_engine::{PlaceholderValues, PromptEngine, PromptSelection};
use crate::request::{ImageAttachment, ModelCatalog};
use std::io::Write;
use std::path::{Path, PathBuf};

const MISSING_IMAGES: &str = "請先上傳命盤截圖！";

pub async fn dispatch(cli: Cli) -> Result<(), String> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path().map_err(|e| e.to_string())?,
    };

    if let Commands::Config { show, path } = &cli.command {
        return show_config(&config_path, *show, *path);
    }

    let mut app = config::load_or_create(&config_path).map_err(|e| e.to_string())?;
    apply_overrides(&mut app, &cli);

    match cli.command {
        Commands::Categories => {
            let engine = PromptEngine::from_path(app.catalog_path.as_deref());
            for title in engine.catalog().list_categories() {
                println!("{}", title);
            }
            Ok(())
        }
        Commands::Templates { category } => {
            let engine = PromptEngine::from_path(app.catalog_path.as_deref());
            let category = engine.catalog().category(&category).map_err(|e| e.to_string())?;
            for template in &category.items {
                let vars: Vec<&str> = template.placeholders().iter().map(|p| p.display_label()).collect();
                if vars.is_empty() {
                    println!("{}", template.label);
                } else {
                    println!("{}  [{}]", template.label, vars.join(", "));
                }
            }
            Ok(())
        }
        Commands::Styles => {
            let engine = PromptEngine::from_path(app.catalog_path.as_deref());
            for style in &engine.catalog().styles {
                println!("{}", style.label);
            }
            Ok(())
        }
        Commands::Models => {
            for profile in ModelCatalog::with_overrides(&app.models).profiles() {
                let marker = if profile.identifier == app.model { "*" } else { " " };
                let reasoning = if profile.supports_extended_reasoning {
                    "reasoning budget"
                } else {
                    "-"
                };
                println!("{} {:<28} {}", marker, profile.identifier, reasoning);
            }
            Ok(())
        }
        Commands::Compose(args) => {
            let engine = PromptEngine::from_path(app.catalog_path.as_deref());
            let selection = selection_from_args(&engine, &args, None)?;
            let prepared = engine.prepare(&selection).map_err(|e| e.to_string())?;
            println!("{}", prepared.text);
            Ok(())
        }
        Commands::Analyze {
            selection,
            images,
            prompt,
            prompt_file,
            temperature,
        } => {
            let override_text = match (prompt, prompt_file) {
                (Some(text), _) => Some(text),
                (None, Some(path)) => Some(read_prompt_file(&path)?),
                (None, None) => None,
            };
            let session = SessionConfig {
                credentials: Credentials::resolve(cli.api_key.as_deref()).map_err(|e| e.to_string())?,
                app,
            };
            analyze(&session, &selection, &images, override_text, temperature).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

async fn analyze(
    session: &SessionConfig,
    args: &PromptArgs,
    image_paths: &[PathBuf],
    override_text: Option<String>,
    temperature: Option<f32>,
) -> Result<(), String> {
    if image_paths.is_empty() {
        return Err(MISSING_IMAGES.to_string());
    }

    let images = image_paths
        .iter()
        .map(|path| ImageAttachment::from_path(path))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let orchestrator = AnalysisOrchestrator::from_session(session);
    let selection = selection_from_args(orchestrator.engine(), args, override_text)?;
    let input = AnalysisInput {
        selection,
        images,
        model: None,
        temperature,
    };

    let mut printed = 0usize;
    let mut stdout = std::io::stdout();
    let result = orchestrator
        .run_analysis(input, |text| {
            if let Some(delta) = text.get(printed..) {
                let _ = stdout.write_all(delta.as_bytes());
                let _ = stdout.flush();
            }
            printed = text.len();
        })
        .await;
    println!();

    match result {
        Ok(outcome) => {
            eprintln!(
                "✓ {} ({} fragments, template: {}{})",
                outcome.model,
                outcome.result.fragment_count(),
                outcome.prompt.template_used,
                if outcome.prompt.template_fallback { ", fallback" } else { "" }
            );
            Ok(())
        }
        Err(AnalysisError::Inference { report, partial, .. }) => {
            if !partial.is_empty() {
                eprintln!("(stream interrupted after {} characters)", partial.chars().count());
            }
            Err(report.guidance)
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Missing category/template default to the first entry of the catalog
fn selection_from_args(
    engine: &PromptEngine,
    args: &PromptArgs,
    override_text: Option<String>,
) -> Result<PromptSelection, String> {
    let catalog = engine.catalog();
    let category = match &args.category {
        Some(title) => title.clone(),
        None => catalog
            .categories
            .first()
            .map(|c| c.title.clone())
            .ok_or_else(|| "Catalog has no categories".to_string())?,
    };
    let template = match &args.template {
        Some(label) => label.clone(),
        None => catalog
            .category(&category)
            .map_err(|e| e.to_string())?
            .first()
            .map(|t| t.label.clone())
            .unwrap_or_default(),
    };

    Ok(PromptSelection {
        category,
        template,
        values: PlaceholderValues::from_options([
            (Placeholder::CurrentJob, args.job.clone()),
            (Placeholder::StrengthA, args.strength_a.clone()),
            (Placeholder::StrengthB, args.strength_b.clone()),
        ]),
        style: args.style.clone(),
        override_text,
    })
}

fn apply_overrides(app: &mut AppConfig, cli: &Cli) {
    if let Some(path) = &cli.catalog {
        app.catalog_path = Some(path.clone());
    }
    if let Some(model) = &cli.model {
        app.model = config::normalize_model(model);
    }
}

fn read_prompt_file(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read prompt file {}: {}", path.display(), e))
}

fn show_config(path: &Path, show: bool, print_path: bool) -> Result<(), String> {
    if print_path || !show {
        println!("{}", path.display());
    }
    if show {
        let app = config::load_or_create(path).map_err(|e| e.to_string())?;
        let json = serde_json::to_string_pretty(&app).map_err(|e| e.to_string())?;
        println!("{}", json);
    }
    Ok(())
}
