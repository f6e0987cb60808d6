//! Command handlers

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use calorie_app::config::{env_api_key, Config};
use calorie_app::repository::{open_capture_flow, open_engine};
use calorie_app::{AccountingEngine, DeepLink};
use calorie_domain::repository::SharedStateChannel;
use calorie_types::{Error, OutputFormat, Provider, Result, SettingsUpdate, VisionError};
use calorie_vision::VisionService;

use crate::cli::{Cli, Commands};
use crate::output::{
    output_analysis, output_config, output_connection, output_deleted, output_entries, output_entry,
    output_settings, output_snapshot, output_summary,
};

/// Execute CLI command
pub async fn execute(cli: Cli, config: Config) -> Result<()> {
    let output_format = cli.format.unwrap_or(config.output_format);

    // config runs without opening the stores
    let command = match cli.command {
        Commands::Config { show, set, reset } => {
            return cmd_config(config, output_format, show, set, reset)
        }
        command => command,
    };

    let engine = Arc::new(open_engine(&config)?);
    let result = run_with_engine(command, &config, &engine, output_format).await;
    // Let delayed refresh signals land before the process exits
    engine.flush().await;
    result
}

async fn run_with_engine(
    command: Commands,
    config: &Config,
    engine: &Arc<AccountingEngine>,
    output_format: OutputFormat,
) -> Result<()> {
    match command {
        Commands::Analyze { image, dry_run } => {
            cmd_analyze(config, engine, &image, dry_run, output_format).await
        }

        Commands::Add {
            description,
            calories,
            image,
        } => {
            let image_data = image.as_deref().map(read_image).transpose()?;
            let entry = engine.add_entry(image_data, &description, calories).await?;
            output_entry(output_format, &entry)
        }

        Commands::List => {
            let entries = engine.today_entries().await?;
            output_entries(output_format, &entries)
        }

        Commands::Status => {
            let summary = engine.summary().await?;
            output_summary(output_format, &summary)
        }

        Commands::Delete { id } => {
            let deleted = engine.delete_entry(id).await?;
            output_deleted(output_format, id, deleted)
        }

        Commands::Servings { id, delta } => {
            let entry = engine.adjust_servings(id, delta).await?;
            output_entry(output_format, &entry)
        }

        Commands::Edit {
            id,
            calories,
            servings,
        } => cmd_edit(engine, id, calories, servings, output_format).await,

        Commands::StripImage { id } => {
            let entry = engine.strip_image(id).await?;
            output_entry(output_format, &entry)
        }

        Commands::Settings {
            target,
            reset_hour,
            provider,
            api_key,
            show: _,
        } => {
            let mut update = SettingsUpdate::new();
            update.daily_calorie_target = target;
            update.day_reset_hour = reset_hour;
            update.provider = provider;
            update.api_key = api_key;

            let settings = if update.is_empty() {
                engine.settings().await?
            } else {
                engine.update_settings(update).await?
            };
            output_settings(output_format, &settings)
        }

        Commands::Open { url, image } => {
            let link = DeepLink::parse(&url)
                .ok_or_else(|| Error::InvalidInput(format!("unrecognized link: {}", url)))?;
            let flow = open_capture_flow(config, Arc::clone(engine))?;
            let bytes = read_image(&image)?;

            let cancel = cancel_on_ctrl_c();
            let spinner = analyzing_spinner();
            let result = flow.dispatch(link, bytes, &cancel).await;
            spinner.finish_and_clear();

            output_entry(output_format, &result?)
        }

        Commands::Snapshot { publish } => {
            let snapshot = if publish {
                Some(engine.republish().await?)
            } else {
                engine.shared_state().read()
            };
            output_snapshot(output_format, snapshot.as_ref())
        }

        Commands::TestApi { provider } => cmd_test_api(config, engine, provider, output_format).await,

        Commands::Config { show, set, reset } => {
            cmd_config(config.clone(), output_format, show, set, reset)
        }
    }
}

async fn cmd_analyze(
    config: &Config,
    engine: &Arc<AccountingEngine>,
    image: &Path,
    dry_run: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let bytes = read_image(image)?;
    let flow = open_capture_flow(config, Arc::clone(engine))?;

    let cancel = cancel_on_ctrl_c();
    let spinner = analyzing_spinner();

    if dry_run {
        let result = flow.analyze(&bytes, &cancel).await;
        spinner.finish_and_clear();
        return output_analysis(output_format, &result?);
    }

    let result = flow.capture(bytes, &cancel).await;
    spinner.finish_and_clear();
    output_entry(output_format, &result?)
}

async fn cmd_edit(
    engine: &AccountingEngine,
    id: Uuid,
    calories: Option<u32>,
    servings: Option<u32>,
    output_format: OutputFormat,
) -> Result<()> {
    if calories.is_none() && servings.is_none() {
        return Err(Error::InvalidInput(
            "nothing to edit, pass --calories and/or --servings".to_string(),
        ));
    }
    if servings == Some(0) {
        tracing::warn!("servings must be at least 1, keeping the current value");
    }
    let entry = engine.edit_entry(id, calories, servings).await?;
    output_entry(output_format, &entry)
}

async fn cmd_test_api(
    config: &Config,
    engine: &AccountingEngine,
    provider: Option<Provider>,
    output_format: OutputFormat,
) -> Result<()> {
    let settings = engine.settings().await?;
    let provider = provider.unwrap_or(settings.provider);

    let api_key = if settings.has_api_key() && provider == settings.provider {
        settings.api_key.clone()
    } else {
        env_api_key(provider).ok_or(VisionError::MissingCredential)?
    };

    let service = VisionService::new(config.analyzer_config())?;
    let spinner = analyzing_spinner();
    let result = service.test_connection(provider, &api_key).await;
    spinner.finish_and_clear();

    output_connection(output_format, &result?)
}

fn cmd_config(
    mut config: Config,
    output_format: OutputFormat,
    show: bool,
    set: Vec<String>,
    reset: bool,
) -> Result<()> {
    if reset {
        config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
    }

    for pair in &set {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!("expected KEY=VALUE, got {}", pair))
        })?;
        config.set_value(key.trim(), value)?;
        println!("{} set to: {}", key.trim(), value.trim());
    }
    if !set.is_empty() {
        config.save()?;
    }

    if show || (!reset && set.is_empty()) {
        output_config(output_format, &config)?;
    }

    Ok(())
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::InvalidInput(format!(
            "image not found: {}",
            path.display()
        )));
    }
    Ok(std::fs::read(path)?)
}

/// Token cancelled by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    cancel
}

fn analyzing_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Analyzing photo...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
