// daxchat CLI - Command Line Interface Entry Point

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use daxchat_config::{
    ConfigStore, FileConfigStore, ModelDescriptor, ProviderConfiguration, ProviderType,
    SettingsLoader, parse_overrides,
};
use daxchat_core::{ApiClient, ChatOutcome, ConnectionOutcome, ConversationTurn, ReqwestTransport};

/// daxchat - chat with OpenAI, Anthropic, Google and Ollama models from one CLI
#[derive(Parser, Debug)]
#[command(name = "daxchat")]
#[command(version, about, long_about = None)]
struct TopCli {
    #[clap(flatten)]
    config_overrides: CliConfigOverrides,

    /// Provider profile file (default: ~/.daxchat/providers.json)
    #[arg(long = "store", global = true)]
    store: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

/// CLI settings overrides
#[derive(Debug, clap::Args)]
struct CliConfigOverrides {
    /// Settings override in key=value format
    #[arg(short = 'c', long = "config", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,
}

/// Available commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Send one prompt to the active profile
    Chat {
        /// User prompt
        prompt: String,

        /// System prompt sent ahead of the user turn
        #[arg(short = 's', long = "system")]
        system: Option<String>,

        /// Wait for the whole response instead of streaming it
        #[arg(long = "no-stream")]
        no_stream: bool,

        /// Print the result envelope as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Test a provider profile
    Test {
        /// Profile id (default: the active profile)
        #[arg(long = "id")]
        id: Option<String>,
    },

    /// List models of the active profile
    Models,

    /// Provider profile management
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },
}

/// Profile commands
#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// List saved profiles
    List,

    /// Add or replace a profile
    Add {
        /// Display name
        #[arg(long = "name")]
        name: String,

        /// Provider type: openai-compatible, anthropic, google, ollama, generic-bearer
        #[arg(long = "type", default_value = "generic-bearer")]
        provider_type: ProviderType,

        /// Endpoint URL
        #[arg(long = "url")]
        url: String,

        /// API key
        #[arg(short = 'k', long = "key")]
        api_key: Option<String>,

        /// Model name; repeat for several, the first is the default
        #[arg(short = 'm', long = "model", required = true)]
        models: Vec<String>,

        /// Replace the profile with this id
        #[arg(long = "id")]
        id: Option<String>,
    },

    /// Make a profile active
    Use {
        /// Profile id
        id: String,

        /// Model to select
        #[arg(short = 'm', long = "model")]
        model: Option<String>,
    },

    /// Select a model on the active profile
    Model {
        /// Model name
        name: String,
    },

    /// Remove a profile
    Remove {
        /// Profile id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging on stderr so streamed output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string())
                .as_str(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = TopCli::parse();

    let overrides = parse_overrides(&cli.config_overrides.overrides)?;
    let mut loader = SettingsLoader::new();
    if let Ok(cwd) = std::env::current_dir() {
        loader = loader.with_project_dir(cwd);
    }
    let settings = loader.load_with_cli_overrides(overrides)?;

    let store: Arc<dyn ConfigStore> = match cli.store {
        Some(path) => Arc::new(FileConfigStore::new(path)),
        None => Arc::new(FileConfigStore::default_store()?),
    };
    let client = ApiClient::load(store.clone(), Arc::new(ReqwestTransport::new()), settings).await;

    match cli.command {
        Commands::Chat {
            prompt,
            system,
            no_stream,
            json,
        } => run_chat(&client, prompt, system, no_stream || json, json).await?,
        Commands::Test { id } => run_test(&client, store.as_ref(), id).await?,
        Commands::Models => list_models(&client),
        Commands::Config { config_command } => {
            handle_config_command(&client, store.as_ref(), config_command).await?
        }
    }

    Ok(())
}

/// Send one prompt
async fn run_chat(
    client: &ApiClient,
    prompt: String,
    system: Option<String>,
    buffered: bool,
    json: bool,
) -> Result<()> {
    let mut turns = Vec::new();
    if let Some(system) = system {
        turns.push(ConversationTurn::system(system));
    }
    turns.push(ConversationTurn::user(prompt));

    info!(
        "Chatting with {} ({})",
        client.config_name(),
        client.current_model().unwrap_or_default()
    );

    let result = if buffered {
        client.send_message(&turns, None).await
    } else {
        let mut printed = 0;
        let mut on_update = |text: &str| {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(text[printed..].as_bytes());
            let _ = stdout.flush();
            printed = text.len();
        };
        let result = client.send_message(&turns, Some(&mut on_update)).await;
        println!();
        result
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&ChatOutcome::from(result))?);
        return Ok(());
    }

    match result {
        Ok(response) => {
            if buffered {
                println!("{}", response.text());
            }
            if let Some(usage) = response.token_usage() {
                info!(
                    "Tokens: {} in, {} out, {} total",
                    usage.input_tokens, usage.output_tokens, usage.total_tokens
                );
            }
            Ok(())
        }
        Err(err) => bail!("{err}"),
    }
}

/// Test a saved profile without activating it
async fn run_test(client: &ApiClient, store: &dyn ConfigStore, id: Option<String>) -> Result<()> {
    let snapshot = store.get_all().await?;
    let id = id
        .or(snapshot.active_config_id)
        .context("no profile to test; add one with `daxchat config add`")?;
    let config = snapshot
        .configs
        .into_iter()
        .find(|c| c.id == id)
        .with_context(|| format!("no profile with id {id}"))?;

    let outcome = ConnectionOutcome::from(client.test_connection(&config).await);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.success {
        bail!("connection test failed");
    }
    Ok(())
}

/// List models of the active profile
fn list_models(client: &ApiClient) {
    let current = client.current_model();
    println!("{}:", client.config_name());
    for model in client.available_models() {
        let marker = if current.as_deref() == Some(model.name.as_str()) {
            "*"
        } else {
            " "
        };
        let default = if model.is_default { " (default)" } else { "" };
        println!("  {marker} {}{default}", model.name);
    }
}

/// Handle profile commands
async fn handle_config_command(
    client: &ApiClient,
    store: &dyn ConfigStore,
    cmd: ConfigCommands,
) -> Result<()> {
    match cmd {
        ConfigCommands::List => {
            let snapshot = store.get_all().await?;
            if snapshot.configs.is_empty() {
                println!("No provider profiles configured.");
            }
            for config in snapshot.configs {
                let active = snapshot.active_config_id.as_deref() == Some(config.id.as_str());
                println!(
                    "{} {}  {}  [{}]  {}",
                    if active { "*" } else { " " },
                    config.id,
                    config.name,
                    config.provider_type,
                    config.endpoint_url
                );
            }
        }
        ConfigCommands::Add {
            name,
            provider_type,
            url,
            api_key,
            models,
            id,
        } => {
            let mut config = ProviderConfiguration::new(name, provider_type, url);
            config.id = id.unwrap_or_default();
            config.credential = api_key;
            config.models = models.into_iter().map(ModelDescriptor::new).collect();
            let id = store.save(config).await?;
            client.reload().await;
            println!("Saved profile {id}");
        }
        ConfigCommands::Use { id, model } => {
            client.set_active_config(&id, model.as_deref()).await?;
            println!(
                "Active: {} ({})",
                client.config_name(),
                client.current_model().unwrap_or_default()
            );
        }
        ConfigCommands::Model { name } => {
            client.set_selected_model(&name).await?;
            println!("Selected model: {name}");
        }
        ConfigCommands::Remove { id } => {
            store.delete(&id).await?;
            client.reload().await;
            println!("Removed profile {id}");
        }
    }
    Ok(())
}
