//! spotify-tools CLI entry point

use std::path::PathBuf;
use std::sync::Arc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use anyhow::{Context as _, Result};

use spotify_tools::adapters::cli::CliChannel;
use spotify_tools::agent::{AgentLoop, OllamaClient};
use spotify_tools::auth::{
    build_authorize_url, generate_state, AccountsClient, AppCredentials, AuthorizationFlow,
    CredentialStore, StoredTokens, TokenGrants, DEFAULT_SCOPES,
};
use spotify_tools::config::{self, Config};
use spotify_tools::spotify::SpotifyClient;
use spotify_tools::tools::{spotify, ToolRegistry};
use spotify_tools::ui;

#[derive(Parser)]
#[command(name = "spotify-tools")]
#[command(about = "Control Spotify from an LLM agent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent; starts a REPL when no prompt is given
    Chat {
        /// Prompt to send to the agent
        prompt: Vec<String>,

        /// Override the Ollama model
        #[arg(short, long)]
        model: Option<String>,

        /// Skip interactive login and use app-only client credentials
        #[arg(long)]
        app_only: bool,
    },

    /// Authorize with Spotify in the browser
    Login,

    /// Remove stored Spotify tokens
    Logout,

    /// Print an authorization URL for a manual login
    AuthUrl,

    /// Exchange an authorization code for tokens
    Exchange {
        /// Code from the redirect's `code` query parameter
        #[arg(long)]
        code: String,

        /// Redirect URI used when the code was issued
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Refresh the stored access token
    Refresh,

    /// Show configuration and stored tokens
    Status,

    /// List the tools advertised to the model
    Tools,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    install_interrupt_hint();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        ui::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// First Ctrl+C prints a hint, a second one within three seconds exits
fn install_interrupt_hint() {
    let exit_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let r = exit_flag.clone();

    ctrlc::set_handler(move || {
        if r.load(std::sync::atomic::Ordering::SeqCst) {
            println!("\nBye!");
            std::process::exit(130);
        } else {
            println!("\nUse /exit to quit (or press Ctrl+C again)");
            r.store(true, std::sync::atomic::Ordering::SeqCst);

            // Reset flag after 3 seconds
            let r2 = r.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_secs(3));
                r2.store(false, std::sync::atomic::Ordering::SeqCst);
            });
        }
    })
    .ok();
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Chat { prompt, model, app_only } => {
            let mut config = config::load()?;
            if let Some(model) = model {
                config.model = model;
            }
            let prompt = prompt.join(" ").trim().to_string();
            run_chat(&config, (!prompt.is_empty()).then_some(prompt), app_only).await?;
        }

        Commands::Login => {
            let config = config::load()?;
            let (grants, store) = accounts(&config)?;
            let flow = authorization_flow(&config, grants, store.clone())?;
            flow.authorize().await?;
            ui::print_success(&format!("Spotify tokens saved to {}", store.path().display()));
        }

        Commands::Logout => {
            let config = config::load()?;
            let store = credential_store(&config)?;
            store.clear()?;
            ui::print_success("Removed stored Spotify tokens");
            if config.spotify.access_token.is_some() || config.spotify.refresh_token.is_some() {
                ui::print_warning("Tokens are still set in the environment");
            }
        }

        Commands::AuthUrl => {
            let config = config::load()?;
            let state = generate_state();
            let url = build_authorize_url(config.client_id()?, &config.redirect_url()?, &state, DEFAULT_SCOPES)?;
            println!("{}", url);
            ui::print_step(&format!("state: {}", state));
        }

        Commands::Exchange { code, redirect_uri } => {
            let config = config::load()?;
            let (grants, store) = accounts(&config)?;
            let redirect_uri = redirect_uri.unwrap_or_else(|| config.spotify.redirect_uri.clone());

            let tokens = grants.exchange_code(code.trim(), &redirect_uri).await?;
            store.write(&tokens)?;
            ui::print_success(&format!("Spotify tokens saved to {}", store.path().display()));
            if let Some(expires_in) = tokens.expires_in {
                ui::print_step(&format!("Access token expires in {}s", expires_in));
            }
        }

        Commands::Refresh => {
            let config = config::load()?;
            let (grants, store) = accounts(&config)?;
            let refresh_token = store
                .read()
                .refresh_token
                .context("No Spotify refresh token stored. Run `spotify-tools login` first.")?;

            let tokens = grants.refresh(&refresh_token).await?;
            store.write(&tokens)?;
            ui::print_success("Spotify access token refreshed");
        }

        Commands::Status => {
            let config = config::load()?;
            let store = credential_store(&config)?;
            let tokens = store.read();
            let set = |present: bool| if present { "✓" } else { "not set" };

            ui::print_field("Config file", &config::config_path().display().to_string());
            ui::print_field("Credentials file", &store.path().display().to_string());
            ui::print_field("Client ID", set(config.client_id().is_ok()));
            ui::print_field("Client secret", set(config.client_secret().is_ok()));
            ui::print_field("Redirect URI", &config.spotify.redirect_uri);
            ui::print_field("Access token", set(tokens.access_token.is_some()));
            ui::print_field("Refresh token", set(tokens.refresh_token.is_some()));
            ui::print_field("Ollama host", &config.ollama.host);
            ui::print_field("Model", &config.model);
        }

        Commands::Tools => {
            for action in spotify::Action::ALL {
                ui::print_step(&format!("{}  {}", action.name(), action.description()));
            }
        }
    }

    Ok(())
}

async fn run_chat(config: &Config, prompt: Option<String>, app_only: bool) -> Result<()> {
    let (grants, store) = accounts(config)?;

    let mut spotify_client = SpotifyClient::new(grants.clone(), store.clone());
    if !app_only {
        let flow = Arc::new(authorization_flow(config, grants, store)?);
        flow.ensure_tokens().await?;
        spotify_client = spotify_client.with_flow(flow);
    }

    let registry = Arc::new(ToolRegistry::compose([spotify::module(Arc::new(spotify_client))])?);
    tracing::debug!(tools = ?registry.names(), "Tool registry ready");
    let client = OllamaClient::new(&config.ollama.host, &config.model).with_api_key(config.ollama.api_key.clone());
    let agent = AgentLoop::new(client, registry, config.max_iterations)
        .with_system_prompt(config.system_prompt.clone());
    let channel = CliChannel::new(agent);

    match prompt {
        Some(prompt) => {
            let conversation = channel.run_once(&prompt).await?;
            println!("{}", conversation.answer);
        }
        None => {
            ui::print_header(&config.model, &config.ollama.host);
            channel.run_interactive().await?;
        }
    }
    Ok(())
}

fn credential_store(config: &Config) -> Result<Arc<CredentialStore>> {
    let seed = StoredTokens {
        access_token: config.spotify.access_token.clone(),
        refresh_token: config.spotify.refresh_token.clone(),
    };
    let path: PathBuf = config.spotify.credentials_file.clone();
    Ok(Arc::new(CredentialStore::open(path, seed)?))
}

fn accounts(config: &Config) -> Result<(Arc<dyn TokenGrants>, Arc<CredentialStore>)> {
    let app = AppCredentials {
        client_id: config.client_id()?.to_string(),
        client_secret: config.client_secret()?.to_string(),
    };
    let grants: Arc<dyn TokenGrants> = Arc::new(AccountsClient::new(app));
    Ok((grants, credential_store(config)?))
}

fn authorization_flow(
    config: &Config,
    grants: Arc<dyn TokenGrants>,
    store: Arc<CredentialStore>,
) -> Result<AuthorizationFlow> {
    Ok(AuthorizationFlow::new(config.client_id()?, config.spotify.redirect_uri.clone(), grants, store)
        .with_timeout(config.auth_timeout()))
}
