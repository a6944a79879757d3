mod api;
mod auth;
mod cache;
mod client;
mod config;
mod enhance;
mod prompts;
mod service;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::Request;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cache::Cache;
use crate::cache::memory::MemoryCache;
use crate::cache::redis_cache::RedisCache;
use crate::client::state::{Action, ViewSort, parse_tags};
use crate::client::{ApiClient, ClientSession};
use crate::enhance::groq::GroqEnhancer;
use crate::prompts::SortOrder;
use crate::prompts::file_repository::FilePromptRepository;
use crate::prompts::mongo_repository::MongoPromptRepository;
use crate::prompts::repository::PromptRepository;
use crate::service::PromptService;

#[derive(Parser)]
#[command(name = "promptly", about = "Store, organize and enhance LLM prompts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Server URL for client commands
    #[arg(long, global = true, env = "PROMPTLY_SERVER", default_value = "http://localhost:5000")]
    server: String,

    /// Bearer token for client commands
    #[arg(long, global = true, env = "PROMPTLY_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default when no subcommand is given)
    #[command(alias = "run")]
    Serve,
    /// List your prompts
    List {
        /// latest | oldest
        #[arg(long, default_value = "latest")]
        sort: String,
        /// Only prompts carrying every one of these comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// List every tag used across your prompts
    Tags,
    /// Save a new prompt
    Add {
        content: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Delete a prompt by id
    Delete { id: String },
    /// Ask the LLM to rewrite a prompt
    Enhance { prompt: String },
    /// Mint a bearer token signed with JWT_SECRET (local development)
    Token {
        user: String,
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server().await,
        Command::Token { user, hours } => {
            let config = config::Config::from_env();
            let verifier = auth::TokenVerifier::new(&config.signing_secret()?);
            println!("{}", verifier.issue_token(&user, chrono::Duration::hours(hours))?);
            Ok(())
        }
        command => {
            run_client(&cli.server, cli.token, command).await?;
            Ok(())
        }
    }
}

async fn run_client(server: &str, token: Option<String>, command: Command) -> Result<()> {
    let token = token.context("no token given, pass --token or set PROMPTLY_TOKEN")?;
    let api = ApiClient::new(client::http_client()?, server, token);
    let mut session = ClientSession::new(api);

    let outcome = match command {
        Command::List { sort, tags } => {
            let sort = match SortOrder::parse(Some(&sort)) {
                SortOrder::Latest => ViewSort::Newest,
                SortOrder::Oldest => ViewSort::Oldest,
            };
            session.state.apply(Action::SetSortBy(sort));
            session
                .state
                .apply(Action::SetFilterTags(parse_tags(tags.as_deref().unwrap_or(""))));
            session.fetch().await.map(|_| {
                for prompt in session.state.visible_prompts() {
                    let tags = if prompt.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", prompt.tags.join(", "))
                    };
                    println!(
                        "{}  {}{}\n    {}",
                        prompt.id,
                        prompt.created_at.format("%Y-%m-%d %H:%M"),
                        tags,
                        prompt.content
                    );
                }
            })
        }
        Command::Tags => session.fetch().await.map(|_| {
            for tag in session.state.all_tags() {
                println!("{tag}");
            }
        }),
        Command::Add { content, tags } => session
            .create(&content, parse_tags(&tags))
            .await
            .map(|_| {
                if let Some(prompt) = session.state.prompts.first() {
                    println!("Saved {}", prompt.id);
                }
            }),
        Command::Delete { id } => session
            .delete(&id)
            .await
            .map(|_| println!("Deleted {id}")),
        Command::Enhance { prompt } => session
            .enhance(&prompt)
            .await
            .map(|_| println!("{}", session.state.enhanced_content)),
        Command::Serve | Command::Token { .. } => unreachable!("handled in main"),
    };

    outcome.map_err(|e| {
        let message = session.state.error.clone().unwrap_or_else(|| e.to_string());
        anyhow::anyhow!(message)
    })
}

async fn run_server() -> Result<(), Box<dyn Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("promptly=info,tower_http=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true).with_bracketed_fields(false))
        .with(sentry::integrations::tracing::layer().event_filter(
            |metadata| match *metadata.level() {
                tracing::Level::ERROR => sentry::integrations::tracing::EventFilter::Event,
                tracing::Level::WARN | tracing::Level::INFO => {
                    sentry::integrations::tracing::EventFilter::Breadcrumb
                }
                _ => sentry::integrations::tracing::EventFilter::Ignore,
            },
        ))
        .init();

    let config = config::Config::from_env();
    let jwt_secret = config.signing_secret()?;

    let _guard = sentry::init((
        config.sentry_dsn.clone().unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.environment.clone().into()),
            send_default_pii: false,
            traces_sample_rate: 0.2,
            enable_logs: true,
            ..Default::default()
        },
    ));

    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(config.llm_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let repo: Arc<dyn PromptRepository> = match &config.mongodb_uri {
        Some(uri) => {
            tracing::info!(database = %config.mongodb_database, "using MongoDB prompt store");
            Arc::new(MongoPromptRepository::connect(uri, &config.mongodb_database).await?)
        }
        None => {
            tracing::info!(dir = %config.data_dir.display(), "MONGODB_URI not set, using file prompt store");
            Arc::new(FilePromptRepository::new(&config.data_dir))
        }
    };
    repo.load_all().await.context("failed to load prompt store")?;

    let cache: Arc<dyn Cache> = match &config.redis {
        Some(redis) => {
            let connected = match redis.connection_info() {
                Ok(info) => {
                    let addr = info.addr.to_string();
                    RedisCache::connect(info).await.map(|cache| (cache, addr))
                }
                Err(e) => Err(anyhow::Error::new(e).context("invalid Redis settings")),
            };
            match connected {
                Ok((cache, addr)) => {
                    tracing::info!(%addr, "connected to Redis");
                    Arc::new(cache)
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "Redis unavailable, caching disabled");
                    Arc::new(cache::DisabledCache)
                }
            }
        }
        None => {
            tracing::info!("Redis not configured, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let enhancer = Arc::new(GroqEnhancer::new(
        http_client,
        config.groq_api_key.clone(),
        config.groq_model.clone(),
        config.groq_base_url.clone(),
    ));
    if config.groq_api_key.is_none() {
        tracing::warn!("GROQ_API_KEY not set, prompt enhancement will fail");
    }

    let service = Arc::new(PromptService::new(repo, cache, enhancer));

    let app_state = api::AppState {
        service: service.clone(),
        tokens: Arc::new(auth::TokenVerifier::new(&jwt_secret)),
        cors_origins: Arc::new(config.cors_origins.clone()),
    };

    let app = api::create_app(app_state)
        .layer(SentryHttpLayer::new().enable_transaction())
        .layer(NewSentryLayer::<Request<Body>>::new_from_top());

    let port = config.port;
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown().await;
    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
