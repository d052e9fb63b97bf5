pub mod agent;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod reply;

use agent::ConversationAssistant;
use cli::Args;
use history::initialize_history_store;
use llm::LlmConfig;
use llm::chat::new_client as new_chat_client;
use log::{ error, info, warn };
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let api_key = args.require_api_key().map_err(|e| {
        error!("{}", e);
        e
    })?;

    info!("--- Core Configuration ---");
    info!("Listen Address: {}:{}", args.host, args.port);
    info!("Model: {}", args.model);
    info!("Upstream Base URL: {}", args.base_url);
    info!("Max Tokens: {}", args.max_tokens);
    info!("Temperature: {}", args.temperature);
    info!("Upstream Timeout: {:?}", args.request_timeout());
    info!("TLS Enabled: {}", args.enable_tls);
    info!("Debug Mode: {}", args.debug);
    info!("-------------------------");

    if args.uses_dev_secret() {
        warn!("SECRET_KEY is using the development default; set a real secret in production.");
    }

    let llm_config = LlmConfig {
        api_key: Some(api_key),
        base_url: Some(args.base_url.clone()),
        temperature: args.temperature,
        timeout: args.request_timeout(),
    };
    let chat_client = new_chat_client(&llm_config)?;
    info!(
        "Chat client configured: Model={}, BaseURL={}",
        args.model,
        chat_client.get_base_url().as_deref().unwrap_or("adapter default")
    );
    let history_store = initialize_history_store();

    let assistant = ConversationAssistant::new(
        chat_client,
        history_store,
        args.model.clone(),
        args.max_tokens
    );

    info!("Starting Conversation Assistant backend");
    Server::new(assistant, args).run().await
}
