pub mod api;

use crate::agent::ConversationAssistant;
use crate::cli::Args;
use std::error::Error;
use log::{ info, warn };

use self::api::AppState;

pub struct Server {
    assistant: ConversationAssistant,
    args: Args,
}

impl Server {
    pub fn new(assistant: ConversationAssistant, args: Args) -> Self {
        Self { assistant, args }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.args.listen_addr()?;
        let tls_paths = self.args.tls_paths()?;
        let app = api::router(AppState::new(self.assistant, self.args.debug));

        match tls_paths {
            Some((cert_path, key_path)) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    cert_path,
                    key_path
                );
                let tls_config = axum_server::tls_rustls::RustlsConfig
                    ::from_pem_file(&cert_path, &key_path).await
                    .map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

                info!("HTTPS server listening on: https://{}", addr);
                axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
            }
            None => {
                if self.args.tls_cert_path.is_some() || self.args.tls_key_path.is_some() {
                    warn!("TLS paths were given but --enable-tls is off; serving plain HTTP.");
                }
                let listener = tokio::net::TcpListener
                    ::bind(addr).await
                    .map_err(|e|
                        format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
                    )?;

                info!("HTTP server listening on: http://{}", addr);
                axum::serve(listener, app.into_make_service())
                    .with_graceful_shutdown(shutdown_signal()).await?;
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, finishing in-flight requests");
}
