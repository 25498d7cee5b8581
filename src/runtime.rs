//! Runtime services and shared state for the bot.

use std::future::Future;

use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{
        chat::ChatClient,
        health::{HealthServer, Liveness},
        llm::LlmClient,
    },
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the LLM client, chat client, liveness flag, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The chat client instance.
    pub chat: ChatClient,
    /// Gateway connection flag shared with the liveness endpoint.
    pub liveness: Liveness,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        let liveness = Liveness::default();

        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        // Initialize the discord client.
        let chat = ChatClient::discord(&config, llm.clone(), liveness.clone()).await?;

        Ok(Self { config, llm, chat, liveness })
    }

    /// Bind the liveness port, then run until the gateway ends or a shutdown signal arrives.
    pub async fn start(&self) -> Void {
        let server = HealthServer::bind(self.config.liveness_port(), self.liveness.clone()).await?;

        self.run(server, shutdown_signal()).await
    }

    /// Run the gateway and the liveness server until the gateway ends or `shutdown` resolves.
    ///
    /// Shutdown order: stop the liveness server, then disconnect the gateway.
    pub async fn run<F>(&self, server: HealthServer, shutdown: F) -> Void
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let health = tokio::spawn(server.serve(async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        }));

        let result = tokio::select! {
            result = self.chat.start() => result,
            _ = shutdown => {
                info!("Shutdown signal received.");
                Ok(())
            }
        };

        let _ = stop_tx.send(true);

        match health.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("Liveness endpoint failed: {:#}", err),
            Err(err) => warn!("Liveness endpoint task failed: {}", err),
        }

        self.chat.shutdown().await;
        self.liveness.set_connected(false);

        info!("Shutdown complete.");

        result
    }
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {}", err);
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
}
