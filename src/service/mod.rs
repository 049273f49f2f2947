//! Checkout service composition root.
//!
//! Wires storage, the payment gateway, notifications and the HTTP API together.

mod config;
mod error;

pub use config::ServiceConfig;
pub use error::ServiceError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{App, HttpServer, web};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_actix_web::TracingLogger;

use crate::config::Config;
use crate::coordinator::{Coordinator, CoordinatorConfig};
use crate::domain::CURRENCY;
use crate::gateway::{PayPalGateway, PaymentGateway};
use crate::notification::{
    Event, NoopNotifier, Notifier, ShutdownData, StartupData, TelegramConfig, TelegramNotifier,
};
use crate::storage::{MemoryStorage, OrderStore, SqliteStorage, SqliteStorageConfig};
use crate::web::{AppState, PublicCheckoutConfig, configure_routes};

/// Checkout service that owns every long-lived component.
pub struct Service {
    cfg: Config,
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    state: AppState,
    storage_label: String,
    payment_mode: String,

    // Runtime state
    version: String,
    started_at: Mutex<Option<Instant>>,
    running: Mutex<bool>,
}

impl Service {
    /// Creates a new Service, opening storage and building the gateway client.
    pub async fn new(cfg: ServiceConfig) -> Result<Self, ServiceError> {
        let app_config = cfg.app_config;

        let (store, storage_label) = Self::open_store(&app_config).await?;

        let gateway = PayPalGateway::from_config(&app_config.paypal)?;
        let payment_mode = format!("{} ({})", gateway.name(), app_config.paypal.mode);
        let gateway: Arc<dyn PaymentGateway> = Arc::new(gateway);

        let notifier = Self::build_notifier(&app_config);

        let coordinator = Coordinator::new(
            store.clone(),
            gateway,
            notifier.clone(),
            CoordinatorConfig::from_config(&app_config)?,
        );
        let state = AppState::new(
            Arc::new(coordinator),
            PublicCheckoutConfig::from_config(&app_config.paypal, CURRENCY),
        );

        Ok(Service {
            cfg: app_config,
            store,
            notifier,
            state,
            storage_label,
            payment_mode,
            version: cfg.version,
            started_at: Mutex::new(None),
            running: Mutex::new(false),
        })
    }

    async fn open_store(cfg: &Config) -> Result<(Arc<dyn OrderStore>, String), ServiceError> {
        match cfg.storage {
            Some(ref storage) if storage.enabled => {
                let defaults = SqliteStorageConfig::default();
                let sqlite_config = SqliteStorageConfig {
                    path: storage.path.clone().unwrap_or(defaults.path),
                    max_connections: storage.max_connections.unwrap_or(defaults.max_connections),
                };
                let label = format!("sqlite ({})", sqlite_config.path);
                let sqlite = SqliteStorage::new(sqlite_config).await?;
                Ok((Arc::new(sqlite), label))
            }
            _ => {
                warn!("Storage disabled, orders are kept in memory and lost on restart");
                Ok((Arc::new(MemoryStorage::new()), "memory".to_string()))
            }
        }
    }

    fn build_notifier(cfg: &Config) -> Arc<dyn Notifier> {
        let telegram = cfg
            .notification
            .as_ref()
            .and_then(|n| n.telegram.as_ref())
            .filter(|t| t.enabled);

        if let Some(telegram) = telegram {
            if telegram.bot_token.is_empty() || telegram.chat_id.is_empty() {
                warn!("Telegram enabled but TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID is missing");
            } else {
                match TelegramNotifier::new(TelegramConfig::from_config(telegram)) {
                    Ok(notifier) => {
                        info!("Telegram notifier created");
                        return Arc::new(notifier);
                    }
                    Err(e) => warn!(error = %e, "Failed to create Telegram notifier"),
                }
            }
        }

        Arc::new(NoopNotifier)
    }

    /// Serves the HTTP API until the server is stopped by a signal.
    pub async fn run(&self) -> Result<(), ServiceError> {
        {
            let mut running = self.running.lock().await;
            if *running {
                return Err(ServiceError::AlreadyRunning);
            }
            *running = true;
        }

        {
            let mut started_at = self.started_at.lock().await;
            *started_at = Some(Instant::now());
        }

        let address = self.cfg.server.address();

        info!(
            version = %self.version,
            env = %self.cfg.app.env,
            address = %address,
            payment_mode = %self.payment_mode,
            storage = %self.storage_label,
            "Starting checkout service"
        );

        self.send_notification(Event::startup(StartupData {
            app_name: self.cfg.app.name.clone(),
            version: self.version.clone(),
            payment_mode: self.payment_mode.clone(),
            storage: self.storage_label.clone(),
            address: address.clone(),
        }))
        .await;

        let state = self.state.clone();
        let mut server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(TracingLogger::default())
                .configure(configure_routes)
        });
        if let Some(workers) = self.cfg.server.workers {
            server = server.workers(workers);
        }

        server.bind(&address)?.run().await?;

        Ok(())
    }

    /// Announces shutdown and releases storage and the notifier.
    pub async fn stop(&self) -> Result<(), ServiceError> {
        {
            let mut running = self.running.lock().await;
            if !*running {
                return Ok(());
            }
            *running = false;
        }

        info!("Stopping checkout service...");

        let uptime = self.uptime().await;

        self.send_notification(Event::shutdown(ShutdownData {
            reason: "graceful shutdown".to_string(),
            uptime,
            graceful: true,
        }))
        .await;

        if let Err(e) = self.notifier.close().await {
            debug!(error = %e, "Failed to close notifier");
        }
        self.store.close().await?;

        info!(uptime = ?uptime, "Checkout service stopped");

        Ok(())
    }

    /// Returns how long the service has been running.
    pub async fn uptime(&self) -> Duration {
        self.started_at
            .lock()
            .await
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    async fn send_notification(&self, event: Event) {
        if !self.notifier.is_enabled(event.event_type) {
            return;
        }
        if let Err(e) = self.notifier.send(&event).await {
            debug!(
                event_type = %event.event_type,
                error = %e,
                "Failed to send notification"
            );
        }
    }
}
