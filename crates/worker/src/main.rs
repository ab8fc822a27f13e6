//! Background worker: runs the notification sweeps (delivery retry,
//! stale-review reminders, deadline warnings, record retention) until
//! SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gradus_core::types::DbId;
use gradus_notify::{
    EmailConfig, MailTransport, OutboundEmail, Recipient, RecipientDirectory, SmtpMailer,
    SweepService, TransportError,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gradus_worker=debug,gradus_notify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = gradus_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    gradus_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    gradus_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Mail transport ---
    let transport: Arc<dyn MailTransport> = match EmailConfig::from_env() {
        Some(config) => {
            tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP delivery enabled");
            Arc::new(SmtpMailer::new(config))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, emails will be logged instead of sent");
            Arc::new(LogOnlyMailer)
        }
    };

    let dispatcher = Arc::new(gradus_notify::Dispatcher::new(pool.clone(), transport));
    let directory: Arc<dyn RecipientDirectory> = Arc::new(EnvDirectory::from_env());

    // --- Sweeps ---
    let cancel = tokio_util::sync::CancellationToken::new();
    let sweeps = SweepService::new(pool, Arc::clone(&dispatcher), directory);
    let sweep_cancel = cancel.clone();
    let sweep_handle = tokio::spawn(async move {
        sweeps.run(sweep_cancel).await;
    });

    tracing::info!("Worker started (retry, reminder, deadline and retention sweeps)");

    shutdown_signal().await;

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

// ---------------------------------------------------------------------------
// EnvDirectory
// ---------------------------------------------------------------------------

/// Recipient resolution from environment configuration, standing in until
/// lookups go through the campus identity service.
///
/// - `ADMIN_EMAILS`: comma-separated administrator addresses.
/// - `MAIL_DOMAIN`: when set, user ids resolve to `u<id>@<domain>`;
///   otherwise lookups return `None` and reminders escalate to the
///   administrators.
struct EnvDirectory {
    admin_emails: Vec<String>,
    mail_domain: Option<String>,
}

impl EnvDirectory {
    fn from_env() -> Self {
        let admin_emails = std::env::var("ADMIN_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect::<Vec<_>>();
        if admin_emails.is_empty() {
            tracing::warn!("ADMIN_EMAILS not set, escalation notifications have no recipients");
        }
        Self {
            admin_emails,
            mail_domain: std::env::var("MAIL_DOMAIN").ok(),
        }
    }
}

#[async_trait]
impl RecipientDirectory for EnvDirectory {
    async fn lookup(&self, user_id: DbId) -> Option<Recipient> {
        self.mail_domain
            .as_ref()
            .map(|domain| Recipient::user(format!("u{user_id}@{domain}")))
    }

    async fn admins(&self) -> Vec<Recipient> {
        self.admin_emails
            .iter()
            .map(|a| Recipient::admin(a.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// LogOnlyMailer
// ---------------------------------------------------------------------------

/// Development fallback transport: writes the email to the log and
/// reports success so records still settle as `sent`.
struct LogOnlyMailer;

#[async_trait]
impl MailTransport for LogOnlyMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Email delivery skipped (no SMTP)");
        Ok(())
    }
}
