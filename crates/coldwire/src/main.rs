//! coldwire - marketing-outreach automation server.
//!
//! Leads come in, an LLM drafts cold emails and LinkedIn content as
//! reviewable drafts, and approved messages go out through rotating SMTP
//! mailbox accounts under a warmup ramp and daily quotas.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod api;
mod config;
mod scheduler;
mod state;

use std::sync::Arc;

use anyhow::Context;
use coldwire_core::{
    AccountRepository, ControlsRepository, Dispatcher, DraftGenerator, JobProcessor,
    JobRepository, LeadRepository, LinkedInRepository, MailTransport, OutboxRepository,
    SmtpMailer, service::processor::DEFAULT_MAX_ATTEMPTS,
};
use coldwire_llm::ChatClient;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coldwire=debug,coldwire_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting coldwire");

    let config = Config::from_env()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite:{}?mode=rwc", config.database_path))
        .await
        .with_context(|| format!("could not open database at {}", config.database_path))?;

    let accounts = AccountRepository::with_pool(pool.clone()).await?;
    let leads = LeadRepository::with_pool(pool.clone()).await?;
    let outbox = OutboxRepository::with_pool(pool.clone()).await?;
    let jobs = JobRepository::with_pool(pool.clone()).await?;
    let linkedin = LinkedInRepository::with_pool(pool.clone()).await?;
    let controls = ControlsRepository::with_pool(pool).await?;

    let transport: Arc<dyn MailTransport> = Arc::new(SmtpMailer::new(config.smtp.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        accounts.clone(),
        outbox.clone(),
        controls.clone(),
        transport,
        config.dispatch,
    ));

    let generator: Arc<dyn DraftGenerator> = Arc::new(ChatClient::new(
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        config.llm.product_context.clone(),
    ));
    let processor = Arc::new(JobProcessor::new(
        jobs.clone(),
        leads.clone(),
        outbox.clone(),
        linkedin.clone(),
        generator,
        DEFAULT_MAX_ATTEMPTS,
    ));

    scheduler::spawn(
        dispatcher.clone(),
        processor.clone(),
        config.dispatch_interval,
        config.jobs_interval,
        config.job_batch,
    );

    let app_state = AppState {
        accounts,
        leads,
        outbox,
        jobs,
        linkedin,
        controls,
        dispatcher,
        processor,
        admin_token: Arc::from(config.admin_token.as_str()),
        job_batch: config.job_batch,
    };

    let app = api::router(app_state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("could not bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}
