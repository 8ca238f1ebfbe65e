//! privkit demo: consent → DSAR → anonymization → processing log.
//!
//! Configuration comes from the environment (see `ToolkitConfig::from_env`);
//! at least `PRIVKIT_ENCRYPTION_KEY` must be set.

use anyhow::Context;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use privkit::core::preferences_from_value;
use privkit::{AnonymizeOptions, FieldRule, StoreOptions, Toolkit, ToolkitConfig, Withdrawal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ToolkitConfig::from_env().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let mut toolkit = Toolkit::open(&config).context("opening document store")?;
    toolkit
        .anonymizer_mut()
        .configure([("email".to_string(), FieldRule::new("hash"))].into());

    tokio::select! {
        result = run(&toolkit) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            info!("interrupted, flushing processing log");
        }
    }

    toolkit.shutdown().await?;
    Ok(())
}

async fn run(toolkit: &Toolkit) -> anyhow::Result<()> {
    let user = "user123";
    let logger = toolkit.logger();

    // Consent
    let prefs = preferences_from_value(&json!({"marketing": true, "analytics": true}))?;
    toolkit
        .consent()
        .store_consent(user, prefs, &StoreOptions::default())
        .await?;
    let marketing = toolkit.consent().get_consent_status(user, "marketing").await?;
    info!(marketing, "consent stored");
    logger
        .log_data_processing("consent", json!({"userId": user}))
        .await?;

    toolkit
        .consent()
        .withdraw_consent(user, Withdrawal::from("marketing"))
        .await?;
    let remaining = toolkit.consent().get_preferences(user).await?;
    info!(preferences = ?remaining, "after withdrawal");

    // DSAR
    toolkit
        .dsar()
        .request_data_correction(user, &json!({"email": "new@email.com", "name": "Ada"}))
        .await?;
    let record = toolkit.dsar().request_data_access(user).await?;
    info!(record = ?record, "data after correction");

    // Anonymize before handing the record to analytics.
    if let Some(fields) = record {
        let record = serde_json::Value::Object(fields);
        let anonymizer = toolkit.anonymizer();
        let hashed = anonymizer.anonymize_field(&record, "email", &AnonymizeOptions::default())?;
        let masked = anonymizer.anonymize_field(&hashed, "name", &AnonymizeOptions::default())?;
        info!(record = %masked, "anonymized record");
        logger
            .log_data_processing("export", json!({"userId": user, "fields": ["email", "name"]}))
            .await?;
    }

    toolkit.dsar().request_data_deletion(user).await?;
    let erased = toolkit.dsar().request_data_access(user).await?;
    info!(record = ?erased, "data after deletion");
    let dsar_logs = toolkit.dsar().logs().await?;
    info!(count = dsar_logs.len(), "DSAR log entries");

    logger.flush().await?;
    let processing = logger.get_logs_for_audit(None).await?;
    let audit = toolkit.audit().entries().await?;
    info!(
        processing = processing.len(),
        audit = audit.len(),
        "processing and audit log entries"
    );
    Ok(())
}
