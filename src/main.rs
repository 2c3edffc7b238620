//! # Twilio demo web application
//!
//! Serves a form that places test calls and the TwiML view those calls
//! fetch. Configures SSL, logging and route handling.

#![recursion_limit = "256"]

use anyhow::Context;
use envconfig::Envconfig;
use logfire::config::MetricsOptions;
use ntex::web;
use ntex_twilio::{config, front, logger};
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    // Initialize configuration
    let app_config = config::AppConfig::init_from_env().context("failed to load app config")?;
    let twilio_settings = app_config.twilio_settings()?;

    // Initialize logging and metrics, console logging when running locally
    let shutdown_handler = match &app_config.logfire_token {
        Some(token) => Some(
            logfire::configure()
                .install_panic_handler()
                .with_metrics(Some(MetricsOptions::default()))
                .send_to_logfire(logfire::config::SendToLogfire::Yes)
                .with_token(token)
                .finish()?,
        ),
        None => {
            logger::setup_simple_logger()?;
            None
        }
    };

    if twilio_settings.trusted_mode {
        log::warn!("TWILIO_TRUSTED_MODE is on, callbacks are not verified");
    }
    if !twilio_settings.bearer_token_enabled() {
        log::warn!("SECRET_KEY is not set, callbacks are verified by signature only");
    }

    configure_and_run_server(&app_config, twilio_settings).await?;

    if let Some(shutdown_handler) = shutdown_handler {
        shutdown_handler.shutdown()?;
    }

    Ok(())
}

/// Configures SSL acceptor for production environments
fn setup_ssl_acceptor(
    app_config: &config::AppConfig,
) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    let mut ssl_acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls_server())
        .map_err(|e| anyhow::anyhow!("Failed to create SSL acceptor: {}", e))?;

    ssl_acceptor
        .set_private_key_file(&app_config.private_key_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load private key from {}: {}",
                app_config.private_key_path,
                e
            )
        })?;

    ssl_acceptor
        .set_certificate_file(&app_config.certificate_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load certificate from {}: {}",
                app_config.certificate_path,
                e
            )
        })?;

    Ok(ssl_acceptor)
}

/// Configures and starts the web server with appropriate SSL settings
async fn configure_and_run_server(
    app_config: &config::AppConfig,
    twilio_settings: config::TwilioSettings,
) -> anyhow::Result<()> {
    let server_addr = (
        app_config.web_server_host.clone(),
        app_config.web_server_port,
    );
    let base_url = app_config.base_url();
    log::info!("callback urls are built on {base_url}");

    let server = web::server(move || {
        web::App::new()
            .wrap(web::middleware::Logger::default())
            .wrap(web::middleware::Compress::default())
            .state(front::AppState::new(twilio_settings.clone(), &base_url))
            .configure(front::routes::demo)
            .default_service(web::route().to(front::server::serve_not_found))
    });

    let bound_server = if app_config.is_prod() {
        let ssl_acceptor = setup_ssl_acceptor(app_config)?;
        server.bind_openssl(server_addr, ssl_acceptor)?
    } else {
        server.bind(server_addr)?
    };

    bound_server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
