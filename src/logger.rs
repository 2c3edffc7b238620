use log::LevelFilter;
use simplelog::{ConfigBuilder, SimpleLogger};
use tracing::Subscriber;
use tracing_subscriber::{Layer, fmt::MakeWriter, prelude::*, registry::LookupSpan};

/// Console logging used when logfire is not configured.
///
/// `log` records (ntex middleware, startup) go through simplelog, `tracing`
/// events from the webhook go through a fmt layer on stderr.
pub fn setup_simple_logger() -> anyhow::Result<()> {
    let logger_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("ntex_twilio")
        .add_filter_allow_str("twilio_demo")
        .build();
    SimpleLogger::init(LevelFilter::Info, logger_config)?;

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(console_layer(std::io::stderr)),
    )?;
    Ok(())
}

/// Plain text layer for `tracing` events at INFO and above
pub fn console_layer<S, W>(make_writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(make_writer)
        .with_filter(tracing::level_filters::LevelFilter::INFO)
}
