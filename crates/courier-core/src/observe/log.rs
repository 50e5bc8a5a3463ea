//! subscriber の組み立てとグローバル登録
//!
//! filter → fmt layer（text / json）の順で registry に積みます。
//! ログは stdout を汚さないよう stderr に出します（stdout は task の結果用）。

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::observe::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

pub(super) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = filter(&cfg.level)?;
    if tracing::dispatcher::has_been_set() {
        return Err(LoggerError::AlreadyInstalled);
    }

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(cfg.with_targets)
        .with_timer(local_rfc3339());
    let layer = match cfg.format {
        LoggerFormat::Text => base.with_ansi(cfg.color.enabled()).boxed(),
        LoggerFormat::Json => base.json().with_ansi(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;
    Ok(())
}

fn filter(directive: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directive).map_err(|source| LoggerError::BadFilter {
        directive: directive.to_string(),
        source,
    })
}

/// ローカル時刻の RFC 3339。オフセットが取れない環境では UTC。
fn local_rfc3339() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}
