use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (text|json)")]
    UnknownFormat(String),

    #[error("unknown colour mode {0:?} (auto|always|never)")]
    UnknownColorMode(String),

    #[error("bad log filter {directive:?}: {source}")]
    BadFilter {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,

    #[error("failed to install the tracing subscriber: {0}")]
    Install(#[from] TryInitError),
}
