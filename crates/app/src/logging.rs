use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Send `navigator` logs to stderr so stdout stays free for command output.
///
/// With no flag only warnings show: failed resume or logout calls and caught observer
/// panics. `-v` adds session transitions. `-vv` adds per-request transport detail from
/// `services`. A set `RUST_LOG` replaces all of this.
pub fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "info,services=debug,navigator=debug",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr.with_max_level(tracing::Level::DEBUG))
        .with_target(verbosity > 1)
        .compact()
        .init();
}
