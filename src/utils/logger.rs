use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name of the span every store command runs inside.
pub const STORE_SPAN: &str = "store";

fn filter_directive(verbose: bool) -> &'static str {
    if verbose {
        "dropbox_store=debug,info"
    } else {
        "dropbox_store=info"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose)))
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON lines for when the store runs under a log collector. Each line
/// carries the fields of the enclosing [`store_span`], so the backend and
/// command can be filtered on without parsing the message.
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();
}

/// Span a single store command runs in.
pub fn store_span(backend: &str, command: &str) -> Span {
    tracing::info_span!(STORE_SPAN, backend = %backend, command = %command)
}
