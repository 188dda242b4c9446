//! stillwave - layered tone mixer for the terminal
//!
//! Run with: cargo run

mod app;
mod library;

use app::Stillwave;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stillwave=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    Stillwave::new()
        .tracks(library::tracks())
        .combinations(library::combinations())
        .run()
}
