use anyhow::Result;
use book_reader::core::config::Config;
use book_reader::services::catalog::GoogleBooksClient;
use book_reader::services::terminal::{run_reader, Clients};
use book_reader::services::{create_backends, setup};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with a backend section.");
            return Err(e);
        }
    };

    let catalog = Arc::new(GoogleBooksClient::new(&config.catalog));
    let (translator, chat) = create_backends(&config)?;

    let volume_id = std::env::args().nth(1);
    let book = setup::choose_book(
        catalog.as_ref(),
        volume_id.as_deref(),
        config.catalog.max_results,
    )
    .await?;

    run_reader(
        book,
        &config,
        Clients {
            catalog,
            translator,
            chat,
        },
    )
    .await
}
