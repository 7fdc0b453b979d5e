use crate::core::state::Book;
use crate::services::catalog::CatalogClient;
use anyhow::{anyhow, Result};
use inquire::{Select, Text};
use log::warn;

/// Pick the book to open: a volume id given on the command line, or an
/// interactive catalog search.
pub async fn choose_book(
    catalog: &dyn CatalogClient,
    volume_id: Option<&str>,
    max_results: u32,
) -> Result<Book> {
    if let Some(id) = volume_id {
        return Ok(book_for_id(catalog, id).await);
    }

    let query = Text::new("Search for a book:").prompt()?;
    println!("Searching...");
    let books = catalog.search(&query, max_results).await?;
    if books.is_empty() {
        return Err(anyhow!("No books found for: {}", query));
    }

    let options: Vec<String> = books.iter().map(book_label).collect();
    let selection = Select::new("Select a book:", options.clone()).prompt()?;
    let index = options
        .iter()
        .position(|o| *o == selection)
        .ok_or_else(|| anyhow!("Selection not in list"))?;
    Ok(books[index].clone())
}

/// Local fields for `id`. A failed lookup still opens the reader, titled by the id.
async fn book_for_id(catalog: &dyn CatalogClient, id: &str) -> Book {
    match catalog.fetch_volume(id).await {
        Ok(volume) => {
            let mut book = volume.into_book();
            book.id = id.to_string();
            book
        }
        Err(e) => {
            warn!("Could not look up volume {}: {:#}", id, e);
            Book {
                id: id.to_string(),
                title: id.to_string(),
                ..Default::default()
            }
        }
    }
}

fn book_label(book: &Book) -> String {
    if book.authors.is_empty() {
        format!("{} [{}]", book.title, book.id)
    } else {
        format!("{} - {} [{}]", book.title, book.authors_line(), book.id)
    }
}
