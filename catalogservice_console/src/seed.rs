use anyhow::Context;
use serde::Deserialize;

use catalogservice_registry::api::{BookDetails, MemberDetails};
use catalogservice_registry::catalog_registry::CatalogRegistry;

#[derive(Debug, Deserialize)]
struct SeedData {
    books: Vec<BookDetails>,
    users: Vec<MemberDetails>,
}

fn parse_seed() -> anyhow::Result<SeedData> {
    serde_json::from_str(include_str!("../seed.json")).context("Failed to parse seed fixture")
}

/// Loads the demo catalog: a handful of books plus one member of each type.
pub async fn load_sample_data(registry: &dyn CatalogRegistry) -> anyhow::Result<()> {
    let seed = parse_seed()?;

    for book in seed.books {
        registry.add_book(book).await;
    }
    for user in seed.users {
        registry.register_user(user).await;
    }

    tracing::info!("sample data loaded");
    Ok(())
}
