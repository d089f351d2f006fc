use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use catalogservice_registry::catalog_registry::{CatalogRegistry, InMemoryCatalogRegistry};

use crate::console::CatalogConsole;

mod console;
mod seed;

fn init_telemetry() {
    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    // Logs go to stderr so they do not interleave with the menu on stdout
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();

    let registry: Arc<dyn CatalogRegistry> = Arc::new(InMemoryCatalogRegistry::new());

    let skip_seed = env::var("CATALOG_SKIP_SEED")
        .map(|value| value.to_lowercase() == "true")
        .unwrap_or_default();
    if !skip_seed {
        seed::load_sample_data(registry.as_ref()).await?;
        println!("Sample data loaded successfully!");
    }

    CatalogConsole::new(registry).run().await
}
