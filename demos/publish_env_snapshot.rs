use daytona::prelude::*;
use tracing_subscriber::EnvFilter;

// Reads DAYTONA_API_KEY (and optionally DAYTONA_API_URL / DAYTONA_TARGET)
// from the environment or a .env file.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let recipe = Recipe::env_keyed();
    let client = recipe.client()?;
    println!("Using API at {}", client.config().api_url);

    let snapshot = recipe
        .publish(&client, |line| println!("{}", line))
        .await?;

    println!("=== Snapshot ready: {} ===", snapshot.name);
    Ok(())
}
