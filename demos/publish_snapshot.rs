use daytona::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let recipe = Recipe::analysis();
    let client = recipe.client()?;

    let now = chrono::Utc::now();
    println!("=== Creating Image: {} ===", recipe.snapshot_name(now));
    let snapshot = recipe
        .publish_at(&client, now, |line| println!("{}", line))
        .await?;

    println!("=== Snapshot ready: {} ===", snapshot.name);
    Ok(())
}
