use daytona::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let recipe = Recipe::gpu();
    let client = recipe.client()?;

    println!("=== Creating GPU image ===");
    let snapshot = recipe
        .publish(&client, |line| println!("{}", line))
        .await?;

    println!(
        "=== Snapshot ready: {} ({} CPU, {} GPU, {} GB RAM, {} GB disk) ===",
        snapshot.name, snapshot.cpu, snapshot.gpu, snapshot.mem, snapshot.disk
    );
    Ok(())
}
