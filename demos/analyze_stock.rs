use daytona::prelude::*;
use daytona::recipes::STOCK_ANALYSIS_CODE;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let recipe = Recipe::sandbox_runner();
    let client = recipe.client()?;

    println!("=== Preparing snapshot ===");
    let snapshot = recipe
        .ensure(&client, |line| println!("{}", line))
        .await?;

    println!("=== Starting sandbox from {} ===", snapshot.name);
    let sandbox = client
        .sandbox()
        .snapshot(&snapshot.name)
        .language("python")
        .auto_stop_interval(0)
        .timeout(0)
        .create()
        .await?;
    println!("Sandbox {} is running", sandbox.id());

    let execution = sandbox.run_code(STOCK_ANALYSIS_CODE).await?;
    println!("{}", execution);

    Ok(())
}
