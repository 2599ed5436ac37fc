//! One-shot customer lookup from the command line.
//!
//! `customer-lookup [email] [--max-rounds N]` prints the answer and captured
//! tool results as JSON.

use agent_server::cli::LookupArgs;
use agent_server::{LookupService, init_tracing};
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = LookupArgs::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let service = LookupService::from_env()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let lookup = service.customer_lookup(&args.email, args.max_rounds, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&lookup)?);
    Ok(())
}
