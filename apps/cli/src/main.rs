use pricevault_cli::config::Config;
use pricevault_cli::{init_tracing, render_report, render_summaries, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let outcome = run(&config).await?;
    println!("{}", render_report(&outcome.report));
    println!();
    println!("{}", render_summaries(&outcome.summaries));
    Ok(())
}
