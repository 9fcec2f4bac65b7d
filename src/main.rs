use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = signet_client::cli::run().await {
        let code = err.exit_code();
        eprintln!("Error: {:#}", anyhow::Error::new(err));
        std::process::exit(code);
    }
    Ok(())
}
