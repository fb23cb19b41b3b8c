use anyhow::Result;
use trellis::cli::{App, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    let app = App::from_env();

    app.run(args).await?;

    Ok(())
}
