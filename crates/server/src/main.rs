use anyhow::Result;
use barometer_server::ServeOptions;

#[tokio::main]
async fn main() -> Result<()> {
    barometer_server::run(ServeOptions::default()).await
}
