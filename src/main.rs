use rask_loki_handler::app;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    app::main().await
}
