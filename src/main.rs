#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stock_ledger::server::run().await
}
