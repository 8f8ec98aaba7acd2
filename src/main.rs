#[tokio::main]
async fn main() -> anyhow::Result<()> {
    linewatch_lib::run().await
}
