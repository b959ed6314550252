#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agentflow::run().await
}
