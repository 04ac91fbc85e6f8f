#[tokio::main]
async fn main() -> anyhow::Result<()> {
    egress_relay_lib::run().await
}
