//! event-certs server binary

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    event_certs::server::run().await
}
