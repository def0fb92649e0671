//! Starts a server whose connectors do not fit in its pool, then fixes the plan.
//!
//! ```text
//! RUST_LOG=debug cargo run --example insufficient_threads
//! ```

use std::sync::Arc;

use threadvisor::{
    BoundedPool, Connector, Lifecycle, LogWriter, Server, ServerConfig, Subscribe,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let cfg = ServerConfig {
        low_headroom: 2,
        ..ServerConfig::default()
    };

    let crowded = Server::builder(BoundedPool::arc("crowded", 4)?)
        .with_name("crowded")
        .with_config(cfg.clone())
        .with_subscribers(subs.clone())
        .build();
    crowded.add_connector(Connector::builder("http").build()?)?;
    crowded.add_connector(Connector::builder("https").build()?)?;

    if let Err(e) = crowded.start().await {
        println!("[{}] {}", e.as_label(), e.as_message());
    }
    println!("demand after failed start: {}", crowded.demand());
    crowded.shutdown().await?;

    let roomy = Server::builder(BoundedPool::arc("roomy", 8)?)
        .with_name("roomy")
        .with_config(cfg)
        .with_subscribers(subs)
        .build();
    roomy.add_connector(Connector::builder("http").build()?)?;
    roomy.add_connector(
        Connector::builder("https")
            .acceptors(2)
            .selectors(4)
            .executor(BoundedPool::arc("tls", 16)?)
            .build()?,
    )?;

    roomy.start().await?;
    println!("demand while running: {}", roomy.demand());
    roomy.shutdown().await?;
    Ok(())
}
