mod cli;

use clap::Parser;
use tracing::info;

use ardan_crypto::KeyPair;
use ardan_node::{logging, Node, NodeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args = cli::Cli::parse();

    if let Some(cli::Commands::GenerateKey { name, out }) = args.command {
        let path = out.join(format!("{name}.ecdsa"));
        let keypair = KeyPair::random();
        keypair.write_to_file(&path)?;
        info!(account = %keypair.account_id(), path = %path.display(), "key generated");
        return Ok(());
    }

    info!(config = %args.config.display(), "loading config");
    let config = NodeConfig::load(&args.config)?;

    let node = Node::new(config).await?;
    node.run().await
}
