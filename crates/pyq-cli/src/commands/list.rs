//! Module for `--list-only`: enumerating the remote tree without classifying anything.

use pyq::{crawl::inventory, fetcher::Fetcher, persist::JsonSink};

use super::*;

/// File name of the inventory dumped in test mode.
pub const INVENTORY_FILE: &str = "inventory.json";

/// Function for `--list-only` in the CLI.
///
/// In test mode the inventory is also written to the output directory.
pub async fn list(cli: &Cli, config: &Config) -> Result<()> {
  let fetcher = Fetcher::new(config)?;
  let start = cli.start(config);
  let entries = inventory(&fetcher, start).await;
  reply(ResponseContent::Inventory(&entries));

  if cli.test {
    let path = JsonSink::new(&config.output_dir).write(INVENTORY_FILE, &entries).await?;
    reply(ResponseContent::Success(&format!("Inventory written to {}", path.display())));
  }
  Ok(())
}
