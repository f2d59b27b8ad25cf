use clap::Parser;

use keel_search::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	keel_search::run(args).await
}
