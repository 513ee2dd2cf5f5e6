use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = kwt_worker::Args::parse();

	kwt_worker::run(args).await
}
