use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = kwt_api::Args::parse();

	kwt_api::run(args).await
}
