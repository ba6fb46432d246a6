// src/main.rs

use orgseq::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("orgseq error: {err:#}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let level = logging::resolve_level(args.log_level);
    logging::init_logging(level)?;
    run(args, level).await
}
