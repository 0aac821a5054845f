use anyhow::Result;
use sitetally::cli::run_cli;
use tracing::error;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_cli()).inspect_err(|e| {
        error!("Error running cli {e:?}");
    });
    // `serve` may leave a read on stdin behind.
    runtime.shutdown_background();
    result
}
