//! Wallpaper mirror CLI
//!
//! Mirrors the wallpaper catalog into `output/<collection>/<asset_id>.<ext>`.

#[cfg(feature = "cli")]
use wallpaper_mirror::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
