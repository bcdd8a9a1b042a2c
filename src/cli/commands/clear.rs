//! Clear command - remove every cached package

use crate::error::TrymodResult;
use crate::package::CacheDir;
use crate::ui::{self, UiContext};
use tracing::info;

/// Execute the clear command
pub async fn execute(cache: &CacheDir, ctx: &UiContext) -> TrymodResult<()> {
    info!("Clearing {}", cache.modules_dir().display());
    cache.clear().await?;
    ui::outro_success(ctx, "Cache successfully cleared!");
    Ok(())
}
