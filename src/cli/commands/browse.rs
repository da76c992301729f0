//! Browse command - list one page of a remote directory.

use crate::browser::DirectoryBrowser;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::remote::RcloneClient;
use crate::session::TokenStore;
use anyhow::Result;
use std::sync::Arc;

/// Render the page at `offset` of `path` (or the browse root) to the terminal.
pub async fn run_browse(path: Option<&str>, offset: usize, settings: Settings) -> Result<()> {
    preflight::check(Operation::Remote, &settings)?;

    let browser = DirectoryBrowser::new(
        Arc::new(RcloneClient::from_settings(&settings.remote)),
        Arc::new(TokenStore::new(settings.browser.token_capacity)),
        settings.browser.page_size,
    );
    let path = path.unwrap_or(&settings.remote.browse_root);

    let spinner = Output::spinner(&format!("Listing {}...", path));
    let result = browser.render(path, offset).await;
    spinner.finish_and_clear();

    Output::browse_view(&result?);
    Ok(())
}
