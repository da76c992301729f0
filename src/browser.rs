//! Remote directory browser.
//!
//! Renders one page of a remote directory as a set of buttons. Every button
//! carries a token from the [`TokenStore`]; directory listings are fetched
//! fresh on every render.

use crate::error::Result;
use crate::remote::{self, DirectoryEntry, RemoteStorage};
use crate::session::{Intent, TokenStore};
use crate::transport::{Choice, ChoiceRows};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of entries per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A directory entry shown in a view, with the token its button sends back.
#[derive(Debug, Clone)]
pub struct ViewItem {
    pub entry: DirectoryEntry,
    pub token: String,
}

/// One rendered page of a remote directory.
#[derive(Debug, Clone)]
pub struct BrowseView {
    pub remote_path: String,
    pub page_offset: usize,
    pub page_size: usize,
    /// Number of entries in the whole directory.
    pub total_entries: usize,
    pub items: Vec<ViewItem>,
    pub up: Option<String>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl BrowseView {
    /// Message text shown above the buttons.
    pub fn title(&self) -> String {
        let location = if remote::is_root(&self.remote_path) {
            "/".to_string()
        } else {
            format!("/{}", self.remote_path)
        };

        if self.total_entries == 0 {
            return format!("📂 {} (empty)", location);
        }
        if self.items.is_empty() {
            return format!("📂 {} (no entries past {})", location, self.total_entries);
        }
        let first = self.page_offset.saturating_add(1);
        let last = self.page_offset.saturating_add(self.items.len());
        format!("📂 {} ({}-{} of {})", location, first, last, self.total_entries)
    }

    /// Button rows: one per entry, then previous/next, then up.
    pub fn rows(&self) -> ChoiceRows {
        let mut rows: ChoiceRows = self
            .items
            .iter()
            .map(|item| vec![Choice::new(entry_label(&item.entry), item.token.clone())])
            .collect();

        let mut nav = Vec::new();
        if let Some(token) = &self.previous {
            nav.push(Choice::new("◀ Prev", token.clone()));
        }
        if let Some(token) = &self.next {
            nav.push(Choice::new("Next ▶", token.clone()));
        }
        if !nav.is_empty() {
            rows.push(nav);
        }

        if let Some(token) = &self.up {
            rows.push(vec![Choice::new("⬆ Up", token.clone())]);
        }
        rows
    }
}

fn entry_label(entry: &DirectoryEntry) -> String {
    if entry.is_directory {
        format!("📁 {}", entry.name)
    } else {
        format!("🎬 {}", entry.name)
    }
}

/// Turns remote paths into navigable views.
pub struct DirectoryBrowser {
    storage: Arc<dyn RemoteStorage>,
    tokens: Arc<TokenStore>,
    page_size: usize,
}

impl DirectoryBrowser {
    pub fn new(storage: Arc<dyn RemoteStorage>, tokens: Arc<TokenStore>, page_size: usize) -> Self {
        Self {
            storage,
            tokens,
            page_size: page_size.max(1),
        }
    }

    /// List `path` and render the page starting at `offset`.
    ///
    /// Tokens are only issued once the listing has succeeded.
    #[instrument(skip(self))]
    pub async fn render(&self, path: &str, offset: usize) -> Result<BrowseView> {
        let path = remote::normalize(path);
        let entries = self.storage.list(&path).await?;
        let total = entries.len();

        let items: Vec<ViewItem> = entries
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .map(|entry| {
                let target = remote::join(&path, &entry.name);
                let intent = if entry.is_directory {
                    Intent::Navigate { path: target }
                } else {
                    Intent::Process { path: target }
                };
                ViewItem {
                    token: self.tokens.create(intent),
                    entry,
                }
            })
            .collect();

        let previous = (offset > 0).then(|| {
            self.tokens.create(Intent::Paginate {
                path: path.clone(),
                offset: offset.saturating_sub(self.page_size),
            })
        });
        let next_offset = offset.saturating_add(self.page_size);
        let next = (next_offset < total).then(|| {
            self.tokens.create(Intent::Paginate {
                path: path.clone(),
                offset: next_offset,
            })
        });
        let up = (!remote::is_root(&path)).then(|| {
            self.tokens.create(Intent::Navigate {
                path: remote::parent(&path),
            })
        });

        debug!("Rendered {} of {} entries at offset {}", items.len(), total, offset);

        Ok(BrowseView {
            remote_path: path,
            page_offset: offset,
            page_size: self.page_size,
            total_entries: total,
            items,
            up,
            previous,
            next,
        })
    }
}
