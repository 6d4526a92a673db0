pub mod activity;
pub mod category;
pub mod export;
pub mod import;
pub mod item;
pub mod price;
pub mod search;
pub mod status;

use anyhow::Result;
use tracing::debug;

use crate::cli::StoreArgs;
use crate::store::{CatalogStore, Session};
use crate::util::ensure_directory;

pub(crate) fn open_store(args: &StoreArgs) -> Result<CatalogStore> {
    ensure_directory(&args.store_root)?;
    CatalogStore::open(&args.resolved_db_path())
}

pub(crate) fn open_session(store: &CatalogStore, args: &StoreArgs) -> Result<Session> {
    let session = match &args.session_token {
        Some(token) => store.resume_session(token)?,
        None => store.open_session(&args.actor)?,
    };
    debug!(token = %session.token, actor = %session.actor, "session context established");
    Ok(session)
}
