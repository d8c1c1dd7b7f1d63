//! JSON REST API for Parc.
//!
//! Exposes an axum [`Router`] backed by any [`parc_core::store::AssetStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", parc_api::api_router(store.clone()))
//! ```

pub mod assets;
pub mod error;
pub mod installations;
pub mod replacements;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use parc_core::store::AssetStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: AssetStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Installations
    .route(
      "/installations",
      get(installations::list::<S>).post(installations::create::<S>),
    )
    .route(
      "/installations/{id}",
      get(installations::get_one::<S>).delete(installations::delete_one::<S>),
    )
    .route("/installations/{id}/assets", get(installations::assets::<S>))
    .route("/installations/{id}/history", get(installations::history::<S>))
    // Assets
    .route("/assets", post(assets::create::<S>))
    .route(
      "/assets/{id}",
      get(assets::get_one::<S>).delete(assets::delete_one::<S>),
    )
    .route("/assets/{id}/history", get(assets::history::<S>))
    .route("/assets/{id}/replace", post(replacements::replace_one::<S>))
    .route(
      "/assets/{id}/deactivate",
      post(replacements::deactivate_one::<S>),
    )
    // Ledger
    .route("/ledger", get(replacements::ledger::<S>))
    .with_state(store)
}
