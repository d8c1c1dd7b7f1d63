//! HTTP server assembly for Parc.
//!
//! Mounts the JSON API under `/api`, adds request tracing, and exposes a
//! liveness probe. The binary in `main.rs` owns configuration loading and
//! the tokio runtime.

use std::{path::PathBuf, sync::Arc};

use axum::{Router, http::StatusCode, routing::get};
use parc_core::store::AssetStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application [`Router`] over `store`.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: AssetStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/health", get(|| async { StatusCode::NO_CONTENT }))
    .nest("/api", parc_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
  };
  use parc_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::router;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    router(Arc::new(store))
  }

  async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = app
      .clone()
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();

    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn license_installation_body() -> Value {
    json!({
      "name": "Licence PC-01",
      "organization": null,
      "client": "Cabinet Durand",
      "site": "Lyon",
      "invoice_number": "F-2024-031",
      "invoice_date": "2024-03-01",
      "kind": "license",
      "placement": { "position": "PC-01", "user": "alice" }
    })
  }

  fn seat_body(installation_id: &str) -> Value {
    json!({
      "installation_id": installation_id,
      "detail": {
        "type": "license_seat",
        "data": { "license_type": "office-suite", "description": null }
      }
    })
  }

  /// Create an installation plus one license seat; returns both ids.
  async fn license_fixture(app: &Router) -> (String, String) {
    let (status, installation) =
      request(app, "POST", "/api/installations", Some(license_installation_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let installation_id =
      installation["installation_id"].as_str().unwrap().to_owned();

    let (status, asset) =
      request(app, "POST", "/api/assets", Some(seat_body(&installation_id)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let asset_id = asset["asset_id"].as_str().unwrap().to_owned();

    (installation_id, asset_id)
  }

  #[tokio::test]
  async fn health_returns_204() {
    let app = app().await;
    let (status, _) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }

  #[tokio::test]
  async fn create_and_fetch_installation() {
    let app = app().await;
    let (installation_id, _) = license_fixture(&app).await;

    let (status, fetched) = request(
      &app,
      "GET",
      &format!("/api/installations/{installation_id}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["kind"], "license");
    assert_eq!(fetched["placement"]["position"], "PC-01");
  }

  #[tokio::test]
  async fn missing_installation_returns_404_with_kind() {
    let app = app().await;
    let (status, body) = request(
      &app,
      "GET",
      "/api/installations/00000000-0000-0000-0000-000000000000",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
  }

  #[tokio::test]
  async fn creating_an_asset_under_a_missing_installation_returns_404() {
    let app = app().await;
    let (status, body) = request(
      &app,
      "POST",
      "/api/assets",
      Some(seat_body("00000000-0000-0000-0000-000000000000")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
  }

  #[tokio::test]
  async fn replacement_over_http_appends_history() {
    let app = app().await;
    let (installation_id, asset_id) = license_fixture(&app).await;

    let (status, outcome) = request(
      &app,
      "POST",
      &format!("/api/assets/{asset_id}/replace"),
      Some(json!({ "change_position": true, "new_position": "PC-02" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["asset"]["status"], "replaced");
    assert_eq!(outcome["installation"]["placement"]["position"], "PC-02");
    assert_eq!(
      outcome["event"]["predecessor_fields"]["position"],
      "PC-01"
    );

    let (status, history) = request(
      &app,
      "GET",
      &format!("/api/installations/{installation_id}/history"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn replacing_a_deactivated_seat_returns_400_terminal_state() {
    let app = app().await;
    let (_installation_id, asset_id) = license_fixture(&app).await;

    let (status, asset) = request(
      &app,
      "POST",
      &format!("/api/assets/{asset_id}/deactivate"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["status"], "inactive");

    let (status, body) = request(
      &app,
      "POST",
      &format!("/api/assets/{asset_id}/replace"),
      Some(json!({ "change_position": true, "new_position": "PC-02" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "terminal_state");
  }

  #[tokio::test]
  async fn empty_replace_body_returns_400_no_op() {
    let app = app().await;
    let (_installation_id, asset_id) = license_fixture(&app).await;

    let (status, body) = request(
      &app,
      "POST",
      &format!("/api/assets/{asset_id}/replace"),
      Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "no_op");
  }

  #[tokio::test]
  async fn deleting_a_referenced_installation_returns_409() {
    let app = app().await;
    let (installation_id, _asset_id) = license_fixture(&app).await;

    let (status, body) = request(
      &app,
      "DELETE",
      &format!("/api/installations/{installation_id}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
  }

  #[tokio::test]
  async fn ledger_requires_exactly_one_filter() {
    let app = app().await;
    let (status, body) = request(&app, "GET", "/api/ledger", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");

    let (installation_id, _asset_id) = license_fixture(&app).await;
    let (status, events) = request(
      &app,
      "GET",
      &format!("/api/ledger?installation_id={installation_id}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(events.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn equipment_replacement_over_http() {
    let app = app().await;

    let (status, installation) = request(
      &app,
      "POST",
      "/api/installations",
      Some(json!({
        "name": "Parc atelier",
        "organization": "Groupe Nord",
        "client": "Garage Petit",
        "site": "Lille",
        "invoice_number": "F-2024-044",
        "invoice_date": "2024-03-01",
        "kind": "equipment",
        "placement": null
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let installation_id =
      installation["installation_id"].as_str().unwrap().to_owned();

    let (status, unit) = request(
      &app,
      "POST",
      "/api/assets",
      Some(json!({
        "installation_id": installation_id,
        "detail": {
          "type": "equipment_unit",
          "data": {
            "brand": "Brother",
            "model": "HL-1430",
            "serial_number": "SN-1",
            "unit_type": "printer",
            "installed_on": "2024-03-01"
          }
        }
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let unit_id = unit["asset_id"].as_str().unwrap().to_owned();

    let (status, outcome) = request(
      &app,
      "POST",
      &format!("/api/assets/{unit_id}/replace"),
      Some(json!({
        "successor_unit": {
          "brand": "Brother",
          "model": "HL-1430",
          "serial_number": "SN-2",
          "unit_type": "printer",
          "installed_on": "2024-06-01"
        },
        "reason": "unit failed"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["asset"]["status"], "active");
    assert_eq!(outcome["predecessor"]["status"], "replaced");
    assert_ne!(outcome["asset"]["asset_id"], outcome["predecessor"]["asset_id"]);

    let (status, assets) = request(
      &app,
      "GET",
      &format!("/api/installations/{installation_id}/assets"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assets.as_array().unwrap().len(), 2);
  }
}
