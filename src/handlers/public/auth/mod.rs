// handlers/public/auth/mod.rs - Passwordless (magic link) sign-in
//
// Both endpoints are anonymous: the link itself is the credential.

use axum::Json;
use serde_json::{json, Value};

pub mod request_link; // POST /request-magic-link - issue and email a link
pub mod utils;
pub mod verify_link; // GET /verify-magic-link - check a link, optionally redirect

pub use request_link::request_magic_link;
pub use verify_link::verify_magic_link;

/// GET / under the magic-link prefix
pub async fn magic_link_health() -> Json<Value> {
    Json(json!({ "ok": true, "service": "magic-link" }))
}
