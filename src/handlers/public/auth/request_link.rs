use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::{first_given, first_present};
use crate::auth::token_preview;
use crate::error::ApiError;
use crate::state::AppState;

/// Accepted both as urlencoded form fields and as query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct MagicLinkRequest {
    #[serde(alias = "email_form")]
    pub email: Option<String>,
    pub next: Option<String>,
}

/// POST /request-magic-link - Email a sign-in link
///
/// `email` is required, from the form body or the query string (form wins).
/// `next` is the page the user lands on after verification; when absent the
/// configured frontend "verified" page is used.
///
/// Expected Output (Success):
/// ```json
/// { "message": "Magic link sent to ada@example.com", "success": true }
/// ```
pub async fn request_magic_link(
    State(state): State<AppState>,
    query: Result<Query<MagicLinkRequest>, QueryRejection>,
    form: Option<Form<MagicLinkRequest>>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let form = form.map(|Form(f)| f).unwrap_or_default();

    let Some(email) = first_present(&[form.email.as_ref(), query.email.as_ref()]) else {
        tracing::warn!("Magic link requested without an email");
        return Err(ApiError::missing_field(
            "email",
            "Provide email as form field 'email' or query param 'email'",
        ));
    };
    let next = first_given(&[form.next.as_ref(), query.next.as_ref()]);

    tracing::info!("Creating magic link for email: {}", email);
    let token = state.tokens.issue(&email)?;

    let link = state.dispatcher.verification_url(&token, next.as_deref());
    tracing::info!(
        token = %token_preview(&token),
        "Magic link created for {}",
        email
    );

    state.dispatcher.dispatch(&email, &link).await.map_err(|e| {
        tracing::error!("Failed to send email to {}: {}", email, e);
        e
    })?;
    tracing::info!("Magic link sent to {}", email);

    Ok(Json(json!({
        "message": format!("Magic link sent to {}", email),
        "success": true
    })))
}
