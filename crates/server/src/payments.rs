//! Entry fees through Stripe Checkout.
//!
//! `checkout` opens a hosted session and records a pending payment. The
//! webhook settles it once Stripe reports the outcome. Only signed webhook
//! calls are accepted.

use api_types::payment::{CheckoutRequest, CheckoutResponse, PaymentView};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use engine::{EngineError, competitions, users};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::{
    ServerError, config::StripeConfig, leaderboard::invalidate_standings, server::ServerState,
    views,
};

/// Seconds a webhook timestamp may drift from the local clock.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionList {
    data: Vec<CheckoutSession>,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: Value,
}

async fn create_checkout_session(
    http: &reqwest::Client,
    config: &StripeConfig,
    competition: &competitions::Model,
    user_id: &str,
) -> Result<CheckoutSession, ServerError> {
    let Some(secret_key) = config.secret_key.as_deref() else {
        return Err(ServerError::Generic("payments not configured".to_string()));
    };

    let currency = engine::PAYMENT_CURRENCY.to_lowercase();
    let amount = competition.entry_fee_minor.to_string();
    let product = format!("Entry fee: {}", competition.name);
    let form = [
        ("mode", "payment"),
        ("line_items[0][quantity]", "1"),
        ("line_items[0][price_data][currency]", currency.as_str()),
        ("line_items[0][price_data][unit_amount]", amount.as_str()),
        (
            "line_items[0][price_data][product_data][name]",
            product.as_str(),
        ),
        ("success_url", config.success_url.as_str()),
        ("cancel_url", config.cancel_url.as_str()),
        ("client_reference_id", user_id),
        ("metadata[competition_id]", competition.id.as_str()),
        ("metadata[user_id]", user_id),
        (
            "payment_intent_data[metadata][competition_id]",
            competition.id.as_str(),
        ),
        ("payment_intent_data[metadata][user_id]", user_id),
    ];

    let response = http
        .post(format!("{}/v1/checkout/sessions", config.base_url))
        .bearer_auth(secret_key)
        .form(&form)
        .send()
        .await
        .map_err(|err| ServerError::Upstream(format!("stripe request failed: {err}")))?;
    if !response.status().is_success() {
        return Err(ServerError::Upstream(format!(
            "stripe returned {}",
            response.status()
        )));
    }
    response
        .json::<CheckoutSession>()
        .await
        .map_err(|err| ServerError::Upstream(format!("invalid stripe response: {err}")))
}

/// Asks Stripe which checkout session created a payment intent.
async fn intent_checkout_session(
    http: &reqwest::Client,
    config: &StripeConfig,
    intent_id: &str,
) -> Result<Option<String>, ServerError> {
    let Some(secret_key) = config.secret_key.as_deref() else {
        return Ok(None);
    };
    let response = http
        .get(format!("{}/v1/checkout/sessions", config.base_url))
        .bearer_auth(secret_key)
        .query(&[("payment_intent", intent_id), ("limit", "1")])
        .send()
        .await
        .map_err(|err| ServerError::Upstream(format!("stripe request failed: {err}")))?;
    if !response.status().is_success() {
        return Err(ServerError::Upstream(format!(
            "stripe returned {}",
            response.status()
        )));
    }
    let list = response
        .json::<CheckoutSessionList>()
        .await
        .map_err(|err| ServerError::Upstream(format!("invalid stripe response: {err}")))?;
    Ok(list.data.into_iter().next().map(|session| session.id))
}

/// Checks a `Stripe-Signature` header of the form `t=...,v1=...` against
/// an HMAC-SHA256 of `"{t}.{payload}"`.
pub(crate) fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
) -> Result<(), ServerError> {
    let invalid = || ServerError::Unauthorized("invalid webhook signature".to_string());

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(invalid)?;
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(ServerError::Unauthorized(
            "webhook timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| invalid())?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.into_iter().any(|signature| {
        hex::decode(signature)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched { Ok(()) } else { Err(invalid()) }
}

/// The checkout session id a webhook object refers to. A payment intent is
/// looked up at Stripe first; if that fails its metadata is matched to the
/// user's single pending payment for the competition.
async fn session_id(
    state: &ServerState,
    kind: &str,
    object: &Value,
) -> Result<Option<String>, ServerError> {
    if kind.starts_with("checkout.session.") {
        return Ok(object
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string));
    }
    if let Some(intent_id) = object.get("id").and_then(Value::as_str) {
        match intent_checkout_session(&state.http, &state.config.stripe, intent_id).await {
            Ok(Some(session_id)) => return Ok(Some(session_id)),
            Ok(None) => {}
            Err(err) => tracing::warn!(intent_id, "checkout session lookup failed: {err:?}"),
        }
    }
    let Some((user_id, competition_id)) = intent_owner(object) else {
        return Ok(None);
    };
    Ok(state
        .engine
        .pending_payment_session(user_id, competition_id)
        .await?)
}

fn intent_owner(object: &Value) -> Option<(&str, &str)> {
    let metadata = object.get("metadata")?;
    let user_id = metadata.get("user_id")?.as_str()?;
    let competition_id = metadata.get("competition_id")?.as_str()?;
    Some((user_id, competition_id))
}

pub async fn checkout(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Option<Json<CheckoutRequest>>,
) -> Result<Json<CheckoutResponse>, ServerError> {
    let invite_code = payload.and_then(|Json(request)| request.invite_code);
    let competition = state
        .engine
        .entry_fee_due(&id, &user.id, invite_code.as_deref())
        .await?;

    let session =
        create_checkout_session(&state.http, &state.config.stripe, &competition, &user.id).await?;
    let checkout_url = session
        .url
        .ok_or_else(|| ServerError::Upstream("stripe session without url".to_string()))?;
    state
        .engine
        .create_payment(&user.id, &id, &session.id, competition.entry_fee_minor)
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        checkout_url,
    }))
}

pub async fn webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ServerError> {
    let Some(secret) = state.config.stripe.webhook_secret.as_deref() else {
        return Err(ServerError::Generic("payments not configured".to_string()));
    };
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServerError::Unauthorized("missing webhook signature".to_string()))?;
    verify_signature(secret, signature, &body, Utc::now().timestamp())?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|err| ServerError::Generic(format!("invalid webhook body: {err}")))?;
    let succeeded = match event.kind.as_str() {
        "checkout.session.completed" => true,
        "checkout.session.expired" | "payment_intent.payment_failed" => false,
        other => {
            tracing::debug!("ignoring webhook event {other}");
            return Ok(StatusCode::OK);
        }
    };
    let Some(session_id) = session_id(&state, &event.kind, &event.data.object).await? else {
        tracing::warn!("webhook {} without a session id", event.kind);
        return Ok(StatusCode::OK);
    };

    match state.engine.complete_payment(&session_id, succeeded).await {
        Ok(payment) => {
            if succeeded {
                invalidate_standings(&state, &payment.competition_id);
            }
            Ok(StatusCode::OK)
        }
        Err(EngineError::KeyNotFound(_)) => {
            tracing::warn!(%session_id, "webhook for unknown checkout session");
            Ok(StatusCode::OK)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<PaymentView>>, ServerError> {
    let payments = state
        .engine
        .user_payments(&user.id)
        .await?
        .into_iter()
        .map(views::payment)
        .collect::<Result<_, _>>()?;
    Ok(Json(payments))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let header = sign("whsec", 1_700_000_000, body);
        assert!(verify_signature("whsec", &header, body, 1_700_000_010).is_ok());
    }

    #[test]
    fn accepts_any_matching_v1() {
        let body = b"{}";
        let valid = sign("whsec", 100, body);
        let header = format!("t=100,v1=00ff,{}", valid.trim_start_matches("t=100,"));
        assert!(verify_signature("whsec", &header, body, 100).is_ok());
    }

    #[test]
    fn rejects_wrong_secret_or_body() {
        let body = b"{}";
        let header = sign("whsec", 100, body);
        assert!(verify_signature("other", &header, body, 100).is_err());
        assert!(verify_signature("whsec", &header, b"{\"x\":1}", 100).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let body = b"{}";
        let header = sign("whsec", 100, body);
        assert!(verify_signature("whsec", &header, body, 100 + 301).is_err());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(verify_signature("whsec", "garbage", b"{}", 0).is_err());
        assert!(verify_signature("whsec", "t=0,v1=zz", b"{}", 0).is_err());
    }

    #[test]
    fn intent_owner_reads_metadata() {
        let intent = json!({
            "id": "pi_1",
            "metadata": { "user_id": "u1", "competition_id": "c1" }
        });
        assert_eq!(intent_owner(&intent), Some(("u1", "c1")));
        assert_eq!(intent_owner(&json!({ "id": "pi_2" })), None);
        assert_eq!(intent_owner(&json!({ "metadata": { "user_id": "u1" } })), None);
    }
}
