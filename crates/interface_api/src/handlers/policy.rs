//! Policy lifecycle handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::PolicyId;
use domain_fulfillment::PaymentOutcome;

use crate::dto::{
    HistoryEntry, HistoryResponse, PaymentNotificationDto, PaymentNotificationResponse,
    PurchaseRequestDto, PurchaseResponse, QuoteRequestDto, QuoteResponse, RefundRequestDto,
    StateResponse,
};
use crate::error::ApiError;
use crate::AppState;

fn validated<T: Validate>(dto: T) -> Result<T, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(dto)
}

/// Prices a trip
pub async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequestDto>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let request = validated(request)?.into_domain();
    let quote = state.lifecycle.quote(&request).await?;
    Ok(Json(QuoteResponse::from_price(quote.price)))
}

/// Purchases a policy and opens its checkout session
pub async fn purchase(
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequestDto>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let request = validated(request)?.into_domain()?;
    let receipt = state.lifecycle.purchase(request).await?;
    Ok(Json(receipt.into()))
}

/// Checkout-completed webhook; deliveries may repeat
pub async fn payment_notification(
    State(state): State<AppState>,
    Json(notification): Json<PaymentNotificationDto>,
) -> Result<Json<PaymentNotificationResponse>, ApiError> {
    let notification = validated(notification)?;
    let amount = notification.amount()?;

    let outcome = state
        .lifecycle
        .record_payment(
            PolicyId::from(notification.policy_id),
            &notification.checkout_session_id,
            &notification.payment_intent_id,
            amount,
        )
        .await?;

    Ok(Json(PaymentNotificationResponse {
        outcome: match outcome {
            PaymentOutcome::Recorded => "recorded",
            PaymentOutcome::AlreadyRecorded => "already_recorded",
        },
    }))
}

/// Returns the policy's derived current state
pub async fn get_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StateResponse>, ApiError> {
    let policy_id = PolicyId::from(id);
    let current = state
        .lifecycle
        .current_state(policy_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no lifecycle recorded for {policy_id}")))?;

    Ok(Json(StateResponse {
        policy_id: id,
        state: current,
    }))
}

/// Returns the policy's full state history
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let entries = state.lifecycle.history(PolicyId::from(id)).await?;
    Ok(Json(HistoryResponse {
        policy_id: id,
        entries: entries.into_iter().map(HistoryEntry::from).collect(),
    }))
}

/// Operator retry of a failed policy's fulfillment
pub async fn retry_fulfillment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.lifecycle.retry_fulfillment(PolicyId::from(id)).await?;
    Ok(Json(serde_json::json!({ "dispatched": true })))
}

/// Operator-initiated refund
pub async fn initiate_refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RefundRequestDto>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = validated(request)?;
    state
        .lifecycle
        .initiate_refund(PolicyId::from(id), &request.reason, &request.initiated_by)
        .await?;
    Ok(Json(serde_json::json!({ "initiated": true })))
}
