use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::error::{ApiError, ErrorCode};
use shared::money::Money;
use shared::order::{ItemInput, Order, OrderType, SeatView, SplitStrategy};

use crate::core::ServerState;
use crate::orders::{MovedItem, Mutated, OrderGraph};
use crate::payments::AuthOutcome;
use crate::utils::{AppError, AppResult};

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenTableRequest {
    #[serde(default)]
    pub table_id: Option<String>,
    pub employee_id: String,
    pub guest_count: u32,
    #[serde(default)]
    pub order_type: OrderType,
}

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<ItemInput>,
    pub expected_version: u64,
}

/// Body for mutations that only carry the optimistic-lock counter
#[derive(Debug, Deserialize)]
pub struct VersionedRequest {
    pub expected_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    #[serde(flatten)]
    pub strategy: SplitStrategy,
    pub expected_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub source_id: String,
    pub target_id: String,
    /// Version of the target order
    pub expected_version: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatAction {
    Insert,
    Remove,
}

#[derive(Debug, Deserialize)]
pub struct SeatMutationRequest {
    pub action: SeatAction,
    pub position: u32,
    pub expected_seat_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub method: String,
    pub expected_version: u64,
}

/// Every successful mutation answers with the fresh counters plus the
/// split tree the order belongs to, so clients can re-render in one trip.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub order_id: String,
    pub version: u64,
    pub seat_version: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub moved_items: Vec<MovedItem>,
    pub graph: OrderGraph,
}

fn respond(state: &ServerState, mutated: Mutated) -> AppResult<Json<MutationResponse>> {
    let graph = state.orders.order_graph(&mutated.order_id)?;
    Ok(Json(MutationResponse {
        order_id: mutated.order_id,
        version: mutated.version,
        seat_version: mutated.seat_version,
        moved_items: mutated.moved_items,
        graph,
    }))
}

// ============================================================================
// Lifecycle
// ============================================================================

pub async fn open_table(
    State(state): State<ServerState>,
    Json(req): Json<OpenTableRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated =
        state
            .orders
            .open_table(req.table_id, req.employee_id, req.guest_count, req.order_type)?;
    respond(&state, mutated)
}

pub async fn list_active(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.active_orders()?))
}

pub async fn get_graph(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<OrderGraph>> {
    Ok(Json(state.orders.order_graph(&id)?))
}

pub async fn void_order(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<VersionedRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state.orders.void_order(&id, req.expected_version)?;
    respond(&state, mutated)
}

// ============================================================================
// Items
// ============================================================================

pub async fn add_items(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<AddItemsRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state.orders.add_items(&id, req.items, req.expected_version)?;
    respond(&state, mutated)
}

pub async fn void_item(
    State(state): State<ServerState>,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<VersionedRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state.orders.void_item(&id, &item_id, req.expected_version)?;
    respond(&state, mutated)
}

pub async fn comp_item(
    State(state): State<ServerState>,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<VersionedRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state.orders.comp_item(&id, &item_id, req.expected_version)?;
    respond(&state, mutated)
}

// ============================================================================
// Splitting and merging
// ============================================================================

pub async fn split(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<SplitRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state.orders.split(&id, &req.strategy, req.expected_version)?;
    respond(&state, mutated)
}

pub async fn create_check(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<VersionedRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state.orders.create_check(&id, req.expected_version)?;
    respond(&state, mutated)
}

pub async fn delete_check(
    State(state): State<ServerState>,
    Path((_id, child_id)): Path<(String, String)>,
    Json(req): Json<VersionedRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state.orders.delete_check(&child_id, req.expected_version)?;
    respond(&state, mutated)
}

pub async fn merge_all(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<VersionedRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state.orders.merge_all(&id, req.expected_version)?;
    respond(&state, mutated)
}

pub async fn merge(
    State(state): State<ServerState>,
    Json(req): Json<MergeRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = state
        .orders
        .merge(&req.source_id, &req.target_id, req.expected_version)?;
    respond(&state, mutated)
}

// ============================================================================
// Seats
// ============================================================================

pub async fn mutate_seats(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<SeatMutationRequest>,
) -> AppResult<Json<MutationResponse>> {
    let mutated = match req.action {
        SeatAction::Insert => {
            state
                .orders
                .insert_seat(&id, req.position, req.expected_seat_version)?
        }
        SeatAction::Remove => {
            state
                .orders
                .remove_seat(&id, req.position, req.expected_seat_version)?
        }
    };
    respond(&state, mutated)
}

pub async fn seat_views(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<SeatView>>> {
    Ok(Json(state.orders.seat_views(&id)?))
}

// ============================================================================
// Payments
// ============================================================================

/// Authorize with the processor before the transaction, record inside it,
/// capture after commit. A decline never touches the order.
pub async fn record_payment(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> AppResult<Json<MutationResponse>> {
    let auth_ref = match state.payments.authorize(&id, req.amount).await {
        AuthOutcome::Approved { auth_ref } => auth_ref,
        AuthOutcome::Declined { reason } => {
            tracing::warn!(order_id = %id, %reason, "Payment declined");
            return Err(AppError(ApiError::new(ErrorCode::PaymentDeclined, reason)));
        }
    };

    match state.orders.record_payment(
        &id,
        req.amount,
        req.method,
        Some(auth_ref.clone()),
        req.expected_version,
    ) {
        Ok(mutated) => {
            if !state.payments.capture(&auth_ref).await {
                tracing::error!(order_id = %id, %auth_ref, "Capture failed after commit");
            }
            respond(&state, mutated)
        }
        Err(err) => {
            // The money was never recorded; release the hold
            if !state.payments.void(&auth_ref).await {
                tracing::warn!(order_id = %id, %auth_ref, "Failed to void authorization");
            }
            Err(err.into())
        }
    }
}
