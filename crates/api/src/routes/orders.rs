//! Order endpoints: goods checkout, status changes, listings and search.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::AggregateId;
use domain::{
    LineItem, Money, OrderNumber, OrderStatus, PaymentDetails, PlaceGoodsOrder, ProviderDirectory,
    ShippingAddress, UpdateOrderStatus,
};
use event_store::EventStore;
use projections::{OrderQuery, OrderSummary, Pagination};
use serde::{Deserialize, Serialize};

use super::resolve_order_id;
use crate::directory::UserDirectory;
use crate::error::ApiError;
use crate::extract::{ApiJson, AuthUser};
use crate::response::ApiResponse;
use crate::state::AppState;

const UNKNOWN_USER: &str = "Unknown User";
const NO_EMAIL: &str = "No Email";

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub payment_details: PaymentDetails,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: String,
    pub name: String,
    /// Unit price in minor currency units.
    pub price: i64,
    pub quantity: u32,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub note: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderNumber,
    pub status: OrderStatus,
}

#[derive(Serialize)]
pub struct OrderCreatedBody {
    pub order: OrderCreated,
}

#[derive(Serialize)]
pub struct OrderBody {
    pub order: OrderSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub order_id: OrderNumber,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
}

#[derive(Serialize)]
pub struct OrdersBody<T> {
    pub orders: Vec<T>,
}

/// An order with its owner's display fields, for admin listings.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithUser {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub user_name: String,
    pub user_email: String,
}

#[derive(Serialize)]
pub struct SearchBody {
    pub orders: Vec<OrderWithUser>,
    pub pagination: Pagination,
}

// -- Handlers --

/// POST /orders: place a goods order for the caller.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderCreatedBody>>), ApiError> {
    let items = req
        .items
        .into_iter()
        .map(|item| {
            let line = LineItem::new(
                item.product_id,
                item.name,
                Money::from_minor(item.price),
                item.quantity,
            );
            match item.image {
                Some(image) => line.with_image(image),
                None => line,
            }
        })
        .collect();

    let cmd = PlaceGoodsOrder::new(user.0, items)
        .with_payment(req.payment_details)
        .with_shipping_address(req.shipping_address);
    let result = state.orders.place_goods_order(cmd).await?;

    let order = &result.aggregate;
    let (Some(order_id), Some(status)) = (order.order_number(), order.status()) else {
        return Err(ApiError::Internal(
            "placed order has no number or status".to_string(),
        ));
    };

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            "Order placed successfully",
            OrderCreatedBody {
                order: OrderCreated { order_id, status },
            },
        ),
    ))
}

/// PUT /orders/{id}/status: move an order along its status machine.
#[tracing::instrument(skip(state, user, req), fields(actor = %user.0))]
pub async fn update_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<OrderBody>>, ApiError> {
    let Some(status) = req.status.filter(|s| !s.trim().is_empty()) else {
        return Err(ApiError::BadRequest("Status is required".to_string()));
    };
    let order_id = parse_order_id(&id)?;

    let mut cmd = UpdateOrderStatus::new(order_id, status, user.0);
    if let Some(note) = req.note {
        cmd = cmd.with_note(note);
    }
    let result = state.orders.update_status(cmd).await?;

    let order = OrderSummary::from_order(&result.aggregate)
        .ok_or_else(|| ApiError::Internal(format!("order {order_id} has no summary")))?;
    Ok(ApiResponse::ok(
        "Order status updated successfully",
        OrderBody { order },
    ))
}

/// GET /orders/{id}/status: current status, read from the order's stream.
#[tracing::instrument(skip(state))]
pub async fn status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<StatusBody>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orders
        .get_order(order_id)
        .await?
        .ok_or_else(order_not_found)?;

    let (Some(number), Some(status)) = (order.order_number(), order.status()) else {
        return Err(order_not_found());
    };
    Ok(ApiResponse::ok(
        "Order status fetched",
        StatusBody {
            order_id: number,
            status,
            progress_percentage: order.progress_percentage(),
        },
    ))
}

/// GET /orders/history: the caller's orders of both kinds, newest first.
///
/// Booking orders show the provider's current profile when the directory
/// still has it, otherwise the snapshot taken at booking time.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0))]
pub async fn history<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<OrdersBody<OrderSummary>>>, ApiError> {
    state.catch_up().await?;

    let mut orders = state.order_book.history_for_user(&user.0).await;
    for order in &mut orders {
        if let Some(booking) = order.booking.as_mut()
            && let Some(provider) = state.providers.find(&booking.slot.provider_id).await
        {
            booking.provider = provider;
        }
    }

    Ok(ApiResponse::ok(
        "Order history fetched",
        OrdersBody { orders },
    ))
}

/// GET /orders: every order, newest first, with owner details.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ApiResponse<OrdersBody<OrderWithUser>>>, ApiError> {
    // Run catch-up to ensure the read model includes latest events
    state.catch_up().await?;

    let orders = with_users(&state, state.order_book.all().await).await;
    Ok(ApiResponse::ok("Orders fetched", OrdersBody { orders }))
}

/// GET /orders/search: filtered, paginated listing.
#[tracing::instrument(skip(state, query))]
pub async fn search<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ApiResponse<SearchBody>>, ApiError> {
    state.catch_up().await?;

    let page = state.order_book.search(&query).await;
    let orders = with_users(&state, page.orders).await;
    Ok(ApiResponse::ok(
        "Orders fetched",
        SearchBody {
            orders,
            pagination: page.pagination,
        },
    ))
}

async fn with_users<S: EventStore + Clone>(
    state: &AppState<S>,
    orders: Vec<OrderSummary>,
) -> Vec<OrderWithUser> {
    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let profile = match &order.user_id {
            Some(user_id) => state.users.find(user_id).await,
            None => None,
        };
        let (user_name, user_email) = match profile {
            Some(profile) => (profile.name, profile.email),
            None => (UNKNOWN_USER.to_string(), NO_EMAIL.to_string()),
        };
        out.push(OrderWithUser {
            order,
            user_name,
            user_email,
        });
    }
    out
}

fn parse_order_id(raw: &str) -> Result<AggregateId, ApiError> {
    resolve_order_id(raw).ok_or_else(order_not_found)
}

fn order_not_found() -> ApiError {
    ApiError::NotFound("Order not found".to_string())
}
