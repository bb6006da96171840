use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use booking_cart_cell::{create_cart_router, CartHub};

pub fn create_router(hub: Arc<CartHub>) -> Router {
    Router::new()
        .route("/", get(|| async { "Booking cart API is running!" }))
        .nest("/cart", create_cart_router(hub))
}
