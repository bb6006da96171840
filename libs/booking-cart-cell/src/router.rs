use std::sync::Arc;
use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers::{
    add_items,
    change_reschedule_date,
    clear_cart,
    close_reschedule,
    confirm_reschedule,
    get_cart,
    get_cart_count,
    list_slots,
    open_reschedule,
    remove_item,
    select_reschedule_slot,
    set_reschedule_period,
    update_selection,
};
use crate::services::hub::CartHub;

pub fn create_cart_router(hub: Arc<CartHub>) -> Router {
    Router::new()
        .route("/{subject_id}", get(get_cart).delete(clear_cart))
        .route("/{subject_id}/count", get(get_cart_count))
        .route("/{subject_id}/items", post(add_items))
        .route("/{subject_id}/items/{item_id}", delete(remove_item))
        .route("/{subject_id}/items/{item_id}/slots", get(list_slots))
        .route("/{subject_id}/items/{item_id}/reschedule", post(open_reschedule))
        .route("/{subject_id}/selection", post(update_selection))
        .route("/{subject_id}/reschedule", delete(close_reschedule))
        .route("/{subject_id}/reschedule/date", post(change_reschedule_date))
        .route("/{subject_id}/reschedule/period", post(set_reschedule_period))
        .route("/{subject_id}/reschedule/select", post(select_reschedule_slot))
        .route("/{subject_id}/reschedule/confirm", post(confirm_reschedule))
        .with_state(hub)
}
