use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_models::error::AppError;

use crate::{
    AddItemsRequest, ChangeDateRequest, OpenRescheduleRequest, SelectSlotRequest, SelectionAction,
    SelectionRequest, SetPeriodRequest, SlotRequest, SlotsQuery,
    services::{engine::CartEngine, hub::CartHub},
};

fn cart_view(engine: &CartEngine) -> Value {
    json!({
        "subject_id": engine.subject_id(),
        "items": engine.items(),
        "selected": engine.selection().ids(),
        "all_selected": engine.selection().is_all_selected(engine.items()),
        "summary": engine.summary(),
    })
}

fn reschedule_view(engine: &CartEngine) -> Value {
    let coordinator = engine.coordinator();
    json!({
        "state": coordinator.state(),
        "generation": coordinator.generation(),
        "item_id": coordinator.item_id(),
        "date": coordinator.date(),
        "period": coordinator.period(),
        "slots": coordinator.visible_slots(),
        "total_slots": coordinator.slots().len(),
        "selected": coordinator.selected(),
    })
}

/// Fetches slots without holding the cart lock, then hands them back to the engine.
/// A newer open, date change or close in the meantime turns the result into a no-op.
async fn load_slots_unlocked(hub: &CartHub, subject_id: &str, request: SlotRequest) -> Result<Json<Value>, AppError> {
    let slots = hub.context().catalog.fetch_for(&request).await;

    let engine = hub.engine(subject_id).await;
    let mut engine = engine.lock().await;
    if !engine.finish_slot_load(request.generation, slots) {
        debug!("Slot fetch for subject {} superseded", subject_id);
    }

    Ok(Json(json!({
        "success": true,
        "reschedule": reschedule_view(&engine)
    })))
}

pub async fn get_cart(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let view = {
        let engine = hub.engine(&subject_id).await;
        let engine = engine.lock().await;
        cart_view(&engine)
    };
    hub.release_if_idle(&subject_id).await;

    Ok(Json(view))
}

pub async fn get_cart_count(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let count = {
        let engine = hub.engine(&subject_id).await;
        let engine = engine.lock().await;
        engine.items().len()
    };
    hub.release_if_idle(&subject_id).await;

    Ok(Json(json!({ "count": count })))
}

pub async fn add_items(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
    Json(request): Json<AddItemsRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Adding {} items to cart of subject {}", request.items.len(), subject_id);

    let engine = hub.engine(&subject_id).await;
    let mut engine = engine.lock().await;
    let outcome = engine.add_items(request.items).await;

    Ok(Json(json!({
        "success": true,
        "added": outcome.added,
        "replaced": outcome.replaced,
        "cart": cart_view(&engine)
    })))
}

pub async fn remove_item(
    State(hub): State<Arc<CartHub>>,
    Path((subject_id, item_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let (remote, view) = {
        let engine = hub.engine(&subject_id).await;
        let mut engine = engine.lock().await;
        let remote = engine.remove(&item_id).await?;
        (remote, cart_view(&engine))
    };
    hub.release_if_idle(&subject_id).await;

    Ok(Json(json!({
        "success": true,
        "remote_delete": remote,
        "cart": view
    })))
}

pub async fn clear_cart(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let report = {
        let engine = hub.engine(&subject_id).await;
        let mut engine = engine.lock().await;
        let report = engine.clear_all().await;
        report
    };
    hub.release_if_idle(&subject_id).await;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

pub async fn update_selection(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<Value>, AppError> {
    let engine = hub.engine(&subject_id).await;
    let mut engine = engine.lock().await;

    let item_id = || {
        request
            .item_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("item_id is required for this action".to_string()))
    };

    match request.action {
        SelectionAction::Select => engine.select(item_id()?)?,
        SelectionAction::Deselect => engine.deselect(item_id()?),
        SelectionAction::Toggle => {
            engine.toggle(item_id()?)?;
        }
        SelectionAction::All => engine.select_all(),
        SelectionAction::None => engine.select_none(),
    }

    Ok(Json(cart_view(&engine)))
}

pub async fn list_slots(
    State(hub): State<Arc<CartHub>>,
    Path((subject_id, item_id)): Path<(String, String)>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let item = {
        let engine = hub.engine(&subject_id).await;
        let engine = engine.lock().await;
        engine
            .item(&item_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Item not found: {}", item_id)))?
    };

    let catalog = &hub.context().catalog;
    let slots = catalog.fetch_slots(&item, query.date).await;
    let slots: Vec<Value> = slots
        .iter()
        .map(|slot| {
            json!({
                "slot": slot,
                "expired": catalog.is_expired(slot, query.date)
            })
        })
        .collect();

    Ok(Json(json!({
        "item_id": item_id,
        "date": query.date,
        "slots": slots
    })))
}

pub async fn open_reschedule(
    State(hub): State<Arc<CartHub>>,
    Path((subject_id, item_id)): Path<(String, String)>,
    Json(request): Json<OpenRescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let slot_request = {
        let engine = hub.engine(&subject_id).await;
        let mut engine = engine.lock().await;
        engine.begin_reschedule(&item_id, request.date, request.period)?
    };

    load_slots_unlocked(&hub, &subject_id, slot_request).await
}

pub async fn change_reschedule_date(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
    Json(request): Json<ChangeDateRequest>,
) -> Result<Json<Value>, AppError> {
    let slot_request = {
        let engine = hub.engine(&subject_id).await;
        let mut engine = engine.lock().await;
        engine.change_reschedule_date(request.date)?
    };

    load_slots_unlocked(&hub, &subject_id, slot_request).await
}

pub async fn set_reschedule_period(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
    Json(request): Json<SetPeriodRequest>,
) -> Result<Json<Value>, AppError> {
    let engine = hub.engine(&subject_id).await;
    let mut engine = engine.lock().await;
    engine.set_reschedule_period(request.period);

    Ok(Json(json!({
        "success": true,
        "reschedule": reschedule_view(&engine)
    })))
}

pub async fn select_reschedule_slot(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
    Json(request): Json<SelectSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let engine = hub.engine(&subject_id).await;
    let mut engine = engine.lock().await;
    engine.select_slot(&request.slot_id)?;

    Ok(Json(json!({
        "success": true,
        "reschedule": reschedule_view(&engine)
    })))
}

pub async fn confirm_reschedule(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let engine = hub.engine(&subject_id).await;
    let mut engine = engine.lock().await;
    let outcome = engine.confirm_reschedule().await?;

    Ok(Json(json!({
        "success": true,
        "item": outcome.item,
        "scheduled_at": outcome.commit.scheduled_at,
        "remote_sync": if outcome.sync.is_some() { "dispatched" } else { "skipped" },
        "reschedule": reschedule_view(&engine)
    })))
}

pub async fn close_reschedule(
    State(hub): State<Arc<CartHub>>,
    Path(subject_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let view = {
        let engine = hub.engine(&subject_id).await;
        let mut engine = engine.lock().await;
        engine.close_reschedule();
        reschedule_view(&engine)
    };
    hub.release_if_idle(&subject_id).await;

    Ok(Json(json!({
        "success": true,
        "reschedule": view
    })))
}
