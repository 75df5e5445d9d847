//! Order and split-tree API
//!
//! | Path | Method | Purpose |
//! |------|--------|---------|
//! | /api/orders | POST | Open a table / tab |
//! | /api/orders | GET | List live orders |
//! | /api/orders/{id} | GET | Order graph (root + live checks) |
//! | /api/orders/{id}/items | POST | Add items |
//! | /api/orders/{id}/items/{item_id}/void | POST | Void an item |
//! | /api/orders/{id}/items/{item_id}/comp | POST | Comp an item |
//! | /api/orders/{id}/split | POST | Split under a strategy |
//! | /api/orders/{id}/splits/create-check | POST | Append a check |
//! | /api/orders/{id}/splits/merge-all | POST | Fold all checks back |
//! | /api/orders/{id}/splits/{child_id} | DELETE | Delete a check |
//! | /api/orders/merge | POST | Merge one order into another |
//! | /api/orders/{id}/seats | POST | Insert / remove a seat |
//! | /api/orders/{id}/seats | GET | Derived seat views |
//! | /api/orders/{id}/payments | POST | Record a payment |
//! | /api/orders/{id}/void | POST | Void an order |

mod handler;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::open_table).get(handler::list_active))
        .route("/merge", post(handler::merge))
        .route("/{id}", get(handler::get_graph))
        .route("/{id}/items", post(handler::add_items))
        .route("/{id}/items/{item_id}/void", post(handler::void_item))
        .route("/{id}/items/{item_id}/comp", post(handler::comp_item))
        .route("/{id}/split", post(handler::split))
        .route("/{id}/splits/create-check", post(handler::create_check))
        .route("/{id}/splits/merge-all", post(handler::merge_all))
        .route("/{id}/splits/{child_id}", delete(handler::delete_check))
        .route(
            "/{id}/seats",
            post(handler::mutate_seats).get(handler::seat_views),
        )
        .route("/{id}/payments", post(handler::record_payment))
        .route("/{id}/void", post(handler::void_order))
}
