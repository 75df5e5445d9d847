//! Order aggregate and split-strategy types

mod event;
mod types;

pub use event::{OrderChangeKind, OrderChanged};
pub use types::{
    ItemInput, ItemKind, ItemStatus, Order, OrderItem, OrderStatus, OrderType, PaymentRecord,
    SeatAssignment, SeatStatus, SeatView, SplitStrategy, MAX_LIVE_CHILDREN,
    SEAT_ACTIVE_WINDOW_MS,
};
