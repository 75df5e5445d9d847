use super::*;
use shared::money::Money;
use shared::order::{ItemInput, OrderType, SeatAssignment};

mod test_core;

fn manager() -> OrdersManager {
    OrdersManager::open_in_memory().unwrap()
}

fn input(name: &str, seat: SeatAssignment, cents: i64) -> ItemInput {
    ItemInput {
        name: name.to_string(),
        quantity: 1,
        unit_price: Money(cents),
        tax: Money::ZERO,
        seat,
    }
}

/// Open a dine-in table with the given items; returns (order_id, version)
fn open_with_items(
    manager: &OrdersManager,
    guest_count: u32,
    items: Vec<ItemInput>,
) -> (String, u64) {
    let opened = manager
        .open_table(Some("T1".into()), "emp-1".into(), guest_count, OrderType::DineIn)
        .unwrap();
    let mutated = manager
        .add_items(&opened.order_id, items, opened.version)
        .unwrap();
    (mutated.order_id, mutated.version)
}

/// The four-seat table from the seat-split worked example, nachos shared
fn four_seat_items() -> Vec<ItemInput> {
    vec![
        input("Burger", SeatAssignment::seat(1), 1499),
        input("Fries", SeatAssignment::seat(1), 499),
        input("IPA", SeatAssignment::seat(1), 700),
        input("Salmon", SeatAssignment::seat(2), 2499),
        input("Salad", SeatAssignment::seat(2), 899),
        input("Wine", SeatAssignment::seat(2), 900),
        input("Chicken", SeatAssignment::seat(3), 1899),
        input("Steak", SeatAssignment::seat(4), 2999),
        input("Nachos", SeatAssignment::shared_all(), 1864),
    ]
}
