//! Opening, items, payments, optimistic concurrency

use super::*;
use crate::orders::error::OrderError;
use shared::order::OrderStatus;

#[test]
fn test_open_table_rejects_occupied_table() {
    let mgr = manager();
    mgr.open_table(Some("T1".into()), "emp-1".into(), 2, OrderType::DineIn)
        .unwrap();

    let err = mgr
        .open_table(Some("T1".into()), "emp-2".into(), 4, OrderType::DineIn)
        .unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::Validation(_))));

    // another table is fine
    assert!(mgr
        .open_table(Some("T2".into()), "emp-2".into(), 4, OrderType::DineIn)
        .is_ok());
}

#[test]
fn test_check_numbers_are_sequential() {
    let mgr = manager();
    let a = mgr
        .open_table(None, "emp-1".into(), 1, OrderType::Takeout)
        .unwrap();
    let b = mgr
        .open_table(None, "emp-1".into(), 1, OrderType::Takeout)
        .unwrap();
    let first = mgr.get_order(&a.order_id).unwrap().check_number;
    let second = mgr.get_order(&b.order_id).unwrap().check_number;
    assert_eq!(second, first + 1);
}

#[test]
fn test_add_items_recalculates_and_bumps_version() {
    let mgr = manager();
    let (order_id, version) = open_with_items(
        &mgr,
        2,
        vec![
            input("Burger", SeatAssignment::seat(1), 1499),
            input("Fries", SeatAssignment::seat(2), 499),
        ],
    );
    assert_eq!(version, 1);

    let order = mgr.get_order(&order_id).unwrap();
    assert_eq!(order.subtotal, Money(1998));
    assert_eq!(order.total, Money(1998));
    assert!(order.balances());
}

#[test]
fn test_add_items_rejects_unknown_seat() {
    let mgr = manager();
    let opened = mgr
        .open_table(None, "emp-1".into(), 2, OrderType::DineIn)
        .unwrap();

    let err = mgr
        .add_items(
            &opened.order_id,
            vec![input("Burger", SeatAssignment::seat(3), 1499)],
            opened.version,
        )
        .unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::Validation(_))));
}

#[test]
fn test_void_item_removes_contribution() {
    let mgr = manager();
    let (order_id, version) = open_with_items(
        &mgr,
        2,
        vec![
            input("Burger", SeatAssignment::seat(1), 1499),
            input("IPA", SeatAssignment::seat(1), 700),
        ],
    );
    let order = mgr.get_order(&order_id).unwrap();
    let ipa = order.items.iter().find(|i| i.name == "IPA").unwrap();

    let mutated = mgr.void_item(&order_id, &ipa.id, version).unwrap();
    assert_eq!(mutated.version, version + 1);

    let order = mgr.get_order(&order_id).unwrap();
    assert_eq!(order.total, Money(1499));
    // the voided item stays on the record
    assert_eq!(order.items.len(), 2);
}

#[test]
fn test_optimistic_exclusivity() {
    let mgr = manager();
    let (order_id, version) = open_with_items(
        &mgr,
        2,
        vec![input("Burger", SeatAssignment::seat(1), 1499)],
    );

    // two writers read the same version; the first commits
    let winner = mgr
        .add_items(
            &order_id,
            vec![input("Fries", SeatAssignment::seat(1), 499)],
            version,
        )
        .unwrap();
    assert_eq!(winner.version, version + 1);

    // the second is told to refetch, nothing was applied
    let err = mgr
        .add_items(
            &order_id,
            vec![input("Wine", SeatAssignment::seat(2), 900)],
            version,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Order(OrderError::Conflict { expected, current, .. })
            if expected == version && current == version + 1
    ));
    let order = mgr.get_order(&order_id).unwrap();
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.version, version + 1);
}

#[test]
fn test_payment_flow_to_paid_frees_table() {
    let mgr = manager();
    let (order_id, version) = open_with_items(
        &mgr,
        2,
        vec![input("Burger", SeatAssignment::seat(1), 1499)],
    );

    // partial payment leaves the order open
    let m = mgr
        .record_payment(&order_id, Money(1000), "CASH".into(), None, version)
        .unwrap();
    let order = mgr.get_order(&order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Open);
    assert_eq!(order.outstanding(), Money(499));

    // covering the balance closes it
    mgr.record_payment(&order_id, Money(499), "CARD".into(), Some("auth-1".into()), m.version)
        .unwrap();
    let order = mgr.get_order(&order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(order.closed_at.is_some());

    // table is free again
    assert!(mgr
        .open_table(Some("T1".into()), "emp-2".into(), 2, OrderType::DineIn)
        .is_ok());
}

#[test]
fn test_overpayment_rejected() {
    let mgr = manager();
    let (order_id, version) = open_with_items(
        &mgr,
        2,
        vec![input("Burger", SeatAssignment::seat(1), 1499)],
    );

    let err = mgr
        .record_payment(&order_id, Money(1500), "CASH".into(), None, version)
        .unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::Validation(_))));
    let err = mgr
        .record_payment(&order_id, Money::ZERO, "CASH".into(), None, version)
        .unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::Validation(_))));
}

#[test]
fn test_void_order_guards() {
    let mgr = manager();
    let (order_id, version) = open_with_items(
        &mgr,
        2,
        vec![input("Burger", SeatAssignment::seat(1), 1499)],
    );
    let m = mgr
        .record_payment(&order_id, Money(100), "CASH".into(), None, version)
        .unwrap();

    // recorded payments block the void
    let err = mgr.void_order(&order_id, m.version).unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::Validation(_))));

    // a clean order voids and frees its table
    let (clean_id, v) = {
        let opened = mgr
            .open_table(Some("T9".into()), "emp-1".into(), 2, OrderType::DineIn)
            .unwrap();
        (opened.order_id, opened.version)
    };
    mgr.void_order(&clean_id, v).unwrap();
    assert_eq!(
        mgr.get_order(&clean_id).unwrap().status,
        OrderStatus::Voided
    );
    assert!(mgr
        .open_table(Some("T9".into()), "emp-2".into(), 2, OrderType::DineIn)
        .is_ok());
}

#[test]
fn test_unknown_order_is_not_found() {
    let mgr = manager();
    let err = mgr.get_order("ghost").unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::NotFound(_))));
    let err = mgr
        .add_items(
            "ghost",
            vec![input("Burger", SeatAssignment::shared_all(), 100)],
            0,
        )
        .unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::NotFound(_))));
}

#[test]
fn test_negative_prices_rejected() {
    let mgr = manager();
    let opened = mgr
        .open_table(Some("T5".into()), "emp-1".into(), 2, OrderType::DineIn)
        .unwrap();

    let err = mgr
        .add_items(
            &opened.order_id,
            vec![input("Refund hack", SeatAssignment::shared_all(), -500)],
            opened.version,
        )
        .unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::Validation(_))));

    let mut taxed = input("Bravas", SeatAssignment::shared_all(), 850);
    taxed.tax = Money(-50);
    let err = mgr
        .add_items(&opened.order_id, vec![taxed], opened.version)
        .unwrap_err();
    assert!(matches!(err, ManagerError::Order(OrderError::Validation(_))));

    // nothing was written
    let order = mgr.get_order(&opened.order_id).unwrap();
    assert_eq!(order.total, Money::ZERO);
    assert_eq!(order.version, opened.version);
}
