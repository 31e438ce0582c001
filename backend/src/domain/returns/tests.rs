//! Return eligibility, transitions, and the service round trip.

use std::sync::Arc;

use chrono::TimeDelta;
use mockall::Sequence;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::orders::test_support::{delivered_order, line, usd};
use crate::domain::ports::{
    MockInventoryRepository, MockOrderRepository, MockReturnRepository, OpenReturnRequest,
    OrderRepositoryError, ReturnRepositoryError, ReturnsCommand,
};
use crate::domain::test_support::{at, fixed_clock, tenant};
use crate::domain::{ErrorCode, Role};

fn fulfilled() -> DateTime<Utc> {
    at(2025, 5, 1)
}

#[fixture]
fn order() -> Order {
    delivered_order(
        CustomerId::random(),
        vec![line(ProductId::random(), 3, 1_000), line(ProductId::random(), 1, 4_000)],
        fulfilled(),
    )
}

fn first_line(order: &Order) -> OrderLineId {
    order.lines().first().map(|line| line.id).expect("line")
}

fn ask(order_line_id: OrderLineId, quantity: u32, reason: ReturnReason) -> ReturnLineRequest {
    ReturnLineRequest {
        order_line_id,
        quantity,
        reason,
    }
}

fn open(
    order: &Order,
    existing: &[ReturnRequest],
    lines: Vec<ReturnLineRequest>,
) -> Result<ReturnRequest, ReturnError> {
    ReturnRequest::open(
        ReturnId::random(),
        order,
        existing,
        lines,
        &ReturnPolicy::default(),
        fulfilled() + TimeDelta::days(3),
    )
}

#[rstest]
fn opens_with_prices_from_the_order(order: Order) {
    let request = open(&order, &[], vec![ask(first_line(&order), 2, ReturnReason::Damaged)])
        .expect("open");
    assert_eq!(request.status(), ReturnStatus::Requested);
    let returned = request.lines().first().expect("line");
    assert_eq!(returned.unit_price, usd(1_000));
    assert_eq!(returned.quantity, 2);
}

#[rstest]
fn window_closes_after_thirty_days(order: Order) {
    let lines = vec![ask(first_line(&order), 1, ReturnReason::Other)];
    let policy = ReturnPolicy::default();
    let on_deadline = fulfilled() + TimeDelta::days(30);
    assert!(
        ReturnRequest::open(ReturnId::random(), &order, &[], lines.clone(), &policy, on_deadline)
            .is_ok()
    );
    let err = ReturnRequest::open(
        ReturnId::random(),
        &order,
        &[],
        lines,
        &policy,
        on_deadline + TimeDelta::seconds(1),
    )
    .expect_err("expired");
    let error = Error::from(err);
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.details().expect("details")["code"], "return_window_expired");
}

#[rstest]
fn live_returns_consume_quantity_but_rejected_ones_do_not(order: Order) {
    let line_id = first_line(&order);
    let mut rejected = open(&order, &[], vec![ask(line_id, 3, ReturnReason::ChangedMind)])
        .expect("first");
    rejected.reject(Some("worn".to_owned()), fulfilled()).expect("reject");
    let live = open(&order, &[rejected.clone()], vec![ask(line_id, 2, ReturnReason::Damaged)])
        .expect("second");

    let err = open(&order, &[rejected, live], vec![ask(line_id, 2, ReturnReason::Damaged)])
        .expect_err("only one left");
    assert_eq!(
        err,
        ReturnError::QuantityExceeded {
            order_line_id: line_id,
            requested: 2,
            available: 1,
        }
    );
}

#[rstest]
fn duplicate_and_unknown_lines_are_rejected(order: Order) {
    let line_id = first_line(&order);
    let err = open(
        &order,
        &[],
        vec![
            ask(line_id, 1, ReturnReason::Damaged),
            ask(line_id, 1, ReturnReason::Damaged),
        ],
    )
    .expect_err("duplicate");
    assert_eq!(err, ReturnError::DuplicateLine(line_id));

    let stranger = OrderLineId::random();
    let err = open(&order, &[], vec![ask(stranger, 1, ReturnReason::Damaged)])
        .expect_err("unknown");
    assert_eq!(err, ReturnError::UnknownLine(stranger));
    assert_eq!(open(&order, &[], Vec::new()), Err(ReturnError::NoLines));
}

#[test]
fn pending_orders_cannot_be_returned() {
    let pending = Order::new(crate::domain::OrderDraft {
        id: OrderId::random(),
        customer_id: CustomerId::random(),
        status: OrderStatus::Paid,
        lines: vec![line(ProductId::random(), 1, 100)],
        total: usd(100),
        placed_at: fulfilled(),
        fulfilled_at: None,
    })
    .expect("order");
    let line_id = first_line(&pending);
    let err = open(&pending, &[], vec![ask(line_id, 1, ReturnReason::Other)])
        .expect_err("not returnable");
    assert_eq!(Error::from(err).code(), ErrorCode::Conflict);
}

#[rstest]
fn full_lifecycle_restocks_and_refunds(mut order: Order) {
    let resellable_line = first_line(&order);
    let damaged_line = order.lines().get(1).map(|line| line.id).expect("second line");
    let mut request = open(
        &order,
        &[],
        vec![
            ask(resellable_line, 2, ReturnReason::ChangedMind),
            ask(damaged_line, 1, ReturnReason::Damaged),
        ],
    )
    .expect("open");
    request.approve(fulfilled()).expect("approve");

    let missing = request.receive(
        &[ReceivedLine {
            order_line_id: resellable_line,
            condition: ItemCondition::Resellable,
        }],
        fulfilled(),
    );
    assert_eq!(missing, Err(ReturnError::MissingCondition(damaged_line)));

    let restock = request
        .receive(
            &[
                ReceivedLine {
                    order_line_id: resellable_line,
                    condition: ItemCondition::Resellable,
                },
                ReceivedLine {
                    order_line_id: damaged_line,
                    condition: ItemCondition::Damaged,
                },
            ],
            fulfilled(),
        )
        .expect("receive");
    assert_eq!(restock.len(), 1);
    assert_eq!(restock.first().map(|(_, quantity)| *quantity), Some(2));

    let breakdown = request
        .refund(&mut order, &ReturnPolicy::default(), fulfilled())
        .expect("refund");
    assert_eq!(breakdown.subtotal, usd(6_000));
    assert_eq!(breakdown.restocking_fee, usd(300));
    assert_eq!(breakdown.total, usd(5_700));
    assert_eq!(request.refund_breakdown(), Some(breakdown));
    assert_eq!(order.refunded(), usd(5_700));
    assert_eq!(order.status(), OrderStatus::PartiallyRefunded);
    assert_eq!(request.status(), ReturnStatus::Refunded);
}

#[rstest]
#[case::approve_twice(ReturnAction::Approve)]
#[case::refund_before_receipt(ReturnAction::Refund)]
fn guarded_transitions_conflict(mut order: Order, #[case] action: ReturnAction) {
    let mut request = open(&order, &[], vec![ask(first_line(&order), 1, ReturnReason::Other)])
        .expect("open");
    request.approve(fulfilled()).expect("approve");
    let err = match action {
        ReturnAction::Approve => request.approve(fulfilled()),
        _ => request
            .refund(&mut order, &ReturnPolicy::default(), fulfilled())
            .map(|_| ()),
    }
    .expect_err("invalid");
    let error = Error::from(err);
    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.details().expect("details")["status"], "approved");
}

#[rstest]
fn cancel_is_allowed_until_receipt(order: Order) {
    let mut request = open(&order, &[], vec![ask(first_line(&order), 1, ReturnReason::Other)])
        .expect("open");
    request.approve(fulfilled()).expect("approve");
    request.cancel(fulfilled()).expect("cancel approved");
    assert_eq!(request.status(), ReturnStatus::Cancelled);
    assert!(request.cancel(fulfilled()).is_err());
}

#[tokio::test]
async fn service_open_checks_earlier_returns_and_persists() {
    let ctx = tenant(Role::Staff);
    let order = order();
    let order_id = order.id();
    let line_id = first_line(&order);

    let mut orders = MockOrderRepository::new();
    orders
        .expect_find()
        .return_once(move |_, _| Ok(Some(order)));
    let mut returns = MockReturnRepository::new();
    returns
        .expect_list_for_order()
        .withf(move |_, id| *id == order_id)
        .return_once(|_, _| Ok(Vec::new()));
    returns
        .expect_save()
        .withf(|_, saved, expected| saved.revision() == 1 && expected.is_none())
        .times(1)
        .return_once(|_, _, _| Ok(()));

    let service = ReturnsService::new(
        Arc::new(orders),
        Arc::new(returns),
        Arc::new(MockInventoryRepository::new()),
        ReturnPolicy::default(),
        fixed_clock(fulfilled() + TimeDelta::days(1)),
    );
    let opened = service
        .open(
            &ctx,
            OpenReturnRequest {
                order_id,
                lines: vec![ask(line_id, 1, ReturnReason::WrongItem)],
            },
        )
        .await
        .expect("open");
    assert_eq!(opened.order_id(), order_id);
}

#[tokio::test]
async fn service_receive_restocks_resellable_units() {
    let ctx = tenant(Role::Manager);
    let order = order();
    let line_id = first_line(&order);
    let mut request =
        open(&order, &[], vec![ask(line_id, 2, ReturnReason::ChangedMind)]).expect("open");
    request.approve(fulfilled()).expect("approve");
    let id = request.id();

    let mut returns = MockReturnRepository::new();
    returns
        .expect_find()
        .return_once(move |_, _| Ok(Some(request)));
    returns
        .expect_save()
        .withf(|_, saved, _| saved.status() == ReturnStatus::Received)
        .times(1)
        .return_once(|_, _, _| Ok(()));
    let mut inventory = MockInventoryRepository::new();
    inventory.expect_find().times(2).returning(|_, _| Ok(None));
    inventory
        .expect_save()
        .withf(|_, stock, _| stock.on_hand() == 2)
        .times(1)
        .return_once(|_, _, _| Ok(()));

    let service = ReturnsService::new(
        Arc::new(MockOrderRepository::new()),
        Arc::new(returns),
        Arc::new(inventory),
        ReturnPolicy::default(),
        fixed_clock(fulfilled()),
    );
    service
        .receive(
            &ctx,
            id,
            vec![ReceivedLine {
                order_line_id: line_id,
                condition: ItemCondition::Resellable,
            }],
        )
        .await
        .expect("receive");
}

fn received(order: &Order) -> ReturnRequest {
    let line_id = first_line(order);
    let mut request =
        open(order, &[], vec![ask(line_id, 1, ReturnReason::Damaged)]).expect("open");
    request.approve(fulfilled()).expect("approve");
    request
        .receive(
            &[ReceivedLine {
                order_line_id: line_id,
                condition: ItemCondition::Damaged,
            }],
            fulfilled(),
        )
        .expect("receive");
    request.set_revision(3);
    request
}

fn refund_service(
    orders: MockOrderRepository,
    returns: MockReturnRepository,
) -> ReturnsService<MockOrderRepository, MockReturnRepository, MockInventoryRepository> {
    ReturnsService::new(
        Arc::new(orders),
        Arc::new(returns),
        Arc::new(MockInventoryRepository::new()),
        ReturnPolicy::default(),
        fixed_clock(fulfilled()),
    )
}

#[tokio::test]
async fn losing_refund_race_leaves_the_order_alone() {
    let ctx = tenant(Role::Manager);
    let order = order();
    let request = received(&order);
    let id = request.id();

    let mut returns = MockReturnRepository::new();
    returns
        .expect_find()
        .return_once(move |_, _| Ok(Some(request)));
    returns.expect_save().times(1).return_once(|_, _, _| {
        Err(ReturnRepositoryError::RevisionMismatch {
            expected: 3,
            actual: 4,
        })
    });
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find()
        .return_once(move |_, _| Ok(Some(order)));
    orders.expect_save().never();

    let err = refund_service(orders, returns)
        .refund(&ctx, id)
        .await
        .expect_err("stale return");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn raced_order_write_reapplies_the_refund() {
    let ctx = tenant(Role::Manager);
    let mut order = order();
    order.set_revision(5);
    let request = received(&order);
    let id = request.id();
    let mut moved = order.clone();
    moved.apply_refund(usd(1_000)).expect("concurrent refund");
    moved.set_revision(6);

    let mut returns = MockReturnRepository::new();
    returns
        .expect_find()
        .return_once(move |_, _| Ok(Some(request)));
    returns
        .expect_save()
        .withf(|_, saved, expected| {
            saved.status() == ReturnStatus::Refunded && *expected == Some(3)
        })
        .times(1)
        .return_once(|_, _, _| Ok(()));

    let mut seq = Sequence::new();
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_, _| Ok(Some(order)));
    orders
        .expect_save()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _, _| {
            Err(OrderRepositoryError::RevisionMismatch {
                expected: 5,
                actual: 6,
            })
        });
    orders
        .expect_find()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_, _| Ok(Some(moved)));
    orders
        .expect_save()
        .withf(|_, saved, expected| {
            saved.refunded() == usd(2_000) && *expected == Some(6)
        })
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _, _| Ok(()));

    let refunded = refund_service(orders, returns)
        .refund(&ctx, id)
        .await
        .expect("refund");
    assert_eq!(refunded.status(), ReturnStatus::Refunded);
}

#[tokio::test]
async fn viewer_cannot_open_returns() {
    let ctx = tenant(Role::Viewer);
    let service = ReturnsService::new(
        Arc::new(MockOrderRepository::new()),
        Arc::new(MockReturnRepository::new()),
        Arc::new(MockInventoryRepository::new()),
        ReturnPolicy::default(),
        fixed_clock(fulfilled()),
    );
    let err = service
        .open(
            &ctx,
            OpenReturnRequest {
                order_id: OrderId::random(),
                lines: Vec::new(),
            },
        )
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}
