//! Loyalty, subscription, and automation flows driven through the HTTP API.

mod support;

use actix_web::http::{Method, StatusCode};
use actix_web::test;
use serde_json::json;

use storefront::domain::{CustomerId, OrderId, OrganizationId, Role};
use support::{Storefront, at, login_as, send, storefront_app};

#[actix_web::test]
async fn loyalty_account_moves_through_tiers() {
    let store = Storefront::new(at(2026, 2, 1));
    let organization = OrganizationId::random();
    let customer = CustomerId::random();
    let order = OrderId::random();
    let base = format!("/api/v1/customers/{customer}/loyalty");
    let app = test::init_service(storefront_app(store.state())).await;
    let staff = login_as(&app, organization, Role::Staff).await;

    let (status, fresh) = send(&app, &staff, Method::GET, &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fresh["balance"], 0);
    assert_eq!(fresh["tier"], "bronze");
    assert_eq!(fresh["pointsToNextTier"], 1_000);

    let earn = json!({
        "orderId": order.to_string(),
        "orderTotal": { "amountMinor": 125_000, "currency": "USD" },
    });
    let (status, earned) = send(
        &app,
        &staff,
        Method::POST,
        &format!("{base}/earn"),
        Some(earn.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{earned}");
    assert_eq!(earned["points"], 1_250);
    assert_eq!(earned["previousTier"], "bronze");
    assert_eq!(earned["tier"], "silver");
    assert_eq!(earned["tierChanged"], true);

    let (status, duplicate) =
        send(&app, &staff, Method::POST, &format!("{base}/earn"), Some(earn)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(duplicate["code"], "conflict");

    let (status, redeemed) = send(
        &app,
        &staff,
        Method::POST,
        &format!("{base}/redeem"),
        Some(json!({ "points": 200, "currency": "USD" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redeemed["discount"]["amountMinor"], 200);
    assert_eq!(redeemed["balance"], 1_050);

    let (status, too_many) = send(
        &app,
        &staff,
        Method::POST,
        &format!("{base}/redeem"),
        Some(json!({ "points": 5_000, "currency": "USD" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(too_many["details"]["code"], "insufficient_points");

    let (status, reversed) = send(
        &app,
        &staff,
        Method::POST,
        &format!("{base}/reverse"),
        Some(json!({ "orderId": order.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reversed["pointsRemoved"], 1_050);
    assert_eq!(reversed["balance"], 0);
    assert_eq!(reversed["tier"], "bronze");

    let (status, account) = send(&app, &staff, Method::GET, &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["lifetimePoints"], 0);
    let kinds: Vec<&str> = account["ledger"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry["kind"].as_str())
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(kinds, ["earn", "redeem", "reverse"]);
}

#[actix_web::test]
async fn viewers_can_read_but_not_change_loyalty() {
    let store = Storefront::new(at(2026, 2, 1));
    let organization = OrganizationId::random();
    let customer = CustomerId::random();
    let app = test::init_service(storefront_app(store.state())).await;
    let viewer = login_as(&app, organization, Role::Viewer).await;

    let (status, _) = send(
        &app,
        &viewer,
        Method::GET,
        &format!("/api/v1/customers/{customer}/loyalty"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        &viewer,
        Method::POST,
        &format!("/api/v1/customers/{customer}/loyalty/adjust"),
        Some(json!({ "delta": 50, "reason": "goodwill" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[actix_web::test]
async fn monthly_subscription_bills_on_clamped_month_ends() {
    let store = Storefront::new(at(2026, 1, 31));
    let organization = OrganizationId::random();
    let app = test::init_service(storefront_app(store.state())).await;
    let manager = login_as(&app, organization, Role::Manager).await;

    let (status, created) = send(
        &app,
        &manager,
        Method::POST,
        "/api/v1/subscriptions",
        Some(json!({
            "customerId": CustomerId::random().to_string(),
            "plan": "Coffee club",
            "price": { "amountMinor": 2_400, "currency": "USD" },
            "interval": { "unit": "month", "count": 1 },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["status"], "active");
    let id = created["id"].as_str().unwrap_or_default().to_owned();

    let (status, forecast) = send(
        &app,
        &manager,
        Method::GET,
        &format!("/api/v1/subscriptions/{id}/billing-dates"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        forecast["dates"],
        json!([
            "2026-02-28T12:00:00Z",
            "2026-03-31T12:00:00Z",
            "2026-04-30T12:00:00Z",
        ])
    );

    let (status, early) = send(
        &app,
        &manager,
        Method::POST,
        &format!("/api/v1/subscriptions/{id}/renew"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{early}");

    store.clock.advance_days(28);
    let (status, renewed) = send(
        &app,
        &manager,
        Method::POST,
        &format!("/api/v1/subscriptions/{id}/renew"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{renewed}");
    assert_eq!(renewed["charged"]["amountMinor"], 2_400);
    assert_eq!(renewed["subscription"]["currentCycle"], 1);
    assert_eq!(
        renewed["subscription"]["currentPeriodEnd"],
        "2026-03-31T12:00:00Z"
    );

    let (status, cancelled) = send(
        &app,
        &manager,
        Method::POST,
        &format!("/api/v1/subscriptions/{id}/cancel"),
        Some(json!({ "atPeriodEnd": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["cancelAtPeriodEnd"], true);

    let (status, forecast) = send(
        &app,
        &manager,
        Method::GET,
        &format!("/api/v1/subscriptions/{id}/billing-dates"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(forecast["dates"], json!([]));
}

#[actix_web::test]
async fn automation_rules_fire_on_matching_events() {
    let store = Storefront::new(at(2026, 6, 1));
    let organization = OrganizationId::random();
    let app = test::init_service(storefront_app(store.state())).await;
    let owner = login_as(&app, organization, Role::Owner).await;
    let manager = login_as(&app, organization, Role::Manager).await;
    let rule = json!({
        "name": "Tag big spenders",
        "trigger": "order_paid",
        "conditions": [{ "field": "order.total", "operator": "gte", "value": 100 }],
        "actions": [{ "type": "tag_customer", "tag": "vip-{{customer.name}}" }],
    });

    let (status, _) = send(
        &app,
        &manager,
        Method::POST,
        "/api/v1/automation/rules",
        Some(rule.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(
        &app,
        &owner,
        Method::POST,
        "/api/v1/automation/rules",
        Some(rule),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["enabled"], true);
    let rule_id = created["id"].as_str().unwrap_or_default().to_owned();

    let event = |total: u32| {
        json!({
            "trigger": "order_paid",
            "payload": { "order": { "total": total }, "customer": { "name": "ada" } },
        })
    };

    let (status, fired) = send(
        &app,
        &owner,
        Method::POST,
        "/api/v1/automation/events",
        Some(event(150)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{fired}");
    assert_eq!(fired["dispatched"][0]["ruleId"], rule_id.as_str());
    assert_eq!(
        fired["dispatched"][0]["action"],
        json!({ "type": "tag_customer", "tag": "vip-ada" })
    );

    let (status, quiet) = send(
        &app,
        &owner,
        Method::POST,
        "/api/v1/automation/events",
        Some(event(50)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quiet["dispatched"], json!([]));

    let (status, disabled) = send(
        &app,
        &owner,
        Method::POST,
        &format!("/api/v1/automation/rules/{rule_id}/enabled"),
        Some(json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(disabled["enabled"], false);

    let (status, silenced) = send(
        &app,
        &owner,
        Method::POST,
        "/api/v1/automation/events",
        Some(event(500)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(silenced["dispatched"], json!([]));
}
