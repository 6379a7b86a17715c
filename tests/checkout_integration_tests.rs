//! Cart and order flow against the HTTP API

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{Value, json};
use storefront::models::{Role, tenant::StoreSettings};
use storefront::repositories::{ProductRepository, TenantRepository};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TestApp, create_product, create_tenant, create_user};

fn shipping_address() -> Value {
    json!({
        "name": "Pat Shopper",
        "line1": "1 Market Street",
        "city": "Springfield",
        "postal_code": "12345",
        "country": "US"
    })
}

#[tokio::test]
async fn cart_lifecycle_keeps_totals_current() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "cart-shop", "starter").await?;
    let mug = create_product(app.db(), &store, "Enamel Mug", 12.5, 10).await?;
    let customer = create_user(app.db(), "pat@example.com", Role::Customer, Some(store.id)).await?;
    let token = app.token_for(&customer);

    let empty = app.get("/api/cart", Some(&token), None).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["data"]["item_count"], 0);
    assert_eq!(empty.body["data"]["total"], 0.0);

    let added = app
        .post(
            "/api/cart/add",
            Some(&token),
            None,
            json!({ "product_id": mug.id, "quantity": 2 }),
        )
        .await;
    assert_eq!(added.status, StatusCode::OK);
    let cart = &added.body["data"];
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["subtotal"], 25.0);
    assert_eq!(cart["tax"], 2.5);
    assert_eq!(cart["shipping"], 0.0);
    assert_eq!(cart["total"], 27.5);
    assert_eq!(cart["formatted_total"], "$27.50");
    assert_eq!(cart["items"][0]["line_total"], 25.0);

    // Adding the same product again merges into one line.
    let merged = app
        .post("/api/cart/add", Some(&token), None, json!({ "product_id": mug.id }))
        .await;
    assert_eq!(merged.body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(merged.body["data"]["items"][0]["quantity"], 3);

    let updated = app
        .put(
            "/api/cart/update",
            Some(&token),
            None,
            json!({ "product_id": mug.id, "quantity": 1 }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["item_count"], 1);

    let zeroed = app
        .put(
            "/api/cart/update",
            Some(&token),
            None,
            json!({ "product_id": mug.id, "quantity": 0 }),
        )
        .await;
    assert!(zeroed.body["data"]["items"].as_array().unwrap().is_empty());

    let missing = app
        .post("/api/cart/remove", Some(&token), None, json!({ "product_id": mug.id }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"], "Item not found in cart");
    Ok(())
}

#[tokio::test]
async fn cart_respects_stock_and_clears() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "stock-shop", "starter").await?;
    let tea = create_product(app.db(), &store, "Loose Leaf Tea", 4.0, 2).await?;
    let customer = create_user(app.db(), "leaf@example.com", Role::Customer, Some(store.id)).await?;
    let token = app.token_for(&customer);

    let too_many = app
        .post(
            "/api/cart/add",
            Some(&token),
            None,
            json!({ "product_id": tea.id, "quantity": 3 }),
        )
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        too_many.body["error"],
        "Requested quantity not available in stock"
    );

    let zero = app
        .post(
            "/api/cart/add",
            Some(&token),
            None,
            json!({ "product_id": tea.id, "quantity": 0 }),
        )
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    app.post(
        "/api/cart/add",
        Some(&token),
        None,
        json!({ "product_id": tea.id, "quantity": 2 }),
    )
    .await;
    let cleared = app
        .post("/api/cart/clear", Some(&token), None, json!({}))
        .await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.body["data"]["item_count"], 0);

    let anonymous = app.get("/api/cart", None, Some(store.id)).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn checkout_applies_store_settings_and_takes_stock() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "checkout-shop", "starter").await?;
    let owner = create_user(app.db(), "owner@checkout.example", Role::TenantAdmin, Some(store.id)).await?;
    let mug = create_product(app.db(), &store, "Enamel Mug", 12.5, 10).await?;
    let customer = create_user(app.db(), "pat@example.com", Role::Customer, Some(store.id)).await?;
    let token = app.token_for(&customer);

    let settings = app
        .put(
            &format!("/api/tenants/{}/settings", store.id),
            Some(&app.token_for(&owner)),
            None,
            json!({
                "currency": "USD",
                "tax_rate": 8.0,
                "shipping_flat_rate": 5.0,
                "free_shipping_threshold": 100.0
            }),
        )
        .await;
    assert_eq!(settings.status, StatusCode::OK);

    app.post(
        "/api/cart/add",
        Some(&token),
        None,
        json!({ "product_id": mug.id, "quantity": 2 }),
    )
    .await;

    let placed = app
        .post(
            "/api/orders",
            Some(&token),
            None,
            json!({ "shipping_address": shipping_address(), "notes": "Leave at the door" }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    assert_eq!(placed.body["message"], "Order placed successfully");
    let order = &placed.body["data"];
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["customer_email"], "pat@example.com");
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["payment_status"], "PENDING");
    assert_eq!(order["subtotal"], 25.0);
    assert_eq!(order["tax_amount"], 2.0);
    assert_eq!(order["shipping_amount"], 5.0);
    assert_eq!(order["total"], 32.0);
    assert_eq!(order["customer_notes"], "Leave at the door");
    assert_eq!(order["items"][0]["product_name"], "Enamel Mug");
    assert_eq!(order["items"][0]["unit_price"], 12.5);
    assert!(order.get("admin_notes").is_none());

    let (product, _) = ProductRepository::new(app.db())
        .find(store.id, mug.id)
        .await?
        .expect("product still exists");
    assert_eq!(product.stock, 8);

    let cart = app.get("/api/cart", Some(&token), None).await;
    assert_eq!(cart.body["data"]["item_count"], 0);
    Ok(())
}

#[tokio::test]
async fn order_lines_keep_checkout_price() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "snapshot-shop", "starter").await?;
    let lamp = create_product(app.db(), &store, "Desk Lamp", 30.0, 5).await?;
    let customer = create_user(app.db(), "lamp@example.com", Role::Customer, Some(store.id)).await?;
    let token = app.token_for(&customer);

    app.post("/api/cart/add", Some(&token), None, json!({ "product_id": lamp.id }))
        .await;
    let placed = app
        .post(
            "/api/orders",
            Some(&token),
            None,
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    let order_id = placed.body["data"]["id"].as_str().unwrap().to_string();

    ProductRepository::new(app.db())
        .update(
            store.id,
            lamp.id,
            storefront::repositories::product::ProductUpdate {
                price: Some(45.0),
                ..Default::default()
            },
        )
        .await?;

    let fetched = app
        .get(&format!("/api/orders/{order_id}"), Some(&token), None)
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["data"]["items"][0]["unit_price"], 30.0);
    assert_eq!(fetched.body["data"]["subtotal"], 30.0);
    Ok(())
}

#[tokio::test]
async fn checkout_rejects_empty_cart_and_bad_address() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "empty-shop", "starter").await?;
    let customer = create_user(app.db(), "empty@example.com", Role::Customer, Some(store.id)).await?;
    let token = app.token_for(&customer);

    let empty = app
        .post(
            "/api/orders",
            Some(&token),
            None,
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.body["error"], "Cart is empty");

    let no_address = app
        .post(
            "/api/orders",
            Some(&token),
            None,
            json!({ "shipping_address": "somewhere" }),
        )
        .await;
    assert_eq!(no_address.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_address.body["error"], "Shipping address is required");
    Ok(())
}

#[tokio::test]
async fn checkout_rechecks_stock() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "race-shop", "starter").await?;
    let vase = create_product(app.db(), &store, "Glass Vase", 20.0, 3).await?;
    let customer = create_user(app.db(), "vase@example.com", Role::Customer, Some(store.id)).await?;
    let token = app.token_for(&customer);

    app.post(
        "/api/cart/add",
        Some(&token),
        None,
        json!({ "product_id": vase.id, "quantity": 3 }),
    )
    .await;

    // Stock sold elsewhere after the item went into the cart.
    ProductRepository::new(app.db())
        .update_inventory(
            store.id,
            vase.id,
            storefront::repositories::product::InventoryUpdate {
                stock: Some(1),
                ..Default::default()
            },
        )
        .await?;

    let placed = app
        .post(
            "/api/orders",
            Some(&token),
            None,
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::BAD_REQUEST);
    assert!(
        placed.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Requested quantity not available in stock")
    );

    let cart = app.get("/api/cart", Some(&token), None).await;
    assert_eq!(cart.body["data"]["item_count"], 3);
    Ok(())
}

#[tokio::test]
async fn customers_see_only_their_orders() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "private-shop", "starter").await?;
    let product = create_product(app.db(), &store, "Wool Scarf", 22.0, 10).await?;
    let alice = create_user(app.db(), "alice@example.com", Role::Customer, Some(store.id)).await?;
    let bob = create_user(app.db(), "bob@example.com", Role::Customer, Some(store.id)).await?;
    let staff = create_user(app.db(), "staff@private.example", Role::Staff, Some(store.id)).await?;
    let alice_token = app.token_for(&alice);
    let bob_token = app.token_for(&bob);

    app.post(
        "/api/cart/add",
        Some(&alice_token),
        None,
        json!({ "product_id": product.id }),
    )
    .await;
    let placed = app
        .post(
            "/api/orders",
            Some(&alice_token),
            None,
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    let order_id = placed.body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/orders/{order_id}");

    let bob_view = app.get(&uri, Some(&bob_token), None).await;
    assert_eq!(bob_view.status, StatusCode::NOT_FOUND);

    let bob_list = app.get("/api/orders", Some(&bob_token), None).await;
    assert_eq!(bob_list.body["pagination"]["total"], 0);

    let bob_cancel = app
        .post(&format!("{uri}/cancel"), Some(&bob_token), None, json!({}))
        .await;
    assert_eq!(bob_cancel.status, StatusCode::FORBIDDEN);
    assert_eq!(bob_cancel.body["error"], "You can only cancel your own orders");

    let alice_list = app.get("/api/orders", Some(&alice_token), None).await;
    assert_eq!(alice_list.body["pagination"]["total"], 1);
    assert_eq!(alice_list.body["data"][0]["formatted_total"], "$24.20");

    let staff_list = app
        .get(
            "/api/orders?customer_email=alice@example.com",
            Some(&app.token_for(&staff)),
            None,
        )
        .await;
    assert_eq!(staff_list.body["pagination"]["total"], 1);

    let bob_update = app
        .put(&uri, Some(&bob_token), None, json!({ "status": "SHIPPED" }))
        .await;
    assert_eq!(bob_update.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn cancelling_restocks_and_is_final() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "cancel-shop", "starter").await?;
    let candle = create_product(app.db(), &store, "Soy Candle", 9.0, 4).await?;
    let customer = create_user(app.db(), "wick@example.com", Role::Customer, Some(store.id)).await?;
    let token = app.token_for(&customer);

    app.post(
        "/api/cart/add",
        Some(&token),
        None,
        json!({ "product_id": candle.id, "quantity": 3 }),
    )
    .await;
    let placed = app
        .post(
            "/api/orders",
            Some(&token),
            None,
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    let order_id = placed.body["data"]["id"].as_str().unwrap().to_string();
    let cancel_uri = format!("/api/orders/{order_id}/cancel");

    let cancelled = app.post(&cancel_uri, Some(&token), None, json!({})).await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["data"]["status"], "CANCELLED");

    let (product, _) = ProductRepository::new(app.db())
        .find(store.id, candle.id)
        .await?
        .expect("product still exists");
    assert_eq!(product.stock, 4);

    let again = app.post(&cancel_uri, Some(&token), None, json!({})).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["error"], "Order is already cancelled");
    Ok(())
}

async fn place_order(app: &TestApp, token: &str, product_id: uuid::Uuid, quantity: i32) -> String {
    app.post(
        "/api/cart/add",
        Some(token),
        None,
        json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;
    let placed = app
        .post(
            "/api/orders",
            Some(token),
            None,
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    placed.body["data"]["id"].as_str().unwrap().to_string()
}

async fn stock_of(app: &TestApp, store_id: uuid::Uuid, product_id: uuid::Uuid) -> Result<i32> {
    let (product, _) = ProductRepository::new(app.db())
        .find(store_id, product_id)
        .await?
        .expect("product still exists");
    Ok(product.stock)
}

#[tokio::test]
async fn cancelled_orders_cannot_be_reopened() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "reopen-shop", "starter").await?;
    let lamp = create_product(app.db(), &store, "Desk Lamp", 30.0, 10).await?;
    let customer = create_user(app.db(), "lamp@example.com", Role::Customer, Some(store.id)).await?;
    let staff = create_user(app.db(), "clerk@reopen.example", Role::Staff, Some(store.id)).await?;
    let staff_token = app.token_for(&staff);

    let order_id = place_order(&app, &app.token_for(&customer), lamp.id, 2).await;
    assert_eq!(stock_of(&app, store.id, lamp.id).await?, 8);

    let uri = format!("/api/orders/{order_id}");
    let cancelled = app
        .post(&format!("{uri}/cancel"), Some(&staff_token), None, json!({}))
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(stock_of(&app, store.id, lamp.id).await?, 10);

    let reopened = app
        .put(&uri, Some(&staff_token), None, json!({ "status": "PENDING" }))
        .await;
    assert_eq!(reopened.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reopened.body["error"],
        "Order status can no longer be changed from CANCELLED"
    );

    let again = app
        .post(&format!("{uri}/cancel"), Some(&staff_token), None, json!({}))
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&app, store.id, lamp.id).await?, 10);

    // Notes can still be added as long as the status stays put.
    let annotated = app
        .put(
            &uri,
            Some(&staff_token),
            None,
            json!({ "status": "CANCELLED", "admin_notes": "Customer phoned" }),
        )
        .await;
    assert_eq!(annotated.status, StatusCode::OK);
    assert_eq!(annotated.body["data"]["admin_notes"], "Customer phoned");
    Ok(())
}

#[tokio::test]
async fn cancelling_through_update_restocks() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "update-cancel-shop", "starter").await?;
    let mug = create_product(app.db(), &store, "Enamel Mug", 14.0, 10).await?;
    let customer = create_user(app.db(), "mug@example.com", Role::Customer, Some(store.id)).await?;
    let staff = create_user(app.db(), "clerk@mugs.example", Role::Staff, Some(store.id)).await?;
    let customer_token = app.token_for(&customer);
    let staff_token = app.token_for(&staff);

    let order_id = place_order(&app, &customer_token, mug.id, 2).await;
    assert_eq!(stock_of(&app, store.id, mug.id).await?, 8);

    let uri = format!("/api/orders/{order_id}");
    let cancelled = app
        .put(&uri, Some(&staff_token), None, json!({ "status": "CANCELLED" }))
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["data"]["status"], "CANCELLED");
    assert_eq!(stock_of(&app, store.id, mug.id).await?, 10);

    let refunded = app
        .put(&uri, Some(&staff_token), None, json!({ "status": "REFUNDED" }))
        .await;
    assert_eq!(refunded.status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&app, store.id, mug.id).await?, 10);

    // Delivered orders keep their status too.
    let delivered_id = place_order(&app, &customer_token, mug.id, 1).await;
    let delivered_uri = format!("/api/orders/{delivered_id}");
    let delivered = app
        .put(&delivered_uri, Some(&staff_token), None, json!({ "status": "DELIVERED" }))
        .await;
    assert_eq!(delivered.status, StatusCode::OK);
    assert!(delivered.body["data"]["delivered_at"].is_string());

    let undone = app
        .put(&delivered_uri, Some(&staff_token), None, json!({ "status": "CANCELLED" }))
        .await;
    assert_eq!(undone.status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&app, store.id, mug.id).await?, 9);
    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "last-unit-shop", "starter").await?;
    let vase = create_product(app.db(), &store, "Glass Vase", 40.0, 1).await?;
    let first = create_user(app.db(), "first@example.com", Role::Customer, Some(store.id)).await?;
    let second = create_user(app.db(), "second@example.com", Role::Customer, Some(store.id)).await?;
    let first_token = app.token_for(&first);
    let second_token = app.token_for(&second);

    for token in [&first_token, &second_token] {
        let added = app
            .post(
                "/api/cart/add",
                Some(token),
                None,
                json!({ "product_id": vase.id }),
            )
            .await;
        assert_eq!(added.status, StatusCode::OK);
    }

    let body = json!({ "shipping_address": shipping_address() });
    let (a, b) = tokio::join!(
        app.post("/api/orders", Some(&first_token), None, body.clone()),
        app.post("/api/orders", Some(&second_token), None, body.clone()),
    );

    let created = [&a, &b]
        .iter()
        .filter(|response| response.status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    let rejected = if a.status == StatusCode::CREATED { &b } else { &a };
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert!(
        rejected.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Requested quantity not available in stock")
    );
    assert_eq!(stock_of(&app, store.id, vase.id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn staff_fulfil_orders_and_customers_cannot_cancel_shipped() -> Result<()> {
    let app = TestApp::new().await?;
    let store = create_tenant(app.db(), "ship-shop", "starter").await?;
    let book = create_product(app.db(), &store, "Field Notebook", 6.0, 20).await?;
    let customer = create_user(app.db(), "reader@example.com", Role::Customer, Some(store.id)).await?;
    let staff = create_user(app.db(), "packer@ship.example", Role::Staff, Some(store.id)).await?;
    let token = app.token_for(&customer);
    let staff_token = app.token_for(&staff);

    app.post("/api/cart/add", Some(&token), None, json!({ "product_id": book.id }))
        .await;
    let placed = app
        .post(
            "/api/orders",
            Some(&token),
            None,
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    let order_id = placed.body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/orders/{order_id}");

    let shipped = app
        .put(
            &uri,
            Some(&staff_token),
            None,
            json!({
                "status": "SHIPPED",
                "payment_status": "PAID",
                "tracking_number": "1Z999AA10123456784",
                "admin_notes": "Packed with extra padding"
            }),
        )
        .await;
    assert_eq!(shipped.status, StatusCode::OK);
    let order = &shipped.body["data"];
    assert_eq!(order["status"], "SHIPPED");
    assert_eq!(order["payment_status"], "PAID");
    assert!(order["shipped_at"].is_string());
    assert_eq!(order["admin_notes"], "Packed with extra padding");

    let customer_view = app.get(&uri, Some(&token), None).await;
    assert_eq!(customer_view.body["data"]["tracking_number"], "1Z999AA10123456784");
    assert!(customer_view.body["data"].get("admin_notes").is_none());

    let customer_cancel = app
        .post(&format!("{uri}/cancel"), Some(&token), None, json!({}))
        .await;
    assert_eq!(customer_cancel.status, StatusCode::BAD_REQUEST);
    assert_eq!(customer_cancel.body["error"], "Order can no longer be cancelled");

    let staff_cancel = app
        .post(&format!("{uri}/cancel"), Some(&staff_token), None, json!({}))
        .await;
    assert_eq!(staff_cancel.status, StatusCode::OK);

    let status_filter = app
        .get("/api/orders?status=CANCELLED", Some(&staff_token), None)
        .await;
    assert_eq!(status_filter.body["pagination"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn orders_are_scoped_per_store() -> Result<()> {
    let app = TestApp::new().await?;
    let first = create_tenant(app.db(), "first-shop", "starter").await?;
    let second = create_tenant(app.db(), "second-shop", "starter").await?;
    let product = create_product(app.db(), &first, "Clay Planter", 18.0, 5).await?;
    let customer = create_user(app.db(), "plants@example.com", Role::Customer, Some(first.id)).await?;
    let admin = create_user(app.db(), "root@example.com", Role::SuperAdmin, None).await?;

    // Free shipping disabled so the stored settings are visible in the total.
    TenantRepository::new(app.db())
        .update_settings(
            first.id,
            &StoreSettings {
                tax_rate: 0.0,
                shipping_flat_rate: 2.0,
                free_shipping_threshold: 1000.0,
                ..StoreSettings::default()
            },
        )
        .await?;

    let token = app.token_for(&customer);
    app.post("/api/cart/add", Some(&token), None, json!({ "product_id": product.id }))
        .await;
    let placed = app
        .post(
            "/api/orders",
            Some(&token),
            None,
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(placed.body["data"]["total"], 20.0);
    let order_id = placed.body["data"]["id"].as_str().unwrap().to_string();

    let admin_token = app.token_for(&admin);
    let wrong_store = app
        .get(&format!("/api/orders/{order_id}"), Some(&admin_token), Some(second.id))
        .await;
    assert_eq!(wrong_store.status, StatusCode::NOT_FOUND);

    let right_store = app
        .get(&format!("/api/orders/{order_id}"), Some(&admin_token), Some(first.id))
        .await;
    assert_eq!(right_store.status, StatusCode::OK);
    Ok(())
}
