//! Lifecycle tests against the live mock server.
//!
//! Each test starts its own mock on a random port and drives the client over
//! real HTTP through the default ureq transport, so URL resolution, headers,
//! basic auth, and status classification are all exercised end-to-end.

use chargify_core::{
    ApiError, Cancellation, ChargifyClient, Config, CreateSubscription, CustomerInput, Direction,
    ProductFamilyInput, ProductInput, ProductInterval,
};

const KEY: &str = "test-key";

/// Starts the mock server and returns its root URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            chargify_mock_server::run(listener, KEY).await
        })
    });

    format!("http://{addr}/")
}

fn client(root: &str, key: &str) -> ChargifyClient {
    ChargifyClient::new(Config::new("acme", key).with_base_url(root)).unwrap()
}

fn seed_catalog(c: &ChargifyClient) -> (i64, String) {
    let family = c
        .create_product_family(&ProductFamilyInput {
            name: "Plans".to_string(),
            handle: "plans".to_string(),
            description: "Monthly plans".to_string(),
            accounting_code: None,
        })
        .unwrap();
    let product = c
        .create_product(
            family.id,
            &ProductInput {
                name: Some("Basic".to_string()),
                handle: Some("basic".to_string()),
                description: Some("Entry plan".to_string()),
                price_in_cents: Some(1000),
                interval: Some(1),
                interval_unit: Some(ProductInterval::Month),
                ..ProductInput::default()
            },
        )
        .unwrap();
    (family.id, product.handle)
}

#[test]
fn subscription_lifecycle() {
    let root = start_server();
    let c = client(&root, KEY);

    // Catalog.
    let (family_id, handle) = seed_catalog(&c);
    let products = c.list_product_family_products(family_id).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].interval_unit, Some(ProductInterval::Month));
    assert_eq!(c.get_product_by_handle(&handle).unwrap().price_in_cents, 1000);

    // Customer, found again by reference.
    let customer = c
        .create_customer(&CustomerInput::new("Ada", "Lovelace", "ada@example.com").with_reference("ada-1"))
        .unwrap();
    assert_eq!(c.get_customer_by_reference("ada-1").unwrap().id, customer.id);
    assert_eq!(c.find_customer_by_reference("ada-1").unwrap().id, customer.id);
    assert_eq!(c.get_customer(customer.id).unwrap().email, "ada@example.com");

    // Subscription by reference.
    let sub = c
        .create_subscription(&CreateSubscription::for_reference("ada-1", &handle))
        .unwrap();
    assert_eq!(sub.state.as_deref(), Some("active"));
    assert_eq!(sub.customer.as_ref().map(|cu| cu.id), Some(customer.id));
    assert_eq!(sub.product.as_ref().map(|p| p.handle.as_str()), Some("basic"));

    let subs = c.list_customer_subscriptions(customer.id).unwrap();
    assert_eq!(subs.len(), 1);

    // Delayed cancel, then take it back.
    c.cancel_subscription(
        sub.id,
        Cancellation::Delayed {
            reason_code: Some("price".to_string()),
            message: Some("Too expensive".to_string()),
        },
    )
    .unwrap();
    let pending = c.get_subscription(sub.id).unwrap();
    assert_eq!(pending.cancel_at_end_of_period, Some(true));
    assert_eq!(pending.reason_code.as_deref(), Some("price"));

    c.remove_delayed_cancellation(sub.id).unwrap();
    assert_eq!(c.get_subscription(sub.id).unwrap().cancel_at_end_of_period, Some(false));

    // Cancel for good; the customer still can't be deleted.
    c.cancel_subscription(sub.id, Cancellation::Immediately).unwrap();
    assert_eq!(c.get_subscription(sub.id).unwrap().state.as_deref(), Some("canceled"));
    assert!(matches!(
        c.delete_customer(customer.id).unwrap_err(),
        ApiError::Validation { .. }
    ));
}

#[test]
fn customer_crud_and_listing() {
    let root = start_server();
    let c = client(&root, KEY);

    let ada = c
        .create_customer(&CustomerInput::new("Ada", "Lovelace", "ada@example.com"))
        .unwrap();
    let alan = c
        .create_customer(&CustomerInput::new("Alan", "Turing", "alan@example.com"))
        .unwrap();

    let mut change = CustomerInput::default();
    change.organization = Some("Bletchley Park".to_string());
    let updated = c.update_customer(alan.id, &change).unwrap();
    assert_eq!(updated.organization.as_deref(), Some("Bletchley Park"));
    assert_eq!(updated.first_name, "Alan");

    let newest_first = c.list_customers(1, Direction::Desc).unwrap();
    assert_eq!(
        newest_first.iter().map(|cu| cu.id).collect::<Vec<_>>(),
        vec![alan.id, ada.id]
    );
    assert_eq!(c.search_customers("lovelace").unwrap().len(), 1);
    assert_eq!(c.search_customers_by_email("alan@example.com").unwrap()[0].id, alan.id);

    c.delete_customer(ada.id).unwrap();
    assert!(c.get_customer(ada.id).unwrap_err().is_not_found());
}

#[test]
fn server_errors_are_classified() {
    let root = start_server();
    let c = client(&root, KEY);

    let input = CustomerInput::new("Ada", "Lovelace", "ada@example.com").with_reference("dup");
    c.create_customer(&input).unwrap();
    match c.create_customer(&input).unwrap_err() {
        ApiError::Validation { errors } => {
            assert_eq!(errors, vec!["Reference: must be unique - that value has been taken."]);
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    assert!(c.get_customer_by_reference("nobody").unwrap_err().is_not_found());
    assert!(c.find_customer_by_reference("nobody").unwrap_err().is_not_found());

    let err = c
        .create_subscription(&CreateSubscription::for_reference("dup", "no-such-plan"))
        .unwrap_err();
    assert_eq!(err.status(), Some(422));

    let intruder = client(&root, "wrong-key");
    assert!(matches!(
        intruder.list_customers(1, Direction::Asc).unwrap_err(),
        ApiError::PermissionDenied { status: 401 }
    ));
}

#[test]
fn billing_portal_flow() {
    let root = start_server();
    let c = client(&root, KEY);

    let customer = c
        .create_customer(&CustomerInput::new("Ada", "Lovelace", "ada@example.com"))
        .unwrap();
    assert!(matches!(
        c.get_billing_portal(customer.id).unwrap_err(),
        ApiError::Validation { .. }
    ));

    c.enable_billing_portal(customer.id, true).unwrap();
    let refreshed = c.get_customer(customer.id).unwrap();
    assert!(refreshed.portal_customer_created_at.is_some());
    assert!(refreshed.portal_invite_last_sent_at.is_some());

    let portal = c.get_billing_portal(customer.id).unwrap();
    assert_eq!(portal.fetch_count, 1);
    assert!(portal.url.starts_with("https://"));
    assert!(portal.new_link_available_at > portal.created_at);

    assert!(c.enable_billing_portal(customer.id, false).is_err());
}

#[test]
fn product_archive_blocks_new_subscriptions() {
    let root = start_server();
    let c = client(&root, KEY);
    let (_, handle) = seed_catalog(&c);
    let product = c.get_product_by_handle(&handle).unwrap();

    c.archive_product(product.id).unwrap();
    assert!(c.get_product(product.id).unwrap().is_archived());

    let customer = c
        .create_customer(&CustomerInput::new("Ada", "Lovelace", "ada@example.com"))
        .unwrap();
    match c
        .create_subscription(&CreateSubscription::for_customer(customer.id, &handle))
        .unwrap_err()
    {
        ApiError::Validation { errors } => assert_eq!(errors, vec!["Product: has been archived."]),
        other => panic!("expected Validation, got {other:?}"),
    }
}
