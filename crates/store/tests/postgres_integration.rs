//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and truncate
//! every table before each test, so they run serially.
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{Money, OrderId, OrderStatus, ProductId, RoleName, UserId};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    CatalogStore, LineRequest, MAX_QUANTITY, NewCategory, NewOrder, NewProduct, NewUser, Order,
    OrderFilter, OrderPatch, OrderRepository, PostgresStore, ProductPatch, StoreError, UserPatch,
    UserStore,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/001_create_schema.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let store = PostgresStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query(
        "TRUNCATE TABLE order_lines, orders, products, categories, users, roles RESTART IDENTITY",
    )
    .execute(store.pool())
    .await
    .unwrap();

    store
}

struct Seed {
    client: UserId,
    burger: ProductId,
    fries: ProductId,
}

async fn seed(store: &PostgresStore) -> Seed {
    let client = store
        .create_user(NewUser {
            last_name: "Doe".into(),
            first_name: "Jane".into(),
            email: "jane@example.com".into(),
            address: None,
            phone: None,
            password_hash: "not-a-real-hash".into(),
            role_id: None,
        })
        .await
        .unwrap();
    let burger = store
        .create_product(NewProduct {
            name: "Burger".into(),
            description: Some("Beef".into()),
            price: Money::from_cents(1000),
            stock: 20,
            category_id: None,
        })
        .await
        .unwrap();
    let fries = store
        .create_product(NewProduct {
            name: "Fries".into(),
            description: None,
            price: Money::from_cents(500),
            stock: 20,
            category_id: None,
        })
        .await
        .unwrap();
    Seed {
        client: client.id,
        burger: burger.id,
        fries: fries.id,
    }
}

fn new_order(client: UserId, lines: Vec<LineRequest>) -> NewOrder {
    NewOrder {
        client_id: client,
        date_placed: None,
        status: None,
        lines,
    }
}

async fn count_lines(store: &PostgresStore, order_id: OrderId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM order_lines WHERE order_id = $1")
        .bind(order_id.as_i64())
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn create_order_computes_total() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let order = store
        .create_order(new_order(seed.client, vec![LineRequest::new(seed.burger, 2)]))
        .await
        .unwrap();

    assert_eq!(order.total_amount, Money::from_cents(2000));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.quantity_of(seed.burger), Some(2));

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded, order);
}

#[tokio::test]
#[serial]
async fn update_lines_replaces_previous_set() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let order = store
        .create_order(new_order(seed.client, vec![LineRequest::new(seed.burger, 2)]))
        .await
        .unwrap();

    let updated = store
        .update_order(
            order.id,
            OrderPatch {
                lines: Some(vec![LineRequest::new(seed.fries, 3)]),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.total_amount, Money::from_cents(1500));
    assert_eq!(updated.lines.len(), 1);
    assert_eq!(updated.quantity_of(seed.burger), None);
    assert_eq!(count_lines(&store, order.id).await, 1);
}

#[tokio::test]
#[serial]
async fn missing_product_is_stored_and_priced_at_zero() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let order = store
        .create_order(new_order(seed.client, vec![LineRequest::new(999, 5)]))
        .await
        .unwrap();

    assert!(order.total_amount.is_zero());
    assert_eq!(order.quantity_of(ProductId::new(999)), Some(5));
}

#[tokio::test]
#[serial]
async fn duplicate_products_in_request_collapse() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let order = store
        .create_order(new_order(
            seed.client,
            vec![LineRequest::new(seed.burger, 1), LineRequest::new(seed.burger, 3)],
        ))
        .await
        .unwrap();

    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.total_amount, Money::from_cents(3000));
}

#[tokio::test]
#[serial]
async fn create_for_unknown_client_rolls_back() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let result = store
        .create_order(new_order(UserId::new(404), vec![LineRequest::new(seed.burger, 1)]))
        .await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_lines")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(store.list_orders(OrderFilter::new()).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn failed_update_keeps_prior_state() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let order = store
        .create_order(new_order(seed.client, vec![LineRequest::new(seed.burger, 2)]))
        .await
        .unwrap();

    // The client change violates the foreign key; the line replacement in the
    // same patch must not be applied either.
    let result = store
        .update_order(
            order.id,
            OrderPatch {
                client_id: Some(UserId::new(404)),
                lines: Some(vec![LineRequest::new(seed.fries, 1)]),
                ..Default::default()
            },
        )
        .await;

    assert!(result.is_err());
    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded, order);
}

#[tokio::test]
#[serial]
async fn status_only_update_keeps_lines_and_total() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let order = store
        .create_order(new_order(
            seed.client,
            vec![LineRequest::new(seed.burger, 1), LineRequest::new(seed.fries, 1)],
        ))
        .await
        .unwrap();

    let updated = store
        .update_order(
            order.id,
            OrderPatch {
                status: Some(OrderStatus::Served),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.status, OrderStatus::Served);
    assert_eq!(updated.lines, order.lines);
    assert_eq!(updated.total_amount, order.total_amount);
}

#[tokio::test]
#[serial]
async fn delete_cascades_to_lines() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let order = store
        .create_order(new_order(
            seed.client,
            vec![LineRequest::new(seed.burger, 1), LineRequest::new(seed.fries, 2)],
        ))
        .await
        .unwrap();
    assert_eq!(count_lines(&store, order.id).await, 2);

    assert!(store.delete_order(order.id).await.unwrap());
    assert!(store.get_order(order.id).await.unwrap().is_none());
    assert_eq!(count_lines(&store, order.id).await, 0);
    assert!(!store.delete_order(order.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn missing_order_is_not_an_error() {
    let store = get_test_store().await;

    assert!(store.get_order(OrderId::new(42)).await.unwrap().is_none());
    assert!(
        store
            .update_order(
                OrderId::new(42),
                OrderPatch {
                    status: Some(OrderStatus::Ready),
                    ..Default::default()
                }
            )
            .await
            .unwrap()
            .is_none()
    );
    assert!(!store.delete_order(OrderId::new(42)).await.unwrap());
}

#[tokio::test]
#[serial]
async fn list_orders_filters_by_client_and_day() {
    let store = get_test_store().await;
    let seed = seed(&store).await;
    let other = store
        .create_user(NewUser {
            last_name: "Roe".into(),
            first_name: "Rick".into(),
            email: "rick@example.com".into(),
            address: None,
            phone: None,
            password_hash: "not-a-real-hash".into(),
            role_id: None,
        })
        .await
        .unwrap();

    let on_day = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();
    let next_day = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();

    for (client, placed) in [
        (seed.client, on_day),
        (seed.client, next_day),
        (other.id, on_day),
    ] {
        store
            .create_order(NewOrder {
                client_id: client,
                date_placed: Some(placed),
                status: None,
                lines: vec![],
            })
            .await
            .unwrap();
    }

    let filter = OrderFilter::new()
        .client_id(seed.client)
        .date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    let orders = store.list_orders(filter).await.unwrap();

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].client_id, seed.client);
    assert_eq!(orders[0].date_placed, on_day);

    let pending = store
        .list_orders(OrderFilter::new().status(OrderStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 3);
}

#[tokio::test]
#[serial]
async fn product_update_and_category_detach() {
    let store = get_test_store().await;
    let drinks = store
        .create_category(NewCategory {
            name: "Drinks".into(),
        })
        .await
        .unwrap();
    let cola = store
        .create_product(NewProduct {
            name: "Cola".into(),
            description: None,
            price: Money::from_cents(250),
            stock: 5,
            category_id: Some(drinks.id),
        })
        .await
        .unwrap();

    let updated = store
        .update_product(
            cola.id,
            ProductPatch {
                price: Some(Money::from_cents(300)),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.price, Money::from_cents(300));
    assert_eq!(updated.name, "Cola");

    assert!(store.delete_category(drinks.id).await.unwrap());
    let cola = store.get_product(cola.id).await.unwrap().unwrap();
    assert_eq!(cola.category_id, None);

    let prices = store
        .prices_for(&[cola.id, ProductId::new(999)])
        .await
        .unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[&cola.id], Money::from_cents(300));
}

#[tokio::test]
#[serial]
async fn duplicate_email_and_role_removal() {
    let store = get_test_store().await;
    let role = store.create_role(RoleName::Admin).await.unwrap();
    let user = store
        .create_user(NewUser {
            last_name: "Doe".into(),
            first_name: "Jane".into(),
            email: "jane@example.com".into(),
            address: None,
            phone: None,
            password_hash: "not-a-real-hash".into(),
            role_id: Some(role.id),
        })
        .await
        .unwrap();

    let duplicate = store
        .create_user(NewUser {
            last_name: "Doe".into(),
            first_name: "John".into(),
            email: "jane@example.com".into(),
            address: None,
            phone: None,
            password_hash: "not-a-real-hash".into(),
            role_id: None,
        })
        .await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

    let affected = store.delete_role(role.id).await.unwrap();
    assert_eq!(affected, Some(vec![user.id]));
    assert_eq!(store.get_user(user.id).await.unwrap().unwrap().role_id, None);
}

#[tokio::test]
#[serial]
async fn out_of_range_total_rolls_back() {
    let store = get_test_store().await;
    let seed = seed(&store).await;
    let gold = store
        .create_product(NewProduct {
            name: "Gold leaf".into(),
            description: None,
            price: Money::from_decimal(1.0e9).unwrap(),
            stock: 1,
            category_id: None,
        })
        .await
        .unwrap();

    let created = store
        .create_order(new_order(seed.client, vec![LineRequest::new(gold.id, MAX_QUANTITY)]))
        .await;
    assert!(matches!(created, Err(StoreError::AmountOverflow { .. })));
    assert!(store.list_orders(OrderFilter::new()).await.unwrap().is_empty());

    let order = store
        .create_order(new_order(seed.client, vec![LineRequest::new(seed.fries, 2)]))
        .await
        .unwrap();
    let updated = store
        .update_order(
            order.id,
            OrderPatch {
                lines: Some(vec![LineRequest::new(gold.id, MAX_QUANTITY)]),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(updated, Err(StoreError::AmountOverflow { .. })));
    assert_eq!(store.get_order(order.id).await.unwrap(), Some(order.clone()));
    assert_eq!(count_lines(&store, order.id).await, 1);
}

#[tokio::test]
#[serial]
async fn reads_never_see_half_replaced_lines() {
    let store = get_test_store().await;
    let seed = seed(&store).await;
    let (burger, fries) = (seed.burger, seed.fries);
    let order_id = store
        .create_order(new_order(seed.client, vec![LineRequest::new(burger, 1)]))
        .await
        .unwrap()
        .id;

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for round in 0..40 {
                let lines = if round % 2 == 0 {
                    vec![LineRequest::new(fries, 3)]
                } else {
                    vec![LineRequest::new(burger, 1), LineRequest::new(fries, 1)]
                };
                store
                    .update_order(
                        order_id,
                        OrderPatch {
                            lines: Some(lines),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
            }
        })
    };

    // Burger is 10.00 and fries 5.00: the total must always match the lines.
    let consistent = |order: &Order| {
        let expected: i64 = order
            .lines
            .iter()
            .map(|line| {
                let price = if line.product_id == burger { 1000 } else { 500 };
                price * i64::from(line.quantity)
            })
            .sum();
        order.total_amount == Money::from_cents(expected)
    };
    while !writer.is_finished() {
        for listed in store.list_orders(OrderFilter::new()).await.unwrap() {
            assert!(consistent(&listed), "inconsistent listing: {listed:?}");
        }
        let loaded = store.get_order(order_id).await.unwrap().unwrap();
        assert!(consistent(&loaded), "inconsistent read: {loaded:?}");
    }
    writer.await.unwrap();
}

#[tokio::test]
#[serial]
async fn nested_none_clears_nullable_columns() {
    let store = get_test_store().await;
    let seed = seed(&store).await;

    let untouched = store
        .update_product(
            seed.burger,
            ProductPatch {
                stock: Some(7),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.description.as_deref(), Some("Beef"));

    let cleared = store
        .update_product(
            seed.burger,
            ProductPatch {
                description: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.description, None);
    assert_eq!(cleared.stock, 7);

    let user = store
        .update_user(
            seed.client,
            UserPatch {
                address: Some(Some("8 rue Bonaparte".into())),
                phone: Some(Some("0700000000".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.phone.as_deref(), Some("0700000000"));

    let user = store
        .update_user(
            seed.client,
            UserPatch {
                phone: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.phone, None);
    assert_eq!(user.address.as_deref(), Some("8 rue Bonaparte"));
}
