//! Demo data for local runs.
//!
//! Fills an empty store with roles, users, a small menu and a handful of
//! orders. Everything goes through the services, so the seeded orders are
//! priced by the same reconciliation as live ones.

use chrono::{Duration, Utc};
use common::{OrderStatus, RoleName};
use domain::{CreateOrder, CreateProduct, CreateUser, DomainError, LineInput};
use store::Store;

use crate::AppState;

/// Password shared by every seeded user.
pub const DEMO_PASSWORD: &str = "demo-password-2025";

const USERS: [(&str, &str, &str, &str); 5] = [
    ("Martin", "Camille", "12 rue des Lilas, Lyon", "0601020304"),
    ("Bernard", "Hugo", "4 avenue Foch, Paris", "0605060708"),
    ("Thomas", "Lea", "9 quai du Port, Marseille", "0611121314"),
    ("Robert", "Nina", "27 place Bellecour, Lyon", "0615161718"),
    ("Richard", "Louis", "3 rue Nationale, Lille", "0619202122"),
];

const MENU: [(&str, [(&str, f64); 5]); 5] = [
    (
        "Starter",
        [
            ("Onion soup", 7.5),
            ("Goat cheese salad", 9.0),
            ("Escargots", 12.0),
            ("Terrine", 8.5),
            ("Leek vinaigrette", 6.0),
        ],
    ),
    (
        "Main",
        [
            ("Steak frites", 21.0),
            ("Coq au vin", 19.5),
            ("Duck confit", 23.0),
            ("Ratatouille", 15.0),
            ("Sea bream", 24.5),
        ],
    ),
    (
        "Dessert",
        [
            ("Creme brulee", 7.0),
            ("Tarte tatin", 8.0),
            ("Chocolate mousse", 6.5),
            ("Ile flottante", 6.0),
            ("Profiteroles", 8.5),
        ],
    ),
    (
        "Drink",
        [
            ("Still water", 2.5),
            ("Lemonade", 3.5),
            ("Espresso", 2.0),
            ("House red", 5.5),
            ("Cider", 4.5),
        ],
    ),
    (
        "Other",
        [
            ("Bread basket", 1.5),
            ("Side fries", 4.0),
            ("Green salad", 3.5),
            ("Cheese plate", 9.5),
            ("Kids menu", 11.0),
        ],
    ),
];

const ORDER_COUNT: usize = 10;

/// What [`seed_demo_data`] created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub roles: usize,
    pub users: usize,
    pub categories: usize,
    pub products: usize,
    pub orders: usize,
}

/// Seeds the store behind `state` with demo data.
///
/// Does nothing when users already exist, so restarting against a
/// persistent database is harmless.
#[tracing::instrument(skip(state))]
pub async fn seed_demo_data<S: Store>(state: &AppState<S>) -> Result<SeedSummary, DomainError> {
    if !state.users.list_users().await?.is_empty() {
        tracing::info!("store already has users, skipping demo data");
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();

    let mut roles = Vec::new();
    for name in [RoleName::Admin, RoleName::Client, RoleName::Waiter] {
        roles.push(state.users.create_role(name.as_str()).await?.id);
        summary.roles += 1;
    }

    let mut clients = Vec::new();
    for (i, (last_name, first_name, address, phone)) in USERS.into_iter().enumerate() {
        let user = state
            .users
            .create_user(CreateUser {
                last_name: last_name.to_string(),
                first_name: first_name.to_string(),
                email: format!(
                    "{}.{}@example.com",
                    first_name.to_lowercase(),
                    last_name.to_lowercase()
                ),
                address: Some(address.to_string()),
                phone: Some(phone.to_string()),
                password: DEMO_PASSWORD.to_string(),
                role_id: Some(roles[i % roles.len()]),
            })
            .await?;
        clients.push(user.id);
        summary.users += 1;
    }

    let mut products = Vec::new();
    for (i, (category, items)) in MENU.into_iter().enumerate() {
        let category_id = state.catalog.create_category(category).await?.id;
        summary.categories += 1;
        for (j, (name, price)) in items.into_iter().enumerate() {
            let product = state
                .catalog
                .create_product(CreateProduct {
                    name: name.to_string(),
                    description: Some(format!("{name}, house recipe")),
                    price,
                    stock: ((i * 5 + j) * 7 % 26) as i32,
                    category_id: Some(category_id),
                })
                .await?;
            products.push(product.id);
            summary.products += 1;
        }
    }

    let now = Utc::now();
    for i in 0..ORDER_COUNT {
        let line_count = i % 4 + 1;
        let lines = (0..line_count)
            .map(|k| {
                let product = products[(i * 7 + k * 3) % products.len()];
                LineInput::new(product, (k % 3 + 1) as i64)
            })
            .collect();
        let status = OrderStatus::ALL[i % OrderStatus::ALL.len()];
        let placed = now - Duration::days(i as i64) - Duration::hours((i * 3) as i64);

        state
            .orders
            .create_order(
                CreateOrder::new(clients[i % clients.len()], lines)
                    .with_status(status.as_str())
                    .with_date(placed.to_rfc3339()),
            )
            .await?;
        summary.orders += 1;
    }

    tracing::info!(?summary, "demo data seeded");
    Ok(summary)
}
