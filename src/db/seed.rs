//! Deterministic sample data
//!
//! Ten users, ten products and twenty orders. Order contents are derived
//! from the order index so every fresh database holds the same rows;
//! only order dates move with the clock.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection};

use crate::compiler::DATE_FORMAT;

/// (first_name, last_name, age, city, is_active)
const USERS: &[(&str, &str, i64, &str, bool)] = &[
    ("John", "Doe", 30, "New York", true),
    ("Jane", "Smith", 25, "Los Angeles", true),
    ("Bob", "Johnson", 35, "Chicago", false),
    ("Alice", "Williams", 28, "San Francisco", true),
    ("Charlie", "Brown", 42, "Seattle", true),
    ("Emma", "Davis", 31, "Boston", true),
    ("Michael", "Miller", 29, "Austin", false),
    ("Sarah", "Wilson", 33, "Denver", true),
    ("David", "Moore", 27, "Portland", true),
    ("Lisa", "Taylor", 36, "Miami", true),
];

/// (name, category, price, stock_quantity, is_available, description)
const PRODUCTS: &[(&str, &str, f64, i64, bool, &str)] = &[
    ("Laptop", "Electronics", 999.99, 50, true, "High-performance laptop"),
    ("Smartphone", "Electronics", 699.99, 100, true, "Latest model smartphone"),
    ("Headphones", "Electronics", 149.99, 200, true, "Noise-cancelling headphones"),
    ("Desk Chair", "Furniture", 299.99, 30, true, "Ergonomic office chair"),
    ("Standing Desk", "Furniture", 599.99, 20, true, "Adjustable standing desk"),
    ("Monitor", "Electronics", 399.99, 75, true, "27-inch 4K monitor"),
    ("Keyboard", "Electronics", 89.99, 150, true, "Mechanical keyboard"),
    ("Mouse", "Electronics", 49.99, 180, true, "Wireless mouse"),
    ("Bookshelf", "Furniture", 199.99, 40, false, "Wooden bookshelf"),
    ("Lamp", "Furniture", 79.99, 90, true, "LED desk lamp"),
];

/// Order statuses, assigned round-robin
pub const STATUSES: [&str; 4] = ["pending", "completed", "shipped", "cancelled"];

const ORDER_COUNT: usize = 20;

/// Whether the sample tables hold no users yet
pub fn is_empty(conn: &Connection) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count == 0)
}

/// Insert the sample rows in one transaction
pub fn populate(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO users (first_name, last_name, email, age, city, country, is_active)
             VALUES (?, ?, ?, ?, ?, 'USA', ?)",
        )?;
        for (first, last, age, city, active) in USERS {
            let email = format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase());
            stmt.execute(params![first, last, email, age, city, active])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO products (name, category, price, stock_quantity, is_available, description)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        for (name, category, price, stock, available, description) in PRODUCTS {
            stmt.execute(params![name, category, price, stock, available, description])?;
        }

        let now = Utc::now();
        let mut order_stmt = tx.prepare(
            "INSERT INTO orders (user_id, order_date, total_amount, status) VALUES (?, ?, 0, ?)",
        )?;
        let mut item_stmt =
            tx.prepare("INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?, ?, ?, ?)")?;
        let mut total_stmt = tx.prepare("UPDATE orders SET total_amount = ? WHERE id = ?")?;

        for i in 0..ORDER_COUNT {
            let user_id = ((i * 7) % USERS.len() + 1) as i64;
            let days_ago = 1 + ((i * 13) % 90) as i64;
            let order_date = (now - Duration::days(days_ago)).format(DATE_FORMAT).to_string();
            let status = STATUSES[i % STATUSES.len()];

            order_stmt.execute(params![user_id, order_date, status])?;
            let order_id = tx.last_insert_rowid();

            let mut total = 0.0;
            for j in 0..(1 + i % 4) {
                let product = (i * 3 + j * 5) % PRODUCTS.len();
                let quantity = (1 + (i + j) % 3) as i64;
                let price = PRODUCTS[product].2;
                item_stmt.execute(params![order_id, (product + 1) as i64, quantity, price])?;
                total += price * quantity as f64;
            }

            let total = (total * 100.0).round() / 100.0;
            total_stmt.execute(params![total, order_id])?;
        }
    }

    tx.commit()?;
    tracing::info!(
        users = USERS.len(),
        products = PRODUCTS.len(),
        orders = ORDER_COUNT,
        "Seeded sample data"
    );
    Ok(())
}
