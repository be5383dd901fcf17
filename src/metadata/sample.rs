//! Built-in catalog for the sample schema

use super::catalog::{Catalog, FieldMetadata, FieldType, TableMetadata};
use crate::rules::Operator::{self, *};

const ID_OPS: &[Operator] = &[Eq, Ne, Lt, Lte, Gt, Gte, In, NotIn];
const NUMBER_OPS: &[Operator] = &[Eq, Ne, Lt, Lte, Gt, Gte];
const RANGE_OPS: &[Operator] = &[Eq, Ne, Lt, Lte, Gt, Gte, Between];
const NAME_OPS: &[Operator] = &[Eq, Ne, Contains, BeginsWith, EndsWith, DoesNotContain];
const TEXT_OPS: &[Operator] = &[Eq, Ne, Contains, BeginsWith, EndsWith];
const CHOICE_OPS: &[Operator] = &[Eq, Ne, In, NotIn];

impl Catalog {
    /// Catalog matching the tables created by `db::schema`
    pub fn sample() -> Self {
        let users = TableMetadata::new("users", "Users")
            .field(FieldMetadata::number("id", "ID").operators(ID_OPS))
            .field(FieldMetadata::text("first_name", "First Name").operators(NAME_OPS))
            .field(FieldMetadata::text("last_name", "Last Name").operators(NAME_OPS))
            .field(FieldMetadata::text("email", "Email").operators(TEXT_OPS))
            .field(FieldMetadata::number("age", "Age").operators(&[Eq, Ne, Lt, Lte, Gt, Gte, Between, Null, NotNull]))
            .field(FieldMetadata::text("city", "City").operators(&[Eq, Ne, Contains, In, NotIn, Null, NotNull]))
            .field(FieldMetadata::text("country", "Country").operators(CHOICE_OPS))
            .field(FieldMetadata::boolean("is_active", "Is Active").operators(&[Eq]));

        let products = TableMetadata::new("products", "Products")
            .field(FieldMetadata::number("id", "ID").operators(ID_OPS))
            .field(FieldMetadata::text("name", "Product Name").operators(TEXT_OPS))
            .field(
                FieldMetadata::new("category", "Category", FieldType::Select)
                    .values(["Electronics", "Furniture"])
                    .operators(CHOICE_OPS),
            )
            .field(FieldMetadata::number("price", "Price").operators(RANGE_OPS))
            .field(FieldMetadata::number("stock_quantity", "Stock Quantity").operators(NUMBER_OPS))
            .field(FieldMetadata::boolean("is_available", "Is Available").operators(&[Eq]));

        let orders = TableMetadata::new("orders", "Orders")
            .field(FieldMetadata::number("id", "Order ID").operators(ID_OPS))
            .field(FieldMetadata::number("user_id", "User ID").operators(ID_OPS))
            .field(FieldMetadata::number("total_amount", "Total Amount").operators(RANGE_OPS))
            .field(
                FieldMetadata::new("status", "Status", FieldType::Select)
                    .values(["pending", "completed", "shipped", "cancelled"])
                    .operators(CHOICE_OPS),
            )
            .field(
                FieldMetadata::new("order_date", "Order Date", FieldType::Date)
                    .input_type("date")
                    .operators(&[Lt, Lte, Gt, Gte, Between]),
            );

        let order_items = TableMetadata::new("order_items", "Order Items")
            .field(FieldMetadata::number("id", "Item ID").operators(ID_OPS))
            .field(FieldMetadata::number("order_id", "Order ID").operators(ID_OPS))
            .field(FieldMetadata::number("product_id", "Product ID").operators(ID_OPS))
            .field(FieldMetadata::number("quantity", "Quantity").operators(NUMBER_OPS))
            .field(FieldMetadata::number("price", "Unit Price").operators(RANGE_OPS));

        Self {
            tables: vec![users, products, orders, order_items],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_is_valid() {
        Catalog::sample().validate().unwrap();
    }

    #[test]
    fn test_sample_subquery_links() {
        let catalog = Catalog::sample();

        assert!(catalog.field("users", "id").unwrap().allows(In));
        assert!(catalog.field("orders", "user_id").unwrap().allows(NotIn));
        assert!(catalog.field("order_items", "product_id").unwrap().allows(In));
    }
}
