//! Shared catalog used by unit tests across subsystems

use super::{Catalog, CatalogDef, EntityDef, FieldDef, FilterOperator, Requirement, ValueKind};

/// Order (time field, no requirement) and Payment (time range required).
pub fn sample_definition() -> CatalogDef {
    CatalogDef {
        entities: vec![
            EntityDef {
                name: "Order".into(),
                table: "orders".into(),
                time_field: Some("createdAt".into()),
                requires: vec![],
                fields: vec![
                    FieldDef::new("id", "id", ValueKind::Number).unique(),
                    FieldDef::new("status", "status", ValueKind::String),
                    FieldDef::new("totalAmount", "total_amount", ValueKind::Number),
                    FieldDef::new("customerName", "customer_name", ValueKind::String),
                    FieldDef::new("paid", "is_paid", ValueKind::Boolean),
                    FieldDef::new("createdAt", "created_at", ValueKind::Timestamp),
                ],
            },
            EntityDef {
                name: "Payment".into(),
                table: "payments".into(),
                time_field: Some("paidAt".into()),
                requires: vec![Requirement::RequiresTimeRange],
                fields: vec![
                    FieldDef::new("id", "payment_id", ValueKind::Number).unique(),
                    FieldDef::new("amount", "amount", ValueKind::Number),
                    FieldDef::new("method", "pay_method", ValueKind::String)
                        .with_operators([FilterOperator::Eq, FilterOperator::In]),
                    FieldDef::new("paidAt", "paid_at", ValueKind::Timestamp),
                ],
            },
        ],
    }
}

pub fn sample_catalog() -> Catalog {
    Catalog::from_definition(&sample_definition(), 1).expect("fixture catalog is valid")
}
