//! Singular forms of table names.
//!
//! Foreign key columns are usually named after the singular of the table they
//! reference (`customer_id` → `customers`). Only the last snake_case segment
//! of a table name is inflected, so `order_items` becomes `order_item`.

use inflector::Inflector;

/// Plurals the inflector gets wrong for schema vocabulary.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("status", "statuses"),
    ("address", "addresses"),
    ("analysis", "analyses"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
];

/// Singularize one lowercase word.
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return singular.to_string();
        }
    }

    lower.to_singular()
}

/// Singularize the last segment of a snake_case table name.
///
/// ```ignore
/// assert_eq!(singular_table_name("customers"), "customer");
/// assert_eq!(singular_table_name("order_items"), "order_item");
/// assert_eq!(singular_table_name("People"), "person");
/// ```
pub fn singular_table_name(table: &str) -> String {
    let lower = table.to_lowercase();
    match lower.rsplit_once('_') {
        Some((head, last)) if !last.is_empty() => format!("{}_{}", head, singularize(last)),
        _ => singularize(&lower),
    }
}
