//! Tests for SQL rendering

use super::*;
use crate::schema::Disposition;

fn orders() -> TableRef {
    TableRef::new("raw", "orders")
}

#[test]
fn test_quote_rejects_injection() {
    assert_eq!(quote("orders").unwrap(), "`orders`");
    assert!(matches!(
        quote("orders`; DROP TABLE x"),
        Err(TableError::InvalidIdentifier(_))
    ));
    assert!(quote("").is_err());
}

#[test]
fn test_column_types() {
    let cases = [
        (FieldType::String, "String"),
        (FieldType::Integer, "Int64"),
        (FieldType::Float, "Float64"),
        (FieldType::Numeric, "Decimal(38, 9)"),
        (FieldType::Boolean, "Bool"),
        (FieldType::Timestamp, "DateTime64(6, 'UTC')"),
        (FieldType::DateTime, "DateTime64(6)"),
        (FieldType::Date, "Date32"),
        (FieldType::Time, "String"),
        (FieldType::Bytes, "String"),
        (FieldType::Json, "String"),
    ];
    for (field_type, expected) in cases {
        let field = FieldSchema::new("c", field_type).required();
        assert_eq!(column_type(&field), expected, "{field_type:?}");
    }
}

#[test]
fn test_optional_columns_are_nullable() {
    let field = FieldSchema::new("c", FieldType::Integer);
    assert_eq!(column_type(&field), "Nullable(Int64)");
}

#[test]
fn test_create_table() {
    let schema = Schema::new("orders", Disposition::Append)
        .with_description("Placed orders")
        .with_field(FieldSchema::new("id", FieldType::String).required())
        .with_field(FieldSchema::new("note", FieldType::String).with_description("it's free text"));

    let sql = create_table(&orders(), &schema).unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE `raw`.`orders` (`id` String, `note` Nullable(String) COMMENT 'it\\'s free text') \
         ENGINE = MergeTree ORDER BY tuple() COMMENT 'Placed orders'"
    );
}

#[test]
fn test_create_table_rejects_bad_column() {
    let schema = Schema::new("orders", Disposition::Append)
        .with_field(FieldSchema::new("bad name", FieldType::String));
    assert!(create_table(&orders(), &schema).is_err());
}

#[test]
fn test_copy_statements() {
    let scratch = TableRef::new("raw", "orders_swap_1");
    let temp = TableRef::new("raw", "orders_202110300916");

    assert_eq!(
        create_table_as(&scratch, &orders()).unwrap(),
        "CREATE TABLE `raw`.`orders_swap_1` AS `raw`.`orders`"
    );
    assert_eq!(
        insert_select(&scratch, &temp).unwrap(),
        "INSERT INTO `raw`.`orders_swap_1` SELECT * FROM `raw`.`orders_202110300916`"
    );
    assert_eq!(
        exchange(&scratch, &orders()).unwrap(),
        "EXCHANGE TABLES `raw`.`orders_swap_1` AND `raw`.`orders`"
    );
    assert_eq!(drop_table(&scratch).unwrap(), "DROP TABLE `raw`.`orders_swap_1`");
}

#[test]
fn test_insert() {
    assert_eq!(
        insert(&orders()).unwrap(),
        "INSERT INTO `raw`.`orders` FORMAT JSONEachRow"
    );
}
