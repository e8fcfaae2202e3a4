//! Tests for temporary table naming

use super::*;
use crate::schema::{FieldSchema, FieldType};
use chrono::TimeZone;

#[test]
fn test_temp_table_name() {
    let at = Utc
        .with_ymd_and_hms(2021, 10, 30, 9, 16, 1)
        .unwrap()
        .checked_add_signed(chrono::Duration::nanoseconds(1))
        .unwrap();
    assert_eq!(temp_table_name("basetable", at), "basetable_202110300916");
}

#[test]
fn test_temp_table_name_zero_pads() {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 59).unwrap();
    assert_eq!(temp_table_name("t", at), "t_202401020304");
}

#[test]
fn test_temp_table_name_uses_utc() {
    let offset = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
    let local = offset.with_ymd_and_hms(2021, 10, 30, 11, 16, 0).unwrap();
    assert_eq!(
        temp_table_name("basetable", local.with_timezone(&Utc)),
        "basetable_202110300916"
    );
}

#[test]
fn test_temp_table_schema() {
    let schema = Schema::new("orders", Disposition::Truncate)
        .with_field(FieldSchema::new("id", FieldType::String).required())
        .with_field(FieldSchema::new("amount", FieldType::Numeric));

    let temp = temp_table_schema("orders_202110300916".into(), &schema);
    assert_eq!(temp.name, "orders_202110300916");
    assert_eq!(temp.disposition, Disposition::Empty);
    assert_eq!(temp.fields, schema.fields);
}

#[test]
fn test_identifiers() {
    assert!(is_valid_identifier("orders"));
    assert!(is_valid_identifier("_private"));
    assert!(is_valid_identifier("t_202110300916"));

    assert!(!is_valid_identifier(""));
    assert!(!is_valid_identifier("1table"));
    assert!(!is_valid_identifier("drop table"));
    assert!(!is_valid_identifier("a`b"));
    assert!(!is_valid_identifier("a.b"));
}
