//! JSONEachRow encoding of record batches

use uuid::Uuid;

use crate::record::BoxedRecord;
use crate::table::TableError;

/// Insert body plus the optional deduplication token
#[derive(Debug)]
pub(crate) struct EncodedRows {
    pub body: String,
    pub rows: usize,
    /// Present only when every row carried an insert id
    pub dedup_token: Option<String>,
}

pub(crate) fn encode_rows(records: &[BoxedRecord]) -> Result<EncodedRows, TableError> {
    let mut body = String::new();
    let mut ids = Vec::with_capacity(records.len());
    let mut all_ids = true;

    for record in records {
        let row = record.save()?;
        let line = serde_json::to_string(&row.values)
            .map_err(|e| TableError::serialization(e.to_string()))?;
        body.push_str(&line);
        body.push('\n');
        match row.insert_id {
            Some(id) => ids.push(id),
            None => all_ids = false,
        }
    }

    let dedup_token = (all_ids && !ids.is_empty())
        .then(|| Uuid::new_v5(&Uuid::NAMESPACE_OID, ids.join("\n").as_bytes()).to_string());

    Ok(EncodedRows {
        body,
        rows: records.len(),
        dedup_token,
    })
}
