use serde_json::{Value, json};

/// The maximum number of rows a listing hands back by default.
pub const ROW_CAP: usize = 50;

/// The field that wraps the rows of a data source listing.
pub(crate) const ROWS_FIELD: &str = "entries";

/// Caps a row listing to at most `cap` rows.
///
/// The rows are either the payload itself (a bare array) or the array
/// under `field`. Listings within the cap, and payloads that carry no row
/// array at all, pass through unchanged. Larger listings are replaced by
/// a summary object holding the first `cap` rows in their original order.
pub fn cap_rows(payload: Value, field: &str, cap: usize) -> Value {
    let rows = match &payload {
        Value::Array(rows) => rows,
        Value::Object(map) => match map.get(field) {
            Some(Value::Array(rows)) => rows,
            _ => return payload,
        },
        _ => return payload,
    };
    if rows.len() <= cap {
        return payload;
    }

    let total = rows.len();
    debug!("capping row listing from {total} to {cap} rows");
    let entries = rows.iter().take(cap).cloned().collect::<Vec<_>>();
    json!({
        "truncated": true,
        "totalCount": total,
        "shownCount": cap,
        "note": format!(
            "Only the first {cap} of {total} entries are shown. \
             Answer from these, or ask the user to narrow the question."
        ),
        "entries": entries,
    })
}
