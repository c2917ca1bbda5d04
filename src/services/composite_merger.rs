use std::collections::BTreeMap;

use crate::models::date_key::DateKey;
use crate::models::entry::StatEntry;
use crate::models::report::CompositeRow;
use crate::models::stat::MAX_COMPOSITE_LINES;

/// One row per distinct date key, ascending. Series beyond the third are ignored.
pub fn merge(series: &[Vec<StatEntry>]) -> Vec<CompositeRow> {
    let mut rows: BTreeMap<DateKey, CompositeRow> = BTreeMap::new();

    for (line, entries) in series.iter().take(MAX_COMPOSITE_LINES).enumerate() {
        for entry in entries {
            rows.entry(entry.date_key)
                .or_insert_with(|| CompositeRow::empty(entry.date_key))
                .set_value(line, entry.value);
        }
    }

    rows.into_values().collect()
}
