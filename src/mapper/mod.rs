//! Result mapping: turns the rows of a [`RowCursor`] into records.
//!
//! Column names are read once and resolved into [`Bindings`]; every row then
//! gets a fresh `T::default()` whose bound fields are filled by the cursor.

mod binding;

pub use binding::{Binding, Bindings};

use crate::db::RowCursor;
use crate::error::Result;
use crate::record::Record;
use crate::scan::{Discard, Scan};
use tracing::debug;

/// Maps every remaining row of `cursor` into a new record, in cursor order.
///
/// Does not close the cursor.
pub(crate) async fn scan_all<T: Record>(cursor: &mut dyn RowCursor) -> Result<Vec<T>> {
    let columns = cursor.columns().await?;
    let bindings = Bindings::resolve(&columns, T::fields());

    let mut records = Vec::new();
    while cursor.next().await? {
        let mut record = T::default();
        scan_record(cursor, &bindings, &mut record)?;
        records.push(record);
    }

    debug!(
        columns = bindings.len(),
        bound = bindings.bound(),
        rows = records.len(),
        "mapped rows"
    );
    Ok(records)
}

/// Scans the current row into `record`.
fn scan_record<T: Record>(
    cursor: &mut dyn RowCursor,
    bindings: &Bindings,
    record: &mut T,
) -> Result<()> {
    let mut slots: Vec<Option<&mut dyn Scan>> =
        record.scan_targets().into_iter().map(Some).collect();
    let mut discards = vec![Discard; bindings.len()];

    let mut targets: Vec<&mut dyn Scan> = Vec::with_capacity(bindings.len());
    for (binding, discard) in bindings.iter().zip(discards.iter_mut()) {
        let slot = match binding {
            Binding::Field(index) => slots.get_mut(*index).and_then(Option::take),
            Binding::Discard => None,
        };
        targets.push(slot.unwrap_or(discard as &mut dyn Scan));
    }

    cursor.scan(&mut targets)
}
