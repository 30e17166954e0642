//! hsql - Map SQL result sets onto plain Rust structs.
//!
//! Declare a struct with [`record!`], then fetch into it with one of the four
//! executors: [`fetch_one`], [`fetch_all`], [`tx_fetch_one`] and
//! [`tx_fetch_all`]. Columns are matched to fields by explicit tag first,
//! then by name after camel-case normalization, then with underscores
//! ignored. Columns no field claims are read and dropped.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mapper;
pub mod naming;
pub mod record;
pub mod scan;

pub use context::Context;
pub use db::{Database, RowCursor, Transaction, Value};
pub use error::{DecodeError, HsqlError, Result};
pub use executor::{fetch_all, fetch_one, tx_fetch_all, tx_fetch_one, Destination, DestinationKind};
pub use naming::{camel_to_underscore, strip_underscores, underscore_to_camel};
pub use record::{FieldDef, Record};
pub use scan::{Discard, FromValue, Scan};
