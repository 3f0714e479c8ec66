mod pg_balance_store;
mod sns_event_publisher;

pub use pg_balance_store::*;
pub use sns_event_publisher::*;
