mod balance_store;
mod notifier;
mod withdrawal;

#[cfg(test)]
pub mod testing;

pub use balance_store::*;
pub use notifier::*;
pub use withdrawal::*;
