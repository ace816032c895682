pub mod ledger;
pub mod memory;
pub mod traits;

// Re-export
pub use ledger::{LedgerStore, LedgerTxn};
pub use memory::InMemoryLedger;
pub use traits::LedgerRepository;
