//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points the engine is built against: the
//! ledger's read and event interfaces, the price feed, and the token
//! metadata directory. Adapters implement them for real backends; the
//! testkit implements them for tests.

mod ledger;
mod price;
mod token;

pub use ledger::{LedgerEventStream, LedgerReader};
pub use price::{PriceFeed, PricePoint};
pub use token::TokenDirectory;
