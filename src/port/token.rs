//! Token metadata boundary.

use crate::domain::TokenId;

/// Decimals and display metadata per token, cached by the implementor.
///
/// Used only to normalize base-unit amounts for valuation; icon and name
/// discovery stay with the UI collaborators.
pub trait TokenDirectory: Send + Sync {
    /// Number of base-unit decimals for a token.
    fn decimals(&self, token: &TokenId) -> Option<u32>;

    /// Display symbol for a token.
    fn symbol(&self, token: &TokenId) -> Option<String>;
}
