//! Pure building blocks for deferred deep link resolution: link identifier
//! validation and install-referrer query decoding.

/// Link identifier format checks.
pub mod ident;
/// Ampersand-delimited, percent-encoded query decoding.
pub mod query;

pub use ident::{Identifier, MAX_IDENTIFIER_LEN, MIN_IDENTIFIER_LEN, is_valid_identifier};
pub use query::{QueryParams, decode_component, parse_query};
