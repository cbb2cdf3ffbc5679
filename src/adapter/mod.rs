//! Site adapters
//!
//! # Components
//!
//! - `SiteAdapter`: the trait the runner talks to
//! - `SelectorAdapter`: an adapter driven by CSS selectors from the config
//! - `profiles`: built-in selector sets for known retailers

pub mod profiles;
mod selector;
mod traits;

pub use selector::SelectorAdapter;
pub use traits::{Classification, SiteAdapter};
