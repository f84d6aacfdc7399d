//! docket-core: Shared types, ID allocators, config and errors for the docket
//! documentation engine.

pub mod config;
pub mod error;
pub mod ids;
pub mod number_set;
pub mod symbol;
pub mod topic;
pub mod types;

pub use config::{DocketConfig, StorageConfig, TokenizerConfig};
pub use error::*;
pub use ids::IdAllocators;
pub use number_set::NumberSet;
pub use symbol::{EndingSymbol, Symbol};
pub use topic::{DatabaseCompareResult, Topic};
pub use types::*;
