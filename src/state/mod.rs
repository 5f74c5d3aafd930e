//! State types of the liquidity ledger

pub mod last_update;
pub mod limit;
pub mod position;
pub mod record;
pub mod token;

pub use last_update::*;
pub use limit::*;
pub use position::*;
pub use record::*;
pub use token::*;
