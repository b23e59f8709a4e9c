pub mod initialize_pool;
pub mod add_liquidity;
pub mod remove_liquidity;
pub mod borrow;
pub mod repay;
pub mod roll_over;
pub mod claim;
pub mod claim_from_aggregated;
pub mod set_approvals;
pub mod update_terms;
pub mod transfer_creator;

pub use initialize_pool::*;
pub use add_liquidity::*;
pub use remove_liquidity::*;
pub use borrow::*;
pub use repay::*;
pub use roll_over::*;
pub use claim::*;
pub use claim_from_aggregated::*;
pub use set_approvals::*;
pub use update_terms::*;
pub use transfer_creator::*;
