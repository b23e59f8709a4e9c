pub const POOL_SEED: &[u8] = b"pool";
pub const LOAN_VAULT_SEED: &[u8] = b"loan_vault";
pub const COLL_VAULT_SEED: &[u8] = b"coll_vault";
pub const LP_POSITION_SEED: &[u8] = b"lp_position";
pub const LOAN_SEED: &[u8] = b"loan";
pub const BUCKET_SEED: &[u8] = b"bucket";
pub const APPROVAL_SEED: &[u8] = b"approval";

/// Fixed-point base for rates and fees (1.0 = 10^18)
pub const BASE: u128 = 1_000_000_000_000_000_000;

/// Fixed-point base for per-share aggregation sums (1.0 = 10^18)
pub const SHARE_BASE: u128 = 1_000_000_000_000_000_000;

/// Liquidity floor; the pool can never be drained below this amount
pub const MIN_LIQUIDITY: u64 = 100_000_000;

/// Shares minted per MIN_LIQUIDITY of the bootstrap deposit
pub const BOOTSTRAP_SHARES: u64 = 1_000;

/// Seconds an LP must wait between adding and removing liquidity
pub const MIN_LPING_PERIOD: i64 = 120;

/// Maximum creator fee: 5% (BASE-scaled)
pub const MAX_CREATOR_FEE: u64 = 50_000_000_000_000_000;

/// Minimum loan tenor: one day
pub const MIN_LOAN_TENOR: i64 = 86_400;

/// Aggregation bucket size bounds; the size must be a multiple of 10
pub const MIN_BASE_AGGR_BUCKET_SIZE: u64 = 10;
pub const MAX_BASE_AGGR_BUCKET_SIZE: u64 = 10_000;

/// Maximum share checkpoints per LP before the history must be
/// collapsed by claiming through the present
pub const MAX_SHARE_CHECKPOINTS: usize = 128;
