use anchor_lang::prelude::*;

#[event]
pub struct PoolInitialized {
    pub pool: Pubkey,
    pub creator: Pubkey,
    pub loan_mint: Pubkey,
    pub coll_mint: Pubkey,
    pub loan_tenor: i64,
    pub max_loan_per_coll: u64,
    pub r1: u64,
    pub r2: u64,
    pub liquidity_bnd_1: u64,
    pub liquidity_bnd_2: u64,
    pub min_loan: u64,
    pub base_aggr_bucket_size: u64,
    pub creator_fee: u64,
}

#[event]
pub struct LiquidityAdded {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub shares_minted: u64,
    pub total_liquidity: u64,
    pub total_lp_shares: u64,
    pub earliest_remove: i64,
    pub dust_swept: u64,
    pub referral_code: u64,
}

#[event]
pub struct LiquidityRemoved {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub shares_burned: u64,
    pub total_liquidity: u64,
    pub total_lp_shares: u64,
}

#[event]
pub struct Borrowed {
    pub pool: Pubkey,
    pub borrower: Pubkey,
    pub loan_idx: u64,
    pub collateral: u64,
    pub loan_amount: u64,
    pub repayment_amount: u64,
    pub creator_fee_amount: u64,
    pub expiry: i64,
    pub total_liquidity: u64,
    pub total_lp_shares: u64,
    pub referral_code: u64,
}

#[event]
pub struct Repaid {
    pub pool: Pubkey,
    pub loan_idx: u64,
    pub repayment_amount: u64,
    pub collateral_returned: u64,
    pub recipient: Pubkey,
}

#[event]
pub struct RolledOver {
    pub pool: Pubkey,
    pub old_loan_idx: u64,
    pub new_loan_idx: u64,
    pub collateral: u64,
    pub loan_amount: u64,
    pub repayment_amount: u64,
    pub creator_fee_amount: u64,
    pub expiry: i64,
    pub total_liquidity: u64,
}

#[event]
pub struct Claimed {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub from_loan_idx: u64,
    pub to_loan_idx: u64,
    pub repayments: u64,
    pub collateral: u64,
    pub reinvested: bool,
}

#[event]
pub struct ClaimedFromAggregated {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub from_loan_idx: u64,
    pub to_loan_idx: u64,
    pub repayments: u64,
    pub collateral: u64,
    pub reinvested: bool,
}

#[event]
pub struct Reinvested {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub shares_minted: u64,
    pub total_liquidity: u64,
    pub total_lp_shares: u64,
    pub earliest_remove: i64,
}

#[event]
pub struct ApprovalsSet {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub delegate: Pubkey,
    pub repay: bool,
    pub roll_over: bool,
    pub add_liquidity: bool,
    pub remove_liquidity: bool,
    pub claim: bool,
}

#[event]
pub struct TermsUpdated {
    pub pool: Pubkey,
    pub max_loan_per_coll: u64,
    pub r1: u64,
    pub r2: u64,
    pub liquidity_bnd_1: u64,
    pub liquidity_bnd_2: u64,
    pub min_loan: u64,
    pub creator_fee: u64,
}

#[event]
pub struct CreatorProposed {
    pub pool: Pubkey,
    pub current_creator: Pubkey,
    pub proposed_creator: Pubkey,
}

#[event]
pub struct CreatorClaimed {
    pub pool: Pubkey,
    pub old_creator: Pubkey,
    pub new_creator: Pubkey,
}
