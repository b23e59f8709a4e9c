use anchor_lang::prelude::*;

pub mod constants;
pub mod curve;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;

use instructions::*;
use state::ApprovalFlags;

declare_id!("7PSunTw68XzNT8hEM5KkRL66MWqjWy21hAFHfsipp7gw");

#[program]
pub mod term_pool {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    pub fn initialize_pool(
        ctx: Context<InitializePool>,
        loan_tenor: i64,
        max_loan_per_coll: u64,
        r1: u64,
        r2: u64,
        liquidity_bnd_1: u64,
        liquidity_bnd_2: u64,
        min_loan: u64,
        base_aggr_bucket_size: u64,
        creator_fee: u64,
    ) -> Result<()> {
        instructions::initialize_pool::handle_initialize_pool(
            ctx,
            loan_tenor,
            max_loan_per_coll,
            r1,
            r2,
            liquidity_bnd_1,
            liquidity_bnd_2,
            min_loan,
            base_aggr_bucket_size,
            creator_fee,
        )
    }

    pub fn add_liquidity(
        ctx: Context<AddLiquidity>,
        amount: u64,
        deadline: i64,
        referral_code: u64,
    ) -> Result<()> {
        instructions::add_liquidity::handle_add_liquidity(ctx, amount, deadline, referral_code)
    }

    pub fn remove_liquidity(ctx: Context<RemoveLiquidity>, num_shares: u64) -> Result<()> {
        instructions::remove_liquidity::handle_remove_liquidity(ctx, num_shares)
    }

    pub fn borrow(
        ctx: Context<Borrow>,
        pledge_amount: u64,
        min_loan_limit: u64,
        max_repay_limit: u64,
        deadline: i64,
        referral_code: u64,
    ) -> Result<()> {
        instructions::borrow::handle_borrow(
            ctx,
            pledge_amount,
            min_loan_limit,
            max_repay_limit,
            deadline,
            referral_code,
        )
    }

    pub fn repay(ctx: Context<Repay>, loan_idx: u64, send_amount: u64) -> Result<()> {
        instructions::repay::handle_repay(ctx, loan_idx, send_amount)
    }

    pub fn roll_over(
        ctx: Context<RollOver>,
        loan_idx: u64,
        min_loan_limit: u64,
        max_repay_limit: u64,
        deadline: i64,
        send_amount: u64,
    ) -> Result<()> {
        instructions::roll_over::handle_roll_over(
            ctx,
            loan_idx,
            min_loan_limit,
            max_repay_limit,
            deadline,
            send_amount,
        )
    }

    pub fn claim<'info>(
        ctx: Context<'_, '_, 'info, 'info, Claim<'info>>,
        loan_idxs: Vec<u64>,
        reinvest: bool,
        deadline: i64,
    ) -> Result<()> {
        instructions::claim::handle_claim(ctx, loan_idxs, reinvest, deadline)
    }

    pub fn claim_from_aggregated<'info>(
        ctx: Context<'_, '_, 'info, 'info, ClaimFromAggregated<'info>>,
        bucket_boundaries: Vec<u64>,
        reinvest: bool,
        deadline: i64,
    ) -> Result<()> {
        instructions::claim_from_aggregated::handle_claim_from_aggregated(
            ctx,
            bucket_boundaries,
            reinvest,
            deadline,
        )
    }

    pub fn set_approvals(
        ctx: Context<SetApprovals>,
        delegate: Pubkey,
        flags: ApprovalFlags,
    ) -> Result<()> {
        instructions::set_approvals::handle_set_approvals(ctx, delegate, flags)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_terms(
        ctx: Context<UpdateTerms>,
        new_max_loan_per_coll: Option<u64>,
        new_r1: Option<u64>,
        new_r2: Option<u64>,
        new_liquidity_bnd_1: Option<u64>,
        new_liquidity_bnd_2: Option<u64>,
        new_min_loan: Option<u64>,
        new_creator_fee: Option<u64>,
    ) -> Result<()> {
        instructions::update_terms::handle_update_terms(
            ctx,
            new_max_loan_per_coll,
            new_r1,
            new_r2,
            new_liquidity_bnd_1,
            new_liquidity_bnd_2,
            new_min_loan,
            new_creator_fee,
        )
    }

    pub fn propose_new_creator(ctx: Context<ProposeNewCreator>, new_creator: Pubkey) -> Result<()> {
        instructions::transfer_creator::handle_propose_new_creator(ctx, new_creator)
    }

    pub fn claim_creator(ctx: Context<ClaimCreator>) -> Result<()> {
        instructions::transfer_creator::handle_claim_creator(ctx)
    }
}
