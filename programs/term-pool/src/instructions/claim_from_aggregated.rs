use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::ClaimedFromAggregated;
use crate::instructions::claim::settle_repayment_proceeds;
use crate::state::{
    first_bucket_index, validate_bucket_boundaries, AggregationBucket, ApprovalGrant, LoanRecord,
    LpPosition, Pool,
};

#[derive(Accounts)]
pub struct ClaimFromAggregated<'info> {
    #[account(
        mut,
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    #[account(
        mut,
        seeds = [LP_POSITION_SEED, pool.key().as_ref(), owner.key().as_ref()],
        bump = lp_position.bump,
        constraint = lp_position.owner == owner.key() @ TermPoolError::MustBeLp,
    )]
    pub lp_position: Account<'info, LpPosition>,

    /// CHECK: position owner; claims are paid to accounts this key owns
    pub owner: UncheckedAccount<'info>,

    pub caller: Signer<'info>,

    pub approval: Option<Account<'info, ApprovalGrant>>,

    /// The last loan covered by the claim. Expiries are monotone in the
    /// loan index, so this single record past expiry proves every loan in
    /// the range is settled one way or the other.
    pub last_loan: Account<'info, LoanRecord>,

    #[account(
        mut,
        seeds = [LOAN_VAULT_SEED, pool.key().as_ref()],
        bump = pool.loan_vault_bump,
    )]
    pub loan_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [COLL_VAULT_SEED, pool.key().as_ref()],
        bump = pool.coll_vault_bump,
    )]
    pub coll_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = owner_loan_account.owner == owner.key() @ TermPoolError::Unauthorized,
        constraint = owner_loan_account.mint == pool.loan_mint @ TermPoolError::MintMismatch,
    )]
    pub owner_loan_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = owner_coll_account.owner == owner.key() @ TermPoolError::Unauthorized,
        constraint = owner_coll_account.mint == pool.coll_mint @ TermPoolError::MintMismatch,
    )]
    pub owner_coll_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

/// Claims over whole aggregation buckets at once. `bucket_boundaries` are
/// loan indices delimiting the range (each a multiple of the base bucket
/// size, the first may be 1); the covered buckets are passed via
/// `remaining_accounts` in ascending index order.
pub fn handle_claim_from_aggregated<'info>(
    ctx: Context<'_, '_, 'info, 'info, ClaimFromAggregated<'info>>,
    bucket_boundaries: Vec<u64>,
    reinvest: bool,
    deadline: i64,
) -> Result<()> {
    let clock = Clock::get()?;
    require!(clock.unix_timestamp <= deadline, TermPoolError::PastDeadline);

    ApprovalGrant::require_approval(
        &ctx.accounts.caller.key(),
        &ctx.accounts.owner.key(),
        &ctx.accounts.pool.key(),
        ctx.accounts.approval.as_deref(),
        |f| f.claim,
    )?;

    let base = ctx.accounts.pool.base_aggr_bucket_size;
    validate_bucket_boundaries(base, &bucket_boundaries)?;
    let first_boundary = bucket_boundaries[0];
    let last_boundary = bucket_boundaries[bucket_boundaries.len() - 1];
    // [first_boundary, last_boundary) in loan indices
    let end_idx = last_boundary - 1;
    require!(
        end_idx < ctx.accounts.pool.loan_idx,
        TermPoolError::InvalidLoanIdx
    );

    let pool_key = ctx.accounts.pool.key();
    let last_loan = &ctx.accounts.last_loan;
    require!(
        last_loan.pool == pool_key && last_loan.loan_idx == end_idx,
        TermPoolError::InvalidLoanIdx
    );
    require!(
        clock.unix_timestamp > last_loan.expiry,
        TermPoolError::CannotClaimWithUnsettledLoan
    );

    let position = &mut ctx.accounts.lp_position;
    require!(
        !position.shares_over_time.is_empty(),
        TermPoolError::MustBeLp
    );
    position.skip_zero_share_spans();
    let shares = position.applicable_shares(first_boundary, end_idx)?;

    let first_bucket = first_bucket_index(base, first_boundary);
    let last_bucket = last_boundary / base;
    let expected = (last_bucket - first_bucket) as usize;
    require!(
        ctx.remaining_accounts.len() == expected,
        TermPoolError::InvalidSubAggregation
    );

    let mut repayments: u64 = 0;
    let mut collateral: u64 = 0;
    for (k, account_info) in ctx.remaining_accounts.iter().enumerate() {
        let bucket = Account::<AggregationBucket>::try_from(account_info)
            .map_err(|_| TermPoolError::InvalidSubAggregation)?;
        require!(
            bucket.pool == pool_key && bucket.index == first_bucket + k as u64,
            TermPoolError::InvalidSubAggregation
        );
        let (repay_sum, coll_sum) = bucket.claims_for_shares(shares)?;
        repayments = repayments
            .checked_add(repay_sum)
            .ok_or(TermPoolError::MathOverflow)?;
        collateral = collateral
            .checked_add(coll_sum)
            .ok_or(TermPoolError::MathOverflow)?;
    }

    // Entitlements that floor to zero still advance the frontier; a dust
    // position must be able to claim through the present and exit.
    let position = &mut ctx.accounts.lp_position;
    position.advance_claim_frontier(end_idx)?;

    let loan_mint = ctx.accounts.pool.loan_mint;
    let coll_mint = ctx.accounts.pool.coll_mint;
    let pool_bump = ctx.accounts.pool.bump;
    let pool_seeds = &[
        POOL_SEED,
        loan_mint.as_ref(),
        coll_mint.as_ref(),
        &[pool_bump],
    ];

    if collateral > 0 {
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.coll_vault.to_account_info(),
                    to: ctx.accounts.owner_coll_account.to_account_info(),
                    authority: ctx.accounts.pool.to_account_info(),
                },
                &[pool_seeds],
            ),
            collateral,
        )?;
    }

    let reinvested = settle_repayment_proceeds(
        &mut ctx.accounts.pool,
        &mut ctx.accounts.lp_position,
        &ctx.accounts.token_program,
        &ctx.accounts.loan_vault,
        &ctx.accounts.owner_loan_account,
        pool_seeds,
        repayments,
        reinvest,
        clock.unix_timestamp,
    )?;

    emit!(ClaimedFromAggregated {
        pool: pool_key,
        owner: ctx.accounts.owner.key(),
        from_loan_idx: first_boundary,
        to_loan_idx: end_idx,
        repayments,
        collateral,
        reinvested,
    });

    Ok(())
}
