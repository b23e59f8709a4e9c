use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::{Claimed, Reinvested};
use crate::state::{ApprovalGrant, LoanRecord, LpPosition, Pool};

#[derive(Accounts)]
pub struct Claim<'info> {
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

/// Claims proceeds of the settled loans in `loan_idxs`, one `LoanRecord`
/// per index passed via `remaining_accounts` in the same order.
pub fn handle_claim<'info>(
    ctx: Context<'_, '_, 'info, 'info, Claim<'info>>,
    loan_idxs: Vec<u64>,
    reinvest: bool,
    deadline: i64,
) -> Result<()> {
    let clock = Clock::get()?;
    require!(clock.unix_timestamp <= deadline, TermPoolError::PastDeadline);
    require!(!loan_idxs.is_empty(), TermPoolError::NothingToClaim);

    ApprovalGrant::require_approval(
        &ctx.accounts.caller.key(),
        &ctx.accounts.owner.key(),
        &ctx.accounts.pool.key(),
        ctx.accounts.approval.as_deref(),
        |f| f.claim,
    )?;

    let position = &mut ctx.accounts.lp_position;
    require!(
        !position.shares_over_time.is_empty(),
        TermPoolError::MustBeLp
    );
    position.skip_zero_share_spans();

    let first_idx = loan_idxs[0];
    let last_idx = loan_idxs[loan_idxs.len() - 1];
    let shares = position.applicable_shares(first_idx, last_idx)?;

    let pool_key = ctx.accounts.pool.key();
    require!(
        ctx.remaining_accounts.len() == loan_idxs.len(),
        TermPoolError::InvalidLoanIdx
    );
    let now = clock.unix_timestamp;
    let mut repayments: u64 = 0;
    let mut collateral: u64 = 0;
    let mut prev_idx: u64 = 0;
    for (idx, account_info) in loan_idxs.iter().copied().zip(ctx.remaining_accounts) {
        require!(idx > prev_idx, TermPoolError::NonAscendingLoanIdxs);
        require!(
            idx >= 1 && idx < ctx.accounts.pool.loan_idx,
            TermPoolError::InvalidLoanIdx
        );
        let loan = Account::<LoanRecord>::try_from(account_info)
            .map_err(|_| TermPoolError::InvalidLoanIdx)?;
        require!(
            loan.pool == pool_key && loan.loan_idx == idx,
            TermPoolError::InvalidLoanIdx
        );
        require!(
            loan.is_settled(now),
            TermPoolError::CannotClaimWithUnsettledLoan
        );
        let (repay_share, coll_share) = loan.lp_entitlement(shares)?;
        repayments = repayments
            .checked_add(repay_share)
            .ok_or(TermPoolError::MathOverflow)?;
        collateral = collateral
            .checked_add(coll_share)
            .ok_or(TermPoolError::MathOverflow)?;
        prev_idx = idx;
    }

    // Entitlements that floor to zero still advance the frontier; a dust
    // position must be able to claim through the present and exit.
    let position = &mut ctx.accounts.lp_position;
    position.advance_claim_frontier(last_idx)?;

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
        now,
    )?;

    emit!(Claimed {
        pool: pool_key,
        owner: ctx.accounts.owner.key(),
        from_loan_idx: first_idx,
        to_loan_idx: last_idx,
        repayments,
        collateral,
        reinvested,
    });

    Ok(())
}

/// Shared tail of both claim paths: either reinvests the loan-currency
/// proceeds as fresh shares or transfers them out. Reinvestment is skipped
/// (falling back to a payout) when the amount would mint zero shares.
pub fn settle_repayment_proceeds<'info>(
    pool: &mut Account<'info, Pool>,
    position: &mut Account<'info, LpPosition>,
    token_program: &Program<'info, Token>,
    loan_vault: &Account<'info, TokenAccount>,
    owner_loan_account: &Account<'info, TokenAccount>,
    pool_seeds: &[&[u8]],
    repayments: u64,
    reinvest: bool,
    now: i64,
) -> Result<bool> {
    if repayments == 0 {
        return Ok(false);
    }
    if reinvest {
        let minted = pool.shares_for_amount(repayments)?;
        if minted > 0 {
            pool.total_liquidity = pool
                .total_liquidity
                .checked_add(repayments)
                .ok_or(TermPoolError::MathOverflow)?;
            pool.total_lp_shares = pool
                .total_lp_shares
                .checked_add(minted)
                .ok_or(TermPoolError::MathOverflow)?;
            position.record_add(minted, pool.loan_idx, now)?;
            emit!(Reinvested {
                pool: pool.key(),
                owner: position.owner,
                amount: repayments,
                shares_minted: minted,
                total_liquidity: pool.total_liquidity,
                total_lp_shares: pool.total_lp_shares,
                earliest_remove: position.earliest_remove,
            });
            return Ok(true);
        }
    }
    token::transfer(
        CpiContext::new_with_signer(
            token_program.to_account_info(),
            Transfer {
                from: loan_vault.to_account_info(),
                to: owner_loan_account.to_account_info(),
                authority: pool.to_account_info(),
            },
            &[pool_seeds],
        ),
        repayments,
    )?;
    Ok(false)
}
