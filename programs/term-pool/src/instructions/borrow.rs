use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::curve;
use crate::errors::TermPoolError;
use crate::events::Borrowed;
use crate::state::{AggregationBucket, LoanRecord, Pool};

#[derive(Accounts)]
pub struct Borrow<'info> {
    #[account(
        mut,
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    #[account(
        init,
        seeds = [LOAN_SEED, pool.key().as_ref(), &pool.loan_idx.to_le_bytes()],
        bump,
        payer = caller,
        space = 8 + LoanRecord::INIT_SPACE,
    )]
    pub loan: Account<'info, LoanRecord>,

    #[account(
        init_if_needed,
        seeds = [
            BUCKET_SEED,
            pool.key().as_ref(),
            &(pool.loan_idx / pool.base_aggr_bucket_size).to_le_bytes(),
        ],
        bump,
        payer = caller,
        space = 8 + AggregationBucket::INIT_SPACE,
    )]
    pub bucket: Account<'info, AggregationBucket>,

    /// CHECK: borrower of record; may later repay and receive the collateral
    pub borrower: UncheckedAccount<'info>,

    #[account(mut)]
    pub caller: Signer<'info>,

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
        constraint = caller_coll_account.mint == pool.coll_mint @ TermPoolError::MintMismatch,
    )]
    pub caller_coll_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = caller_loan_account.mint == pool.loan_mint @ TermPoolError::MintMismatch,
    )]
    pub caller_loan_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = creator_coll_account.owner == pool.creator @ TermPoolError::Unauthorized,
        constraint = creator_coll_account.mint == pool.coll_mint @ TermPoolError::MintMismatch,
    )]
    pub creator_coll_account: Account<'info, TokenAccount>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
}

pub fn handle_borrow(
    ctx: Context<Borrow>,
    pledge_amount: u64,
    min_loan_limit: u64,
    max_repay_limit: u64,
    deadline: i64,
    referral_code: u64,
) -> Result<()> {
    let clock = Clock::get()?;
    let now = clock.unix_timestamp;
    require!(now <= deadline, TermPoolError::PastDeadline);

    let pool = &ctx.accounts.pool;
    let quote = curve::loan_terms(pool, pledge_amount)?;
    // caller-side slippage protection against quotes moving between
    // submission and execution
    require!(
        quote.loan_amount >= min_loan_limit,
        TermPoolError::LoanBelowLimit
    );
    require!(
        quote.repayment_amount <= max_repay_limit,
        TermPoolError::RepaymentAboveLimit
    );

    let expiry = now
        .checked_add(pool.loan_tenor)
        .ok_or(TermPoolError::MathOverflow)?;

    let loan = &mut ctx.accounts.loan;
    loan.pool = pool.key();
    loan.borrower = ctx.accounts.borrower.key();
    loan.loan_idx = pool.loan_idx;
    loan.repayment = quote.repayment_amount;
    loan.collateral = quote.pledge_amount;
    loan.total_lp_shares = pool.total_lp_shares;
    loan.expiry = expiry;
    loan.issuance_slot = clock.slot;
    loan.repaid = false;
    loan.bump = ctx.bumps.loan;

    let bucket = &mut ctx.accounts.bucket;
    if bucket.pool == Pubkey::default() {
        bucket.pool = pool.key();
        bucket.index = pool.loan_idx / pool.base_aggr_bucket_size;
        bucket.bump = ctx.bumps.bucket;
    }
    bucket.credit_origination(quote.pledge_amount, pool.total_lp_shares)?;

    // pledge in, creator fee out, loan out
    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.caller_coll_account.to_account_info(),
                to: ctx.accounts.coll_vault.to_account_info(),
                authority: ctx.accounts.caller.to_account_info(),
            },
        ),
        quote.pledge_amount,
    )?;
    if quote.creator_fee_amount > 0 {
        token::transfer(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.caller_coll_account.to_account_info(),
                    to: ctx.accounts.creator_coll_account.to_account_info(),
                    authority: ctx.accounts.caller.to_account_info(),
                },
            ),
            quote.creator_fee_amount,
        )?;
    }
    let loan_mint = pool.loan_mint;
    let coll_mint = pool.coll_mint;
    let pool_seeds = &[
        POOL_SEED,
        loan_mint.as_ref(),
        coll_mint.as_ref(),
        &[pool.bump],
    ];
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.loan_vault.to_account_info(),
                to: ctx.accounts.caller_loan_account.to_account_info(),
                authority: ctx.accounts.pool.to_account_info(),
            },
            &[pool_seeds],
        ),
        quote.loan_amount,
    )?;

    let pool = &mut ctx.accounts.pool;
    pool.total_liquidity = pool
        .total_liquidity
        .checked_sub(quote.loan_amount)
        .ok_or(TermPoolError::MathOverflow)?;
    pool.total_fees_accrued = pool
        .total_fees_accrued
        .checked_add(quote.creator_fee_amount)
        .ok_or(TermPoolError::MathOverflow)?;
    let loan_idx = pool.loan_idx;
    pool.loan_idx = loan_idx
        .checked_add(1)
        .ok_or(TermPoolError::MathOverflow)?;

    emit!(Borrowed {
        pool: pool.key(),
        borrower: ctx.accounts.borrower.key(),
        loan_idx,
        collateral: quote.pledge_amount,
        loan_amount: quote.loan_amount,
        repayment_amount: quote.repayment_amount,
        creator_fee_amount: quote.creator_fee_amount,
        expiry,
        total_liquidity: pool.total_liquidity,
        total_lp_shares: pool.total_lp_shares,
        referral_code,
    });

    Ok(())
}
