use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::curve;
use crate::errors::TermPoolError;
use crate::events::RolledOver;
use crate::state::{AggregationBucket, ApprovalGrant, LoanRecord, Pool};

#[derive(Accounts)]
#[instruction(loan_idx: u64)]
pub struct RollOver<'info> {
    #[account(
        mut,
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    #[account(
        mut,
        seeds = [LOAN_SEED, pool.key().as_ref(), &loan_idx.to_le_bytes()],
        bump = old_loan.bump,
    )]
    pub old_loan: Account<'info, LoanRecord>,

    #[account(
        init,
        payer = caller,
        space = 8 + LoanRecord::INIT_SPACE,
        seeds = [LOAN_SEED, pool.key().as_ref(), &pool.loan_idx.to_le_bytes()],
        bump,
    )]
    pub new_loan: Account<'info, LoanRecord>,

    // Declared before `origination_bucket` on purpose: when the old and new
    // loan fall into the same bucket the two accounts alias, and Anchor
    // writes accounts back in field order, so the later one must carry the
    // combined state. The handler routes all deltas to `origination_bucket`
    // in that case.
    #[account(
        mut,
        seeds = [
            BUCKET_SEED,
            pool.key().as_ref(),
            &(loan_idx / pool.base_aggr_bucket_size).to_le_bytes(),
        ],
        bump = settle_bucket.bump,
    )]
    pub settle_bucket: Account<'info, AggregationBucket>,

    #[account(
        init_if_needed,
        payer = caller,
        space = 8 + AggregationBucket::INIT_SPACE,
        seeds = [
            BUCKET_SEED,
            pool.key().as_ref(),
            &(pool.loan_idx / pool.base_aggr_bucket_size).to_le_bytes(),
        ],
        bump,
    )]
    pub origination_bucket: Account<'info, AggregationBucket>,

    #[account(mut)]
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
        constraint = caller_loan_account.mint == pool.loan_mint @ TermPoolError::MintMismatch,
    )]
    pub caller_loan_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = creator_coll_account.owner == pool.creator @ TermPoolError::Unauthorized,
        constraint = creator_coll_account.mint == pool.coll_mint @ TermPoolError::MintMismatch,
    )]
    pub creator_coll_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handle_roll_over(
    ctx: Context<RollOver>,
    loan_idx: u64,
    min_loan_limit: u64,
    max_repay_limit: u64,
    deadline: i64,
    send_amount: u64,
) -> Result<()> {
    let clock = Clock::get()?;
    require!(clock.unix_timestamp <= deadline, TermPoolError::PastDeadline);

    let pool = &ctx.accounts.pool;
    require!(
        loan_idx >= 1 && loan_idx < pool.loan_idx,
        TermPoolError::InvalidLoanIdx
    );

    let old_loan = &ctx.accounts.old_loan;
    ApprovalGrant::require_approval(
        &ctx.accounts.caller.key(),
        &old_loan.borrower,
        &pool.key(),
        ctx.accounts.approval.as_deref(),
        |f| f.roll_over,
    )?;
    require!(!old_loan.repaid, TermPoolError::AlreadyRepaid);
    require!(
        clock.unix_timestamp < old_loan.expiry,
        TermPoolError::CannotRepayAfterExpiry
    );
    require!(
        clock.slot > old_loan.issuance_slot,
        TermPoolError::CannotRepayInSameBlock
    );

    // The old loan's full collateral is re-pledged; the quote deducts a
    // fresh creator fee and prices the loan against current liquidity.
    let quote = curve::loan_terms(pool, old_loan.collateral)?;
    require!(
        quote.loan_amount >= min_loan_limit,
        TermPoolError::LoanBelowLimit
    );
    require!(
        quote.repayment_amount <= max_repay_limit,
        TermPoolError::RepaymentAboveLimit
    );

    let old_repayment = old_loan.repayment;
    let old_collateral = old_loan.collateral;
    let old_snapshot = old_loan.total_lp_shares;
    let new_snapshot = pool.total_lp_shares;
    let new_loan_idx = pool.loan_idx;
    let expiry = clock
        .unix_timestamp
        .checked_add(pool.loan_tenor)
        .ok_or(TermPoolError::MathOverflow)?;

    // Net cash flow in the loan currency: the borrower owes the old
    // repayment and is advanced the new loan amount; only the difference
    // moves.
    if old_repayment > quote.loan_amount {
        let shortfall = old_repayment - quote.loan_amount;
        require!(send_amount == shortfall, TermPoolError::InvalidSendAmount);
        token::transfer(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.caller_loan_account.to_account_info(),
                    to: ctx.accounts.loan_vault.to_account_info(),
                    authority: ctx.accounts.caller.to_account_info(),
                },
            ),
            shortfall,
        )?;
    } else {
        require!(send_amount == 0, TermPoolError::InvalidSendAmount);
    }

    let loan_mint = pool.loan_mint;
    let coll_mint = pool.coll_mint;
    let pool_bump = pool.bump;
    let pool_seeds = &[
        POOL_SEED,
        loan_mint.as_ref(),
        coll_mint.as_ref(),
        &[pool_bump],
    ];

    if old_repayment < quote.loan_amount {
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
            quote.loan_amount - old_repayment,
        )?;
    }

    if quote.creator_fee_amount > 0 {
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.coll_vault.to_account_info(),
                    to: ctx.accounts.creator_coll_account.to_account_info(),
                    authority: ctx.accounts.pool.to_account_info(),
                },
                &[pool_seeds],
            ),
            quote.creator_fee_amount,
        )?;
    }

    let old_loan = &mut ctx.accounts.old_loan;
    old_loan.repaid = true;

    let same_bucket = ctx.accounts.settle_bucket.key() == ctx.accounts.origination_bucket.key();
    {
        let origination = &mut ctx.accounts.origination_bucket;
        if origination.pool == Pubkey::default() {
            origination.pool = ctx.accounts.pool.key();
            origination.index = new_loan_idx / ctx.accounts.pool.base_aggr_bucket_size;
            origination.repayments_scaled = 0;
            origination.collateral_scaled = 0;
            origination.bump = ctx.bumps.origination_bucket;
        }
        if same_bucket {
            origination.settle_repayment(old_collateral, old_repayment, old_snapshot)?;
        } else {
            ctx.accounts
                .settle_bucket
                .settle_repayment(old_collateral, old_repayment, old_snapshot)?;
        }
        ctx.accounts
            .origination_bucket
            .credit_origination(quote.pledge_amount, new_snapshot)?;
    }

    let new_loan = &mut ctx.accounts.new_loan;
    new_loan.pool = ctx.accounts.pool.key();
    new_loan.borrower = ctx.accounts.old_loan.borrower;
    new_loan.loan_idx = new_loan_idx;
    new_loan.repayment = quote.repayment_amount;
    new_loan.collateral = quote.pledge_amount;
    new_loan.total_lp_shares = new_snapshot;
    new_loan.expiry = expiry;
    new_loan.issuance_slot = clock.slot;
    new_loan.repaid = false;
    new_loan.bump = ctx.bumps.new_loan;

    // The old repayment stays in the vault as claimable proceeds for the
    // LPs of the old loan; only the freshly drawn loan leaves liquidity.
    let pool = &mut ctx.accounts.pool;
    pool.total_liquidity = pool
        .total_liquidity
        .checked_sub(quote.loan_amount)
        .ok_or(TermPoolError::MathOverflow)?;
    pool.total_fees_accrued = pool
        .total_fees_accrued
        .checked_add(quote.creator_fee_amount)
        .ok_or(TermPoolError::MathOverflow)?;
    pool.loan_idx = pool
        .loan_idx
        .checked_add(1)
        .ok_or(TermPoolError::MathOverflow)?;

    emit!(RolledOver {
        pool: pool.key(),
        old_loan_idx: loan_idx,
        new_loan_idx,
        collateral: quote.pledge_amount,
        loan_amount: quote.loan_amount,
        repayment_amount: quote.repayment_amount,
        creator_fee_amount: quote.creator_fee_amount,
        expiry,
        total_liquidity: pool.total_liquidity,
    });

    Ok(())
}
