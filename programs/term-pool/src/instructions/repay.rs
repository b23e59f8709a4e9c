use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::Repaid;
use crate::state::{AggregationBucket, ApprovalGrant, LoanRecord, Pool};

#[derive(Accounts)]
#[instruction(loan_idx: u64)]
pub struct Repay<'info> {
    #[account(
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    #[account(
        mut,
        seeds = [LOAN_SEED, pool.key().as_ref(), &loan_idx.to_le_bytes()],
        bump = loan.bump,
    )]
    pub loan: Account<'info, LoanRecord>,

    #[account(
        mut,
        seeds = [
            BUCKET_SEED,
            pool.key().as_ref(),
            &(loan_idx / pool.base_aggr_bucket_size).to_le_bytes(),
        ],
        bump = bucket.bump,
    )]
    pub bucket: Account<'info, AggregationBucket>,

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
        constraint = recipient_coll_account.mint == pool.coll_mint @ TermPoolError::MintMismatch,
    )]
    pub recipient_coll_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

pub fn handle_repay(
    ctx: Context<Repay>,
    loan_idx: u64,
    send_amount: u64,
) -> Result<()> {
    let pool = &ctx.accounts.pool;
    require!(
        loan_idx >= 1 && loan_idx < pool.loan_idx,
        TermPoolError::InvalidLoanIdx
    );

    let loan = &ctx.accounts.loan;
    let caller = ctx.accounts.caller.key();
    ApprovalGrant::require_approval(
        &caller,
        &loan.borrower,
        &pool.key(),
        ctx.accounts.approval.as_deref(),
        |f| f.repay,
    )?;
    // a delegate may repay, but the collateral must still go to the borrower
    require!(
        ctx.accounts.recipient_coll_account.owner == loan.borrower || caller == loan.borrower,
        TermPoolError::InvalidRecipient
    );

    require!(!loan.repaid, TermPoolError::AlreadyRepaid);
    let clock = Clock::get()?;
    require!(
        clock.unix_timestamp < loan.expiry,
        TermPoolError::CannotRepayAfterExpiry
    );
    require!(
        clock.slot > loan.issuance_slot,
        TermPoolError::CannotRepayInSameBlock
    );
    require!(send_amount == loan.repayment, TermPoolError::InvalidSendAmount);

    let collateral = loan.collateral;
    let repayment = loan.repayment;
    let snapshot_shares = loan.total_lp_shares;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.caller_loan_account.to_account_info(),
                to: ctx.accounts.loan_vault.to_account_info(),
                authority: ctx.accounts.caller.to_account_info(),
            },
        ),
        repayment,
    )?;

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
                from: ctx.accounts.coll_vault.to_account_info(),
                to: ctx.accounts.recipient_coll_account.to_account_info(),
                authority: ctx.accounts.pool.to_account_info(),
            },
            &[pool_seeds],
        ),
        collateral,
    )?;

    let loan = &mut ctx.accounts.loan;
    loan.repaid = true;
    ctx.accounts
        .bucket
        .settle_repayment(collateral, repayment, snapshot_shares)?;

    emit!(Repaid {
        pool: ctx.accounts.pool.key(),
        loan_idx,
        repayment_amount: repayment,
        collateral_returned: collateral,
        recipient: ctx.accounts.recipient_coll_account.owner,
    });

    Ok(())
}
