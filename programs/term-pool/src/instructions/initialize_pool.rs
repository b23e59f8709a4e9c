use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::PoolInitialized;
use crate::state::Pool;

#[derive(Accounts)]
pub struct InitializePool<'info> {
    #[account(
        init,
        seeds = [POOL_SEED, loan_mint.key().as_ref(), coll_mint.key().as_ref()],
        bump,
        payer = creator,
        space = 8 + Pool::INIT_SPACE,
    )]
    pub pool: Account<'info, Pool>,

    #[account(
        constraint = loan_mint.key() != coll_mint.key() @ TermPoolError::IdenticalLoanAndCollCcy,
    )]
    pub loan_mint: Account<'info, Mint>,

    pub coll_mint: Account<'info, Mint>,

    #[account(
        init,
        seeds = [LOAN_VAULT_SEED, pool.key().as_ref()],
        bump,
        payer = creator,
        token::mint = loan_mint,
        token::authority = pool,
    )]
    pub loan_vault: Account<'info, TokenAccount>,

    #[account(
        init,
        seeds = [COLL_VAULT_SEED, pool.key().as_ref()],
        bump,
        payer = creator,
        token::mint = coll_mint,
        token::authority = pool,
    )]
    pub coll_vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub creator: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
}

#[allow(clippy::too_many_arguments)]
pub fn handle_initialize_pool(
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
    require!(loan_tenor >= MIN_LOAN_TENOR, TermPoolError::InvalidLoanTenor);
    Pool::validate_curve_terms(
        max_loan_per_coll,
        r1,
        r2,
        liquidity_bnd_1,
        liquidity_bnd_2,
        min_loan,
        creator_fee,
    )?;
    Pool::validate_bucket_size(base_aggr_bucket_size)?;

    let coll_unit = 10u64
        .checked_pow(ctx.accounts.coll_mint.decimals as u32)
        .ok_or(TermPoolError::MathOverflow)?;

    let pool = &mut ctx.accounts.pool;
    pool.creator = ctx.accounts.creator.key();
    pool.proposed_creator = Pubkey::default();
    pool.loan_mint = ctx.accounts.loan_mint.key();
    pool.coll_mint = ctx.accounts.coll_mint.key();
    pool.loan_vault = ctx.accounts.loan_vault.key();
    pool.coll_vault = ctx.accounts.coll_vault.key();
    pool.loan_tenor = loan_tenor;
    pool.max_loan_per_coll = max_loan_per_coll;
    pool.r1 = r1;
    pool.r2 = r2;
    pool.liquidity_bnd_1 = liquidity_bnd_1;
    pool.liquidity_bnd_2 = liquidity_bnd_2;
    pool.min_loan = min_loan;
    pool.base_aggr_bucket_size = base_aggr_bucket_size;
    pool.creator_fee = creator_fee;
    pool.coll_unit = coll_unit;
    pool.total_liquidity = 0;
    pool.total_lp_shares = 0;
    pool.loan_idx = 1;
    pool.total_fees_accrued = 0;
    pool.bump = ctx.bumps.pool;
    pool.loan_vault_bump = ctx.bumps.loan_vault;
    pool.coll_vault_bump = ctx.bumps.coll_vault;

    emit!(PoolInitialized {
        pool: pool.key(),
        creator: pool.creator,
        loan_mint: pool.loan_mint,
        coll_mint: pool.coll_mint,
        loan_tenor,
        max_loan_per_coll,
        r1,
        r2,
        liquidity_bnd_1,
        liquidity_bnd_2,
        min_loan,
        base_aggr_bucket_size,
        creator_fee,
    });

    Ok(())
}
