use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::TermsUpdated;
use crate::state::Pool;

#[derive(Accounts)]
pub struct UpdateTerms<'info> {
    #[account(
        mut,
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
        constraint = pool.creator == creator.key() @ TermPoolError::Unauthorized,
    )]
    pub pool: Account<'info, Pool>,

    pub creator: Signer<'info>,
}

/// Revises the pricing terms for loans issued from now on. Outstanding
/// loans keep the terms they were struck at; the tenor, currencies and
/// bucket size are immutable.
#[allow(clippy::too_many_arguments)]
pub fn handle_update_terms(
    ctx: Context<UpdateTerms>,
    new_max_loan_per_coll: Option<u64>,
    new_r1: Option<u64>,
    new_r2: Option<u64>,
    new_liquidity_bnd_1: Option<u64>,
    new_liquidity_bnd_2: Option<u64>,
    new_min_loan: Option<u64>,
    new_creator_fee: Option<u64>,
) -> Result<()> {
    let pool = &mut ctx.accounts.pool;

    let max_loan_per_coll = new_max_loan_per_coll.unwrap_or(pool.max_loan_per_coll);
    let r1 = new_r1.unwrap_or(pool.r1);
    let r2 = new_r2.unwrap_or(pool.r2);
    let liquidity_bnd_1 = new_liquidity_bnd_1.unwrap_or(pool.liquidity_bnd_1);
    let liquidity_bnd_2 = new_liquidity_bnd_2.unwrap_or(pool.liquidity_bnd_2);
    let min_loan = new_min_loan.unwrap_or(pool.min_loan);
    let creator_fee = new_creator_fee.unwrap_or(pool.creator_fee);

    Pool::validate_curve_terms(
        max_loan_per_coll,
        r1,
        r2,
        liquidity_bnd_1,
        liquidity_bnd_2,
        min_loan,
        creator_fee,
    )?;

    pool.max_loan_per_coll = max_loan_per_coll;
    pool.r1 = r1;
    pool.r2 = r2;
    pool.liquidity_bnd_1 = liquidity_bnd_1;
    pool.liquidity_bnd_2 = liquidity_bnd_2;
    pool.min_loan = min_loan;
    pool.creator_fee = creator_fee;

    emit!(TermsUpdated {
        pool: pool.key(),
        max_loan_per_coll,
        r1,
        r2,
        liquidity_bnd_1,
        liquidity_bnd_2,
        min_loan,
        creator_fee,
    });

    Ok(())
}
