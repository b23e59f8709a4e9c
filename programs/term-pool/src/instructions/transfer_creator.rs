use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::{CreatorClaimed, CreatorProposed};
use crate::state::Pool;

// ─── propose ───────────────────────────────────────────────────────────────

#[derive(Accounts)]
pub struct ProposeNewCreator<'info> {
    #[account(
        mut,
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
        constraint = pool.creator == creator.key() @ TermPoolError::Unauthorized,
    )]
    pub pool: Account<'info, Pool>,

    pub creator: Signer<'info>,
}

pub fn handle_propose_new_creator(
    ctx: Context<ProposeNewCreator>,
    new_creator: Pubkey,
) -> Result<()> {
    require!(
        new_creator != Pubkey::default(),
        TermPoolError::InvalidZeroAddress
    );

    let pool = &mut ctx.accounts.pool;
    pool.proposed_creator = new_creator;

    emit!(CreatorProposed {
        pool: pool.key(),
        current_creator: pool.creator,
        proposed_creator: new_creator,
    });

    Ok(())
}

// ─── claim ─────────────────────────────────────────────────────────────────

#[derive(Accounts)]
pub struct ClaimCreator<'info> {
    #[account(
        mut,
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
        constraint = pool.proposed_creator == claimant.key() @ TermPoolError::Unauthorized,
    )]
    pub pool: Account<'info, Pool>,

    pub claimant: Signer<'info>,
}

pub fn handle_claim_creator(ctx: Context<ClaimCreator>) -> Result<()> {
    let pool = &mut ctx.accounts.pool;
    let old_creator = pool.creator;
    pool.creator = ctx.accounts.claimant.key();
    pool.proposed_creator = Pubkey::default();

    emit!(CreatorClaimed {
        pool: pool.key(),
        old_creator,
        new_creator: pool.creator,
    });

    Ok(())
}
