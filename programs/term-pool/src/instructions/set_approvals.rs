use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::ApprovalsSet;
use crate::state::{ApprovalFlags, ApprovalGrant, Pool};

#[derive(Accounts)]
#[instruction(delegate: Pubkey)]
pub struct SetApprovals<'info> {
    #[account(
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    #[account(
        init_if_needed,
        payer = owner,
        space = 8 + ApprovalGrant::INIT_SPACE,
        seeds = [APPROVAL_SEED, pool.key().as_ref(), owner.key().as_ref(), delegate.as_ref()],
        bump,
    )]
    pub approval: Account<'info, ApprovalGrant>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Grants or revises the capabilities `delegate` may exercise on the
/// owner's behalf in this pool. Revocation is setting all flags to false.
pub fn handle_set_approvals(
    ctx: Context<SetApprovals>,
    delegate: Pubkey,
    flags: ApprovalFlags,
) -> Result<()> {
    require!(
        delegate != ctx.accounts.owner.key() && delegate != Pubkey::default(),
        TermPoolError::InvalidApprovalAddress
    );

    let approval = &mut ctx.accounts.approval;
    approval.pool = ctx.accounts.pool.key();
    approval.owner = ctx.accounts.owner.key();
    approval.delegate = delegate;
    approval.flags = flags;
    approval.bump = ctx.bumps.approval;

    emit!(ApprovalsSet {
        pool: ctx.accounts.pool.key(),
        owner: ctx.accounts.owner.key(),
        delegate,
        repay: flags.repay,
        roll_over: flags.roll_over,
        add_liquidity: flags.add_liquidity,
        remove_liquidity: flags.remove_liquidity,
        claim: flags.claim,
    });

    Ok(())
}
