use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::LiquidityRemoved;
use crate::state::{ApprovalGrant, LpPosition, Pool};

#[derive(Accounts)]
pub struct RemoveLiquidity<'info> {
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

    /// CHECK: position owner; must hold an approval grant when not the caller
    pub owner: UncheckedAccount<'info>,

    pub caller: Signer<'info>,

    pub approval: Option<Account<'info, ApprovalGrant>>,

    #[account(
        mut,
        seeds = [LOAN_VAULT_SEED, pool.key().as_ref()],
        bump = pool.loan_vault_bump,
    )]
    pub loan_vault: Account<'info, TokenAccount>,

    /// Proceeds always go to the position owner, not the delegate.
    #[account(
        mut,
        constraint = owner_token_account.owner == owner.key() @ TermPoolError::Unauthorized,
        constraint = owner_token_account.mint == pool.loan_mint @ TermPoolError::MintMismatch,
    )]
    pub owner_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

pub fn handle_remove_liquidity(ctx: Context<RemoveLiquidity>, num_shares: u64) -> Result<()> {
    ApprovalGrant::require_approval(
        &ctx.accounts.caller.key(),
        &ctx.accounts.owner.key(),
        &ctx.accounts.pool.key(),
        ctx.accounts.approval.as_deref(),
        |f| f.remove_liquidity,
    )?;

    let pool = &ctx.accounts.pool;
    let position = &ctx.accounts.lp_position;
    let current = position.current_shares();

    require!(
        num_shares > 0 && num_shares <= current,
        TermPoolError::InvalidRemove
    );
    // removal is only possible once every settled loan has been claimed
    require!(
        position.from_loan_idx == pool.loan_idx,
        TermPoolError::InvalidRemove
    );
    let now = Clock::get()?.unix_timestamp;
    require!(
        now >= position.earliest_remove,
        TermPoolError::BeforeEarliestRemove
    );

    let amount = pool.removable_amount(num_shares)?;

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
                to: ctx.accounts.owner_token_account.to_account_info(),
                authority: ctx.accounts.pool.to_account_info(),
            },
            &[pool_seeds],
        ),
        amount,
    )?;

    let pool = &mut ctx.accounts.pool;
    pool.total_liquidity = pool
        .total_liquidity
        .checked_sub(amount)
        .ok_or(TermPoolError::MathOverflow)?;
    pool.total_lp_shares = pool
        .total_lp_shares
        .checked_sub(num_shares)
        .ok_or(TermPoolError::MathOverflow)?;

    let position = &mut ctx.accounts.lp_position;
    position.record_share_change(current - num_shares, pool.loan_idx)?;

    emit!(LiquidityRemoved {
        pool: pool.key(),
        owner: ctx.accounts.owner.key(),
        amount,
        shares_burned: num_shares,
        total_liquidity: pool.total_liquidity,
        total_lp_shares: pool.total_lp_shares,
    });

    Ok(())
}
