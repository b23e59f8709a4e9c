use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::events::LiquidityAdded;
use crate::state::{ApprovalGrant, LpPosition, Pool};

#[derive(Accounts)]
pub struct AddLiquidity<'info> {
    #[account(
        mut,
        seeds = [POOL_SEED, pool.loan_mint.as_ref(), pool.coll_mint.as_ref()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    #[account(
        init_if_needed,
        seeds = [LP_POSITION_SEED, pool.key().as_ref(), owner.key().as_ref()],
        bump,
        payer = caller,
        space = 8 + LpPosition::INIT_SPACE,
    )]
    pub lp_position: Account<'info, LpPosition>,

    /// CHECK: position owner; must hold an approval grant when not the caller
    pub owner: UncheckedAccount<'info>,

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
        constraint = caller_token_account.mint == pool.loan_mint @ TermPoolError::MintMismatch,
    )]
    pub caller_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = creator_token_account.owner == pool.creator @ TermPoolError::Unauthorized,
        constraint = creator_token_account.mint == pool.loan_mint @ TermPoolError::MintMismatch,
    )]
    pub creator_token_account: Account<'info, TokenAccount>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
}

pub fn handle_add_liquidity(
    ctx: Context<AddLiquidity>,
    amount: u64,
    deadline: i64,
    referral_code: u64,
) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    require!(now <= deadline, TermPoolError::PastDeadline);
    require!(amount >= MIN_LIQUIDITY, TermPoolError::InvalidAddAmount);

    ApprovalGrant::require_approval(
        &ctx.accounts.caller.key(),
        &ctx.accounts.owner.key(),
        &ctx.accounts.pool.key(),
        ctx.accounts.approval.as_deref(),
        |f| f.add_liquidity,
    )?;

    // Sweep dust left behind by the last LP's exit to the creator before
    // re-bootstrapping the share ledger.
    let mut dust = 0u64;
    if ctx.accounts.pool.total_lp_shares == 0 && ctx.accounts.pool.total_liquidity > 0 {
        dust = ctx.accounts.pool.total_liquidity;
        let pool = &ctx.accounts.pool;
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
                    to: ctx.accounts.creator_token_account.to_account_info(),
                    authority: ctx.accounts.pool.to_account_info(),
                },
                &[pool_seeds],
            ),
            dust,
        )?;
        ctx.accounts.pool.total_liquidity = 0;
    }

    let pool = &ctx.accounts.pool;
    let shares = pool.shares_for_amount(amount)?;
    require!(shares > 0, TermPoolError::InvalidAddAmount);

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.caller_token_account.to_account_info(),
                to: ctx.accounts.loan_vault.to_account_info(),
                authority: ctx.accounts.caller.to_account_info(),
            },
        ),
        amount,
    )?;

    let pool = &mut ctx.accounts.pool;
    pool.total_liquidity = pool
        .total_liquidity
        .checked_add(amount)
        .ok_or(TermPoolError::MathOverflow)?;
    pool.total_lp_shares = pool
        .total_lp_shares
        .checked_add(shares)
        .ok_or(TermPoolError::MathOverflow)?;

    let position = &mut ctx.accounts.lp_position;
    if position.pool == Pubkey::default() {
        // first add for this owner — initialize the position
        position.pool = pool.key();
        position.owner = ctx.accounts.owner.key();
        position.bump = ctx.bumps.lp_position;
    }
    position.record_add(shares, pool.loan_idx, now)?;

    emit!(LiquidityAdded {
        pool: pool.key(),
        owner: ctx.accounts.owner.key(),
        amount,
        shares_minted: shares,
        total_liquidity: pool.total_liquidity,
        total_lp_shares: pool.total_lp_shares,
        earliest_remove: position.earliest_remove,
        dust_swept: dust,
        referral_code,
    });

    Ok(())
}
