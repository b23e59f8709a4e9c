use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::TermPoolError;

#[account]
#[derive(Debug, InitSpace)]
pub struct Pool {
    /// Fee recipient; may tune curve terms and receives creator fees
    pub creator: Pubkey,
    /// Pending creator in a two-step handover (default pubkey when none)
    pub proposed_creator: Pubkey,
    /// Currency LPs deposit and borrowers receive
    pub loan_mint: Pubkey,
    /// Currency borrowers pledge
    pub coll_mint: Pubkey,
    /// Loan-currency vault (PDA-owned)
    pub loan_vault: Pubkey,
    /// Collateral-currency vault (PDA-owned)
    pub coll_vault: Pubkey,
    /// Fixed duration from issuance to expiry, in seconds
    pub loan_tenor: i64,
    /// Loan-currency cap per whole collateral unit
    pub max_loan_per_coll: u64,
    /// Rate at `liquidity_bnd_1` of post-loan liquidity (BASE-scaled)
    pub r1: u64,
    /// Rate at and above `liquidity_bnd_2` (BASE-scaled)
    pub r2: u64,
    pub liquidity_bnd_1: u64,
    pub liquidity_bnd_2: u64,
    /// Smallest loan the pool will write
    pub min_loan: u64,
    /// Loans per aggregation bucket; immutable after creation
    pub base_aggr_bucket_size: u64,
    /// Per-loan fee on the pledge, BASE-scaled
    pub creator_fee: u64,
    /// One whole collateral unit (10^decimals), captured at creation
    pub coll_unit: u64,
    /// Deposits minus outstanding loans; never drops below MIN_LIQUIDITY
    /// once liquidity has been added
    pub total_liquidity: u64,
    /// Shares outstanding across all LP positions
    pub total_lp_shares: u64,
    /// Next loan index to be assigned (1-based)
    pub loan_idx: u64,
    /// Lifetime creator fees routed out of the pool
    pub total_fees_accrued: u64,
    pub bump: u8,
    pub loan_vault_bump: u8,
    pub coll_vault_bump: u8,
}

impl Pool {
    /// Validates the mutable curve terms; used at creation and on updates.
    pub fn validate_curve_terms(
        max_loan_per_coll: u64,
        r1: u64,
        r2: u64,
        liquidity_bnd_1: u64,
        liquidity_bnd_2: u64,
        min_loan: u64,
        creator_fee: u64,
    ) -> Result<()> {
        require!(max_loan_per_coll > 0, TermPoolError::InvalidMaxLoanPerColl);
        // the rate must be higher when the pool is drained than when it is deep
        require!(r1 > r2 && r2 > 0, TermPoolError::InvalidRateParams);
        require!(
            liquidity_bnd_1 > 0 && liquidity_bnd_1 < liquidity_bnd_2,
            TermPoolError::InvalidLiquidityBnds
        );
        require!(min_loan > 0, TermPoolError::InvalidMinLoan);
        require!(creator_fee <= MAX_CREATOR_FEE, TermPoolError::InvalidFee);
        Ok(())
    }

    pub fn validate_bucket_size(base_aggr_bucket_size: u64) -> Result<()> {
        require!(
            base_aggr_bucket_size % 10 == 0
                && base_aggr_bucket_size >= MIN_BASE_AGGR_BUCKET_SIZE
                && base_aggr_bucket_size <= MAX_BASE_AGGR_BUCKET_SIZE,
            TermPoolError::InvalidBaseAggrSize
        );
        Ok(())
    }

    /// Shares minted for a deposit against the current totals. Returns 0 for
    /// amounts too small to mint a share; callers decide whether that is an
    /// error (fresh adds) or a pass-through (reinvested claims).
    pub fn shares_for_amount(&self, amount: u64) -> Result<u64> {
        let shares = if self.total_lp_shares == 0 {
            (amount as u128)
                .checked_mul(BOOTSTRAP_SHARES as u128)
                .ok_or(TermPoolError::MathOverflow)?
                / MIN_LIQUIDITY as u128
        } else {
            (amount as u128)
                .checked_mul(self.total_lp_shares as u128)
                .ok_or(TermPoolError::MathOverflow)?
                .checked_div(self.total_liquidity as u128)
                .ok_or(TermPoolError::MathOverflow)?
        };
        u64::try_from(shares).map_err(|_| TermPoolError::MathOverflow.into())
    }

    /// Loan-currency amount paid out when burning `num_shares`. The payout is
    /// taken against liquidity above the floor, so the last LP to exit leaves
    /// exactly MIN_LIQUIDITY behind as dust.
    pub fn removable_amount(&self, num_shares: u64) -> Result<u64> {
        let above_floor = self
            .total_liquidity
            .checked_sub(MIN_LIQUIDITY)
            .ok_or(TermPoolError::MathOverflow)?;
        let amount = (num_shares as u128)
            .checked_mul(above_floor as u128)
            .ok_or(TermPoolError::MathOverflow)?
            .checked_div(self.total_lp_shares as u128)
            .ok_or(TermPoolError::MathOverflow)?;
        u64::try_from(amount).map_err(|_| TermPoolError::MathOverflow.into())
    }

    /// Creator fee charged on a pledge, BASE-scaled.
    pub fn creator_fee_on(&self, pledge_amount: u64) -> Result<u64> {
        let fee = (pledge_amount as u128)
            .checked_mul(self.creator_fee as u128)
            .ok_or(TermPoolError::MathOverflow)?
            / BASE;
        u64::try_from(fee).map_err(|_| TermPoolError::MathOverflow.into())
    }

    pub fn pool_info(&self) -> PoolInfo {
        PoolInfo {
            loan_mint: self.loan_mint,
            coll_mint: self.coll_mint,
            loan_tenor: self.loan_tenor,
            total_liquidity: self.total_liquidity,
            total_lp_shares: self.total_lp_shares,
            loan_idx: self.loan_idx,
            total_fees_accrued: self.total_fees_accrued,
        }
    }

    pub fn rate_params(&self) -> RateParams {
        RateParams {
            max_loan_per_coll: self.max_loan_per_coll,
            r1: self.r1,
            r2: self.r2,
            liquidity_bnd_1: self.liquidity_bnd_1,
            liquidity_bnd_2: self.liquidity_bnd_2,
            min_loan: self.min_loan,
            creator_fee: self.creator_fee,
        }
    }
}

/// Per-LP share ledger. `shares_over_time` is an arena of checkpoints: entry
/// `i` is the share count in force from `loan_idxs_where_shares_changed[i-1]`
/// (or from the position's first loan for `i == 0`) up to
/// `loan_idxs_where_shares_changed[i]`. Invariant:
/// `shares_over_time.len() == loan_idxs_where_shares_changed.len() + 1`
/// whenever the position is live.
#[account]
#[derive(Debug, InitSpace)]
pub struct LpPosition {
    pub pool: Pubkey,
    pub owner: Pubkey,
    /// First loan index this position has not yet claimed
    pub from_loan_idx: u64,
    /// Checkpoint the claim frontier currently sits in
    pub curr_share_ptr: u32,
    #[max_len(128)]
    pub shares_over_time: Vec<u64>,
    #[max_len(127)]
    pub loan_idxs_where_shares_changed: Vec<u64>,
    /// Removal disallowed before this timestamp
    pub earliest_remove: i64,
    pub bump: u8,
}

impl LpPosition {
    pub fn current_shares(&self) -> u64 {
        self.shares_over_time.last().copied().unwrap_or(0)
    }

    /// Records newly minted shares effective from `next_loan_idx` and resets
    /// the removal timer.
    pub fn record_add(&mut self, minted: u64, next_loan_idx: u64, now: i64) -> Result<()> {
        self.earliest_remove = now
            .checked_add(MIN_LPING_PERIOD)
            .ok_or(TermPoolError::MathOverflow)?;
        if self.shares_over_time.is_empty() {
            self.from_loan_idx = next_loan_idx;
            self.curr_share_ptr = 0;
            self.shares_over_time.push(minted);
            return Ok(());
        }
        let new_total = self
            .current_shares()
            .checked_add(minted)
            .ok_or(TermPoolError::MathOverflow)?;
        self.record_share_change(new_total, next_loan_idx)
    }

    /// Sets the share count in force from `next_loan_idx` onward. Collapses
    /// the history when nothing is left unclaimed, overwrites when the count
    /// already changed at this index, appends otherwise.
    pub fn record_share_change(&mut self, new_total: u64, next_loan_idx: u64) -> Result<()> {
        if self.from_loan_idx == next_loan_idx {
            self.shares_over_time.clear();
            self.loan_idxs_where_shares_changed.clear();
            self.shares_over_time.push(new_total);
            self.curr_share_ptr = 0;
        } else if self.loan_idxs_where_shares_changed.last() == Some(&next_loan_idx) {
            if let Some(last) = self.shares_over_time.last_mut() {
                *last = new_total;
            }
        } else {
            require!(
                self.shares_over_time.len() < MAX_SHARE_CHECKPOINTS,
                TermPoolError::ShareHistoryFull
            );
            self.shares_over_time.push(new_total);
            self.loan_idxs_where_shares_changed.push(next_loan_idx);
        }
        Ok(())
    }

    /// Moves the claim frontier past checkpoints in which the position held
    /// zero shares; there is nothing to claim in such a span and it would
    /// otherwise be unpassable.
    pub fn skip_zero_share_spans(&mut self) {
        while (self.curr_share_ptr as usize) < self.loan_idxs_where_shares_changed.len()
            && self.shares_over_time[self.curr_share_ptr as usize] == 0
        {
            self.from_loan_idx =
                self.loan_idxs_where_shares_changed[self.curr_share_ptr as usize];
            self.curr_share_ptr += 1;
        }
    }

    /// Share count applicable to a claim over `[start_idx, end_idx]`, after
    /// verifying the range is entitled and does not cross a checkpoint.
    pub fn applicable_shares(&self, start_idx: u64, end_idx: u64) -> Result<u64> {
        require!(
            start_idx >= self.from_loan_idx,
            TermPoolError::UnentitledFromLoanIdx
        );
        let ptr = self.curr_share_ptr as usize;
        if let Some(&boundary) = self.loan_idxs_where_shares_changed.get(ptr) {
            require!(end_idx < boundary, TermPoolError::LoanIdxsWithChangingShares);
        }
        let shares = self.shares_over_time.get(ptr).copied().unwrap_or(0);
        require!(shares > 0, TermPoolError::ZeroShareClaim);
        Ok(shares)
    }

    /// Advances the claim frontier past `end_idx`, stepping the checkpoint
    /// pointer when the frontier lands exactly on a share-change boundary.
    pub fn advance_claim_frontier(&mut self, end_idx: u64) -> Result<()> {
        self.from_loan_idx = end_idx
            .checked_add(1)
            .ok_or(TermPoolError::MathOverflow)?;
        let ptr = self.curr_share_ptr as usize;
        if self.loan_idxs_where_shares_changed.get(ptr) == Some(&self.from_loan_idx) {
            self.curr_share_ptr += 1;
        }
        Ok(())
    }

    pub fn lp_info(&self) -> LpInfo {
        LpInfo {
            owner: self.owner,
            current_shares: self.current_shares(),
            from_loan_idx: self.from_loan_idx,
            earliest_remove: self.earliest_remove,
            num_checkpoints: self.shares_over_time.len() as u32,
        }
    }
}

/// One record per loan, created at borrow and kept forever so later claims
/// can recompute historical entitlements.
#[account]
#[derive(Debug, InitSpace)]
pub struct LoanRecord {
    pub pool: Pubkey,
    pub borrower: Pubkey,
    pub loan_idx: u64,
    /// Loan-currency amount owed at repayment
    pub repayment: u64,
    /// Collateral pledged, net of the creator fee
    pub collateral: u64,
    /// Total LP shares outstanding at issuance
    pub total_lp_shares: u64,
    pub expiry: i64,
    /// Slot of issuance; settlement must happen in a strictly later slot
    pub issuance_slot: u64,
    pub repaid: bool,
    pub bump: u8,
}

impl LoanRecord {
    /// A loan is settled once repaid or past expiry; only settled loans are
    /// claimable and the two outcomes are mutually exclusive.
    pub fn is_settled(&self, now: i64) -> bool {
        self.repaid || now > self.expiry
    }

    /// Pro-rata entitlement of `lp_shares` against this loan:
    /// (repayment share, forfeited-collateral share).
    pub fn lp_entitlement(&self, lp_shares: u64) -> Result<(u64, u64)> {
        let pro_rata = |value: u64| -> Result<u64> {
            let share = (value as u128)
                .checked_mul(lp_shares as u128)
                .ok_or(TermPoolError::MathOverflow)?
                .checked_div(self.total_lp_shares as u128)
                .ok_or(TermPoolError::MathOverflow)?;
            u64::try_from(share).map_err(|_| TermPoolError::MathOverflow.into())
        };
        if self.repaid {
            Ok((pro_rata(self.repayment)?, 0))
        } else {
            Ok((0, pro_rata(self.collateral)?))
        }
    }
}

/// Per-bucket prefix sums over a contiguous range of loan indices. Each
/// contribution is normalized by its own loan's share snapshot at write time
/// (`value * SHARE_BASE / total_lp_shares`), so an LP's claim over a bucket
/// is just `lp_shares * sum / SHARE_BASE` regardless of share changes inside
/// the bucket.
#[account]
#[derive(Debug, InitSpace)]
pub struct AggregationBucket {
    pub pool: Pubkey,
    /// `loan_idx / base_aggr_bucket_size`
    pub index: u64,
    pub repayments_scaled: u128,
    pub collateral_scaled: u128,
    pub bump: u8,
}

impl AggregationBucket {
    fn scaled(value: u64, total_lp_shares: u64) -> Result<u128> {
        (value as u128)
            .checked_mul(SHARE_BASE)
            .ok_or(TermPoolError::MathOverflow)?
            .checked_div(total_lp_shares as u128)
            .ok_or(TermPoolError::MathOverflow.into())
    }

    /// Called at borrow: the loan's collateral becomes claimable-on-default.
    pub fn credit_origination(&mut self, collateral: u64, total_lp_shares: u64) -> Result<()> {
        self.collateral_scaled = self
            .collateral_scaled
            .checked_add(Self::scaled(collateral, total_lp_shares)?)
            .ok_or(TermPoolError::MathOverflow)?;
        Ok(())
    }

    /// Called at repay: moves the loan's contribution from forfeited
    /// collateral to repayments. Uses the same division as at origination,
    /// so the collateral term cancels exactly.
    pub fn settle_repayment(
        &mut self,
        collateral: u64,
        repayment: u64,
        total_lp_shares: u64,
    ) -> Result<()> {
        self.collateral_scaled = self
            .collateral_scaled
            .checked_sub(Self::scaled(collateral, total_lp_shares)?)
            .ok_or(TermPoolError::MathOverflow)?;
        self.repayments_scaled = self
            .repayments_scaled
            .checked_add(Self::scaled(repayment, total_lp_shares)?)
            .ok_or(TermPoolError::MathOverflow)?;
        Ok(())
    }

    /// (repayment claim, collateral claim) for `lp_shares` over this bucket.
    pub fn claims_for_shares(&self, lp_shares: u64) -> Result<(u64, u64)> {
        let unscale = |sum: u128| -> Result<u64> {
            let out = sum
                .checked_mul(lp_shares as u128)
                .ok_or(TermPoolError::MathOverflow)?
                / SHARE_BASE;
            u64::try_from(out).map_err(|_| TermPoolError::MathOverflow.into())
        };
        Ok((
            unscale(self.repayments_scaled)?,
            unscale(self.collateral_scaled)?,
        ))
    }
}

/// Capability set for on-behalf operations; each flag gates exactly one
/// entry point.
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, InitSpace,
)]
pub struct ApprovalFlags {
    pub repay: bool,
    pub roll_over: bool,
    pub add_liquidity: bool,
    pub remove_liquidity: bool,
    pub claim: bool,
}

#[account]
#[derive(Debug, InitSpace)]
pub struct ApprovalGrant {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub delegate: Pubkey,
    pub flags: ApprovalFlags,
    pub bump: u8,
}

impl ApprovalGrant {
    /// Gate for on-behalf operations: a no-op when the caller is the owner,
    /// otherwise the caller must present a grant from the owner with the
    /// required capability set.
    pub fn require_approval(
        caller: &Pubkey,
        owner: &Pubkey,
        pool: &Pubkey,
        grant: Option<&ApprovalGrant>,
        allowed: fn(&ApprovalFlags) -> bool,
    ) -> Result<()> {
        if caller == owner {
            return Ok(());
        }
        let grant = grant.ok_or(TermPoolError::UnapprovedSender)?;
        require!(
            grant.pool == *pool && grant.owner == *owner && grant.delegate == *caller,
            TermPoolError::UnapprovedSender
        );
        require!(allowed(&grant.flags), TermPoolError::UnapprovedSender);
        Ok(())
    }
}

/// Validates aggregation bucket boundaries: strictly ascending, each a
/// multiple of the base bucket size (the first may be 1, since loan indices
/// are 1-based and bucket 0 therefore holds `base - 1` loans).
pub fn validate_bucket_boundaries(base_aggr_bucket_size: u64, boundaries: &[u64]) -> Result<()> {
    require!(boundaries.len() >= 2, TermPoolError::NothingToClaim);
    let mut prev: Option<u64> = None;
    for (i, &b) in boundaries.iter().enumerate() {
        let aligned = b % base_aggr_bucket_size == 0 || (i == 0 && b == 1);
        require!(b > 0 && aligned, TermPoolError::InvalidSubAggregation);
        if let Some(p) = prev {
            require!(b > p, TermPoolError::NonAscendingLoanIdxs);
        }
        prev = Some(b);
    }
    Ok(())
}

/// First bucket index covered by a boundary list (a leading boundary of 1
/// maps onto bucket 0).
pub fn first_bucket_index(base_aggr_bucket_size: u64, first_boundary: u64) -> u64 {
    if first_boundary == 1 {
        0
    } else {
        first_boundary / base_aggr_bucket_size
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug)]
pub struct PoolInfo {
    pub loan_mint: Pubkey,
    pub coll_mint: Pubkey,
    pub loan_tenor: i64,
    pub total_liquidity: u64,
    pub total_lp_shares: u64,
    pub loan_idx: u64,
    pub total_fees_accrued: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug)]
pub struct RateParams {
    pub max_loan_per_coll: u64,
    pub r1: u64,
    pub r2: u64,
    pub liquidity_bnd_1: u64,
    pub liquidity_bnd_2: u64,
    pub min_loan: u64,
    pub creator_fee: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug)]
pub struct LpInfo {
    pub owner: Pubkey,
    pub current_shares: u64,
    pub from_loan_idx: u64,
    pub earliest_remove: i64,
    pub num_checkpoints: u32,
}

// ==================== UNIT TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> Pool {
        Pool {
            creator: Pubkey::new_unique(),
            proposed_creator: Pubkey::default(),
            loan_mint: Pubkey::new_unique(),
            coll_mint: Pubkey::new_unique(),
            loan_vault: Pubkey::new_unique(),
            coll_vault: Pubkey::new_unique(),
            loan_tenor: 90 * 86_400,
            max_loan_per_coll: 1_000_000_000,
            r1: 200_000_000_000_000_000,
            r2: 20_000_000_000_000_000,
            liquidity_bnd_1: 100_000_000_000,
            liquidity_bnd_2: 1_000_000_000_000,
            min_loan: 100,
            base_aggr_bucket_size: 100,
            creator_fee: 0,
            coll_unit: 1_000_000_000,
            total_liquidity: 0,
            total_lp_shares: 0,
            loan_idx: 1,
            total_fees_accrued: 0,
            bump: 255,
            loan_vault_bump: 254,
            coll_vault_bump: 253,
        }
    }

    fn fresh_position() -> LpPosition {
        LpPosition {
            pool: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            from_loan_idx: 0,
            curr_share_ptr: 0,
            shares_over_time: vec![],
            loan_idxs_where_shares_changed: vec![],
            earliest_remove: 0,
            bump: 255,
        }
    }

    // ==================== SHARE MINTING ====================

    #[test]
    fn bootstrap_mint_uses_fixed_ratio() {
        let pool = test_pool();
        // 1_000_000 units of 10^6-decimals loan ccy
        let shares = pool.shares_for_amount(1_000_000_000_000).unwrap();
        // amount * 1000 / MIN_LIQUIDITY
        assert_eq!(shares, 10_000_000);
    }

    #[test]
    fn subsequent_mint_is_pro_rata() {
        let mut pool = test_pool();
        pool.total_liquidity = 1_000_000_000_000;
        pool.total_lp_shares = 10_000_000;
        let shares = pool.shares_for_amount(500_000_000_000).unwrap();
        assert_eq!(shares, 5_000_000);
    }

    #[test]
    fn tiny_amount_mints_zero_shares() {
        let mut pool = test_pool();
        pool.total_liquidity = 1_000_000_000_000;
        pool.total_lp_shares = 10;
        // amount * shares / liquidity < 1
        assert_eq!(pool.shares_for_amount(1_000).unwrap(), 0);
    }

    #[test]
    fn share_conservation_across_two_lps() {
        let mut pool = test_pool();
        let mut a = fresh_position();
        let mut b = fresh_position();

        let minted_a = pool.shares_for_amount(1_000_000_000_000).unwrap();
        pool.total_liquidity += 1_000_000_000_000;
        pool.total_lp_shares += minted_a;
        a.record_add(minted_a, pool.loan_idx, 0).unwrap();

        let minted_b = pool.shares_for_amount(250_000_000_000).unwrap();
        pool.total_liquidity += 250_000_000_000;
        pool.total_lp_shares += minted_b;
        b.record_add(minted_b, pool.loan_idx, 0).unwrap();

        assert_eq!(
            pool.total_lp_shares,
            a.current_shares() + b.current_shares()
        );
    }

    // ==================== REMOVE / DUST ====================

    #[test]
    fn last_lp_exit_leaves_exactly_the_floor() {
        let mut pool = test_pool();
        pool.total_liquidity = 1_000_000_000_000;
        pool.total_lp_shares = 10_000_000;
        let amount = pool.removable_amount(10_000_000).unwrap();
        assert_eq!(amount, 1_000_000_000_000 - MIN_LIQUIDITY);
        pool.total_liquidity -= amount;
        pool.total_lp_shares = 0;
        assert_eq!(pool.total_liquidity, MIN_LIQUIDITY);
    }

    #[test]
    fn partial_remove_is_pro_rata_above_the_floor() {
        let mut pool = test_pool();
        pool.total_liquidity = 2_000_000_000_000 + MIN_LIQUIDITY;
        pool.total_lp_shares = 2_000_000;
        assert_eq!(pool.removable_amount(500_000).unwrap(), 500_000_000_000);
    }

    // ==================== CHECKPOINT LEDGER ====================

    #[test]
    fn first_add_initializes_a_single_checkpoint() {
        let mut lp = fresh_position();
        lp.record_add(1_000, 5, 100).unwrap();
        assert_eq!(lp.from_loan_idx, 5);
        assert_eq!(lp.shares_over_time, vec![1_000]);
        assert!(lp.loan_idxs_where_shares_changed.is_empty());
        assert_eq!(lp.earliest_remove, 100 + MIN_LPING_PERIOD);
    }

    #[test]
    fn add_with_no_unclaimed_history_collapses_in_place() {
        let mut lp = fresh_position();
        lp.record_add(1_000, 5, 0).unwrap();
        // no loans issued since; from_loan_idx still equals the next index
        lp.record_add(500, 5, 0).unwrap();
        assert_eq!(lp.shares_over_time, vec![1_500]);
        assert!(lp.loan_idxs_where_shares_changed.is_empty());
    }

    #[test]
    fn add_with_pending_claims_appends_a_checkpoint() {
        let mut lp = fresh_position();
        lp.record_add(1_000, 5, 0).unwrap();
        // loans 5..9 issued in the meantime
        lp.record_add(500, 10, 0).unwrap();
        assert_eq!(lp.shares_over_time, vec![1_000, 1_500]);
        assert_eq!(lp.loan_idxs_where_shares_changed, vec![10]);
        // invariant: one more share entry than change index
        assert_eq!(
            lp.shares_over_time.len(),
            lp.loan_idxs_where_shares_changed.len() + 1
        );
    }

    #[test]
    fn second_add_at_same_loan_idx_overwrites_the_checkpoint() {
        let mut lp = fresh_position();
        lp.record_add(1_000, 5, 0).unwrap();
        lp.record_add(500, 10, 0).unwrap();
        lp.record_add(250, 10, 0).unwrap();
        assert_eq!(lp.shares_over_time, vec![1_000, 1_750]);
        assert_eq!(lp.loan_idxs_where_shares_changed, vec![10]);
    }

    #[test]
    fn history_capacity_is_enforced() {
        let mut lp = fresh_position();
        lp.record_add(1, 1, 0).unwrap();
        for i in 0..(MAX_SHARE_CHECKPOINTS as u64 - 1) {
            lp.record_add(1, i + 2, 0).unwrap();
        }
        let err = lp
            .record_add(1, MAX_SHARE_CHECKPOINTS as u64 + 1, 0)
            .unwrap_err();
        assert_eq!(err, TermPoolError::ShareHistoryFull.into());
    }

    // ==================== CLAIM GUARDS ====================

    fn lp_with_boundary() -> LpPosition {
        // 1_000 shares for loans 1..9, 1_500 from loan 10
        let mut lp = fresh_position();
        lp.record_add(1_000, 1, 0).unwrap();
        lp.record_add(500, 10, 0).unwrap();
        lp
    }

    #[test]
    fn claim_before_frontier_is_unentitled() {
        let mut lp = lp_with_boundary();
        lp.advance_claim_frontier(4).unwrap();
        let err = lp.applicable_shares(3, 6).unwrap_err();
        assert_eq!(err, TermPoolError::UnentitledFromLoanIdx.into());
    }

    #[test]
    fn claim_crossing_a_boundary_is_rejected() {
        let lp = lp_with_boundary();
        let err = lp.applicable_shares(1, 10).unwrap_err();
        assert_eq!(err, TermPoolError::LoanIdxsWithChangingShares.into());
        // landing one short of the boundary is fine
        assert_eq!(lp.applicable_shares(1, 9).unwrap(), 1_000);
    }

    #[test]
    fn landing_on_a_boundary_advances_the_pointer() {
        let mut lp = lp_with_boundary();
        lp.applicable_shares(1, 9).unwrap();
        lp.advance_claim_frontier(9).unwrap();
        assert_eq!(lp.from_loan_idx, 10);
        assert_eq!(lp.curr_share_ptr, 1);
        // the next span uses the post-change share count
        assert_eq!(lp.applicable_shares(10, 15).unwrap(), 1_500);
    }

    #[test]
    fn skipped_indices_inside_a_span_are_forfeited() {
        let mut lp = lp_with_boundary();
        assert_eq!(lp.applicable_shares(4, 6).unwrap(), 1_000);
        lp.advance_claim_frontier(6).unwrap();
        // indices 1..3 can never be claimed afterwards
        let err = lp.applicable_shares(2, 2).unwrap_err();
        assert_eq!(err, TermPoolError::UnentitledFromLoanIdx.into());
    }

    #[test]
    fn zero_share_span_is_skipped_automatically() {
        let mut lp = fresh_position();
        lp.record_add(1_000, 1, 0).unwrap();
        // removed everything at loan 5, re-added at loan 9
        lp.record_share_change(0, 5).unwrap();
        lp.record_add(700, 9, 0).unwrap();
        lp.advance_claim_frontier(4).unwrap();
        assert_eq!(lp.curr_share_ptr, 1);
        lp.skip_zero_share_spans();
        assert_eq!(lp.curr_share_ptr, 2);
        assert_eq!(lp.from_loan_idx, 9);
        assert_eq!(lp.applicable_shares(9, 12).unwrap(), 700);
    }

    #[test]
    fn zero_share_claim_is_rejected() {
        let mut lp = fresh_position();
        lp.record_add(1_000, 1, 0).unwrap();
        lp.record_share_change(0, 5).unwrap();
        lp.advance_claim_frontier(4).unwrap();
        lp.skip_zero_share_spans();
        let err = lp.applicable_shares(5, 6).unwrap_err();
        assert_eq!(err, TermPoolError::ZeroShareClaim.into());
    }

    // ==================== LOAN ENTITLEMENTS ====================

    fn test_loan(repaid: bool) -> LoanRecord {
        LoanRecord {
            pool: Pubkey::new_unique(),
            borrower: Pubkey::new_unique(),
            loan_idx: 7,
            repayment: 4_000,
            collateral: 800,
            total_lp_shares: 1_000,
            expiry: 1_000,
            issuance_slot: 50,
            repaid,
            bump: 255,
        }
    }

    #[test]
    fn repaid_loan_pays_repayment_only() {
        let loan = test_loan(true);
        assert_eq!(loan.lp_entitlement(250).unwrap(), (1_000, 0));
    }

    #[test]
    fn defaulted_loan_pays_collateral_only() {
        let loan = test_loan(false);
        assert_eq!(loan.lp_entitlement(250).unwrap(), (0, 200));
    }

    #[test]
    fn dust_shares_round_to_zero_but_can_still_claim_through() {
        let mut loan = test_loan(true);
        loan.total_lp_shares = 1_000_000_000;
        // 3 shares in a 10^9-share pool: 4000 * 3 / 10^9 floors to zero
        assert_eq!(loan.lp_entitlement(3).unwrap(), (0, 0));

        // the zero-value claim must still move the frontier so the
        // position can later satisfy the remove precondition
        let mut lp = fresh_position();
        lp.record_add(3, 1, 0).unwrap();
        assert_eq!(lp.applicable_shares(1, loan.loan_idx).unwrap(), 3);
        lp.advance_claim_frontier(loan.loan_idx).unwrap();
        let next_loan_idx = loan.loan_idx + 1;
        assert_eq!(lp.from_loan_idx, next_loan_idx);
    }

    #[test]
    fn settlement_requires_repaid_or_past_expiry() {
        let loan = test_loan(false);
        assert!(!loan.is_settled(1_000));
        assert!(loan.is_settled(1_001));
        assert!(test_loan(true).is_settled(0));
    }

    // ==================== AGGREGATION BUCKETS ====================

    fn empty_bucket() -> AggregationBucket {
        AggregationBucket {
            pool: Pubkey::new_unique(),
            index: 1,
            repayments_scaled: 0,
            collateral_scaled: 0,
            bump: 255,
        }
    }

    #[test]
    fn settle_cancels_the_origination_credit_exactly() {
        let mut bucket = empty_bucket();
        bucket.credit_origination(800, 1_000).unwrap();
        assert!(bucket.collateral_scaled > 0);
        bucket.settle_repayment(800, 4_000, 1_000).unwrap();
        assert_eq!(bucket.collateral_scaled, 0);
    }

    #[test]
    fn aggregated_claim_matches_individual_claims() {
        // three repaid loans and one default, constant 1_000 total shares
        let repayments = [1_000u64, 2_000, 4_000];
        let default_coll = 800u64;
        let lp_shares = 250u64;

        let mut bucket = empty_bucket();
        for &r in &repayments {
            bucket.credit_origination(r / 2, 1_000).unwrap();
            bucket.settle_repayment(r / 2, r, 1_000).unwrap();
        }
        bucket.credit_origination(default_coll, 1_000).unwrap();

        let (agg_repay, agg_coll) = bucket.claims_for_shares(lp_shares).unwrap();

        let individual_repay: u64 = repayments
            .iter()
            .map(|&r| (r as u128 * lp_shares as u128 / 1_000) as u64)
            .sum();
        let individual_coll = (default_coll as u128 * lp_shares as u128 / 1_000) as u64;

        assert_eq!(agg_repay, individual_repay);
        assert_eq!(agg_coll, individual_coll);
    }

    #[test]
    fn bucket_sums_survive_share_changes_inside_the_bucket() {
        // same repayment, booked under two different share denominators
        let mut bucket = empty_bucket();
        bucket.credit_origination(100, 1_000).unwrap();
        bucket.settle_repayment(100, 1_000, 1_000).unwrap();
        bucket.credit_origination(100, 2_000).unwrap();
        bucket.settle_repayment(100, 1_000, 2_000).unwrap();
        // an LP holding 500 shares throughout: 500 + 250
        let (repay, _) = bucket.claims_for_shares(500).unwrap();
        assert_eq!(repay, 750);
    }

    // ==================== BOUNDARY VALIDATION ====================

    #[test]
    fn aligned_boundaries_are_accepted() {
        assert!(validate_bucket_boundaries(100, &[1, 100]).is_ok());
        assert!(validate_bucket_boundaries(100, &[100, 200, 900]).is_ok());
        assert!(validate_bucket_boundaries(100, &[1, 100, 10_000]).is_ok());
    }

    #[test]
    fn misaligned_boundaries_are_rejected() {
        let err = validate_bucket_boundaries(100, &[150, 200]).unwrap_err();
        assert_eq!(err, TermPoolError::InvalidSubAggregation.into());
        let err = validate_bucket_boundaries(100, &[100, 250]).unwrap_err();
        assert_eq!(err, TermPoolError::InvalidSubAggregation.into());
        // 1 is only valid as the leading boundary
        let err = validate_bucket_boundaries(100, &[100, 1]).unwrap_err();
        assert_eq!(err, TermPoolError::InvalidSubAggregation.into());
    }

    #[test]
    fn descending_or_short_boundary_lists_are_rejected() {
        let err = validate_bucket_boundaries(100, &[200, 100]).unwrap_err();
        assert_eq!(err, TermPoolError::NonAscendingLoanIdxs.into());
        let err = validate_bucket_boundaries(100, &[100]).unwrap_err();
        assert_eq!(err, TermPoolError::NothingToClaim.into());
    }

    #[test]
    fn leading_boundary_of_one_maps_to_bucket_zero() {
        assert_eq!(first_bucket_index(100, 1), 0);
        assert_eq!(first_bucket_index(100, 100), 1);
        assert_eq!(first_bucket_index(100, 900), 9);
    }

    // ==================== TERM VALIDATION ====================

    #[test]
    fn curve_terms_validation() {
        // r1 must exceed r2
        let err =
            Pool::validate_curve_terms(1, 10, 10, 1, 2, 1, 0).unwrap_err();
        assert_eq!(err, TermPoolError::InvalidRateParams.into());
        // bounds must be ordered
        let err =
            Pool::validate_curve_terms(1, 10, 5, 2, 2, 1, 0).unwrap_err();
        assert_eq!(err, TermPoolError::InvalidLiquidityBnds.into());
        // fee capped
        let err = Pool::validate_curve_terms(1, 10, 5, 1, 2, 1, MAX_CREATOR_FEE + 1)
            .unwrap_err();
        assert_eq!(err, TermPoolError::InvalidFee.into());
        assert!(Pool::validate_curve_terms(1, 10, 5, 1, 2, 1, MAX_CREATOR_FEE).is_ok());
    }

    #[test]
    fn bucket_size_validation() {
        assert!(Pool::validate_bucket_size(100).is_ok());
        assert!(Pool::validate_bucket_size(10).is_ok());
        assert!(Pool::validate_bucket_size(10_000).is_ok());
        assert!(Pool::validate_bucket_size(15).is_err());
        assert!(Pool::validate_bucket_size(0).is_err());
        assert!(Pool::validate_bucket_size(20_000).is_err());
    }

    // ==================== READ-ONLY VIEWS ====================

    #[test]
    fn pool_views_reflect_state() {
        let mut pool = test_pool();
        pool.total_liquidity = 5_000;
        pool.total_lp_shares = 42;
        pool.loan_idx = 7;
        pool.total_fees_accrued = 13;

        let info = pool.pool_info();
        assert_eq!(info.loan_mint, pool.loan_mint);
        assert_eq!(info.total_liquidity, 5_000);
        assert_eq!(info.total_lp_shares, 42);
        assert_eq!(info.loan_idx, 7);
        assert_eq!(info.total_fees_accrued, 13);

        let params = pool.rate_params();
        assert_eq!(params.r1, pool.r1);
        assert_eq!(params.r2, pool.r2);
        assert_eq!(params.min_loan, pool.min_loan);
    }

    #[test]
    fn lp_view_reports_current_checkpoint() {
        let mut lp = fresh_position();
        lp.record_add(500, 3, 1_000).unwrap();
        lp.record_share_change(800, 9).unwrap();

        let info = lp.lp_info();
        assert_eq!(info.owner, lp.owner);
        assert_eq!(info.current_shares, 800);
        assert_eq!(info.from_loan_idx, 3);
        assert_eq!(info.earliest_remove, 1_000 + MIN_LPING_PERIOD);
        assert_eq!(info.num_checkpoints, 2);
    }
}
