use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::TermPoolError;
use crate::state::Pool;

/// Quoted terms for a prospective loan. `pledge_amount` is the pledge net of
/// the creator fee; `total_liquidity` is the pool liquidity the quote was
/// computed against.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug)]
pub struct LoanTermsQuote {
    pub loan_amount: u64,
    pub repayment_amount: u64,
    pub pledge_amount: u64,
    pub creator_fee_amount: u64,
    pub total_liquidity: u64,
}

/// Quotes loan terms for a gross pledge against the pool's current state.
///
/// The loan amount follows a hyperbolic cap,
/// `loan = max_loan * usable / (max_loan + usable)`, which keeps
/// `loan < usable` strictly by shape rather than by a runtime clamp, so the
/// pool can never be drained to the floor.
pub fn loan_terms(pool: &Pool, gross_pledge: u64) -> Result<LoanTermsQuote> {
    let creator_fee_amount = pool.creator_fee_on(gross_pledge)?;
    let net_pledge = gross_pledge
        .checked_sub(creator_fee_amount)
        .ok_or(TermPoolError::MathOverflow)?;

    require!(
        pool.total_liquidity > MIN_LIQUIDITY,
        TermPoolError::InsufficientLiquidity
    );
    let usable = (pool.total_liquidity - MIN_LIQUIDITY) as u128;

    let max_loan = (net_pledge as u128)
        .checked_mul(pool.max_loan_per_coll as u128)
        .ok_or(TermPoolError::MathOverflow)?
        / pool.coll_unit as u128;
    require!(max_loan > 0, TermPoolError::LoanTooSmall);

    let denom = max_loan
        .checked_add(usable)
        .ok_or(TermPoolError::MathOverflow)?;
    let loan = max_loan
        .checked_mul(usable)
        .ok_or(TermPoolError::MathOverflow)?
        / denom;
    require!(loan >= pool.min_loan as u128, TermPoolError::LoanTooSmall);

    let liquidity_after = usable - loan;
    let rate = rate_for_liquidity(pool, liquidity_after)?;

    let repayment = loan
        .checked_mul(BASE + rate)
        .ok_or(TermPoolError::MathOverflow)?
        / BASE;
    require!(repayment > loan, TermPoolError::ErroneousLoanTerms);

    Ok(LoanTermsQuote {
        loan_amount: u64::try_from(loan).map_err(|_| TermPoolError::MathOverflow)?,
        repayment_amount: u64::try_from(repayment).map_err(|_| TermPoolError::MathOverflow)?,
        pledge_amount: net_pledge,
        creator_fee_amount,
        total_liquidity: pool.total_liquidity,
    })
}

/// Marginal rate for a given post-loan liquidity (BASE-scaled). Constant at
/// `r2` when the pool stays deep, linear between the two bounds, and
/// super-linear below `liquidity_bnd_1` as the pool approaches the floor.
pub fn rate_for_liquidity(pool: &Pool, liquidity_after: u128) -> Result<u128> {
    let r1 = pool.r1 as u128;
    let r2 = pool.r2 as u128;
    let bnd1 = pool.liquidity_bnd_1 as u128;
    let bnd2 = pool.liquidity_bnd_2 as u128;

    let rate = if liquidity_after < bnd1 {
        require!(liquidity_after > 0, TermPoolError::InsufficientLiquidity);
        r1.checked_mul(bnd1)
            .ok_or(TermPoolError::MathOverflow)?
            / liquidity_after
    } else if liquidity_after < bnd2 {
        let slope = (r1 - r2)
            .checked_mul(liquidity_after - bnd1)
            .ok_or(TermPoolError::MathOverflow)?
            / (bnd2 - bnd1);
        r1 - slope
    } else {
        r2
    };
    Ok(rate)
}

// ==================== UNIT TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn curve_pool(usable: u64, bnd1: u64, bnd2: u64) -> Pool {
        Pool {
            creator: Pubkey::new_unique(),
            proposed_creator: Pubkey::default(),
            loan_mint: Pubkey::new_unique(),
            coll_mint: Pubkey::new_unique(),
            loan_vault: Pubkey::new_unique(),
            coll_vault: Pubkey::new_unique(),
            loan_tenor: 90 * 86_400,
            max_loan_per_coll: 1_000_000_000,
            r1: 200_000_000_000_000_000, // 0.2
            r2: 20_000_000_000_000_000,  // 0.02
            liquidity_bnd_1: bnd1,
            liquidity_bnd_2: bnd2,
            min_loan: 100,
            base_aggr_bucket_size: 100,
            creator_fee: 0,
            coll_unit: 1_000_000_000,
            total_liquidity: usable + MIN_LIQUIDITY,
            total_lp_shares: 10_000_000,
            loan_idx: 1,
            total_fees_accrued: 0,
            bump: 255,
            loan_vault_bump: 254,
            coll_vault_bump: 253,
        }
    }

    #[test]
    fn quote_in_the_linear_band() {
        // usable 10^12, pledge chosen so max_loan == usable -> loan = usable/2
        let pool = curve_pool(1_000_000_000_000, 100_000_000_000, 1_000_000_000_000);
        let q = loan_terms(&pool, 1_000_000_000_000).unwrap();
        assert_eq!(q.loan_amount, 500_000_000_000);
        // post-loan liquidity 5*10^11 sits 4/9 of the way through the band:
        // rate = 0.2 - 0.18 * 4/9 = 0.12
        assert_eq!(q.repayment_amount, 560_000_000_000);
        assert_eq!(q.creator_fee_amount, 0);
        assert_eq!(q.pledge_amount, 1_000_000_000_000);
    }

    #[test]
    fn small_pledge_pays_the_deep_pool_rate() {
        let pool = curve_pool(1_000_000_000_000, 10_000_000_000, 100_000_000_000);
        let q = loan_terms(&pool, 1_000).unwrap();
        // max_loan = 1000, loan = 1000 * usable / (usable + 1000) = 999
        assert_eq!(q.loan_amount, 999);
        // flat r2 = 0.02
        assert_eq!(q.repayment_amount, 1_018);
    }

    #[test]
    fn draining_pledge_pays_a_super_linear_rate() {
        // usable 2*10^11; max_loan = 3x usable -> loan = 1.5*10^11,
        // post-loan liquidity 5*10^10 < bnd1 = 10^11
        let pool = curve_pool(200_000_000_000, 100_000_000_000, 200_000_000_000);
        let q = loan_terms(&pool, 600_000_000_000).unwrap();
        assert_eq!(q.loan_amount, 150_000_000_000);
        // rate = r1 * bnd1 / after = 0.2 * 2 = 0.4
        assert_eq!(q.repayment_amount, 210_000_000_000);
    }

    #[test]
    fn creator_fee_comes_off_the_pledge() {
        let mut pool = curve_pool(1_000_000_000_000, 100_000_000_000, 1_000_000_000_000);
        pool.creator_fee = 10_000_000_000_000_000; // 1%
        let q = loan_terms(&pool, 1_000_000).unwrap();
        assert_eq!(q.creator_fee_amount, 10_000);
        assert_eq!(q.pledge_amount, 990_000);
    }

    #[test]
    fn pool_at_the_floor_cannot_lend() {
        let mut pool = curve_pool(0, 10, 20);
        pool.total_liquidity = MIN_LIQUIDITY;
        let err = loan_terms(&pool, 1_000_000).unwrap_err();
        assert_eq!(err, TermPoolError::InsufficientLiquidity.into());
    }

    #[test]
    fn dust_pledges_are_too_small() {
        let pool = curve_pool(1_000_000_000_000, 100_000_000_000, 1_000_000_000_000);
        let err = loan_terms(&pool, 10).unwrap_err();
        assert_eq!(err, TermPoolError::LoanTooSmall.into());
    }

    #[test]
    fn loan_never_reaches_the_usable_liquidity() {
        let pool = curve_pool(1_000_000_000, 100_000_000, 500_000_000);
        // absurdly large pledge: the hyperbola still leaves liquidity behind
        let q = loan_terms(&pool, u64::MAX / 2).unwrap();
        assert!(q.loan_amount < 1_000_000_000);
    }

    #[test]
    fn loan_amount_and_effective_rate_are_monotone_in_pledge() {
        let pool = curve_pool(1_000_000_000_000, 100_000_000_000, 1_000_000_000_000);
        let mut prev: Option<LoanTermsQuote> = None;
        for pledge in (100_000_000u64..=2_000_000_000_000).step_by(40_000_000_000) {
            let q = loan_terms(&pool, pledge).unwrap();
            if let Some(p) = prev {
                assert!(q.loan_amount >= p.loan_amount);
                // effective rate (repay/loan - 1) must not decrease;
                // compare cross-multiplied to stay in integers
                let lhs = (p.repayment_amount - p.loan_amount) as u128 * q.loan_amount as u128;
                let rhs = (q.repayment_amount - q.loan_amount) as u128 * p.loan_amount as u128;
                assert!(rhs >= lhs);
            }
            prev = Some(q);
        }
    }

    #[test]
    fn rate_is_continuous_at_the_band_edges() {
        let pool = curve_pool(1_000_000_000_000, 100_000_000_000, 1_000_000_000_000);
        let r1 = pool.r1 as u128;
        let r2 = pool.r2 as u128;
        assert_eq!(
            rate_for_liquidity(&pool, pool.liquidity_bnd_1 as u128).unwrap(),
            r1
        );
        assert_eq!(
            rate_for_liquidity(&pool, pool.liquidity_bnd_2 as u128).unwrap(),
            r2
        );
        // just inside the super-linear segment the rate exceeds r1
        assert!(rate_for_liquidity(&pool, pool.liquidity_bnd_1 as u128 - 1).unwrap() > r1);
    }
}
