use anchor_lang::prelude::*;

#[error_code]
pub enum TermPoolError {
    // ─── Construction / terms ───────────────────────────────────

    #[msg("Address must not be the default pubkey")]
    InvalidZeroAddress,

    #[msg("Loan and collateral currency must differ")]
    IdenticalLoanAndCollCcy,

    #[msg("Loan tenor below the minimum")]
    InvalidLoanTenor,

    #[msg("Max loan per collateral unit must be greater than zero")]
    InvalidMaxLoanPerColl,

    #[msg("Rate parameters must satisfy r1 > r2 > 0")]
    InvalidRateParams,

    #[msg("Liquidity bounds must satisfy 0 < bnd1 < bnd2")]
    InvalidLiquidityBnds,

    #[msg("Minimum loan size must be greater than zero")]
    InvalidMinLoan,

    #[msg("Aggregation bucket size must be a multiple of 10 within bounds")]
    InvalidBaseAggrSize,

    #[msg("Creator fee exceeds the maximum")]
    InvalidFee,

    // ─── Liquidity ──────────────────────────────────────────────

    #[msg("Pool has no lendable liquidity")]
    InsufficientLiquidity,

    #[msg("Add amount below the minimum")]
    InvalidAddAmount,

    #[msg("Invalid share amount or unclaimed entitlement outstanding")]
    InvalidRemove,

    #[msg("Position is still within its minimum LPing period")]
    BeforeEarliestRemove,

    // ─── Loan amounts ───────────────────────────────────────────

    #[msg("Quoted loan below the pool minimum")]
    LoanTooSmall,

    #[msg("Quoted loan below the caller's limit")]
    LoanBelowLimit,

    #[msg("Quoted repayment above the caller's limit")]
    RepaymentAboveLimit,

    #[msg("Loan terms are degenerate")]
    ErroneousLoanTerms,

    // ─── Loan lifecycle ─────────────────────────────────────────

    #[msg("Loan index does not exist")]
    InvalidLoanIdx,

    #[msg("Loan already repaid")]
    AlreadyRepaid,

    #[msg("Loan expired and can no longer be repaid")]
    CannotRepayAfterExpiry,

    #[msg("Loan cannot be settled in its issuance slot")]
    CannotRepayInSameBlock,

    #[msg("Repayment must be for the exact amount owed")]
    InvalidSendAmount,

    #[msg("Collateral recipient must be the borrower")]
    InvalidRecipient,

    #[msg("Deadline has passed")]
    PastDeadline,

    // ─── Claims ─────────────────────────────────────────────────

    #[msg("Loan index precedes the position's claim frontier")]
    UnentitledFromLoanIdx,

    #[msg("Loan indices must be strictly ascending")]
    NonAscendingLoanIdxs,

    #[msg("Claim range crosses a share-change checkpoint")]
    LoanIdxsWithChangingShares,

    #[msg("Bucket boundaries are misaligned")]
    InvalidSubAggregation,

    #[msg("Position held no shares over the claimed range")]
    ZeroShareClaim,

    #[msg("Nothing to claim")]
    NothingToClaim,

    #[msg("Range contains a loan that is neither repaid nor expired")]
    CannotClaimWithUnsettledLoan,

    // ─── Authorization ──────────────────────────────────────────

    #[msg("Caller is not approved to act on behalf of the owner")]
    UnapprovedSender,

    #[msg("Account holds no LP position in this pool")]
    MustBeLp,

    #[msg("Delegate must not be the owner or the default pubkey")]
    InvalidApprovalAddress,

    #[msg("Unauthorized: signer does not match expected authority")]
    Unauthorized,

    // ─── Ambient ────────────────────────────────────────────────

    #[msg("Token mint does not match the pool's currency")]
    MintMismatch,

    #[msg("Math overflow")]
    MathOverflow,

    #[msg("Share checkpoint history is full; claim through the present first")]
    ShareHistoryFull,
}
