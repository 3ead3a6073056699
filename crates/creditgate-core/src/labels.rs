//! Operation labels used in log fields.
//!
//! These constants keep operation naming consistent across crates so log
//! queries can filter on a single `operation` value.

/// Ledger balance read.
pub const OP_LEDGER_READ: &str = "ledger_read";
/// Ledger balance overwrite.
pub const OP_LEDGER_SET: &str = "ledger_set";
/// Background per-request deduction.
pub const OP_LEDGER_DEDUCT: &str = "ledger_deduct";
/// Refill sweep over the known users.
pub const OP_REFILL_SWEEP: &str = "refill_sweep";

/// Build the operation name reported for a background deduction.
#[inline]
pub fn deduct_operation_name(user_id: &str) -> String {
    format!("{OP_LEDGER_DEDUCT}:{user_id}")
}
