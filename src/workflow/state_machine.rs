use crate::errors::CyberHuntError;
use crate::models::review::ReviewStatus;

/// Whether `from -> to` is an edge of the review state machine.
///
/// `pending -> assigned -> in_review -> {approved, rejected, needs_info}`,
/// `needs_info -> in_review` once the researcher answers, a review waiting
/// on the researcher may also be decided directly, and every open state can
/// be escalated. Nothing leaves `approved` or `rejected`. Unassignment
/// (back to pending) is a separate operation outside this table.
pub fn can_transition(from: ReviewStatus, to: ReviewStatus) -> bool {
    use ReviewStatus::*;

    if from.is_terminal() {
        return false;
    }
    match (from, to) {
        (Pending, Assigned) => true,
        (Assigned, InReview) => true,
        (InReview, Approved | Rejected | NeedsInfo) => true,
        (NeedsInfo, InReview | Approved | Rejected) => true,
        (Escalated, Escalated) => false,
        (_, Escalated) => true,
        _ => false,
    }
}

pub fn check_transition(from: ReviewStatus, to: ReviewStatus) -> Result<(), CyberHuntError> {
    if from.is_terminal() {
        return Err(CyberHuntError::InvalidTransition(format!(
            "review is already {}; decisions are final",
            from
        )));
    }
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CyberHuntError::InvalidTransition(format!(
            "cannot move a review from {} to {}",
            from, to
        )))
    }
}
