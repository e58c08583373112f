/// Status fragments meaning the listing is no longer on the market
const EXPIRED_KEYWORDS: [&str; 4] = ["expired", "off market", "withdrawn", "cancelled"];

/// Status fragments meaning the listing is live
const ACTIVE_KEYWORDS: [&str; 3] = ["active", "for sale", "available"];

/// Derive the `expired` flag from a free-text status.
///
/// Matching is case-insensitive and by substring. Expired keywords are checked
/// first, so "Active - Withdrawn" is expired. `None` means the status says
/// nothing either way and the stored flag must be left alone.
pub fn should_be_expired(status: Option<&str>) -> Option<bool> {
    let status = status?.to_lowercase();

    if EXPIRED_KEYWORDS.iter().any(|k| status.contains(k)) {
        Some(true)
    } else if ACTIVE_KEYWORDS.iter().any(|k| status.contains(k)) {
        Some(false)
    } else {
        None
    }
}
