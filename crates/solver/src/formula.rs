use crate::types::{FundingParams, Recipient};

/// Capped-affine funding for one recipient at `rate`
#[must_use]
pub fn center_funding(recipient: &Recipient, params: &FundingParams, rate: f64) -> f64 {
    let uncapped = params.floor_for(recipient) + rate * recipient.people_served;
    params.effective_cap(recipient).clamp(uncapped)
}

/// Aggregate funding `F(rate)` over all recipients
#[must_use]
pub fn aggregate_funding(recipients: &[Recipient], params: &FundingParams, rate: f64) -> f64 {
    recipients
        .iter()
        .map(|recipient| center_funding(recipient, params, rate))
        .sum()
}

/// Whether the recipient's effective cap binds at `rate`
pub(crate) fn is_capped(recipient: &Recipient, params: &FundingParams, rate: f64) -> bool {
    let uncapped = params.floor_for(recipient) + rate * recipient.people_served;
    params.effective_cap(recipient).binds(uncapped)
}

/// Slope of `F` on `[lo, hi]` when no cap starts binding strictly inside it.
///
/// Returns `None` when some recipient changes regime between `lo` and `hi`,
/// i.e. a breakpoint of `F` lies in the bracket.
pub(crate) fn affine_slope(
    recipients: &[Recipient],
    params: &FundingParams,
    lo: f64,
    hi: f64,
) -> Option<f64> {
    let mut slope = 0.0;
    for recipient in recipients {
        let capped_lo = is_capped(recipient, params, lo);
        if capped_lo != is_capped(recipient, params, hi) {
            return None;
        }
        if !capped_lo {
            slope += recipient.people_served;
        }
    }
    Some(slope)
}

/// Rate at which the recipient's cap starts binding, if it ever does
pub(crate) fn breakpoint(recipient: &Recipient, params: &FundingParams) -> Option<f64> {
    if recipient.people_served <= 0.0 {
        return None;
    }
    let limit = params.effective_cap(recipient).limit()?;
    let rate = (limit - params.floor_for(recipient)) / recipient.people_served;
    (rate > 0.0).then_some(rate)
}
