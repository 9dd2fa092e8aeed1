//! Context window sizes offered by the text generation service.

/// Maximum prompt length, in tokens, for a subscription tier.
///
/// Tiers outside 1..=3 have no generation access and yield `None`.
pub const fn max_context_tokens(tier: u8) -> Option<usize> {
    match tier {
        1 => Some(3072),
        2 => Some(6144),
        3 => Some(8192),
        _ => None,
    }
}

/// Keep the most recent tokens that fit the tier's context window.
///
/// Generation prompts are cut from the front so the text closest to the
/// continuation survives. Returns `None` for tiers without a window.
pub fn fit_to_context(ids: &[u32], tier: u8) -> Option<&[u32]> {
    let limit = max_context_tokens(tier)?;
    Some(&ids[ids.len().saturating_sub(limit)..])
}
