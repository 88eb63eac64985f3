use crate::types::RegionVerdict;

/// Deterministic display order for all regions.
///
/// Sort key is `(offline, index in preferred)`; regions absent from
/// `preferred` sort last within their group, keeping input order. The output
/// always has one entry per verdict.
pub fn order_regions(verdicts: &[RegionVerdict], preferred: &[String]) -> Vec<String> {
    let mut keyed: Vec<(bool, usize, &str)> = verdicts
        .iter()
        .map(|v| {
            let idx = preferred
                .iter()
                .position(|p| *p == v.region)
                .unwrap_or(usize::MAX);
            (!v.online, idx, v.region.as_str())
        })
        .collect();
    keyed.sort_by_key(|(offline, idx, _)| (*offline, *idx));
    keyed.into_iter().map(|(_, _, r)| r.to_string()).collect()
}
