use crate::aggregator::{PeerAggregate, PeerAggregates};

pub const SECS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;
pub const MSAT_PER_SAT: f64 = 1000.0;

/// Placeholder for the not yet defined swap maturity metric
pub const SWAP_MATURITY_PLACEHOLDER: &str = "null";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub alias: String,
    pub local_balance: u64,
    pub forwards: u64,
    pub total_fees_earnt: f64,
    pub age_days: f64,
    pub fees_per_day: f64,
    pub fees_per_day_per_balance: f64,
    pub is_open: bool,
}

impl ReportRow {
    pub fn new(alias: &str, peer: &PeerAggregate) -> Self {
        let age_days = peer.max_channel_age_secs / SECS_PER_DAY;
        let total_fees_earnt = peer.total_fees_msat as f64 / MSAT_PER_SAT;

        let fees_per_day = if age_days > 0.0 {
            total_fees_earnt / age_days
        } else {
            0.0
        };

        let fees_per_day_per_balance = if peer.local_balance > 0 {
            fees_per_day / peer.local_balance as f64
        } else {
            0.0
        };

        Self {
            alias: alias.to_string(),
            local_balance: peer.local_balance,
            forwards: peer.forward_count,
            total_fees_earnt,
            age_days,
            fees_per_day,
            fees_per_day_per_balance,
            is_open: peer.is_open,
        }
    }
}

/// Rows sorted by fees per day per unit of balance, highest first.
///
/// The sort is stable, so peers with equal ratios keep their aggregation order.
pub fn rank(peers: &PeerAggregates) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = peers
        .iter()
        .map(|(alias, peer)| ReportRow::new(alias, peer))
        .collect();

    rows.sort_by(|a, b| {
        b.fees_per_day_per_balance
            .total_cmp(&a.fees_per_day_per_balance)
    });

    rows
}
