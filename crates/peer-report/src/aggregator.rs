use crate::{
    resolver::{TimestampResolver, TxLookup},
    snapshot::{ChannelRecord, ForwardingEvent, coerce_amount},
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Aggregates keyed by peer alias, in first-seen order.
pub type PeerAggregates = IndexMap<String, PeerAggregate>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerAggregate {
    /// Age of the oldest confirmed channel with this peer
    pub max_channel_age_secs: f64,
    pub forward_count: u64,
    pub total_fees_msat: u64,
    /// Set once any channel record names this peer
    pub is_open: bool,
    /// Summed across all channels with this peer
    pub local_balance: u64,
}

/// Builds one aggregate per peer alias: channels first, then forwarding events.
pub async fn aggregate<L: TxLookup>(
    channels: &[ChannelRecord],
    events: &[ForwardingEvent],
    resolver: &mut TimestampResolver<L>,
    now: DateTime<Utc>,
) -> PeerAggregates {
    let mut peers = PeerAggregates::new();
    aggregate_channels(&mut peers, channels, resolver, now).await;
    aggregate_forwards(&mut peers, events);
    peers
}

pub async fn aggregate_channels<L: TxLookup>(
    peers: &mut PeerAggregates,
    channels: &[ChannelRecord],
    resolver: &mut TimestampResolver<L>,
    now: DateTime<Utc>,
) {
    info!("Fetching channel timestamps for {} channels", channels.len());

    for (index, channel) in channels.iter().enumerate() {
        debug!(channel = index + 1, total = channels.len(), "processing channel");

        let local_balance = coerce_amount(channel.local_balance.as_ref()).unwrap_or_else(|err| {
            warn!(
                "Could not convert local_balance for channel_point {}: {}. Defaulting to 0.",
                channel.channel_point().unwrap_or("N/A"),
                err
            );
            0
        });

        let age_secs = channel_age_secs(channel, resolver, now).await;

        let Some(alias) = channel.alias() else {
            warn!(
                "Channel {} has no peer_alias, skipping",
                channel.channel_point().unwrap_or("N/A")
            );
            continue;
        };

        let entry = peers.entry(alias.to_string()).or_default();
        entry.max_channel_age_secs = entry.max_channel_age_secs.max(age_secs);
        entry.local_balance = entry.local_balance.saturating_add(local_balance);
        entry.is_open = true;
    }
}

async fn channel_age_secs<L: TxLookup>(
    channel: &ChannelRecord,
    resolver: &mut TimestampResolver<L>,
    now: DateTime<Utc>,
) -> f64 {
    let Some(txid) = channel.funding_txid() else {
        warn!(
            "Channel for peer {} is missing channel_point, age defaults to 0",
            channel.alias().unwrap_or("N/A")
        );
        return 0.0;
    };

    match resolver.resolve(txid).await {
        Some(confirmed_at) => {
            let age = (now - confirmed_at).num_milliseconds() as f64 / 1000.0;
            age.max(0.0)
        }
        None => {
            warn!(
                "Could not get timestamp for channel_point {}",
                channel.channel_point().unwrap_or(txid)
            );
            0.0
        }
    }
}

pub fn aggregate_forwards(peers: &mut PeerAggregates, events: &[ForwardingEvent]) {
    for event in events {
        // missing fees are common, no need to warn
        let fee_msat = coerce_amount(event.fee_msat.as_ref()).unwrap_or_default();

        let alias_in = event.alias_in();
        let alias_out = event.alias_out().filter(|out| Some(*out) != alias_in);

        for alias in [alias_in, alias_out].into_iter().flatten() {
            let entry = peers.entry(alias.to_string()).or_default();
            entry.forward_count += 1;
            entry.total_fees_msat = entry.total_fees_msat.saturating_add(fee_msat);
        }
    }
}
