use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::ApiError;
use relaydir_db::models::node::Node;
use relaydir_db::repositories::node_repo::NodeRepository;

pub const MIN_PEER_COUNT: usize = 1;
pub const MAX_PEER_COUNT: usize = 20;

/// Selection result with full rows; callers project to the public view
/// before anything leaves the process.
#[derive(Debug)]
pub struct PeerSelection {
    pub peers: Vec<Node>,
    /// Eligible candidates before truncation to `count`.
    pub total_available: usize,
    pub has_more: bool,
}

/// Ranks Online nodes by measured health and hands out a bounded batch.
/// Equally-healthy nodes are reshuffled on every call so repeated identical
/// requests spread discovery traffic across the pool.
#[derive(Debug, Clone)]
pub struct PeerSelector {
    nodes: NodeRepository,
}

impl PeerSelector {
    pub fn new(nodes: NodeRepository) -> Self {
        Self { nodes }
    }

    pub async fn select_peers(
        &self,
        count: usize,
        protocol: Option<&str>,
        region: Option<&str>,
    ) -> Result<PeerSelection, ApiError> {
        validate_count(count)?;

        let online = self.nodes.get_online_nodes().await?;
        let mut candidates: Vec<Node> = online
            .into_iter()
            .filter(|n| is_candidate(n, protocol, region))
            .collect();

        rank_candidates(&mut candidates, &mut rand::rng());

        Ok(take_batch(candidates, count))
    }
}

fn validate_count(count: usize) -> Result<(), ApiError> {
    if !(MIN_PEER_COUNT..=MAX_PEER_COUNT).contains(&count) {
        return Err(ApiError::Validation(format!(
            "count must be between {MIN_PEER_COUNT} and {MAX_PEER_COUNT}"
        )));
    }
    Ok(())
}

/// Cuts the ranked pool down to `count`, keeping the pre-truncation size so
/// callers can report how much of the pool they did not see. An empty pool
/// is a normal result, not an error.
fn take_batch(mut candidates: Vec<Node>, count: usize) -> PeerSelection {
    let total_available = candidates.len();
    candidates.truncate(count);
    PeerSelection {
        has_more: total_available > count,
        total_available,
        peers: candidates,
    }
}

/// Eligibility: Online status, exact protocol match, and the region rule
/// where a node with no region data passes any region filter.
fn is_candidate(node: &Node, protocol: Option<&str>, region: Option<&str>) -> bool {
    if !node.is_online() {
        return false;
    }
    if let Some(p) = protocol {
        if node.protocol != p {
            return false;
        }
    }
    if let Some(r) = region {
        match &node.region {
            Some(node_region) if node_region != r => return false,
            _ => {}
        }
    }
    true
}

/// Shuffle first, then stable-sort on response time with nulls last. The
/// stable sort preserves the shuffled order inside each tie group, which is
/// what makes the tie-break uniformly random and fresh per call.
fn rank_candidates<R: Rng + ?Sized>(candidates: &mut [Node], rng: &mut R) {
    candidates.shuffle(rng);
    candidates.sort_by(|a, b| match (a.response_time_ms, b.response_time_ms) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use relaydir_db::models::node::{STATUS_OFFLINE, STATUS_ONLINE};

    fn node(id: i64, region: Option<&str>, response_time_ms: Option<i32>) -> Node {
        let now = chrono::Utc::now();
        Node {
            id,
            name: format!("node-{id}"),
            description: None,
            host: format!("relay{id}.example.net"),
            port: 443,
            protocol: "wss".to_string(),
            allow_relay: true,
            network_name: None,
            network_secret: None,
            max_connections: 100,
            region: region.map(|s| s.to_string()),
            isp: None,
            contact_email: None,
            contact_url: None,
            status: STATUS_ONLINE.to_string(),
            response_time_ms,
            last_status_update: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn protocol_filter_is_exact() {
        let n = node(1, None, Some(10));
        assert!(is_candidate(&n, Some("wss"), None));
        assert!(!is_candidate(&n, Some("ws"), None));
        assert!(is_candidate(&n, None, None));
    }

    #[test]
    fn region_filter_keeps_nodes_without_region() {
        let tagged = node(1, Some("EU"), Some(10));
        let untagged = node(2, None, Some(10));
        assert!(!is_candidate(&tagged, None, Some("US")));
        assert!(is_candidate(&tagged, None, Some("EU")));
        assert!(is_candidate(&untagged, None, Some("US")));
    }

    #[test]
    fn ordering_is_ascending_with_nulls_last() {
        let mut pool = vec![
            node(1, None, None),
            node(2, None, Some(80)),
            node(3, None, Some(5)),
            node(4, None, None),
            node(5, None, Some(20)),
        ];
        let mut rng = StdRng::seed_from_u64(42);
        rank_candidates(&mut pool, &mut rng);

        let times: Vec<Option<i32>> = pool.iter().map(|n| n.response_time_ms).collect();
        assert_eq!(&times[..3], &[Some(5), Some(20), Some(80)]);
        assert_eq!(&times[3..], &[None, None]);
    }

    #[test]
    fn tie_break_redistributes_across_calls() {
        // Three nodes with identical health; over many fresh draws each
        // should land in first place roughly a third of the time.
        let mut firsts = [0u32; 3];
        let mut rng = StdRng::seed_from_u64(7);
        let iterations = 3000;
        for _ in 0..iterations {
            let mut pool = vec![
                node(1, None, Some(10)),
                node(2, None, Some(10)),
                node(3, None, Some(10)),
            ];
            rank_candidates(&mut pool, &mut rng);
            firsts[(pool[0].id - 1) as usize] += 1;
        }
        let expected = iterations as f64 / 3.0;
        for count in firsts {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(
                deviation < 0.15,
                "first-place share too skewed: {firsts:?}"
            );
        }
    }

    #[test]
    fn tie_break_only_reorders_within_tie_groups() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let mut pool = vec![
                node(1, None, Some(10)),
                node(2, None, Some(10)),
                node(3, None, Some(50)),
            ];
            rank_candidates(&mut pool, &mut rng);
            assert_eq!(pool[2].id, 3, "slower node must never jump the queue");
        }
    }

    #[test]
    fn count_outside_the_bounds_is_rejected() {
        assert!(validate_count(0).is_err());
        assert!(validate_count(MAX_PEER_COUNT + 1).is_err());
        assert!(validate_count(MIN_PEER_COUNT).is_ok());
        assert!(validate_count(MAX_PEER_COUNT).is_ok());
    }

    #[test]
    fn batch_is_truncated_and_reports_the_full_pool() {
        let pool: Vec<Node> = (1..=7).map(|id| node(id, None, Some(10))).collect();
        let batch = take_batch(pool, 5);
        assert_eq!(batch.peers.len(), 5);
        assert_eq!(batch.total_available, 7);
        assert!(batch.has_more);
    }

    #[test]
    fn small_pool_is_handed_out_whole() {
        let pool: Vec<Node> = (1..=3).map(|id| node(id, None, Some(10))).collect();
        let batch = take_batch(pool, 5);
        assert_eq!(batch.peers.len(), 3);
        assert_eq!(batch.total_available, 3);
        assert!(!batch.has_more);
    }

    #[test]
    fn empty_pool_is_a_normal_result() {
        let batch = take_batch(Vec::new(), 5);
        assert!(batch.peers.is_empty());
        assert_eq!(batch.total_available, 0);
        assert!(!batch.has_more);
    }

    #[test]
    fn offline_nodes_are_never_candidates() {
        // The repository only fetches Online rows; the predicate still
        // rejects anything else in case a caller hands it a mixed pool.
        let mut n = node(1, None, Some(10));
        n.status = STATUS_OFFLINE.to_string();
        assert!(!is_candidate(&n, None, None));
    }
}
