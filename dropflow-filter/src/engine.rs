//! The decision engine: verdicts and the per-frame filter.

use crate::parse::{self, ExtractedFields, PassEarly};
use crate::port::PortLookup;

/// Outcome of inspecting one frame. There are exactly two: hand the frame
/// to normal processing, or discard it immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Verdict {
    Pass,
    Drop,
}

/// Combine the walker's outcome with the configured port.
///
/// Only an exact, fully validated TCP destination-port match drops.
/// Everything else passes: a [`PassEarly`] from the walker, an unset port,
/// or a mismatch. Pure and total over its inputs -- ambiguous and
/// definitely-not-matching are treated identically.
pub fn decide(parsed: Result<ExtractedFields, PassEarly>, configured: Option<u16>) -> Verdict {
    match (parsed, configured) {
        (Ok(fields), Some(port)) if fields.destination_port == port => Verdict::Drop,
        _ => Verdict::Pass,
    }
}

/// Per-frame plumbing around [`parse`](crate::parse::parse) and [`decide`].
///
/// Holds nothing but the lookup handle. No state survives from one frame to
/// the next, so a single `Filter` can be shared across any number of
/// concurrent callers.
pub struct Filter<S> {
    source: S,
}

impl<S: PortLookup> Filter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Inspect one frame and yield a verdict.
    ///
    /// The configured port is snapshotted exactly once per call; the whole
    /// decision sees a single consistent value even if the store is being
    /// written concurrently.
    pub fn process(&self, frame: &[u8]) -> Verdict {
        let configured = self.source.lookup();
        decide(parse::parse(frame), configured)
    }

    /// The configured port as of this instant.
    pub fn configured(&self) -> Option<u16> {
        self.source.lookup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ETHERTYPE_IPV4, IPPROTO_TCP};
    use crate::port::PortSlot;
    use std::sync::Arc;

    /// Minimal valid Ethernet + IPv4 (ihl=5) + TCP frame.
    fn tcp_frame(dst_port: u16) -> Vec<u8> {
        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

        let mut ip = [0u8; 20];
        ip[0] = 0x45;
        ip[2..4].copy_from_slice(&40u16.to_be_bytes());
        ip[9] = IPPROTO_TCP;
        frame.extend_from_slice(&ip);

        let mut tcp = [0u8; 20];
        tcp[0..2].copy_from_slice(&51000u16.to_be_bytes());
        tcp[2..4].copy_from_slice(&dst_port.to_be_bytes());
        frame.extend_from_slice(&tcp);

        frame
    }

    fn udp_frame() -> Vec<u8> {
        let mut frame = tcp_frame(4040);
        frame[23] = 17;
        frame
    }

    #[test]
    fn test_decide_pass_early_always_passes() {
        // Even with a configured port, a walker failure must never drop.
        assert_eq!(
            decide(Err(PassEarly::TruncatedEthernet), Some(4040)),
            Verdict::Pass
        );
        assert_eq!(decide(Err(PassEarly::NotIpv4), Some(4040)), Verdict::Pass);
        assert_eq!(
            decide(Err(PassEarly::InvalidHeaderLength), None),
            Verdict::Pass
        );
    }

    #[test]
    fn test_decide_unset_port_passes() {
        let fields = ExtractedFields {
            destination_port: 4040,
        };
        assert_eq!(decide(Ok(fields), None), Verdict::Pass);
    }

    #[test]
    fn test_decide_match_drops_mismatch_passes() {
        let fields = ExtractedFields {
            destination_port: 4040,
        };
        assert_eq!(decide(Ok(fields), Some(4040)), Verdict::Drop);
        assert_eq!(decide(Ok(fields), Some(8080)), Verdict::Pass);
    }

    #[test]
    fn test_too_short_frame_passes() {
        let slot = Arc::new(PortSlot::new());
        slot.set(4040);
        let filter = Filter::new(slot);
        assert_eq!(filter.process(&[0u8; 13]), Verdict::Pass);
    }

    #[test]
    fn test_arp_frame_passes() {
        let slot = Arc::new(PortSlot::new());
        slot.set(4040);
        let filter = Filter::new(slot);

        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&0x0806u16.to_be_bytes());
        assert_eq!(filter.process(&frame), Verdict::Pass);
    }

    #[test]
    fn test_udp_frame_passes() {
        let slot = Arc::new(PortSlot::new());
        slot.set(4040);
        let filter = Filter::new(slot);
        assert_eq!(filter.process(&udp_frame()), Verdict::Pass);
    }

    #[test]
    fn test_matching_tcp_frame_drops() {
        let slot = Arc::new(PortSlot::new());
        slot.set(4040);
        let filter = Filter::new(slot);
        assert_eq!(filter.process(&tcp_frame(4040)), Verdict::Drop);
    }

    #[test]
    fn test_non_matching_tcp_frame_passes() {
        let slot = Arc::new(PortSlot::new());
        slot.set(4040);
        let filter = Filter::new(slot);
        assert_eq!(filter.process(&tcp_frame(8080)), Verdict::Pass);
    }

    #[test]
    fn test_empty_store_passes_everything() {
        let filter = Filter::new(PortSlot::new());
        assert_eq!(filter.process(&tcp_frame(4040)), Verdict::Pass);
        assert_eq!(filter.process(&tcp_frame(8080)), Verdict::Pass);
    }

    #[test]
    fn test_same_frame_same_verdict() {
        let slot = Arc::new(PortSlot::new());
        slot.set(4040);
        let filter = Filter::new(slot);

        let frame = tcp_frame(4040);
        let first = filter.process(&frame);
        let second = filter.process(&frame);
        assert_eq!(first, second);
        assert_eq!(first, Verdict::Drop);
    }

    #[test]
    fn test_verdict_follows_store_updates() {
        let slot = Arc::new(PortSlot::new());
        let filter = Filter::new(slot.clone());
        let frame = tcp_frame(4040);

        assert_eq!(filter.process(&frame), Verdict::Pass);
        slot.set(4040);
        assert_eq!(filter.process(&frame), Verdict::Drop);
        slot.clear();
        assert_eq!(filter.process(&frame), Verdict::Pass);
    }
}
