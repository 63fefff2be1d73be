//! IPv4/TCP destination-port drop filter.
//!
//! Given a raw Ethernet frame, decide whether it is an IPv4/TCP packet whose
//! destination port matches a configured value. Matching frames get
//! [`Verdict::Drop`]; everything else -- truncated frames, foreign
//! ethertypes, non-TCP protocols, an unset port -- gets [`Verdict::Pass`].
//! The filter fails open: ambiguity never causes a drop.
//!
//! Processing is strictly per-frame. Nothing is cached between frames and
//! the only shared state is the read-only port store behind [`PortLookup`],
//! so one [`Filter`] can serve any number of concurrent callers.
//!
//! ```
//! use dropflow_filter::{Filter, PortSlot, Verdict};
//! use std::sync::Arc;
//!
//! let slot = Arc::new(PortSlot::new());
//! slot.set(4040);
//!
//! let filter = Filter::new(slot);
//! // A 13-byte frame is too short for an Ethernet header: fail open.
//! assert_eq!(filter.process(&[0u8; 13]), Verdict::Pass);
//! ```

pub mod engine;
pub mod parse;
pub mod port;

pub use engine::{decide, Filter, Verdict};
pub use parse::{parse, ExtractedFields, PassEarly};
pub use port::{PortLookup, PortSlot, DEFAULT_PORT};
