use std::fs;
use std::path::Path;
use std::sync::Arc;

use dropflow_filter::{Filter, PortSlot, Verdict};

use crate::state::FilterStats;

/// Decode one line of a frames file into raw bytes.
///
/// A line is a hex-encoded frame; embedded whitespace is allowed so dumps
/// can keep their byte grouping, and `#` starts a comment. Returns `None`
/// for blank and comment-only lines.
pub fn decode_frame_line(line: &str) -> Option<Result<Vec<u8>, hex::FromHexError>> {
    let payload = line.split('#').next().unwrap_or("");
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    Some(hex::decode(cleaned))
}

/// Replay every frame in `path` through the filter, recording stats and
/// logging verdicts. Stands in for the packet-receive hook this agent does
/// not own.
///
/// Malformed lines are logged and skipped, never fatal -- a bad dump should
/// not take the agent down. Returns the number of frames processed.
pub fn replay_file(
    path: &Path,
    filter: &Filter<Arc<PortSlot>>,
    stats: &FilterStats,
) -> anyhow::Result<u64> {
    let content = fs::read_to_string(path)?;
    let mut processed: u64 = 0;

    for (lineno, line) in content.lines().enumerate() {
        let frame = match decode_frame_line(line) {
            None => continue,
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                tracing::warn!(
                    "{}:{}: skipping malformed hex line: {}",
                    path.display(),
                    lineno + 1,
                    e
                );
                continue;
            }
        };

        processed += 1;
        let verdict = filter.process(&frame);
        match verdict {
            Verdict::Drop => {
                // A drop means the destination port equaled the configured
                // port; snapshot it again for the log and the per-port stat.
                let matched = filter.configured();
                if let Some(port) = matched {
                    tracing::info!("frame {}: drop (tcp dst port {})", processed, port);
                } else {
                    tracing::info!("frame {}: drop", processed);
                }
                stats.record(verdict, matched);
            }
            Verdict::Pass => {
                tracing::debug!("frame {}: pass ({} bytes)", processed, frame.len());
                stats.record(verdict, None);
            }
        }
    }

    Ok(processed)
}
