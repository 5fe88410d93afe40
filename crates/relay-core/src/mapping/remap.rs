//! In-place header extension id remapping
//!
//! The mapping is applied as a sequence of pairwise exchanges on the packet,
//! so no copy of the extension data is needed. Chains (1->2, 2->3) and cycles
//! (1->2, 2->3, 3->1) work because after every exchange the pending move that
//! would read from the slot just written is redirected to the slot where that
//! content was displaced to.

use tracing::warn;

use super::ConsumerRtpMapping;

/// Upper bound of extension pairs applied to one packet
pub const MAX_EXTENSION_MOVES: usize = 128;

/// Packet side of the remapping: exchange the contents stored under two
/// header extension ids.
pub trait SwapHeaderExtensions {
    /// Exchange whatever is stored under `a` with whatever is stored under
    /// `b`. An absent id is "no content" on that side and is not an error.
    fn swap_header_extensions(&mut self, a: u8, b: u8);

    /// Whether the packet carries any id-addressable extension
    fn has_header_extensions(&self) -> bool {
        true
    }
}

/// Move every extension of `packet` to its mapped id, or back to its
/// original id when `reverse` is set.
///
/// Tables with more than [`MAX_EXTENSION_MOVES`] pairs are truncated to the
/// first pairs in ascending source id order and a warning is logged.
pub fn remap_header_extensions<P>(packet: &mut P, mapping: &ConsumerRtpMapping, reverse: bool)
where
    P: SwapHeaderExtensions + ?Sized,
{
    let table = mapping.header_extensions();
    if table.is_empty() || !packet.has_header_extensions() {
        return;
    }

    let mut sources = [0u8; MAX_EXTENSION_MOVES];
    let mut destinations = [0u8; MAX_EXTENSION_MOVES];
    let mut moves = 0;

    for (id, mapped_id) in table.iter() {
        if moves == MAX_EXTENSION_MOVES {
            warn!(
                "RTP header extension map is too big ({} entries), truncating to {}",
                table.len(),
                MAX_EXTENSION_MOVES
            );
            break;
        }

        let (source, destination) = if reverse { (mapped_id, id) } else { (id, mapped_id) };
        sources[moves] = source;
        destinations[moves] = destination;
        moves += 1;
    }

    for i in 0..moves {
        packet.swap_header_extensions(sources[i], destinations[i]);

        // Only the first pending move reading from the overwritten slot is redirected
        if let Some(j) = (i..moves).find(|&j| sources[j] == destinations[i]) {
            sources[j] = sources[i];
        }
    }
}
