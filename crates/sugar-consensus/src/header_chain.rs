//! In-memory linear header index.
//!
//! Heights are positions in a vector, so ancestor lookup is O(1). Used by
//! the node's replay tooling and by tests; a full node would back
//! [`HeaderView`] with its block index instead.

use crate::arith::{U256Ext, U256};
use crate::block::BlockHeader;
use crate::chain_view::HeaderView;
use crate::work::block_proof;

/// Header fields the retarget engine reads, plus cumulative work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedHeader {
    pub height: u32,
    pub time: i64,
    pub bits: u32,
    pub chain_work: U256,
}

/// A single chain from genesis to tip.
#[derive(Debug, Clone, Default)]
pub struct HeaderChain {
    headers: Vec<IndexedHeader>,
}

impl HeaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, returning its height.
    pub fn push(&mut self, time: i64, bits: u32) -> u32 {
        let height = self.headers.len() as u32;
        let parent_work = self
            .headers
            .last()
            .map(|h| h.chain_work)
            .unwrap_or_else(U256::zero);
        self.headers.push(IndexedHeader {
            height,
            time,
            bits,
            chain_work: parent_work.wrapping_add(block_proof(bits)),
        });
        height
    }

    /// Append a full block header.
    pub fn push_header(&mut self, header: &BlockHeader) -> u32 {
        self.push(header.block_time(), header.bits)
    }

    /// Drop every header above `height`.
    pub fn truncate(&mut self, height: u32) {
        self.headers.truncate(height as usize + 1);
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn get(&self, height: u32) -> Option<&IndexedHeader> {
        self.headers.get(height as usize)
    }

    /// Cursor at `height`.
    pub fn at(&self, height: u32) -> Option<ChainCursor<'_>> {
        self.get(height).map(|_| ChainCursor {
            chain: self,
            height,
        })
    }

    /// Cursor at the last header.
    pub fn tip(&self) -> Option<ChainCursor<'_>> {
        self.headers.len().checked_sub(1).and_then(|h| self.at(h as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedHeader> {
        self.headers.iter()
    }
}

/// Borrowed position in a [`HeaderChain`].
#[derive(Debug, Clone, Copy)]
pub struct ChainCursor<'a> {
    chain: &'a HeaderChain,
    height: u32,
}

impl<'a> ChainCursor<'a> {
    fn entry(&self) -> &'a IndexedHeader {
        // Cursors are only built for heights present in the chain, and the
        // shared borrow keeps the chain from shrinking.
        &self.chain.headers[self.height as usize]
    }
}

impl HeaderView for ChainCursor<'_> {
    fn height(&self) -> u32 {
        self.height
    }

    fn time(&self) -> i64 {
        self.entry().time
    }

    fn bits(&self) -> u32 {
        self.entry().bits
    }

    fn chain_work(&self) -> U256 {
        self.entry().chain_work
    }

    fn parent(&self) -> Option<Self> {
        self.height.checked_sub(1).and_then(|h| self.chain.at(h))
    }

    fn ancestor(&self, height: u32) -> Option<Self> {
        if height > self.height {
            return None;
        }
        self.chain.at(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_heights_and_work() {
        let mut chain = HeaderChain::new();
        assert!(chain.tip().is_none());
        assert_eq!(chain.push(100, 0x207f_ffff), 0);
        assert_eq!(chain.push(105, 0x207f_ffff), 1);
        assert_eq!(chain.push(110, 0x207f_ffff), 2);

        assert_eq!(chain.len(), 3);
        let tip = chain.tip().unwrap();
        assert_eq!(tip.height(), 2);
        assert_eq!(tip.time(), 110);
        assert_eq!(tip.chain_work(), U256::from(6u64));
        assert_eq!(tip.parent().unwrap().chain_work(), U256::from(4u64));
        assert!(chain.at(0).unwrap().parent().is_none());
        assert!(chain.at(3).is_none());
    }

    #[test]
    fn test_ancestor_is_direct() {
        let mut chain = HeaderChain::new();
        for i in 0..100 {
            chain.push(i * 5, 0x1f07_ffff);
        }
        let tip = chain.tip().unwrap();
        assert_eq!(tip.ancestor(40).map(|h| h.time()), Some(200));
        assert_eq!(tip.ancestor(99).map(|h| h.height()), Some(99));
        let mid = chain.at(50).unwrap();
        assert!(mid.ancestor(51).is_none(), "no descendants through a cursor");
    }

    #[test]
    fn test_push_header_and_truncate() {
        let header = BlockHeader {
            version: 1,
            prev_block_hash: Default::default(),
            merkle_root: Default::default(),
            time: 1_541_009_400,
            bits: 0x1f07_ffff,
            nonce: 0,
        };
        let mut chain = HeaderChain::new();
        chain.push_header(&header);
        chain.push_header(&header);
        chain.push_header(&header);
        chain.truncate(0);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.get(0).unwrap().time, 1_541_009_400);
        assert_eq!(chain.iter().count(), 1);
    }

    #[test]
    fn test_median_time_past_on_cursor() {
        let mut chain = HeaderChain::new();
        for t in [50, 10, 40, 20, 30] {
            chain.push(t, 0x207f_ffff);
        }
        assert_eq!(chain.tip().unwrap().median_time_past(), 30);
    }
}
