//! Pull-evaluated dataflow nodes
//!
//! Every stage of the synth (oscillators, level, DAC, mixers) is a [`Produce`]
//! implementation wrapped in a [`BufNode`]. A downstream stage asks its
//! upstream for the buffer matching a [`Block`]; the first request for a block
//! runs the producer, later requests for an equal block return the cached
//! buffer. That is what lets the noise generator and the envelope feed all
//! three channels while being computed once per block.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// One evaluation request: a run of naive frames.
///
/// Two blocks compare equal only if they are the same request (same serial),
/// so back-to-back blocks of identical size are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    frame_count: usize,
    serial: u64,
}

impl Block {
    /// Allocate a new block of `frame_count` naive frames.
    pub fn new(frame_count: usize) -> Self {
        Block {
            frame_count,
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Number of naive frames in this block.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Allocation order of this block.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// Fills a buffer for one block.
pub trait Produce: Send {
    /// Sample type of the produced buffer.
    type Sample: Copy + Default + Send;

    /// Write exactly `out.len() == block.frame_count()` samples.
    fn produce(&mut self, block: &Block, out: &mut [Self::Sample]);
}

/// Something that can be asked for its buffer for a block.
pub trait Evaluate: Send {
    /// Sample type of the returned buffer.
    type Sample;

    /// Buffer for `block`, computing it only if `block` differs from the last one.
    fn evaluate(&mut self, block: &Block) -> &[Self::Sample];
}

/// Shared handle to an upstream node.
pub type Upstream<T> = Arc<Mutex<dyn Evaluate<Sample = T>>>;

/// Producer plus its block cache.
pub struct BufNode<P: Produce> {
    producer: P,
    block: Option<Block>,
    buf: Vec<P::Sample>,
    productions: u64,
}

impl<P: Produce> BufNode<P> {
    /// Wrap a producer.
    pub fn new(producer: P) -> Self {
        BufNode {
            producer,
            block: None,
            buf: Vec::new(),
            productions: 0,
        }
    }

    /// The wrapped producer.
    pub fn producer(&self) -> &P {
        &self.producer
    }

    /// How many times the producer actually ran.
    pub fn productions(&self) -> u64 {
        self.productions
    }
}

impl<P: Produce> Evaluate for BufNode<P> {
    type Sample = P::Sample;

    fn evaluate(&mut self, block: &Block) -> &[P::Sample] {
        let n = block.frame_count();
        if self.block.as_ref() != Some(block) {
            if let Some(last) = &self.block {
                assert!(
                    block.serial() > last.serial(),
                    "block {} evaluated after block {}",
                    block.serial(),
                    last.serial()
                );
            }
            if self.buf.len() < n {
                self.buf.resize(n, P::Sample::default());
            }
            self.producer.produce(block, &mut self.buf[..n]);
            self.productions += 1;
            self.block = Some(*block);
        }
        &self.buf[..n]
    }
}

/// Wrap a producer in a shareable node.
pub fn shared<P: Produce + 'static>(producer: P) -> Arc<Mutex<BufNode<P>>> {
    Arc::new(Mutex::new(BufNode::new(producer)))
}

/// Erase a node's concrete type for wiring.
pub fn upstream<P: Produce + 'static>(node: &Arc<Mutex<BufNode<P>>>) -> Upstream<P::Sample> {
    node.clone()
}

/// Evaluate `up` for `block` and copy the result into `out`.
pub fn pull_into<T: Copy>(up: &Upstream<T>, block: &Block, out: &mut [T]) {
    let mut node = up.lock();
    out.copy_from_slice(node.evaluate(block));
}

/// Evaluate `up` for `block` and hand the buffer to `f` while the lock is held.
pub fn pull_with<T, R>(up: &Upstream<T>, block: &Block, f: impl FnOnce(&[T]) -> R) -> R {
    let mut node = up.lock();
    f(node.evaluate(block))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        next: u32,
    }

    impl Produce for Counter {
        type Sample = u32;

        fn produce(&mut self, _block: &Block, out: &mut [u32]) {
            for v in out.iter_mut() {
                *v = self.next;
                self.next += 1;
            }
        }
    }

    struct Doubler {
        up: Upstream<u32>,
    }

    impl Produce for Doubler {
        type Sample = u32;

        fn produce(&mut self, block: &Block, out: &mut [u32]) {
            pull_into(&self.up, block, out);
            out.iter_mut().for_each(|v| *v *= 2);
        }
    }

    #[test]
    fn test_same_block_is_coalesced() {
        let mut node = BufNode::new(Counter { next: 0 });
        let block = Block::new(4);
        let first = node.evaluate(&block).to_vec();
        let second = node.evaluate(&block).to_vec();
        assert_eq!(first, vec![0, 1, 2, 3]);
        assert_eq!(first, second, "cached buffer must be bit-identical");
        assert_eq!(node.productions(), 1);
    }

    #[test]
    fn test_equal_sized_blocks_are_distinct() {
        let mut node = BufNode::new(Counter { next: 0 });
        assert_eq!(node.evaluate(&Block::new(2)), &[0, 1]);
        assert_eq!(node.evaluate(&Block::new(2)), &[2, 3]);
        assert_eq!(node.productions(), 2);
    }

    #[test]
    fn test_buffer_grows_and_slices() {
        let mut node = BufNode::new(Counter { next: 0 });
        assert_eq!(node.evaluate(&Block::new(8)).len(), 8);
        assert_eq!(node.evaluate(&Block::new(3)), &[8, 9, 10]);
        assert_eq!(node.evaluate(&Block::new(0)).len(), 0);
    }

    #[test]
    fn test_diamond_upstream_produced_once() {
        let source = shared(Counter { next: 1 });
        let left = shared(Doubler {
            up: upstream(&source),
        });
        let right = shared(Doubler {
            up: upstream(&source),
        });
        let block = Block::new(3);
        let l = left.lock().evaluate(&block).to_vec();
        let r = right.lock().evaluate(&block).to_vec();
        assert_eq!(l, vec![2, 4, 6]);
        assert_eq!(l, r);
        assert_eq!(source.lock().productions(), 1);
    }

    #[test]
    #[should_panic(expected = "evaluated after block")]
    fn test_stale_block_panics() {
        let mut node = BufNode::new(Counter { next: 0 });
        let old = Block::new(1);
        let new = Block::new(1);
        node.evaluate(&new);
        node.evaluate(&old);
    }
}
