//! Per-price bucket: live order membership plus aggregate quantity.
//!
//! Membership is an intrusive singly linked list of order ids.
//!
//! - Insert is a lock-free CAS push on the head, with backoff under
//!   contention.
//! - Remove tombstones the node, then unlinks it while holding a per-bucket
//!   mutex. Only one unlinker runs at a time, and pushers only ever touch
//!   the head, so interior `next` pointers have a single writer.
//! - Unlinked nodes are handed to the epoch collector and freed once no
//!   pinned traversal can still be looking at them.
//!
//! The aggregate is a separate atomic adjusted with one `fetch_add` per
//! membership change or quantity delta.

use core::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use crossbeam::utils::Backoff;
use parking_lot::Mutex;

use crate::fixed::Quantity;
use crate::order::OrderId;

struct Node {
    id: OrderId,
    removed: AtomicBool,
    next: Atomic<Node>,
}

/// All live orders at one exact price on one side.
///
/// Cache-line aligned so neighbouring levels do not false-share their
/// aggregates.
#[repr(align(64))]
pub struct PriceLevelBucket {
    head: Atomic<Node>,
    total_qty: AtomicI64,
    order_count: AtomicUsize,
    unlink: Mutex<()>,
}

impl PriceLevelBucket {
    /// Create a new empty bucket.
    pub fn new() -> Self {
        Self {
            head: Atomic::null(),
            total_qty: AtomicI64::new(0),
            order_count: AtomicUsize::new(0),
            unlink: Mutex::new(()),
        }
    }

    /// Aggregate live quantity.
    #[inline(always)]
    pub fn total_qty(&self) -> Quantity {
        Quantity(self.total_qty.load(Ordering::SeqCst))
    }

    /// Number of live orders.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.order_count.load(Ordering::Acquire)
    }

    /// No quantity resting here.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.total_qty.load(Ordering::SeqCst) <= 0
    }

    /// Push `id` onto the bucket and add `qty` to the aggregate.
    pub fn insert(&self, id: OrderId, qty: Quantity) {
        let guard = &epoch::pin();
        let backoff = Backoff::new();

        let mut node = Owned::new(Node {
            id,
            removed: AtomicBool::new(false),
            next: Atomic::null(),
        });
        let mut head = self.head.load(Ordering::Acquire, guard);

        loop {
            node.next.store(head, Ordering::Relaxed);
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire, guard)
            {
                Ok(_) => break,
                Err(e) => {
                    head = e.current;
                    node = e.new;
                    backoff.spin();
                }
            }
        }

        self.order_count.fetch_add(1, Ordering::AcqRel);
        self.total_qty.fetch_add(qty.0, Ordering::SeqCst);
    }

    /// Remove `id`, subtracting its final `qty` from the aggregate.
    ///
    /// Returns `false` if `id` is not a live member.
    pub fn remove(&self, id: OrderId, qty: Quantity) -> bool {
        let _unlink = self.unlink.lock();
        let guard = &epoch::pin();

        let mut curr = self.head.load(Ordering::Acquire, guard);
        // SAFETY: every node reachable from `head` is either live or has been
        // deferred to the collector while we are pinned, so it is not freed.
        while let Some(node) = unsafe { curr.as_ref() } {
            let next = node.next.load(Ordering::Acquire, guard);
            if node.id == id && !node.removed.load(Ordering::Acquire) {
                node.removed.store(true, Ordering::Release);
                self.unlink_node(curr, next, guard);

                self.order_count.fetch_sub(1, Ordering::AcqRel);
                let prev = self.total_qty.fetch_sub(qty.0, Ordering::SeqCst);
                debug_assert!(prev >= qty.0, "bucket aggregate went negative");

                // SAFETY: the node is no longer reachable from `head`, and it
                // was unlinked exactly once under the unlink mutex.
                unsafe { guard.defer_destroy(curr) };
                return true;
            }
            curr = next;
        }
        false
    }

    /// Apply a quantity change of a member order to the aggregate.
    #[inline(always)]
    pub fn apply_delta(&self, delta: Quantity) {
        let prev = self.total_qty.fetch_add(delta.0, Ordering::SeqCst);
        debug_assert!(prev + delta.0 >= 0, "bucket aggregate went negative");
    }

    /// Snapshot of live member ids, most recently inserted first.
    pub fn order_ids(&self) -> Vec<OrderId> {
        let guard = &epoch::pin();
        let mut ids = Vec::with_capacity(self.len());

        let mut curr = self.head.load(Ordering::Acquire, guard);
        // SAFETY: see `remove`; pinned traversal never observes freed nodes.
        while let Some(node) = unsafe { curr.as_ref() } {
            if !node.removed.load(Ordering::Acquire) {
                ids.push(node.id);
            }
            curr = node.next.load(Ordering::Acquire, guard);
        }
        ids
    }

    /// Unlink `target` (whose successor is `next`). Caller holds `self.unlink`.
    fn unlink_node<'g>(&self, target: Shared<'g, Node>, next: Shared<'g, Node>, guard: &'g Guard) {
        let backoff = Backoff::new();
        loop {
            // Re-walk from the head: pushes may have moved `target` off it.
            let mut prev = &self.head;
            let mut curr = prev.load(Ordering::Acquire, guard);
            while curr != target {
                // SAFETY: `target` is still linked, so the walk reaches it
                // before the end of the list and every node on the way is live.
                match unsafe { curr.as_ref() } {
                    Some(node) => {
                        prev = &node.next;
                        curr = prev.load(Ordering::Acquire, guard);
                    }
                    None => {
                        debug_assert!(false, "unlink target not reachable");
                        return;
                    }
                }
            }

            // Interior links have no other writer; only the head can be
            // contended by a concurrent push.
            if prev
                .compare_exchange(target, next, Ordering::AcqRel, Ordering::Acquire, guard)
                .is_ok()
            {
                return;
            }
            backoff.spin();
        }
    }
}

impl Default for PriceLevelBucket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PriceLevelBucket {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread holds a reference to the
        // list. Unlinked nodes were already handed to the collector and are
        // not reachable from here.
        unsafe {
            let guard = epoch::unprotected();
            let mut curr = self.head.load(Ordering::Relaxed, guard);
            while let Some(node) = curr.as_ref() {
                let next = node.next.load(Ordering::Relaxed, guard);
                drop(curr.into_owned());
                curr = next;
            }
        }
    }
}
