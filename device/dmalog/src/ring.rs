use crate::engine::TransferWindow;
use crate::error::Error;

/// Free bytes in a ring of `capacity` bytes with cursors `head` and `tail`.
///
/// One slot is always sacrificed so that `head == tail` can only mean "empty": an empty ring has
/// `capacity - 1` bytes available and a full ring has zero.
pub const fn space_available(head: usize, tail: usize, capacity: usize) -> usize {
    capacity - 1 - (tail + capacity - head) % capacity
}

/// Bytes queued between `head` and `tail`, following the wrap if there is one.
pub const fn pending_bytes(head: usize, tail: usize, capacity: usize) -> usize {
    if head <= tail {
        tail - head
    } else {
        capacity - (head - tail)
    }
}

/// Circular byte queue of rendered log text waiting for the transmitter.
///
/// Pending bytes are the circular range `[head, tail)`. Producers only move `tail`; `head` only
/// moves once the engine reports that the bytes in front of it are on the wire.
#[derive(Debug)]
pub struct LogRing<const C: usize> {
    underlying_storage: [u8; C],
    /// Oldest byte not yet transmitted.
    head: usize,
    /// One past the newest enqueued byte.
    tail: usize,
}

impl<const C: usize> Default for LogRing<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const C: usize> LogRing<C> {
    pub const fn new() -> Self {
        const { assert!(C >= 2, "log ring needs room for at least one byte") };
        Self {
            underlying_storage: [0; C],
            head: 0,
            tail: 0,
        }
    }

    // Simple mutating utility methods -------------------------------------------------------------

    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    // Simple read-only utility methods ------------------------------------------------------------

    pub const fn capacity(&self) -> usize {
        C
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn space_available(&self) -> usize {
        space_available(self.head, self.tail, C)
    }

    pub fn pending(&self) -> usize {
        pending_bytes(self.head, self.tail, C)
    }

    /// Longest prefix of the pending bytes that is contiguous in storage. A wrapped queue drains in
    /// two of these.
    pub fn runnable(&self) -> usize {
        self.pending().min(C - self.head)
    }

    // Producer side -------------------------------------------------------------------------------

    /// Copy `bytes` in at `tail`, splitting the copy at the end of storage if it has to wrap.
    /// Either the whole slice goes in or nothing does.
    pub fn enqueue(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let length = bytes.len();
        let available = self.space_available();
        if length > available {
            return Err(Error::InsufficientSpace {
                needed: length,
                available,
            });
        }

        if self.tail + length >= C {
            let (to_end, to_front) = bytes.split_at(C - self.tail);
            self.underlying_storage[self.tail..].copy_from_slice(to_end);
            self.underlying_storage[..to_front.len()].copy_from_slice(to_front);
            self.tail = to_front.len();
        } else {
            self.underlying_storage[self.tail..self.tail + length].copy_from_slice(bytes);
            self.tail += length;
        }

        Ok(length)
    }

    // Consumer side -------------------------------------------------------------------------------

    /// Describe `len` bytes of storage starting at `head`.
    pub(crate) fn window_at_head(&self, len: usize) -> TransferWindow {
        debug_assert!(self.head + len <= C);
        TransferWindow::new(self.underlying_storage.as_ptr(), self.head, len)
    }

    /// Release `n` transmitted bytes from the front of the queue.
    pub(crate) fn consume(&mut self, n: usize) {
        self.head = (self.head + n) % C;
    }

    #[cfg(test)]
    pub(crate) fn with_cursors(head: usize, tail: usize) -> Self {
        assert!(head < C && tail < C);
        let mut ring = Self::new();
        ring.head = head;
        ring.tail = tail;
        ring
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &[u8] {
        &self.underlying_storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_accounting() {
        assert_eq!(space_available(0, 0, 16), 15);
        assert_eq!(space_available(7, 7, 16), 15);
        assert_eq!(space_available(0, 15, 16), 0);
        assert_eq!(space_available(5, 4, 16), 0);
        assert_eq!(space_available(10, 2, 16), 7);
        assert_eq!(space_available(2, 10, 16), 7);

        for head in 0..16 {
            for tail in 0..16 {
                let free = space_available(head, tail, 16);
                assert!(free <= 15, "head={head} tail={tail} free={free}");
                assert_eq!(free + pending_bytes(head, tail, 16), 15);
                assert_eq!(free == 15, head == tail);
            }
        }
    }

    #[test]
    fn fill_to_capacity_then_reject() {
        let mut ring = LogRing::<16>::new();
        let mut msg = [b'A'; 15];
        msg[14] = b'\n';

        assert_eq!(ring.enqueue(&msg), Ok(15));
        assert_eq!(ring.tail(), 15);
        assert_eq!(ring.space_available(), 0);

        assert_eq!(
            ring.enqueue(b"x"),
            Err(Error::InsufficientSpace {
                needed: 1,
                available: 0
            })
        );
        assert_eq!((ring.head(), ring.tail()), (0, 15));
    }

    #[test]
    fn oversized_enqueue_leaves_cursors_alone() {
        let mut ring = LogRing::<16>::with_cursors(4, 12);
        let before = (ring.head(), ring.tail());
        assert!(ring.enqueue(&[0; 8]).is_err());
        assert_eq!((ring.head(), ring.tail()), before);
        assert_eq!(ring.enqueue(&[0; 7]), Ok(7));
    }

    #[test]
    fn wrapping_copy_splits_at_end_of_storage() {
        let mut ring = LogRing::<16>::with_cursors(12, 12);
        assert_eq!(ring.enqueue(b"abcdefg"), Ok(7));
        assert_eq!(ring.tail(), 3);
        assert_eq!(&ring.storage()[12..], b"abcd");
        assert_eq!(&ring.storage()[..3], b"efg");
        assert_eq!(ring.pending(), 7);
        assert_eq!(ring.runnable(), 4);
    }

    #[test]
    fn copy_ending_exactly_at_storage_end_wraps_tail_to_zero() {
        let mut ring = LogRing::<16>::with_cursors(4, 12);
        assert_eq!(ring.enqueue(b"wxyz"), Ok(4));
        assert_eq!(ring.tail(), 0);
        assert_eq!(ring.pending(), 12);
        assert_eq!(ring.runnable(), 12);
    }

    #[test]
    fn runnable_stops_at_end_of_storage() {
        let ring = LogRing::<16>::with_cursors(10, 2);
        assert_eq!(ring.pending(), 8);
        assert_eq!(ring.runnable(), 6);

        let ring = LogRing::<16>::with_cursors(3, 9);
        assert_eq!(ring.runnable(), 6);

        let ring = LogRing::<16>::with_cursors(9, 9);
        assert_eq!(ring.runnable(), 0);
    }
}
