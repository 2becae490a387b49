//! Single-slot frame handoff
//!
//! Bridges the sensor-callback context (one writer) and the main loop (one
//! reader). Last write wins; a frame overwritten before it was read is dropped.
//! Each write replaces the whole published entry atomically, so a reader
//! never sees a partially built frame.
//!
//! Every entry carries its own read state. The writer and the reader settle
//! who got to an entry first with a single compare-exchange on it, so a frame
//! is counted as either read or overwritten, never both.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use contracts::ProcessedFrame;

const UNREAD: u8 = 0;
const READ: u8 = 1;
const OVERWRITTEN: u8 = 2;

struct Published {
    frame: Arc<ProcessedFrame>,
    state: AtomicU8,
}

#[derive(Default)]
struct Slot {
    current: ArcSwapOption<Published>,
    writes: AtomicU64,
    overwritten: AtomicU64,
}

/// Last-write-wins slot holding at most one frame
pub struct FrameHandoffSlot;

impl FrameHandoffSlot {
    /// Create an empty slot and its two endpoints
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (FrameWriter, FrameReader) {
        let slot = Arc::new(Slot::default());
        (
            FrameWriter { slot: slot.clone() },
            FrameReader { slot },
        )
    }
}

/// Producer endpoint, owned by the sensor callback
pub struct FrameWriter {
    slot: Arc<Slot>,
}

impl FrameWriter {
    /// Replace the slot contents. Never blocks, never queues.
    ///
    /// Returns `true` if an unread frame was dropped by this write.
    pub fn write(&self, frame: ProcessedFrame) -> bool {
        let entry = Arc::new(Published {
            frame: Arc::new(frame),
            state: AtomicU8::new(UNREAD),
        });
        let previous = self.slot.current.swap(Some(entry));
        self.slot.writes.fetch_add(1, Ordering::Relaxed);

        let dropped = previous.is_some_and(|prev| {
            prev.state
                .compare_exchange(UNREAD, OVERWRITTEN, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        });
        if dropped {
            self.slot.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        dropped
    }
}

/// Consumer endpoint, owned by the main loop
pub struct FrameReader {
    slot: Arc<Slot>,
}

impl FrameReader {
    /// Latest frame, or `None` before the first write
    ///
    /// The same frame is returned again until a newer one is written.
    pub fn read(&self) -> Option<Arc<ProcessedFrame>> {
        loop {
            let entry = self.slot.current.load_full()?;
            match entry.state.compare_exchange(
                UNREAD,
                READ,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) | Err(READ) => return Some(entry.frame.clone()),
                // Replaced and already counted as dropped; a newer entry is in the slot
                Err(_) => continue,
            }
        }
    }

    /// Total writes so far
    pub fn writes(&self) -> u64 {
        self.slot.writes.load(Ordering::Relaxed)
    }

    /// Frames replaced before the reader saw them
    pub fn overwritten(&self) -> u64 {
        self.slot.overwritten.load(Ordering::Relaxed)
    }
}
