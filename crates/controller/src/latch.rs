use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Press latch shared between an input thread and the poll loop.
///
/// Any number of `press()` calls between two polls collapse into one press;
/// `take()` clears the latch in the same atomic step that reads it, so an edge
/// is never seen twice.
#[derive(Clone, Debug, Default)]
pub struct ButtonLatch {
    pressed: Arc<AtomicBool>,
}

impl ButtonLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.pressed.store(true, Ordering::Release);
    }

    pub fn take(&self) -> bool {
        self.pressed.swap(false, Ordering::AcqRel)
    }
}
