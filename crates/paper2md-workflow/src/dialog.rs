use paper2md_core::WorkflowError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Content hosted by a [`CaptureDialog`].
pub trait DialogContent: Send {
    /// Called once when the dialog opens.
    fn on_open(&mut self);
    /// Called once when the dialog closes, before the dialog releases its slot.
    fn on_close(&mut self);
}

/// Allows at most one dialog to be open at a time.
#[derive(Debug, Clone, Default)]
pub struct DialogSlot {
    occupied: Arc<AtomicBool>,
}

impl DialogSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Result<SlotGuard, WorkflowError> {
        self.occupied
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| WorkflowError::DialogAlreadyOpen)?;
        Ok(SlotGuard {
            occupied: Arc::clone(&self.occupied),
        })
    }
}

struct SlotGuard {
    occupied: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.occupied.store(false, Ordering::SeqCst);
    }
}

/// A modal dialog owning its content for the dialog's lifetime.
///
/// Opening runs [`DialogContent::on_open`]; closing (explicitly or on drop)
/// runs [`DialogContent::on_close`] exactly once and then frees the slot.
pub struct CaptureDialog<C: DialogContent> {
    content: C,
    slot: Option<SlotGuard>,
}

impl<C: DialogContent> CaptureDialog<C> {
    pub fn open(slot: &DialogSlot, mut content: C) -> Result<Self, WorkflowError> {
        let guard = slot.acquire()?;
        tracing::debug!("dialog opened");
        content.on_open();
        Ok(Self {
            content,
            slot: Some(guard),
        })
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_some()
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.content
    }

    pub fn close(&mut self) {
        if let Some(guard) = self.slot.take() {
            self.content.on_close();
            drop(guard);
            tracing::debug!("dialog closed");
        }
    }
}

impl<C: DialogContent> Drop for CaptureDialog<C> {
    fn drop(&mut self) {
        self.close();
    }
}
