//! ReferenceProcessor - enqueues references whose referent is gone

use super::keyed::KeyedWeakReference;

/// Finds cleared references and reports them on their bound queue
///
/// `Arc` has no hook that fires when the last strong owner goes away, so the
/// processor inspects the references it is handed. The watcher runs it at the
/// start of every drain, under the table lock, which means a drain always
/// sees every object released before the drain began.
#[derive(Debug, Default)]
pub struct ReferenceProcessor {
    /// References enqueued so far
    cleared: u64,
}

impl ReferenceProcessor {
    /// Create new reference processor
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue every cleared reference that has not been enqueued yet
    ///
    /// Returns how many references were enqueued by this call.
    pub fn process<'a, I>(&mut self, references: I) -> usize
    where
        I: IntoIterator<Item = &'a KeyedWeakReference>,
    {
        let mut enqueued = 0;

        for reference in references {
            if reference.is_cleared() && reference.enqueue() {
                enqueued += 1;
            }
        }

        self.cleared += enqueued as u64;
        enqueued
    }

    /// Total references enqueued by this processor
    pub fn cleared_count(&self) -> u64 {
        self.cleared
    }
}
