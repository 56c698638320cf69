//! Feeds the store's history into a diffed list projection.

use sq_core::{ListChange, ListProjection, SessionRecord};
use sq_db::RecordStore;
use tokio::sync::watch;

/// A list view that accepts edit scripts.
pub trait ListRenderer {
    fn apply(&mut self, changes: &[ListChange]);
}

/// Turns each emission of the "all sessions" feed into an edit script.
pub struct ListFeed {
    feed: watch::Receiver<Vec<SessionRecord>>,
    projection: ListProjection,
    primed: bool,
}

impl ListFeed {
    #[must_use]
    pub const fn new(feed: watch::Receiver<Vec<SessionRecord>>) -> Self {
        Self {
            feed,
            projection: ListProjection::new(),
            primed: false,
        }
    }

    pub fn from_store<S: RecordStore>(store: &S) -> Self {
        Self::new(store.subscribe_all())
    }

    /// Rows as of the last returned script.
    pub fn rendered(&self) -> &[SessionRecord] {
        self.projection.rendered()
    }

    /// Waits for the next non-empty edit script.
    ///
    /// The first call diffs the feed's current contents against an empty
    /// list without waiting. Returns `None` once the store is gone.
    ///
    /// Cancel safe: dropping the future loses no emission.
    pub async fn next_changes(&mut self) -> Option<Vec<ListChange>> {
        loop {
            if self.primed {
                self.feed.changed().await.ok()?;
            }
            self.primed = true;

            let next = self.feed.borrow_and_update().clone();
            let changes = self.projection.submit(next);
            if !changes.is_empty() {
                return Some(changes);
            }
        }
    }

    /// Forwards every script to `renderer` until the store is gone.
    pub async fn drive<R: ListRenderer>(mut self, renderer: &mut R) {
        while let Some(changes) = self.next_changes().await {
            renderer.apply(&changes);
        }
    }
}
