use crate::subscription::{Callback, SubscriptionId};

/// Handle of a node in the [`PendingQueue`] arena. Stable for the whole
/// dispatch, unlinked nodes keep their slot.
pub(crate) type Handle = usize;

struct Node {
    callback: Callback,
    prev: Option<Handle>,
    next: Option<Handle>,
    linked: bool,
}

/// Handlers of the running dispatch that have not completed yet, in
/// effective execution order.
///
/// The list is doubly linked through arena indices. `current` points at the
/// innermost running handler; every linked node from the head up to and
/// including `current` forms the active chain, the nodes after it are still
/// waiting for their turn.
#[derive(Default)]
pub(crate) struct PendingQueue {
    nodes: Vec<Node>,
    head: Option<Handle>,
    current: Option<Handle>,
}

impl PendingQueue {
    /// Replaces the content with `callbacks` and points `current` at the head.
    pub(crate) fn load(&mut self, callbacks: impl IntoIterator<Item = Callback>) {
        self.clear();
        for callback in callbacks {
            let handle = self.nodes.len();
            let prev = handle.checked_sub(1);
            if let Some(prev) = prev {
                self.nodes[prev].next = Some(handle);
            }
            self.nodes.push(Node {
                callback,
                prev,
                next: None,
                linked: true,
            });
        }
        self.head = if self.nodes.is_empty() { None } else { Some(0) };
        self.current = self.head;
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.current = None;
    }

    pub(crate) fn current(&self) -> Option<Handle> {
        self.current
    }

    pub(crate) fn set_current(&mut self, handle: Option<Handle>) {
        self.current = handle;
    }

    pub(crate) fn callback(&self, handle: Handle) -> Callback {
        self.nodes[handle].callback.clone()
    }

    pub(crate) fn next_of(&self, handle: Handle) -> Option<Handle> {
        self.nodes[handle].next
    }

    pub(crate) fn len(&self) -> usize {
        self.iter().count()
    }

    fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        std::iter::successors(self.head, |&handle| self.nodes[handle].next)
    }

    /// Finds the pending node registered under `id`.
    pub(crate) fn find(&self, id: &SubscriptionId) -> Option<Handle> {
        self.iter().find(|&handle| id.is(&self.nodes[handle].callback))
    }

    /// Whether `target` sits between the head and `current`, inclusive.
    pub(crate) fn in_active_chain(&self, target: Handle) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        for handle in self.iter() {
            if handle == target {
                return true;
            }
            if handle == current {
                break;
            }
        }
        false
    }

    pub(crate) fn unlink(&mut self, handle: Handle) {
        if !self.nodes[handle].linked {
            return;
        }
        let Node { prev, next, .. } = self.nodes[handle];
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }
        let node = &mut self.nodes[handle];
        node.prev = None;
        node.next = None;
        node.linked = false;
    }

    /// Links an unlinked `handle` right after `anchor`.
    pub(crate) fn link_after(&mut self, handle: Handle, anchor: Handle) {
        debug_assert!(!self.nodes[handle].linked);
        let next = self.nodes[anchor].next;
        self.nodes[anchor].next = Some(handle);
        if let Some(next) = next {
            self.nodes[next].prev = Some(handle);
        }
        let node = &mut self.nodes[handle];
        node.prev = Some(anchor);
        node.next = next;
        node.linked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::{callback, Subscriber};

    fn callbacks(count: usize) -> Vec<Callback> {
        (0..count).map(|_| callback(|_action| Ok(()))).collect()
    }

    fn order(queue: &PendingQueue) -> Vec<Handle> {
        queue.iter().collect()
    }

    #[test]
    fn test_load_points_current_at_head() {
        let mut queue = PendingQueue::default();
        queue.load(callbacks(3));
        assert_eq!(order(&queue), vec![0, 1, 2]);
        assert_eq!(queue.current(), Some(0));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_load_empty() {
        let mut queue = PendingQueue::default();
        queue.load(Vec::new());
        assert_eq!(queue.current(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_promote_after_current() {
        let mut queue = PendingQueue::default();
        queue.load(callbacks(4));

        queue.unlink(3);
        queue.link_after(3, 0);
        queue.set_current(Some(3));

        assert_eq!(order(&queue), vec![0, 3, 1, 2]);
        assert!(queue.in_active_chain(0));
        assert!(queue.in_active_chain(3));
        assert!(!queue.in_active_chain(1));
    }

    #[test]
    fn test_unlink_head_and_tail() {
        let mut queue = PendingQueue::default();
        queue.load(callbacks(3));

        queue.unlink(0);
        queue.unlink(2);
        assert_eq!(order(&queue), vec![1]);

        // unlinking twice leaves the list untouched
        queue.unlink(2);
        assert_eq!(order(&queue), vec![1]);
    }

    #[test]
    fn test_find_by_identity() {
        let handlers = callbacks(3);
        let mut queue = PendingQueue::default();
        queue.load(handlers.clone());

        assert_eq!(queue.find(&handlers[2].subscription_id()), Some(2));
        queue.unlink(2);
        assert_eq!(queue.find(&handlers[2].subscription_id()), None);

        let stranger = callback(|_action| Ok(()));
        assert_eq!(queue.find(&stranger.subscription_id()), None);
    }
}
