/// Identifies one live query opened by the runtime.
///
/// Snapshot events carry the id of the subscription that produced them. A
/// slice only accepts snapshots whose id matches the subscription it is
/// currently waiting on, so events that race a teardown are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Default)]
pub struct SubscriptionSeq {
    next: u64,
}

impl SubscriptionSeq {
    pub fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}
