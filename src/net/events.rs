use std::collections::HashMap;

use crate::net::messages::MessageId;

/// Handler result: keep propagating the event to later hooks and the
/// client, or swallow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookFlow {
    Continue,
    Suppress,
}

/// Where a matched event gets routed. The dispatcher stores routing
/// targets, not closures; the session owns the actual handler code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookTarget {
    UseItemObserved,
    LootConfirmed,
    GachaEnd,
    SystemMessage,
    ContractRequest,
    ContractCancel,
    GachaStartOnce,
    LegacyGachaStart,
    PlayerLocation,
    InventoryChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Revokes every hook registered under it in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupToken(u32);

#[derive(Debug, Clone, Copy)]
struct HookEntry {
    id: HookId,
    group: GroupToken,
    target: HookTarget,
}

#[derive(Debug, Clone, Copy)]
struct HookMeta {
    group: GroupToken,
    once: bool,
}

/// Maps (message id, definition version) to an ordered set of hooks.
/// Removal is lazy: revoked hooks leave the live index immediately and
/// their entries are pruned the next time the key is matched.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    hooks: HashMap<(MessageId, u8), Vec<HookEntry>>,
    live: HashMap<HookId, HookMeta>,
    next_hook: u64,
    next_group: u32,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh revocation token.
    pub fn group(&mut self) -> GroupToken {
        self.next_group += 1;
        GroupToken(self.next_group)
    }

    pub fn subscribe(
        &mut self,
        group: GroupToken,
        id: MessageId,
        version: u8,
        target: HookTarget,
    ) -> HookId {
        self.register(group, id, version, target, false)
    }

    /// The hook fires for exactly one matching event, then dies.
    pub fn subscribe_once(
        &mut self,
        group: GroupToken,
        id: MessageId,
        version: u8,
        target: HookTarget,
    ) -> HookId {
        self.register(group, id, version, target, true)
    }

    fn register(
        &mut self,
        group: GroupToken,
        id: MessageId,
        version: u8,
        target: HookTarget,
        once: bool,
    ) -> HookId {
        self.next_hook += 1;
        let hook = HookId(self.next_hook);
        self.hooks.entry((id, version)).or_default().push(HookEntry {
            id: hook,
            group,
            target,
        });
        self.live.insert(hook, HookMeta { group, once });
        hook
    }

    /// Revoke every hook in the group. Entries already snapshotted for a
    /// dispatch in progress are rejected by the liveness check instead.
    pub fn unsubscribe_group(&mut self, group: GroupToken) {
        self.live.retain(|_, meta| meta.group != group);
        for entries in self.hooks.values_mut() {
            entries.retain(|entry| entry.group != group);
        }
        self.hooks.retain(|_, entries| !entries.is_empty());
    }

    /// Ordered snapshot of the live hooks for one event. Pruning dead
    /// entries happens here so revoked hooks do not accumulate.
    pub fn matches(&mut self, id: MessageId, version: u8) -> Vec<(HookId, HookTarget)> {
        let Some(entries) = self.hooks.get_mut(&(id, version)) else {
            return Vec::new();
        };
        entries.retain(|entry| self.live.contains_key(&entry.id));
        entries
            .iter()
            .map(|entry| (entry.id, entry.target))
            .collect()
    }

    pub fn is_live(&self, hook: HookId) -> bool {
        self.live.contains_key(&hook)
    }

    /// Record a hook invocation; one-shot hooks die here, before their
    /// handler runs, so a faulting handler still consumes the shot.
    pub fn note_fired(&mut self, hook: HookId) {
        let once = self.live.get(&hook).map(|meta| meta.once).unwrap_or(false);
        if once {
            self.live.remove(&hook);
        }
    }

    pub fn live_hooks(&self) -> usize {
        self.live.len()
    }

    /// Live hook count for one (message, version) key.
    pub fn hooks_for(&self, id: MessageId, version: u8) -> usize {
        self.hooks
            .get(&(id, version))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| self.live.contains_key(&entry.id))
                    .count()
            })
            .unwrap_or(0)
    }
}
