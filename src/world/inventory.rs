/// Item type identity as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemTypeId(pub u32);

/// One stack of items as listed by an inventory snapshot packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub item: ItemTypeId,
    pub db_id: u64,
    pub amount: u32,
}

impl ItemStack {
    pub fn new(item: ItemTypeId, db_id: u64, amount: u32) -> Self {
        Self {
            item,
            db_id,
            amount,
        }
    }
}

/// Client-side mirror of the server inventory, rebuilt from each
/// full item listing the server pushes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryTable {
    stacks: Vec<ItemStack>,
}

impl InventoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mirror with the contents of a fresh item listing.
    pub fn replace(&mut self, stacks: Vec<ItemStack>) {
        self.stacks = stacks;
    }

    pub fn total_amount(&self, item: ItemTypeId) -> u32 {
        self.stacks
            .iter()
            .filter(|stack| stack.item == item)
            .fold(0u32, |acc, stack| acc.saturating_add(stack.amount))
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }
}
