use crate::world::inventory::{ItemStack, ItemTypeId};
use crate::world::location::{Heading, LocationSnapshot, Vec3};

// Fixed definition versions for the messages whose shape never changed
// across the generations we support.
pub const USE_ITEM_VERSION: u8 = 3;
pub const PLAYER_LOCATION_VERSION: u8 = 5;
pub const SYSTEM_MESSAGE_VERSION: u8 = 1;
pub const LOOT_MESSAGE_VERSION: u8 = 1;
pub const CANCEL_CONTRACT_VERSION: u8 = 1;
pub const GACHA_CANCEL_VERSION: u8 = 1;
pub const ITEMLIST_VERSION: u8 = 1;

/// Contract subtype tag identifying the loot-box gacha contract.
pub const LOOT_BOX_CONTRACT_KIND: u8 = 53;

/// Server-assigned contract identity. The wire format carries a full
/// 64-bit value; never truncate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractId(pub u64);

impl ContractId {
    pub const NONE: ContractId = ContractId(0);

    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

/// Named protocol messages this crate observes or emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    CUseItem,
    CGachaTry,
    CGachaCancel,
    CPlayerLocation,
    SGachaStart,
    SGachaEnd,
    SSystemMessage,
    SSystemMessageLootItem,
    SRequestContract,
    SCancelContract,
    SItemlist,
}

impl MessageId {
    pub fn name(self) -> &'static str {
        match self {
            MessageId::CUseItem => "C_USE_ITEM",
            MessageId::CGachaTry => "C_GACHA_TRY",
            MessageId::CGachaCancel => "C_GACHA_CANCEL",
            MessageId::CPlayerLocation => "C_PLAYER_LOCATION",
            MessageId::SGachaStart => "S_GACHA_START",
            MessageId::SGachaEnd => "S_GACHA_END",
            MessageId::SSystemMessage => "S_SYSTEM_MESSAGE",
            MessageId::SSystemMessageLootItem => "S_SYSTEM_MESSAGE_LOOT_ITEM",
            MessageId::SRequestContract => "S_REQUEST_CONTRACT",
            MessageId::SCancelContract => "S_CANCEL_CONTRACT",
            MessageId::SItemlist => "S_ITEMLIST",
        }
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Item-use request as observed on the client->server stream and as
/// replayed by the opener. The correlation token ties a use to its
/// server acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct UseItemRequest {
    pub item: ItemTypeId,
    pub db_id: u64,
    pub amount: u32,
    pub position: Vec3,
    pub heading: Heading,
    pub token: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GachaTryRequest {
    pub contract: ContractId,
    /// Present only in the reshaped (v2) try message.
    pub amount: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GachaCancelRequest {
    pub contract: ContractId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GachaStart {
    pub contract: ContractId,
}

/// Contract negotiation events carry the subtype tag and the contract id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractNotice {
    pub kind: u8,
    pub contract: ContractId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemMessageEvent {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListSnapshot {
    pub items: Vec<ItemStack>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    UseItem(UseItemRequest),
    GachaTry(GachaTryRequest),
    GachaCancel(GachaCancelRequest),
    GachaStart(GachaStart),
    GachaEnd,
    SystemMessage(SystemMessageEvent),
    LootItem,
    ContractRequest(ContractNotice),
    ContractCancel(ContractNotice),
    ItemList(ItemListSnapshot),
    PlayerLocation(LocationSnapshot),
}

/// One decoded message observed on either direction of the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: MessageId,
    pub version: u8,
    pub payload: Payload,
}

impl Event {
    pub fn new(id: MessageId, version: u8, payload: Payload) -> Self {
        Self {
            id,
            version,
            payload,
        }
    }
}

/// A message the opener wants sent to the server. Drained by the
/// embedding proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub id: MessageId,
    pub version: u8,
    pub payload: Payload,
}
