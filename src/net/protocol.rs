/// Client/server protocol generation. Read-only fact supplied by the
/// embedding proxy; selects message shapes and flow topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolVersion(pub u32);

impl ProtocolVersion {
    /// Generation that replaced the single-shot gacha flow with the
    /// contract request/confirm handshake.
    pub const CONTRACT_GACHA: u32 = 93;
    /// Generation that reshaped the gacha start/try/end messages (the
    /// try request gained a required amount field).
    pub const GACHA_AMOUNT: u32 = 99;
    /// Last generation using the first contract-request shape.
    pub const CONTRACT_RESHAPE: u32 = 107;

    pub fn has_contract_gacha(self) -> bool {
        self.0 >= Self::CONTRACT_GACHA
    }

    pub fn gacha_start_version(self) -> u8 {
        if self.0 >= Self::GACHA_AMOUNT {
            2
        } else {
            1
        }
    }

    pub fn gacha_end_version(self) -> u8 {
        if self.0 >= Self::GACHA_AMOUNT {
            3
        } else {
            1
        }
    }

    pub fn gacha_try_version(self) -> u8 {
        if self.0 >= Self::GACHA_AMOUNT {
            2
        } else {
            1
        }
    }

    /// The later try shape carries an explicit amount; the older one omits it.
    pub fn gacha_try_has_amount(self) -> bool {
        self.0 >= Self::GACHA_AMOUNT
    }

    pub fn contract_request_version(self) -> u8 {
        if self.0 > Self::CONTRACT_RESHAPE {
            2
        } else {
            1
        }
    }
}
