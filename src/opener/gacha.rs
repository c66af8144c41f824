use crate::net::events::{HookFlow, HookTarget};
use crate::net::messages::{
    ContractId, Event, GachaTryRequest, MessageId, Payload, LOOT_BOX_CONTRACT_KIND,
};
use crate::opener::BoxOpener;
use crate::session::{SessionContext, Task};

/// Contract-based loot state. `detected` implies an assigned id while
/// the contract is active; `pending` bridges the request/confirm
/// handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GachaContract {
    pub(crate) detected: bool,
    pub(crate) contract: ContractId,
    pub(crate) pending: Option<ContractId>,
}

impl GachaContract {
    pub fn new() -> Self {
        Self {
            detected: false,
            contract: ContractId::NONE,
            pending: None,
        }
    }

    pub fn active(&self) -> bool {
        self.detected && self.contract.is_assigned()
    }

    pub fn clear(&mut self) {
        self.detected = false;
        self.contract = ContractId::NONE;
        self.pending = None;
    }
}

impl Default for GachaContract {
    fn default() -> Self {
        Self::new()
    }
}

/// Step 1 of the handshake: the server proposes a contract. Loot-box
/// contracts are claimed by the opener and hidden from the client.
pub(crate) fn on_contract_request(
    opener: &mut BoxOpener,
    event: &Event,
    ctx: &mut SessionContext,
) -> Result<HookFlow, String> {
    let Payload::ContractRequest(notice) = &event.payload else {
        return Err("S_REQUEST_CONTRACT carried an unexpected payload".to_string());
    };
    if notice.kind != LOOT_BOX_CONTRACT_KIND {
        return Ok(HookFlow::Continue);
    }
    if opener.gacha.detected || opener.gacha.pending.is_some() {
        // Already driving (or about to drive) a contract; one start
        // watcher is enough.
        return Ok(HookFlow::Suppress);
    }
    let group = opener
        .group
        .ok_or_else(|| "contract request observed without an active hook group".to_string())?;

    opener.gacha.pending = Some(notice.contract);
    ctx.hooks.subscribe_once(
        group,
        MessageId::SGachaStart,
        ctx.protocol.gacha_start_version(),
        HookTarget::GachaStartOnce,
    );
    Ok(HookFlow::Suppress)
}

/// Step 2: the one-shot start confirmation activates the contract and
/// fires the first try synchronously.
pub(crate) fn on_gacha_start(
    opener: &mut BoxOpener,
    ctx: &mut SessionContext,
) -> Result<HookFlow, String> {
    let Some(contract) = opener.gacha.pending.take() else {
        return Err("gacha start confirmation without a pending contract".to_string());
    };
    opener.gacha.detected = true;
    opener.gacha.contract = contract;
    opener.drive_iteration(ctx)?;
    Ok(HookFlow::Suppress)
}

/// Pre-handshake protocol generations: the start message itself carries
/// the contract id and a single try goes out immediately.
pub(crate) fn on_legacy_gacha_start(
    opener: &mut BoxOpener,
    event: &Event,
    ctx: &mut SessionContext,
) -> Result<HookFlow, String> {
    let Payload::GachaStart(start) = &event.payload else {
        return Err("S_GACHA_START carried an unexpected payload".to_string());
    };
    opener.gacha.detected = true;
    opener.gacha.contract = start.contract;
    send_try(opener, ctx);
    Ok(HookFlow::Continue)
}

/// One loot resolution finished; line up the next try. With pacing off
/// the continuation is deferred to the next scheduler pass so the send
/// never happens inside the event turn that delivered the end message.
pub(crate) fn on_gacha_end(
    opener: &mut BoxOpener,
    ctx: &mut SessionContext,
) -> Result<HookFlow, String> {
    if !opener.enabled || opener.armed.is_none() || !opener.gacha.detected {
        return Ok(HookFlow::Continue);
    }
    if let Some(timer) = opener.timer.take() {
        ctx.timers.cancel(timer);
    }
    if opener.use_delay {
        opener.timer = Some(ctx.timers.schedule(ctx.now, opener.delay_ms, Task::DriveIteration));
    } else {
        ctx.deferred.push_back(Task::DriveIteration);
    }
    Ok(HookFlow::Continue)
}

/// Server cancelled the contract out from under us.
pub(crate) fn on_contract_cancel(
    opener: &mut BoxOpener,
    event: &Event,
    ctx: &mut SessionContext,
) -> Result<HookFlow, String> {
    let Payload::ContractCancel(notice) = &event.payload else {
        return Err("S_CANCEL_CONTRACT carried an unexpected payload".to_string());
    };
    if !opener.gacha.detected || notice.kind != LOOT_BOX_CONTRACT_KIND {
        return Ok(HookFlow::Continue);
    }
    opener.stop(Some("Gacha cancelled."), ctx)?;
    Ok(HookFlow::Continue)
}

/// Issue one gacha try in the shape the protocol generation expects.
pub(crate) fn send_try(opener: &mut BoxOpener, ctx: &mut SessionContext) {
    let request = GachaTryRequest {
        contract: opener.gacha.contract,
        amount: ctx.protocol.gacha_try_has_amount().then_some(1),
    };
    ctx.send(
        MessageId::CGachaTry,
        ctx.protocol.gacha_try_version(),
        Payload::GachaTry(request),
    );
    opener.stats.record_open();
}
