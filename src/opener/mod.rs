pub mod gacha;
pub mod stats;

use crate::config::{OpenerConfig, DEFAULT_DELAY_MS};
use crate::net::events::{GroupToken, HookFlow, HookTarget};
use crate::net::messages::{
    Event, GachaCancelRequest, MessageId, Payload, UseItemRequest, CANCEL_CONTRACT_VERSION,
    GACHA_CANCEL_VERSION, LOOT_MESSAGE_VERSION, SYSTEM_MESSAGE_VERSION, USE_ITEM_VERSION,
};
use crate::net::system_messages::is_terminal;
use crate::session::{SessionContext, Task};
use crate::world::timer::TimerId;
use self::gacha::GachaContract;
use self::stats::OpenStats;

/// The box lifecycle state machine: Idle -> Scanning -> Armed -> Idle.
/// Armed runs in one of two sub-modes, direct reuse or gacha-driven,
/// decided at most once per arming.
#[derive(Debug)]
pub struct BoxOpener {
    enabled: bool,
    scanning: bool,
    is_looting: bool,
    use_delay: bool,
    delay_ms: u64,
    armed: Option<UseItemRequest>,
    gacha: GachaContract,
    stats: OpenStats,
    group: Option<GroupToken>,
    timer: Option<TimerId>,
}

impl BoxOpener {
    pub fn new(config: &OpenerConfig) -> Self {
        let delay_ms = if config.delay_ms > 0 {
            config.delay_ms
        } else {
            DEFAULT_DELAY_MS
        };
        Self {
            enabled: false,
            scanning: false,
            is_looting: false,
            use_delay: config.pacing && config.delay_ms > 0,
            delay_ms,
            armed: None,
            gacha: GachaContract::new(),
            stats: OpenStats::new(),
            group: None,
            timer: None,
        }
    }

    /// Start scanning for a demonstration use, or stop a run in progress.
    pub fn toggle(&mut self, ctx: &mut SessionContext) -> Result<(), String> {
        if !self.enabled && !self.scanning {
            self.scanning = true;
            self.register_hooks(ctx);
            ctx.notify("Please normally open a box now and the script will continue opening it.");
            Ok(())
        } else {
            self.stop(Some("Box opener stopped."), ctx)
        }
    }

    /// `boxdelay` command: a value sets the pacing (0 turns it off and
    /// restores the default for later display), no value reports.
    pub fn set_delay(&mut self, value: Option<u64>, ctx: &mut SessionContext) {
        match value {
            Some(ms) => {
                self.use_delay = ms > 0;
                self.delay_ms = if self.use_delay { ms } else { DEFAULT_DELAY_MS };
                let text = self.delay_text();
                ctx.notify(format!("Minimum box opening delay is set to: {}.", text));
            }
            None => {
                let text = self.delay_text();
                ctx.notify(format!("Current delay is: {}.", text));
            }
        }
    }

    /// Route one dispatched event into the state machine.
    pub fn handle(
        &mut self,
        target: HookTarget,
        event: &Event,
        ctx: &mut SessionContext,
    ) -> Result<HookFlow, String> {
        match target {
            HookTarget::UseItemObserved => self.on_use_item(event, ctx),
            HookTarget::LootConfirmed => self.on_loot_confirmed(ctx),
            HookTarget::SystemMessage => self.on_system_message(event, ctx),
            HookTarget::InventoryChanged => self.on_inventory_changed(),
            HookTarget::GachaEnd => gacha::on_gacha_end(self, ctx),
            HookTarget::ContractRequest => gacha::on_contract_request(self, event, ctx),
            HookTarget::ContractCancel => gacha::on_contract_cancel(self, event, ctx),
            HookTarget::GachaStartOnce => gacha::on_gacha_start(self, ctx),
            HookTarget::LegacyGachaStart => gacha::on_legacy_gacha_start(self, event, ctx),
            // Location updates belong to the session, never to the opener.
            HookTarget::PlayerLocation => Ok(HookFlow::Continue),
        }
    }

    /// One pass of the automation loop. Safe to call from any timer or
    /// deferred task: a stopped opener ignores it.
    pub fn drive_iteration(&mut self, ctx: &mut SessionContext) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        let Some(item) = self.armed.as_ref().map(|armed| armed.item) else {
            return Ok(());
        };
        if ctx.inventory.total_amount(item) == 0 {
            return self.stop(Some("You ran out of boxes, stopping."), ctx);
        }

        if self.gacha.active() {
            gacha::send_try(self, ctx);
        } else if let Some(armed) = self.armed.as_mut() {
            if let Some(snapshot) = ctx.location {
                armed.position = snapshot.position;
                armed.heading = snapshot.heading;
            }
            ctx.send(MessageId::CUseItem, USE_ITEM_VERSION, Payload::UseItem(armed.clone()));
            self.stats.record_open();
        }

        if self.use_delay || self.gacha.detected {
            self.restart_timer(ctx);
        }
        Ok(())
    }

    /// Teardown. Idempotent: already Idle means nothing to do.
    pub fn stop(&mut self, reason: Option<&str>, ctx: &mut SessionContext) -> Result<(), String> {
        if !self.enabled && !self.scanning && self.armed.is_none() {
            return Ok(());
        }

        if let Some(group) = self.group.take() {
            ctx.hooks.unsubscribe_group(group);
        }

        if self.scanning {
            self.scanning = false;
            ctx.notify("Scanning for a box is aborted.");
            return Ok(());
        }

        if self.gacha.active() {
            // Best-effort; stop proceeds whatever the server does with it.
            ctx.send(
                MessageId::CGachaCancel,
                GACHA_CANCEL_VERSION,
                Payload::GachaCancel(GachaCancelRequest {
                    contract: self.gacha.contract,
                }),
            );
        }

        if let Some(timer) = self.timer.take() {
            ctx.timers.cancel(timer);
        }
        self.enabled = false;
        self.is_looting = false;
        self.gacha.clear();
        self.armed = None;

        if let Some(message) = reason {
            ctx.notify(message);
        }
        if let Some(summary) = self.stats.summary(ctx.now) {
            ctx.notify(summary);
        }
        self.stats.reset();
        Ok(())
    }

    fn on_use_item(&mut self, event: &Event, ctx: &mut SessionContext) -> Result<HookFlow, String> {
        if self.gacha.detected || !self.scanning {
            return Ok(HookFlow::Continue);
        }
        let Payload::UseItem(request) = &event.payload else {
            return Err("C_USE_ITEM carried an unexpected payload".to_string());
        };

        let mut armed = request.clone();
        armed.db_id = 0;
        let item = armed.item;
        self.armed = Some(armed);
        self.scanning = false;
        self.enabled = true;
        self.stats.start(ctx.now);

        let pacing = if self.use_delay {
            format!("a minimum {} sec delay", seconds_display(self.delay_ms))
        } else {
            "no delay".to_string()
        };
        ctx.notify(format!(
            "Box set to: {}, proceeding to auto-open it with {}",
            item.0, pacing
        ));

        // The first iteration always waits out the current delay value,
        // paced or not.
        self.timer = Some(ctx.timers.schedule(ctx.now, self.delay_ms, Task::DriveIteration));
        Ok(HookFlow::Continue)
    }

    fn on_loot_confirmed(&mut self, ctx: &mut SessionContext) -> Result<HookFlow, String> {
        if !self.enabled || self.armed.is_none() || self.gacha.detected || self.is_looting {
            return Ok(HookFlow::Continue);
        }
        self.is_looting = true;
        if !self.use_delay {
            // Confirmation-driven cadence: collapse the pending timer and
            // the confirmation into a single next step.
            if let Some(timer) = self.timer.take() {
                ctx.timers.cancel(timer);
            }
            self.drive_iteration(ctx)?;
        }
        Ok(HookFlow::Continue)
    }

    fn on_inventory_changed(&mut self) -> Result<HookFlow, String> {
        if self.enabled {
            self.is_looting = false;
        }
        Ok(HookFlow::Continue)
    }

    fn on_system_message(
        &mut self,
        event: &Event,
        ctx: &mut SessionContext,
    ) -> Result<HookFlow, String> {
        let Payload::SystemMessage(message) = &event.payload else {
            return Err("S_SYSTEM_MESSAGE carried an unexpected payload".to_string());
        };
        let name = ctx.decoder.decode(&message.message)?;
        if is_terminal(&name) {
            self.stop(Some("Box can not be opened anymore, stopping."), ctx)?;
        }
        Ok(HookFlow::Continue)
    }

    fn register_hooks(&mut self, ctx: &mut SessionContext) {
        let group = ctx.hooks.group();
        ctx.hooks
            .subscribe(group, MessageId::CUseItem, USE_ITEM_VERSION, HookTarget::UseItemObserved);
        ctx.hooks.subscribe(
            group,
            MessageId::SSystemMessageLootItem,
            LOOT_MESSAGE_VERSION,
            HookTarget::LootConfirmed,
        );
        ctx.hooks.subscribe(
            group,
            MessageId::SGachaEnd,
            ctx.protocol.gacha_end_version(),
            HookTarget::GachaEnd,
        );
        ctx.hooks.subscribe(
            group,
            MessageId::SSystemMessage,
            SYSTEM_MESSAGE_VERSION,
            HookTarget::SystemMessage,
        );
        if ctx.protocol.has_contract_gacha() {
            ctx.hooks.subscribe(
                group,
                MessageId::SRequestContract,
                ctx.protocol.contract_request_version(),
                HookTarget::ContractRequest,
            );
            ctx.hooks.subscribe(
                group,
                MessageId::SCancelContract,
                CANCEL_CONTRACT_VERSION,
                HookTarget::ContractCancel,
            );
        } else {
            ctx.hooks.subscribe(
                group,
                MessageId::SGachaStart,
                1,
                HookTarget::LegacyGachaStart,
            );
        }
        self.group = Some(group);
    }

    fn restart_timer(&mut self, ctx: &mut SessionContext) {
        if let Some(timer) = self.timer.take() {
            ctx.timers.cancel(timer);
        }
        self.timer = Some(ctx.timers.schedule(ctx.now, self.delay_ms, Task::DriveIteration));
    }

    fn delay_text(&self) -> String {
        if self.use_delay {
            format!("{} sec", seconds_display(self.delay_ms))
        } else {
            "no delay".to_string()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn is_looting(&self) -> bool {
        self.is_looting
    }

    pub fn pacing_enabled(&self) -> bool {
        self.use_delay
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn opened(&self) -> u64 {
        self.stats.opened()
    }

    pub fn gacha_active(&self) -> bool {
        self.gacha.active()
    }
}

fn seconds_display(delay_ms: u64) -> String {
    format!("{}", delay_ms as f64 / 1000.0)
}
