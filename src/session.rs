use std::collections::VecDeque;
use std::time::Duration;

use crate::command::{parse_command, OpenerCommand};
use crate::config::OpenerConfig;
use crate::net::events::{EventDispatcher, HookFlow, HookTarget};
use crate::net::messages::{
    Event, MessageId, OutboundMessage, Payload, ITEMLIST_VERSION, PLAYER_LOCATION_VERSION,
};
use crate::net::protocol::ProtocolVersion;
use crate::net::system_messages::SystemMessageDecoder;
use crate::opener::BoxOpener;
use crate::telemetry::logging;
use crate::world::inventory::InventoryTable;
use crate::world::location::LocationSnapshot;
use crate::world::timer::{Millis, SessionClock, TimerQueue};

/// What the embedding proxy should do with a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Pass the message through to its normal consumer.
    Forward,
    /// A hook claimed the message; drop it.
    Drop,
}

/// Deferred work units. Timer fires and next-pass continuations both
/// funnel through here so every delayed action crosses the same
/// liveness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    DriveIteration,
}

/// Borrowed view of the session handed to the state machine for the
/// duration of one callback.
pub struct SessionContext<'a> {
    pub hooks: &'a mut EventDispatcher,
    pub timers: &'a mut TimerQueue<Task>,
    pub deferred: &'a mut VecDeque<Task>,
    pub now: Millis,
    pub protocol: ProtocolVersion,
    pub location: Option<LocationSnapshot>,
    pub inventory: &'a InventoryTable,
    pub decoder: &'a mut SystemMessageDecoder,
    pub outbound: &'a mut Vec<OutboundMessage>,
    pub notices: &'a mut Vec<String>,
}

impl SessionContext<'_> {
    pub fn send(&mut self, id: MessageId, version: u8, payload: Payload) {
        self.outbound.push(OutboundMessage {
            id,
            version,
            payload,
        });
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        logging::log_session(&message);
        self.notices.push(message);
    }
}

/// Composition root for one client session. Owns the dispatcher, the
/// timer queue, the cooperative scheduler, and the opener itself; the
/// embedding proxy feeds it observed messages and clock time, and
/// drains outbound messages and user notices.
pub struct Session {
    clock: SessionClock,
    hooks: EventDispatcher,
    timers: TimerQueue<Task>,
    deferred: VecDeque<Task>,
    opener: BoxOpener,
    protocol: ProtocolVersion,
    location: Option<LocationSnapshot>,
    inventory: InventoryTable,
    decoder: SystemMessageDecoder,
    outbound: Vec<OutboundMessage>,
    notices: Vec<String>,
}

impl Session {
    pub fn new(
        protocol: ProtocolVersion,
        config: OpenerConfig,
        decoder: SystemMessageDecoder,
    ) -> Self {
        let mut hooks = EventDispatcher::new();
        // Always-active subscriptions: whereabouts and the inventory
        // mirror outlive any number of arm/stop cycles.
        let ambient = hooks.group();
        hooks.subscribe(
            ambient,
            MessageId::CPlayerLocation,
            PLAYER_LOCATION_VERSION,
            HookTarget::PlayerLocation,
        );
        hooks.subscribe(
            ambient,
            MessageId::SItemlist,
            ITEMLIST_VERSION,
            HookTarget::InventoryChanged,
        );

        Self {
            clock: SessionClock::new(),
            hooks,
            timers: TimerQueue::new(),
            deferred: VecDeque::new(),
            opener: BoxOpener::new(&config),
            protocol,
            location: None,
            inventory: InventoryTable::new(),
            decoder,
            outbound: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Feed one observed message (either direction) through the hooks.
    pub fn deliver(&mut self, event: Event) -> Delivery {
        let matched = self.hooks.matches(event.id, event.version);
        let mut delivery = Delivery::Forward;
        for (hook, target) in matched {
            // A hook revoked earlier in this same dispatch must not run.
            if !self.hooks.is_live(hook) {
                continue;
            }
            self.hooks.note_fired(hook);
            if self.route(target, &event) == HookFlow::Suppress {
                delivery = Delivery::Drop;
                break;
            }
        }
        self.drain_deferred();
        delivery
    }

    /// Advance session time, firing every timer that falls due.
    pub fn advance(&mut self, duration: Duration) {
        self.clock.advance(duration);
        let now = self.clock.now();
        while let Some((_, task)) = self.timers.pop_due(now) {
            self.run_task(task, "timer callback");
            self.drain_deferred();
        }
        self.drain_deferred();
    }

    /// Execute one command line. Returns false when the line is not an
    /// opener command.
    pub fn run_command(&mut self, line: &str) -> bool {
        let Some(command) = parse_command(line) else {
            return false;
        };
        match command {
            OpenerCommand::Toggle => {
                let (opener, mut ctx) = self.parts();
                let result = opener.toggle(&mut ctx);
                if let Err(err) = result {
                    self.report("box command", &err);
                }
            }
            OpenerCommand::Delay(value) => {
                let (opener, mut ctx) = self.parts();
                opener.set_delay(value, &mut ctx);
            }
        }
        true
    }

    /// Host unload path: best-effort teardown of whatever is running.
    pub fn shutdown(&mut self) {
        let (opener, mut ctx) = self.parts();
        let result = opener.stop(None, &mut ctx);
        if let Err(err) = result {
            self.report("unload", &err);
        }
    }

    pub fn drain_outbound(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.outbound)
    }

    pub fn drain_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn opener(&self) -> &BoxOpener {
        &self.opener
    }

    pub fn hooks(&self) -> &EventDispatcher {
        &self.hooks
    }

    pub fn inventory(&self) -> &InventoryTable {
        &self.inventory
    }

    pub fn location(&self) -> Option<LocationSnapshot> {
        self.location
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    fn route(&mut self, target: HookTarget, event: &Event) -> HookFlow {
        if target == HookTarget::PlayerLocation {
            if let Payload::PlayerLocation(snapshot) = &event.payload {
                self.location = Some(*snapshot);
            }
            return HookFlow::Continue;
        }
        if target == HookTarget::InventoryChanged {
            if let Payload::ItemList(listing) = &event.payload {
                self.inventory.replace(listing.items.clone());
            }
        }

        let (opener, mut ctx) = self.parts();
        let result = opener.handle(target, event, &mut ctx);
        match result {
            Ok(flow) => flow,
            Err(err) => {
                self.report(boundary_name(target), &err);
                HookFlow::Continue
            }
        }
    }

    fn run_task(&mut self, task: Task, boundary: &str) {
        match task {
            Task::DriveIteration => {
                let (opener, mut ctx) = self.parts();
                let result = opener.drive_iteration(&mut ctx);
                if let Err(err) = result {
                    self.report(boundary, &err);
                }
            }
        }
    }

    fn drain_deferred(&mut self) {
        while let Some(task) = self.deferred.pop_front() {
            self.run_task(task, "deferred task");
        }
    }

    /// Handler boundary fault: one notice, one error-log line, carry on.
    fn report(&mut self, boundary: &str, err: &str) {
        let line = format!("{} error: {}", boundary, err);
        logging::log_error(&line);
        self.notices.push(line);
    }

    fn parts(&mut self) -> (&mut BoxOpener, SessionContext<'_>) {
        (
            &mut self.opener,
            SessionContext {
                hooks: &mut self.hooks,
                timers: &mut self.timers,
                deferred: &mut self.deferred,
                now: self.clock.now(),
                protocol: self.protocol,
                location: self.location,
                inventory: &self.inventory,
                decoder: &mut self.decoder,
                outbound: &mut self.outbound,
                notices: &mut self.notices,
            },
        )
    }
}

fn boundary_name(target: HookTarget) -> &'static str {
    match target {
        HookTarget::UseItemObserved => "use item hook",
        HookTarget::LootConfirmed => "loot message hook",
        HookTarget::GachaEnd => "gacha end hook",
        HookTarget::SystemMessage => "system message hook",
        HookTarget::ContractRequest => "request contract hook",
        HookTarget::ContractCancel => "cancel contract hook",
        HookTarget::GachaStartOnce => "gacha start hook",
        HookTarget::LegacyGachaStart => "legacy gacha start hook",
        HookTarget::PlayerLocation => "player location hook",
        HookTarget::InventoryChanged => "inventory update",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::messages::{
        ContractId, ContractNotice, GachaStart, ItemListSnapshot, SystemMessageEvent,
        UseItemRequest, USE_ITEM_VERSION,
    };
    use crate::world::inventory::{ItemStack, ItemTypeId};
    use crate::world::location::{Heading, Vec3};

    const BOX_ITEM: u32 = 200;

    fn decoder() -> SystemMessageDecoder {
        SystemMessageDecoder::new(
            vec![
                "SMT_COMMON_NO_MORE_ITEM_TO_USE".to_string(),
                "SMT_GACHA_CANCEL".to_string(),
                "SMT_MEGAPHONE".to_string(),
            ],
            16,
        )
    }

    fn session(version: u32) -> Session {
        Session::new(ProtocolVersion(version), OpenerConfig::default(), decoder())
    }

    fn use_item_event(item: u32) -> Event {
        Event::new(
            MessageId::CUseItem,
            USE_ITEM_VERSION,
            Payload::UseItem(UseItemRequest {
                item: ItemTypeId(item),
                db_id: 7777,
                amount: 1,
                position: Vec3::new(10.0, 20.0, 30.0),
                heading: Heading(0),
                token: 1,
            }),
        )
    }

    fn itemlist_event(item: u32, amount: u32) -> Event {
        Event::new(
            MessageId::SItemlist,
            ITEMLIST_VERSION,
            Payload::ItemList(ItemListSnapshot {
                items: vec![ItemStack::new(ItemTypeId(item), 1, amount)],
            }),
        )
    }

    fn loot_event() -> Event {
        Event::new(MessageId::SSystemMessageLootItem, 1, Payload::LootItem)
    }

    fn system_message(raw: &str) -> Event {
        Event::new(
            MessageId::SSystemMessage,
            1,
            Payload::SystemMessage(SystemMessageEvent {
                message: raw.to_string(),
            }),
        )
    }

    fn location_event(x: f32, heading: i16) -> Event {
        Event::new(
            MessageId::CPlayerLocation,
            PLAYER_LOCATION_VERSION,
            Payload::PlayerLocation(LocationSnapshot::new(
                Vec3::new(x, 0.0, 0.0),
                Heading(heading),
            )),
        )
    }

    fn contract_request(session: &Session, id: u64) -> Event {
        Event::new(
            MessageId::SRequestContract,
            session.protocol.contract_request_version(),
            Payload::ContractRequest(ContractNotice {
                kind: 53,
                contract: ContractId(id),
            }),
        )
    }

    fn gacha_start(session: &Session, id: u64) -> Event {
        Event::new(
            MessageId::SGachaStart,
            session.protocol.gacha_start_version(),
            Payload::GachaStart(GachaStart {
                contract: ContractId(id),
            }),
        )
    }

    fn gacha_end(session: &Session) -> Event {
        Event::new(
            MessageId::SGachaEnd,
            session.protocol.gacha_end_version(),
            Payload::GachaEnd,
        )
    }

    /// box command, inventory snapshot, then the demonstration use.
    fn arm(session: &mut Session, amount: u32) {
        assert!(session.run_command("box"));
        session.deliver(itemlist_event(BOX_ITEM, amount));
        session.deliver(use_item_event(BOX_ITEM));
        assert!(session.opener().is_armed());
    }

    fn sent_uses(outbound: &[OutboundMessage]) -> usize {
        outbound
            .iter()
            .filter(|msg| msg.id == MessageId::CUseItem)
            .count()
    }

    #[test]
    fn toggle_twice_without_use_never_arms() {
        let mut session = session(90);
        assert!(session.run_command("box"));
        assert!(session.opener().is_scanning());
        assert!(session.run_command("box"));

        assert!(!session.opener().is_scanning());
        assert!(!session.opener().is_enabled());
        assert!(!session.opener().is_armed());

        let notices = session.drain_notices();
        assert!(notices
            .iter()
            .any(|n| n.contains("Please normally open a box now")));
        assert!(notices.iter().any(|n| n == "Scanning for a box is aborted."));
        assert!(!notices.iter().any(|n| n.contains("Opened:")));
    }

    #[test]
    fn unknown_commands_are_not_ours() {
        let mut session = session(90);
        assert!(!session.run_command("teleport 1 2 3"));
        assert!(session.drain_notices().is_empty());
    }

    #[test]
    fn delay_zero_disables_pacing_and_restores_default() {
        let mut session = session(90);
        assert!(session.run_command("boxdelay 2500"));
        assert!(session.opener().pacing_enabled());
        assert_eq!(session.opener().delay_ms(), 2500);

        assert!(session.run_command("boxdelay 0"));
        assert!(!session.opener().pacing_enabled());
        assert_eq!(session.opener().delay_ms(), 5500);

        assert!(session.run_command("boxdelay"));
        let notices = session.drain_notices();
        assert!(notices
            .iter()
            .any(|n| n == "Minimum box opening delay is set to: 2.5 sec."));
        assert!(notices
            .iter()
            .any(|n| n == "Minimum box opening delay is set to: no delay."));
        assert!(notices.iter().any(|n| n == "Current delay is: no delay."));
    }

    #[test]
    fn arming_captures_item_and_waits_out_the_first_delay() {
        let mut session = session(90);
        session.deliver(location_event(55.0, 12));
        arm(&mut session, 3);

        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n
            == "Box set to: 200, proceeding to auto-open it with no delay"));

        // Nothing goes out until the first scheduled iteration.
        assert!(session.drain_outbound().is_empty());
        session.advance(Duration::from_millis(5499));
        assert!(session.drain_outbound().is_empty());
        session.advance(Duration::from_millis(1));

        let outbound = session.drain_outbound();
        assert_eq!(sent_uses(&outbound), 1);
        let Payload::UseItem(request) = &outbound[0].payload else {
            panic!("expected a use request");
        };
        assert_eq!(request.db_id, 0);
        assert_eq!(request.position, Vec3::new(55.0, 0.0, 0.0));
        assert_eq!(request.heading, Heading(12));
        assert_eq!(session.opener().opened(), 1);
    }

    #[test]
    fn own_replays_do_not_rearm() {
        let mut session = session(90);
        arm(&mut session, 3);
        session.advance(Duration::from_millis(5500));
        assert_eq!(session.opener().opened(), 1);

        // The replayed use comes back through the stream; scanning is
        // over, so it must not rearm or recount.
        session.deliver(use_item_event(BOX_ITEM));
        assert_eq!(session.opener().opened(), 1);
        assert!(session.opener().is_armed());
    }

    #[test]
    fn direct_use_loop_drains_the_stack_and_reports() {
        let mut session = session(90);
        arm(&mut session, 3);
        session.advance(Duration::from_millis(5500));
        assert_eq!(session.opener().opened(), 1);

        // Confirmation-driven cadence with pacing off: each loot
        // confirmation triggers one immediate reuse.
        session.deliver(loot_event());
        assert_eq!(session.opener().opened(), 2);
        assert!(session.opener().is_looting());

        // Gate stays shut until the inventory notices the delta.
        session.deliver(loot_event());
        assert_eq!(session.opener().opened(), 2);

        session.deliver(itemlist_event(BOX_ITEM, 1));
        assert!(!session.opener().is_looting());
        session.deliver(loot_event());
        assert_eq!(session.opener().opened(), 3);

        session.deliver(itemlist_event(BOX_ITEM, 0));
        session.deliver(loot_event());

        assert!(!session.opener().is_enabled());
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n == "You ran out of boxes, stopping."));
        assert!(notices.iter().any(|n| n.contains("Opened: 3 boxes")));

        let outbound = session.drain_outbound();
        assert_eq!(sent_uses(&outbound), 3);
        assert_eq!(outbound.len(), 3);
        assert_eq!(session.pending_timers(), 0);
    }

    #[test]
    fn paced_loop_is_timer_driven() {
        let mut session = session(90);
        assert!(session.run_command("boxdelay 1000"));
        arm(&mut session, 10);

        session.advance(Duration::from_millis(1000));
        assert_eq!(session.opener().opened(), 1);

        // Loot confirmation must not short-circuit the timer cadence.
        session.deliver(loot_event());
        assert_eq!(session.opener().opened(), 1);

        session.advance(Duration::from_millis(1000));
        assert_eq!(session.opener().opened(), 2);
        assert_eq!(session.pending_timers(), 1);
    }

    #[test]
    fn contract_gacha_handshake_v110() {
        let mut session = session(110);
        arm(&mut session, 5);
        session.drain_outbound();

        assert_eq!(
            session.deliver(contract_request(&session, 0xABC)),
            Delivery::Drop
        );
        assert_eq!(session.hooks().hooks_for(MessageId::SGachaStart, 2), 1);
        assert!(!session.opener().gacha_active());

        // A duplicate request must not stack a second watcher.
        assert_eq!(
            session.deliver(contract_request(&session, 0xDEF)),
            Delivery::Drop
        );
        assert_eq!(session.hooks().hooks_for(MessageId::SGachaStart, 2), 1);

        assert_eq!(session.deliver(gacha_start(&session, 0x999)), Delivery::Drop);
        assert!(session.opener().gacha_active());
        assert_eq!(session.opener().opened(), 1);

        let outbound = session.drain_outbound();
        let tries: Vec<_> = outbound
            .iter()
            .filter(|msg| msg.id == MessageId::CGachaTry)
            .collect();
        assert_eq!(tries.len(), 1);
        assert_eq!(tries[0].version, 2);
        let Payload::GachaTry(request) = &tries[0].payload else {
            panic!("expected a gacha try");
        };
        // Contract id comes from the request event, not the start event.
        assert_eq!(request.contract, ContractId(0xABC));
        assert_eq!(request.amount, Some(1));

        // The watcher was one-shot.
        assert_eq!(session.hooks().hooks_for(MessageId::SGachaStart, 2), 0);
    }

    #[test]
    fn gacha_end_defers_exactly_one_try() {
        let mut session = session(110);
        arm(&mut session, 5);
        session.deliver(contract_request(&session, 0xABC));
        session.deliver(gacha_start(&session, 0xABC));
        session.drain_outbound();
        assert_eq!(session.opener().opened(), 1);

        session.deliver(gacha_end(&session));
        let outbound = session.drain_outbound();
        let tries = outbound
            .iter()
            .filter(|msg| msg.id == MessageId::CGachaTry)
            .count();
        assert_eq!(tries, 1);
        assert_eq!(session.opener().opened(), 2);
    }

    #[test]
    fn paced_gacha_end_reschedules_instead_of_deferring() {
        let mut session = session(110);
        assert!(session.run_command("boxdelay 2000"));
        arm(&mut session, 5);
        session.deliver(contract_request(&session, 0xABC));
        session.deliver(gacha_start(&session, 0xABC));
        session.drain_outbound();

        session.deliver(gacha_end(&session));
        // Nothing yet; the try waits out the pacing delay.
        assert!(session.drain_outbound().is_empty());
        session.advance(Duration::from_millis(2000));
        let outbound = session.drain_outbound();
        assert_eq!(
            outbound
                .iter()
                .filter(|msg| msg.id == MessageId::CGachaTry)
                .count(),
            1
        );
    }

    #[test]
    fn legacy_gacha_flow_below_contract_threshold() {
        let mut session = session(90);
        arm(&mut session, 5);
        session.drain_outbound();

        assert_eq!(
            session.deliver(gacha_start(&session, 0x55)),
            Delivery::Forward
        );
        assert!(session.opener().gacha_active());
        assert_eq!(session.opener().opened(), 1);

        let outbound = session.drain_outbound();
        let Payload::GachaTry(request) = &outbound[0].payload else {
            panic!("expected a gacha try");
        };
        assert_eq!(outbound[0].version, 1);
        assert_eq!(request.contract, ContractId(0x55));
        assert_eq!(request.amount, None);

        // Continuation works the same way, one deferred try per end.
        session.deliver(gacha_end(&session));
        assert_eq!(session.opener().opened(), 2);
    }

    #[test]
    fn terminal_message_aborts_scan() {
        let mut session = session(90);
        assert!(session.run_command("box"));
        session.deliver(system_message("@0"));

        assert!(!session.opener().is_scanning());
        assert!(!session.opener().is_enabled());
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n == "Scanning for a box is aborted."));
        assert!(!notices.iter().any(|n| n.contains("Opened:")));
    }

    #[test]
    fn terminal_message_stops_armed_loop_and_silences_pending_timer() {
        let mut session = session(90);
        assert!(session.run_command("boxdelay 1000"));
        arm(&mut session, 10);
        session.advance(Duration::from_millis(1000));
        assert_eq!(session.opener().opened(), 1);
        assert_eq!(session.pending_timers(), 1);

        session.deliver(system_message("@0"));
        assert!(!session.opener().is_enabled());
        assert_eq!(session.pending_timers(), 0);

        let notices = session.drain_notices();
        assert!(notices
            .iter()
            .any(|n| n == "Box can not be opened anymore, stopping."));
        assert!(notices.iter().any(|n| n.contains("Opened: 1 boxes")));

        // Even a generous slice of time produces no further sends.
        session.drain_outbound();
        session.advance(Duration::from_secs(60));
        assert!(session.drain_outbound().is_empty());
    }

    #[test]
    fn terminal_message_in_gacha_mode_cancels_the_contract() {
        let mut session = session(110);
        arm(&mut session, 5);
        session.deliver(contract_request(&session, 0xABC));
        session.deliver(gacha_start(&session, 0xABC));
        session.drain_outbound();

        session.deliver(system_message("@0"));
        assert!(!session.opener().is_enabled());
        assert!(!session.opener().gacha_active());

        let outbound = session.drain_outbound();
        let cancels: Vec<_> = outbound
            .iter()
            .filter(|msg| msg.id == MessageId::CGachaCancel)
            .collect();
        assert_eq!(cancels.len(), 1);
        let Payload::GachaCancel(request) = &cancels[0].payload else {
            panic!("expected a gacha cancel");
        };
        assert_eq!(request.contract, ContractId(0xABC));

        // Hooks are gone; later terminal messages fall through untouched.
        session.drain_notices();
        assert_eq!(session.deliver(system_message("@0")), Delivery::Forward);
        assert!(session.drain_notices().is_empty());
    }

    #[test]
    fn server_contract_cancel_stops_the_run() {
        let mut session = session(110);
        arm(&mut session, 5);
        session.deliver(contract_request(&session, 0xABC));
        session.deliver(gacha_start(&session, 0xABC));
        session.drain_notices();

        session.deliver(Event::new(
            MessageId::SCancelContract,
            1,
            Payload::ContractCancel(ContractNotice {
                kind: 53,
                contract: ContractId(0xABC),
            }),
        ));

        assert!(!session.opener().is_enabled());
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n == "Gacha cancelled."));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut session = session(110);
        assert!(session.run_command("boxdelay 1000"));
        arm(&mut session, 5);
        session.deliver(contract_request(&session, 0xABC));
        session.deliver(gacha_start(&session, 0xABC));
        session.drain_outbound();
        session.drain_notices();

        session.shutdown();
        assert!(!session.opener().is_enabled());
        assert_eq!(session.pending_timers(), 0);
        let outbound = session.drain_outbound();
        assert_eq!(
            outbound
                .iter()
                .filter(|msg| msg.id == MessageId::CGachaCancel)
                .count(),
            1
        );
        assert!(session
            .drain_notices()
            .iter()
            .any(|n| n.contains("Opened: 1 boxes")));

        // Second teardown touches nothing.
        session.shutdown();
        assert!(session.drain_outbound().is_empty());
        assert!(session.drain_notices().is_empty());
    }

    #[test]
    fn decoder_fault_is_reported_and_survivable() {
        let mut session = session(90);
        arm(&mut session, 3);
        session.advance(Duration::from_millis(5500));
        session.drain_notices();

        session.deliver(system_message("garbled"));
        let notices = session.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("system message hook error:"));
        assert!(session.opener().is_enabled());

        // The loop keeps running.
        session.deliver(loot_event());
        assert_eq!(session.opener().opened(), 2);
    }

    #[test]
    fn non_terminal_system_messages_pass_through() {
        let mut session = session(90);
        arm(&mut session, 3);
        assert_eq!(session.deliver(system_message("@2")), Delivery::Forward);
        assert!(session.opener().is_enabled());
        assert!(session.drain_notices().iter().all(|n| !n.contains("error")));
    }

    #[test]
    fn location_updates_refresh_each_reuse() {
        let mut session = session(90);
        arm(&mut session, 10);
        session.advance(Duration::from_millis(5500));
        session.drain_outbound();

        session.deliver(location_event(99.0, -7));
        session.deliver(loot_event());
        let outbound = session.drain_outbound();
        let Payload::UseItem(request) = &outbound[0].payload else {
            panic!("expected a use request");
        };
        assert_eq!(request.position, Vec3::new(99.0, 0.0, 0.0));
        assert_eq!(request.heading, Heading(-7));
    }
}
