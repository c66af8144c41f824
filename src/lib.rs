pub mod command;
pub mod config;
pub mod net;
pub mod opener;
pub mod session;
pub mod telemetry;
pub mod world;

pub use command::{parse_command, OpenerCommand};
pub use config::{OpenerConfig, DEFAULT_DELAY_MS};
pub use net::events::{EventDispatcher, GroupToken, HookFlow, HookId, HookTarget};
pub use net::messages::{ContractId, Event, MessageId, OutboundMessage, Payload};
pub use net::protocol::ProtocolVersion;
pub use net::system_messages::{is_terminal, SystemMessageDecoder, STOP_MESSAGES};
pub use opener::BoxOpener;
pub use session::{Delivery, Session, SessionContext, Task};
pub use world::inventory::{InventoryTable, ItemStack, ItemTypeId};
pub use world::location::{Heading, LocationSnapshot, Vec3};
pub use world::timer::{Millis, SessionClock, TimerId, TimerQueue};
