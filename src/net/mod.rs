pub mod events;
pub mod messages;
pub mod protocol;
pub mod system_messages;
