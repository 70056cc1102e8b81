//! Discord side of the bridge: turns serenity events into plain
//! [`InboundEvent`](mailblaster_types::events::InboundEvent)s and sends
//! command replies back.

pub mod dispatcher;
pub mod handler;
pub mod options;
pub mod registry;

pub use dispatcher::EventDispatcher;
pub use handler::MailblasterHandler;
