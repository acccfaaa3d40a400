mod artifacts;
mod delivery;
mod direct;
mod error;
mod ticket;

pub use artifacts::{ArtifactManager, TemporaryVideoFile};
pub use delivery::DeliveryCoordinator;
pub use direct::DirectDelivery;
pub use error::RuntimeError;
pub use ticket::{parse_ticket_id, DeliveryTicket, MemoryTicketStore, TicketState, TicketStore, TICKET_PREFIX};

use crate::platform::Platform;

/// Caption attached to every delivered video.
pub fn video_caption(platform: Platform, proxied: bool) -> String {
    let platform = platform.to_string();
    if proxied {
        t!("captions.video_proxied", platform = platform).to_string()
    } else {
        t!("captions.video", platform = platform).to_string()
    }
}
