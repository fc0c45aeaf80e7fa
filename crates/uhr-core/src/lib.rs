//! Wire types shared by the time service: the client request, the server
//! reply and the leap-second status carried in every reply.

pub mod errors;
pub mod leap;
pub mod wire;

pub use errors::{InvalidLeapIndicator, WireError};
pub use leap::LeapStatus;
pub use wire::{unix_millis, ClientRequest, ServerReply};
