pub mod client;
pub mod serialization;
pub mod transmission;

pub use client::build_http_client;
pub use serialization::{Payload, PushRequest, PushStream, SerializationError};
pub use transmission::{BatchSender, SendOutcome, TENANT_HEADER, TransportError};
