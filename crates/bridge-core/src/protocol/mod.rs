//! Wire protocol: frame header, message catalog, and the codec between them.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, encode_message, FrameDecoder, FramingError};
pub use messages::{Message, MessageFlags, MessageType};
