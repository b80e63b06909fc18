//! Binary encoding of [`Message`]s for stream transports.

use crate::Message;

pub use postcard::Error as WireError;

pub fn encode(message: &Message) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(message)
}

pub fn decode(bytes: &[u8]) -> Result<Message, WireError> {
    postcard::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Element, WorkItem};

    #[test]
    fn minimum_element_is_ordinary_data() {
        // Element::MIN is data, never a shutdown marker.
        let task = Message::Task(WorkItem::new(1, vec![Element::MIN], vec![1]));
        let decoded = decode(&encode(&task).unwrap()).unwrap();
        assert_eq!(decoded, task);
        assert_ne!(decoded, Message::Terminate);
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let bytes = encode(&Message::Block(vec![1, 2, 3])).unwrap();
        assert!(decode(&bytes[..bytes.len() - 1]).is_err());
    }
}
