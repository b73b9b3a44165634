use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// One message on the wire: an ordered list of byte parts.
pub type Multipart = Vec<Bytes>;

/// Upper limit of parts in one multipart message.
pub const MAX_PARTS: usize = 1024;
/// Upper limit of a single part.
pub const MAX_PART_LEN: usize = 64 * 1024 * 1024;

/// Frames multipart messages on a byte stream.
///
/// A message is the number of parts as a big endian `u32` followed by every part
/// as a big endian `u32` length and the part bytes.
pub struct MultipartCodec {}

impl Encoder<Multipart> for MultipartCodec {
    type Error = std::io::Error;

    fn encode(&mut self, parts: Multipart, buf: &mut BytesMut) -> Result<(), Self::Error> {
        if parts.len() > MAX_PARTS {
            return Err(invalid_data(format!("too many parts {}", parts.len())));
        }

        if let Some(part) = parts.iter().find(|p| p.len() > MAX_PART_LEN) {
            return Err(invalid_data(format!("part is too long {}", part.len())));
        }

        buf.reserve(4 + parts.iter().map(|p| 4 + p.len()).sum::<usize>());
        buf.put_u32(parts.len() as u32);

        for part in parts {
            buf.put_u32(part.len() as u32);
            buf.put(part);
        }

        Ok(())
    }
}

impl Decoder for MultipartCodec {
    type Item = Multipart;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let len = match full_message_len(&src[..])? {
            Some(len) => len,
            None => return Ok(None),
        };

        let mut message = src.split_to(len).freeze();
        let count = message.get_u32() as usize;
        let mut parts = Vec::with_capacity(count);

        for _ in 0..count {
            let part_len = message.get_u32() as usize;

            parts.push(message.split_to(part_len));
        }

        Ok(Some(parts))
    }
}

/// Check if the buffer contains a full message and return its length. Only the
/// length prefixes are read, the buffer is not consumed.
fn full_message_len(src: &[u8]) -> Result<Option<usize>, std::io::Error> {
    if src.len() < 4 {
        return Ok(None);
    }

    let count = read_u32(src, 0) as usize;
    if count > MAX_PARTS {
        return Err(invalid_data(format!("too many parts {}", count)));
    }

    let mut pos = 4;

    for _ in 0..count {
        if src.len() < pos + 4 {
            return Ok(None);
        }

        let part_len = read_u32(src, pos) as usize;
        if part_len > MAX_PART_LEN {
            return Err(invalid_data(format!("part is too long {}", part_len)));
        }

        pos += 4 + part_len;

        if src.len() < pos {
            return Ok(None);
        }
    }

    Ok(Some(pos))
}

fn read_u32(src: &[u8], pos: usize) -> u32 {
    let mut bs = [0u8; 4];
    bs.copy_from_slice(&src[pos..pos + 4]);

    u32::from_be_bytes(bs)
}

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}
