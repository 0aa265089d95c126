use crate::error::{RepairError, Result};

/// Fixed header: kind byte, three pad bytes, payload length u32 LE.
pub const RECORD_HEADER_SIZE: usize = 8;
/// crc32 of the payload, appended after the payload bytes.
pub const RECORD_TRAILER_SIZE: usize = 4;

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RecordKind {
    Document = 0x01,
}

impl RecordKind {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(Self::Document),
            other => Err(RepairError::Corruption(format!(
                "unknown record kind: 0x{other:02X}"
            ))),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RecordHeader {
    pub kind: RecordKind,
    pub payload_length: u32,
}

impl RecordHeader {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Err(RepairError::Corruption("record header truncated".into()));
        }
        let kind = RecordKind::from_byte(bytes[0])?;
        let payload_length =
            u32::from_le_bytes(bytes[4..8].try_into().expect("slice has exactly 4 bytes"));
        Ok(Self {
            kind,
            payload_length,
        })
    }

    /// Total on-disk length of the record this header describes.
    pub fn record_length(&self) -> usize {
        RECORD_HEADER_SIZE + self.payload_length as usize + RECORD_TRAILER_SIZE
    }
}

/// Frames a payload as header + payload + crc32 trailer.
pub fn encode_record(kind: RecordKind, payload: &[u8]) -> Vec<u8> {
    let mut buffer =
        Vec::with_capacity(RECORD_HEADER_SIZE + payload.len() + RECORD_TRAILER_SIZE);
    buffer.push(kind.to_byte());
    buffer.extend_from_slice(&[0; 3]);
    buffer.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buffer.extend_from_slice(payload);
    buffer.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    buffer
}

/// Verifies the trailer checksum and returns the payload slice of a full
/// record buffer (header included). `offset` is only used for diagnostics.
pub fn verify_record(bytes: &[u8], offset: u64) -> Result<&[u8]> {
    let header = RecordHeader::from_bytes(bytes)?;
    let record_len = header.record_length();
    if bytes.len() < record_len {
        return Err(RepairError::Corruption(format!(
            "record at offset {offset} extends past end of log"
        )));
    }
    let payload = &bytes[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + header.payload_length as usize];
    let stored = u32::from_le_bytes(
        bytes[record_len - RECORD_TRAILER_SIZE..record_len]
            .try_into()
            .expect("slice has exactly 4 bytes"),
    );
    if crc32fast::hash(payload) != stored {
        return Err(RepairError::Corruption(format!(
            "checksum mismatch for record at offset {offset}"
        )));
    }
    Ok(payload)
}
