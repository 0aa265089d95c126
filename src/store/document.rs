use serde::Serialize;

use crate::error::{RepairError, Result};

/// Reserved field linking a document back to its owning entity's numeric id.
///
/// The value is the base-10 string form of a non-negative 64-bit integer,
/// with no sign and no padding. Fixed and case-sensitive for compatibility
/// with the surrounding graph store.
pub const ID_FIELD: &str = "_id_";

/// One named text field of a document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Textual field value.
    pub value: String,
}

/// The unit of indexed data: an ordered bag of named text fields
/// representing one graph entity in one named index.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document carrying the identifier field for `entity_id`.
    pub fn for_entity(entity_id: u64) -> Self {
        let mut doc = Self::new();
        doc.add_field(ID_FIELD, entity_id.to_string());
        doc
    }

    /// Appends a field, preserving insertion order.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Value of the first field named `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Whether any field named `name` is present.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// A damaged document is a live document lacking the identifier field.
    pub fn has_identifier(&self) -> bool {
        self.has_field(ID_FIELD)
    }

    /// Parses the identifier field as the owning entity's numeric id.
    pub fn entity_id(&self) -> Result<u64> {
        let raw = self.get(ID_FIELD).ok_or_else(|| {
            RepairError::Corruption(format!("document has no {ID_FIELD} field"))
        })?;
        raw.parse::<u64>().map_err(|_| {
            RepairError::Corruption(format!("unparseable {ID_FIELD} value: {raw:?}"))
        })
    }

    /// Copy of this document with every field named `name` removed, the
    /// order of the remainder preserved.
    pub fn without_field(&self, name: &str) -> Document {
        Document {
            fields: self
                .fields
                .iter()
                .filter(|f| f.name != name)
                .cloned()
                .collect(),
        }
    }

    /// Encodes the document as a record payload: field count, then each
    /// field as length-prefixed name and value bytes, all u32 LE.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&(self.fields.len() as u32).to_le_bytes());
        for field in &self.fields {
            put_str(&mut buffer, &field.name);
            put_str(&mut buffer, &field.value);
        }
        buffer
    }

    /// Decodes a record payload produced by [`Document::encode`].
    pub fn decode(payload: &[u8]) -> Result<Document> {
        let mut cursor = 0usize;
        let count = take_u32(payload, &mut cursor)? as usize;
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            let name = take_str(payload, &mut cursor)?;
            let value = take_str(payload, &mut cursor)?;
            fields.push(Field { name, value });
        }
        if cursor != payload.len() {
            return Err(RepairError::Corruption(format!(
                "{} trailing bytes after document payload",
                payload.len() - cursor
            )));
        }
        Ok(Document { fields })
    }
}

fn put_str(buffer: &mut Vec<u8>, value: &str) {
    buffer.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buffer.extend_from_slice(value.as_bytes());
}

fn take_u32(payload: &[u8], cursor: &mut usize) -> Result<u32> {
    let end = cursor
        .checked_add(4)
        .filter(|end| *end <= payload.len())
        .ok_or_else(|| RepairError::Corruption("document payload truncated".into()))?;
    let value = u32::from_le_bytes(
        payload[*cursor..end]
            .try_into()
            .expect("slice has exactly 4 bytes"),
    );
    *cursor = end;
    Ok(value)
}

fn take_str(payload: &[u8], cursor: &mut usize) -> Result<String> {
    let len = take_u32(payload, cursor)? as usize;
    let end = cursor
        .checked_add(len)
        .filter(|end| *end <= payload.len())
        .ok_or_else(|| RepairError::Corruption("document payload truncated".into()))?;
    let value = String::from_utf8(payload[*cursor..end].to_vec())
        .map_err(|_| RepairError::Corruption("document field is not valid UTF-8".into()))?;
    *cursor = end;
    Ok(value)
}
