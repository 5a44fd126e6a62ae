use super::{DescriptorSet, SchemaFile};
use crate::error::{Error, Result};
use bytes::Buf;
use prost::encoding::{decode_key, decode_varint, WireType};
use prost::Message;
use prost_types::FileDescriptorProto;
use std::collections::HashSet;
use tracing::debug;

/// Field number of `FileDescriptorSet.file`
const FILE_FIELD: u32 = 1;

/// Decode a serialized `FileDescriptorSet`.
///
/// The blob is a run of length-prefixed file records. Any truncated or
/// structurally invalid record fails the whole decode; no partial set is returned.
pub fn decode(data: &[u8]) -> Result<DescriptorSet> {
    let mut buf = data;
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    while buf.has_remaining() {
        let offset = data.len() - buf.remaining();
        let (tag, wire_type) = decode_key(&mut buf)
            .map_err(|e| malformed(offset, format!("invalid record key: {e}")))?;
        if tag != FILE_FIELD || wire_type != WireType::LengthDelimited {
            return Err(malformed(
                offset,
                format!("unexpected field {tag} with wire type {wire_type:?}"),
            ));
        }

        let declared_len = decode_varint(&mut buf)
            .map_err(|e| malformed(offset, format!("invalid length prefix: {e}")))?;
        let len = usize::try_from(declared_len)
            .ok()
            .filter(|len| *len <= buf.remaining())
            .ok_or_else(|| {
                malformed(
                    offset,
                    format!(
                        "declared length {declared_len} exceeds the {} remaining bytes",
                        buf.remaining()
                    ),
                )
            })?;

        let payload = &buf[..len];
        let proto = FileDescriptorProto::decode(payload)
            .map_err(|e| malformed(offset, format!("invalid file descriptor: {e}")))?;
        buf.advance(len);

        if proto.name().is_empty() {
            return Err(malformed(offset, "file descriptor without a name".to_string()));
        }
        if !seen.insert(proto.name().to_string()) {
            return Err(malformed(
                offset,
                format!("duplicate file '{}'", proto.name()),
            ));
        }

        let unretained_bytes = len.saturating_sub(proto.encoded_len());
        if unretained_bytes > 0 {
            debug!(
                file = proto.name(),
                unretained_bytes, "file carries fields outside descriptor.proto"
            );
        }

        files.push(SchemaFile {
            declared: declared_names(&proto),
            proto,
            unretained_bytes,
        });
    }

    debug!(files = files.len(), bytes = data.len(), "decoded descriptor set");
    Ok(DescriptorSet { files })
}

fn malformed(offset: usize, reason: String) -> Error {
    Error::MalformedInput(format!("at byte {offset}: {reason}"))
}

fn declared_names(proto: &FileDescriptorProto) -> Vec<String> {
    let qualify = |name: &str| match proto.package() {
        "" => name.to_string(),
        pkg => format!("{pkg}.{name}"),
    };
    proto
        .message_type
        .iter()
        .map(|m| qualify(m.name()))
        .chain(proto.enum_type.iter().map(|e| qualify(e.name())))
        .chain(proto.service.iter().map(|s| qualify(s.name())))
        .collect()
}
