//! Git annotated tag object
//!
//! ## Format
//!
//! ```text
//! object <target-sha>
//! type <target-type>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message>
//! -----BEGIN <KIND> SIGNATURE-----
//! ...
//! -----END <KIND> SIGNATURE-----
//! ```
//!
//! Unlike commits, the signature of a tag is appended to the message. A block
//! without its matching end marker is left in the message as plain text.
//!
//! Lightweight tags are plain refs and never decode to a [`Tag`].

use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::signature::{CommitSignature, Signature};
use crate::errors::GitError;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Tag {
    id: ObjectId,
    /// Object the tag points at, the empty id if the header is absent
    target: ObjectId,
    target_type: Option<ObjectType>,
    /// Value of the `tag` header
    name: String,
    tagger: Option<Signature>,
    message: String,
    signature: Option<CommitSignature>,
}

impl Tag {
    /// Decode a tag from its raw content
    ///
    /// # Arguments
    ///
    /// * `id` - Id the content was fetched under, also decides the object format
    /// * `data` - Object content, without the batch header
    pub fn from_bytes(id: ObjectId, data: &[u8]) -> Result<Self, GitError> {
        let mut target = id.format().empty_object_id();
        let mut target_type = None;
        let mut name = String::new();
        let mut tagger = None;

        let mut pos = 0;
        while let Some(eol) = data[pos..].iter().position(|b| *b == b'\n') {
            if eol == 0 {
                // blank line ends the headers
                pos += 1;
                break;
            }

            let line = String::from_utf8_lossy(&data[pos..pos + eol]);
            let (key, value) = line.split_once(' ').unwrap_or((line.as_ref(), ""));
            match key {
                "object" => {
                    target = ObjectId::try_parse(value)
                        .map_err(|e| GitError::malformed(ObjectType::Tag, id, e.to_string()))?;
                }
                "type" => target_type = ObjectType::try_from(value).ok(),
                "tag" => name = value.to_string(),
                "tagger" => tagger = Some(Signature::from_commit_line(value)),
                _ => {}
            }

            pos += eol + 1;
        }

        let (payload, message, signature) = split_payload_signature(data, pos);
        let signature = signature.map(|signature| {
            CommitSignature::new(
                String::from_utf8_lossy(signature).into_owned(),
                String::from_utf8_lossy(payload).into_owned(),
            )
        });

        Ok(Tag {
            id,
            target,
            target_type,
            name,
            tagger,
            message: String::from_utf8_lossy(message).into_owned(),
            signature,
        })
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> Option<ObjectType> {
        self.target_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> Option<&Signature> {
        self.tagger.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn signature(&self) -> Option<&CommitSignature> {
        self.signature.as_ref()
    }
}

/// Locate a trailing armoured signature block in `data`
///
/// # Returns
///
/// `(payload, message, signature)`: the payload is everything before the block
/// minus its preceding newline. Without a complete block the payload is the whole
/// input and the signature is `None`.
fn split_payload_signature(data: &[u8], message_start: usize) -> (&[u8], &[u8], Option<&[u8]>) {
    let message_start = message_start.min(data.len());
    let mut pos = message_start;

    while let Some(eol) = data[pos..].iter().position(|b| *b == b'\n') {
        let line = &data[pos..pos + eol];

        let kind = line
            .strip_prefix(b"-----BEGIN ".as_slice())
            .and_then(|rest| rest.strip_suffix(b" SIGNATURE-----".as_slice()));
        if let Some(kind) = kind {
            let mut end_marker = b"\n-----END ".to_vec();
            end_marker.extend_from_slice(kind);
            end_marker.extend_from_slice(b" SIGNATURE-----");

            if let Some(offset) = find(&data[pos..], &end_marker) {
                let sign_start = pos;
                let sign_end = pos + offset + end_marker.len();
                let message_end = message_start.max(sign_start.saturating_sub(1));

                return (
                    &data[..message_end],
                    &data[message_start..message_end],
                    Some(&data[sign_start..sign_end]),
                );
            }
        }

        pos += eol + 1;
    }

    (data, &data[message_start..], None)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl Object for Tag {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }
}
