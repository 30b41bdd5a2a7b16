use serde::{Deserialize, Serialize};

use crate::{error::CodecError, parameter::Parameter};

/// Ordered run of parameters, built fresh for each tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    parameters: Vec<Parameter>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    /// Parameters in insertion order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Consumes the message.
    #[must_use]
    pub fn into_parameters(self) -> Vec<Parameter> {
        self.parameters
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether there is nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    fn as_shout(&self) -> Option<&'static [u8]> {
        match self.parameters.as_slice() {
            [only] => only.shout_literal(),
            _ => None,
        }
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.as_shout().map_or_else(
            || self.parameters.iter().map(Parameter::record_len).sum(),
            <[u8]>::len,
        )
    }

    /// Concatenates every record.
    ///
    /// A message made of a single shout encodes as the bare literal; shouts
    /// mixed with other facts cannot be represented and are skipped.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.encode_within(usize::MAX)
    }

    /// Encodes the longest prefix of whole records that fits in `limit` bytes.
    #[must_use]
    pub fn encode_within(&self, limit: usize) -> Vec<u8> {
        if let Some(literal) = self.as_shout() {
            return if literal.len() <= limit {
                literal.to_vec()
            } else {
                Vec::new()
            };
        }
        let mut out = Vec::with_capacity(self.size().min(limit));
        for parameter in &self.parameters {
            let len = parameter.record_len();
            if len == 0 {
                continue;
            }
            if out.len() + len > limit {
                tracing::trace!(limit, dropped_from = ?parameter.tag(), "message cut at budget");
                break;
            }
            parameter.write_record(&mut out);
        }
        out
    }

    /// Decodes a buffer. Never fails; stops at the first bad record.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        if let Some(shout) = Parameter::from_shout(bytes) {
            return Self {
                parameters: vec![shout],
            };
        }
        let mut message = Self::new();
        let mut offset = 0;
        while offset < bytes.len() {
            match Parameter::read_record(&bytes[offset..]) {
                Ok((parameter, consumed)) => {
                    message.push(parameter);
                    offset += consumed;
                }
                Err(err) => {
                    tracing::debug!(offset, %err, "decoding stopped");
                    break;
                }
            }
        }
        message
    }
}

impl FromIterator<Parameter> for Message {
    fn from_iter<T: IntoIterator<Item = Parameter>>(iter: T) -> Self {
        Self {
            parameters: iter.into_iter().collect(),
        }
    }
}

impl Extend<Parameter> for Message {
    fn extend<T: IntoIterator<Item = Parameter>>(&mut self, iter: T) {
        self.parameters.extend(iter);
    }
}

impl TryFrom<&[u8]> for Message {
    type Error = CodecError;

    /// Strict decoding: every byte must belong to a whole record.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if let Some(shout) = Parameter::from_shout(bytes) {
            return Ok(Self {
                parameters: vec![shout],
            });
        }
        let mut message = Self::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let (parameter, consumed) = Parameter::read_record(&bytes[offset..])?;
            message.push(parameter);
            offset += consumed;
        }
        Ok(message)
    }
}
