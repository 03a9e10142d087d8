//! DoH JSON response parsing and reply assembly.

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_proto::serialize::txt::RDataParser;
use serde::Deserialize;

use crate::error::DecodeError;

/// Body returned by a JSON DoH API.
#[derive(Debug, Clone, Deserialize)]
pub struct DohResponse {
    #[serde(rename = "Status")]
    pub status: u16,
    #[serde(rename = "TC", default)]
    pub truncated: bool,
    #[serde(rename = "RD", default)]
    pub recursion_desired: bool,
    #[serde(rename = "RA", default)]
    pub recursion_available: bool,
    #[serde(rename = "AD", default)]
    pub authenticated_data: bool,
    #[serde(rename = "CD", default)]
    pub checking_disabled: bool,
    #[serde(rename = "Question", default)]
    pub question: Vec<DohQuestion>,
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DohAnswer>,
    /// Never copied into the reply.
    #[serde(rename = "Additional", default)]
    pub additional: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DohQuestion {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
}

/// A single answer entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DohAnswer {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
    #[serde(rename = "TTL")]
    pub ttl: u32,
    pub data: String,
}

impl DohAnswer {
    /// Presentation-format line (`name ttl IN TYPE data`).
    pub fn presentation(&self) -> String {
        format!(
            "{} {} IN {} {}",
            self.name,
            self.ttl,
            RecordType::from(self.record_type),
            self.data
        )
    }

    /// Convert to a resource record.
    ///
    /// Owner name and record data go through separate parsers so that neither
    /// can spill into the other's fields.
    pub fn to_record(&self) -> Result<Record, DecodeError> {
        let mut name = Name::from_ascii(&self.name).map_err(|e| DecodeError::InvalidName {
            line: self.presentation(),
            reason: e.to_string(),
        })?;
        name.set_fqdn(true);

        let record_type = RecordType::from(self.record_type);
        let rdata =
            RData::try_from_str(record_type, &self.data).map_err(|e| DecodeError::InvalidRecord {
                line: self.presentation(),
                reason: e.to_string(),
            })?;

        Ok(Record::from_rdata(name, self.ttl, rdata))
    }
}

impl DohResponse {
    /// Build the reply to `request`.
    ///
    /// Fails as a whole if any answer entry is unusable.
    pub fn reply_to(&self, request: &Message) -> Result<Message, DecodeError> {
        let code = reply_code(self.status)?;
        let answers = self
            .answer
            .iter()
            .map(DohAnswer::to_record)
            .collect::<Result<Vec<_>, _>>()?;

        let mut reply = reply(request, code);
        reply.set_recursion_available(true);
        reply.add_answers(answers);
        Ok(reply)
    }
}

/// Parse `body` and build the reply to `request`.
pub fn decode(body: &[u8], request: &Message) -> Result<Message, DecodeError> {
    let response: DohResponse = serde_json::from_slice(body)?;
    response.reply_to(request)
}

/// Map a DoH `Status` to the header reply code.
///
/// Only the 4-bit header range is representable without an OPT record.
pub fn reply_code(status: u16) -> Result<ResponseCode, DecodeError> {
    match status {
        0..=15 => Ok(status.into()),
        other => Err(DecodeError::UnknownStatus(other)),
    }
}

/// Empty reply envelope echoing the request's id, opcode, flags and question.
pub fn reply(request: &Message, code: ResponseCode) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_checking_disabled(request.checking_disabled())
        .set_response_code(code);
    reply.add_queries(request.queries().to_vec());
    reply
}
