//! Inbound query checks.
//!
//! The JSON API answers exactly one recursive IN question per request and never
//! returns RRSIGs, so anything outside that feature set is refused up front.

use hickory_proto::op::{Message, Query};
use hickory_proto::rr::DNSClass;
use tracing::warn;

use crate::error::RejectReason;

/// Check a request and return its single question.
///
/// Rules are applied in order and the first match wins.
pub fn validate(request: &Message) -> Result<&Query, RejectReason> {
    let reason = match request.queries() {
        [] => RejectReason::NoQuestion,
        [question] => match check_question(request, question) {
            Ok(()) => return Ok(question),
            Err(reason) => reason,
        },
        many => RejectReason::MultipleQuestions(many.len()),
    };

    warn!(id = request.id(), %reason, "rejecting DNS request");
    Err(reason)
}

fn check_question(request: &Message, question: &Query) -> Result<(), RejectReason> {
    if !request.recursion_desired() {
        return Err(RejectReason::RecursionNotDesired);
    }

    if request
        .extensions()
        .as_ref()
        .is_some_and(|edns| edns.dnssec_ok())
    {
        return Err(RejectReason::DnssecRequested);
    }

    if question.query_class() != DNSClass::IN {
        return Err(RejectReason::UnsupportedClass(question.query_class().into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Edns;
    use hickory_proto::rr::{Name, RecordType};
    use std::str::FromStr;

    fn question(name: &str) -> Query {
        Query::query(Name::from_str(name).unwrap(), RecordType::A)
    }

    fn request(questions: &[&str]) -> Message {
        let mut msg = Message::new();
        msg.set_id(7);
        msg.set_recursion_desired(true);
        for name in questions {
            msg.add_query(question(name));
        }
        msg
    }

    fn chaos_request() -> Message {
        let mut q = question("version.bind.");
        q.set_query_class(DNSClass::CH);
        let mut msg = Message::new();
        msg.set_recursion_desired(true);
        msg.add_query(q);
        msg
    }

    #[test]
    fn accepts_single_recursive_in_question() {
        let msg = request(&["example.com."]);

        let q = validate(&msg).unwrap();

        assert_eq!(q.name().to_ascii(), "example.com.");
        assert_eq!(q.query_type(), RecordType::A);
    }

    #[test]
    fn multiple_questions_not_implemented() {
        let msg = request(&["a.example.", "b.example."]);

        assert_eq!(validate(&msg), Err(RejectReason::MultipleQuestions(2)));
    }

    #[test]
    fn no_question_is_format_error() {
        let msg = request(&[]);

        let reason = validate(&msg).unwrap_err();

        assert_eq!(reason, RejectReason::NoQuestion);
        assert_eq!(
            reason.response_code(),
            hickory_proto::op::ResponseCode::FormErr
        );
    }

    #[test]
    fn question_count_checked_before_recursion_flag() {
        let mut msg = request(&["a.example.", "b.example."]);
        msg.set_recursion_desired(false);

        assert_eq!(validate(&msg), Err(RejectReason::MultipleQuestions(2)));
    }

    #[test]
    fn non_recursive_query_rejected_regardless_of_other_fields() {
        let mut msg = chaos_request();
        msg.set_recursion_desired(false);
        let mut edns = Edns::new();
        edns.set_dnssec_ok(true);
        msg.set_edns(edns);

        assert_eq!(validate(&msg), Err(RejectReason::RecursionNotDesired));
    }

    #[test]
    fn dnssec_ok_bit_rejected() {
        let mut msg = request(&["example.com."]);
        let mut edns = Edns::new();
        edns.set_dnssec_ok(true);
        msg.set_edns(edns);

        assert_eq!(validate(&msg), Err(RejectReason::DnssecRequested));
    }

    #[test]
    fn edns_without_dnssec_ok_accepted() {
        let mut msg = request(&["example.com."]);
        msg.set_edns(Edns::new());

        assert!(validate(&msg).is_ok());
    }

    #[test]
    fn non_in_class_is_server_failure() {
        let msg = chaos_request();

        assert_eq!(validate(&msg), Err(RejectReason::UnsupportedClass(3)));
    }
}
