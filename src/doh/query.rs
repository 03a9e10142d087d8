//! DoH query string construction.

use hickory_proto::op::Query;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::RelayConfig;

/// Subnet sent when EDNS client subnet is disabled.
pub const NO_CLIENT_SUBNET: &str = "0.0.0.0/0";

/// Characters left as-is in the `name` parameter.
const NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// One JSON API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DohQuery {
    pub name: String,
    pub record_type: u16,
    pub checking_disabled: bool,
    pub edns_client_subnet: Option<String>,
}

impl DohQuery {
    /// Derive the request for `question`.
    ///
    /// `request_cd` is the CD flag of the inbound message; when set it wins over
    /// the configured default.
    pub fn new(question: &Query, config: &RelayConfig, request_cd: bool) -> Self {
        Self {
            name: question.name().to_ascii(),
            record_type: question.query_type().into(),
            checking_disabled: request_cd || config.checking_disabled,
            edns_client_subnet: config.edns_disable.then(|| NO_CLIENT_SUBNET.to_string()),
        }
    }

    /// Render as `name=..&type=..[&cd=true][&edns_client_subnet=..]`.
    ///
    /// Field order is fixed.
    pub fn to_query_string(&self) -> String {
        let mut qs = format!(
            "name={}&type={}",
            utf8_percent_encode(&self.name, NAME_ENCODE_SET),
            self.record_type
        );
        if self.checking_disabled {
            qs.push_str("&cd=true");
        }
        if let Some(subnet) = &self.edns_client_subnet {
            qs.push_str("&edns_client_subnet=");
            qs.push_str(subnet);
        }
        qs
    }
}

/// Build the query string for `question` under `config`.
pub fn encode(question: &Query, config: &RelayConfig, request_cd: bool) -> String {
    DohQuery::new(question, config, request_cd).to_query_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::domain::Label;
    use hickory_proto::rr::{Name, RecordType};
    use std::str::FromStr;

    fn question(name: &str, rtype: RecordType) -> Query {
        Query::query(Name::from_str(name).unwrap(), rtype)
    }

    #[test]
    fn plain_query_has_name_and_type_only() {
        let q = question("example.com.", RecordType::A);

        assert_eq!(
            encode(&q, &RelayConfig::default(), false),
            "name=example.com.&type=1"
        );
    }

    #[test]
    fn type_is_decimal() {
        let q = question("example.com.", RecordType::AAAA);

        assert_eq!(
            encode(&q, &RelayConfig::default(), false),
            "name=example.com.&type=28"
        );
    }

    #[test]
    fn all_fields_in_fixed_order() {
        let config = RelayConfig {
            checking_disabled: true,
            edns_disable: true,
            ..RelayConfig::default()
        };
        let q = question("example.com.", RecordType::MX);

        assert_eq!(
            encode(&q, &config, false),
            "name=example.com.&type=15&cd=true&edns_client_subnet=0.0.0.0/0"
        );
    }

    #[test]
    fn request_cd_flag_overrides_config_default() {
        let q = question("example.com.", RecordType::A);

        assert_eq!(
            encode(&q, &RelayConfig::default(), true),
            "name=example.com.&type=1&cd=true"
        );
    }

    #[test]
    fn edns_disable_without_cd() {
        let config = RelayConfig {
            edns_disable: true,
            ..RelayConfig::default()
        };
        let q = question("example.com.", RecordType::A);

        let query = DohQuery::new(&q, &config, false);

        assert!(!query.checking_disabled);
        assert_eq!(query.edns_client_subnet.as_deref(), Some("0.0.0.0/0"));
        assert_eq!(
            query.to_query_string(),
            "name=example.com.&type=1&edns_client_subnet=0.0.0.0/0"
        );
    }

    #[test]
    fn encoding_is_deterministic() {
        let q = question("www.example.org.", RecordType::TXT);
        let config = RelayConfig::default();

        assert_eq!(encode(&q, &config, true), encode(&q, &config, true));
    }

    #[test]
    fn query_syntax_characters_are_escaped() {
        let name = Name::from_labels(vec![
            Label::from_raw_bytes(b"a&b=c").unwrap(),
            Label::from_ascii("example").unwrap(),
        ])
        .unwrap();
        let q = Query::query(name, RecordType::A);

        let qs = encode(&q, &RelayConfig::default(), false);

        assert!(qs.starts_with("name=a"));
        assert!(qs.ends_with(".example.&type=1"));
        assert_eq!(qs.split('&').count(), 2);
        assert_eq!(qs.matches('=').count(), 2);
    }
}
