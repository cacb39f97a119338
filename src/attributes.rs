//! Authenticated attributes of a pkiMessage.
//!
//! The SCEP attributes travel in the signed attributes of the single
//! `SignerInfo`, next to the CMS `contentType`, `messageDigest` and
//! `signingTime` attributes.

use std::time::SystemTime;

use const_oid::ObjectIdentifier;
use der::{
    asn1::{Any, GeneralizedTime, OctetString, SetOfVec, UtcTime},
    Decode, Encode, Tag, Tagged,
};
use x509_cert::{
    attr::{Attribute, Attributes},
    time::Time,
};

use crate::errors::{Error, Result};
use crate::nonce::Nonce;
use crate::status::{FailInfo, MessageType, PkiStatus};
use crate::transaction_id::TransactionId;

/// Attribute type identifiers.
pub mod oid {
    use const_oid::ObjectIdentifier;

    /// `messageType`
    pub const MESSAGE_TYPE: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.2");
    /// `pkiStatus`
    pub const PKI_STATUS: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.3");
    /// `failInfo`
    pub const FAIL_INFO: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.4");
    /// `senderNonce`
    pub const SENDER_NONCE: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.5");
    /// `recipientNonce`
    pub const RECIPIENT_NONCE: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.6");
    /// `transactionID`
    pub const TRANSACTION_ID: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.7");

    /// PKCS#9 `contentType`
    pub const CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
    /// PKCS#9 `messageDigest`
    pub const MESSAGE_DIGEST: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
    /// PKCS#9 `signingTime`
    pub const SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
}

/// The SCEP specific attributes of a pkiMessage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageAttributes {
    /// `transactionID`, always present.
    pub transaction_id: TransactionId,
    /// `messageType`, always present.
    pub message_type: MessageType,
    /// `senderNonce`, always present.
    pub sender_nonce: Nonce,
    /// `recipientNonce`, echoed by responses.
    pub recipient_nonce: Option<Nonce>,
    /// `pkiStatus`, present on responses only.
    pub pki_status: Option<PkiStatus>,
    /// `failInfo`, present when the status is FAILURE.
    pub fail_info: Option<FailInfo>,
}

impl MessageAttributes {
    /// Attributes of a request.
    pub fn request(transaction_id: TransactionId, message_type: MessageType, sender_nonce: Nonce) -> Self {
        MessageAttributes {
            transaction_id,
            message_type,
            sender_nonce,
            recipient_nonce: None,
            pki_status: None,
            fail_info: None,
        }
    }

    /// A message is a request iff it carries no `pkiStatus`.
    pub fn is_request(&self) -> bool {
        self.pki_status.is_none()
    }

    /// Encodes the populated fields as attributes.
    pub fn encode(&self) -> Result<Vec<Attribute>> {
        let mut attrs = vec![
            printable(oid::TRANSACTION_ID, self.transaction_id.as_str())?,
            printable(oid::MESSAGE_TYPE, &self.message_type.code().to_string())?,
            octets(oid::SENDER_NONCE, self.sender_nonce.as_bytes())?,
        ];
        if let Some(nonce) = &self.recipient_nonce {
            attrs.push(octets(oid::RECIPIENT_NONCE, nonce.as_bytes())?);
        }
        if let Some(status) = self.pki_status {
            attrs.push(printable(oid::PKI_STATUS, &status.code().to_string())?);
        }
        if let Some(fail_info) = self.fail_info {
            attrs.push(printable(oid::FAIL_INFO, &fail_info.code().to_string())?);
        }
        Ok(attrs)
    }

    /// Decodes the SCEP attributes out of a signed attribute set.
    pub fn decode(attrs: &Attributes) -> Result<Self> {
        let transaction_id = TransactionId::new(required_printable(attrs, oid::TRANSACTION_ID)?)
            .map_err(|_| Error::InvalidAttribute(oid::TRANSACTION_ID))?;
        let message_type = parse_code(attrs, oid::MESSAGE_TYPE)?
            .ok_or(Error::MissingAttribute(oid::MESSAGE_TYPE))?;
        let sender_nonce = octets_value(attrs, oid::SENDER_NONCE)?
            .ok_or(Error::MissingAttribute(oid::SENDER_NONCE))?;
        let recipient_nonce = octets_value(attrs, oid::RECIPIENT_NONCE)?;
        let pki_status: Option<PkiStatus> = parse_code(attrs, oid::PKI_STATUS)?;
        let fail_info = parse_code(attrs, oid::FAIL_INFO)?;

        if pki_status == Some(PkiStatus::Failure) && fail_info.is_none() {
            return Err(Error::MissingAttribute(oid::FAIL_INFO));
        }

        Ok(MessageAttributes {
            transaction_id,
            message_type,
            sender_nonce: Nonce::new(sender_nonce),
            recipient_nonce: recipient_nonce.map(Nonce::new),
            pki_status,
            fail_info,
        })
    }
}

/// Finds the single value of the attribute `oid`.
///
/// Returns `None` when the attribute is absent, and an error when it occurs
/// more than once or does not carry exactly one value.
pub fn find(attrs: &Attributes, oid: ObjectIdentifier) -> Result<Option<&Any>> {
    let mut matching = attrs.iter().filter(|attr| attr.oid == oid);
    let attr = match matching.next() {
        Some(attr) => attr,
        None => return Ok(None),
    };
    if matching.next().is_some() || attr.values.len() != 1 {
        return Err(Error::InvalidAttribute(oid));
    }
    Ok(attr.values.iter().next())
}

/// `contentType` attribute.
pub(crate) fn content_type(content_type: ObjectIdentifier) -> Result<Attribute> {
    single(oid::CONTENT_TYPE, Any::encode_from(&content_type)?)
}

/// `messageDigest` attribute.
pub(crate) fn message_digest(digest: &[u8]) -> Result<Attribute> {
    octets(oid::MESSAGE_DIGEST, digest)
}

/// `signingTime` attribute, UTCTime through 2049 and GeneralizedTime after.
pub(crate) fn signing_time(time: SystemTime) -> Result<Attribute> {
    let time = match UtcTime::from_system_time(time) {
        Ok(utc) => Time::UtcTime(utc),
        Err(_) => Time::GeneralTime(GeneralizedTime::from_system_time(time)?),
    };
    single(oid::SIGNING_TIME, Any::encode_from(&time)?)
}

/// Value of the `contentType` attribute, if present.
pub(crate) fn decode_content_type(attrs: &Attributes) -> Result<Option<ObjectIdentifier>> {
    match find(attrs, oid::CONTENT_TYPE)? {
        Some(any) => Ok(Some(
            ObjectIdentifier::from_der(&any.to_der()?)
                .map_err(|_| Error::InvalidAttribute(oid::CONTENT_TYPE))?,
        )),
        None => Ok(None),
    }
}

/// Value of the required `messageDigest` attribute.
pub(crate) fn decode_message_digest(attrs: &Attributes) -> Result<Vec<u8>> {
    octets_value(attrs, oid::MESSAGE_DIGEST)?.ok_or(Error::MissingAttribute(oid::MESSAGE_DIGEST))
}

/// Value of the `signingTime` attribute, if present.
pub fn decode_signing_time(attrs: &Attributes) -> Result<Option<SystemTime>> {
    match find(attrs, oid::SIGNING_TIME)? {
        Some(any) => {
            let time = Time::from_der(&any.to_der()?)
                .map_err(|_| Error::InvalidAttribute(oid::SIGNING_TIME))?;
            Ok(Some(time.to_system_time()))
        }
        None => Ok(None),
    }
}

fn single(oid: ObjectIdentifier, value: Any) -> Result<Attribute> {
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

fn printable(oid: ObjectIdentifier, value: &str) -> Result<Attribute> {
    single(oid, Any::new(Tag::PrintableString, value.as_bytes())?)
}

fn octets(oid: ObjectIdentifier, value: &[u8]) -> Result<Attribute> {
    single(oid, Any::encode_from(&OctetString::new(value)?)?)
}

fn printable_value(attrs: &Attributes, oid: ObjectIdentifier) -> Result<Option<&str>> {
    match find(attrs, oid)? {
        Some(any) if any.tag() == Tag::PrintableString => core::str::from_utf8(any.value())
            .map(Some)
            .map_err(|_| Error::InvalidAttribute(oid)),
        Some(_) => Err(Error::InvalidAttribute(oid)),
        None => Ok(None),
    }
}

fn required_printable(attrs: &Attributes, oid: ObjectIdentifier) -> Result<&str> {
    printable_value(attrs, oid)?.ok_or(Error::MissingAttribute(oid))
}

fn octets_value(attrs: &Attributes, oid: ObjectIdentifier) -> Result<Option<Vec<u8>>> {
    match find(attrs, oid)? {
        Some(any) if any.tag() == Tag::OctetString => Ok(Some(any.value().to_vec())),
        Some(_) => Err(Error::InvalidAttribute(oid)),
        None => Ok(None),
    }
}

fn parse_code<T: core::str::FromStr>(
    attrs: &Attributes,
    oid: ObjectIdentifier,
) -> Result<Option<T>> {
    match printable_value(attrs, oid)? {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidAttribute(oid)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn attribute_set(attrs: Vec<Attribute>) -> Attributes {
        SetOfVec::try_from(attrs).unwrap()
    }

    fn response(status: PkiStatus, fail_info: Option<FailInfo>) -> MessageAttributes {
        MessageAttributes {
            transaction_id: TransactionId::new("0123abcd").unwrap(),
            message_type: MessageType::CertRep,
            sender_nonce: Nonce::new(hex!("101112131415161718191a1b1c1d1e1f")),
            recipient_nonce: Some(Nonce::new(hex!("000102030405060708090a0b0c0d0e0f"))),
            pki_status: Some(status),
            fail_info,
        }
    }

    #[test]
    fn request_attributes() {
        let attrs = MessageAttributes::request(
            TransactionId::new("0123abcd").unwrap(),
            MessageType::PkcsReq,
            Nonce::new(hex!("000102030405060708090a0b0c0d0e0f")),
        );
        let encoded = attrs.encode().unwrap();
        assert_eq!(encoded.len(), 3);

        let decoded = MessageAttributes::decode(&attribute_set(encoded)).unwrap();
        assert_eq!(decoded, attrs);
        assert!(decoded.is_request());
    }

    #[test]
    fn wire_encoding() {
        let attr = printable(oid::MESSAGE_TYPE, "19").unwrap();
        let value = attr.values.iter().next().unwrap();
        assert_eq!(value.to_der().unwrap(), hex!("13023139"));

        let attr = octets(oid::SENDER_NONCE, &hex!("0a0b")).unwrap();
        let value = attr.values.iter().next().unwrap();
        assert_eq!(value.to_der().unwrap(), hex!("04020a0b"));
    }

    #[test]
    fn failure_requires_fail_info() {
        let attrs = response(PkiStatus::Failure, None).encode().unwrap();
        assert!(matches!(
            MessageAttributes::decode(&attribute_set(attrs)),
            Err(Error::MissingAttribute(oid::FAIL_INFO))
        ));

        let attrs = response(PkiStatus::Failure, Some(FailInfo::BadCertId))
            .encode()
            .unwrap();
        let decoded = MessageAttributes::decode(&attribute_set(attrs)).unwrap();
        assert_eq!(decoded.fail_info, Some(FailInfo::BadCertId));
        assert!(!decoded.is_request());
    }

    #[test]
    fn missing_required() {
        let mut attrs = response(PkiStatus::Pending, None).encode().unwrap();
        attrs.retain(|attr| attr.oid != oid::SENDER_NONCE);
        assert!(matches!(
            MessageAttributes::decode(&attribute_set(attrs)),
            Err(Error::MissingAttribute(oid::SENDER_NONCE))
        ));
    }

    #[test]
    fn invalid_values() {
        let mut attrs = response(PkiStatus::Success, None).encode().unwrap();
        attrs.retain(|attr| attr.oid != oid::PKI_STATUS);
        attrs.push(printable(oid::PKI_STATUS, "1").unwrap());
        assert!(matches!(
            MessageAttributes::decode(&attribute_set(attrs)),
            Err(Error::InvalidAttribute(oid::PKI_STATUS))
        ));

        let mut attrs = response(PkiStatus::Success, None).encode().unwrap();
        attrs.retain(|attr| attr.oid != oid::SENDER_NONCE);
        attrs.push(printable(oid::SENDER_NONCE, "nonce").unwrap());
        assert!(matches!(
            MessageAttributes::decode(&attribute_set(attrs)),
            Err(Error::InvalidAttribute(oid::SENDER_NONCE))
        ));
    }

    #[test]
    fn multi_valued_attribute() {
        let values = SetOfVec::try_from(vec![
            Any::new(Tag::PrintableString, "3".as_bytes()).unwrap(),
            Any::new(Tag::PrintableString, "19".as_bytes()).unwrap(),
        ])
        .unwrap();
        let attrs = attribute_set(vec![Attribute {
            oid: oid::MESSAGE_TYPE,
            values,
        }]);
        assert!(matches!(
            find(&attrs, oid::MESSAGE_TYPE),
            Err(Error::InvalidAttribute(oid::MESSAGE_TYPE))
        ));
        assert!(find(&attrs, oid::PKI_STATUS).unwrap().is_none());
    }

    #[test]
    fn cms_attributes() {
        let now = SystemTime::now();
        let attrs = attribute_set(vec![
            content_type(oid::TRANSACTION_ID).unwrap(),
            message_digest(&hex!("00ff")).unwrap(),
            signing_time(now).unwrap(),
        ]);
        assert_eq!(decode_content_type(&attrs).unwrap(), Some(oid::TRANSACTION_ID));
        assert_eq!(decode_message_digest(&attrs).unwrap(), hex!("00ff"));

        let time = find(&attrs, oid::SIGNING_TIME).unwrap().unwrap();
        assert_eq!(time.tag(), Tag::UtcTime);
        let decoded = decode_signing_time(&attrs).unwrap().unwrap();
        let skew = now.duration_since(decoded).unwrap();
        assert!(skew.as_secs() < 2);
    }
}
