//! SCEP protocol codes: `messageType`, `pkiStatus` and `failInfo`.
//!
//! All three travel as the decimal representation of their code inside a
//! PrintableString attribute value.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// The `messageType` of a pkiMessage.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MessageType {
    /// Response to any request (3).
    CertRep,
    /// Certificate enrollment request (19).
    PkcsReq,
    /// Poll for a pending enrollment (20).
    GetCertInitial,
    /// Retrieve a certificate by issuer and serial (21).
    GetCert,
    /// Retrieve a CRL (22).
    GetCrl,
}

impl MessageType {
    /// Wire code of this message type.
    pub const fn code(self) -> u8 {
        match self {
            MessageType::CertRep => 3,
            MessageType::PkcsReq => 19,
            MessageType::GetCertInitial => 20,
            MessageType::GetCert => 21,
            MessageType::GetCrl => 22,
        }
    }

    /// Every message type other than `CertRep` is sent by the requester.
    pub const fn is_request(self) -> bool {
        !matches!(self, MessageType::CertRep)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            3 => Ok(MessageType::CertRep),
            19 => Ok(MessageType::PkcsReq),
            20 => Ok(MessageType::GetCertInitial),
            21 => Ok(MessageType::GetCert),
            22 => Ok(MessageType::GetCrl),
            _ => Err(invalid("messageType", code)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageType::CertRep => "CertRep",
            MessageType::PkcsReq => "PKCSReq",
            MessageType::GetCertInitial => "GetCertInitial",
            MessageType::GetCert => "GetCert",
            MessageType::GetCrl => "GetCRL",
        })
    }
}

/// The `pkiStatus` of a `CertRep`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PkiStatus {
    /// Request granted (0).
    Success,
    /// Request rejected (2).
    Failure,
    /// Request awaits manual approval (3).
    Pending,
}

impl PkiStatus {
    /// Wire code of this status.
    pub const fn code(self) -> u8 {
        match self {
            PkiStatus::Success => 0,
            PkiStatus::Failure => 2,
            PkiStatus::Pending => 3,
        }
    }
}

impl TryFrom<u8> for PkiStatus {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(PkiStatus::Success),
            2 => Ok(PkiStatus::Failure),
            3 => Ok(PkiStatus::Pending),
            _ => Err(invalid("pkiStatus", code)),
        }
    }
}

impl fmt::Display for PkiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PkiStatus::Success => "SUCCESS",
            PkiStatus::Failure => "FAILURE",
            PkiStatus::Pending => "PENDING",
        })
    }
}

/// The `failInfo` of a FAILURE `CertRep`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FailInfo {
    /// Unrecognized or unsupported algorithm identifier (0).
    BadAlg,
    /// Integrity check failed (1).
    BadMessageCheck,
    /// Transaction not permitted or supported (2).
    BadRequest,
    /// The signingTime attribute was not sufficiently close to the system time (3).
    BadTime,
    /// No certificate could be identified matching the provided criteria (4).
    BadCertId,
}

impl FailInfo {
    /// Wire code of this failure reason.
    pub const fn code(self) -> u8 {
        match self {
            FailInfo::BadAlg => 0,
            FailInfo::BadMessageCheck => 1,
            FailInfo::BadRequest => 2,
            FailInfo::BadTime => 3,
            FailInfo::BadCertId => 4,
        }
    }
}

impl TryFrom<u8> for FailInfo {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(FailInfo::BadAlg),
            1 => Ok(FailInfo::BadMessageCheck),
            2 => Ok(FailInfo::BadRequest),
            3 => Ok(FailInfo::BadTime),
            4 => Ok(FailInfo::BadCertId),
            _ => Err(invalid("failInfo", code)),
        }
    }
}

impl fmt::Display for FailInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailInfo::BadAlg => "badAlg",
            FailInfo::BadMessageCheck => "badMessageCheck",
            FailInfo::BadRequest => "badRequest",
            FailInfo::BadTime => "badTime",
            FailInfo::BadCertId => "badCertId",
        })
    }
}

/// Parses the decimal wire form of a code.
impl FromStr for MessageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(parse_decimal("messageType", s)?)
    }
}

impl FromStr for PkiStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(parse_decimal("pkiStatus", s)?)
    }
}

impl FromStr for FailInfo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(parse_decimal("failInfo", s)?)
    }
}

fn parse_decimal(kind: &'static str, s: &str) -> Result<u8> {
    // u8::from_str accepts a leading '+', the wire form never carries one
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidCode {
            kind,
            value: s.into(),
        });
    }
    s.parse().map_err(|_| Error::InvalidCode {
        kind,
        value: s.into(),
    })
}

fn invalid(kind: &'static str, code: u8) -> Error {
    Error::InvalidCode {
        kind,
        value: code.to_string(),
    }
}
