//! The client side transaction state machine.
//!
//! ```text
//!            perform_operation
//!   New ───────────────────────▶ AwaitingResponse ──┬─ SUCCESS ─▶ Issued
//!    ▲                                │             ├─ FAILURE ─▶ Failed
//!    └──────── transport error ───────┤             └─ PENDING ─▶ Pending ─┐
//!                                     └─ integrity or decoding error        │
//!                                                    ▼                      │
//!                                                 Aborted      poll() ◀─────┘
//! ```

use rand_core::{CryptoRngCore, OsRng};
use tracing::{debug, warn};
use x509_cert::{
    crl::CertificateList, name::Name, request::CertReq, serial_number::SerialNumber, Certificate,
};

use crate::attributes::oid;
use crate::config::TransactionConfig;
use crate::degenerate::CertStore;
use crate::errors::{Error, Result};
use crate::identity::{self, Identity};
use crate::message::{MessageDecoder, MessageEncoder, PkiMessage};
use crate::nonce::Nonce;
use crate::operation::PkiOperation;
use crate::replay::SharedReplayCache;
use crate::status::{FailInfo, MessageType, PkiStatus};
use crate::transaction_id::TransactionId;
use crate::transport::Transport;

/// State of a [`Transaction`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum State {
    /// No request has been sent.
    New,
    /// A request is in flight.
    AwaitingResponse,
    /// The CA answered SUCCESS; certificates or CRLs are available.
    Issued,
    /// The CA deferred the request; a [`PollTask`] is available.
    Pending,
    /// The CA answered FAILURE; the reason is available.
    Failed,
    /// A response failed validation or decoding; the transaction is unusable.
    Aborted,
}

/// Continuation of a pending enrollment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollTask {
    transaction_id: TransactionId,
    issuer: Name,
    subject: Name,
    recipient_nonce: Nonce,
}

impl PollTask {
    /// The transaction id the poll must reuse.
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Name of the issuing CA.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Subject of the pending request.
    pub fn subject(&self) -> &Name {
        &self.subject
    }

    /// Sender nonce of the PENDING response, sent back as the poll's
    /// `recipientNonce`.
    pub fn recipient_nonce(&self) -> &Nonce {
        &self.recipient_nonce
    }

    /// The GetCertInitial operation polling for this request.
    pub fn operation(&self) -> PkiOperation {
        PkiOperation::get_cert_initial(self.issuer.clone(), self.subject.clone())
    }
}

#[derive(Clone, Debug)]
enum Outcome {
    Issued(CertStore),
    Pending(PollTask),
    Failed(FailInfo),
}

/// One SCEP transaction between a requester and a CA.
///
/// A transaction sends operations through its [`Transport`] and validates each
/// response against the request: the transaction id must match, the
/// recipient nonce must echo the sender nonce, and the response nonce must not
/// have been seen by any transaction sharing the same [`SharedReplayCache`].
pub struct Transaction<T> {
    transport: T,
    identity: Identity,
    recipient: Certificate,
    replay_cache: SharedReplayCache,
    config: TransactionConfig,
    transaction_id: Option<TransactionId>,
    sender_nonce: Option<Nonce>,
    state: State,
    outcome: Option<Outcome>,
}

impl<T: Transport> Transaction<T> {
    /// Creates a transaction signing as `identity` and addressing `recipient`,
    /// the CA or RA certificate.
    pub fn new(
        transport: T,
        identity: Identity,
        recipient: Certificate,
        replay_cache: SharedReplayCache,
    ) -> Self {
        Transaction {
            transport,
            identity,
            recipient,
            replay_cache,
            config: TransactionConfig::default(),
            transaction_id: None,
            sender_nonce: None,
            state: State::New,
            outcome: None,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: TransactionConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `transaction_id` instead of deriving or generating one, for
    /// example to resume polling for an enrollment sent earlier.
    pub fn with_transaction_id(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The transaction id, once one has been assigned.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    /// The configuration in use.
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Enrolls `csr`. The transaction id is derived from the request's public
    /// key unless one was set explicitly.
    pub fn enroll(&mut self, csr: CertReq) -> Result<State> {
        if self.state != State::New {
            return Err(Error::IllegalState(self.state));
        }
        self.perform_operation(PkiOperation::PkcsReq(csr))
    }

    /// Sends the GetCertInitial poll for a pending enrollment.
    pub fn poll(&mut self) -> Result<State> {
        let operation = self.task()?.operation();
        self.perform_operation(operation)
    }

    /// Fetches the certificate with `serial_number` issued by the recipient's
    /// issuer.
    pub fn get_certificate(&mut self, serial_number: SerialNumber) -> Result<Vec<Certificate>> {
        let issuer = self.recipient.tbs_certificate.issuer.clone();
        match self.perform_operation(PkiOperation::get_cert(issuer, serial_number))? {
            State::Issued => Ok(self.certificates()?.to_vec()),
            _ => Err(Error::OperationFailed(self.failure_reason()?)),
        }
    }

    /// Fetches the CRL covering the recipient certificate.
    pub fn get_crl(&mut self) -> Result<Vec<CertificateList>> {
        let tbs = &self.recipient.tbs_certificate;
        let operation = PkiOperation::get_crl(tbs.issuer.clone(), tbs.serial_number.clone());
        match self.perform_operation(operation)? {
            State::Issued => Ok(self.crls()?.to_vec()),
            _ => Err(Error::OperationFailed(self.failure_reason()?)),
        }
    }

    /// Sends `operation` and applies the CA's answer, using the operating
    /// system's random number generator.
    pub fn perform_operation(&mut self, operation: PkiOperation) -> Result<State> {
        self.perform_operation_with_rng(&mut OsRng, operation)
    }

    /// Sends `operation` and applies the CA's answer.
    ///
    /// Allowed in [`State::New`], and in [`State::Pending`] for the poll.
    pub fn perform_operation_with_rng<R: CryptoRngCore>(
        &mut self,
        rng: &mut R,
        operation: PkiOperation,
    ) -> Result<State> {
        match (self.state, &operation) {
            (State::New, _) | (State::Pending, PkiOperation::GetCertInitial(_)) => {}
            (state, _) => return Err(Error::IllegalState(state)),
        }

        let transaction_id = match &self.transaction_id {
            Some(id) => id.clone(),
            None => {
                let id = match &operation {
                    PkiOperation::PkcsReq(csr) => {
                        TransactionId::from_public_key(&csr.info.public_key, self.config.digest)?
                    }
                    _ => TransactionId::generate(rng),
                };
                self.transaction_id = Some(id.clone());
                id
            }
        };

        let sender_nonce = Nonce::generate_with_len(rng, self.config.nonce_len);
        let mut request =
            PkiMessage::request(transaction_id.clone(), sender_nonce.clone(), &operation)?;
        if let Some(Outcome::Pending(task)) = &self.outcome {
            request.attributes.recipient_nonce = Some(task.recipient_nonce.clone());
        }
        let encoded = MessageEncoder::new(&self.identity, &self.recipient)
            .with_digest(self.config.digest)
            .with_cipher(self.config.cipher)
            .encode(rng, &request)?;

        let previous = self.state;
        self.state = State::AwaitingResponse;
        self.sender_nonce = Some(sender_nonce);
        debug!(
            %transaction_id,
            message_type = %operation.message_type(),
            "sending request"
        );

        let response = match self.transport.send(&encoded) {
            Ok(response) => response,
            Err(err) => {
                warn!(%transaction_id, error = %err, "transport failed");
                self.state = previous;
                return Err(Error::Transport(err));
            }
        };

        match self.apply_response(&transaction_id, &operation, &response) {
            Ok(state) => {
                debug!(%transaction_id, ?state, "transaction updated");
                Ok(state)
            }
            Err(err) => {
                warn!(%transaction_id, error = %err, "aborting transaction");
                self.state = State::Aborted;
                self.outcome = None;
                Err(err)
            }
        }
    }

    /// Certificates of an issued transaction.
    pub fn certificates(&self) -> Result<&[Certificate]> {
        match &self.outcome {
            Some(Outcome::Issued(store)) => Ok(&store.certificates),
            _ => Err(Error::IllegalState(self.state)),
        }
    }

    /// CRLs of an issued transaction.
    pub fn crls(&self) -> Result<&[CertificateList]> {
        match &self.outcome {
            Some(Outcome::Issued(store)) => Ok(&store.crls),
            _ => Err(Error::IllegalState(self.state)),
        }
    }

    /// Reason of a failed transaction.
    pub fn failure_reason(&self) -> Result<FailInfo> {
        match &self.outcome {
            Some(Outcome::Failed(fail_info)) => Ok(*fail_info),
            _ => Err(Error::IllegalState(self.state)),
        }
    }

    /// Continuation of a pending transaction.
    pub fn task(&self) -> Result<&PollTask> {
        match &self.outcome {
            Some(Outcome::Pending(task)) => Ok(task),
            _ => Err(Error::IllegalState(self.state)),
        }
    }

    fn apply_response(
        &mut self,
        transaction_id: &TransactionId,
        operation: &PkiOperation,
        response: &[u8],
    ) -> Result<State> {
        let (response, signer) = MessageDecoder::new(self.identity.private_key())
            .verify_signatures(self.config.verify_signatures)
            .decode_signed(response)?;
        if self.config.verify_signatures {
            self.check_signer(&signer)?;
        }
        self.validate(transaction_id, &response)?;

        if response.message_type() != MessageType::CertRep {
            return Err(Error::UnexpectedMessageType(response.message_type()));
        }
        let status = response
            .pki_status()
            .ok_or(Error::MissingAttribute(oid::PKI_STATUS))?;

        let (state, outcome) = match status {
            PkiStatus::Success => (State::Issued, Outcome::Issued(response.cert_store()?)),
            PkiStatus::Failure => {
                let fail_info = response
                    .fail_info()
                    .ok_or(Error::MissingAttribute(oid::FAIL_INFO))?;
                (State::Failed, Outcome::Failed(fail_info))
            }
            PkiStatus::Pending => {
                if !operation.is_delayable() {
                    return Err(Error::UnexpectedPending(operation.message_type()));
                }
                let task = self.poll_task(
                    transaction_id.clone(),
                    operation,
                    response.sender_nonce().clone(),
                );
                (State::Pending, Outcome::Pending(task))
            }
        };

        self.state = state;
        self.outcome = Some(outcome);
        Ok(state)
    }

    /// Accepts the recipient certificate itself, or a certificate it issued
    /// to a registration authority.
    fn check_signer(&self, signer: &Certificate) -> Result<()> {
        if *signer == self.recipient || identity::verify_issued_by(signer, &self.recipient).is_ok()
        {
            return Ok(());
        }
        warn!(
            signer = %signer.tbs_certificate.subject,
            "response not signed by the recipient"
        );
        Err(Error::UnexpectedSigner)
    }

    /// Checks the transaction id, the nonce echo and replay, in that order.
    fn validate(&self, expected: &TransactionId, response: &PkiMessage) -> Result<()> {
        if response.transaction_id() != expected {
            return Err(Error::TransactionIdMismatch {
                expected: expected.clone(),
                found: response.transaction_id().clone(),
            });
        }
        match (response.recipient_nonce(), &self.sender_nonce) {
            (Some(echoed), Some(sent)) if echoed == sent => {}
            _ => return Err(Error::NonceMismatch),
        }
        self.replay_cache.check_and_insert(response.sender_nonce())
    }

    fn poll_task(
        &self,
        transaction_id: TransactionId,
        operation: &PkiOperation,
        recipient_nonce: Nonce,
    ) -> PollTask {
        let subject = match operation {
            PkiOperation::PkcsReq(csr) => csr.info.subject.clone(),
            PkiOperation::GetCertInitial(ias) => ias.subject.clone(),
            _ => self.identity.certificate().tbs_certificate.subject.clone(),
        };
        PollTask {
            transaction_id,
            issuer: self.recipient.tbs_certificate.issuer.clone(),
            subject,
            recipient_nonce,
        }
    }
}
