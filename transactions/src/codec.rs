//! Binary forms of a transaction.
//!
//! Wire layout: `type code (u8) | header | body | signature (64 bytes)`, with
//! header and body bincode-encoded. The signing bytes are everything before
//! the signature. The record form kept by the repository appends the undo
//! state so that a confirmed transaction can be orphaned after a restart.

use cairn_types::{ApprovalStatus, Signature, TransactionType};

use crate::{ReferenceUndo, Transaction, TransactionError, TxBody, TxHeader, UndoState};

const SIGNATURE_LEN: usize = 64;

impl Transaction {
    /// Bytes covered by the signature.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        encode_unsigned(&self.header, &self.body)
    }

    /// Proof-of-work pre-image: the signing bytes with the nonce zeroed.
    pub fn pow_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut body = self.body.clone();
        body.set_nonce(0);
        encode_unsigned(&self.header, &body)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut out = self.signing_bytes()?;
        out.extend_from_slice(self.signature.as_bytes());
        Ok(out)
    }

    /// Length of the wire form, which prices the standard fee.
    pub fn encoded_len(&self) -> Result<usize, TransactionError> {
        Ok(self.signing_bytes()?.len() + SIGNATURE_LEN)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (&code, mut rest) = bytes
            .split_first()
            .ok_or_else(|| TransactionError::Malformed("empty input".into()))?;
        let tx_type = TransactionType::from_code(code)
            .map_err(|e| TransactionError::Malformed(e.to_string()))?;
        if !tx_type.is_released() {
            return Err(TransactionError::UnsupportedType(tx_type));
        }

        let header: TxHeader = bincode::deserialize_from(&mut rest)?;
        let body = TxBody::decode_from(tx_type, &mut rest)?;

        if rest.len() != SIGNATURE_LEN {
            return Err(TransactionError::Malformed(format!(
                "expected {SIGNATURE_LEN} signature bytes, found {}",
                rest.len()
            )));
        }
        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(rest);

        Ok(Self {
            header,
            body,
            signature: Signature(signature),
            approval_status: ApprovalStatus::NotRequired,
            undo: None,
            reference_undo: None,
        })
    }

    /// Repository payload: wire bytes plus any captured undo state.
    pub fn to_record(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(bincode::serialize(&(
            self.to_bytes()?,
            &self.undo,
            &self.reference_undo,
        ))?)
    }

    pub fn from_record(record: &[u8]) -> Result<Self, TransactionError> {
        let (bytes, undo, reference_undo): (Vec<u8>, Option<UndoState>, Option<ReferenceUndo>) =
            bincode::deserialize(record)?;
        let mut tx = Self::from_bytes(&bytes)?;
        tx.undo = undo;
        tx.reference_undo = reference_undo;
        Ok(tx)
    }
}

fn encode_unsigned(header: &TxHeader, body: &TxBody) -> Result<Vec<u8>, TransactionError> {
    let mut out = vec![body.tx_type().code()];
    bincode::serialize_into(&mut out, header)?;
    body.encode_into(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::PaymentBody;
    use cairn_types::{Address, Amount, PublicKey, Timestamp, NO_GROUP};

    fn payment() -> Transaction {
        let mut tx = Transaction::new(
            TxHeader {
                timestamp: Timestamp::from_millis(1_700_000_000_000),
                tx_group_id: NO_GROUP,
                reference: Some(Signature([7u8; 64])),
                creator: PublicKey([1u8; 32]),
                fee: Amount::new(100_000),
            },
            TxBody::Payment(PaymentBody {
                recipient: Address::new("cairn_recipient"),
                amount: Amount::whole(5),
            }),
        );
        tx.signature = Signature([9u8; 64]);
        tx
    }

    #[test]
    fn wire_form_starts_with_type_code_and_ends_with_signature() {
        let tx = payment();
        let bytes = tx.to_bytes().unwrap();
        assert_eq!(bytes[0], TransactionType::Payment.code());
        assert_eq!(&bytes[bytes.len() - SIGNATURE_LEN..], &[9u8; 64][..]);
        assert_eq!(bytes.len(), tx.encoded_len().unwrap());
    }

    #[test]
    fn decode_restores_the_transaction() {
        let tx = payment();
        let decoded = Transaction::from_bytes(&tx.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = payment().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            Transaction::from_bytes(&bytes),
            Err(TransactionError::Malformed(_))
        ));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = payment().to_bytes().unwrap();
        assert!(Transaction::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(Transaction::from_bytes(&[]).is_err());
    }

    #[test]
    fn unreleased_types_do_not_decode() {
        for tx_type in [
            TransactionType::Airdrop,
            TransactionType::EnableForging,
            TransactionType::TransferPrivs,
        ] {
            let bytes = vec![tx_type.code(), 0, 0, 0];
            assert!(matches!(
                Transaction::from_bytes(&bytes),
                Err(TransactionError::UnsupportedType(t)) if t == tx_type
            ));
        }
    }

    #[test]
    fn unknown_type_code_is_malformed() {
        assert!(matches!(
            Transaction::from_bytes(&[200, 0, 0]),
            Err(TransactionError::Malformed(_))
        ));
    }

    #[test]
    fn record_carries_undo_state() {
        let mut tx = payment();
        tx.undo = Some(UndoState::Vote(Some(2)));
        tx.reference_undo = Some(ReferenceUndo { previous: None });
        let decoded = Transaction::from_record(&tx.to_record().unwrap()).unwrap();
        assert_eq!(decoded.undo, Some(UndoState::Vote(Some(2))));
        assert_eq!(decoded.reference_undo, Some(ReferenceUndo { previous: None }));
        assert_eq!(decoded.signature, tx.signature);
    }
}
