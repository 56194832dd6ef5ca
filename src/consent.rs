use async_trait::async_trait;
use bytes::Bytes;

/// Result code the host reports when the user accepted the capture dialog.
pub const RESULT_OK: i32 = -1;
/// Result code the host reports when the capture dialog was dismissed.
pub const RESULT_CANCELED: i32 = 0;

/// One-time capture consent token handed out by the host OS.
///
/// The payload is opaque to this crate. It is passed unchanged to the
/// engine, which knows how to turn it into a capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureGrant {
    result_code: i32,
    payload: Bytes,
}

impl CaptureGrant {
    /// Wraps the host's result code and consent payload.
    pub fn new(result_code: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            result_code,
            payload: payload.into(),
        }
    }

    /// Result code the consent dialog returned.
    pub fn result_code(&self) -> i32 {
        self.result_code
    }

    /// Opaque consent token.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// Raw answer of the consent dialog, before it has been judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentResult {
    /// Host result code, [`RESULT_OK`] when accepted
    pub result_code: i32,
    /// Consent token, absent when the dialog returned none
    pub payload: Option<Bytes>,
}

impl ConsentResult {
    /// Builds a result from the raw dialog answer.
    pub fn new(result_code: i32, payload: Option<Bytes>) -> Self {
        Self {
            result_code,
            payload,
        }
    }

    /// An accepted dialog carrying `payload`.
    pub fn granted(payload: impl Into<Bytes>) -> Self {
        Self::new(RESULT_OK, Some(payload.into()))
    }

    /// A dismissed dialog.
    pub fn denied() -> Self {
        Self::new(RESULT_CANCELED, None)
    }

    /// Affirmative only when the dialog was accepted and a payload came back.
    pub fn is_granted(&self) -> bool {
        self.result_code == RESULT_OK && self.payload.is_some()
    }

    /// The grant to record, if the answer was affirmative.
    pub fn into_grant(self) -> Option<CaptureGrant> {
        if self.result_code != RESULT_OK {
            return None;
        }
        self.payload
            .map(|payload| CaptureGrant::new(self.result_code, payload))
    }
}

/// Host flow that asks the user for screen capture consent.
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    /// Shows the consent dialog and resolves once the user answered.
    async fn request_consent(&self) -> ConsentResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_judgement() {
        let granted = ConsentResult::granted(&b"projection"[..]);
        assert!(granted.is_granted());
        let grant = granted.into_grant().unwrap();
        assert_eq!(grant.result_code(), RESULT_OK);
        assert_eq!(&grant.payload()[..], b"projection");

        assert!(!ConsentResult::denied().is_granted());
        assert!(ConsentResult::denied().into_grant().is_none());

        // accepted dialog without payload
        assert!(ConsentResult::new(RESULT_OK, None).into_grant().is_none());
        // payload but cancelled
        let cancelled = ConsentResult::new(RESULT_CANCELED, Some(Bytes::from_static(b"x")));
        assert!(!cancelled.is_granted());
        assert!(cancelled.into_grant().is_none());
    }

    #[test]
    fn test_fixed_consent_provider() {
        use crate::engine::testing::FixedConsent;

        let granted = tokio_test::block_on(FixedConsent::granting().request_consent());
        assert!(granted.is_granted());
        let denied = tokio_test::block_on(FixedConsent::denying().request_consent());
        assert_eq!(denied, ConsentResult::denied());
    }
}
