//! Send outcome classification

use std::collections::HashSet;

use contracts::{
    BatchSendRequest, BatchSendResponse, ClientError, EntryFailure, QueueError, ServiceError,
};

/// Classified result of one downstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Every entry accepted
    Delivered { accepted: usize },
    /// Call answered, some entries rejected
    PartiallyDelivered {
        accepted: usize,
        rejected: Vec<EntryFailure>,
    },
    /// Request reached the service and was refused
    ServiceRejected(ServiceError),
    /// Request never reliably reached the service
    ClientError(ClientError),
}

/// Failure code recorded for entries the queue answered neither way
pub const MISSING_ENTRY_CODE: &str = "MissingFromResponse";

impl SendOutcome {
    /// Classify a downstream result against the request it answers.
    ///
    /// Only distinct accepted ids that belong to `request` count. Entries
    /// missing from both lists of the response are reported as rejected.
    pub fn classify(result: Result<BatchSendResponse, QueueError>, request: &BatchSendRequest) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(QueueError::ServiceRejected(e)) => return SendOutcome::ServiceRejected(e),
            Err(QueueError::Client(e)) => return SendOutcome::ClientError(e),
        };

        let (accepted, missing) = {
            let sent: HashSet<&str> = request.entries.iter().map(|e| e.id.as_str()).collect();
            let mut answered: HashSet<&str> = response
                .successful
                .iter()
                .map(String::as_str)
                .filter(|id| sent.contains(id))
                .collect();
            let accepted = answered.len();

            answered.extend(response.failed.iter().map(|f| f.id.as_str()));
            let missing: Vec<EntryFailure> = request
                .entries
                .iter()
                .filter(|e| !answered.contains(e.id.as_str()))
                .map(|e| EntryFailure {
                    id: e.id.clone(),
                    code: MISSING_ENTRY_CODE.to_string(),
                    message: "entry absent from queue response".to_string(),
                    sender_fault: false,
                })
                .collect();
            (accepted, missing)
        };

        let mut rejected = response.failed;
        rejected.extend(missing);

        if rejected.is_empty() {
            SendOutcome::Delivered { accepted }
        } else {
            SendOutcome::PartiallyDelivered { accepted, rejected }
        }
    }

    /// Entries the queue took ownership of
    pub fn accepted(&self) -> usize {
        match self {
            SendOutcome::Delivered { accepted } => *accepted,
            SendOutcome::PartiallyDelivered { accepted, .. } => *accepted,
            _ => 0,
        }
    }

    /// Whether the call counts as a failure
    pub fn is_failure(&self) -> bool {
        !matches!(self, SendOutcome::Delivered { .. })
    }

    /// Whether sending the same batch again could succeed.
    ///
    /// Throttling and transport failures are transient; malformed or
    /// unauthorised requests and partial rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SendOutcome::ServiceRejected(e) => e.is_throttling(),
            SendOutcome::ClientError(_) => true,
            SendOutcome::Delivered { .. } | SendOutcome::PartiallyDelivered { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Batch, ErrorCategory};

    fn request(n: usize) -> BatchSendRequest {
        let batch: Batch = (0..n).map(|i| format!("m{i}")).collect();
        BatchSendRequest {
            queue_url: "q".into(),
            entries: batch.to_entries("g", || "t".to_string()),
        }
    }

    fn response(successful: &[&str], failed: &[&str]) -> BatchSendResponse {
        BatchSendResponse {
            successful: successful.iter().map(|s| s.to_string()).collect(),
            failed: failed
                .iter()
                .map(|id| EntryFailure {
                    id: id.to_string(),
                    code: "InternalError".into(),
                    message: "try later".into(),
                    sender_fault: false,
                })
                .collect(),
        }
    }

    fn service_error(status_code: u16, error_code: &str) -> ServiceError {
        ServiceError {
            message: "nope".into(),
            status_code,
            error_code: error_code.into(),
            category: ErrorCategory::Client,
            request_id: "req-42".into(),
        }
    }

    #[test]
    fn test_classify_full_success() {
        let outcome = SendOutcome::classify(Ok(response(&["0", "1", "2"], &[])), &request(3));
        assert_eq!(outcome, SendOutcome::Delivered { accepted: 3 });
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_classify_ignores_unknown_ids() {
        let outcome = SendOutcome::classify(Ok(response(&["0", "1", "2", "3"], &[])), &request(2));
        assert_eq!(outcome, SendOutcome::Delivered { accepted: 2 });
    }

    #[test]
    fn test_classify_counts_duplicate_ids_once() {
        let outcome = SendOutcome::classify(Ok(response(&["0", "0", "0"], &[])), &request(3));
        assert_eq!(outcome.accepted(), 1);
        assert!(outcome.is_failure());
    }

    #[test]
    fn test_classify_reports_entries_missing_from_response() {
        let outcome = SendOutcome::classify(Ok(response(&["0"], &[])), &request(3));
        match outcome {
            SendOutcome::PartiallyDelivered { accepted, rejected } => {
                assert_eq!(accepted, 1);
                let ids: Vec<_> = rejected.iter().map(|f| f.id.as_str()).collect();
                assert_eq!(ids, vec!["1", "2"]);
                assert!(rejected.iter().all(|f| f.code == MISSING_ENTRY_CODE));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_classify_explicit_failure_is_not_duplicated() {
        let outcome = SendOutcome::classify(Ok(response(&["0"], &["1"])), &request(3));
        match outcome {
            SendOutcome::PartiallyDelivered { rejected, .. } => {
                let ids: Vec<_> = rejected.iter().map(|f| f.id.as_str()).collect();
                assert_eq!(ids, vec!["1", "2"]);
                assert_eq!(rejected[0].code, "InternalError");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_classify_partial() {
        let outcome = SendOutcome::classify(Ok(response(&["0", "2"], &["1"])), &request(3));
        assert_eq!(outcome.accepted(), 2);
        assert!(outcome.is_failure());
        assert!(!outcome.is_retryable());
        match outcome {
            SendOutcome::PartiallyDelivered { rejected, .. } => assert_eq!(rejected[0].id, "1"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_retryable_classification() {
        let throttled =
            SendOutcome::classify(Err(QueueError::ServiceRejected(service_error(429, "x"))), &request(1));
        assert!(throttled.is_retryable());

        let malformed = SendOutcome::classify(
            Err(QueueError::ServiceRejected(service_error(400, "InvalidParameterValue"))),
            &request(1),
        );
        assert!(!malformed.is_retryable());

        let transport = SendOutcome::classify(
            Err(ClientError::Transport("connection reset".into()).into()),
            &request(1),
        );
        assert!(transport.is_retryable());
        assert_eq!(transport.accepted(), 0);
    }
}
