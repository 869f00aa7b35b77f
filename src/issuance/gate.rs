//! Attendance gate: who may receive a certificate

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{Event, Registration, RegistrationId};
use crate::infra::{CertificateError, EventDirectory, Result};

/// Selects registrations that are confirmed and checked in for an event
/// that has already ended.
#[derive(Clone)]
pub struct AttendanceGate {
    directory: Arc<dyn EventDirectory>,
}

impl AttendanceGate {
    pub fn new(directory: Arc<dyn EventDirectory>) -> Self {
        Self { directory }
    }

    /// Fail with `NotYetEligible` unless `now` is strictly after the event end
    pub fn ensure_ended(event: &Event, now: DateTime<Utc>) -> Result<()> {
        if event.has_ended(now) {
            Ok(())
        } else {
            Err(CertificateError::NotYetEligible {
                event_id: event.id,
                ends_at: event.ends_at,
            })
        }
    }

    /// Eligible registrations, restricted to `only` when it is non-empty.
    ///
    /// Listed ids that are not eligible are ignored. An empty result is
    /// `NoEligibleParticipants`.
    pub async fn eligible(
        &self,
        event: &Event,
        only: Option<&[RegistrationId]>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Registration>> {
        Self::ensure_ended(event, now)?;

        let mut registrations = self.directory.eligible_registrations(event.id).await?;

        if let Some(ids) = only.filter(|ids| !ids.is_empty()) {
            let wanted: HashSet<_> = ids.iter().copied().collect();
            let before = registrations.len();
            registrations.retain(|r| wanted.contains(&r.id));
            debug!(
                event_id = %event.id,
                requested = wanted.len(),
                eligible = before,
                selected = registrations.len(),
                "Applied participant filter"
            );
        }

        if registrations.is_empty() {
            return Err(CertificateError::NoEligibleParticipants(event.id));
        }
        Ok(registrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, RegistrationStatus, UserId};
    use crate::infra::MockEventDirectory;
    use chrono::Duration;

    fn event(ends_at: DateTime<Utc>) -> Event {
        Event {
            id: EventId::new(),
            title: "Workshop".to_string(),
            description: None,
            location: None,
            starts_at: ends_at - Duration::hours(2),
            ends_at,
            organizer_id: UserId::new(),
            organizer_name: "Org".to_string(),
            created_at: ends_at - Duration::days(30),
        }
    }

    fn registration(event_id: EventId, name: &str) -> Registration {
        Registration {
            id: RegistrationId::new(),
            event_id,
            participant_name: name.to_string(),
            participant_email: format!("{name}@example.com"),
            status: RegistrationStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_not_ended_is_rejected_before_lookup() {
        let now = Utc::now();
        let e = event(now + Duration::days(1));
        let mut directory = MockEventDirectory::new();
        directory.expect_eligible_registrations().times(0);

        let gate = AttendanceGate::new(Arc::new(directory));
        match gate.eligible(&e, None, now).await {
            Err(CertificateError::NotYetEligible { ends_at, .. }) => assert_eq!(ends_at, e.ends_at),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_end_time_itself_is_not_eligible() {
        let now = Utc::now();
        let gate = AttendanceGate::new(Arc::new(MockEventDirectory::new()));
        assert!(matches!(
            gate.eligible(&event(now), None, now).await,
            Err(CertificateError::NotYetEligible { .. })
        ));
    }

    #[tokio::test]
    async fn test_filters_to_requested_ids() {
        let now = Utc::now();
        let e = event(now - Duration::days(1));
        let a = registration(e.id, "ada");
        let b = registration(e.id, "brian");
        let all = vec![a.clone(), b.clone()];

        let mut directory = MockEventDirectory::new();
        directory
            .expect_eligible_registrations()
            .returning(move |_| Ok(all.clone()));
        let gate = AttendanceGate::new(Arc::new(directory));

        let selected = gate.eligible(&e, Some(&[b.id]), now).await.unwrap();
        assert_eq!(selected, vec![b]);

        let everyone = gate.eligible(&e, Some(&[]), now).await.unwrap();
        assert_eq!(everyone.len(), 2);
    }

    #[tokio::test]
    async fn test_no_one_checked_in_is_distinct_failure() {
        let now = Utc::now();
        let e = event(now - Duration::hours(1));
        let mut directory = MockEventDirectory::new();
        directory
            .expect_eligible_registrations()
            .returning(|_| Ok(vec![]));
        let gate = AttendanceGate::new(Arc::new(directory));

        assert!(matches!(
            gate.eligible(&e, None, now).await,
            Err(CertificateError::NoEligibleParticipants(id)) if id == e.id
        ));
    }

    #[tokio::test]
    async fn test_filter_matching_nobody_is_no_eligible() {
        let now = Utc::now();
        let e = event(now - Duration::hours(1));
        let a = registration(e.id, "ada");
        let mut directory = MockEventDirectory::new();
        directory
            .expect_eligible_registrations()
            .returning(move |_| Ok(vec![a.clone()]));
        let gate = AttendanceGate::new(Arc::new(directory));

        assert!(matches!(
            gate.eligible(&e, Some(&[RegistrationId::new()]), now).await,
            Err(CertificateError::NoEligibleParticipants(_))
        ));
    }
}
