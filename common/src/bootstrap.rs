use std::time::Duration;

use thiserror::Error;

use crate::config::{BootstrapPolicy, NetworkConfig};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("network association timed out after {attempts} polls")]
    AssociationTimeout { attempts: u32 },
    #[error("wifi driver error: {0}")]
    Link(String),
}

/// A station interface that can join a network and report when it has.
pub trait Association {
    fn begin(&mut self, network: &NetworkConfig) -> Result<(), BootstrapError>;

    fn is_associated(&mut self) -> bool;

    /// Routable address once associated.
    fn address(&self) -> Option<String>;
}

/// Starts association and polls until the link is up or the policy's attempt
/// budget runs out. Returns how many poll intervals elapsed.
pub fn wait_for_association<A, S>(
    link: &mut A,
    network: &NetworkConfig,
    policy: &BootstrapPolicy,
    mut sleep: S,
) -> Result<u32, BootstrapError>
where
    A: Association,
    S: FnMut(Duration),
{
    link.begin(network)?;

    let interval = Duration::from_millis(policy.poll_interval_ms);
    let mut attempts = 0;
    while !link.is_associated() {
        if attempts >= policy.max_attempts {
            return Err(BootstrapError::AssociationTimeout { attempts });
        }
        sleep(interval);
        attempts += 1;
    }

    Ok(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLink {
        polls_needed: Option<u32>,
        polls: u32,
        started: bool,
    }

    impl FakeLink {
        fn after(polls: u32) -> Self {
            Self {
                polls_needed: Some(polls),
                polls: 0,
                started: false,
            }
        }

        fn never() -> Self {
            Self {
                polls_needed: None,
                polls: 0,
                started: false,
            }
        }
    }

    impl Association for FakeLink {
        fn begin(&mut self, _network: &NetworkConfig) -> Result<(), BootstrapError> {
            self.started = true;
            Ok(())
        }

        fn is_associated(&mut self) -> bool {
            assert!(self.started, "polled before begin");
            let up = self.polls_needed.is_some_and(|needed| self.polls >= needed);
            self.polls += 1;
            up
        }

        fn address(&self) -> Option<String> {
            self.polls_needed
                .is_some_and(|needed| self.polls > needed)
                .then(|| "192.168.1.42".to_string())
        }
    }

    #[test]
    fn already_associated_needs_no_sleep() {
        let mut link = FakeLink::after(0);
        let mut slept = Vec::new();
        let waited = wait_for_association(
            &mut link,
            &NetworkConfig::default(),
            &BootstrapPolicy::default(),
            |d| slept.push(d),
        )
        .unwrap();
        assert_eq!(waited, 0);
        assert!(slept.is_empty());
        assert_eq!(link.address().as_deref(), Some("192.168.1.42"));
    }

    #[test]
    fn polls_at_fixed_interval_until_up() {
        let mut link = FakeLink::after(4);
        let mut slept = Vec::new();
        let waited = wait_for_association(
            &mut link,
            &NetworkConfig::default(),
            &BootstrapPolicy::default(),
            |d| slept.push(d),
        )
        .unwrap();
        assert_eq!(waited, 4);
        assert_eq!(slept, vec![Duration::from_millis(500); 4]);
    }

    #[test]
    fn succeeds_on_last_permitted_poll() {
        let mut link = FakeLink::after(30);
        let waited = wait_for_association(
            &mut link,
            &NetworkConfig::default(),
            &BootstrapPolicy::default(),
            |_| {},
        )
        .unwrap();
        assert_eq!(waited, 30);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut link = FakeLink::never();
        let mut total = Duration::ZERO;
        let err = wait_for_association(
            &mut link,
            &NetworkConfig::default(),
            &BootstrapPolicy::default(),
            |d| total += d,
        )
        .unwrap_err();
        assert!(matches!(err, BootstrapError::AssociationTimeout { attempts: 30 }));
        assert_eq!(total, Duration::from_secs(15));
        assert_eq!(link.address(), None);
    }

    #[test]
    fn begin_failure_is_reported() {
        struct DeadLink;
        impl Association for DeadLink {
            fn begin(&mut self, _network: &NetworkConfig) -> Result<(), BootstrapError> {
                Err(BootstrapError::Link("radio off".to_string()))
            }
            fn is_associated(&mut self) -> bool {
                unreachable!()
            }
            fn address(&self) -> Option<String> {
                None
            }
        }

        let err = wait_for_association(
            &mut DeadLink,
            &NetworkConfig::default(),
            &BootstrapPolicy::default(),
            |_| {},
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "wifi driver error: radio off");
    }
}
