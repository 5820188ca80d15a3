//! Change detection against persisted digests

use crate::{
    fingerprint::Fingerprint,
    model::{DigestPair, OrgSnapshot},
};

/// Fresh digests of a snapshot and how they compare to the stored pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    pub accounts_digest: Fingerprint,
    pub units_digest: Fingerprint,
    pub accounts_changed: bool,
    pub units_changed: bool,
}

impl ChangeReport {
    /// True only when neither digest moved
    pub fn is_up_to_date(&self) -> bool {
        !self.accounts_changed && !self.units_changed
    }

    /// The fresh digests, in the form they are persisted
    pub fn digests(&self) -> DigestPair {
        DigestPair {
            accounts: self.accounts_digest.to_string(),
            units: self.units_digest.to_string(),
        }
    }
}

/// Compare a snapshot's fingerprints to the stored digests
pub fn detect_changes(snapshot: &OrgSnapshot, stored: &DigestPair) -> ChangeReport {
    let accounts_digest = snapshot.accounts.fingerprint();
    let units_digest = snapshot.units.fingerprint();

    ChangeReport {
        accounts_changed: !accounts_digest.matches(&stored.accounts),
        units_changed: !units_digest.matches(&stored.units),
        accounts_digest,
        units_digest,
    }
}
