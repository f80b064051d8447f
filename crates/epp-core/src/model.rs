//! Domain, contact and host entities exchanged at the client boundary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Maximum number of nameserver slots on a domain
pub const MAX_NAMESERVERS: usize = 4;

/// Status pair managed by lock/unlock
pub const LOCK_STATUSES: [&str; 2] = ["clientDeleteProhibited", "clientTransferProhibited"];

/// Ordered nameserver list with at most [`MAX_NAMESERVERS`] entries
///
/// Blank slots are dropped on construction, so an empty slot can never
/// reach a wire document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nameservers(Vec<String>);

impl Nameservers {
    /// Build from host names, skipping blank entries
    pub fn new<I, S>(hosts: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();

        if hosts.len() > MAX_NAMESERVERS {
            return Err(crate::Error::validation(format!(
                "At most {} nameservers are allowed, got {}",
                MAX_NAMESERVERS,
                hosts.len()
            )));
        }

        Ok(Self(hosts))
    }

    /// Build from a registry answer, keeping only the first four hosts
    pub fn truncated<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_string())
                .filter(|h| !h.is_empty())
                .take(MAX_NAMESERVERS)
                .collect(),
        )
    }

    /// Host name in slot `index` (0-based), if present
    pub fn slot(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// All four slots, `None` for unused ones
    pub fn slots(&self) -> [Option<String>; MAX_NAMESERVERS] {
        std::array::from_fn(|i| self.0.get(i).cloned())
    }

    /// Iterate over present host names in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether a host is listed (case-insensitive)
    pub fn contains(&self, host: &str) -> bool {
        self.0.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    /// Number of present hosts
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no host is present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Contact ids per role on a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRoles {
    /// Registrant contact id
    pub registrant: Option<String>,
    /// Administrative contact id
    pub admin: Option<String>,
    /// Technical contact id
    pub tech: Option<String>,
    /// Billing contact id
    pub billing: Option<String>,
}

impl ContactRoles {
    /// The same contact for all four roles
    pub fn all(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            registrant: Some(id.clone()),
            admin: Some(id.clone()),
            tech: Some(id.clone()),
            billing: Some(id),
        }
    }

    /// Distinct ids in role order (registrant, admin, tech, billing)
    pub fn unique_ids(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for id in [&self.registrant, &self.admin, &self.tech, &self.billing]
            .into_iter()
            .flatten()
        {
            if !id.is_empty() && !seen.contains(id) {
                seen.push(id.clone());
            }
        }
        seen
    }

    /// Whether no role is set
    pub fn is_empty(&self) -> bool {
        self.unique_ids().is_empty()
    }
}

/// Domain-like entity supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Fully qualified domain name
    pub name: String,
    /// Registration period in years
    pub period_years: u8,
    /// Nameservers in slot order
    pub nameservers: Nameservers,
    /// Contact ids per role
    pub contacts: ContactRoles,
    /// Domain auth-info password
    pub auth_info: Option<String>,
    /// EPP status values
    pub status: BTreeSet<String>,
    /// Registry creation date
    pub created_at: Option<DateTime<Utc>>,
    /// Registry expiration date
    pub expires_at: Option<DateTime<Utc>>,
}

impl DomainRecord {
    /// Create a domain with a one-year period and nothing else set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            period_years: 1,
            ..Self::default()
        }
    }

    /// Set the registration period
    pub fn with_period(mut self, years: u8) -> Self {
        self.period_years = years;
        self
    }

    /// Set the nameservers
    pub fn with_nameservers(mut self, nameservers: Nameservers) -> Self {
        self.nameservers = nameservers;
        self
    }
}

/// Postal address of a contact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    /// First street line
    pub street1: String,
    /// Second street line
    pub street2: String,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Postal code
    pub postcode: String,
    /// ISO 3166 alpha-2 country code
    pub country: String,
}

/// Contact-like entity supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Registry contact id (assigned on create when empty)
    pub id: String,
    /// Full name
    pub name: String,
    /// Organization
    pub organization: String,
    /// Postal address
    pub address: PostalAddress,
    /// Phone country calling code, without the leading `+`
    pub phone_country_code: String,
    /// Phone number
    pub phone_number: String,
    /// Email address
    pub email: String,
    /// Contact auth-info password
    pub auth_info: Option<String>,
    /// EPP status values
    pub status: BTreeSet<String>,
}

impl ContactRecord {
    /// Phone number in EPP `+CC.NUMBER` form, or empty when unset
    pub fn voice(&self) -> String {
        if self.phone_number.trim().is_empty() {
            return String::new();
        }
        format!(
            "+{}.{}",
            self.phone_country_code.trim().trim_start_matches('+'),
            self.phone_number.trim()
        )
    }
}

/// Host object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Host name
    pub name: String,
    /// Glue addresses (only for hosts inside the sponsored domain)
    pub addresses: Vec<IpAddr>,
}

impl HostRecord {
    /// Create a host without glue
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addresses: Vec::new(),
        }
    }
}
