use chrono::{DateTime, NaiveDate, Utc};

use super::{Node, Response, parse_date, parse_datetime, statuses};
use crate::command::{DOMAIN_NS, RGP_NS};
use crate::model::ContactRoles;

/// Contact reference with its role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainContact {
    /// `admin`, `tech` or `billing`
    pub role: String,
    pub id: String,
}

/// Decoded `domain:infData`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainInfo {
    pub name: String,
    /// Registry object id
    pub roid: Option<String>,
    pub statuses: Vec<String>,
    pub registrant: Option<String>,
    pub contacts: Vec<DomainContact>,
    /// Delegated nameservers referenced as `hostObj`
    pub nameservers: Vec<String>,
    /// Delegated nameservers given inline as `hostAttr/hostName`
    pub host_attrs: Vec<String>,
    /// Subordinate host objects
    pub hosts: Vec<String>,
    /// Sponsoring client
    pub client_id: Option<String>,
    pub creator_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updater_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// `exDate` exactly as sent
    pub expiry_raw: Option<String>,
    pub transferred_at: Option<DateTime<Utc>>,
    pub auth_info: Option<String>,
    /// Redemption grace period states from the rgp extension
    pub rgp_statuses: Vec<String>,
}

impl DomainInfo {
    pub(super) fn from_response(response: &Response) -> Result<DomainInfo, crate::Error> {
        let inf = response.require_res_data(DOMAIN_NS, "infData")?;
        let name = inf
            .child_string(DOMAIN_NS, "name")
            .ok_or_else(|| crate::Error::data("Domain info lacks <name>"))?;

        let contacts: Vec<DomainContact> = inf
            .children(DOMAIN_NS, "contact")
            .filter_map(|c| {
                let id = c.text();
                let role = c.attr("type")?;
                (!id.is_empty()).then(|| DomainContact {
                    role: role.to_string(),
                    id: id.to_string(),
                })
            })
            .collect();

        let ns = inf.child(DOMAIN_NS, "ns");
        let nameservers: Vec<String> = ns
            .map(|ns| {
                ns.children(DOMAIN_NS, "hostObj")
                    .map(Node::text)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let host_attrs: Vec<String> = ns
            .map(|ns| {
                ns.children(DOMAIN_NS, "hostAttr")
                    .filter_map(|attr| attr.child_text(DOMAIN_NS, "hostName"))
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let hosts: Vec<String> = inf
            .children(DOMAIN_NS, "host")
            .map(|h| h.text().to_string())
            .filter(|h| !h.is_empty())
            .collect();

        let rgp_statuses: Vec<String> = response
            .extension(RGP_NS, "infData")
            .map(|rgp| {
                rgp.children(RGP_NS, "rgpStatus")
                    .filter_map(|s| s.attr("s"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let expiry_raw = inf.child_string(DOMAIN_NS, "exDate");

        Ok(DomainInfo {
            name,
            roid: inf.child_string(DOMAIN_NS, "roid"),
            statuses: statuses(inf, DOMAIN_NS),
            registrant: inf.child_string(DOMAIN_NS, "registrant"),
            contacts,
            nameservers,
            host_attrs,
            hosts,
            client_id: inf.child_string(DOMAIN_NS, "clID"),
            creator_id: inf.child_string(DOMAIN_NS, "crID"),
            created_at: inf.child_text(DOMAIN_NS, "crDate").and_then(parse_datetime),
            updater_id: inf.child_string(DOMAIN_NS, "upID"),
            updated_at: inf.child_text(DOMAIN_NS, "upDate").and_then(parse_datetime),
            expires_at: expiry_raw.as_deref().and_then(parse_datetime),
            expiry_raw,
            transferred_at: inf.child_text(DOMAIN_NS, "trDate").and_then(parse_datetime),
            auth_info: inf
                .child(DOMAIN_NS, "authInfo")
                .and_then(|a| a.child_string(DOMAIN_NS, "pw")),
            rgp_statuses,
        })
    }

    /// First contact id with `role`
    pub fn contact(&self, role: &str) -> Option<&str> {
        self.contacts
            .iter()
            .find(|c| c.role == role)
            .map(|c| c.id.as_str())
    }

    /// Contact ids per role
    pub fn contact_roles(&self) -> ContactRoles {
        ContactRoles {
            registrant: self.registrant.clone(),
            admin: self.contact("admin").map(str::to_string),
            tech: self.contact("tech").map(str::to_string),
            billing: self.contact("billing").map(str::to_string),
        }
    }

    /// All delegated nameservers, `hostObj` entries first
    pub fn delegated_nameservers(&self) -> Vec<String> {
        self.nameservers.iter().chain(&self.host_attrs).cloned().collect()
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s == status)
    }

    /// Date part of the expiration date, as used for `curExpDate`
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_raw
            .as_deref()
            .and_then(parse_date)
            .or_else(|| self.expires_at.map(|dt| dt.date_naive()))
    }
}

/// Decoded `domain:creData`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainCreateData {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DomainCreateData {
    pub(super) fn from_response(response: &Response) -> Result<DomainCreateData, crate::Error> {
        let cre = response.require_res_data(DOMAIN_NS, "creData")?;
        Ok(DomainCreateData {
            name: cre
                .child_string(DOMAIN_NS, "name")
                .ok_or_else(|| crate::Error::data("Domain create response lacks <name>"))?,
            created_at: cre.child_text(DOMAIN_NS, "crDate").and_then(parse_datetime),
            expires_at: cre.child_text(DOMAIN_NS, "exDate").and_then(parse_datetime),
        })
    }
}

/// Decoded `domain:trnData`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    pub name: String,
    /// `pending`, `clientApproved`, `serverApproved`, ...
    pub status: String,
    pub requesting_id: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
    pub acting_id: Option<String>,
    pub action_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TransferInfo {
    pub(super) fn from_response(response: &Response) -> Result<TransferInfo, crate::Error> {
        let trn = response.require_res_data(DOMAIN_NS, "trnData")?;
        Ok(TransferInfo {
            name: trn
                .child_string(DOMAIN_NS, "name")
                .ok_or_else(|| crate::Error::data("Transfer response lacks <name>"))?,
            status: trn
                .child_string(DOMAIN_NS, "trStatus")
                .ok_or_else(|| crate::Error::data("Transfer response lacks <trStatus>"))?,
            requesting_id: trn.child_string(DOMAIN_NS, "reID"),
            requested_at: trn.child_text(DOMAIN_NS, "reDate").and_then(parse_datetime),
            acting_id: trn.child_string(DOMAIN_NS, "acID"),
            action_at: trn.child_text(DOMAIN_NS, "acDate").and_then(parse_datetime),
            expires_at: trn.child_text(DOMAIN_NS, "exDate").and_then(parse_datetime),
        })
    }
}
