//! EPP response decoding
//!
//! [`Response::decode`] turns a raw frame into a result code, message and
//! transaction ids, raising [`crate::Error::Protocol`] for error codes.
//! Typed payload helpers live next to it, one module per object type.
//! Elements are matched by namespace URI and local name, never by prefix.

mod contact;
mod domain;
mod host;
mod tree;

pub use contact::{ContactInfo, ContactPostalInfo};
pub use domain::{DomainContact, DomainCreateData, DomainInfo, TransferInfo};
pub use host::HostInfo;
pub use tree::Node;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::command::EPP_NS;

/// Result codes in `[1000, 2000)` are success
pub fn is_success_code(code: u16) -> bool {
    (1000..2000).contains(&code)
}

/// Decoded EPP `<response>`
#[derive(Debug, Clone)]
pub struct Response {
    code: u16,
    message: String,
    cl_trid: Option<String>,
    sv_trid: Option<String>,
    root: Node,
}

impl Response {
    /// Decode a raw response document
    ///
    /// # Returns
    ///
    /// - `Ok(Response)`: Result code below 2000
    /// - `Err(Error::Protocol)`: Result code 2000 or above
    /// - `Err(Error::Data)`: Unparseable or structurally incomplete document
    pub fn decode(raw: &[u8]) -> Result<Response, crate::Error> {
        let root = Node::parse(raw)?;
        if !root.is(EPP_NS, "epp") {
            return Err(crate::Error::data(format!(
                "Root element is <{}>, expected <epp>",
                root.local_name()
            )));
        }

        let response = root
            .child(EPP_NS, "response")
            .ok_or_else(|| crate::Error::data("Missing <response> element"))?;
        let result = response
            .child(EPP_NS, "result")
            .ok_or_else(|| crate::Error::data("Missing <result> element"))?;
        let code_attr = result
            .attr("code")
            .ok_or_else(|| crate::Error::data("Missing result code"))?;
        let code: u16 = code_attr
            .trim()
            .parse()
            .map_err(|_| crate::Error::data(format!("Non-numeric result code '{}'", code_attr)))?;

        let mut message = result.child_string(EPP_NS, "msg").unwrap_or_default();
        if let Some(reason) = result
            .child(EPP_NS, "extValue")
            .and_then(|ext| ext.child_text(EPP_NS, "reason"))
        {
            message = format!("{} ({})", message, reason);
        }

        if !is_success_code(code) {
            return Err(crate::Error::protocol(code, message));
        }

        let trid = response.child(EPP_NS, "trID");
        let cl_trid = trid.and_then(|t| t.child_string(EPP_NS, "clTRID"));
        let sv_trid = trid.and_then(|t| t.child_string(EPP_NS, "svTRID"));

        Ok(Response {
            code,
            message,
            cl_trid,
            sv_trid,
            root,
        })
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cl_trid(&self) -> Option<&str> {
        self.cl_trid.as_deref()
    }

    pub fn sv_trid(&self) -> Option<&str> {
        self.sv_trid.as_deref()
    }

    fn response_node(&self) -> Option<&Node> {
        self.root.child(EPP_NS, "response")
    }

    /// Object payload `<resData><{ns}local>`
    pub fn res_data(&self, ns: &str, local: &str) -> Option<&Node> {
        self.response_node()?
            .child(EPP_NS, "resData")?
            .child(ns, local)
    }

    /// Extension payload `<extension><{ns}local>`
    pub fn extension(&self, ns: &str, local: &str) -> Option<&Node> {
        self.response_node()?
            .child(EPP_NS, "extension")?
            .child(ns, local)
    }

    /// Like [`Response::res_data`], but a missing payload is a data error
    pub fn require_res_data(&self, ns: &str, local: &str) -> Result<&Node, crate::Error> {
        self.res_data(ns, local).ok_or_else(|| {
            crate::Error::data(format!("Response {} lacks <{}> payload", self.code, local))
        })
    }

    /// Fail when the response carries a clTRID different from `expected`
    pub fn check_transaction(&self, expected: &str) -> Result<(), crate::Error> {
        match self.cl_trid() {
            Some(actual) if actual != expected => Err(crate::Error::data(format!(
                "clTRID mismatch: sent {}, received {}",
                expected, actual
            ))),
            _ => Ok(()),
        }
    }

    /// Availability results from a domain check
    pub fn domain_check(&self) -> Result<Vec<CheckResult>, crate::Error> {
        self.check_results(crate::command::DOMAIN_NS, "name")
    }

    /// Availability results from a contact check
    pub fn contact_check(&self) -> Result<Vec<CheckResult>, crate::Error> {
        self.check_results(crate::command::CONTACT_NS, "id")
    }

    /// Availability results from a host check
    pub fn host_check(&self) -> Result<Vec<CheckResult>, crate::Error> {
        self.check_results(crate::command::HOST_NS, "name")
    }

    fn check_results(&self, ns: &str, key: &str) -> Result<Vec<CheckResult>, crate::Error> {
        let chk = self.require_res_data(ns, "chkData")?;
        chk.children(ns, "cd")
            .map(|cd| {
                let name_node = cd
                    .child(ns, key)
                    .ok_or_else(|| crate::Error::data(format!("Check result lacks <{}>", key)))?;
                Ok(CheckResult {
                    name: name_node.text().to_string(),
                    available: parse_flag(name_node.attr("avail")),
                    reason: cd.child_string(ns, "reason"),
                })
            })
            .collect()
    }

    /// Domain info payload
    pub fn domain_info(&self) -> Result<DomainInfo, crate::Error> {
        DomainInfo::from_response(self)
    }

    /// Domain create payload
    pub fn domain_created(&self) -> Result<DomainCreateData, crate::Error> {
        DomainCreateData::from_response(self)
    }

    /// New expiry from a domain renew, if the registry reported one
    pub fn domain_renewed(&self) -> Option<DateTime<Utc>> {
        self.res_data(crate::command::DOMAIN_NS, "renData")
            .and_then(|ren| ren.child_text(crate::command::DOMAIN_NS, "exDate"))
            .and_then(parse_datetime)
    }

    /// Domain transfer payload
    pub fn transfer_info(&self) -> Result<TransferInfo, crate::Error> {
        TransferInfo::from_response(self)
    }

    /// Contact info payload
    pub fn contact_info(&self) -> Result<ContactInfo, crate::Error> {
        ContactInfo::from_response(self)
    }

    /// Id assigned by a contact create
    pub fn contact_created_id(&self) -> Result<String, crate::Error> {
        let ns = crate::command::CONTACT_NS;
        self.require_res_data(ns, "creData")?
            .child_string(ns, "id")
            .ok_or_else(|| crate::Error::data("Contact create response lacks <id>"))
    }

    /// Host info payload
    pub fn host_info(&self) -> Result<HostInfo, crate::Error> {
        HostInfo::from_response(self)
    }
}

/// One entry of a check response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Checked name or id
    pub name: String,
    /// The `avail` flag
    pub available: bool,
    /// Registry-supplied reason, informational only
    pub reason: Option<String>,
}

/// Server greeting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Greeting {
    pub server_id: String,
    pub server_date: Option<DateTime<Utc>>,
    pub object_uris: Vec<String>,
    pub extension_uris: Vec<String>,
}

impl Greeting {
    /// Decode a `<greeting>` document
    pub fn parse(raw: &[u8]) -> Result<Greeting, crate::Error> {
        let root = Node::parse(raw)?;
        let greeting = root
            .child(EPP_NS, "greeting")
            .filter(|_| root.is(EPP_NS, "epp"))
            .ok_or_else(|| crate::Error::data("Expected an EPP <greeting>"))?;

        let menu = greeting.child(EPP_NS, "svcMenu");
        let object_uris = menu
            .map(|m| m.children(EPP_NS, "objURI").map(|n| n.text().to_string()).collect())
            .unwrap_or_default();
        let extension_uris = menu
            .and_then(|m| m.child(EPP_NS, "svcExtension"))
            .map(|ext| ext.children(EPP_NS, "extURI").map(|n| n.text().to_string()).collect())
            .unwrap_or_default();

        Ok(Greeting {
            server_id: greeting.child_string(EPP_NS, "svID").unwrap_or_default(),
            server_date: greeting.child_text(EPP_NS, "svDate").and_then(parse_datetime),
            object_uris,
            extension_uris,
        })
    }
}

/// `avail`-style boolean attribute (`1`/`true`)
fn parse_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1") | Some("true"))
}

/// Parse an EPP timestamp
///
/// Accepts RFC 3339, a zone-less date-time (taken as UTC) and a bare date.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Date part (`YYYY-MM-DD`) of an EPP timestamp
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim().get(..10)?, "%Y-%m-%d").ok()
}

/// Status values (`s` attributes) of `<{ns}status>` children
fn statuses(node: &Node, ns: &str) -> Vec<String> {
    node.children(ns, "status")
        .filter_map(|s| s.attr("s"))
        .map(str::to_string)
        .collect()
}
