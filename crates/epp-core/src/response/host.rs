use chrono::{DateTime, Utc};
use std::net::IpAddr;

use super::{Response, parse_datetime, statuses};
use crate::command::HOST_NS;

/// Decoded `host:infData`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub name: String,
    pub roid: Option<String>,
    pub statuses: Vec<String>,
    pub addresses: Vec<IpAddr>,
    pub client_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl HostInfo {
    pub(super) fn from_response(response: &Response) -> Result<HostInfo, crate::Error> {
        let inf = response.require_res_data(HOST_NS, "infData")?;
        let name = inf
            .child_string(HOST_NS, "name")
            .ok_or_else(|| crate::Error::data("Host info lacks <name>"))?;

        let addresses = inf
            .children(HOST_NS, "addr")
            .map(|a| {
                a.text()
                    .parse::<IpAddr>()
                    .map_err(|_| crate::Error::data(format!("Invalid host address '{}'", a.text())))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HostInfo {
            name,
            roid: inf.child_string(HOST_NS, "roid"),
            statuses: statuses(inf, HOST_NS),
            addresses,
            client_id: inf.child_string(HOST_NS, "clID"),
            created_at: inf.child_text(HOST_NS, "crDate").and_then(parse_datetime),
        })
    }
}
