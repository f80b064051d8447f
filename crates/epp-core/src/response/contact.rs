use chrono::{DateTime, Utc};

use super::{Node, Response, parse_datetime, statuses};
use crate::command::CONTACT_NS;

/// Decoded `contact:postalInfo`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPostalInfo {
    /// `int` or `loc`
    pub kind: String,
    pub name: Option<String>,
    pub organization: Option<String>,
    /// Street lines in order (up to three)
    pub street: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
}

impl ContactPostalInfo {
    fn from_node(node: &Node) -> ContactPostalInfo {
        let addr = node.child(CONTACT_NS, "addr");
        let field = |local: &str| addr.and_then(|a| a.child_string(CONTACT_NS, local));
        ContactPostalInfo {
            kind: node.attr("type").unwrap_or_default().to_string(),
            name: node.child_string(CONTACT_NS, "name"),
            organization: node.child_string(CONTACT_NS, "org"),
            street: addr
                .map(|a| {
                    a.children(CONTACT_NS, "street")
                        .map(|s| s.text().to_string())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
            city: field("city"),
            state: field("sp"),
            postcode: field("pc"),
            country: field("cc"),
        }
    }

    /// Street line `index` (0-based), empty when absent
    pub fn street_line(&self, index: usize) -> &str {
        self.street.get(index).map(String::as_str).unwrap_or_default()
    }
}

/// Decoded `contact:infData`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub id: String,
    pub roid: Option<String>,
    pub statuses: Vec<String>,
    /// Internationalized postal info when present, else the localized one
    pub postal: Option<ContactPostalInfo>,
    /// Phone in `+CC.NUMBER` form
    pub voice: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub client_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub auth_info: Option<String>,
}

impl ContactInfo {
    pub(super) fn from_response(response: &Response) -> Result<ContactInfo, crate::Error> {
        let inf = response.require_res_data(CONTACT_NS, "infData")?;
        let id = inf
            .child_string(CONTACT_NS, "id")
            .ok_or_else(|| crate::Error::data("Contact info lacks <id>"))?;

        let postal = inf
            .children(CONTACT_NS, "postalInfo")
            .find(|p| p.attr("type") == Some("int"))
            .or_else(|| inf.child(CONTACT_NS, "postalInfo"))
            .map(ContactPostalInfo::from_node);

        Ok(ContactInfo {
            id,
            roid: inf.child_string(CONTACT_NS, "roid"),
            statuses: statuses(inf, CONTACT_NS),
            postal,
            voice: inf.child_string(CONTACT_NS, "voice"),
            fax: inf.child_string(CONTACT_NS, "fax"),
            email: inf.child_string(CONTACT_NS, "email"),
            client_id: inf.child_string(CONTACT_NS, "clID"),
            created_at: inf.child_text(CONTACT_NS, "crDate").and_then(parse_datetime),
            updated_at: inf.child_text(CONTACT_NS, "upDate").and_then(parse_datetime),
            auth_info: inf
                .child(CONTACT_NS, "authInfo")
                .and_then(|a| a.child_string(CONTACT_NS, "pw")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_international_postal_info() {
        let raw = r#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><response>
            <result code="1000"><msg>ok</msg></result>
            <resData><contact:infData xmlns:contact="urn:ietf:params:xml:ns:contact-1.0">
              <contact:id>C1</contact:id>
              <contact:status s="ok"/>
              <contact:postalInfo type="loc"><contact:name>Lokal</contact:name></contact:postalInfo>
              <contact:postalInfo type="int">
                <contact:name>Jane Q Doe</contact:name>
                <contact:org>Acme</contact:org>
                <contact:addr>
                  <contact:street>1 Main St</contact:street>
                  <contact:street>Suite 2</contact:street>
                  <contact:city>Springfield</contact:city>
                  <contact:cc>US</contact:cc>
                </contact:addr>
              </contact:postalInfo>
              <contact:voice>+1.5555551234</contact:voice>
              <contact:email>jane@example.tld</contact:email>
            </contact:infData></resData></response></epp>"#;

        let info = Response::decode(raw.as_bytes()).unwrap().contact_info().unwrap();
        let postal = info.postal.unwrap();
        assert_eq!(postal.kind, "int");
        assert_eq!(postal.name.as_deref(), Some("Jane Q Doe"));
        assert_eq!(postal.street_line(1), "Suite 2");
        assert_eq!(postal.street_line(2), "");
        assert_eq!(postal.state, None);
        assert_eq!(info.voice.as_deref(), Some("+1.5555551234"));
        assert_eq!(info.statuses, vec!["ok"]);
    }
}
