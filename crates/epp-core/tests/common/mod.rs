//! Scripted registry and response builders for contract tests
//!
//! The scripted registry speaks framed EPP over an in-process duplex pipe:
//! it sends a greeting, records every request, and answers each one with
//! whatever the test's handler returns. A handler returning `None` hangs
//! up, which the client sees as a transport failure.

#![allow(dead_code)]

use epp_core::config::{DataSet, EppConfig, TlsSettings};
use epp_core::traits::Transport;
use epp_core::{EppClient, FramedStream, SessionOps};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EPP_NS: &str = "urn:ietf:params:xml:ns:epp-1.0";
pub const DOMAIN_NS: &str = "urn:ietf:params:xml:ns:domain-1.0";
pub const CONTACT_NS: &str = "urn:ietf:params:xml:ns:contact-1.0";
pub const HOST_NS: &str = "urn:ietf:params:xml:ns:host-1.0";

/// Handle on a running scripted registry
pub struct ScriptedRegistry {
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRegistry {
    /// Every request document received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Command names of the received requests (see [`command_name`])
    pub fn commands(&self) -> Vec<String> {
        self.requests().iter().map(|r| command_name(r)).collect()
    }

    /// How many requests of one command were received
    pub fn count(&self, name: &str) -> usize {
        self.commands().iter().filter(|c| c.as_str() == name).count()
    }

    /// Requests of one command, in order
    pub fn requests_for(&self, name: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| command_name(r) == name)
            .collect()
    }
}

/// Start a registry on one half of a duplex pipe
///
/// Returns the client half, already framed.
pub fn spawn_registry<F>(mut handler: F) -> (Box<dyn Transport>, ScriptedRegistry)
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    let (client_half, server_half) = tokio::io::duplex(256 * 1024);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        let mut server = FramedStream::new(server_half, Duration::from_secs(5));
        if server.send(greeting().as_bytes()).await.is_err() {
            return;
        }

        while let Ok(raw) = server.receive().await {
            let request = String::from_utf8_lossy(&raw).to_string();
            recorded.lock().unwrap().push(request.clone());

            let Some(reply) = handler(&request) else {
                break;
            };
            if server.send(reply.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let transport = Box::new(FramedStream::new(client_half, Duration::from_secs(5)));
    (transport, ScriptedRegistry { requests })
}

/// Client configuration pointing at nothing in particular
pub fn test_config(data_set: DataSet) -> EppConfig {
    EppConfig::new(
        "epp.registry.test",
        "registrar1",
        "s3cret-pass",
        TlsSettings::new("/unused/cert.pem", "/unused/key.pem"),
    )
    .with_transaction_prefix("TEST")
    .with_data_set(data_set)
    .with_timeout_secs(5)
}

/// Connected (not logged in) client over a scripted registry
pub async fn connect<F>(data_set: DataSet, handler: F) -> (EppClient, ScriptedRegistry)
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    let (transport, registry) = spawn_registry(handler);
    let client = EppClient::with_transport(test_config(data_set), transport)
        .await
        .expect("greeting is accepted");
    (client, registry)
}

/// Logged-in client; login and logout are answered automatically
pub async fn logged_in<F>(data_set: DataSet, mut handler: F) -> (EppClient, ScriptedRegistry)
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    let (mut client, registry) = connect(data_set, move |request| {
        match command_name(request).as_str() {
            "login" => Some(ok(request)),
            "logout" => Some(response(
                request,
                1500,
                "Command completed successfully; ending session",
                "",
            )),
            _ => handler(request),
        }
    })
    .await;
    client.login().await.expect("login succeeds");
    (client, registry)
}

/// Short name of a request: `login`, `logout`, `hello`, or `object:verb`
pub fn command_name(request: &str) -> String {
    if request.contains("<login>") {
        return "login".to_string();
    }
    if request.contains("<logout/>") {
        return "logout".to_string();
    }
    if request.contains("<hello/>") {
        return "hello".to_string();
    }
    for object in ["domain", "contact", "host"] {
        for verb in ["check", "info", "create", "update", "renew", "transfer", "delete"] {
            if request.contains(&format!("<{}:{} ", object, verb)) {
                return format!("{}:{}", object, verb);
            }
        }
    }
    "unknown".to_string()
}

/// clTRID of a request, if any
pub fn cl_trid(request: &str) -> Option<&str> {
    let start = request.find("<clTRID>")? + "<clTRID>".len();
    let end = request[start..].find("</clTRID>")? + start;
    Some(&request[start..end])
}

/// Text of the first `<tag>` element in a request
///
/// The start tag may carry attributes (`<domain:name hosts="all">`).
/// Self-closing elements are skipped.
pub fn element_text<'a>(request: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut from = 0;
    loop {
        let at = request[from..].find(&open)? + from + open.len();
        let rest = &request[at..];
        let tag_end = rest.find('>')?;
        let boundary = rest.chars().next()?;
        if (boundary == '>' || boundary.is_whitespace()) && !rest[..tag_end].ends_with('/') {
            let start = at + tag_end + 1;
            let end = request[start..].find(&close)? + start;
            return Some(&request[start..end]);
        }
        from = at;
    }
}

pub fn greeting() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<epp xmlns="{EPP_NS}">
  <greeting>
    <svID>Test Registry</svID>
    <svDate>2026-10-19T08:00:00.0Z</svDate>
    <svcMenu>
      <version>1.0</version>
      <lang>en</lang>
      <objURI>{DOMAIN_NS}</objURI>
      <objURI>{CONTACT_NS}</objURI>
      <objURI>{HOST_NS}</objURI>
      <svcExtension><extURI>urn:ietf:params:xml:ns:rgp-1.0</extURI></svcExtension>
    </svcMenu>
  </greeting>
</epp>"#
    )
}

/// Response echoing the request's clTRID
pub fn response(request: &str, code: u16, msg: &str, res_data: &str) -> String {
    let trid = cl_trid(request).unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<epp xmlns="{EPP_NS}">
  <response>
    <result code="{code}"><msg>{msg}</msg></result>
    {res_data}
    <trID><clTRID>{trid}</clTRID><svTRID>SRV-{code}</svTRID></trID>
  </response>
</epp>"#
    )
}

pub fn ok(request: &str) -> String {
    response(request, 1000, "Command completed successfully", "")
}

pub fn error(request: &str, code: u16, msg: &str) -> String {
    response(request, code, msg, "")
}

pub fn not_found(request: &str) -> String {
    error(request, 2303, "Object does not exist")
}

fn check_data(
    ns_prefix: &str,
    ns: &str,
    key: &str,
    entries: &[(&str, bool, Option<&str>)],
) -> String {
    let cds: String = entries
        .iter()
        .map(|(name, avail, reason)| {
            let reason = reason
                .map(|r| format!("<{p}:reason>{r}</{p}:reason>", p = ns_prefix))
                .unwrap_or_default();
            format!(
                "<{p}:cd><{p}:{key} avail=\"{a}\">{name}</{p}:{key}>{reason}</{p}:cd>",
                p = ns_prefix,
                a = if *avail { 1 } else { 0 }
            )
        })
        .collect();
    format!(
        "<resData><{p}:chkData xmlns:{p}=\"{ns}\">{cds}</{p}:chkData></resData>",
        p = ns_prefix
    )
}

pub fn domain_check(request: &str, name: &str, avail: bool, reason: Option<&str>) -> String {
    let data = check_data("domain", DOMAIN_NS, "name", &[(name, avail, reason)]);
    response(request, 1000, "Command completed successfully", &data)
}

pub fn host_check(request: &str, name: &str, avail: bool) -> String {
    let data = check_data("host", HOST_NS, "name", &[(name, avail, None)]);
    response(request, 1000, "Command completed successfully", &data)
}

pub fn contact_check(request: &str, id: &str, avail: bool) -> String {
    let data = check_data("contact", CONTACT_NS, "id", &[(id, avail, None)]);
    response(request, 1000, "Command completed successfully", &data)
}

pub fn host_info(request: &str, name: &str, addresses: &[&str]) -> String {
    let addrs: String = addresses
        .iter()
        .map(|a| {
            let family = if a.contains(':') { "v6" } else { "v4" };
            format!("<host:addr ip=\"{}\">{}</host:addr>", family, a)
        })
        .collect();
    let data = format!(
        r#"<resData><host:infData xmlns:host="{HOST_NS}">
        <host:name>{name}</host:name>
        <host:roid>{name}-ROID</host:roid>
        <host:status s="linked"/>
        {addrs}
        <host:clID>registrar1</host:clID>
        <host:crDate>2026-01-01T00:00:00.0Z</host:crDate>
      </host:infData></resData>"#
    );
    response(request, 1000, "Command completed successfully", &data)
}

/// Domain as the scripted registry reports it
pub struct DomainFixture {
    pub name: String,
    pub statuses: Vec<String>,
    pub nameservers: Vec<String>,
    pub registrant: Option<String>,
    pub admin: Option<String>,
    pub tech: Option<String>,
    pub billing: Option<String>,
    /// Nameservers reported as `<domain:hostAttr>`
    pub host_attrs: Vec<String>,
    pub ex_date: String,
    pub auth: String,
}

impl DomainFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            statuses: vec!["ok".to_string()],
            nameservers: vec!["ns1.dns.test".to_string(), "ns2.dns.test".to_string()],
            registrant: Some("REG1".to_string()),
            admin: Some("REG1".to_string()),
            tech: Some("TECH1".to_string()),
            billing: None,
            host_attrs: Vec::new(),
            ex_date: "2027-03-09T12:00:00.0Z".to_string(),
            auth: format!("auth-{}", name),
        }
    }

    pub fn statuses(mut self, statuses: &[&str]) -> Self {
        self.statuses = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn nameservers(mut self, hosts: &[&str]) -> Self {
        self.nameservers = hosts.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Every contact role, registrant included, held by one contact
    pub fn single_contact(mut self, id: &str) -> Self {
        self.registrant = Some(id.to_string());
        self.admin = Some(id.to_string());
        self.tech = Some(id.to_string());
        self.billing = Some(id.to_string());
        self
    }

    pub fn host_attrs(mut self, hosts: &[&str]) -> Self {
        self.host_attrs = hosts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn info(&self, request: &str) -> String {
        let statuses: String = self
            .statuses
            .iter()
            .map(|s| format!("<domain:status s=\"{}\"/>", s))
            .collect();
        let registrant = self
            .registrant
            .as_ref()
            .map(|r| format!("<domain:registrant>{}</domain:registrant>", r))
            .unwrap_or_default();
        let contacts: String = [
            ("admin", self.admin.as_deref()),
            ("tech", self.tech.as_deref()),
            ("billing", self.billing.as_deref()),
        ]
        .into_iter()
        .filter_map(|(role, id)| {
            id.map(|id| format!("<domain:contact type=\"{}\">{}</domain:contact>", role, id))
        })
        .collect();
        let hosts: String = self
            .nameservers
            .iter()
            .map(|h| format!("<domain:hostObj>{}</domain:hostObj>", h))
            .chain(self.host_attrs.iter().map(|h| {
                format!(
                    "<domain:hostAttr><domain:hostName>{}</domain:hostName></domain:hostAttr>",
                    h
                )
            }))
            .collect();
        let data = format!(
            r#"<resData>
      <domain:infData xmlns:domain="{DOMAIN_NS}">
        <domain:name>{name}</domain:name>
        <domain:roid>{roid}</domain:roid>
        {statuses}
        {registrant}
        {contacts}
        <domain:ns>{hosts}</domain:ns>
        <domain:clID>registrar1</domain:clID>
        <domain:crDate>2020-03-09T12:00:00.0Z</domain:crDate>
        <domain:exDate>{ex_date}</domain:exDate>
        <domain:authInfo><domain:pw>{auth}</domain:pw></domain:authInfo>
      </domain:infData>
    </resData>"#,
            name = self.name,
            roid = format!("{}-ROID", self.name.to_uppercase()),
            ex_date = self.ex_date,
            auth = self.auth,
        );
        response(request, 1000, "Command completed successfully", &data)
    }
}

pub fn domain_created(request: &str, name: &str) -> String {
    let data = format!(
        r#"<resData><domain:creData xmlns:domain="{DOMAIN_NS}">
        <domain:name>{name}</domain:name>
        <domain:crDate>2026-10-19T08:00:00.0Z</domain:crDate>
        <domain:exDate>2027-10-19T08:00:00.0Z</domain:exDate>
      </domain:creData></resData>"#
    );
    response(request, 1000, "Command completed successfully", &data)
}

pub fn domain_renewed(request: &str, name: &str, ex_date: &str) -> String {
    let data = format!(
        r#"<resData><domain:renData xmlns:domain="{DOMAIN_NS}">
        <domain:name>{name}</domain:name>
        <domain:exDate>{ex_date}</domain:exDate>
      </domain:renData></resData>"#
    );
    response(request, 1000, "Command completed successfully", &data)
}

pub fn transfer_data(request: &str, code: u16, name: &str, status: &str) -> String {
    let data = format!(
        r#"<resData><domain:trnData xmlns:domain="{DOMAIN_NS}">
        <domain:name>{name}</domain:name>
        <domain:trStatus>{status}</domain:trStatus>
        <domain:reID>registrar1</domain:reID>
        <domain:reDate>2026-10-19T08:00:00.0Z</domain:reDate>
        <domain:acID>registrar2</domain:acID>
        <domain:acDate>2026-10-24T08:00:00.0Z</domain:acDate>
      </domain:trnData></resData>"#
    );
    response(request, code, "Command completed successfully; action pending", &data)
}

pub fn contact_created(request: &str) -> String {
    let id = element_text(request, "contact:id").unwrap_or("C-NEW");
    let data = format!(
        r#"<resData><contact:creData xmlns:contact="{CONTACT_NS}">
        <contact:id>{id}</contact:id>
        <contact:crDate>2026-10-19T08:00:00.0Z</contact:crDate>
      </contact:creData></resData>"#
    );
    response(request, 1000, "Command completed successfully", &data)
}

pub fn contact_info(request: &str, id: &str, name: &str, voice: &str) -> String {
    let data = format!(
        r#"<resData><contact:infData xmlns:contact="{CONTACT_NS}">
        <contact:id>{id}</contact:id>
        <contact:roid>{id}-ROID</contact:roid>
        <contact:status s="ok"/>
        <contact:postalInfo type="int">
          <contact:name>{name}</contact:name>
          <contact:org>Acme Widgets</contact:org>
          <contact:addr>
            <contact:street>1 Main Street</contact:street>
            <contact:street>Floor 2</contact:street>
            <contact:city>Springfield</contact:city>
            <contact:sp>IL</contact:sp>
            <contact:pc>62701</contact:pc>
            <contact:cc>US</contact:cc>
          </contact:addr>
        </contact:postalInfo>
        <contact:voice>{voice}</contact:voice>
        <contact:email>owner@acme.test</contact:email>
        <contact:clID>registrar1</contact:clID>
      </contact:infData></resData>"#
    );
    response(request, 1000, "Command completed successfully", &data)
}
