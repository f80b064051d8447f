//! EPP command construction
//!
//! [`CommandFactory`] has one method per (operation, object type) pair.
//! Each returns an immutable [`Command`] carrying the serialized document
//! and its client transaction id.

mod xml;

pub use xml::Element;

use chrono::{NaiveDate, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::config::DataSet;
use crate::model::{ContactRecord, DomainRecord, HostRecord};

pub const EPP_NS: &str = "urn:ietf:params:xml:ns:epp-1.0";
pub const DOMAIN_NS: &str = "urn:ietf:params:xml:ns:domain-1.0";
pub const CONTACT_NS: &str = "urn:ietf:params:xml:ns:contact-1.0";
pub const HOST_NS: &str = "urn:ietf:params:xml:ns:host-1.0";
pub const SECDNS_NS: &str = "urn:ietf:params:xml:ns:secDNS-1.1";
pub const RGP_NS: &str = "urn:ietf:params:xml:ns:rgp-1.0";

/// EPP command verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Hello,
    Login,
    Logout,
    Check,
    Info,
    Create,
    Update,
    Renew,
    Transfer,
    Delete,
}

impl CommandKind {
    fn as_str(self) -> &'static str {
        match self {
            CommandKind::Hello => "hello",
            CommandKind::Login => "login",
            CommandKind::Logout => "logout",
            CommandKind::Check => "check",
            CommandKind::Info => "info",
            CommandKind::Create => "create",
            CommandKind::Update => "update",
            CommandKind::Renew => "renew",
            CommandKind::Transfer => "transfer",
            CommandKind::Delete => "delete",
        }
    }
}

/// Object type a command acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Session,
    Domain,
    Contact,
    Host,
}

impl ObjectType {
    fn as_str(self) -> &'static str {
        match self {
            ObjectType::Session => "session",
            ObjectType::Domain => "domain",
            ObjectType::Contact => "contact",
            ObjectType::Host => "host",
        }
    }
}

/// A fully built EPP command
#[derive(Debug, Clone)]
pub struct Command {
    kind: CommandKind,
    object: ObjectType,
    xml: String,
    transaction_id: Option<String>,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn object(&self) -> ObjectType {
        self.object
    }

    /// Serialized document
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Client transaction id (`None` for `hello`)
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Short operation label, e.g. `domain-check` or `login`
    pub fn label(&self) -> String {
        operation_label(self.kind, self.object)
    }
}

fn operation_label(kind: CommandKind, object: ObjectType) -> String {
    match object {
        ObjectType::Session => kind.as_str().to_string(),
        _ => format!("{}-{}", object.as_str(), kind.as_str()),
    }
}

/// Disclosure flag value on the wire
///
/// `0` hides the listed fields (privacy on), `1` shows them.
fn disclose_flag(enable_privacy: bool) -> &'static str {
    if enable_privacy { "0" } else { "1" }
}

/// Builds EPP commands for one session
pub struct CommandFactory {
    prefix: String,
    data_set: DataSet,
    last_millis: AtomicI64,
}

impl CommandFactory {
    pub fn new(prefix: impl Into<String>, data_set: DataSet) -> Self {
        Self {
            prefix: prefix.into(),
            data_set,
            last_millis: AtomicI64::new(0),
        }
    }

    pub fn data_set(&self) -> DataSet {
        self.data_set
    }

    /// Next transaction id: `{prefix}-{operation}-{epoch millis}`
    ///
    /// Millis never repeat: when the clock has not advanced since the last
    /// id, the next millisecond is used instead.
    fn next_transaction_id(&self, label: &str) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_millis.load(Ordering::Relaxed);
        let millis = loop {
            let candidate = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break candidate,
                Err(actual) => last = actual,
            }
        };
        format!("{}-{}-{}", self.prefix, label, millis)
    }

    /// Wrap `body` in `<epp><command>...<clTRID/></command></epp>`
    fn command(
        &self,
        kind: CommandKind,
        object: ObjectType,
        body: Element,
        extension: Option<Element>,
    ) -> Result<Command, crate::Error> {
        let transaction_id = self.next_transaction_id(&operation_label(kind, object));

        let mut command = Element::new("command").child(body);
        if let Some(extension) = extension {
            command = command.child(Element::new("extension").child(extension));
        }
        command = command.child(Element::new("clTRID").text(transaction_id.as_str()));

        let xml = Element::new("epp")
            .attr("xmlns", EPP_NS)
            .child(command)
            .to_document()?;

        Ok(Command {
            kind,
            object,
            xml,
            transaction_id: Some(transaction_id),
        })
    }

    /// `<verb><prefix:verb xmlns:prefix=...>children</prefix:verb></verb>`
    fn object_command(
        &self,
        kind: CommandKind,
        object: ObjectType,
        inner: Element,
        extension: Option<Element>,
    ) -> Result<Command, crate::Error> {
        let body = Element::new(kind.as_str()).child(inner);
        self.command(kind, object, body, extension)
    }

    // Session

    pub fn hello(&self) -> Result<Command, crate::Error> {
        let xml = Element::new("epp")
            .attr("xmlns", EPP_NS)
            .child(Element::new("hello"))
            .to_document()?;
        Ok(Command {
            kind: CommandKind::Hello,
            object: ObjectType::Session,
            xml,
            transaction_id: None,
        })
    }

    pub fn login(
        &self,
        client_id: &str,
        password: &str,
        new_password: Option<&str>,
    ) -> Result<Command, crate::Error> {
        let mut login = Element::new("login")
            .child(Element::new("clID").text(client_id))
            .child(Element::new("pw").text(password));
        if let Some(new_password) = new_password {
            login = login.text_child("newPW", new_password);
        }

        let login = login
            .child(
                Element::new("options")
                    .child(Element::new("version").text("1.0"))
                    .child(Element::new("lang").text("en")),
            )
            .child(
                Element::new("svcs")
                    .child(Element::new("objURI").text(DOMAIN_NS))
                    .child(Element::new("objURI").text(CONTACT_NS))
                    .child(Element::new("objURI").text(HOST_NS))
                    .child(
                        Element::new("svcExtension")
                            .child(Element::new("extURI").text(SECDNS_NS))
                            .child(Element::new("extURI").text(RGP_NS)),
                    ),
            );

        self.command(CommandKind::Login, ObjectType::Session, login, None)
    }

    pub fn logout(&self) -> Result<Command, crate::Error> {
        self.command(
            CommandKind::Logout,
            ObjectType::Session,
            Element::new("logout"),
            None,
        )
    }

    // Domain

    fn domain(verb: &str) -> Element {
        Element::new(format!("domain:{}", verb)).attr("xmlns:domain", DOMAIN_NS)
    }

    pub fn domain_check(&self, names: &[&str]) -> Result<Command, crate::Error> {
        let check = Self::domain("check").children(
            names
                .iter()
                .map(|name| Element::new("domain:name").text(*name)),
        );
        self.object_command(CommandKind::Check, ObjectType::Domain, check, None)
    }

    pub fn domain_info(&self, name: &str) -> Result<Command, crate::Error> {
        let info = Self::domain("info")
            .child(Element::new("domain:name").attr("hosts", "all").text(name));
        self.object_command(CommandKind::Info, ObjectType::Domain, info, None)
    }

    /// Domain create; contact references only in the full data set
    pub fn domain_create(
        &self,
        domain: &DomainRecord,
        auth_password: &str,
    ) -> Result<Command, crate::Error> {
        let mut create = Self::domain("create")
            .child(Element::new("domain:name").text(domain.name.as_str()))
            .child(
                Element::new("domain:period")
                    .attr("unit", "y")
                    .text(domain.period_years.to_string()),
            )
            .nonempty_child(
                Element::new("domain:ns").children(
                    domain
                        .nameservers
                        .iter()
                        .map(|ns| Element::new("domain:hostObj").text(ns)),
                ),
            );

        if self.data_set.includes_contacts() {
            let contacts = &domain.contacts;
            create = create.text_child(
                "domain:registrant",
                contacts.registrant.as_deref().unwrap_or_default(),
            );
            for (role, id) in [
                ("admin", &contacts.admin),
                ("tech", &contacts.tech),
                ("billing", &contacts.billing),
            ] {
                if let Some(id) = id.as_deref().filter(|id| !id.trim().is_empty()) {
                    create = create
                        .child(Element::new("domain:contact").attr("type", role).text(id));
                }
            }
        }

        let create = create.child(
            Element::new("domain:authInfo").child(Element::new("domain:pw").text(auth_password)),
        );
        self.object_command(CommandKind::Create, ObjectType::Domain, create, None)
    }

    /// Nameserver update with only the non-empty add/rem blocks
    pub fn domain_update_nameservers(
        &self,
        name: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<Command, crate::Error> {
        let ns_block = |tag: &str, hosts: &[String]| {
            Element::new(tag).nonempty_child(
                Element::new("domain:ns").children(
                    hosts
                        .iter()
                        .filter(|h| !h.trim().is_empty())
                        .map(|h| Element::new("domain:hostObj").text(h.as_str())),
                ),
            )
        };

        let update = Self::domain("update")
            .child(Element::new("domain:name").text(name))
            .nonempty_child(ns_block("domain:add", add))
            .nonempty_child(ns_block("domain:rem", remove));
        self.object_command(CommandKind::Update, ObjectType::Domain, update, None)
    }

    /// Status update with only the non-empty add/rem blocks
    pub fn domain_update_status(
        &self,
        name: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<Command, crate::Error> {
        let status_block = |tag: &str, statuses: &[&str]| {
            Element::new(tag).children(statuses.iter().map(|s| {
                Element::new("domain:status")
                    .attr("s", *s)
                    .attr("lang", "en")
            }))
        };

        let update = Self::domain("update")
            .child(Element::new("domain:name").text(name))
            .nonempty_child(status_block("domain:add", add))
            .nonempty_child(status_block("domain:rem", remove));
        self.object_command(CommandKind::Update, ObjectType::Domain, update, None)
    }

    pub fn domain_renew(
        &self,
        name: &str,
        current_expiry: NaiveDate,
        years: u8,
    ) -> Result<Command, crate::Error> {
        let renew = Self::domain("renew")
            .child(Element::new("domain:name").text(name))
            .child(
                Element::new("domain:curExpDate")
                    .text(current_expiry.format("%Y-%m-%d").to_string()),
            )
            .child(
                Element::new("domain:period")
                    .attr("unit", "y")
                    .text(years.to_string()),
            );
        self.object_command(CommandKind::Renew, ObjectType::Domain, renew, None)
    }

    pub fn domain_transfer_request(
        &self,
        name: &str,
        years: u8,
        auth_info: &str,
    ) -> Result<Command, crate::Error> {
        let transfer = Self::domain("transfer")
            .child(Element::new("domain:name").text(name))
            .child(
                Element::new("domain:period")
                    .attr("unit", "y")
                    .text(years.to_string()),
            )
            .child(
                Element::new("domain:authInfo").child(Element::new("domain:pw").text(auth_info)),
            );
        let body = Element::new("transfer").attr("op", "request").child(transfer);
        self.command(CommandKind::Transfer, ObjectType::Domain, body, None)
    }

    pub fn domain_transfer_query(&self, name: &str) -> Result<Command, crate::Error> {
        let transfer = Self::domain("transfer").child(Element::new("domain:name").text(name));
        let body = Element::new("transfer").attr("op", "query").child(transfer);
        self.command(CommandKind::Transfer, ObjectType::Domain, body, None)
    }

    pub fn domain_delete(&self, name: &str) -> Result<Command, crate::Error> {
        let delete = Self::domain("delete").child(Element::new("domain:name").text(name));
        self.object_command(CommandKind::Delete, ObjectType::Domain, delete, None)
    }

    /// RGP restore request: an empty `domain:chg` plus the rgp extension
    pub fn domain_restore(&self, name: &str) -> Result<Command, crate::Error> {
        let update = Self::domain("update")
            .child(Element::new("domain:name").text(name))
            .child(Element::new("domain:chg"));
        let extension = Element::new("rgp:update")
            .attr("xmlns:rgp", RGP_NS)
            .child(Element::new("rgp:restore").attr("op", "request"));
        self.object_command(
            CommandKind::Update,
            ObjectType::Domain,
            update,
            Some(extension),
        )
    }

    // Contact

    fn contact(verb: &str) -> Element {
        Element::new(format!("contact:{}", verb)).attr("xmlns:contact", CONTACT_NS)
    }

    fn postal_info(contact: &ContactRecord) -> Element {
        let address = &contact.address;
        Element::new("contact:postalInfo")
            .attr("type", "int")
            .text_child("contact:name", &contact.name)
            .text_child("contact:org", &contact.organization)
            .nonempty_child(
                Element::new("contact:addr")
                    .text_child("contact:street", &address.street1)
                    .text_child("contact:street", &address.street2)
                    .text_child("contact:city", &address.city)
                    .text_child("contact:sp", &address.state)
                    .text_child("contact:pc", &address.postcode)
                    .text_child("contact:cc", &address.country),
            )
    }

    pub fn contact_check(&self, ids: &[&str]) -> Result<Command, crate::Error> {
        let check = Self::contact("check")
            .children(ids.iter().map(|id| Element::new("contact:id").text(*id)));
        self.object_command(CommandKind::Check, ObjectType::Contact, check, None)
    }

    pub fn contact_info(&self, id: &str) -> Result<Command, crate::Error> {
        let info = Self::contact("info").child(Element::new("contact:id").text(id));
        self.object_command(CommandKind::Info, ObjectType::Contact, info, None)
    }

    /// Contact create; `contact.id` and `auth_password` must already be set
    pub fn contact_create(
        &self,
        contact: &ContactRecord,
        auth_password: &str,
    ) -> Result<Command, crate::Error> {
        let create = Self::contact("create")
            .child(Element::new("contact:id").text(contact.id.as_str()))
            .nonempty_child(Self::postal_info(contact))
            .text_child("contact:voice", &contact.voice())
            .text_child("contact:email", &contact.email)
            .child(
                Element::new("contact:authInfo")
                    .child(Element::new("contact:pw").text(auth_password)),
            );
        self.object_command(CommandKind::Create, ObjectType::Contact, create, None)
    }

    /// Replace postal info, voice and email of contact `id`
    pub fn contact_update(
        &self,
        id: &str,
        contact: &ContactRecord,
    ) -> Result<Command, crate::Error> {
        let update = Self::contact("update")
            .child(Element::new("contact:id").text(id))
            .nonempty_child(
                Element::new("contact:chg")
                    .nonempty_child(Self::postal_info(contact))
                    .text_child("contact:voice", &contact.voice())
                    .text_child("contact:email", &contact.email),
            );
        self.object_command(CommandKind::Update, ObjectType::Contact, update, None)
    }

    /// Disclosure update covering name, address, organization, voice, fax
    /// and email
    pub fn contact_disclose(
        &self,
        id: &str,
        enable_privacy: bool,
    ) -> Result<Command, crate::Error> {
        let disclose = Element::new("contact:disclose")
            .attr("flag", disclose_flag(enable_privacy))
            .child(Element::new("contact:name").attr("type", "int"))
            .child(Element::new("contact:addr").attr("type", "int"))
            .child(Element::new("contact:org").attr("type", "int"))
            .child(Element::new("contact:voice"))
            .child(Element::new("contact:fax"))
            .child(Element::new("contact:email"));

        let update = Self::contact("update")
            .child(Element::new("contact:id").text(id))
            .child(Element::new("contact:chg").child(disclose));
        self.object_command(CommandKind::Update, ObjectType::Contact, update, None)
    }

    pub fn contact_delete(&self, id: &str) -> Result<Command, crate::Error> {
        let delete = Self::contact("delete").child(Element::new("contact:id").text(id));
        self.object_command(CommandKind::Delete, ObjectType::Contact, delete, None)
    }

    // Host

    fn host(verb: &str) -> Element {
        Element::new(format!("host:{}", verb)).attr("xmlns:host", HOST_NS)
    }

    pub fn host_check(&self, names: &[&str]) -> Result<Command, crate::Error> {
        let check = Self::host("check")
            .children(names.iter().map(|name| Element::new("host:name").text(*name)));
        self.object_command(CommandKind::Check, ObjectType::Host, check, None)
    }

    pub fn host_info(&self, name: &str) -> Result<Command, crate::Error> {
        let info = Self::host("info").child(Element::new("host:name").text(name));
        self.object_command(CommandKind::Info, ObjectType::Host, info, None)
    }

    pub fn host_create(&self, host: &HostRecord) -> Result<Command, crate::Error> {
        let create = Self::host("create")
            .child(Element::new("host:name").text(host.name.as_str()))
            .children(host.addresses.iter().map(|addr| {
                let family = if addr.is_ipv4() { "v4" } else { "v6" };
                Element::new("host:addr")
                    .attr("ip", family)
                    .text(addr.to_string())
            }));
        self.object_command(CommandKind::Create, ObjectType::Host, create, None)
    }

    pub fn host_delete(&self, name: &str) -> Result<Command, crate::Error> {
        let delete = Self::host("delete").child(Element::new("host:name").text(name));
        self.object_command(CommandKind::Delete, ObjectType::Host, delete, None)
    }
}
