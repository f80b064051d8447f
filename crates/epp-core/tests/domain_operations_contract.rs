//! Contract Test: Registrar Operations
//!
//! Constraints verified:
//! - Registration checks first and never creates a taken domain
//! - Full data set creates one contact for all roles; minimal creates none
//! - Nameserver updates send only the difference
//! - Lock/unlock are idempotent
//! - Disclosure touches each distinct contact once
//! - Inline (hostAttr) nameservers are never diffed as host objects
//! - Renew is anchored on the registry expiration date

mod common;

use std::sync::{Arc, Mutex};

use chrono::{Datelike, TimeZone, Utc};
use common::*;
use epp_core::config::DataSet;
use epp_core::traits::{ContactOps, DomainOps, HostOps};
use epp_core::{ContactRecord, DomainRecord, Error, HostRecord, Nameservers, PostalAddress};

fn owner() -> ContactRecord {
    ContactRecord {
        name: "Jane Doe".into(),
        organization: "Acme & Sons".into(),
        address: PostalAddress {
            street1: "1 Main Street".into(),
            city: "Springfield".into(),
            postcode: "62701".into(),
            country: "US".into(),
            ..PostalAddress::default()
        },
        phone_country_code: "1".into(),
        phone_number: "5555551234".into(),
        email: "jane@acme.test".into(),
        ..ContactRecord::default()
    }
}

fn new_domain() -> DomainRecord {
    DomainRecord::new("fresh.test")
        .with_nameservers(Nameservers::new(["ns1.dns.test", "ns2.dns.test"]).unwrap())
}

/// Registry that accepts a registration; ns1 is unknown, ns2 exists
fn registration_handler(request: &str) -> Option<String> {
    match command_name(request).as_str() {
        "domain:check" => Some(domain_check(request, "fresh.test", true, None)),
        "contact:create" => Some(contact_created(request)),
        "host:check" => {
            let unknown = request.contains("ns1.dns.test");
            let name = if unknown { "ns1.dns.test" } else { "ns2.dns.test" };
            Some(host_check(request, name, unknown))
        }
        "host:create" => Some(ok(request)),
        "domain:create" => Some(domain_created(request, "fresh.test")),
        _ => None,
    }
}

#[tokio::test]
async fn register_in_full_mode_creates_contact_and_missing_hosts() {
    let (mut client, registry) = logged_in(DataSet::Full, registration_handler).await;

    let created = client.register_domain(&new_domain(), &owner()).await.unwrap();
    assert_eq!(created.name, "fresh.test");
    assert_eq!(created.expires_at.unwrap().year(), 2027);

    assert_eq!(
        registry.commands(),
        vec![
            "login",
            "domain:check",
            "contact:create",
            "host:check",
            "host:create",
            "host:check",
            "domain:create",
        ]
    );

    let contact_id = created.contact_id.unwrap();
    assert_eq!(contact_id.len(), 12);

    let contact = &registry.requests_for("contact:create")[0];
    assert!(contact.contains("Acme &amp; Sons"));
    assert!(contact.contains("<contact:voice>+1.5555551234</contact:voice>"));

    let host = &registry.requests_for("host:create")[0];
    assert!(host.contains("<host:name>ns1.dns.test</host:name>"));

    let create = &registry.requests_for("domain:create")[0];
    assert!(create.contains(&format!("<domain:registrant>{}</domain:registrant>", contact_id)));
    for role in ["admin", "tech", "billing"] {
        assert!(create.contains(&format!(
            "<domain:contact type=\"{}\">{}</domain:contact>",
            role, contact_id
        )));
    }
    assert!(create.contains(&format!("<domain:pw>{}</domain:pw>", created.auth_info)));
    assert!(created.auth_info.starts_with("aA1"));
}

#[tokio::test]
async fn register_in_minimal_mode_omits_contacts() {
    let (mut client, registry) = logged_in(DataSet::Minimal, registration_handler).await;

    let created = client.register_domain(&new_domain(), &owner()).await.unwrap();
    assert_eq!(created.contact_id, None);
    assert_eq!(registry.count("contact:create"), 0);

    let create = &registry.requests_for("domain:create")[0];
    assert!(!create.contains("domain:registrant"));
    assert!(!create.contains("domain:contact"));
    assert!(create.contains("<domain:hostObj>ns2.dns.test</domain:hostObj>"));
}

#[tokio::test]
async fn registration_sends_one_host_object_per_nameserver() {
    let (mut client, registry) = logged_in(DataSet::Full, registration_handler).await;

    let domain = DomainRecord::new("fresh.test")
        .with_nameservers(Nameservers::new(["ns1.dns.test", "", "ns2.dns.test", " "]).unwrap());
    client.register_domain(&domain, &owner()).await.unwrap();

    let create = &registry.requests_for("domain:create")[0];
    assert_eq!(create.matches("<domain:hostObj>").count(), 2);
    assert!(!create.contains("<domain:hostObj></domain:hostObj>"));
    assert!(!create.contains("<domain:hostObj/>"));
    assert_eq!(element_text(create, "domain:hostObj"), Some("ns1.dns.test"));
}

#[tokio::test]
async fn taken_domain_is_never_created() {
    let (mut client, registry) = logged_in(DataSet::Full, |request| {
        Some(domain_check(request, "fresh.test", false, Some("In use")))
    })
    .await;

    let err = client.register_domain(&new_domain(), &owner()).await.unwrap_err();
    match err {
        Error::DomainUnavailable { name, reason } => {
            assert_eq!(name, "fresh.test");
            assert_eq!(reason, "In use");
        }
        other => panic!("expected unavailable, got {:?}", other),
    }
    assert_eq!(registry.commands(), vec!["login", "domain:check"]);
}

#[tokio::test]
async fn unavailable_without_reason_uses_default_message() {
    let (mut client, _registry) = logged_in(DataSet::Full, |request| {
        Some(domain_check(request, "fresh.test", false, None))
    })
    .await;

    assert!(!client.check_availability("fresh.test").await.unwrap());
    let err = client.register_domain(&new_domain(), &owner()).await.unwrap_err();
    assert_eq!(err.to_string(), "fresh.test Domain is not available");
}

#[tokio::test]
async fn available_domain_checks_true() {
    let (mut client, registry) = logged_in(DataSet::Full, |request| {
        Some(domain_check(request, "fresh.test", true, None))
    })
    .await;

    assert!(client.check_availability("fresh.test").await.unwrap());
    let check = &registry.requests_for("domain:check")[0];
    assert_eq!(element_text(check, "domain:name"), Some("fresh.test"));
}

#[tokio::test]
async fn nameserver_update_sends_only_the_difference() {
    let fixture = DomainFixture::new("example.test").nameservers(&["ns1.dns.test", "ns2.dns.test"]);
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => Some(fixture.info(request)),
            "domain:update" => Some(ok(request)),
            _ => None,
        }
    })
    .await;

    let domain = DomainRecord::new("example.test")
        .with_nameservers(Nameservers::new(["NS2.dns.test", "ns3.dns.test"]).unwrap());
    let diff = client.update_nameservers(&domain).await.unwrap();
    assert_eq!(diff.add, vec!["ns3.dns.test"]);
    assert_eq!(diff.remove, vec!["ns1.dns.test"]);

    let update = &registry.requests_for("domain:update")[0];
    let add = update.find("<domain:add>").unwrap();
    let rem = update.find("<domain:rem>").unwrap();
    assert!(add < rem);
    assert!(update[add..rem].contains("ns3.dns.test"));
    assert!(update[rem..].contains("ns1.dns.test"));
    assert!(!update.contains("ns2.dns.test"));

    let unchanged = DomainRecord::new("example.test")
        .with_nameservers(Nameservers::new(["ns1.dns.test", "ns2.dns.test"]).unwrap());
    assert!(client.update_nameservers(&unchanged).await.unwrap().is_empty());
    assert_eq!(registry.count("domain:update"), 1);
}

#[tokio::test]
async fn inline_nameservers_are_never_sent_as_host_objects() {
    let fixture = DomainFixture::new("glue.test")
        .nameservers(&["ns1.dns.test"])
        .host_attrs(&["ns.glue.test"]);
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => Some(fixture.info(request)),
            "domain:update" => Some(ok(request)),
            _ => None,
        }
    })
    .await;

    let domain = DomainRecord::new("glue.test")
        .with_nameservers(Nameservers::new(["ns.glue.test", "ns3.dns.test"]).unwrap());
    let diff = client.update_nameservers(&domain).await.unwrap();
    assert_eq!(diff.add, vec!["ns3.dns.test"]);
    assert_eq!(diff.remove, vec!["ns1.dns.test"]);

    let update = &registry.requests_for("domain:update")[0];
    assert!(!update.contains("ns.glue.test"));

    let kept = DomainRecord::new("glue.test")
        .with_nameservers(Nameservers::new(["ns1.dns.test", "ns.glue.test"]).unwrap());
    assert!(client.update_nameservers(&kept).await.unwrap().is_empty());
    assert_eq!(registry.count("domain:update"), 1);
}

#[tokio::test]
async fn lock_is_idempotent() {
    let fixture = DomainFixture::new("locked.test")
        .statuses(&["clientDeleteProhibited", "clientTransferProhibited"]);
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => Some(fixture.info(request)),
            _ => Some(ok(request)),
        }
    })
    .await;

    let domain = DomainRecord::new("locked.test");
    assert!(!client.lock_domain(&domain).await.unwrap());
    assert_eq!(registry.count("domain:update"), 0);

    assert!(client.unlock_domain(&domain).await.unwrap());
    let update = &registry.requests_for("domain:update")[0];
    assert!(update.contains("<domain:rem>"));
    assert!(!update.contains("<domain:add>"));
    assert!(update.contains("s=\"clientDeleteProhibited\""));
    assert!(update.contains("s=\"clientTransferProhibited\""));
}

#[tokio::test]
async fn locking_twice_updates_once() {
    let locked = Arc::new(Mutex::new(false));
    let state = locked.clone();
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => {
                let statuses: &[&str] = if *state.lock().unwrap() {
                    &["clientDeleteProhibited", "clientTransferProhibited"]
                } else {
                    &["ok"]
                };
                Some(DomainFixture::new("open.test").statuses(statuses).info(request))
            }
            "domain:update" => {
                *state.lock().unwrap() = true;
                Some(ok(request))
            }
            _ => None,
        }
    })
    .await;

    let domain = DomainRecord::new("open.test");
    assert!(client.lock_domain(&domain).await.unwrap());
    assert!(!client.lock_domain(&domain).await.unwrap());
    assert!(*locked.lock().unwrap());
    assert_eq!(registry.count("domain:update"), 1);
    assert_eq!(registry.count("domain:info"), 2);
}

#[tokio::test]
async fn lock_adds_only_missing_statuses() {
    let fixture = DomainFixture::new("half.test").statuses(&["clientTransferProhibited"]);
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => Some(fixture.info(request)),
            _ => Some(ok(request)),
        }
    })
    .await;

    assert!(client.lock_domain(&DomainRecord::new("half.test")).await.unwrap());
    let update = &registry.requests_for("domain:update")[0];
    assert!(update.contains("<domain:add>"));
    assert!(update.contains("s=\"clientDeleteProhibited\""));
    assert!(!update.contains("s=\"clientTransferProhibited\""));
}

#[tokio::test]
async fn disclosure_updates_each_distinct_contact_once() {
    // Registrant and admin share REG1, tech is TECH1
    let fixture = DomainFixture::new("private.test");
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => Some(fixture.info(request)),
            _ => Some(ok(request)),
        }
    })
    .await;

    let sent = client
        .toggle_contact_disclosure(&DomainRecord::new("private.test"), true)
        .await
        .unwrap();
    assert_eq!(sent, 2);

    let updates = registry.requests_for("contact:update");
    assert_eq!(updates.len(), 2);
    assert_eq!(element_text(&updates[0], "contact:id"), Some("REG1"));
    assert_eq!(element_text(&updates[1], "contact:id"), Some("TECH1"));
    assert!(updates.iter().all(|u| u.contains("flag=\"0\"")));
}

#[tokio::test]
async fn disclosure_with_one_contact_in_every_role_sends_one_update() {
    let fixture = DomainFixture::new("solo.test").single_contact("SOLO1");
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => Some(fixture.info(request)),
            _ => Some(ok(request)),
        }
    })
    .await;

    let sent = client
        .toggle_contact_disclosure(&DomainRecord::new("solo.test"), false)
        .await
        .unwrap();
    assert_eq!(sent, 1);

    let updates = registry.requests_for("contact:update");
    assert_eq!(updates.len(), 1);
    assert_eq!(element_text(&updates[0], "contact:id"), Some("SOLO1"));
    assert!(updates[0].contains("flag=\"1\""));
}

#[tokio::test]
async fn minimal_mode_disables_contact_flows() {
    let (mut client, registry) = logged_in(DataSet::Minimal, |request| Some(ok(request))).await;
    let domain = DomainRecord::new("private.test");

    assert_eq!(client.toggle_contact_disclosure(&domain, true).await.unwrap(), 0);

    let err = client.update_contact_profile(&domain, &owner()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(registry.commands(), vec!["login"]);
}

#[tokio::test]
async fn profile_update_targets_the_registrant() {
    let fixture = DomainFixture::new("owned.test");
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => Some(fixture.info(request)),
            _ => Some(ok(request)),
        }
    })
    .await;

    client
        .update_contact_profile(&DomainRecord::new("owned.test"), &owner())
        .await
        .unwrap();

    let update = &registry.requests_for("contact:update")[0];
    assert_eq!(element_text(update, "contact:id"), Some("REG1"));
    assert!(update.contains("<contact:email>jane@acme.test</contact:email>"));
}

#[tokio::test]
async fn renew_is_anchored_on_registry_expiry() {
    let fixture = DomainFixture::new("renew.test");
    let (mut client, registry) = logged_in(DataSet::Full, move |request| {
        match command_name(request).as_str() {
            "domain:info" => Some(fixture.info(request)),
            "domain:renew" => Some(domain_renewed(request, "renew.test", "2028-03-09T12:00:00.0Z")),
            _ => None,
        }
    })
    .await;

    let renewed = client.renew_domain(&DomainRecord::new("renew.test")).await.unwrap();
    assert_eq!(renewed, Some(Utc.with_ymd_and_hms(2028, 3, 9, 12, 0, 0).unwrap()));

    let renew = &registry.requests_for("domain:renew")[0];
    assert_eq!(element_text(renew, "domain:curExpDate"), Some("2027-03-09"));
    assert!(renew.contains("<domain:period unit=\"y\">1</domain:period>"));
}

#[tokio::test]
async fn transfer_request_and_query() {
    let (mut client, registry) = logged_in(DataSet::Full, |request| {
        Some(transfer_data(request, 1001, "moving.test", "pending"))
    })
    .await;
    let domain = DomainRecord::new("moving.test");

    let err = client.transfer_domain(&domain, "").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let transfer = client.transfer_domain(&domain, "tr@nsfer-Code").await.unwrap();
    assert_eq!(transfer.status, "pending");
    assert_eq!(transfer.acting_id.as_deref(), Some("registrar2"));

    let status = client.transfer_status(&domain).await.unwrap();
    assert_eq!(status.name, "moving.test");

    let requests = registry.requests_for("domain:transfer");
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains("op=\"request\""));
    assert!(requests[0].contains("<domain:pw>tr@nsfer-Code</domain:pw>"));
    assert!(requests[1].contains("op=\"query\""));
}

#[tokio::test]
async fn fetch_details_fills_the_record() {
    let fixture = DomainFixture::new("details.test")
        .statuses(&["ok", "clientHold"])
        .nameservers(&["a.ns.test", "b.ns.test", "c.ns.test", "d.ns.test"])
        .host_attrs(&["e.ns.test"]);
    let (mut client, registry) =
        logged_in(DataSet::Full, move |request| Some(fixture.info(request))).await;

    let mut record = DomainRecord::new("details.test");
    let info = client.fetch_domain_details(&mut record).await.unwrap();

    assert_eq!(info.nameservers.len(), 4);
    assert_eq!(info.host_attrs, vec!["e.ns.test"]);
    assert_eq!(record.nameservers.len(), 4);
    assert_eq!(record.nameservers.slot(3), Some("d.ns.test"));
    assert!(record.status.contains("clientHold"));
    assert_eq!(record.auth_info.as_deref(), Some("auth-details.test"));
    assert_eq!(record.contacts.tech.as_deref(), Some("TECH1"));
    assert_eq!(record.expires_at.unwrap().year(), 2027);

    let auth = client
        .get_transfer_auth_info(&DomainRecord::new("details.test"))
        .await
        .unwrap();
    assert_eq!(auth, "auth-details.test");

    let requests = registry.requests_for("domain:info");
    assert!(requests[0].contains("<domain:name hosts=\"all\">"));
    assert_eq!(element_text(&requests[0], "domain:name"), Some("details.test"));
}

#[tokio::test]
async fn missing_domain_is_reported_as_not_found() {
    let (mut client, _registry) =
        logged_in(DataSet::Full, |request| Some(not_found(request))).await;

    let err = client.domain_info("gone.test").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.protocol_code(), Some(2303));
}

#[tokio::test]
async fn delete_and_restore() {
    let (mut client, registry) = logged_in(DataSet::Full, |request| Some(ok(request))).await;
    let domain = DomainRecord::new("oops.test");

    client.delete_domain(&domain).await.unwrap();
    client.restore_domain(&domain).await.unwrap();

    assert_eq!(registry.commands(), vec!["login", "domain:delete", "domain:update"]);
    let restore = &registry.requests_for("domain:update")[0];
    assert!(restore.contains("<domain:chg/>"));
    assert!(restore.contains("<rgp:restore op=\"request\"/>"));
}

#[tokio::test]
async fn host_objects() {
    let (mut client, registry) = logged_in(DataSet::Full, |request| {
        match command_name(request).as_str() {
            "host:check" => Some(host_check(request, "ns1.glue.test", true)),
            _ => Some(ok(request)),
        }
    })
    .await;

    let checks = client.host_check(&["ns1.glue.test"]).await.unwrap();
    assert!(checks[0].available);

    let host = HostRecord {
        name: "ns1.glue.test".into(),
        addresses: vec!["192.0.2.1".parse().unwrap(), "2001:db8::1".parse().unwrap()],
    };
    client.host_create(&host).await.unwrap();
    client.host_delete("ns1.glue.test").await.unwrap();

    let create = &registry.requests_for("host:create")[0];
    assert!(create.contains("ip=\"v4\">192.0.2.1<"));
    assert!(create.contains("ip=\"v6\">2001:db8::1<"));
    assert_eq!(registry.count("host:delete"), 1);
}

#[tokio::test]
async fn host_info_reports_glue() {
    let (mut client, _registry) = logged_in(DataSet::Full, |request| {
        Some(host_info(request, "ns1.glue.test", &["192.0.2.1", "2001:db8::1"]))
    })
    .await;

    let info = client.host_info("ns1.glue.test").await.unwrap();
    assert_eq!(info.name, "ns1.glue.test");
    assert_eq!(info.statuses, vec!["linked"]);
    assert_eq!(info.addresses.len(), 2);
    assert!(info.addresses[1].is_ipv6());
}

#[tokio::test]
async fn contact_objects() {
    let (mut client, registry) = logged_in(DataSet::Full, |request| {
        match command_name(request).as_str() {
            "contact:check" => Some(contact_check(request, "OWNER1", false)),
            "contact:info" => Some(contact_info(
                request,
                "OWNER1",
                "Ada Lovelace",
                "+44.2071234567",
            )),
            _ => Some(ok(request)),
        }
    })
    .await;

    let checks = client.contact_check(&["OWNER1"]).await.unwrap();
    assert_eq!(checks[0].name, "OWNER1");
    assert!(!checks[0].available);

    let info = client.contact_info("OWNER1").await.unwrap();
    assert_eq!(info.email.as_deref(), Some("owner@acme.test"));
    assert_eq!(info.voice.as_deref(), Some("+44.2071234567"));
    let postal = info.postal.unwrap();
    assert_eq!(postal.name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(postal.street_line(1), "Floor 2");

    client.contact_delete("OWNER1").await.unwrap();
    let delete = &registry.requests_for("contact:delete")[0];
    assert_eq!(element_text(delete, "contact:id"), Some("OWNER1"));
}
