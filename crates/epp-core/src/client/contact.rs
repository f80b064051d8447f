use async_trait::async_trait;
use tracing::{debug, info};

use super::EppClient;
use crate::credentials;
use crate::error::{Error, Result};
use crate::model::{ContactRecord, DomainRecord};
use crate::response::{CheckResult, ContactInfo};
use crate::traits::{ContactOps, DomainOps};

impl EppClient {
    fn require_contacts(&self, operation: &str) -> Result<()> {
        if self.data_set().includes_contacts() {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "{} is unavailable in the minimal data set",
                operation
            )))
        }
    }
}

#[async_trait]
impl ContactOps for EppClient {
    async fn contact_check(&mut self, ids: &[&str]) -> Result<Vec<CheckResult>> {
        debug!("Checking contacts {:?}", ids);
        let response = self.execute(|f| f.contact_check(ids)).await?;
        response.contact_check()
    }

    async fn contact_create(&mut self, contact: &ContactRecord) -> Result<String> {
        self.require_contacts("Contact create")?;

        let mut contact = contact.clone();
        if contact.id.trim().is_empty() {
            contact.id = credentials::generate_object_id();
        }
        info!("Creating contact {}", contact.id);

        let password = credentials::generate_password();
        let response = self
            .execute(|f| f.contact_create(&contact, &password))
            .await?;
        let id = response.contact_created_id()?;
        debug!("Contact {} created", id);
        Ok(id)
    }

    async fn contact_info(&mut self, id: &str) -> Result<ContactInfo> {
        debug!("Fetching contact {}", id);
        let response = self.execute(|f| f.contact_info(id)).await?;
        response.contact_info()
    }

    async fn contact_delete(&mut self, id: &str) -> Result<()> {
        info!("Deleting contact {}", id);
        self.execute(|f| f.contact_delete(id)).await?;
        Ok(())
    }

    async fn update_contact_profile(
        &mut self,
        domain: &DomainRecord,
        contact: &ContactRecord,
    ) -> Result<()> {
        self.require_contacts("Contact update")?;
        info!("Updating registrant profile of {}", domain.name);

        let info = self.domain_info(&domain.name).await?;
        let registrant = info
            .registrant
            .ok_or_else(|| Error::data(format!("Domain {} has no registrant", domain.name)))?;

        self.execute(|f| f.contact_update(&registrant, contact))
            .await?;
        debug!("Registrant {} of {} updated", registrant, domain.name);
        Ok(())
    }

    async fn toggle_contact_disclosure(
        &mut self,
        domain: &DomainRecord,
        enable_privacy: bool,
    ) -> Result<usize> {
        if !self.data_set().includes_contacts() {
            info!(
                "Skipping disclosure change for {}: no contacts in the minimal data set",
                domain.name
            );
            return Ok(0);
        }
        info!(
            "{} contact privacy for {}",
            if enable_privacy { "Enabling" } else { "Disabling" },
            domain.name
        );

        let info = self.domain_info(&domain.name).await?;
        let ids = info.contact_roles().unique_ids();
        for id in &ids {
            self.execute(|f| f.contact_disclose(id, enable_privacy))
                .await?;
        }
        debug!("Disclosure updated on {} contact(s)", ids.len());
        Ok(ids.len())
    }
}
