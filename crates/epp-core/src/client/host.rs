use async_trait::async_trait;
use tracing::{debug, info};

use super::EppClient;
use crate::error::{Error, Result};
use crate::model::HostRecord;
use crate::response::{CheckResult, HostInfo};
use crate::traits::HostOps;

#[async_trait]
impl HostOps for EppClient {
    async fn host_check(&mut self, names: &[&str]) -> Result<Vec<CheckResult>> {
        debug!("Checking hosts {:?}", names);
        let response = self.execute(|f| f.host_check(names)).await?;
        response.host_check()
    }

    async fn host_create(&mut self, host: &HostRecord) -> Result<()> {
        if host.name.trim().is_empty() {
            return Err(Error::validation("Host name cannot be empty"));
        }
        info!("Creating host {} ({} address(es))", host.name, host.addresses.len());
        self.execute(|f| f.host_create(host)).await?;
        Ok(())
    }

    async fn host_info(&mut self, name: &str) -> Result<HostInfo> {
        debug!("Fetching host {}", name);
        let response = self.execute(|f| f.host_info(name)).await?;
        response.host_info()
    }

    async fn host_delete(&mut self, name: &str) -> Result<()> {
        info!("Deleting host {}", name);
        self.execute(|f| f.host_delete(name)).await?;
        Ok(())
    }
}
