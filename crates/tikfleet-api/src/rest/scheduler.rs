// System scheduler endpoints
//
// The scheduler is the carrier for watchdog leases: an entry started at
// boot and repeating every `interval` runs its `on-event` script once the
// interval first elapses.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::error::Error;
use crate::record::Record;
use crate::rest::client::RestClient;

/// Menu path of the system scheduler.
pub const SCHEDULER_PATH: &str = "/system/scheduler";

impl RestClient {
    /// Create a scheduler entry.
    ///
    /// `PUT /rest/system/scheduler` with `start-time=startup` and
    /// `interval={secs}s`.
    pub async fn add_scheduler(
        &self,
        name: &str,
        interval: Duration,
        on_event: &str,
    ) -> Result<Option<Record>, Error> {
        debug!(name, interval_secs = interval.as_secs(), "adding scheduler entry");
        let fields = BTreeMap::from([
            ("name".to_owned(), name.to_owned()),
            ("start-time".to_owned(), "startup".to_owned()),
            ("interval".to_owned(), format!("{}s", interval.as_secs())),
            ("on-event".to_owned(), on_event.to_owned()),
        ]);
        self.add(SCHEDULER_PATH, &fields).await
    }

    /// Remove the scheduler entry called `name`.
    ///
    /// Fails with `Error::RecordNotFound` if no such entry exists.
    pub async fn remove_scheduler(&self, name: &str) -> Result<(), Error> {
        let id = self.find_id(SCHEDULER_PATH, "name", name).await?;
        debug!(name, id = %id, "removing scheduler entry");
        self.remove(SCHEDULER_PATH, &id).await
    }
}
