// ── Inventory collection ──
//
// Reads one router's state through a `DeviceReader` and builds a `Device`.
// The identity read doubles as the connectivity check: if it fails the
// device is recorded as unreachable and nothing else is attempted. Every
// other read is independent; a failure leaves that collection empty and is
// recorded on the device and reported to the sink.

use tikfleet_api::Record;
use tracing::debug;

use crate::config::RouterTarget;
use crate::convert::merge_wireless;
use crate::error::CoreError;
use crate::facade::DeviceReader;
use crate::fleet::run_bounded;
use crate::model::{
    AddressBinding, CollectionError, Device, Interface, Neighbor, PppCredential, PppSession,
    ScheduledTask, SystemResource,
};
use crate::report::{FleetEvent, ReportSink};

// ── Menu paths ──────────────────────────────────────────────────────

pub const IDENTITY: &str = "/system/identity";
pub const INTERFACES: &str = "/interface";
pub const WIRELESS: &str = "/interface/wireless";
pub const ADDRESSES: &str = "/ip/address";
pub const NEIGHBORS: &str = "/ip/neighbor";
pub const PPP_ACTIVE: &str = "/ppp/active";
pub const PPP_SECRETS: &str = "/ppp/secret";
pub const SCHEDULER: &str = "/system/scheduler";
pub const RESOURCE: &str = "/system/resource";

/// Collect one router.
///
/// `address` is the management address the reader talks to; `label` names
/// the device if it turns out to be unreachable.
pub async fn collect_device<R: DeviceReader>(
    reader: &R,
    address: &str,
    label: &str,
    sink: &dyn ReportSink,
) -> Device {
    let identity = match read_identity(reader).await {
        Ok(identity) => identity,
        Err(e) => {
            sink.emit(FleetEvent::DeviceUnreachable {
                address: address.to_owned(),
                error: e.to_string(),
            });
            return Device::unreachable(label, address, e.to_string());
        }
    };

    let mut device = Device::new(identity, address);
    let mut reads = Reads {
        reader,
        sink,
        device: &device.identity,
        errors: Vec::new(),
    };

    let mut interfaces: Vec<Interface> = reads.list(INTERFACES).await;
    // Absent on routers without the wireless package; not worth an error.
    if let Ok(wireless) = reader.read_resource(WIRELESS).await {
        merge_wireless(&mut interfaces, &wireless);
    } else {
        debug!(device = %device.identity, "no wireless menu");
    }
    let addresses: Vec<AddressBinding> = reads.list(ADDRESSES).await;
    let neighbors: Vec<Neighbor> = reads.list(NEIGHBORS).await;
    let ppp_sessions: Vec<PppSession> = reads.list(PPP_ACTIVE).await;
    let ppp_credentials: Vec<PppCredential> = reads.list(PPP_SECRETS).await;
    let scheduled_tasks: Vec<ScheduledTask> = reads.list(SCHEDULER).await;
    let system: Option<SystemResource> = reads.list(RESOURCE).await.into_iter().next();
    let errors = reads.errors;

    device.interfaces = interfaces;
    device.addresses = addresses;
    device.neighbors = neighbors;
    device.ppp_sessions = ppp_sessions;
    device.ppp_credentials = ppp_credentials;
    device.scheduled_tasks = scheduled_tasks;
    device.system = system;
    device.collection_errors = errors;

    sink.emit(FleetEvent::DeviceCollected {
        device: device.identity.clone(),
        address: device.address.clone(),
    });
    device
}

/// Collect every target with at most `max_workers` routers in flight.
/// Devices come back in target order.
pub async fn collect_fleet(
    targets: &[RouterTarget],
    max_workers: usize,
    sink: &dyn ReportSink,
) -> Vec<Device> {
    run_bounded(targets, max_workers, |target| async move {
        match target.connect() {
            Ok(client) => collect_device(&client, &target.host, target.label(), sink).await,
            Err(e) => {
                sink.emit(FleetEvent::DeviceUnreachable {
                    address: target.host.clone(),
                    error: e.to_string(),
                });
                Device::unreachable(target.label(), &target.host, e.to_string())
            }
        }
    })
    .await
}

async fn read_identity<R: DeviceReader>(reader: &R) -> Result<String, CoreError> {
    let records = reader.read_resource(IDENTITY).await?;
    records
        .into_iter()
        .next()
        .and_then(|mut r| r.remove("name"))
        .ok_or_else(|| CoreError::Internal("identity response has no name".into()))
}

/// Independent reads for one device, remembering which ones failed.
struct Reads<'a, R> {
    reader: &'a R,
    sink: &'a dyn ReportSink,
    device: &'a str,
    errors: Vec<CollectionError>,
}

impl<R: DeviceReader> Reads<'_, R> {
    async fn list<T>(&mut self, path: &str) -> Vec<T>
    where
        T: for<'r> From<&'r Record>,
    {
        match self.reader.read_resource(path).await {
            Ok(records) => records.iter().map(T::from).collect(),
            Err(e) => {
                self.sink.emit(FleetEvent::ResourceReadFailed {
                    device: self.device.to_owned(),
                    resource: path.to_owned(),
                    error: e.to_string(),
                });
                self.errors.push(CollectionError {
                    resource: path.to_owned(),
                    message: e.to_string(),
                });
                Vec::new()
            }
        }
    }
}
