// ── Topology inference ──
//
// Turns a collected device set into links. Pure: no I/O, no sink, no
// shared state; the same input always yields the same output.
//
// Neighbor entries resolve to a known device by exact address, then exact
// identity, then (optionally) substring containment between the reported
// address and a device's management address. The substring step exists for
// discovery implementations that truncate addresses and can produce false
// positives on overlapping ranges (`10.0.0.1` is contained in `10.0.0.10`),
// so it only runs when both exact steps miss.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{
    Device, Interface, InterfaceKind, Link, LinkKind, Neighbor, WirelessMode,
    link::{DISCOVERY_CONFIDENCE, SESSION_CONFIDENCE},
};

/// Tuning for neighbor resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyOptions {
    /// Allow the substring fallback for partial neighbor addresses.
    pub partial_address_match: bool,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        Self {
            partial_address_match: true,
        }
    }
}

/// A neighbor entry that matched no device in the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedNeighbor {
    /// Identity of the device that saw the neighbor.
    pub device: String,
    pub device_address: String,
    pub interface: String,
    pub identity: String,
    pub address: Option<String>,
}

/// Result of one inference pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyReport {
    pub links: Vec<Link>,
    pub unresolved: Vec<UnresolvedNeighbor>,
}

/// How a neighbor was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Address,
    Identity,
    PartialAddress,
}

enum Lookup {
    Peer(usize, Resolution),
    /// The neighbor entry describes the observing device itself.
    SelfEntry,
    Unresolved,
}

/// Address and identity indexes over a device slice. On duplicate keys the
/// first device wins.
struct DeviceIndex<'a> {
    devices: &'a [Device],
    by_address: HashMap<&'a str, usize>,
    by_identity: HashMap<&'a str, usize>,
}

impl<'a> DeviceIndex<'a> {
    fn new(devices: &'a [Device]) -> Self {
        let mut by_address = HashMap::new();
        let mut by_identity = HashMap::new();
        for (idx, device) in devices.iter().enumerate() {
            if !device.address.is_empty() {
                by_address.entry(device.address.as_str()).or_insert(idx);
            }
            if !device.identity.is_empty() {
                by_identity.entry(device.identity.as_str()).or_insert(idx);
            }
        }
        Self {
            devices,
            by_address,
            by_identity,
        }
    }

    fn resolve(&self, source: usize, neighbor: &Neighbor, options: TopologyOptions) -> Lookup {
        let reported = neighbor.address.as_deref().filter(|a| !a.is_empty());

        let exact = reported
            .and_then(|a| self.by_address.get(a))
            .map(|&idx| (idx, Resolution::Address))
            .or_else(|| {
                // Some discovery protocols put the address in the identity column.
                self.by_address
                    .get(neighbor.identity.as_str())
                    .map(|&idx| (idx, Resolution::Address))
            })
            .or_else(|| {
                self.by_identity
                    .get(neighbor.identity.as_str())
                    .map(|&idx| (idx, Resolution::Identity))
            });

        match exact {
            Some((idx, _)) if idx == source => return Lookup::SelfEntry,
            Some((idx, how)) => return Lookup::Peer(idx, how),
            None => {}
        }

        if !options.partial_address_match {
            return Lookup::Unresolved;
        }
        let Some(reported) = reported else {
            return Lookup::Unresolved;
        };

        self.devices
            .iter()
            .enumerate()
            .filter(|(idx, d)| *idx != source && !d.address.is_empty())
            .find(|(_, d)| d.address.contains(reported) || reported.contains(d.address.as_str()))
            .map_or(Lookup::Unresolved, |(idx, _)| {
                Lookup::Peer(idx, Resolution::PartialAddress)
            })
    }
}

/// Infer every link in the device set.
///
/// Neighbor-derived links are deduplicated per unordered address pair, so a
/// pair seen from both ends yields one link. When the two ends classify the
/// pair differently the higher-ranked kind wins; ties keep the end that sorts
/// first by `(address, identity)`. Session-derived links are never merged.
///
/// A `station` interface classifies its own observation as PTP, but the
/// merged link follows the rank order (PTMP > PTP > backbone > unknown): a
/// station facing an `ap-bridge` peer that also reports the pair yields one
/// PTMP link. The result does not depend on which end is visited first.
pub fn infer_topology(devices: &[Device], options: TopologyOptions) -> TopologyReport {
    let index = DeviceIndex::new(devices);

    let mut order: Vec<usize> = (0..devices.len()).collect();
    order.sort_by(|&a, &b| {
        (&devices[a].address, &devices[a].identity)
            .cmp(&(&devices[b].address, &devices[b].identity))
    });

    let mut pairs: BTreeMap<(String, String), Link> = BTreeMap::new();
    let mut unresolved = Vec::new();

    for &src in &order {
        let source = &devices[src];
        for neighbor in &source.neighbors {
            let (dst, how) = match index.resolve(src, neighbor, options) {
                Lookup::Peer(dst, how) => (dst, how),
                Lookup::SelfEntry => continue,
                Lookup::Unresolved => {
                    unresolved.push(UnresolvedNeighbor {
                        device: source.identity.clone(),
                        device_address: source.address.clone(),
                        interface: neighbor.interface.clone(),
                        identity: neighbor.identity.clone(),
                        address: neighbor.address.clone(),
                    });
                    continue;
                }
            };
            let target = &devices[dst];

            let (iface_name, iface) = local_interface(source, &neighbor.interface);
            let kind = classify(iface);
            let candidate = Link {
                source_device: source.identity.clone(),
                source_address: source.address.clone(),
                source_interface: iface_name,
                destination_device: target.identity.clone(),
                destination_address: Some(target.address.clone()),
                destination_interface: None,
                kind,
                confidence: DISCOVERY_CONFIDENCE,
                evidence: evidence(source, neighbor, how),
            };

            let key = pair_key(&source.address, &target.address);
            match pairs.entry(key) {
                Entry::Occupied(mut kept) => merge_pair(kept.get_mut(), candidate),
                Entry::Vacant(slot) => {
                    slot.insert(candidate);
                }
            }
        }
    }

    let mut links: Vec<Link> = pairs.into_values().collect();
    for &src in &order {
        links.extend(session_links(&devices[src]));
    }

    TopologyReport { links, unresolved }
}

/// Fold the reverse observation of a pair into the kept link. The reverse
/// side names the far-end port either way.
fn merge_pair(existing: &mut Link, mut candidate: Link) {
    let reverse = existing.source_device == candidate.destination_device;
    if candidate.kind.rank() > existing.kind.rank() {
        if reverse {
            candidate.destination_interface = Some(existing.source_interface.clone());
        }
        *existing = candidate;
    } else if reverse && existing.destination_interface.is_none() {
        existing.destination_interface = Some(candidate.source_interface);
    }
}

/// One link per active PPP session; the far end is only known by username.
fn session_links(device: &Device) -> impl Iterator<Item = Link> + '_ {
    device.ppp_sessions.iter().map(move |session| {
        let service = session.service.as_deref().unwrap_or("pppoe");
        let mut evidence = format!("active {service} session");
        if let Some(address) = &session.address {
            evidence.push_str(&format!(", address {address}"));
        }
        if let Some(uptime) = &session.uptime {
            evidence.push_str(&format!(", uptime {uptime}"));
        }
        Link {
            source_device: device.identity.clone(),
            source_address: device.address.clone(),
            source_interface: format!("{service}-server"),
            destination_device: session.username.clone(),
            destination_address: session.address.clone(),
            destination_interface: session.caller_id.clone(),
            kind: LinkKind::Pppoe,
            confidence: SESSION_CONFIDENCE,
            evidence,
        }
    })
}

/// Classify from the source interface alone.
fn classify(iface: Option<&Interface>) -> LinkKind {
    let Some(iface) = iface else {
        return LinkKind::Unknown;
    };
    if iface.is_wireless() {
        return match iface.wireless_mode() {
            Some(WirelessMode::ApBridge) => LinkKind::Ptmp,
            _ => LinkKind::Ptp,
        };
    }
    match iface.kind {
        InterfaceKind::Ethernet | InterfaceKind::Vlan | InterfaceKind::Bridge => {
            LinkKind::Backbone
        }
        _ => LinkKind::Unknown,
    }
}

/// RouterOS reports `ether1,bridge1` when a neighbor is seen through a
/// bridge port; prefer the first name that exists on the device.
fn local_interface<'a>(device: &'a Device, reported: &str) -> (String, Option<&'a Interface>) {
    let mut names = reported.split(',').map(str::trim).filter(|n| !n.is_empty());
    let first = names.clone().next().unwrap_or(reported);
    names
        .find_map(|name| device.interface(name).map(|iface| (name.to_owned(), Some(iface))))
        .unwrap_or_else(|| (first.to_owned(), None))
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

fn evidence(source: &Device, neighbor: &Neighbor, how: Resolution) -> String {
    let matched = match how {
        Resolution::Address => "address",
        Resolution::Identity => "identity",
        Resolution::PartialAddress => "partial address",
    };
    format!(
        "neighbor discovery on {} ({}), matched by {matched}",
        source.identity, neighbor.interface
    )
}
