#![allow(clippy::unwrap_used, dead_code)]
// In-memory router double for core integration tests.
//
// Menus are plain record lists keyed by slash path. Every facade call is
// appended to a call log so tests can assert on ordering and on what was
// (not) sent. Failures are injected per menu, per field or per operation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tikfleet_api::Record;
use tikfleet_core::{CoreError, DeviceMutator, DeviceReader, MatchKey};

pub const SCHEDULER: &str = "/system/scheduler";

pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

fn rejected(what: &str) -> CoreError {
    CoreError::Rejected {
        message: format!("injected failure: {what}"),
        status: Some(400),
    }
}

#[derive(Default)]
pub struct FakeRouter {
    menus: Mutex<BTreeMap<String, Vec<Record>>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    failing_reads: Mutex<HashSet<String>>,
    failing_fields: Mutex<HashSet<String>>,
    fail_arm: AtomicBool,
    fail_disarm: AtomicBool,
    unreachable: AtomicBool,
    lockout_on: Mutex<Option<String>>,
}

impl FakeRouter {
    pub fn new(identity: &str) -> Self {
        let router = Self::default();
        router.with_menu("/system/identity", vec![record(&[("name", identity)])])
    }

    /// Router with the four management services the tests touch.
    pub fn with_services(identity: &str) -> Self {
        Self::new(identity).with_menu(
            "/ip/service",
            vec![
                record(&[(".id", "*1"), ("name", "ssh"), ("port", "22"), ("address", "")]),
                record(&[
                    (".id", "*2"),
                    ("name", "www"),
                    ("port", "80"),
                    ("address", "192.168.88.0/24"),
                ]),
                record(&[(".id", "*3"), ("name", "api"), ("port", "8728")]),
                record(&[(".id", "*4"), ("name", "winbox"), ("port", "8291"), ("address", "")]),
            ],
        )
    }

    pub fn with_menu(self, path: &str, records: Vec<Record>) -> Self {
        self.menus.lock().unwrap().insert(path.to_owned(), records);
        self
    }

    pub fn fail_read(&self, path: &str) {
        self.failing_reads.lock().unwrap().insert(path.to_owned());
    }

    /// Fail writes of `field` on the record named `name`.
    pub fn fail_write(&self, name: &str, field: &str) {
        self.failing_fields
            .lock()
            .unwrap()
            .insert(format!("{name}/{field}"));
    }

    pub fn fail_arm(&self) {
        self.fail_arm.store(true, Ordering::SeqCst);
    }

    pub fn fail_disarm(&self) {
        self.fail_disarm.store(true, Ordering::SeqCst);
    }

    /// Management channel stops answering (the change locked us out).
    pub fn cut_off(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    /// Lose the management channel as soon as the record named `name` is
    /// written.
    pub fn lock_out_on(&self, name: &str) {
        *self.lockout_on.lock().unwrap() = Some(name.to_owned());
    }

    pub fn restore(&self) {
        self.unreachable.store(false, Ordering::SeqCst);
    }

    pub fn menu(&self, path: &str) -> Vec<Record> {
        self.menus
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn field(&self, path: &str, name: &str, field: &str) -> Option<String> {
        MatchKey::name(name)
            .select(&self.menu(path))
            .and_then(|r| r.get(field).cloned())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of logged calls starting with `op`.
    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(op)).count()
    }

    /// Run a lease script the way the router scheduler would: apply every
    /// `set` and the self-removal. Only understands what the encoder emits.
    pub fn fire_lease(&self, lease: &str) {
        let task = MatchKey::name(lease).select(&self.menu(SCHEDULER)).cloned();
        let script = task.and_then(|t| t.get("on-event").cloned()).unwrap();
        for command in split_commands(&script) {
            if let Some((menu, name, field, value)) = parse_set(&command) {
                let mut menus = self.menus.lock().unwrap();
                let records = menus.get_mut(&menu).unwrap();
                let target = records
                    .iter_mut()
                    .find(|r| r.get("name").is_some_and(|n| *n == name))
                    .unwrap();
                target.insert(field, value);
            }
        }
        self.remove_named(SCHEDULER, lease);
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn remove_named(&self, path: &str, name: &str) -> bool {
        let mut menus = self.menus.lock().unwrap();
        let records = menus.entry(path.to_owned()).or_default();
        let before = records.len();
        records.retain(|r| r.get("name").is_none_or(|n| n != name));
        records.len() != before
    }

    fn insert(&self, path: &str, mut fields: Record) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        fields.insert(".id".into(), format!("*F{id}"));
        self.menus
            .lock()
            .unwrap()
            .entry(path.to_owned())
            .or_default()
            .push(fields);
    }

    fn update(&self, path: &str, key: &MatchKey, fields: &Record) -> Result<(), CoreError> {
        let mut menus = self.menus.lock().unwrap();
        let target = menus
            .get_mut(path)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.get(&key.field).is_some_and(|v| *v == key.value))
            })
            .ok_or_else(|| CoreError::NotFound {
                resource: path.to_owned(),
                identifier: key.to_string(),
            })?;
        target.extend(fields.clone());
        Ok(())
    }
}

impl DeviceReader for FakeRouter {
    async fn read_resource(&self, path: &str) -> Result<Vec<Record>, CoreError> {
        self.log(format!("read {path}"));
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CoreError::Timeout);
        }
        if self.failing_reads.lock().unwrap().contains(path) {
            return Err(rejected(path));
        }
        Ok(self.menu(path))
    }

    async fn test_reachable(&self) -> Result<(), CoreError> {
        self.log("verify".into());
        if self.unreachable.load(Ordering::SeqCst) {
            Err(CoreError::Timeout)
        } else {
            Ok(())
        }
    }
}

impl DeviceMutator for FakeRouter {
    async fn write_field(
        &self,
        path: &str,
        key: &MatchKey,
        field: &str,
        value: &str,
    ) -> Result<(), CoreError> {
        self.log(format!("write {path} {key} {field}={value}"));
        if self
            .failing_fields
            .lock()
            .unwrap()
            .contains(&format!("{}/{field}", key.value))
        {
            return Err(rejected(field));
        }
        self.update(path, key, &record(&[(field, value)]))?;
        if self.lockout_on.lock().unwrap().as_deref() == Some(key.value.as_str()) {
            self.cut_off();
        }
        Ok(())
    }

    async fn update_record(
        &self,
        path: &str,
        key: &MatchKey,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CoreError> {
        self.log(format!("update {path} {key}"));
        self.update(path, key, fields)
    }

    async fn create_record(
        &self,
        path: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CoreError> {
        self.log(format!("create {path}"));
        self.insert(path, fields.clone());
        Ok(())
    }

    async fn create_scheduled_task(
        &self,
        name: &str,
        interval: Duration,
        script: &str,
    ) -> Result<(), CoreError> {
        self.log(format!("arm {name}"));
        if self.fail_arm.load(Ordering::SeqCst) {
            return Err(rejected("scheduler add"));
        }
        let interval = format!("{}s", interval.as_secs());
        self.insert(
            SCHEDULER,
            record(&[
                ("name", name),
                ("start-time", "startup"),
                ("interval", &interval),
                ("on-event", script),
                ("disabled", "false"),
            ]),
        );
        Ok(())
    }

    async fn delete_scheduled_task(&self, name: &str) -> Result<(), CoreError> {
        self.log(format!("disarm {name}"));
        if self.fail_disarm.load(Ordering::SeqCst) {
            return Err(rejected("scheduler remove"));
        }
        if self.remove_named(SCHEDULER, name) {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                resource: SCHEDULER.into(),
                identifier: format!("name={name}"),
            })
        }
    }
}

// ── Minimal script interpreter ──────────────────────────────────────

/// Split on `;` outside double quotes.
fn split_commands(script: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in script.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}

/// `/ip service set [find name="ssh"] address="10.0.0.0/8"`
fn parse_set(command: &str) -> Option<(String, String, String, String)> {
    let (menu, rest) = command.split_once(" set [find name=")?;
    let (name, rest) = read_quoted(rest)?;
    let rest = rest.strip_prefix("] ")?;
    let (field, rest) = rest.split_once('=')?;
    let (value, _) = read_quoted(rest)?;
    Some((menu.replace(' ', "/"), name, field.to_owned(), value))
}

fn read_quoted(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next()?.1 {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                other => out.push(other),
            },
            '"' => return Some((out, &body[i + 1..])),
            _ => out.push(c),
        }
    }
    None
}
