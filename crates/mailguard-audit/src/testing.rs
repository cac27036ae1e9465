//! In-memory fakes for the DNS and zone API seams.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mailguard_client::ZoneApi;
use mailguard_core::{GuardError, Result, Zone};

use crate::dns::{CaaRecord, DnsLookup, MxHost, SoaRecord};

fn key(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

#[derive(Default)]
pub struct MockDns {
    txt: Mutex<HashMap<String, Vec<String>>>,
    a: Mutex<HashMap<String, Vec<Ipv4Addr>>>,
    aaaa: Mutex<HashMap<String, Vec<Ipv6Addr>>>,
    mx: Mutex<HashMap<String, Vec<MxHost>>>,
    ns: Mutex<HashMap<String, Vec<String>>>,
    soa: Mutex<HashMap<String, SoaRecord>>,
    caa: Mutex<HashMap<String, Vec<CaaRecord>>>,
    ptr: Mutex<HashMap<IpAddr, Vec<String>>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    queries: AtomicUsize,
}

impl MockDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_txt(&self, name: &str, value: &str) {
        self.txt.lock().unwrap().entry(key(name)).or_default().push(value.to_string());
    }

    pub fn add_a(&self, name: &str, ips: &[&str]) {
        let parsed = ips.iter().map(|ip| ip.parse::<Ipv4Addr>().unwrap());
        self.a.lock().unwrap().entry(key(name)).or_default().extend(parsed);
    }

    pub fn add_aaaa(&self, name: &str, ips: &[&str]) {
        let parsed = ips.iter().map(|ip| ip.parse::<Ipv6Addr>().unwrap());
        self.aaaa.lock().unwrap().entry(key(name)).or_default().extend(parsed);
    }

    pub fn add_mx(&self, name: &str, preference: u16, exchange: &str) {
        self.mx.lock().unwrap().entry(key(name)).or_default().push(MxHost {
            preference,
            exchange: key(exchange),
        });
    }

    pub fn add_ns(&self, name: &str, hosts: &[&str]) {
        self.ns
            .lock()
            .unwrap()
            .entry(key(name))
            .or_default()
            .extend(hosts.iter().map(|h| key(h)));
    }

    pub fn set_soa(&self, name: &str, soa: SoaRecord) {
        self.soa.lock().unwrap().insert(key(name), soa);
    }

    pub fn add_caa(&self, name: &str, text: &str) {
        let record = CaaRecord::parse(text).unwrap();
        self.caa.lock().unwrap().entry(key(name)).or_default().push(record);
    }

    pub fn add_ptr(&self, ip: &str, host: &str) {
        self.ptr
            .lock()
            .unwrap()
            .entry(ip.parse().unwrap())
            .or_default()
            .push(key(host));
    }

    /// Every query for `name` fails with a resolver error
    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(key(name));
    }

    /// Any query for `name` panics, standing in for an unexpected bug
    pub fn panic_on(&self, name: &str) {
        self.panicking.lock().unwrap().insert(key(name));
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn check(&self, name: &str) -> Result<String> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let name = key(name);
        if self.panicking.lock().unwrap().contains(&name) {
            panic!("resolver exploded on {name}");
        }
        if self.failing.lock().unwrap().contains(&name) {
            return Err(GuardError::Dns(format!("SERVFAIL {name}")));
        }
        Ok(name)
    }
}

#[async_trait]
impl DnsLookup for MockDns {
    async fn txt(&self, name: &str) -> Result<Vec<String>> {
        let name = self.check(name)?;
        Ok(self.txt.lock().unwrap().get(&name).cloned().unwrap_or_default())
    }

    async fn a(&self, name: &str) -> Result<Vec<Ipv4Addr>> {
        let name = self.check(name)?;
        Ok(self.a.lock().unwrap().get(&name).cloned().unwrap_or_default())
    }

    async fn aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>> {
        let name = self.check(name)?;
        Ok(self.aaaa.lock().unwrap().get(&name).cloned().unwrap_or_default())
    }

    async fn mx(&self, name: &str) -> Result<Vec<MxHost>> {
        let name = self.check(name)?;
        Ok(self.mx.lock().unwrap().get(&name).cloned().unwrap_or_default())
    }

    async fn ns(&self, name: &str) -> Result<Vec<String>> {
        let name = self.check(name)?;
        Ok(self.ns.lock().unwrap().get(&name).cloned().unwrap_or_default())
    }

    async fn soa(&self, name: &str) -> Result<Option<SoaRecord>> {
        let name = self.check(name)?;
        Ok(self.soa.lock().unwrap().get(&name).cloned())
    }

    async fn caa(&self, name: &str) -> Result<Vec<CaaRecord>> {
        let name = self.check(name)?;
        Ok(self.caa.lock().unwrap().get(&name).cloned().unwrap_or_default())
    }

    async fn ptr(&self, ip: IpAddr) -> Result<Vec<String>> {
        self.check(&ip.to_string())?;
        Ok(self.ptr.lock().unwrap().get(&ip).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockZoneApi {
    domains: Mutex<Vec<String>>,
    zones: Mutex<HashMap<String, Zone>>,
    writes: Mutex<Vec<(String, Zone)>>,
    reads: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MockZoneApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_zone(&self, zone: Zone) {
        let mut domains = self.domains.lock().unwrap();
        if !domains.contains(&zone.origin) {
            domains.push(zone.origin.clone());
        }
        drop(domains);
        self.zones.lock().unwrap().insert(key(&zone.origin), zone);
    }

    pub fn zone(&self, name: &str) -> Option<Zone> {
        self.zones.lock().unwrap().get(&key(name)).cloned()
    }

    pub fn writes(&self) -> Vec<(String, Zone)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ZoneApi for MockZoneApi {
    async fn search_domains(&self) -> Result<Vec<String>> {
        Ok(self.domains.lock().unwrap().clone())
    }

    async fn read_zone(&self, name: &str) -> Result<Zone> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.zone(name).ok_or_else(|| GuardError::NotFound {
            resource: format!("zone {name}"),
        })
    }

    async fn write_zone(&self, name: &str, zone: &Zone) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GuardError::Api {
                code: 400,
                message: "zone rejected".to_string(),
            });
        }
        self.writes.lock().unwrap().push((name.to_string(), zone.clone()));
        self.zones.lock().unwrap().insert(key(name), zone.clone());
        Ok(())
    }
}
