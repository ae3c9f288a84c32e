//! Mock collaborators for host tests

use core::cell::Cell;
use core::convert::Infallible;
use std::collections::{BTreeMap, VecDeque};
use std::string::String;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use sensor_node_hal::{
    AccessPoint, Board, BoardParts, Broker, Credentials, DatagramError, DatagramTransport,
    EnvironmentSensors, Hibernate, KeyValueStore, LinkStatus, MonotonicClock, NetworkLink,
    PairingProtocol, ProvisioningButton, PublishError, PublishTransport, RealTimeClock, RtcError,
    ScanResults, SensorError, SensorPower, StorageError, StreamError, StreamTransport, TimeSync,
    TimeSyncError, Timestamp,
};

use crate::acquisition::Sensor;
use crate::measurement::Measurement;
use crate::schema::{EncodeError, MeasurementEncoder, PostcardEncoder};

/// Records requested delays without waiting
#[derive(Debug, Default)]
pub struct MockDelay {
    pub elapsed_ms: u64,
    elapsed_ns: u64,
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
        self.elapsed_ms += self.elapsed_ns / 1_000_000;
        self.elapsed_ns %= 1_000_000;
    }

    async fn delay_us(&mut self, us: u32) {
        self.delay_ns(us.saturating_mul(1_000)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += ms as u64;
    }
}

#[derive(Debug, Default)]
pub struct MockPower {
    pub enabled: bool,
    pub enable_count: u32,
    pub disable_count: u32,
}

impl SensorPower for MockPower {
    fn enable(&mut self) {
        self.enabled = true;
        self.enable_count += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disable_count += 1;
    }
}

#[derive(Debug)]
pub struct MockSensors {
    pub illuminance: f32,
    pub humidity: f32,
    pub temperature: f32,
    pub soil: u32,
    pub salt: u32,
    /// Bus initialisation calls that fail before one succeeds
    pub bus_failures: u32,
    pub bus_init_calls: u32,
    /// Sensor whose read fails
    pub failing: Option<Sensor>,
}

impl Default for MockSensors {
    fn default() -> Self {
        Self {
            illuminance: 812.5,
            humidity: 48.25,
            temperature: 21.5,
            soil: 1_834,
            salt: 217,
            bus_failures: 0,
            bus_init_calls: 0,
            failing: None,
        }
    }
}

impl MockSensors {
    fn read<T>(&self, sensor: Sensor, value: T) -> Result<T, SensorError> {
        if self.failing == Some(sensor) {
            Err(SensorError::ReadFailed)
        } else {
            Ok(value)
        }
    }
}

impl EnvironmentSensors for MockSensors {
    async fn init_bus(&mut self) -> Result<(), SensorError> {
        self.bus_init_calls += 1;
        if self.bus_init_calls <= self.bus_failures {
            Err(SensorError::BusUnavailable)
        } else {
            Ok(())
        }
    }

    async fn illuminance(&mut self) -> Result<f32, SensorError> {
        self.read(Sensor::Illuminance, self.illuminance)
    }

    async fn humidity_temperature(&mut self) -> Result<(f32, f32), SensorError> {
        self.read(
            Sensor::HumidityTemperature,
            (self.humidity, self.temperature),
        )
    }

    async fn soil_moisture(&mut self) -> Result<u32, SensorError> {
        self.read(Sensor::SoilMoisture, self.soil)
    }

    async fn salinity(&mut self) -> Result<u32, SensorError> {
        self.read(Sensor::Salinity, self.salt)
    }
}

/// In-memory key-value store; staged writes are visible immediately
#[derive(Debug, Default)]
pub struct MockStore {
    pub entries: BTreeMap<String, Vec<u8>>,
    pub commits: u32,
    pub fail_writes: bool,
}

impl MockStore {
    pub fn insert(&mut self, key: &str, value: &[u8]) {
        self.entries.insert(key.into(), value.to_vec());
    }

    pub fn value(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MockStore {
    fn get(&mut self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(value) if value.len() > buf.len() => Err(StorageError::ValueTooLong),
            Some(value) => {
                buf[..value.len()].copy_from_slice(value);
                Ok(Some(value.len()))
            }
        }
    }

    fn set(&mut self, key: &str, value: Option<&[u8]>) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteFailed);
        }
        match value {
            Some(value) => self.insert(key, value),
            None => {
                self.entries.remove(key);
            }
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::CommitFailed);
        }
        self.commits += 1;
        Ok(())
    }
}

/// Link that comes up a fixed number of status polls after `begin`
#[derive(Debug)]
pub struct MockLink {
    pub up: bool,
    /// Polls answered with `Connecting` after `begin`; `None` never connects
    pub connect_after: Option<u32>,
    /// Status reported while no association is running
    pub idle_status: LinkStatus,
    pub begin_calls: u32,
    pub last_ssid: Option<String>,
    pub powered_down: bool,
    pub networks: ScanResults,
    associating: bool,
    polls: u32,
}

impl MockLink {
    fn new(up: bool, connect_after: Option<u32>) -> Self {
        Self {
            up,
            connect_after,
            idle_status: LinkStatus::Disconnected,
            begin_calls: 0,
            last_ssid: None,
            powered_down: false,
            networks: ScanResults::new(),
            associating: false,
            polls: 0,
        }
    }

    pub fn already_up() -> Self {
        Self::new(true, Some(0))
    }

    pub fn connecting_after(polls: u32) -> Self {
        Self::new(false, Some(polls))
    }

    pub fn never_connects() -> Self {
        Self::new(false, None)
    }

    pub fn add_network(&mut self, ssid: &str, rssi: i8, secured: bool) {
        let ap = AccessPoint {
            ssid: heapless::String::try_from(ssid).unwrap(),
            rssi,
            secured,
        };
        self.networks.push(ap).unwrap();
    }
}

impl NetworkLink for MockLink {
    fn begin(&mut self, ssid: &str, _passphrase: &str) {
        self.begin_calls += 1;
        self.last_ssid = Some(ssid.into());
        self.associating = true;
        self.polls = 0;
        self.powered_down = false;
    }

    fn status(&mut self) -> LinkStatus {
        if self.up {
            return LinkStatus::Connected;
        }
        if !self.associating {
            return self.idle_status;
        }
        match self.connect_after {
            Some(n) if self.polls >= n => {
                self.up = true;
                LinkStatus::Connected
            }
            _ => {
                self.polls += 1;
                LinkStatus::Connecting
            }
        }
    }

    fn disconnect(&mut self) {
        self.up = false;
        self.associating = false;
        self.idle_status = LinkStatus::Disconnected;
    }

    fn power_down(&mut self) {
        self.disconnect();
        self.powered_down = true;
    }

    async fn scan(&mut self) -> ScanResults {
        self.networks.clone()
    }
}

#[derive(Debug)]
pub struct MockTimeSync {
    pub result: Result<Timestamp, TimeSyncError>,
    pub calls: u32,
}

impl MockTimeSync {
    pub fn succeeding() -> Self {
        Self {
            result: Ok(Timestamp::new(1_700_000_000, 0)),
            calls: 0,
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(TimeSyncError::NoResponse),
            calls: 0,
        }
    }
}

impl TimeSync for MockTimeSync {
    async fn sync(&mut self) -> Result<Timestamp, TimeSyncError> {
        self.calls += 1;
        self.result
    }
}

/// Byte stream replaying a canned response
#[derive(Debug, Default)]
pub struct MockStream {
    pub response: Vec<u8>,
    pub sent: Vec<u8>,
    /// `host:port` of the last open
    pub opened: Option<String>,
    pub closed: bool,
    pub open_error: Option<StreamError>,
    pub read_pos: usize,
}

impl MockStream {
    pub fn with_response(response: &[u8]) -> Self {
        Self {
            response: response.to_vec(),
            ..Self::default()
        }
    }
}

impl embedded_io_async::ErrorType for MockStream {
    type Error = Infallible;
}

impl embedded_io_async::Read for MockStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let remaining = &self.response[self.read_pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.read_pos += n;
        Ok(n)
    }
}

impl embedded_io_async::Write for MockStream {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

impl StreamTransport for MockStream {
    async fn open(&mut self, host: &str, port: u16) -> Result<(), StreamError> {
        if let Some(e) = self.open_error {
            return Err(e);
        }
        self.opened = Some(std::format!("{}:{}", host, port));
        self.read_pos = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[derive(Debug, Default)]
pub struct MockPublisher {
    /// Connection attempts that fail before one succeeds
    pub connect_failures: u8,
    pub connect_calls: u32,
    pub client_id: Option<String>,
    /// Index of a publication that fails
    pub fail_publish_at: Option<usize>,
    pub published: Vec<(String, Vec<u8>)>,
    pub disconnected: bool,
    pub publish_calls: usize,
}

impl PublishTransport for MockPublisher {
    async fn connect(&mut self, _broker: &Broker, client_id: &str) -> Result<(), PublishError> {
        self.connect_calls += 1;
        if self.connect_calls <= self.connect_failures as u32 {
            return Err(PublishError::ConnectionFailed);
        }
        self.client_id = Some(client_id.into());
        self.disconnected = false;
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let index = self.publish_calls;
        self.publish_calls += 1;
        if self.fail_publish_at == Some(index) {
            return Err(PublishError::PublishFailed);
        }
        self.published.push((topic.into(), payload.to_vec()));
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.disconnected = true;
    }
}

/// `postcard` encoder that fails on chosen calls
#[derive(Debug, Default)]
pub struct MockEncoder {
    pub fail_on: Vec<usize>,
    calls: usize,
}

impl MockEncoder {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            calls: 0,
        }
    }
}

impl MeasurementEncoder for MockEncoder {
    fn encode<'b>(
        &mut self,
        measurement: &Measurement,
        buf: &'b mut [u8],
    ) -> Result<&'b [u8], EncodeError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(EncodeError::InvalidField);
        }
        PostcardEncoder.encode(measurement, buf)
    }
}

#[derive(Debug, Default)]
pub struct MockDatagram {
    pub replies: VecDeque<Result<Vec<u8>, DatagramError>>,
    pub hosts: Vec<String>,
}

impl DatagramTransport for MockDatagram {
    async fn exchange(
        &mut self,
        host: &str,
        _port: u16,
        _request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, DatagramError> {
        self.hosts.push(host.into());
        match self.replies.pop_front() {
            Some(Ok(reply)) => {
                let n = reply.len().min(response.len());
                response[..n].copy_from_slice(&reply[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Err(DatagramError::SocketError),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockRtc {
    pub set_to: Option<Timestamp>,
    pub fail: bool,
}

impl RealTimeClock for MockRtc {
    fn set_time(&mut self, timestamp: Timestamp) -> Result<(), RtcError> {
        if self.fail {
            return Err(RtcError::HardwareError);
        }
        self.set_to = Some(timestamp);
        Ok(())
    }
}

/// Uptime that advances by `step_us` on every read
#[derive(Debug, Default)]
pub struct MockUptime {
    pub now_us: Cell<u64>,
    pub step_us: u64,
}

impl MonotonicClock for MockUptime {
    fn now_micros(&self) -> u64 {
        let now = self.now_us.get();
        self.now_us.set(now + self.step_us);
        now
    }
}

/// Console with scripted input that captures output
#[derive(Debug, Default)]
pub struct MockConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl MockConsole {
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl embedded_io::ErrorType for MockConsole {
    type Error = Infallible;
}

impl embedded_io::Read for MockConsole {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let mut n = 0;
        while n < buf.len() {
            match self.input.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl embedded_io::ReadReady for MockConsole {
    fn read_ready(&mut self) -> Result<bool, Infallible> {
        Ok(!self.input.is_empty())
    }
}

impl embedded_io::Write for MockConsole {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Pairing that delivers its credentials after `deliver_after` empty polls
#[derive(Debug, Default)]
pub struct MockPairing {
    pub started: bool,
    pub stopped: bool,
    pub deliver_after: u32,
    pub credentials: Option<Credentials>,
    pub polls: u32,
}

impl PairingProtocol for MockPairing {
    fn start(&mut self) {
        self.started = true;
    }

    fn poll(&mut self) -> Option<Credentials> {
        self.polls += 1;
        if self.polls > self.deliver_after {
            self.credentials.take()
        } else {
            None
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[derive(Debug, Default)]
pub struct MockButton {
    pub held: bool,
}

impl ProvisioningButton for MockButton {
    fn is_held(&mut self) -> bool {
        self.held
    }
}

#[derive(Debug, Default)]
pub struct MockHibernate;

impl Hibernate for MockHibernate {
    fn hibernate(&mut self, retained: &[u8], sleep_ms: u64) -> ! {
        panic!("hibernate: {} bytes retained, {} ms", retained.len(), sleep_ms)
    }
}

/// Board built from the mocks above
pub struct MockBoard;

impl Board for MockBoard {
    type Power = MockPower;
    type Sensors = MockSensors;
    type Store = MockStore;
    type Link = MockLink;
    type TimeSync = MockTimeSync;
    type Naming = MockStream;
    type Publisher = MockPublisher;
    type Delay = MockDelay;
    type Uptime = MockUptime;
    type Console = MockConsole;
    type Pairing = MockPairing;
    type Button = MockButton;
    type Hibernate = MockHibernate;
}

/// Parts with a working link, sensors, time source and broker
pub fn mock_parts() -> BoardParts<MockBoard> {
    BoardParts {
        power: MockPower::default(),
        sensors: MockSensors::default(),
        store: MockStore::default(),
        link: MockLink::already_up(),
        time_sync: MockTimeSync::succeeding(),
        naming: MockStream::default(),
        publisher: MockPublisher::default(),
        delay: MockDelay::default(),
        uptime: MockUptime {
            step_us: 250_000,
            ..MockUptime::default()
        },
        console: MockConsole::default(),
        pairing: MockPairing::default(),
        button: MockButton::default(),
        hibernate: MockHibernate,
    }
}
