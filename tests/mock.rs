#![allow(dead_code)]

use std::sync::Arc;

use lorawan_ns::{
    device::{Device, DeviceField},
    error::{Error, Result},
    lorawan::{DataPayload, FCtrl, MType, MacPayload, PhyPayload, FHDR, MHDR},
    store::{DeviceStore, MemoryDeviceStore},
    types::{AESKey, DevAddr, DevAddrPrefix, EUI64},
    NetworkServer,
};

/// Network identifier used by every test server
pub const NET_ID: u32 = 0x000013;

pub const APP_EUI: EUI64 = EUI64::new([0x70, 0xB3, 0xD5, 0x7E, 0xF0, 0x00, 0x00, 0x01]);
pub const NWK_SKEY: AESKey = AESKey::new([0x2B; 16]);

/// Install a test subscriber; honours RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Session-holding device under [`APP_EUI`]
pub fn test_device(dev_eui: u8, dev_addr: [u8; 4]) -> Device {
    let mut device = Device::new(
        APP_EUI,
        EUI64::new([0x00, 0x04, 0xA3, 0x0B, 0x00, 0x00, 0x00, dev_eui]),
        "test-app",
        &format!("dev-{dev_eui}"),
    );
    device.dev_addr = DevAddr::new(dev_addr);
    device.nwk_skey = NWK_SKEY;
    device
}

/// Server over an in-memory store seeded with `devices`, with the
/// `26000000/7` prefix registered for OTAA
pub fn test_server(
    devices: &[Device],
) -> (NetworkServer<Arc<MemoryDeviceStore>>, Arc<MemoryDeviceStore>) {
    init_tracing();
    let store = Arc::new(MemoryDeviceStore::new());
    for device in devices {
        store.set(device, &[]).expect("seed device");
    }
    let server = NetworkServer::new(store.clone(), NET_ID);
    server
        .use_prefix(prefix("26000000/7"), vec!["otaa".into()])
        .expect("register prefix");
    (server, store)
}

pub fn prefix(s: &str) -> DevAddrPrefix {
    s.parse().expect("valid prefix")
}

/// Encoded data frame
pub fn data_frame(mtype: MType, dev_addr: DevAddr, f_cnt: u32) -> Vec<u8> {
    PhyPayload::new(
        MHDR::new(mtype),
        MacPayload::Data(DataPayload {
            fhdr: FHDR {
                dev_addr,
                f_ctrl: FCtrl::default(),
                f_cnt,
                f_opts: Default::default(),
            },
            f_port: Some(1),
            frm_payload: vec![0x01, 0x02, 0x03],
        }),
    )
    .to_bytes()
    .expect("encode frame")
}

/// Data payload of an encoded frame
pub fn decode_data(bytes: &[u8]) -> (PhyPayload, DataPayload) {
    let phy = PhyPayload::from_bytes(bytes).expect("decode frame");
    let data = phy.data_payload().cloned().expect("data payload");
    (phy, data)
}

/// Store whose every operation fails
pub struct FailingStore;

impl FailingStore {
    fn unavailable<T>() -> Result<T> {
        Err(Error::Store("unavailable".into()))
    }
}

impl DeviceStore for FailingStore {
    fn get_with_address(&self, _dev_addr: DevAddr) -> Result<Vec<Device>> {
        Self::unavailable()
    }

    fn get(&self, _app_eui: EUI64, _dev_eui: EUI64) -> Result<Device> {
        Self::unavailable()
    }

    fn set(&self, _device: &Device, _fields: &[DeviceField]) -> Result<()> {
        Self::unavailable()
    }

    fn activate(
        &self,
        _app_eui: EUI64,
        _dev_eui: EUI64,
        _dev_addr: DevAddr,
        _nwk_skey: AESKey,
    ) -> Result<()> {
        Self::unavailable()
    }
}

/// Store that reads from an inner store but refuses writes
pub struct ReadOnlyStore(pub MemoryDeviceStore);

impl DeviceStore for ReadOnlyStore {
    fn get_with_address(&self, dev_addr: DevAddr) -> Result<Vec<Device>> {
        self.0.get_with_address(dev_addr)
    }

    fn get(&self, app_eui: EUI64, dev_eui: EUI64) -> Result<Device> {
        self.0.get(app_eui, dev_eui)
    }

    fn set(&self, _device: &Device, _fields: &[DeviceField]) -> Result<()> {
        Err(Error::Store("read only".into()))
    }

    fn activate(
        &self,
        _app_eui: EUI64,
        _dev_eui: EUI64,
        _dev_addr: DevAddr,
        _nwk_skey: AESKey,
    ) -> Result<()> {
        Err(Error::Store("read only".into()))
    }
}
