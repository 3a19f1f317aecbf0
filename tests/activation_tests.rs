use lorawan_ns::{
    lorawan::{MType, MacPayload, PhyPayload},
    messages::{
        ActivationMetadata, DeviceActivationRequest, DeviceActivationResponse, DownlinkMessage,
        LorawanActivationMetadata,
    },
    store::DeviceStore,
    types::{AESKey, DevAddr},
    Error,
};

mod mock;
use mock::{prefix, test_device, test_server, NET_ID};

const CF_LIST: [u32; 5] = [867_100_000, 867_300_000, 867_500_000, 867_700_000, 867_900_000];

fn activation_request(dev_eui: u8, cf_list: &[u32]) -> DeviceActivationRequest {
    let device = test_device(dev_eui, [0; 4]);
    DeviceActivationRequest {
        payload: vec![0x00; 23],
        app_eui: Some(device.app_eui),
        dev_eui: Some(device.dev_eui),
        activation_metadata: Some(ActivationMetadata {
            lorawan: Some(LorawanActivationMetadata {
                app_eui: Some(device.app_eui),
                dev_eui: Some(device.dev_eui),
                rx1_dr_offset: 0,
                rx2_dr: 3,
                rx_delay: 1,
                cf_list: cf_list.to_vec(),
                ..Default::default()
            }),
        }),
        response_template: Some(DownlinkMessage::default()),
        ..Default::default()
    }
}

fn join_accept(request: &DeviceActivationRequest) -> lorawan_ns::lorawan::JoinAcceptPayload {
    let payload = &request.response_template.as_ref().unwrap().payload;
    let phy = PhyPayload::from_bytes(payload).unwrap();
    assert_eq!(phy.mhdr.mtype, MType::JoinAccept);
    match phy.mac_payload {
        MacPayload::JoinAccept(join_accept) => join_accept,
        other => panic!("expected join accept, got {other:?}"),
    }
}

#[test]
fn test_prepare_activation() {
    let device = test_device(1, [0; 4]);
    let (server, store) = test_server(&[device.clone()]);

    let res = server
        .handle_prepare_activation(activation_request(1, &CF_LIST))
        .unwrap();
    assert_eq!(res.app_id, "test-app");
    assert_eq!(res.dev_id, "dev-1");

    let dev_addr = res
        .activation_metadata
        .as_ref()
        .and_then(|m| m.lorawan.as_ref())
        .and_then(|l| l.dev_addr)
        .unwrap();
    assert!(dev_addr.has_prefix(prefix("26000000/7")));

    let join_accept = join_accept(&res);
    assert_eq!(join_accept.dev_addr, dev_addr);
    assert_eq!(join_accept.net_id.as_bytes(), &[0x00, 0x00, 0x13]);
    assert_eq!(join_accept.dl_settings.rx2_data_rate, 3);
    assert_eq!(join_accept.dl_settings.rx1_dr_offset, 0);
    assert_eq!(join_accept.rx_delay, 1);
    assert_eq!(join_accept.cf_list.unwrap().frequencies().len(), 5);
    assert_eq!(join_accept.cf_list.unwrap().frequencies(), &CF_LIST);

    // Preparing does not touch the stored session
    assert_eq!(store.get(device.app_eui, device.dev_eui).unwrap(), device);
}

#[test]
fn test_prepare_activation_cf_list_needs_five_entries() {
    let (server, _) = test_server(&[test_device(1, [0; 4])]);

    let res = server
        .handle_prepare_activation(activation_request(1, &CF_LIST[..4]))
        .unwrap();
    assert!(join_accept(&res).cf_list.is_none());

    let res = server.handle_prepare_activation(activation_request(1, &[])).unwrap();
    assert!(join_accept(&res).cf_list.is_none());
}

#[test]
fn test_prepare_activation_missing_fields() {
    let (server, _) = test_server(&[test_device(1, [0; 4])]);

    let mut request = activation_request(1, &[]);
    request.app_eui = None;
    let err = server.handle_prepare_activation(request).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { field: "Activation", .. }));

    let mut request = activation_request(1, &[]);
    request.activation_metadata = Some(ActivationMetadata::default());
    assert!(server.handle_prepare_activation(request).unwrap_err().is_invalid_argument());

    let mut request = activation_request(1, &[]);
    request.activation_metadata = None;
    assert!(server.handle_prepare_activation(request).unwrap_err().is_invalid_argument());

    let mut request = activation_request(1, &[]);
    request.response_template = None;
    assert!(server.handle_prepare_activation(request).unwrap_err().is_invalid_argument());
}

#[test]
fn test_prepare_activation_unknown_device() {
    let (server, _) = test_server(&[]);
    let err = server
        .handle_prepare_activation(activation_request(1, &[]))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_prepare_activation_respects_constraints() {
    let mut tenant_device = test_device(1, [0; 4]);
    tenant_device.options.activation_constraints = "tenantA".into();
    let (server, _) = test_server(&[tenant_device, test_device(2, [0; 4])]);

    // Only the generic OTAA prefix is registered
    let err = server
        .handle_prepare_activation(activation_request(1, &[]))
        .unwrap_err();
    assert!(err.is_not_found());

    let tenant_prefix = prefix("26AB0000/16");
    server
        .use_prefix(tenant_prefix, vec!["otaa".into(), "tenantA".into()])
        .unwrap();

    for _ in 0..8 {
        let res = server
            .handle_prepare_activation(activation_request(1, &[]))
            .unwrap();
        assert!(join_accept(&res).dev_addr.has_prefix(tenant_prefix));
    }

    // Unconstrained devices may land in either prefix
    let res = server
        .handle_prepare_activation(activation_request(2, &[]))
        .unwrap();
    assert!(join_accept(&res).dev_addr.has_prefix(prefix("26000000/7")));
}

#[test]
fn test_prepare_activation_out_of_range_settings() {
    let (server, _) = test_server(&[test_device(1, [0; 4])]);

    let mut request = activation_request(1, &[]);
    if let Some(lorawan) = request
        .activation_metadata
        .as_mut()
        .and_then(|m| m.lorawan.as_mut())
    {
        lorawan.rx_delay = 300;
    }
    let err = server.handle_prepare_activation(request).unwrap_err();
    assert!(matches!(err, Error::Frame(_)));
}

#[test]
fn test_repeated_preparation_draws_new_addresses() {
    let (server, _) = test_server(&[test_device(1, [0; 4])]);

    let addresses: std::collections::HashSet<DevAddr> = (0..16)
        .map(|_| {
            let res = server
                .handle_prepare_activation(activation_request(1, &[]))
                .unwrap();
            let dev_addr = join_accept(&res).dev_addr;
            assert!(dev_addr.has_prefix(prefix("26000000/7")));
            dev_addr
        })
        .collect();
    // 25 random bits per draw
    assert!(addresses.len() > 1);
}

#[test]
fn test_activate() {
    let mut device = test_device(1, [0x26, 0x00, 0x00, 0x01]);
    device.fcnt_up = 100;
    device.fcnt_down = 50;
    let (server, store) = test_server(&[device.clone()]);

    let prepared = server
        .handle_prepare_activation(activation_request(1, &[]))
        .unwrap();
    let mut lorawan = prepared.activation_metadata.unwrap().lorawan.unwrap();
    lorawan.nwk_skey = Some(AESKey::new([0x5A; 16]));
    let dev_addr = lorawan.dev_addr.unwrap();

    let response = DeviceActivationResponse {
        payload: vec![0x20; 17],
        activation_metadata: Some(ActivationMetadata {
            lorawan: Some(lorawan),
        }),
    };
    let res = server.handle_activate(response.clone()).unwrap();
    assert_eq!(res, response);

    let stored = store.get(device.app_eui, device.dev_eui).unwrap();
    assert_eq!(stored.dev_addr, dev_addr);
    assert_eq!(stored.nwk_skey, AESKey::new([0x5A; 16]));
    assert_eq!((stored.fcnt_up, stored.fcnt_down), (0, 0));
    assert_eq!(stored.app_id, "test-app");

    let at_new = store.get_with_address(dev_addr).unwrap();
    assert_eq!(at_new.len(), 1);
    if dev_addr != device.dev_addr {
        assert!(store.get_with_address(device.dev_addr).unwrap().is_empty());
    }
}

#[test]
fn test_activate_missing_fields() {
    let (server, _) = test_server(&[]);

    let err = server
        .handle_activate(DeviceActivationResponse::default())
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let err = server
        .handle_activate(DeviceActivationResponse {
            activation_metadata: Some(ActivationMetadata::default()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let device = test_device(1, [0; 4]);
    let err = server
        .handle_activate(DeviceActivationResponse {
            activation_metadata: Some(ActivationMetadata {
                lorawan: Some(LorawanActivationMetadata {
                    app_eui: Some(device.app_eui),
                    dev_eui: Some(device.dev_eui),
                    dev_addr: Some(DevAddr::new([0x26, 0, 0, 1])),
                    nwk_skey: None,
                    ..Default::default()
                }),
            }),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_server_net_id() {
    let (server, _) = test_server(&[]);
    let expected = [(NET_ID >> 16) as u8, (NET_ID >> 8) as u8, NET_ID as u8];
    assert_eq!(server.net_id().as_bytes(), &expected);
}
