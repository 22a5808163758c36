//! Integration tests for inventory, placement and container lifecycle dispatch
//!
//! These tests run the client against an in-process fake PVE API.

mod common;

use std::sync::atomic::Ordering;

use serde_json::json;

use common::{config_for, spawn_fake_pve};
use pvectl::lifecycle::{provision, ProvisionRequest};
use pvectl::{
    parse_template, ContainerCreateRequest, ContainerDeleteRequest, ContainerStatusRequest,
    PveClient, PveError, StatusAction,
};

fn create_request(node: &str, vmid: u32) -> ContainerCreateRequest {
    ContainerCreateRequest {
        node: node.to_string(),
        vmid,
        template: parse_template("templates:vztmpl/debian-10.0-standard_10.0-1_amd64.tar.gz")
            .unwrap(),
        mac: "02:00:00:00:00:2a".to_string(),
        cpu_cores: 2,
        memory: 1024,
        storage_capacity: 8,
        storage_id: "local-lvm".to_string(),
        hostname: "web-1".to_string(),
        password: "ct-password".to_string(),
        ssh_public_key: None,
        ip_address: None,
    }
}

#[tokio::test]
async fn test_fetch_inventory_partitions() {
    let (base_url, _fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    let inventory = client.fetch_inventory().await.unwrap();
    // The sdn entry is not modelled
    assert_eq!(inventory.len(), 6);
    assert_eq!(inventory.nodes().len(), 2);
    assert_eq!(inventory.containers().len(), 2);
    assert_eq!(inventory.vms().len(), 1);
    assert_eq!(inventory.storages().len(), 1);
    assert!(inventory.templates().is_empty());
}

#[tokio::test]
async fn test_pick_node_uses_fresh_inventory() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    // pve1: 8192 - 4096, pve2: 8192 - 1024
    assert_eq!(client.pick_node().await.unwrap(), "pve2");

    fake.set_resources(json!({
        "data": [
            {"type": "node", "node": "A", "mem": 1000},
            {"type": "node", "node": "B", "mem": 2000},
            {"type": "lxc", "node": "A", "vmid": 100, "mem": 200},
            {"type": "lxc", "node": "B", "vmid": 101, "mem": 1900}
        ]
    }));
    assert_eq!(client.pick_node().await.unwrap(), "A");
    assert_eq!(fake.requests_to("/cluster/resources").len(), 2);
}

#[tokio::test]
async fn test_pick_node_without_nodes() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    fake.set_resources(json!({"data": [{"type": "storage", "node": "pve1", "storage": "local"}]}));
    assert!(matches!(
        client.pick_node().await,
        Err(PveError::NoNodes)
    ));
}

#[tokio::test]
async fn test_node_for_workload() {
    let (base_url, _fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    assert_eq!(client.node_for_workload(101).await.unwrap(), "pve2");
    assert!(matches!(
        client.node_for_workload(4242).await,
        Err(PveError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_create_container_query() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    client
        .create_container(&create_request("pve1", 105))
        .await
        .unwrap();

    let calls = fake.requests_to("/nodes/pve1/lxc");
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.method, "POST");
    assert_eq!(call.csrf.as_deref(), Some("csrf-1"));
    assert_eq!(
        call.query["ostemplate"],
        "templates:vztmpl/debian-10.0-standard_10.0-1_amd64.tar.gz"
    );
    assert_eq!(call.query["vmid"], "105");
    assert_eq!(call.query["storage"], "local-lvm");
    assert_eq!(call.query["swap"], "512");
    assert_eq!(call.query["cores"], "2");
    assert_eq!(call.query["cpulimit"], "2");
    assert_eq!(call.query["memory"], "1024");
    assert_eq!(call.query["rootfs"], "8");
    assert_eq!(call.query["hostname"], "web-1");
    assert_eq!(call.query["password"], "ct-password");
    assert_eq!(
        call.query["net0"],
        "name=eth0,bridge=vmbr3,hwaddr=02:00:00:00:00:2a,ip=dhcp,tag=10,type=veth"
    );

    let description: serde_json::Value =
        serde_json::from_str(&call.query["description"]).unwrap();
    assert_eq!(description["vmid"], 105);
    assert!(description.get("password").is_none());
}

#[tokio::test]
async fn test_create_duplicate_carries_body() {
    let (base_url, _fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    let err = client
        .create_container(&create_request("pve1", 100))
        .await
        .unwrap_err();
    match err {
        PveError::Status {
            action,
            status,
            detail,
        } => {
            assert_eq!(action, "create container");
            assert_eq!(status, 500);
            assert!(detail.contains("already exists"), "detail: {}", detail);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_create_validation_sends_nothing() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();
    let before = fake.requests().len();

    let mut request = create_request("pve1", 106);
    request.mac = "not-a-mac".to_string();
    let err = client.create_container(&request).await.unwrap_err();

    assert!(matches!(err, PveError::Validation(_)));
    assert_eq!(fake.requests().len(), before);
}

#[tokio::test]
async fn test_status_actions() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    for action in [
        StatusAction::Start,
        StatusAction::Stop,
        StatusAction::Shutdown,
        StatusAction::Suspend,
        StatusAction::Resume,
    ] {
        client
            .set_status(&ContainerStatusRequest::new("pve2", 101, action))
            .await
            .unwrap();
        let path = format!("/nodes/pve2/lxc/101/status/{}", action);
        let calls = fake.requests_to(&path);
        assert_eq!(calls.len(), 1, "{}", path);
        assert_eq!(calls[0].method, "POST");
    }
}

#[tokio::test]
async fn test_status_rejection() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    fake.fail_actions.store(true, Ordering::SeqCst);
    let err = client.resume_container("pve1", 100).await.unwrap_err();
    match err {
        PveError::Status { action, detail, .. } => {
            assert_eq!(action, "resume container");
            assert!(detail.contains("locked"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_container() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    client
        .delete_container(&ContainerDeleteRequest::new("pve2", 101))
        .await
        .unwrap();
    let calls = fake.requests_to("/nodes/pve2/lxc/101");
    assert_eq!(calls[0].method, "DELETE");
    assert_eq!(calls[0].csrf.as_deref(), Some("csrf-1"));

    // Second delete of the same container is rejected upstream
    let err = client
        .delete_container(&ContainerDeleteRequest::new("pve2", 101))
        .await
        .unwrap_err();
    assert!(matches!(err, PveError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_delete_verifies_before_request() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    fake.expire();
    client
        .delete_container(&ContainerDeleteRequest::new("pve1", 100))
        .await
        .unwrap();

    let paths: Vec<String> = fake.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec!["/access/ticket", "/version", "/access/ticket", "/nodes/pve1/lxc/100"]
    );
}

#[tokio::test]
async fn test_reads() {
    let (base_url, _fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    assert_eq!(client.next_id().await.unwrap(), 105);

    let status = client.node_status("pve1").await.unwrap();
    assert_eq!(status.memory.used, 2048);
    assert_eq!(status.loadavg.len(), 3);

    let templates = client.template_list("pve1").await.unwrap();
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[1].parsed_template().unwrap().os, "alpine");

    let isos = client.iso_list("pve1").await.unwrap();
    assert_eq!(isos, vec!["ISOs:iso/debian-10.4.0-amd64-netinst.iso"]);

    let config = client.container_config("pve1", 100).await.unwrap();
    assert_eq!(config.hostname.as_deref(), Some("ct-100"));
    assert_eq!(config.hwaddr(), Some("02:00:00:00:00:01"));
}

#[tokio::test]
async fn test_read_rejection_is_transport_error() {
    let (base_url, _fake) = spawn_fake_pve().await;
    let mut config = config_for(&base_url);
    config.template_storage = "missing".to_string();
    let client = PveClient::connect(config).await.unwrap();

    let err = client.template_list("pve1").await.unwrap_err();
    assert!(matches!(err, PveError::Transport(_)));
}

#[tokio::test]
async fn test_provision_end_to_end() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url)).await.unwrap();

    let request = ProvisionRequest {
        template: parse_template("alpine-3.12-default_20200823_amd64.tar.xz").unwrap(),
        mac: "02:00:00:00:00:07".to_string(),
        cpu_cores: 1,
        memory: 256,
        storage_capacity: 2,
        storage_id: "local-lvm".to_string(),
        hostname: "edge-7".to_string(),
        password: "pw".to_string(),
        ssh_public_key: None,
        ip_address: None,
    };
    let placed = provision(&client, request).await.unwrap();

    assert_eq!(placed.node, "pve2");
    assert_eq!(placed.vmid, 105);
    let calls = fake.requests_to("/nodes/pve2/lxc");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query["hostname"], "edge-7");
}

#[tokio::test]
async fn test_rejection_with_unreadable_body_keeps_status() {
    let (base_url, fake) = spawn_fake_pve().await;
    let client = PveClient::connect(config_for(&base_url).with_timeout(1))
        .await
        .unwrap();

    fake.stall_rejections.store(true, Ordering::SeqCst);
    let err = client.stop_container("pve1", 100).await.unwrap_err();
    match err {
        PveError::Status {
            action,
            status,
            detail,
        } => {
            assert_eq!(action, "stop container");
            assert_eq!(status, 500);
            assert_eq!(detail, "500 Internal Server Error");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
