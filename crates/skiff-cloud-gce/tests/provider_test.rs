mod common;

use common::*;
use serde_json::json;
use skiff_cloud::{CancellationToken, CloudError, ResourceApi, ResourceKind, ResourceRef};
use skiff_cloud_gce::{GceError, metadata_fingerprint};
use skiff_config::MetadataItem;

fn centos_image(name: &str, created: &str, deprecated: bool) -> serde_json::Value {
    let mut image = json!({
        "kind": "compute#image",
        "name": name,
        "family": "centos-7",
        "creationTimestamp": created,
        "status": "READY",
        "selfLink": format!("https://www.googleapis.com/compute/v1/projects/centos-cloud/global/images/{}", name),
    });
    if deprecated {
        image["deprecated"] = json!({"state": "DEPRECATED"});
    }
    image
}

#[tokio::test]
async fn test_resolve_latest_image_across_pages() {
    let server = TestServer::start().await;
    server.set_images(
        "centos-cloud",
        vec![
            centos_image("centos-7-v20190312", "2019-03-12T10:00:00.000-07:00", false),
            centos_image("centos-7-v20190601", "2019-06-01T10:00:00.000-07:00", true),
            centos_image("centos-7-v20190515", "2019-05-15T19:01:21.060-07:00", false),
        ],
    );

    let image = server
        .provider()
        .resolve_latest_image("centos-7-x86_64")
        .await
        .unwrap();

    assert_eq!(image.name, "centos-7-v20190515");
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].ends_with("/projects/centos-cloud/global/images"));
}

#[tokio::test]
async fn test_unsupported_platform_makes_no_request() {
    let server = TestServer::start().await;
    let err = server
        .provider()
        .resolve_latest_image("my-custom-image")
        .await
        .unwrap_err();

    assert!(matches!(
        err.cloud_error(),
        Some(CloudError::UnsupportedPlatform(_))
    ));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_no_matching_image() {
    let server = TestServer::start().await;
    server.set_images(
        "centos-cloud",
        vec![centos_image("centos-7-v20190312", "2019-03-12T10:00:00.000-07:00", true)],
    );

    let err = server
        .provider()
        .resolve_latest_image("centos-7-x86_64")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unable to find a single matching image for centos-7-x86_64, considered 1 candidates"
    );
}

#[tokio::test]
async fn test_provision_and_teardown() {
    let server = TestServer::start().await;
    server.set_images(
        "centos-cloud",
        vec![centos_image("centos-7-v20190515", "2019-05-15T19:01:21.060-07:00", false)],
    );
    let provider = server.provider();
    let name = "beaker-tmp";

    let image = provider.resolve_latest_image("centos-7-x86_64").await.unwrap();
    let disk = provider.create_disk(name, Some(&image)).await.unwrap();
    assert_eq!(disk.get::<String>("sizeGb").as_deref(), Some("25"));
    assert!(
        disk.str_field("sourceImage")
            .unwrap()
            .ends_with("/centos-cloud/global/images/centos-7-v20190515")
    );

    let instance = provider.create_instance(name, &disk).await.unwrap();
    assert!(
        instance
            .str_field("machineType")
            .unwrap()
            .ends_with("/machineTypes/n1-standard-1")
    );
    assert_eq!(instance.as_value()["tags"]["items"], json!([name]));

    let fingerprint = metadata_fingerprint(&instance).unwrap();
    let items = vec![
        MetadataItem::new("department", "beaker"),
        MetadataItem::new("sshKeys", "google_compute:abcd123"),
    ];
    provider
        .set_instance_metadata(name, &fingerprint, &items)
        .await
        .unwrap();
    let stored = server
        .resource(&format!("{}/zones/{}/instances/{}", PROJECT, ZONE, name))
        .unwrap();
    assert_eq!(stored["metadata"]["items"][1]["value"], "google_compute:abcd123");

    let firewall = provider.create_firewall(name).await.unwrap();
    assert_eq!(firewall.as_value()["sourceRanges"], json!(["0.0.0.0/0"]));
    assert!(server.has_resource(&format!("{}/global/firewalls/{}", PROJECT, name)));

    assert_eq!(provider.list_instances().await.unwrap().len(), 1);
    assert_eq!(provider.list_disks().await.unwrap().len(), 1);
    assert_eq!(provider.list_firewalls().await.unwrap().len(), 1);

    provider.delete_instance(name).await.unwrap();
    provider.delete_disk(name).await.unwrap();
    provider.delete_firewall(name).await.unwrap();

    assert!(provider.list_instances().await.unwrap().is_empty());
    assert!(provider.list_disks().await.unwrap().is_empty());
    assert!(provider.list_firewalls().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_missing_resource_is_success() {
    let server = TestServer::start().await;
    server.provider().delete_disk("never-created").await.unwrap();
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn test_duplicate_create_fails_without_polling() {
    let server = TestServer::start().await;
    let provider = server.provider();
    provider.create_firewall("beaker-tmp-firewall-rule").await.unwrap();
    let before = server.request_count();

    let err = provider
        .create_firewall("beaker-tmp-firewall-rule")
        .await
        .unwrap_err();
    assert!(matches!(
        err.cloud_error(),
        Some(CloudError::Api { status: 409, .. })
    ));
    assert_eq!(server.request_count(), before + 1);
}

#[tokio::test]
async fn test_server_errors_during_polling_are_retried() {
    let server = TestServer::start().await;
    server.state.lock().unwrap().operation_failures = vec![503, 500];

    let disk = server.provider().create_disk("beaker-tmp-disk", None).await.unwrap();
    assert_eq!(disk.name(), Some("beaker-tmp-disk"));
}

#[tokio::test]
async fn test_bad_credentials_are_not_retried() {
    let server = TestServer::start().await;
    let client = server.client("expired");
    let disk = ResourceRef::new(ResourceKind::Disk, PROJECT, ZONE, "beaker-tmp-disk").unwrap();

    match client.get(&disk).await {
        Err(CloudError::Api { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected 401, got {:?}", other),
    }
}

#[tokio::test]
async fn test_lookups() {
    let server = TestServer::start().await;
    let provider = server.provider();

    let network = provider.get_network().await.unwrap();
    assert_eq!(network.name(), Some("default"));
    let machine_type = provider.get_machine_type().await.unwrap();
    assert_eq!(machine_type.name(), Some("n1-standard-1"));

    assert_eq!(
        provider.default_network_url(),
        "https://www.googleapis.com/compute/v1/projects/beaker-compute/global/networks/default"
    );
}

#[tokio::test]
async fn test_missing_machine_type_is_a_config_error() {
    let server = TestServer::start().await;
    let settings = skiff_config::Settings {
        machine_type: "n9-imaginary".to_string(),
        ..settings()
    };
    let provider = skiff_cloud_gce::GceProvider::new(settings, server.client(TOKEN)).unwrap();

    assert!(matches!(
        provider.get_machine_type().await,
        Err(GceError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn test_cancelled_provider_sends_nothing() {
    let server = TestServer::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let provider = server.provider().with_cancellation(cancel);

    let err = provider.resolve_latest_image("centos-7-x86_64").await.unwrap_err();
    assert!(matches!(err.cloud_error(), Some(CloudError::Cancelled)));

    let err = provider.create_disk("beaker-tmp-disk", None).await.unwrap_err();
    assert!(matches!(err.cloud_error(), Some(CloudError::Cancelled)));

    assert_eq!(server.request_count(), 0);
}
