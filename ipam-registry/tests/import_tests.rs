//! Integration tests for the import pipeline and the template/export files

use ipam_common::config::TomlConfig;
use ipam_common::db::init_memory_database;
use ipam_common::{AddressRecord, AddressStatus};
use ipam_registry::error::RegistryError;
use ipam_registry::import::{export_csv, template_csv, ImportPipeline};
use ipam_registry::registry::RegistryEngine;

async fn setup() -> (RegistryEngine, ImportPipeline) {
    let pool = init_memory_database(&TomlConfig::default())
        .await
        .expect("Should open in-memory database");
    let engine = RegistryEngine::new(pool, "Douala");
    let pipeline = ImportPipeline::new(engine.clone());
    (engine, pipeline)
}

async fn record(engine: &RegistryEngine, address: &str) -> AddressRecord {
    let summary = engine
        .find_by_address(address)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("{} should be stored", address));
    engine.load_record(summary.id).await.unwrap()
}

#[tokio::test]
async fn test_template_round_trip() {
    let (_engine, pipeline) = setup().await;
    let template = template_csv().unwrap();

    let first = pipeline.run(&template).await.unwrap();
    assert_eq!(first.accepted, 7);
    assert_eq!(first.duplicates, 0);
    assert_eq!(first.rejected, 0);
    assert!(first.diagnostics.is_empty());

    let second = pipeline.run(&template).await.unwrap();
    assert_eq!(second.accepted, 0);
    assert_eq!(second.duplicates, 7);
    assert_eq!(second.rejected, 0);
    assert_eq!(second.diagnostics.len(), 7);
    assert_eq!(
        second.diagnostics[0],
        "line 2: address 172.22.250.2 already exists"
    );
}

#[tokio::test]
async fn test_template_rows_land_as_expected() {
    let (engine, pipeline) = setup().await;
    pipeline.run(&template_csv().unwrap()).await.unwrap();

    let owned = record(&engine, "172.22.250.4").await;
    assert_eq!(owned.owners, vec!["WANTSUK-VODACOM"]);
    assert_eq!(owned.tags, vec!["413", "556"]);
    assert_eq!(owned.status, AddressStatus::Active);
    assert_eq!(owned.region, "DOUALA");

    // UP without an owner is forced active
    let forced = record(&engine, "172.22.250.6").await;
    assert!(forced.owners.is_empty());
    assert_eq!(forced.tags, vec!["2", "210", "413"]);
    assert_eq!(forced.status, AddressStatus::Active);

    let down = record(&engine, "172.22.250.3").await;
    assert!(down.tags.is_empty());
    assert_eq!(down.status, AddressStatus::Inactive);

    let client = record(&engine, "192.168.1.10").await;
    assert_eq!(client.owners, vec!["Client Test"]);
    assert_eq!(client.region, "Yaounde");
}

#[tokio::test]
async fn test_headerless_row_with_known_region() {
    let (engine, pipeline) = setup().await;
    let input = "col1;col2;col3;col4;col5\n172.22.250.2;up;413, 8;DOUALA;DOUALA\n";

    let report = pipeline.run(input.as_bytes()).await.unwrap();
    assert_eq!(report.accepted, 1);

    let stored = record(&engine, "172.22.250.2").await;
    assert_eq!(stored.region, "Douala");
    assert!(stored.owners.is_empty());
    assert_eq!(stored.tags, vec!["413", "8"]);
    assert_eq!(stored.status, AddressStatus::Active);
}

#[tokio::test]
async fn test_comma_file_with_quoted_tags() {
    let (engine, pipeline) = setup().await;
    let input = "ip,status,vlan,client,ville\n10.0.0.1,up,\"20, 30\",Acme,Kribi\n";

    let report = pipeline.run(input.as_bytes()).await.unwrap();
    assert_eq!(report.accepted, 1);

    let stored = record(&engine, "10.0.0.1").await;
    assert_eq!(stored.tags, vec!["20", "30"]);
    assert_eq!(stored.owners, vec!["Acme"]);
    assert_eq!(stored.region, "Kribi");
    assert_eq!(stored.status, AddressStatus::Active);
}

#[tokio::test]
async fn test_tab_file_with_bom_and_french_header() {
    let (engine, pipeline) = setup().await;
    let input = "\u{FEFF}Adresse IP\tEtat\tVLAN\tClient\tVille\n10.0.0.2\tdown\t\t\tBuea\n";

    let report = pipeline.run(input.as_bytes()).await.unwrap();
    assert_eq!(report.accepted, 1);

    let stored = record(&engine, "10.0.0.2").await;
    assert_eq!(stored.status, AddressStatus::Inactive);
    assert_eq!(stored.region, "Buea");
    assert!(stored.tags.is_empty());
}

#[tokio::test]
async fn test_reordered_header() {
    let (engine, pipeline) = setup().await;
    let input = "Customer;City;IP;VLAN\nGlobex;Limbe;10.9.9.9;42\n";

    pipeline.run(input.as_bytes()).await.unwrap();

    let stored = record(&engine, "10.9.9.9").await;
    assert_eq!(stored.owners, vec!["Globex"]);
    assert_eq!(stored.region, "Limbe");
    assert_eq!(stored.tags, vec!["42"]);
}

#[tokio::test]
async fn test_bad_rows_do_not_stop_the_batch() {
    let (_engine, pipeline) = setup().await;
    let input = "ip;status;client\n;up;Nobody\n10.0.0.1;up;Acme\n10.0.0.1;down;\n10.0.0.2;down;\n";

    let report = pipeline.run(input.as_bytes()).await.unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(
        report.diagnostics,
        vec![
            "line 2: missing address".to_string(),
            "line 4: address 10.0.0.1 already exists".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_runs_of_blank_lines_keep_line_numbers_physical() {
    let (_engine, pipeline) = setup().await;
    let input = "ip;client\n\n\n\n;Nobody\n\n;Again\r\n\r\n10.0.0.1;Acme\n\n10.0.0.1;Acme\n";

    let report = pipeline.run(input.as_bytes()).await.unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(
        report.diagnostics,
        vec![
            "line 5: missing address".to_string(),
            "line 7: missing address".to_string(),
            "line 11: address 10.0.0.1 already exists".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_quoted_multiline_cell_counts_its_lines() {
    let (_engine, pipeline) = setup().await;
    let input = "ip;vlan;client\n10.0.0.1;\"20,\n30\";Acme\n;40;Nobody\n";

    let report = pipeline.run(input.as_bytes()).await.unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.diagnostics, vec!["line 4: missing address".to_string()]);
}

#[tokio::test]
async fn test_non_utf8_rows_rejected_without_stopping() {
    let (engine, pipeline) = setup().await;
    // cp1252 "Société" on line 3
    let input = b"\xEF\xBB\xBFip;client\n10.0.0.1;Acme\n10.0.0.2;Soci\xe9t\xe9\n10.0.0.3;Globex\n";

    let report = pipeline.run(input).await.unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(
        report.diagnostics,
        vec!["line 3: malformed row: field 2 is not valid UTF-8".to_string()]
    );
    assert!(engine.find_by_address("10.0.0.2").await.unwrap().is_none());

    let stored = record(&engine, "10.0.0.3").await;
    assert_eq!(stored.owners, vec!["Globex"]);
}

#[tokio::test]
async fn test_rows_share_tags_and_owners_created_earlier() {
    let (engine, pipeline) = setup().await;
    let input = "ip;vlan;client\n10.0.0.1;20;Acme\n10.0.0.2;20;Acme\n";

    pipeline.run(input.as_bytes()).await.unwrap();

    let tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(engine.pool())
        .await
        .unwrap();
    let owners: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM owners")
        .fetch_one(engine.pool())
        .await
        .unwrap();
    assert_eq!((tags, owners), (1, 1));
}

#[tokio::test]
async fn test_empty_file_is_validation_error() {
    let (_engine, pipeline) = setup().await;
    assert!(matches!(
        pipeline.run(b"").await,
        Err(RegistryError::Validation(msg)) if msg == "empty or unreadable file"
    ));
}

#[tokio::test]
async fn test_export_reimports_identically() {
    let (engine, pipeline) = setup().await;
    pipeline.run(&template_csv().unwrap()).await.unwrap();
    let exported = export_csv(&engine).await.unwrap();
    assert!(exported.starts_with("\u{FEFF}".as_bytes()));

    let (copy_engine, copy_pipeline) = setup().await;
    let report = copy_pipeline.run(&exported).await.unwrap();
    assert_eq!(report.accepted, 7);

    let strip = |records: Vec<AddressRecord>| {
        records
            .into_iter()
            .map(|r| (r.address, r.region, r.status, r.tags, r.owners))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        strip(engine.list_records().await.unwrap()),
        strip(copy_engine.list_records().await.unwrap())
    );
}
