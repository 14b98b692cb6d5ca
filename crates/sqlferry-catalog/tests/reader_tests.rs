use std::sync::Arc;

use sqlferry_catalog::test_utils::MemoryServer;
use sqlferry_catalog::CatalogReader;
use sqlferry_core::{Column, MigrationError, Routine, Table};

fn seeded_server() -> MemoryServer {
    let server = MemoryServer::new()
        .with_database("Sales")
        .with_database("Archive");
    server.add_routine(
        "Sales",
        Routine::new("dbo", "GetOrders", "CREATE PROCEDURE [dbo].[GetOrders] AS SELECT 1"),
    );
    server.add_routine(
        "Sales",
        Routine::new("audit", "Purge", "CREATE PROCEDURE audit.Purge AS SELECT 1"),
    );
    server.add_table(
        "Sales",
        Table::new("dbo", "Customer").with_columns(vec![
            Column::new("Id", "int").not_null().identity().primary_key().ordinal(1),
            Column::new("Name", "nvarchar").max_length(50).ordinal(2),
        ]),
    );
    server
}

#[tokio::test]
async fn test_list_databases_hides_system_databases() {
    let server = seeded_server().with_database("master").with_database("tempdb");
    let reader = CatalogReader::new(Arc::new(server.clone()));

    let databases = reader
        .list_databases(&server.descriptor("Sales"))
        .await
        .unwrap();
    assert_eq!(databases, vec!["Archive".to_string(), "Sales".to_string()]);
}

#[tokio::test]
async fn test_list_routines_ordered_by_schema_and_name() {
    let server = seeded_server();
    let reader = CatalogReader::new(Arc::new(server.clone()));

    let routines = reader.list_routines(&server.descriptor("Sales")).await.unwrap();
    let names: Vec<String> = routines.iter().map(|r| r.full_name()).collect();
    assert_eq!(names, vec!["audit.Purge", "dbo.GetOrders"]);
}

#[tokio::test]
async fn test_list_tables_synthesizes_definition() {
    let server = seeded_server();
    let reader = CatalogReader::new(Arc::new(server.clone()));

    let tables = reader.list_tables(&server.descriptor("Sales")).await.unwrap();
    assert_eq!(tables.len(), 1);
    let customer = &tables[0];
    assert_eq!(customer.columns.len(), 2);
    assert!(customer.definition.starts_with("CREATE TABLE [dbo].[Customer] ("));
    assert!(customer.definition.contains("[Id] int IDENTITY(1,1) NOT NULL"));
    assert!(customer
        .definition
        .contains("CONSTRAINT [PK_Customer] PRIMARY KEY CLUSTERED ([Id])"));
}

#[tokio::test]
async fn test_existence_checks_degrade_to_false() {
    let server = seeded_server();
    let reader = CatalogReader::new(Arc::new(server.clone()));
    let sales = server.descriptor("Sales");

    assert!(reader.routine_exists(&sales, "dbo", "GetOrders").await);
    assert!(reader.routine_exists(&sales, "DBO", "getorders").await);
    assert!(reader.table_exists(&sales, "dbo", "Customer").await);
    assert!(reader.object_exists(&sales, "Customer").await);
    assert!(reader.object_exists(&sales, "Purge").await);
    assert!(!reader.object_exists(&sales, "Nothing").await);

    server.set_failing_lookups(true);
    assert!(!reader.routine_exists(&sales, "dbo", "GetOrders").await);
    assert!(!reader.table_exists(&sales, "dbo", "Customer").await);

    server.set_failing_lookups(false);
    server.set_unreachable(true);
    assert!(!reader.object_exists(&sales, "Customer").await);
    assert!(!reader.test_connection(&sales).await);
}

#[tokio::test]
async fn test_data_calls_surface_errors() {
    let server = seeded_server();
    server.set_unreachable(true);
    let reader = CatalogReader::new(Arc::new(server.clone()));

    let result = reader.list_databases(&server.descriptor("Sales")).await;
    assert!(matches!(result, Err(MigrationError::Connectivity(_))));

    server.set_unreachable(false);
    server.set_failing_lookups(true);
    let result = reader.list_routines(&server.descriptor("Sales")).await;
    assert!(matches!(result, Err(MigrationError::Catalog(_))));
}

#[tokio::test]
async fn test_create_database_and_exists() {
    let server = seeded_server();
    let reader = CatalogReader::new(Arc::new(server.clone()));
    let sales = server.descriptor("Sales");

    assert!(!reader.database_exists(&sales, "Reporting").await);
    reader.create_database(&sales, "Reporting").await.unwrap();
    assert!(reader.database_exists(&sales, "Reporting").await);
    assert!(server.has_database("Reporting"));
}

#[tokio::test]
async fn test_routine_definition_any_schema() {
    let server = seeded_server();
    let reader = CatalogReader::new(Arc::new(server.clone()));
    let sales = server.descriptor("Sales");

    let definition = reader
        .routine_definition(&sales, None, "Purge")
        .await
        .unwrap();
    assert_eq!(
        definition.as_deref(),
        Some("CREATE PROCEDURE audit.Purge AS SELECT 1")
    );
    assert!(reader
        .routine_definition(&sales, Some("dbo"), "Purge")
        .await
        .unwrap()
        .is_none());
}
