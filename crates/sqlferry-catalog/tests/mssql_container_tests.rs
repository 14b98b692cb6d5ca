//! Live SQL Server tests. They need Docker and pull a large image, so they are ignored
//! by default: `cargo test -p sqlferry-catalog -- --ignored`.

use std::sync::Arc;

use sqlferry_catalog::{CatalogReader, MssqlConnector};
use sqlferry_core::ConnectionDescriptor;
use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    GenericImage, ImageExt,
};

const SA_PASSWORD: &str = "Sqlferry_Test_2024!";

#[tokio::test]
#[ignore]
async fn test_catalog_against_sql_server() -> anyhow::Result<()> {
    let container = GenericImage::new("mcr.microsoft.com/mssql/server", "2022-latest")
        .with_exposed_port(ContainerPort::Tcp(1433))
        .with_wait_for(WaitFor::message_on_stdout(
            "SQL Server is now ready for client connections",
        ))
        .with_env_var("ACCEPT_EULA", "Y")
        .with_env_var("MSSQL_SA_PASSWORD", SA_PASSWORD)
        .start()
        .await?;

    let port = container.get_host_port_ipv4(1433).await?;
    let server = ConnectionDescriptor::credentialed(format!("127.0.0.1,{}", port), "sa", SA_PASSWORD)?;
    let reader = CatalogReader::new(Arc::new(MssqlConnector::new()));

    // The server logs readiness slightly before it accepts logins
    let mut ready = false;
    for _ in 0..30 {
        if reader.test_connection(&server).await {
            ready = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
    assert!(ready, "SQL Server did not accept connections");

    reader.create_database(&server, "FerryTest").await?;
    assert!(reader.database_exists(&server, "FerryTest").await);

    let db = server.for_database("FerryTest");
    let mut session = reader.open(&db).await?;
    session
        .execute(
            "CREATE TABLE [dbo].[Customer] ([Id] int IDENTITY(1,1) NOT NULL, \
             [Name] nvarchar(50) NULL, CONSTRAINT [PK_Customer] PRIMARY KEY CLUSTERED ([Id]))",
        )
        .await?;
    session
        .execute("CREATE PROCEDURE [dbo].[GetCustomers] AS SELECT * FROM [dbo].[Customer]")
        .await?;
    drop(session);

    let columns = reader.list_columns(&db, "dbo", "Customer").await?;
    assert_eq!(columns.len(), 2);
    assert!(columns[0].is_primary_key);
    assert!(columns[0].is_identity);
    assert_eq!(columns[1].max_length, Some(50));

    let routines = reader.list_routines(&db).await?;
    assert_eq!(routines.len(), 1);
    assert_eq!(routines[0].full_name(), "dbo.GetCustomers");

    assert!(reader.object_exists(&db, "GetCustomers").await);
    let databases = reader.list_databases(&server).await?;
    assert!(databases.iter().any(|name| name == "FerryTest"));
    Ok(())
}
