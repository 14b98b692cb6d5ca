//! Catalog queries issued against SQL Server
//!
//! Numeric catalog columns are cast to INT so every count and size decodes as `i32`.

pub const LIST_DATABASES: &str = "SELECT name FROM sys.databases \
     WHERE name NOT IN ('master', 'tempdb', 'model', 'msdb') \
     ORDER BY name";

pub const DATABASE_EXISTS: &str =
    "SELECT CAST(COUNT(*) AS INT) FROM sys.databases WHERE name = @P1";

pub const LIST_ROUTINES: &str = r#"
SELECT s.name AS schema_name, p.name AS routine_name, m.definition
FROM sys.procedures p
INNER JOIN sys.schemas s ON p.schema_id = s.schema_id
INNER JOIN sys.sql_modules m ON p.object_id = m.object_id
WHERE p.type = 'P'
ORDER BY s.name, p.name"#;

pub const ROUTINE_EXISTS: &str = r#"
SELECT CAST(COUNT(*) AS INT)
FROM sys.procedures p
INNER JOIN sys.schemas s ON p.schema_id = s.schema_id
WHERE s.name = @P1 AND p.name = @P2"#;

pub const ROUTINE_DEFINITION: &str = r#"
SELECT m.definition
FROM sys.procedures p
INNER JOIN sys.schemas s ON p.schema_id = s.schema_id
INNER JOIN sys.sql_modules m ON p.object_id = m.object_id
WHERE s.name = @P1 AND p.name = @P2"#;

pub const ROUTINE_DEFINITION_ANY_SCHEMA: &str = r#"
SELECT TOP 1 m.definition
FROM sys.procedures p
INNER JOIN sys.sql_modules m ON p.object_id = m.object_id
WHERE p.name = @P1
ORDER BY p.object_id"#;

pub const LIST_TABLES: &str = r#"
SELECT t.TABLE_SCHEMA, t.TABLE_NAME
FROM INFORMATION_SCHEMA.TABLES t
WHERE t.TABLE_TYPE = 'BASE TABLE'
  AND t.TABLE_SCHEMA NOT IN ('sys', 'INFORMATION_SCHEMA')
ORDER BY t.TABLE_SCHEMA, t.TABLE_NAME"#;

pub const TABLE_EXISTS: &str = r#"
SELECT CAST(COUNT(*) AS INT)
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2 AND TABLE_TYPE = 'BASE TABLE'"#;

/// Procedures (`P`) and user tables (`U`) sharing one namespace per schema
pub const OBJECT_EXISTS: &str =
    "SELECT CAST(COUNT(*) AS INT) FROM sys.objects WHERE name = @P1 AND type IN ('P', 'U')";

pub const LIST_COLUMNS: &str = r#"
SELECT
    c.COLUMN_NAME,
    c.DATA_TYPE,
    CAST(c.CHARACTER_MAXIMUM_LENGTH AS INT) AS CHARACTER_MAXIMUM_LENGTH,
    CAST(c.NUMERIC_PRECISION AS INT) AS NUMERIC_PRECISION,
    CAST(c.NUMERIC_SCALE AS INT) AS NUMERIC_SCALE,
    c.IS_NULLABLE,
    c.COLUMN_DEFAULT,
    CAST(c.ORDINAL_POSITION AS INT) AS ORDINAL_POSITION,
    CAST(CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 1 ELSE 0 END AS INT) AS IS_PRIMARY_KEY,
    CAST(ISNULL(COLUMNPROPERTY(OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)),
        c.COLUMN_NAME, 'IsIdentity'), 0) AS INT) AS IS_IDENTITY
FROM INFORMATION_SCHEMA.COLUMNS c
LEFT JOIN (
    SELECT kc.COLUMN_NAME
    FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kc
    INNER JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
        ON kc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
       AND kc.TABLE_SCHEMA = tc.TABLE_SCHEMA
    WHERE tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
      AND tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
) pk ON c.COLUMN_NAME = pk.COLUMN_NAME
WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2
ORDER BY c.ORDINAL_POSITION"#;

pub const BEGIN_TRANSACTION: &str = "BEGIN TRANSACTION";
pub const COMMIT_TRANSACTION: &str = "COMMIT TRANSACTION";
pub const ROLLBACK_TRANSACTION: &str = "IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION";
