use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

use super::config::Config;

/// Connect with the pool settings from `config` and make sure the schema exists.
pub async fn connect(config: &Config) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(config.connect_options()).await?;

    run_migrations(&db).await?;

    Ok(db)
}

/// Connect with default pool settings. `sqlite::memory:` gets a single
/// pooled connection, so every caller shares one in-memory database.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Books: only the availability flag is managed here
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            available BOOLEAN NOT NULL DEFAULT 1
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Borrowers
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Loans, column names shared with the rest of the catalog
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            id_livro INTEGER NOT NULL,
            id_usuario INTEGER NOT NULL,
            data_emprestimo DATE NOT NULL,
            data_devolucao DATE NOT NULL,
            FOREIGN KEY (id_livro) REFERENCES books(id),
            FOREIGN KEY (id_usuario) REFERENCES users(id)
        )
        "#
        .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_loans_id_livro ON loans(id_livro)".to_owned(),
    ))
    .await?;

    Ok(())
}
