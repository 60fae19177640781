use crate::models::{book, user};
use sea_orm::*;

/// Insert a handful of borrowers and shelved books into an empty catalog.
/// Does nothing if any book already exists.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    if book::Entity::find().count(db).await? > 0 {
        tracing::info!("Catalog already has books, skipping demo seed");
        return Ok(());
    }

    // 1. Borrowers
    for name in ["Ana Souza", "Bruno Lima", "Carla Dias"] {
        let borrower = user::ActiveModel {
            name: Set(name.to_owned()),
            ..Default::default()
        };
        user::Entity::insert(borrower).exec(db).await?;
    }

    // 2. Books, all on the shelf
    for title in ["Dom Casmurro", "Dune", "Foundation", "The Hobbit"] {
        let shelved = book::ActiveModel {
            title: Set(title.to_owned()),
            available: Set(true),
            ..Default::default()
        };
        book::Entity::insert(shelved).exec(db).await?;
    }

    Ok(())
}
