use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};

use crate::entity::{item, user};

/// Connect to the database and create missing tables from the entity
/// definitions. Table creation is idempotent, so repeated startups against
/// an existing database are safe.
pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    create_tables(&db).await?;

    Ok(db)
}

async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut create_user = schema.create_table_from_entity(user::Entity);
    db.execute(backend.build(create_user.if_not_exists()))
        .await?;

    let mut create_item = schema.create_table_from_entity(item::Entity);
    db.execute(backend.build(create_item.if_not_exists()))
        .await?;

    Ok(())
}
