use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Database, IndexModel,
};

use super::store::StoreResult;

async fn unique_id_index(db: &Database, collection: &str) -> StoreResult<()> {
    let col = db.collection::<Document>(collection);
    let model = IndexModel::builder()
        .keys(doc! { "id": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    col.create_index(model, None).await?;
    Ok(())
}

pub async fn ensure_indexes(db: &Database) -> StoreResult<()> {
    for name in ["users", "alerts", "triggered_alerts"] {
        unique_id_index(db, name).await?;
    }

    // users: unique email
    {
        let col = db.collection::<Document>("users");
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: listing by owner, newest first
    {
        let col = db.collection::<Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "created_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: evaluation pass scan
    {
        let col = db.collection::<Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "is_active": 1, "is_triggered": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // triggered_alerts: join from owner's alerts
    {
        let col = db.collection::<Document>("triggered_alerts");
        let model = IndexModel::builder()
            .keys(doc! { "alert_id": 1, "triggered_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    tracing::info!(db = %db.name(), "mongodb indexes ensured");
    Ok(())
}
