use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{ResultEngine, odds_snapshots};

use super::Engine;

impl Engine {
    pub async fn store_odds_snapshot(
        &self,
        sport: &str,
        payload: &serde_json::Value,
    ) -> ResultEngine<odds_snapshots::Model> {
        let model = odds_snapshots::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            sport: ActiveValue::Set(sport.to_string()),
            payload: ActiveValue::Set(serde_json::to_string(payload)?),
            fetched_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;
        Ok(model)
    }

    /// The newest stored payload for `sport`, if any was ever fetched.
    pub async fn latest_odds_snapshot(
        &self,
        sport: &str,
    ) -> ResultEngine<Option<serde_json::Value>> {
        let snapshot = odds_snapshots::Entity::find()
            .filter(odds_snapshots::Column::Sport.eq(sport.to_string()))
            .order_by_desc(odds_snapshots::Column::FetchedAt)
            .one(&self.database)
            .await?;
        snapshot
            .map(|s| serde_json::from_str(&s.payload).map_err(Into::into))
            .transpose()
    }
}
