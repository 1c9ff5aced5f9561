use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exchange_rate")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub from_currency: String,
    pub to_currency: String,
    /// Units of `to_currency` per one unit of `from_currency`.
    pub rate: Decimal,
    pub effective_from: DateTimeUtc,
    pub effective_until: Option<DateTimeUtc>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_current_at(&self, now: DateTimeUtc) -> bool {
        self.is_active &&
            self.effective_from <= now &&
            self.effective_until.map_or(true, |until| now < until)
    }
}
