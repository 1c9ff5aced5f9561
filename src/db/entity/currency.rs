use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

use crate::enums::Lifecycle;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "currency")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub is_fiat: bool,
    pub decimal_places: i32,
    pub lifecycle: Lifecycle,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn places(&self) -> u32 {
        self.decimal_places.max(0) as u32
    }
}
