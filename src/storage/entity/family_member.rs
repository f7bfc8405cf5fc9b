use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 账户下的一名家庭成员；slot 为 1..=4 且同一账户内连续
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "family_members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub email: String,
    pub slot: i32,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub race: String,
    pub gender: String,
    pub height: String,
    pub weight: String,
    pub a1c: String,
    pub blood_pressure: String,
    pub medicine: String,
    pub tokens: i32, // 已提问次数
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
