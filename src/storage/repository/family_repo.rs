use crate::storage::entity::family_member::{
    self, ActiveModel as FamilyMemberActiveModel, Entity as FamilyMember, Model as FamilyMemberModel,
};
use chrono::Utc;
use log::info;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

pub const MAX_MEMBERS: i32 = 4;
pub const QUESTION_LIMIT: i32 = 100;

#[derive(thiserror::Error, Debug)]
pub enum FamilyError {
    #[error("Invalid member index. Must be between 1 and 4")]
    InvalidIndex,
    #[error("Maximum of 4 members allowed per user.")]
    MemberLimit,
    #[error("Question limit exceeded.")]
    QuestionLimit,
    #[error("User not found")]
    UserNotFound,
    #[error("Member {0} not found")]
    SlotEmpty(i32),
    #[error("Member not found")]
    MemberNotFound,
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

/// 新增/编辑成员时前端提交的表单，`email` 指明所属账户
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
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
    #[serde(default)]
    pub tokens: i32,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
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
    pub tokens: i32,
}

impl From<FamilyMemberModel> for MemberProfile {
    fn from(model: FamilyMemberModel) -> Self {
        Self {
            first_name: model.first_name,
            last_name: model.last_name,
            dob: model.dob,
            race: model.race,
            gender: model.gender,
            height: model.height,
            weight: model.weight,
            a1c: model.a1c,
            blood_pressure: model.blood_pressure,
            medicine: model.medicine,
            tokens: model.tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetails {
    pub member_index: i32,
    #[serde(flatten)]
    pub profile: MemberProfile,
    pub full_name: String,
}

pub struct FamilyRepository;

impl FamilyRepository {
    fn check_index(index: i32) -> Result<(), FamilyError> {
        if (1..=MAX_MEMBERS).contains(&index) {
            Ok(())
        } else {
            Err(FamilyError::InvalidIndex)
        }
    }

    async fn account_exists<C: sea_orm::ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<bool, DbErr> {
        let n = FamilyMember::find()
            .filter(family_member::Column::Email.eq(email))
            .count(db)
            .await?;
        Ok(n > 0)
    }

    async fn find_slot<C: sea_orm::ConnectionTrait>(
        db: &C,
        email: &str,
        slot: i32,
    ) -> Result<Option<FamilyMemberModel>, DbErr> {
        FamilyMember::find()
            .filter(family_member::Column::Email.eq(email))
            .filter(family_member::Column::Slot.eq(slot))
            .one(db)
            .await
    }

    /// 名字按 first_name 匹配，重名时取槽位最小者
    async fn find_by_name(
        db: &DatabaseConnection,
        email: &str,
        member_name: &str,
    ) -> Result<FamilyMemberModel, FamilyError> {
        if !Self::account_exists(db, email).await? {
            return Err(FamilyError::UserNotFound);
        }
        FamilyMember::find()
            .filter(family_member::Column::Email.eq(email))
            .filter(family_member::Column::FirstName.eq(member_name))
            .order_by_asc(family_member::Column::Slot)
            .one(db)
            .await?
            .ok_or(FamilyError::MemberNotFound)
    }

    /// 写入下一个空槽位，返回槽位号
    pub async fn add_member(
        db: &DatabaseConnection,
        input: MemberInput,
    ) -> Result<i32, FamilyError> {
        let txn = db.begin().await?;

        let used = FamilyMember::find()
            .filter(family_member::Column::Email.eq(input.email.as_str()))
            .count(&txn)
            .await? as i32;
        if used >= MAX_MEMBERS {
            return Err(FamilyError::MemberLimit);
        }
        let slot = used + 1;

        let now = Utc::now().timestamp();
        let active_model = FamilyMemberActiveModel {
            email: Set(input.email),
            slot: Set(slot),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            dob: Set(input.dob),
            race: Set(input.race),
            gender: Set(input.gender),
            height: Set(input.height),
            weight: Set(input.weight),
            a1c: Set(input.a1c),
            blood_pressure: Set(input.blood_pressure),
            medicine: Set(input.medicine),
            tokens: Set(input.tokens),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active_model.insert(&txn).await?;
        txn.commit().await?;

        Ok(slot)
    }

    pub async fn edit_member(
        db: &DatabaseConnection,
        index: i32,
        input: MemberInput,
    ) -> Result<(), FamilyError> {
        Self::check_index(index)?;
        if !Self::account_exists(db, &input.email).await? {
            return Err(FamilyError::UserNotFound);
        }
        let current = Self::find_slot(db, &input.email, index)
            .await?
            .ok_or(FamilyError::SlotEmpty(index))?;

        let update = FamilyMemberActiveModel {
            id: Set(current.id),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            dob: Set(input.dob),
            race: Set(input.race),
            gender: Set(input.gender),
            height: Set(input.height),
            weight: Set(input.weight),
            a1c: Set(input.a1c),
            blood_pressure: Set(input.blood_pressure),
            medicine: Set(input.medicine),
            tokens: Set(input.tokens),
            updated_at: Set(Utc::now().timestamp()),
            ..Default::default()
        };
        update.update(db).await?;
        Ok(())
    }

    pub async fn list_members(
        db: &DatabaseConnection,
        email: &str,
    ) -> Result<Vec<MemberProfile>, FamilyError> {
        let rows = FamilyMember::find()
            .filter(family_member::Column::Email.eq(email))
            .order_by_asc(family_member::Column::Slot)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(MemberProfile::from).collect())
    }

    pub async fn member_details(
        db: &DatabaseConnection,
        email: &str,
        index: i32,
    ) -> Result<MemberDetails, FamilyError> {
        Self::check_index(index)?;
        if !Self::account_exists(db, email).await? {
            return Err(FamilyError::UserNotFound);
        }
        let model = Self::find_slot(db, email, index)
            .await?
            .ok_or(FamilyError::SlotEmpty(index))?;

        let full_name = format!("{} {}", model.first_name, model.last_name);
        Ok(MemberDetails {
            member_index: index,
            profile: model.into(),
            full_name,
        })
    }

    /// 删除槽位并把其后的成员依次前移，保证槽位连续
    pub async fn delete_member(
        db: &DatabaseConnection,
        email: &str,
        index: i32,
    ) -> Result<(), FamilyError> {
        Self::check_index(index)?;
        let txn = db.begin().await?;

        if !Self::account_exists(&txn, email).await? {
            return Err(FamilyError::UserNotFound);
        }
        let target = Self::find_slot(&txn, email, index)
            .await?
            .ok_or(FamilyError::SlotEmpty(index))?;
        FamilyMember::delete_by_id(target.id).exec(&txn).await?;

        let later = FamilyMember::find()
            .filter(family_member::Column::Email.eq(email))
            .filter(family_member::Column::Slot.gt(index))
            .order_by_asc(family_member::Column::Slot)
            .all(&txn)
            .await?;
        // 逐行前移，避免触发 (email, slot) 唯一约束
        let now = Utc::now().timestamp();
        for row in later {
            let shifted = FamilyMemberActiveModel {
                id: Set(row.id),
                slot: Set(row.slot - 1),
                updated_at: Set(now),
                ..Default::default()
            };
            shifted.update(&txn).await?;
        }

        txn.commit().await?;
        info!("member {} of {} deleted, later members shifted", index, email);
        Ok(())
    }

    /// 提问计数 +1，返回新值；达到上限时拒绝
    pub async fn increment_tokens(
        db: &DatabaseConnection,
        email: &str,
        member_name: &str,
    ) -> Result<i32, FamilyError> {
        let member = Self::find_by_name(db, email, member_name).await?;
        if member.tokens >= QUESTION_LIMIT {
            return Err(FamilyError::QuestionLimit);
        }

        // 条件更新，并发请求也不会越过上限
        let res = FamilyMember::update_many()
            .col_expr(
                family_member::Column::Tokens,
                Expr::col(family_member::Column::Tokens).add(1),
            )
            .col_expr(
                family_member::Column::UpdatedAt,
                Expr::value(Utc::now().timestamp()),
            )
            .filter(family_member::Column::Id.eq(member.id))
            .filter(family_member::Column::Tokens.lt(QUESTION_LIMIT))
            .exec(db)
            .await?;
        if res.rows_affected == 0 {
            return Err(FamilyError::QuestionLimit);
        }

        let updated = FamilyMember::find_by_id(member.id)
            .one(db)
            .await?
            .ok_or(FamilyError::MemberNotFound)?;
        Ok(updated.tokens)
    }

    pub async fn token_count(
        db: &DatabaseConnection,
        email: &str,
        member_name: &str,
    ) -> Result<i32, FamilyError> {
        Ok(Self::find_by_name(db, email, member_name).await?.tokens)
    }

    /// 第一个成员（通常是账户本人）的性别
    pub async fn primary_gender(
        db: &DatabaseConnection,
        email: &str,
    ) -> Result<Option<String>, FamilyError> {
        let first = Self::find_slot(db, email, 1).await?;
        Ok(first.map(|m| m.gender).filter(|g| !g.is_empty()))
    }
}
