use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Random 64-char hex string handed out in the refresh cookie.
    #[sea_orm(unique)]
    pub token: String,

    pub user_id: i32,

    /// Long-lived ("remember me") tokens keep this flag across rotations.
    pub remember_me: bool,

    pub expires_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// A token is usable strictly before its expiry instant.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTimeUtc) -> bool {
        now < self.expires_at
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
