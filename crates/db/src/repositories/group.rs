//! Idea group repository: groups, members, messages and read receipts.

use std::sync::Arc;

use chrono::Utc;
use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    sea_query::{Expr, OnConflict, Query},
};

use super::map_insert_err;
use crate::entities::{
    GroupMember, GroupMessage, GroupMessageRead, IdeaGroup, group_member, group_message,
    group_message_read, idea_group,
};

/// Repository for idea group operations.
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRepository {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Groups ====================

    /// Get group by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<idea_group::Model> {
        IdeaGroup::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::not_found("Group"))
    }

    /// Find the group of an idea.
    pub async fn find_by_idea(&self, idea_id: &str) -> AppResult<Option<idea_group::Model>> {
        IdeaGroup::find()
            .filter(idea_group::Column::IdeaId.eq(idea_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the group of an idea, returning error if not found.
    pub async fn get_by_idea(&self, idea_id: &str) -> AppResult<idea_group::Model> {
        self.find_by_idea(idea_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group"))
    }

    /// Groups the user belongs to, most recently active first.
    pub async fn find_by_member(&self, user_id: &str) -> AppResult<Vec<idea_group::Model>> {
        IdeaGroup::find()
            .join(JoinType::InnerJoin, idea_group::Relation::Member.def())
            .filter(group_member::Column::UserId.eq(user_id))
            .order_by(idea_group::Column::UpdatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a group.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: idea_group::ActiveModel,
    ) -> AppResult<idea_group::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "Idea already has a group"))
    }

    /// Bump the group's `updated_at`.
    pub async fn touch<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        IdeaGroup::update_many()
            .col_expr(idea_group::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(idea_group::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    // ==================== Members ====================

    /// Find a user's membership in a group.
    pub async fn find_member<C: ConnectionTrait>(
        &self,
        conn: &C,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user is a member of a group.
    pub async fn is_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self
            .find_member(self.db.as_ref(), group_id, user_id)
            .await?
            .is_some())
    }

    /// Members of a group in join order.
    pub async fn find_members(&self, group_id: &str) -> AppResult<Vec<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .order_by(group_member::Column::JoinedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count members of a group.
    pub async fn count_members(&self, group_id: &str) -> AppResult<u64> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a member.
    pub async fn add_member<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: group_member::ActiveModel,
    ) -> AppResult<group_member::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "Already a member of this group"))
    }

    /// Remove a member.
    pub async fn remove_member<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        GroupMember::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    // ==================== Messages ====================

    /// Messages of a group, oldest first.
    pub async fn find_messages(&self, group_id: &str) -> AppResult<Vec<group_message::Model>> {
        GroupMessage::find()
            .filter(group_message::Column::GroupId.eq(group_id))
            .order_by(group_message::Column::CreatedAt, Order::Asc)
            .order_by(group_message::Column::Id, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recent message of a group.
    pub async fn find_last_message(
        &self,
        group_id: &str,
    ) -> AppResult<Option<group_message::Model>> {
        GroupMessage::find()
            .filter(group_message::Column::GroupId.eq(group_id))
            .order_by(group_message::Column::CreatedAt, Order::Desc)
            .order_by(group_message::Column::Id, Order::Desc)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a message.
    pub async fn create_message<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: group_message::ActiveModel,
    ) -> AppResult<group_message::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Read receipts ====================

    /// IDs among `message_ids` the user has read.
    pub async fn find_read_message_ids(
        &self,
        user_id: &str,
        message_ids: &[String],
    ) -> AppResult<Vec<String>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        GroupMessageRead::find()
            .select_only()
            .column(group_message_read::Column::MessageId)
            .filter(group_message_read::Column::UserId.eq(user_id))
            .filter(group_message_read::Column::MessageId.is_in(message_ids.iter().cloned()))
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn read_by_user(user_id: &str) -> sea_orm::sea_query::SelectStatement {
        Query::select()
            .column(group_message_read::Column::MessageId)
            .from(GroupMessageRead)
            .and_where(group_message_read::Column::UserId.eq(user_id))
            .to_owned()
    }

    /// Messages in a group sent by others and not yet read by the user.
    pub async fn find_unread_messages<C: ConnectionTrait>(
        &self,
        conn: &C,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<group_message::Model>> {
        GroupMessage::find()
            .filter(group_message::Column::GroupId.eq(group_id))
            .filter(group_message::Column::SenderId.ne(user_id))
            .filter(group_message::Column::Id.not_in_subquery(Self::read_by_user(user_id)))
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count unread messages in one group.
    pub async fn count_unread(&self, group_id: &str, user_id: &str) -> AppResult<u64> {
        GroupMessage::find()
            .filter(group_message::Column::GroupId.eq(group_id))
            .filter(group_message::Column::SenderId.ne(user_id))
            .filter(group_message::Column::Id.not_in_subquery(Self::read_by_user(user_id)))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count unread messages across every group the user belongs to.
    pub async fn count_unread_total(&self, user_id: &str) -> AppResult<u64> {
        let member_groups = Query::select()
            .column(group_member::Column::GroupId)
            .from(GroupMember)
            .and_where(group_member::Column::UserId.eq(user_id))
            .to_owned();

        GroupMessage::find()
            .filter(group_message::Column::GroupId.in_subquery(member_groups))
            .filter(group_message::Column::SenderId.ne(user_id))
            .filter(group_message::Column::Id.not_in_subquery(Self::read_by_user(user_id)))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a read receipt. An existing receipt is left untouched.
    pub async fn mark_read<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: group_message_read::ActiveModel,
    ) -> AppResult<u64> {
        GroupMessageRead::insert(model)
            .on_conflict(
                OnConflict::columns([
                    group_message_read::Column::MessageId,
                    group_message_read::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
