//! Follow service
//!
//! Follow/unfollow between authors for the signed-in user.

use std::sync::Arc;

use crate::data::FollowCounts;
use crate::error::AppError;
use crate::gateway::FollowGateway;

pub struct FollowService {
    gateway: Arc<dyn FollowGateway>,
    /// Signed-in user id; `None` for anonymous sessions
    current_user: Option<String>,
}

impl FollowService {
    pub fn new(gateway: Arc<dyn FollowGateway>, current_user: Option<String>) -> Self {
        Self {
            gateway,
            current_user,
        }
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    fn require_user(&self) -> Result<&str, AppError> {
        self.current_user.as_deref().ok_or(AppError::Unauthorized)
    }

    /// Whether the signed-in user follows `user_id`; always false when anonymous
    pub async fn is_following(&self, user_id: &str) -> Result<bool, AppError> {
        match self.current_user.as_deref() {
            Some(me) => self.gateway.is_following(me, user_id).await,
            None => Ok(false),
        }
    }

    /// Follow or unfollow `user_id`; returns the new state
    ///
    /// # Errors
    /// `Unauthorized` when anonymous, `Validation` when targeting oneself
    pub async fn toggle(&self, user_id: &str) -> Result<bool, AppError> {
        let me = self.require_user()?;
        if me == user_id {
            return Err(AppError::Validation("cannot follow yourself".to_string()));
        }

        if self.gateway.is_following(me, user_id).await? {
            self.gateway.delete_follow(me, user_id).await?;
            tracing::info!(follower = me, following = user_id, "Unfollowed");
            Ok(false)
        } else {
            self.gateway.insert_follow(me, user_id).await?;
            tracing::info!(follower = me, following = user_id, "Followed");
            Ok(true)
        }
    }

    /// Follower and following totals for any user
    pub async fn counts(&self, user_id: &str) -> Result<FollowCounts, AppError> {
        let (followers, following) = tokio::try_join!(
            self.gateway.count_followers(user_id),
            self.gateway.count_following(user_id)
        )?;
        Ok(FollowCounts {
            followers,
            following,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockFollowGateway;

    #[tokio::test]
    async fn anonymous_user_cannot_toggle() {
        let service = FollowService::new(Arc::new(MockFollowGateway::new()), None);
        assert!(!service.is_following("u2").await.unwrap());
        assert!(matches!(
            service.toggle("u2").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn toggle_follows_then_unfollows() {
        let mut gateway = MockFollowGateway::new();
        let mut following = false;
        gateway
            .expect_is_following()
            .withf(|me, other| me == "u1" && other == "u2")
            .returning(move |_, _| {
                let current = following;
                following = !following;
                Ok(current)
            });
        gateway.expect_insert_follow().times(1).returning(|_, _| Ok(()));
        gateway.expect_delete_follow().times(1).returning(|_, _| Ok(()));
        let service = FollowService::new(Arc::new(gateway), Some("u1".to_string()));

        assert!(service.toggle("u2").await.unwrap());
        assert!(!service.toggle("u2").await.unwrap());
    }

    #[tokio::test]
    async fn cannot_follow_self() {
        let service =
            FollowService::new(Arc::new(MockFollowGateway::new()), Some("u1".to_string()));
        assert!(matches!(
            service.toggle("u1").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn counts_combine_both_directions() {
        let mut gateway = MockFollowGateway::new();
        gateway.expect_count_followers().returning(|_| Ok(12));
        gateway.expect_count_following().returning(|_| Ok(3));
        let service = FollowService::new(Arc::new(gateway), None);

        assert_eq!(
            service.counts("u9").await.unwrap(),
            FollowCounts {
                followers: 12,
                following: 3
            }
        );
    }
}
