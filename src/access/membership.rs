use chrono::Utc;

use super::validation::validate_email;
use super::{MembershipResult, Resolver};
use crate::error::{Error, Result};
use crate::types::{EffectiveRole, MemberRole, MemberWithEmail, PantryMember};

impl Resolver {
    /// Shares a pantry with the user behind `invitee_email`.
    ///
    /// Re-inviting an existing member overwrites their role; the upsert keyed
    /// on (pantry, user) is what keeps concurrent invites from duplicating rows.
    pub async fn invite_member(
        &self,
        requester_id: &str,
        pantry_id: &str,
        invitee_email: &str,
        role: MemberRole,
    ) -> Result<MembershipResult> {
        let (pantry, _) = self
            .require(requester_id, pantry_id, EffectiveRole::can_manage)
            .await?;
        validate_email(invitee_email)?;

        let email = invitee_email.to_owned();
        let invitee = self
            .call("get_user_by_email", move |store| {
                store.get_user_by_email(&email)
            })
            .await?
            .ok_or(Error::UserNotFound)?;

        if invitee.id == pantry.owner_id {
            return Err(Error::AlreadyOwner);
        }

        let now = Utc::now();
        let member = PantryMember {
            pantry_id: pantry.id.clone(),
            user_id: invitee.id.clone(),
            role,
            created_at: now,
            updated_at: now,
        };
        let created = self
            .call("upsert_membership", move |store| {
                store.upsert_membership(&member)
            })
            .await?;

        let member_count = self.compute_member_count(&pantry.id).await?;

        tracing::info!(
            %pantry_id,
            user_id = %invitee.id,
            %role,
            created,
            member_count,
            "member invited"
        );

        Ok(MembershipResult {
            pantry_id: pantry.id,
            user_id: invitee.id,
            email: invitee.email,
            role,
            created,
            member_count,
        })
    }

    /// Changes an existing member's role. Setting the current role is a no-op.
    pub async fn change_member_role(
        &self,
        requester_id: &str,
        pantry_id: &str,
        target_user_id: &str,
        new_role: MemberRole,
    ) -> Result<()> {
        let (pantry, _) = self
            .require(requester_id, pantry_id, EffectiveRole::can_manage)
            .await?;

        if target_user_id == pantry.owner_id {
            return Err(Error::InvalidTarget(
                "the owner's access cannot be changed".to_string(),
            ));
        }

        let (id, user) = (pantry_id.to_owned(), target_user_id.to_owned());
        let updated = self
            .call("update_membership_role", move |store| {
                store.update_membership_role(&id, &user, new_role)
            })
            .await?;

        if !updated {
            return Err(Error::NotFound);
        }

        tracing::info!(
            %pantry_id,
            user_id = %target_user_id,
            role = %new_role,
            "member role changed"
        );
        Ok(())
    }

    /// Removes a member. Removing someone who is not a member succeeds.
    pub async fn remove_member(
        &self,
        requester_id: &str,
        pantry_id: &str,
        target_user_id: &str,
    ) -> Result<()> {
        let (pantry, _) = self
            .require(requester_id, pantry_id, EffectiveRole::can_manage)
            .await?;

        if target_user_id == pantry.owner_id {
            return Err(Error::InvalidTarget(
                "the owner cannot be removed; delete the pantry instead".to_string(),
            ));
        }

        let (id, user) = (pantry_id.to_owned(), target_user_id.to_owned());
        let removed = self
            .call("delete_membership", move |store| {
                store.delete_membership(&id, &user)
            })
            .await?;

        if removed {
            tracing::info!(%pantry_id, user_id = %target_user_id, "member removed");
        } else {
            tracing::debug!(%pantry_id, user_id = %target_user_id, "member already absent");
        }
        Ok(())
    }

    /// Members of a pantry with their emails. Any role may list them.
    pub async fn list_members(
        &self,
        requester_id: &str,
        pantry_id: &str,
    ) -> Result<Vec<MemberWithEmail>> {
        self.require(requester_id, pantry_id, EffectiveRole::can_view)
            .await?;

        let id = pantry_id.to_owned();
        self.call("list_memberships", move |store| store.list_memberships(&id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::access::tests::Fixture;
    use crate::error::Error;
    use crate::types::{EffectiveRole, MemberRole};

    async fn kitchen(fx: &Fixture) -> String {
        fx.add_user("owner", "owner@x.com");
        fx.add_user("a", "a@x.com");
        fx.add_user("b", "b@x.com");
        fx.resolver
            .create_pantry("owner", "Kitchen", None)
            .await
            .unwrap()
            .id
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_invites_create_one_row() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;

        let (first, second) = tokio::join!(
            fx.resolver.invite_member("owner", &pantry_id, "a@x.com", MemberRole::Edit),
            fx.resolver.invite_member("owner", &pantry_id, "a@x.com", MemberRole::View),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!([first.created, second.created].iter().filter(|c| **c).count(), 1);
        assert_eq!(fx.resolver.compute_member_count(&pantry_id).await.unwrap(), 1);

        let members = fx.resolver.list_members("owner", &pantry_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, "a");
    }

    #[tokio::test]
    async fn test_reinvite_overwrites_role_without_new_row() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;

        let first = fx
            .resolver
            .invite_member("owner", &pantry_id, "a@x.com", MemberRole::Edit)
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.member_count, 1);

        let second = fx
            .resolver
            .invite_member("owner", &pantry_id, "A@X.com", MemberRole::View)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.member_count, 1);

        let members = fx.resolver.list_members("owner", &pantry_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, MemberRole::View);
        assert_eq!(
            fx.resolver.resolve_role("a", &pantry_id).await.unwrap(),
            EffectiveRole::Viewer
        );
    }

    #[tokio::test]
    async fn test_invite_unknown_email_is_user_not_found() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;

        let result = fx
            .resolver
            .invite_member("owner", &pantry_id, "nobody@x.com", MemberRole::View)
            .await;
        assert!(matches!(result, Err(Error::UserNotFound)));
    }

    #[tokio::test]
    async fn test_inviting_owner_fails_and_leaves_members_alone() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;
        fx.resolver
            .invite_member("owner", &pantry_id, "a@x.com", MemberRole::View)
            .await
            .unwrap();

        let result = fx
            .resolver
            .invite_member("owner", &pantry_id, "owner@x.com", MemberRole::Edit)
            .await;
        assert!(matches!(result, Err(Error::AlreadyOwner)));
        assert_eq!(fx.resolver.compute_member_count(&pantry_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_only_owner_may_invite() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;
        fx.resolver
            .invite_member("owner", &pantry_id, "a@x.com", MemberRole::Edit)
            .await
            .unwrap();

        let result = fx
            .resolver
            .invite_member("a", &pantry_id, "b@x.com", MemberRole::Edit)
            .await;
        assert!(matches!(result, Err(Error::NotAuthorized)));
        assert_eq!(fx.resolver.compute_member_count(&pantry_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_owner_mutations_are_refused() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;
        for email in ["a@x.com", "b@x.com"] {
            fx.resolver
                .invite_member("owner", &pantry_id, email, MemberRole::Edit)
                .await
                .unwrap();
        }

        let change = fx
            .resolver
            .change_member_role("a", &pantry_id, "b", MemberRole::View)
            .await;
        assert!(matches!(change, Err(Error::NotAuthorized)));

        let remove = fx.resolver.remove_member("a", &pantry_id, "b").await;
        assert!(matches!(remove, Err(Error::NotAuthorized)));

        let delete = fx.resolver.delete_pantry("a", &pantry_id).await;
        assert!(matches!(delete, Err(Error::NotAuthorized)));

        assert_eq!(fx.resolver.compute_member_count(&pantry_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_owner_cannot_be_targeted() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;

        let change = fx
            .resolver
            .change_member_role("owner", &pantry_id, "owner", MemberRole::View)
            .await;
        assert!(matches!(change, Err(Error::InvalidTarget(_))));

        let remove = fx.resolver.remove_member("owner", &pantry_id, "owner").await;
        assert!(matches!(remove, Err(Error::InvalidTarget(_))));
    }

    #[tokio::test]
    async fn test_change_role() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;
        fx.resolver
            .invite_member("owner", &pantry_id, "a@x.com", MemberRole::View)
            .await
            .unwrap();

        fx.resolver
            .change_member_role("owner", &pantry_id, "a", MemberRole::Edit)
            .await
            .unwrap();
        assert_eq!(
            fx.resolver.resolve_role("a", &pantry_id).await.unwrap(),
            EffectiveRole::Editor
        );

        // Same role again is a no-op success.
        fx.resolver
            .change_member_role("owner", &pantry_id, "a", MemberRole::Edit)
            .await
            .unwrap();

        let missing = fx
            .resolver
            .change_member_role("owner", &pantry_id, "b", MemberRole::Edit)
            .await;
        assert!(matches!(missing, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_double_removal_is_silent() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;
        fx.resolver
            .invite_member("owner", &pantry_id, "a@x.com", MemberRole::View)
            .await
            .unwrap();

        fx.resolver.remove_member("owner", &pantry_id, "a").await.unwrap();
        assert_eq!(fx.resolver.compute_member_count(&pantry_id).await.unwrap(), 0);

        fx.resolver.remove_member("owner", &pantry_id, "a").await.unwrap();
        assert_eq!(fx.resolver.compute_member_count(&pantry_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_member_count_tracks_invites_minus_removals() {
        let fx = Fixture::new();
        let pantry_id = kitchen(&fx).await;
        fx.add_user("c", "c@x.com");

        for email in ["a@x.com", "b@x.com", "c@x.com"] {
            fx.resolver
                .invite_member("owner", &pantry_id, email, MemberRole::View)
                .await
                .unwrap();
        }
        for user in ["a", "c"] {
            fx.resolver.remove_member("owner", &pantry_id, user).await.unwrap();
        }

        assert_eq!(fx.resolver.compute_member_count(&pantry_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_kitchen_walkthrough() {
        let fx = Fixture::new();
        fx.add_user("o", "o@x.com");
        fx.add_user("a", "a@x.com");
        fx.add_user("b", "b@x.com");

        let kitchen = fx.resolver.create_pantry("o", "Kitchen", None).await.unwrap();
        assert_eq!(
            fx.resolver.resolve_role("o", &kitchen.id).await.unwrap(),
            EffectiveRole::Owner
        );
        assert_eq!(fx.resolver.compute_member_count(&kitchen.id).await.unwrap(), 0);

        let invited = fx
            .resolver
            .invite_member("o", &kitchen.id, "a@x.com", MemberRole::Edit)
            .await
            .unwrap();
        assert_eq!(invited.user_id, "a");
        assert_eq!(invited.member_count, 1);

        let reinvited = fx
            .resolver
            .invite_member("o", &kitchen.id, "a@x.com", MemberRole::View)
            .await
            .unwrap();
        assert_eq!(reinvited.role, MemberRole::View);
        assert_eq!(reinvited.member_count, 1);

        fx.resolver
            .invite_member("o", &kitchen.id, "b@x.com", MemberRole::View)
            .await
            .unwrap();
        let denied = fx.resolver.remove_member("a", &kitchen.id, "b").await;
        assert!(matches!(denied, Err(Error::NotAuthorized)));

        fx.resolver.remove_member("o", &kitchen.id, "a").await.unwrap();
        assert_eq!(fx.resolver.compute_member_count(&kitchen.id).await.unwrap(), 1);
        fx.resolver.remove_member("o", &kitchen.id, "a").await.unwrap();
        assert_eq!(fx.resolver.compute_member_count(&kitchen.id).await.unwrap(), 1);
    }
}
