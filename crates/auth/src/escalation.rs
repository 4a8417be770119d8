//! Super-admin escalation guard.
//!
//! Only a current super-admin may create, modify, or remove the super-admin
//! association on any user, themselves included. Every other change is
//! allowed as long as it leaves the super-admin membership bit untouched.

use datagate_core::{AuthError, AuthResult};

use crate::naming::SUPER_ADMIN;
use crate::User;

/// Whether any of the user's roles grants the super-admin privilege.
pub fn holds_super_admin(user: &User) -> bool {
    user.has_privilege(SUPER_ADMIN)
}

/// Decide whether `acting` may persist `input`.
///
/// `original` is the currently stored user, or `None` when `input` is new.
pub fn can_apply_role_change(acting: &User, input: &User, original: Option<&User>) -> bool {
    if holds_super_admin(acting) {
        return true;
    }

    let input_has_super_admin = holds_super_admin(input);
    match original {
        None => !input_has_super_admin,
        Some(original) => input_has_super_admin == holds_super_admin(original),
    }
}

/// Check a whole batch before anything is persisted.
///
/// The first denied change fails the batch; callers must not persist any part
/// of it in that case.
pub fn check_batch<'a, I>(acting: &User, changes: I) -> AuthResult<()>
where
    I: IntoIterator<Item = (&'a User, Option<&'a User>)>,
{
    for (input, original) in changes {
        if can_apply_role_change(acting, input, original) {
            continue;
        }

        tracing::error!(
            acting_user = %acting.id,
            acting_roles = %acting.role_string(),
            target_user = %input.id,
            creating = original.is_none(),
            "user is not allowed to change the {SUPER_ADMIN} association"
        );

        return Err(match original {
            None => AuthError::protocol(format!(
                "Not allowed to add a user with a {SUPER_ADMIN} privilege associated."
            )),
            Some(_) => AuthError::protocol(format!(
                "Not allowed to update a user with changes associated to {SUPER_ADMIN} privilege."
            )),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Privilege, Role};
    use proptest::prelude::*;

    fn super_admin_role() -> Role {
        Role::new("PIC-SURE Top Admin").with_privilege(Privilege::new(SUPER_ADMIN))
    }

    fn admin_role() -> Role {
        Role::new("Admin").with_privilege(Privilege::new("ADMIN"))
    }

    fn user_with(super_admin: bool) -> User {
        let user = User::new("fence|target").with_role(admin_role());
        if super_admin {
            user.with_role(super_admin_role())
        } else {
            user
        }
    }

    #[test]
    fn super_admin_may_do_anything() {
        let acting = User::new("fence|root").with_role(super_admin_role());
        assert!(can_apply_role_change(&acting, &user_with(true), None));
        assert!(can_apply_role_change(&acting, &user_with(false), Some(&user_with(true))));
        assert!(can_apply_role_change(&acting, &user_with(true), Some(&user_with(false))));
    }

    #[test]
    fn admin_cannot_create_super_admin() {
        let acting = user_with(false);
        assert!(!can_apply_role_change(&acting, &user_with(true), None));
        assert!(can_apply_role_change(&acting, &user_with(false), None));
    }

    #[test]
    fn admin_cannot_grant_or_revoke_super_admin() {
        let acting = user_with(false);
        assert!(!can_apply_role_change(&acting, &user_with(true), Some(&user_with(false))));
        assert!(!can_apply_role_change(&acting, &user_with(false), Some(&user_with(true))));
    }

    #[test]
    fn admin_may_edit_super_admin_without_touching_the_bit() {
        let acting = user_with(false);
        let mut edited = user_with(true);
        edited.email = Some("new@example.org".to_string());
        assert!(can_apply_role_change(&acting, &edited, Some(&user_with(true))));
    }

    #[test]
    fn batch_fails_on_any_denied_change() {
        let acting = user_with(false);
        let harmless = user_with(false);
        let escalated = user_with(true);
        let original = user_with(false);

        let result = check_batch(
            &acting,
            vec![(&harmless, Some(&original)), (&escalated, Some(&original))],
        );
        assert!(matches!(result, Err(AuthError::Protocol(msg)) if msg.contains(SUPER_ADMIN)));

        assert!(check_batch(&acting, vec![(&harmless, Some(&original))]).is_ok());
    }

    proptest! {
        #[test]
        fn non_super_admin_cannot_flip_the_bit(
            input_bit in any::<bool>(),
            original_bit in proptest::option::of(any::<bool>()),
            acting_extra_roles in 0usize..3,
        ) {
            let mut acting = User::new("fence|acting");
            for i in 0..acting_extra_roles {
                acting = acting.with_role(Role::new(format!("R{i}")).with_privilege(Privilege::new(format!("P{i}"))));
            }
            let input = user_with(input_bit);
            let original = original_bit.map(user_with);

            let allowed = can_apply_role_change(&acting, &input, original.as_ref());
            let expected = match original_bit {
                None => !input_bit,
                Some(bit) => bit == input_bit,
            };
            prop_assert_eq!(allowed, expected);
        }
    }
}
