//! Application-scoped privilege resolution.
//!
//! - No IO
//! - No panics
//! - Iteration order is role order, then privilege order within each role

use std::collections::BTreeSet;

use serde_json::Value;

use datagate_core::{ApplicationId, AuthResult};

use crate::template::{merge_maps, parse_template};
use crate::{PrivilegeSet, User};

/// Privileges granted to `user` for one application.
///
/// Empty when no role of the user grants a privilege owned by `application_id`.
pub fn effective_privileges(user: &User, application_id: ApplicationId) -> PrivilegeSet {
    user.roles
        .iter()
        .flat_map(|role| role.privileges.iter())
        .filter(|p| p.is_owned_by(application_id))
        .cloned()
        .collect()
}

/// Privileges granted to `user` across every application.
///
/// For display only; access decisions use [`effective_privileges`].
pub fn total_privileges(user: &User) -> PrivilegeSet {
    user.roles
        .iter()
        .flat_map(|role| role.privileges.iter())
        .cloned()
        .collect()
}

/// Deep-merge the query templates of the user's effective privileges.
///
/// Returns `Ok(None)` when no effective privilege carries a template. See
/// [`crate::template`] for the merge policy.
pub fn merged_query_template(user: &User, application_id: ApplicationId) -> AuthResult<Option<Value>> {
    let mut merged = None;
    for privilege in &effective_privileges(user, application_id) {
        let Some(template) = parse_template(privilege)? else {
            continue;
        };
        merged = Some(match merged {
            None => template,
            Some(acc) => merge_maps(acc, template),
        });
    }
    Ok(merged.map(Value::Object))
}

/// Non-blank query scopes across all of the user's privileges.
pub fn query_scopes(user: &User) -> BTreeSet<String> {
    total_privileges(user)
        .iter()
        .filter_map(|p| p.query_scope.as_deref())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Privilege, Role};
    use proptest::prelude::*;
    use serde_json::json;

    fn fixture() -> (ApplicationId, ApplicationId, User) {
        let app_a = ApplicationId::new();
        let app_b = ApplicationId::new();
        let shared = Privilege::new("P_SHARED").for_application(app_a);
        let user = User::new("fence|1")
            .with_role(
                Role::new("R1")
                    .with_privilege(Privilege::new("P1").for_application(app_a).with_query_scope("s1"))
                    .with_privilege(shared.clone()),
            )
            .with_role(
                Role::new("R2")
                    .with_privilege(Privilege::new("P2").for_application(app_b).with_query_scope("  "))
                    .with_privilege(shared),
            );
        (app_a, app_b, user)
    }

    #[test]
    fn effective_privileges_are_scoped_and_deduplicated() {
        let (app_a, app_b, user) = fixture();
        let a = effective_privileges(&user, app_a);
        assert_eq!(a.ordered_names(), vec!["P1", "P_SHARED"]);
        assert_eq!(effective_privileges(&user, app_b).names(), BTreeSet::from(["P2".to_string()]));
        assert!(effective_privileges(&user, ApplicationId::new()).is_empty());
    }

    #[test]
    fn total_privileges_span_applications() {
        let (_, _, user) = fixture();
        assert_eq!(total_privileges(&user).len(), 3);
    }

    #[test]
    fn query_scopes_drop_blanks() {
        let (_, _, user) = fixture();
        assert_eq!(query_scopes(&user), BTreeSet::from(["s1".to_string()]));
    }

    #[test]
    fn templates_merge_in_role_order() {
        let app = ApplicationId::new();
        let user = User::new("fence|1")
            .with_role(Role::new("R1").with_privilege(
                Privilege::new("P1")
                    .for_application(app)
                    .with_query_template(r#"{"fields": ["a"], "limit": 1}"#),
            ))
            .with_role(Role::new("R2").with_privilege(Privilege::new("P_BLANK").for_application(app)))
            .with_role(Role::new("R3").with_privilege(
                Privilege::new("P3")
                    .for_application(app)
                    .with_query_template(r#"{"fields": ["b"], "limit": 5}"#),
            ));

        let merged = merged_query_template(&user, app).unwrap();
        assert_eq!(merged, Some(json!({"fields": ["a", "b"], "limit": 5})));
    }

    #[test]
    fn no_templates_yields_none() {
        let (app_a, _, user) = fixture();
        assert_eq!(merged_query_template(&user, app_a).unwrap(), None);
    }

    #[test]
    fn broken_template_fails_the_merge() {
        let app = ApplicationId::new();
        let user = User::new("fence|1").with_role(Role::new("R").with_privilege(
            Privilege::new("P").for_application(app).with_query_template("nope"),
        ));
        assert!(merged_query_template(&user, app).is_err());
    }

    proptest! {
        #[test]
        fn effective_set_never_leaks_other_applications(
            owners in prop::collection::vec(prop::collection::vec(0usize..4, 0..5), 0..5),
            target in 0usize..4,
        ) {
            let apps: Vec<ApplicationId> = (0..4).map(|_| ApplicationId::new()).collect();
            let mut user = User::new("fence|prop");
            for (r, privileges) in owners.iter().enumerate() {
                let mut role = Role::new(format!("R{r}"));
                for (p, owner) in privileges.iter().enumerate() {
                    role = role.with_privilege(
                        Privilege::new(format!("P{r}_{p}")).for_application(apps[*owner]),
                    );
                }
                user = user.with_role(role);
            }

            let effective = effective_privileges(&user, apps[target]);
            prop_assert!(effective.iter().all(|p| p.is_owned_by(apps[target])));

            let expected = owners.iter().flatten().filter(|o| **o == target).count();
            prop_assert_eq!(effective.len(), expected);
        }
    }
}
