//! Generic contract specialization matching.
//!
//! A constructor parameter typed `Repository<User>` and one typed
//! `Repository<Order>` both declare the `Repository` capability; the
//! resolver needs a way to tell them apart without reflection over Rust's
//! monomorphized generics (which leave no runtime type-parameter
//! information to inspect). [`ComponentDescriptor::generics`] records that
//! mapping explicitly at registration time; the functions here consult it
//! to find, among several candidates for the same contract, the one bound
//! to the concrete type a dependent actually asked for.

use crate::capability::Capability;
use crate::descriptor::{ComponentDescriptor, TypeHandle};

/// Whether `candidate` is a viable binding for `contract` specialized on
/// `wanted`. A descriptor with no recorded generic binding for `contract`
/// matches any specialization — it is either non-generic or the author
/// chose not to declare a specialization, and the resolver should not
/// reject it on that basis alone.
pub fn specialization_matches(candidate: &ComponentDescriptor, contract: &Capability, wanted: TypeHandle) -> bool {
    let args = candidate.generics.args_of(contract);
    match args.first() {
        Some(bound) => *bound == wanted,
        None => true,
    }
}

/// Filters `candidates` down to those whose `contract` specialization
/// matches `wanted`, preserving input order.
pub fn filter_by_specialization<'a>(
    candidates: &'a [&'a ComponentDescriptor],
    contract: &Capability,
    wanted: TypeHandle,
) -> Vec<&'a ComponentDescriptor> {
    candidates
        .iter()
        .copied()
        .filter(|c| specialization_matches(c, contract, wanted))
        .collect()
}

/// The full type-argument list a descriptor declares for `contract`, for
/// diagnostics (`SecondaryBindingMissing` reporting which specializations
/// a contract *does* have, to help the hint suggest one).
pub fn declared_specializations(candidates: &[&ComponentDescriptor], contract: &Capability) -> Vec<TypeHandle> {
    candidates
        .iter()
        .flat_map(|c| c.generics.args_of(contract))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ComponentDescriptor, TypeHandle};

    const PG_USER_REPO: TypeHandle = TypeHandle::new("app::PgUserRepository", "app");
    const PG_ORDER_REPO: TypeHandle = TypeHandle::new("app::PgOrderRepository", "app");
    const USER: TypeHandle = TypeHandle::new("app::User", "app");
    const ORDER: TypeHandle = TypeHandle::new("app::Order", "app");

    fn repo_descriptor(handle: TypeHandle, specialized_on: TypeHandle) -> ComponentDescriptor {
        let repository: Capability = "Repository".into();
        ComponentDescriptor::builder(handle)
            .capability("Repository")
            .generic_arg(&repository, "T", specialized_on)
            .build()
    }

    #[test]
    fn specialization_matches_exact_binding() {
        let user_repo = repo_descriptor(PG_USER_REPO, USER);
        let repository: Capability = "Repository".into();
        assert!(specialization_matches(&user_repo, &repository, USER));
        assert!(!specialization_matches(&user_repo, &repository, ORDER));
    }

    #[test]
    fn unspecialized_descriptor_matches_anything() {
        let plain = ComponentDescriptor::builder(PG_USER_REPO).capability("Repository").build();
        let repository: Capability = "Repository".into();
        assert!(specialization_matches(&plain, &repository, USER));
        assert!(specialization_matches(&plain, &repository, ORDER));
    }

    #[test]
    fn filter_picks_the_matching_specialization() {
        let user_repo = repo_descriptor(PG_USER_REPO, USER);
        let order_repo = repo_descriptor(PG_ORDER_REPO, ORDER);
        let candidates = vec![&user_repo, &order_repo];
        let repository: Capability = "Repository".into();

        let found = filter_by_specialization(&candidates, &repository, USER);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].qualified_name(), "app::PgUserRepository");
    }
}
