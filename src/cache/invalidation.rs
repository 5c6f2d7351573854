//! Which cache keys each committed write makes stale.

use time::Date;
use uuid::Uuid;

use super::keys;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    ProductCreated {
        user_id: Uuid,
        name: String,
    },
    ProductUpdated {
        user_id: Uuid,
        product_id: Uuid,
        old_name: String,
        new_name: String,
    },
    ProductDeleted {
        user_id: Uuid,
        product_id: Uuid,
        name: String,
    },
    ProductPictureChanged {
        user_id: Uuid,
        product_id: Uuid,
    },
    MealChanged {
        user_id: Uuid,
        meal_id: Uuid,
        date: Date,
    },
    WeightSaved {
        user_id: Uuid,
        date: Date,
    },
    ProfileChanged {
        user_id: Uuid,
        login: String,
        email: String,
    },
    UserDeleted {
        user_id: Uuid,
        login: String,
        email: String,
    },
}

impl Mutation {
    pub fn affected_keys(&self) -> Vec<String> {
        match self {
            Mutation::ProductCreated { user_id, name } => vec![
                keys::products(*user_id),
                keys::personal_products(*user_id),
                keys::product_exact(*user_id, name),
            ],
            Mutation::ProductUpdated {
                user_id,
                product_id,
                old_name,
                new_name,
            } => {
                let mut out = product_keys(*user_id, *product_id, old_name);
                if new_name != old_name {
                    out.push(keys::product_exact(*user_id, new_name));
                }
                out
            }
            Mutation::ProductDeleted {
                user_id,
                product_id,
                name,
            } => product_keys(*user_id, *product_id, name),
            Mutation::ProductPictureChanged {
                user_id,
                product_id,
            } => vec![
                keys::products(*user_id),
                keys::personal_products(*user_id),
                keys::product(*user_id, *product_id),
                keys::personal_product(*user_id, *product_id),
            ],
            Mutation::MealChanged {
                user_id,
                meal_id,
                date,
            } => vec![
                keys::user_meals(*user_id),
                keys::user_meal(*user_id, *meal_id),
                keys::user_meals_on(*user_id, *date),
                keys::user_meals_products_on(*user_id, *date),
                keys::user_meals_history(*user_id),
                keys::meal_products(*user_id, *meal_id),
            ],
            Mutation::WeightSaved { user_id, date } => vec![
                keys::user_weight(*user_id, *date),
                keys::user_weights(*user_id),
            ],
            Mutation::ProfileChanged {
                user_id,
                login,
                email,
            } => profile_keys(*user_id, login, email),
            Mutation::UserDeleted {
                user_id,
                login,
                email,
            } => {
                let mut out = profile_keys(*user_id, login, email);
                out.extend([
                    keys::products(*user_id),
                    keys::personal_products(*user_id),
                    keys::user_meals(*user_id),
                    keys::user_meals_history(*user_id),
                    keys::user_weights(*user_id),
                ]);
                out
            }
        }
    }
}

/// Union of the keys of several mutations, sorted and deduplicated.
pub fn keys_for(mutations: &[Mutation]) -> Vec<String> {
    let mut out: Vec<String> = mutations.iter().flat_map(Mutation::affected_keys).collect();
    out.sort();
    out.dedup();
    out
}

fn product_keys(user_id: Uuid, product_id: Uuid, name: &str) -> Vec<String> {
    vec![
        keys::products(user_id),
        keys::personal_products(user_id),
        keys::product_exact(user_id, name),
        keys::product(user_id, product_id),
        keys::personal_product(user_id, product_id),
    ]
}

fn profile_keys(user_id: Uuid, login: &str, email: &str) -> Vec<String> {
    vec![
        keys::user(user_id),
        keys::user_lookup(login),
        keys::user_lookup(email),
        keys::user_nutrients(user_id),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::{memory::MemoryCache, Cache};
    use time::macros::date;

    #[tokio::test]
    async fn product_update_drops_every_view_of_the_product() {
        let store = Arc::new(MemoryCache::new());
        let cache = Cache::new(store.clone(), 3600);
        let (u, p) = (Uuid::new_v4(), Uuid::new_v4());

        for key in [
            keys::products(u),
            keys::personal_products(u),
            keys::product_exact(u, "Oats"),
            keys::product(u, p),
            keys::personal_product(u, p),
            keys::user_meals(u),
        ] {
            cache.set(&key, &"snapshot").await;
        }

        cache
            .invalidate(&Mutation::ProductUpdated {
                user_id: u,
                product_id: p,
                old_name: "Oats".into(),
                new_name: "Rolled oats".into(),
            })
            .await;

        assert!(cache.get::<String>(&keys::products(u)).await.is_none());
        assert!(cache.get::<String>(&keys::product_exact(u, "Oats")).await.is_none());
        assert!(cache.get::<String>(&keys::personal_product(u, p)).await.is_none());
        assert!(cache.get::<String>(&keys::product(u, p)).await.is_none());
        // meal keys are dropped through separate MealChanged mutations
        assert_eq!(store.keys(), vec![keys::user_meals(u)]);
    }

    #[test]
    fn renamed_product_also_drops_the_new_name() {
        let (u, p) = (Uuid::new_v4(), Uuid::new_v4());
        let affected = Mutation::ProductUpdated {
            user_id: u,
            product_id: p,
            old_name: "A".into(),
            new_name: "B".into(),
        }
        .affected_keys();
        assert!(affected.contains(&keys::product_exact(u, "A")));
        assert!(affected.contains(&keys::product_exact(u, "B")));
    }

    #[test]
    fn meal_change_covers_dated_views() {
        let (u, m) = (Uuid::new_v4(), Uuid::new_v4());
        let d = date!(2024 - 06 - 01);
        let affected = Mutation::MealChanged {
            user_id: u,
            meal_id: m,
            date: d,
        }
        .affected_keys();
        assert_eq!(affected.len(), 6);
        assert!(affected.contains(&keys::user_meals_products_on(u, d)));
        assert!(affected.contains(&keys::meal_products(u, m)));
    }

    #[test]
    fn profile_change_drops_nutrients() {
        let u = Uuid::new_v4();
        let affected = Mutation::ProfileChanged {
            user_id: u,
            login: "alice".into(),
            email: "alice@example.com".into(),
        }
        .affected_keys();
        assert!(affected.contains(&keys::user_nutrients(u)));
        assert!(affected.contains(&keys::user_lookup("alice@example.com")));
    }

    #[test]
    fn search_keys_are_never_invalidated() {
        let u = Uuid::new_v4();
        let affected = Mutation::ProductCreated {
            user_id: u,
            name: "Apple".into(),
        }
        .affected_keys();
        assert!(!affected.contains(&keys::product_search(u, "App")));
    }
}
