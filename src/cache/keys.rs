//! Cache key builders. Every key the service reads or invalidates is spelled here.

use std::fmt::Display;

use time::Date;
use uuid::Uuid;

use crate::dates::format_date;

pub fn products(user_id: Uuid) -> String {
    format!("products:{user_id}")
}

pub fn personal_products(user_id: Uuid) -> String {
    format!("personal_products:{user_id}")
}

pub fn product_exact(user_id: Uuid, name: &str) -> String {
    format!("product_exact:{user_id}:{name}")
}

pub fn product(user_id: Uuid, product_id: Uuid) -> String {
    format!("product:{user_id}:{product_id}")
}

pub fn personal_product(user_id: Uuid, product_id: Uuid) -> String {
    format!("personal_product:{user_id}:{product_id}")
}

/// Not tracked by any invalidation; bounded by TTL.
pub fn product_search(user_id: Uuid, query: &str) -> String {
    format!("product_search:{user_id}:{query}")
}

pub fn user_meals(user_id: Uuid) -> String {
    format!("user_meals:{user_id}")
}

pub fn user_meal(user_id: Uuid, meal_id: Uuid) -> String {
    format!("user_meal:{user_id}:{meal_id}")
}

pub fn user_meals_on(user_id: Uuid, date: Date) -> String {
    format!("user_meals:{user_id}:{}", format_date(date))
}

pub fn user_meals_products_on(user_id: Uuid, date: Date) -> String {
    format!("user_meals_products:{user_id}:{}", format_date(date))
}

pub fn user_meals_history(user_id: Uuid) -> String {
    format!("user_meals_history:{user_id}")
}

pub fn meal_products(user_id: Uuid, meal_id: Uuid) -> String {
    format!("meal_products:{user_id}:{meal_id}")
}

pub fn user_weight(user_id: Uuid, date: Date) -> String {
    format!("user_weight:{user_id}:{}", format_date(date))
}

pub fn user_weights(user_id: Uuid) -> String {
    format!("user_weights:{user_id}")
}

pub fn user(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

pub fn user_lookup(login_or_email: &str) -> String {
    format!("user_lookup:{login_or_email}")
}

pub fn user_nutrients(user_id: Uuid) -> String {
    format!("user_nutrients:{user_id}")
}

pub fn deny(jti: impl Display) -> String {
    format!("deny:{jti}")
}

/// Pending Google sign-in, keyed by the `state` sent to the provider.
pub fn oauth_state(value: &str) -> String {
    format!("oauth_state:{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn dated_keys_use_iso_dates() {
        let u = Uuid::nil();
        assert_eq!(
            user_meals_on(u, date!(2024 - 03 - 05)),
            "user_meals:00000000-0000-0000-0000-000000000000:2024-03-05"
        );
        assert_eq!(
            user_weight(u, date!(2024 - 03 - 05)),
            "user_weight:00000000-0000-0000-0000-000000000000:2024-03-05"
        );
    }

    #[test]
    fn meal_list_and_meal_on_date_do_not_collide() {
        let u = Uuid::new_v4();
        assert_ne!(user_meals(u), user_meals_on(u, date!(2024 - 01 - 01)));
        assert!(user_meals_on(u, date!(2024 - 01 - 01)).starts_with(&user_meals(u)));
    }
}
