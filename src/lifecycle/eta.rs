use crate::models::business::Business;
use crate::models::order::Order;

/// Derives the display ETA from the business's base delivery time and the
/// order's captured preparation time.
///
/// Deterministic: no clocks, no state. With `order = None` (browsing, before
/// any order exists) preparation time contributes zero; with an order whose
/// preparation time is still unset the estimate is meaningless and "N/A" is
/// returned.
pub fn estimate(order: Option<&Order>, business: Option<&Business>) -> String {
    let Some(business) = business else {
        return "N/A".to_string();
    };

    if let Some(order) = order {
        if order.preparation_time.is_none() {
            return "N/A".to_string();
        }
    }
    let prep = order
        .and_then(|o| o.preparation_time)
        .unwrap_or(0) as i64;

    let delivery_time = business.delivery_time.as_str();

    if let Some((lo, hi)) = parse_range(delivery_time) {
        return format!("{}-{} min", lo as i64 + prep, hi as i64 + prep);
    }

    if let Some(base) = leading_int(delivery_time) {
        let total = base + prep;
        return if total > 0 {
            format!("{total} min")
        } else {
            "N/A".to_string()
        };
    }

    if delivery_time.is_empty() {
        "N/A".to_string()
    } else {
        delivery_time.to_string()
    }
}

/// Finds a `A-B` two-number pattern anywhere in the string ("25-35",
/// "aprox 25-35 min").
fn parse_range(raw: &str) -> Option<(u32, u32)> {
    for (idx, _) in raw.match_indices('-') {
        let lo: String = raw[..idx]
            .chars()
            .rev()
            .take_while(char::is_ascii_digit)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let hi: String = raw[idx + 1..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();

        if lo.is_empty() || hi.is_empty() {
            continue;
        }
        if let (Ok(lo), Ok(hi)) = (lo.parse(), hi.parse()) {
            return Some((lo, hi));
        }
    }
    None
}

/// Parses the leading integer of a free-form value ("30", "30 min").
fn leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed),
    };

    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::estimate;
    use crate::models::business::Business;
    use crate::models::courier::GeoPoint;
    use crate::models::order::{DeliveryAddress, Order, OrderItem, OrderStatus};

    fn business(delivery_time: &str) -> Business {
        Business {
            id: Uuid::from_u128(2),
            name: "Taqueria Paco".to_string(),
            address: "Calle 5 de Mayo 10".to_string(),
            phone: "5550001111".to_string(),
            delivery_time: delivery_time.to_string(),
            delivery_fee: 25.0,
            is_open: true,
            rating: 4.5,
            location: GeoPoint {
                lat: 19.43,
                lng: -99.13,
            },
            updated_at: Utc::now(),
        }
    }

    fn order(preparation_time: Option<u32>) -> Order {
        Order {
            id: Uuid::from_u128(1),
            status: OrderStatus::Accepted,
            client_id: Uuid::from_u128(3),
            business_id: Uuid::from_u128(2),
            delivery_person_id: None,
            items: vec![OrderItem {
                name: "Quesadilla".to_string(),
                price: 35.0,
                quantity: 2,
            }],
            total_price: 95.0,
            delivery_address: DeliveryAddress {
                full_address: "Av. Reforma 222".to_string(),
                coordinates: GeoPoint {
                    lat: 19.4326,
                    lng: -99.1332,
                },
            },
            special_notes: None,
            preparation_time,
            client_rating: None,
            delivery_rating: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_business_means_no_estimate() {
        assert_eq!(estimate(None, None), "N/A");
        assert_eq!(estimate(Some(&order(Some(10))), None), "N/A");
    }

    #[test]
    fn browse_context_uses_the_raw_range() {
        assert_eq!(estimate(None, Some(&business("25-35"))), "25-35 min");
    }

    #[test]
    fn preparation_time_shifts_both_bounds() {
        let o = order(Some(10));
        assert_eq!(estimate(Some(&o), Some(&business("25-35"))), "35-45 min");
    }

    #[test]
    fn order_without_prep_time_has_no_estimate() {
        let o = order(None);
        assert_eq!(estimate(Some(&o), Some(&business("25-35"))), "N/A");
    }

    #[test]
    fn single_number_gets_prep_added() {
        let o = order(Some(5));
        assert_eq!(estimate(Some(&o), Some(&business("30"))), "35 min");
    }

    #[test]
    fn single_number_with_unit_suffix() {
        assert_eq!(estimate(None, Some(&business("30 min"))), "30 min");
    }

    #[test]
    fn range_embedded_in_text_is_found() {
        let o = order(Some(20));
        assert_eq!(
            estimate(Some(&o), Some(&business("aprox 25-35 min"))),
            "45-55 min"
        );
    }

    #[test]
    fn unparseable_value_passes_through() {
        assert_eq!(estimate(None, Some(&business("varies"))), "varies");
    }

    #[test]
    fn empty_value_is_not_available() {
        assert_eq!(estimate(None, Some(&business(""))), "N/A");
    }

    #[test]
    fn same_inputs_same_output() {
        let o = order(Some(10));
        let b = business("25-35");
        assert_eq!(estimate(Some(&o), Some(&b)), estimate(Some(&o), Some(&b)));
    }
}
