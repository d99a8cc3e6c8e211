use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A city in the reference directory.
///
/// `id` is the remote document id, stable across sessions. By convention it
/// is a slug of `province-name` (see `utils::city_slug`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub province: String,
}

/// Group cities by province for categorized display.
/// Provinces come back sorted; cities keep their directory order.
pub fn by_province(cities: &[City]) -> BTreeMap<&str, Vec<&City>> {
    let mut grouped: BTreeMap<&str, Vec<&City>> = BTreeMap::new();
    for city in cities {
        grouped.entry(city.province.as_str()).or_default().push(city);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(id: &str, name: &str, province: &str) -> City {
        City {
            id: id.to_string(),
            name: name.to_string(),
            province: province.to_string(),
        }
    }

    #[test]
    fn test_by_province_sorts_provinces_and_keeps_city_order() {
        let cities = vec![
            city("p-quito", "Quito", "Pichincha"),
            city("g-guayaquil", "Guayaquil", "Guayas"),
            city("p-cayambe", "Cayambe", "Pichincha"),
        ];

        let grouped = by_province(&cities);
        let provinces: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(provinces, vec!["Guayas", "Pichincha"]);

        let pichincha: Vec<_> = grouped["Pichincha"].iter().map(|c| c.name.as_str()).collect();
        assert_eq!(pichincha, vec!["Quito", "Cayambe"]);
    }
}
