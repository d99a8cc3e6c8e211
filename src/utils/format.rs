/// Map accented characters to their ASCII base. Covers the characters that
/// occur in the directory's Spanish place names.
fn strip_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => c,
    }
}

/// Build the canonical document id for a city: `province-name` lowercased,
/// diacritics stripped, every non-alphanumeric run collapsed to a single `-`.
pub fn city_slug(province: &str, name: &str) -> String {
    let raw = format!("{}-{}", province, name).to_lowercase();
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = strip_diacritic(c);
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_slug_lowercases_and_strips_accents() {
        assert_eq!(city_slug("Pichincha", "Quito"), "pichincha-quito");
        assert_eq!(city_slug("Manabí", "Portoviejo"), "manabi-portoviejo");
        assert_eq!(city_slug("Cañar", "Azogues"), "canar-azogues");
    }

    #[test]
    fn test_city_slug_collapses_separator_runs() {
        assert_eq!(
            city_slug("Santo Domingo de los Tsáchilas", "Santo Domingo"),
            "santo-domingo-de-los-tsachilas-santo-domingo"
        );
        assert_eq!(city_slug("Los Ríos", "Babahoyo  (centro)"), "los-rios-babahoyo-centro-");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(&Some("F".to_string()), "-"), "F");
        assert_eq!(format_optional(&None, "-"), "-");
    }
}
