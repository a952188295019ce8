//! Slug generation shared by every entity that carries a unique slug.

use crate::domain::types::{Slug, TypeConstraintError};

/// Lowercases `input` and keeps ASCII alphanumerics, collapsing any run of
/// other characters into a single dash.
///
/// Cyrillic is transliterated and common Latin diacritics are folded to their
/// base letter. Any other character outside ASCII is dropped.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_dash = false;
    for ch in input.to_lowercase().chars() {
        let folded = transliterate(ch).or_else(|| fold_diacritic(ch));
        if let Some(mapped) = folded {
            if mapped.is_empty() {
                continue;
            }
            out.push_str(mapped);
            prev_dash = false;
            continue;
        }
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_dash = false;
            continue;
        }
        if ch.is_ascii() && !prev_dash && !out.is_empty() {
            out.push('-');
            prev_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn transliterate(ch: char) -> Option<&'static str> {
    let mapped = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'ґ' => "g",
        'д' => "d",
        'е' | 'ё' | 'э' => "e",
        'є' => "ye",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'і' => "i",
        'ї' => "yi",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ы' => "y",
        'ю' => "yu",
        'я' => "ya",
        'ь' | 'ъ' => "",
        _ => return None,
    };
    Some(mapped)
}

fn fold_diacritic(ch: char) -> Option<&'static str> {
    let mapped = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        _ => return None,
    };
    Some(mapped)
}

/// Builds the base slug for a record: the preferred value when it slugifies to
/// something non-empty, else the fallback text, else `default`.
pub fn base_slug(preferred: Option<&str>, fallback: &str, default: &str) -> String {
    preferred
        .map(slugify)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(slugify(fallback)).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| default.to_string())
}

/// Returns `base` or the first `base-N` (N = 1, 2, ...) for which `taken`
/// reports no collision.
///
/// Callers exclude the record being updated from `taken` so that an update
/// keeps its own slug.
pub fn unique_slug<E, F>(base: &str, mut taken: F) -> Result<Slug, E>
where
    F: FnMut(&str) -> Result<bool, E>,
    E: From<TypeConstraintError>,
{
    let mut candidate = base.to_string();
    let mut suffix = 1;
    while taken(&candidate)? {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    Ok(Slug::new(candidate)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Home & Garden / Tools "), "home-garden-tools");
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn slugify_transliterates_cyrillic() {
        assert_eq!(slugify("Дрели и шуруповёрты"), "dreli-i-shurupoverty");
        assert_eq!(slugify("Чай / Кофе"), "chay-kofe");
        assert_eq!(slugify("Объём 2л"), "obem-2l");
        assert_eq!(slugify("Щётки"), "shchetki");
    }

    #[test]
    fn base_slug_prefers_explicit_value() {
        assert_eq!(base_slug(Some("Power-Tools"), "Tools", "category"), "power-tools");
        assert_eq!(base_slug(Some("!!!"), "Tools", "category"), "tools");
        assert_eq!(base_slug(None, "???", "category"), "category");
    }

    #[test]
    fn unique_slug_appends_numeric_suffix() {
        let existing = ["shoes", "shoes-1"];
        let slug: Slug =
            unique_slug::<TypeConstraintError, _>("shoes", |c| Ok(existing.contains(&c))).unwrap();
        assert_eq!(slug, "shoes-2");
    }

    #[test]
    fn unique_slug_keeps_free_base() {
        let slug: Slug = unique_slug::<TypeConstraintError, _>("hats", |_| Ok(false)).unwrap();
        assert_eq!(slug, "hats");
    }
}
