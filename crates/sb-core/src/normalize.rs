//! Name normalization.
//!
//! Spell names are compared by key: lowercased, accents folded, only
//! letters, digits and single spaces kept. The same key is computed for
//! payload entries and for names scraped off the character sheet, so
//! "Tasha's Hideous Laughter" and "tashas  hideous laughter" meet.
//!
//! ```
//! use sb_core::normalize::spell_key;
//!
//! assert_eq!(spell_key("  Melf's Acid-Arrow "), "melfs acidarrow");
//! assert_eq!(spell_key("Fireball"), spell_key(" FIREBALL "));
//! ```

use std::collections::HashSet;

/// Normalized comparison key for a spell name.
pub fn spell_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_space = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let c = fold_diacritic(c);
        if c.is_whitespace() {
            pending_space = !key.is_empty();
        } else if c.is_alphanumeric() {
            if pending_space {
                key.push(' ');
                pending_space = false;
            }
            key.push(c);
        }
        // Punctuation and combining marks drop out without splitting words.
    }

    key
}

/// Dedupe a target list by [`spell_key`], keeping the first spelling seen.
///
/// Entries are trimmed; entries with an empty key are dropped. Applying the
/// function twice gives the same list.
pub fn normalize_prepared_spells<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let name = name.as_ref().trim();
        let key = spell_key(name);
        if key.is_empty() {
            continue;
        }
        if seen.insert(key) {
            out.push(name.to_string());
        }
    }

    out
}

/// Canonical list name: trimmed, inner whitespace collapsed, upper case.
pub fn normalize_list_name(list: &str) -> String {
    collapse_whitespace(list).to_uppercase()
}

/// Trim and collapse runs of whitespace to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-cased, whitespace-collapsed text for loose label comparison.
pub fn label_key(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// Map accented Latin letters to their base letter.
///
/// Covers Latin-1 Supplement and the common Latin Extended-A letters,
/// which is what spell names in the catalog actually use.
fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' | 'ŧ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spell_key_strips_punctuation() {
        assert_eq!(spell_key("Tasha's Hideous Laughter"), "tashas hideous laughter");
        assert_eq!(spell_key("Power Word: Kill"), "power word kill");
        assert_eq!(spell_key("  Mage\tArmor  "), "mage armor");
        assert_eq!(spell_key("!!!"), "");
    }

    #[test]
    fn test_spell_key_folds_accents() {
        assert_eq!(spell_key("Évard's Black Tentacles"), spell_key("evards black tentacles"));
        assert_eq!(spell_key("Mordenkainen’s Sword"), "mordenkainens sword");
    }

    #[test]
    fn test_normalize_prepared_spells_first_wins() {
        let out = normalize_prepared_spells(&["Fireball", "fireball", " FIREBALL "]);
        assert_eq!(out, vec!["Fireball".to_string()]);
    }

    #[test]
    fn test_normalize_prepared_spells_keeps_order_and_drops_blank() {
        let input = ["Shield", "", "Light", "  ", "shield", "Sleep"];
        let out = normalize_prepared_spells(&input);
        assert_eq!(out, vec!["Shield", "Light", "Sleep"]);
    }

    #[test]
    fn test_normalize_prepared_spells_idempotent() {
        let input = ["Éclair", "eclair", "Cure  Wounds", "cure wounds", " Bless"];
        let once = normalize_prepared_spells(&input);
        let twice = normalize_prepared_spells(&once);
        assert_eq!(once, twice);
        assert_eq!(once, vec!["Éclair", "Cure  Wounds", "Bless"]);
    }

    #[test]
    fn test_normalize_list_name() {
        assert_eq!(normalize_list_name(" druid "), "DRUID");
        assert_eq!(normalize_list_name("eldritch   knight"), "ELDRITCH KNIGHT");
        assert_eq!(normalize_list_name("   "), "");
    }
}
