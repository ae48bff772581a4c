/// Two-letter state code -> URL slug of the state's name.
pub const STATES: &[(&str, &str)] = &[
    ("bw", "baden-wurttemberg"),
    ("by", "bayern"),
    ("be", "berlin"),
    ("bb", "brandenburg"),
    ("hb", "bremen"),
    ("hh", "hamburg"),
    ("he", "hessen"),
    ("mv", "mecklenburg-vorpommern"),
    ("ni", "niedersachsen"),
    ("nw", "nordrhein-westfalen"),
    ("rp", "rheinland-pfalz"),
    ("sl", "saarland"),
    ("st", "sachsen-anhalt"),
    ("sn", "sachsen"),
    ("sh", "schleswig-holstein"),
    ("th", "thuringen"),
];

pub fn all_codes() -> Vec<String> {
    STATES.iter().map(|(code, _)| code.to_string()).collect()
}

pub fn code_for_slug(slug: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(slug))
        .map(|(code, _)| *code)
}

pub fn is_code(code: &str) -> bool {
    STATES.iter().any(|(c, _)| c.eq_ignore_ascii_case(code))
}

/// Display label for a question from a state catalogue, e.g. `BY-7`.
pub fn state_label(code: &str, n: u32) -> String {
    format!("{}-{}", code.to_uppercase(), n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lookup() {
        assert_eq!(code_for_slug("nordrhein-westfalen"), Some("nw"));
        assert_eq!(code_for_slug("sachsen"), Some("sn"));
        assert_eq!(code_for_slug("atlantis"), None);
    }

    #[test]
    fn label_is_uppercased() {
        assert_eq!(state_label("by", 7), "BY-7");
    }

    #[test]
    fn sixteen_states() {
        assert_eq!(all_codes().len(), 16);
        assert!(is_code("HH"));
    }
}
