use std::path::Path;

const MAX_STEM_LEN: usize = 80;

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || c == '-'
        || matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Filename stem for a test case title. Runs of characters outside Latin and
/// Cyrillic letters, digits, `_` and `-` collapse to one `_`.
pub fn sanitize_title(title: &str, id: Option<&str>) -> String {
    let mut stem = String::with_capacity(title.len());
    for c in title.chars() {
        if is_kept(c) {
            stem.push(c);
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }

    let stem: String = stem.trim_matches('_').chars().take(MAX_STEM_LEN).collect();
    let stem = stem.trim_end_matches('_');

    if stem.is_empty() {
        format!("test_case_{}", id.unwrap_or("unknown"))
    } else {
        stem.to_string()
    }
}

/// First free `{stem}.json`, `{stem}_1.json`, ... in `folder`.
pub fn unique_filename(stem: &str, folder: &Path) -> String {
    let mut candidate = format!("{stem}.json");
    let mut suffix = 1;
    while folder.join(&candidate).exists() {
        candidate = format!("{stem}_{suffix}.json");
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn punctuation_runs_become_single_underscore() {
        let stem = sanitize_title("Login: happy/path!!", Some("1"));

        assert_eq!(stem, "Login_happy_path");
        assert!(stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn keeps_cyrillic_letters_and_dashes() {
        assert_eq!(
            sanitize_title("Вход в систему - ёлка №2", None),
            "Вход_в_систему_-_ёлка_2"
        );
    }

    #[test]
    fn empty_stem_falls_back_to_id() {
        assert_eq!(sanitize_title("!!!", Some("42")), "test_case_42");
        assert_eq!(sanitize_title("", None), "test_case_unknown");
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = "word ".repeat(40);

        let stem = sanitize_title(&title, None);

        assert!(stem.chars().count() <= MAX_STEM_LEN);
        assert!(!stem.ends_with('_'));
        assert!(stem.starts_with("word_word"));
    }

    #[test]
    fn same_title_gets_numeric_suffix() {
        let dir = TempDir::new().unwrap();

        let first = unique_filename("base", dir.path());
        std::fs::write(dir.path().join(&first), "{}").unwrap();
        let second = unique_filename("base", dir.path());
        std::fs::write(dir.path().join(&second), "{}").unwrap();
        let third = unique_filename("base", dir.path());

        assert_eq!(first, "base.json");
        assert_eq!(second, "base_1.json");
        assert_eq!(third, "base_2.json");
    }
}
