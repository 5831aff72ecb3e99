//! Embedded narrative assets.
//!
//! Every text the builder needs (player docs, name corpora, filler book, the
//! fixed reports and interviews) is baked into the binary, so a build never
//! touches the filesystem for its inputs.

/// Macro to embed narrative assets at compile time as text.
///
/// Generates:
/// - Public constants for each embedded asset
/// - `get_asset(name)` function for lookup
/// - `list_assets()` function for discovery
macro_rules! embedded_assets {
    ($($path:expr => $const_name:ident),* $(,)?) => {
        $(
            pub const $const_name: &str =
                include_str!(concat!("../../assets/", $path));
        )*

        pub fn get_asset(name: &str) -> Option<&'static str> {
            match name {
                $( $path => Some($const_name), )*
                _ => None,
            }
        }

        pub fn list_assets() -> Vec<&'static str> {
            vec![ $( $path, )* ]
        }
    };
}

embedded_assets! {
    // Player-facing files committed to the base snapshot
    "README.md" => README,
    "instructions.txt" => INSTRUCTIONS,

    // Filler corpora
    "given-names.txt" => GIVEN_NAMES,
    "surnames.txt" => SURNAMES,
    "book.txt" => BOOK,

    // Fixed story
    "main-report.txt" => MAIN_REPORT,
    "interview-1.txt" => INTERVIEW_1,
    "interview-2.txt" => INTERVIEW_2,
    "interview-3.txt" => INTERVIEW_3,
    "investigation-1.txt" => INVESTIGATION_1,
    "investigation-2.txt" => INVESTIGATION_2,
    "investigation-3.txt" => INVESTIGATION_3,
}

/// Interview text for the suspect at `index` (0-based, canonical order).
pub fn interview(index: usize) -> Option<&'static str> {
    get_asset(&format!("interview-{}.txt", index + 1))
}

/// Investigation case file for the suspect at `index` (0-based, canonical order).
pub fn investigation(index: usize) -> Option<&'static str> {
    get_asset(&format!("investigation-{}.txt", index + 1))
}

/// Non-empty, trimmed lines of a corpus file.
pub fn corpus_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split the filler book into single-line paragraphs, dropping indented
/// blocks, chapter headings and the title.
pub fn book_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .filter(|p| !p.starts_with(' ') && !p.trim_start().starts_with("CHAPTER"))
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty() && p.chars().any(|c| c.is_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::people;

    #[test]
    fn every_asset_is_non_empty() {
        for name in list_assets() {
            let content = get_asset(name).expect("listed asset should resolve");
            assert!(!content.trim().is_empty(), "{} is empty", name);
        }
        assert!(get_asset("missing.txt").is_none());
    }

    #[test]
    fn every_suspect_has_story_texts() {
        for index in 0..people::suspects().len() {
            assert!(interview(index).is_some());
            assert!(investigation(index).is_some());
        }
    }

    #[test]
    fn book_paragraphs_skip_headings() {
        let paragraphs = book_paragraphs(BOOK);
        assert!(paragraphs.len() > 10);
        assert!(paragraphs.iter().all(|p| !p.starts_with("CHAPTER")));
        assert!(paragraphs.iter().all(|p| !p.contains('\n')));
        assert!(!paragraphs.iter().any(|p| p == "THE LEDGERS OF GIT TOWN"));
    }

    #[test]
    fn corpora_have_no_blank_lines() {
        let given = corpus_lines(GIVEN_NAMES);
        let surnames = corpus_lines(SURNAMES);
        assert!(given.len() > 20 && surnames.len() > 20);
        assert!(given.iter().chain(surnames.iter()).all(|n| !n.contains(' ')));
    }
}
